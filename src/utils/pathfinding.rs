//! # Reachability
//!
//! Breadth-first searches over walkable tiles, using the `pathfinding` crate.
//! Movement is 8-connected, so these searches are too.

use crate::game::{Map, Position};
use ::pathfinding::prelude::{bfs, bfs_reach};
use std::collections::HashSet;

/// Unblocked neighbours of `pos`, diagonals included.
pub fn walkable_neighbors(map: &Map, pos: Position) -> Vec<Position> {
    pos.neighbors().filter(|p| !map.is_blocked(*p)).collect()
}

/// Every tile reachable from `start` by walking.
pub fn reachable_from(map: &Map, start: Position) -> HashSet<Position> {
    if map.is_blocked(start) {
        return HashSet::new();
    }
    bfs_reach(start, |p| walkable_neighbors(map, *p))
        .into_iter()
        .collect()
}

/// Shortest walk between two tiles, both ends included.
pub fn shortest_path(map: &Map, from: Position, to: Position) -> Option<Vec<Position>> {
    if map.is_blocked(from) || map.is_blocked(to) {
        return None;
    }
    bfs(&from, |p| walkable_neighbors(map, *p), |p| *p == to)
}

pub fn is_reachable(map: &Map, from: Position, to: Position) -> bool {
    shortest_path(map, from, to).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Material, TextureSet};

    fn split_map() -> Map {
        let mut map = Map::filled(9, 5, Material::Dirt, false, TextureSet::Dungeon);
        map.enforce_border();
        for y in 0..5 {
            map.fill(Position::new(4, y), Material::Stone);
        }
        map
    }

    #[test]
    fn test_wall_splits_map() {
        let map = split_map();
        let left = Position::new(1, 1);
        let right = Position::new(7, 3);

        assert!(!is_reachable(&map, left, right));
        assert_eq!(reachable_from(&map, left).len(), 9);
    }

    #[test]
    fn test_gap_connects_map() {
        let mut map = split_map();
        map.carve(Position::new(4, 2), Material::Dirt);

        let path = shortest_path(&map, Position::new(1, 1), Position::new(7, 3)).unwrap();
        assert_eq!(path.first(), Some(&Position::new(1, 1)));
        assert_eq!(path.last(), Some(&Position::new(7, 3)));
        assert_eq!(path.len(), 7);
    }

    #[test]
    fn test_blocked_start_reaches_nothing() {
        let map = split_map();
        assert!(reachable_from(&map, Position::new(0, 0)).is_empty());
        assert!(shortest_path(&map, Position::new(0, 0), Position::new(1, 1)).is_none());
    }
}
