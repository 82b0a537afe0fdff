//! # Cave Generation
//!
//! Round caverns joined by rough diagonal tunnels, widened afterwards by a
//! drunkard walk until enough of the rock is gone.

use crate::game::{Direction, Map, Material, Position, TextureSet};
use crate::generation::{utils, GenerationConfig, MapGenerator};
use crate::{WarrensError, WarrensResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// Drunkard steps allowed per map tile before the walk gives up.
const WALK_STEPS_PER_TILE: u32 = 20;

#[derive(Debug, Clone, Default)]
pub struct CaveGenerator;

impl CaveGenerator {
    pub fn new() -> Self {
        Self
    }

    fn random_center(&self, map: &Map, rng: &mut StdRng) -> WarrensResult<Position> {
        let (max_x, max_y) = (map.width() as i32 - 2, map.height() as i32 - 2);
        if max_x <= 2 || max_y <= 2 {
            return Err(WarrensError::GenerationFailed(format!(
                "No room for a cavern on a {}x{} map",
                map.width(),
                map.height()
            )));
        }
        Ok(Position::new(rng.gen_range(2..max_x), rng.gen_range(2..max_y)))
    }

    fn clear_cavern(&self, map: &mut Map, center: Position, radius: u32) {
        for pos in map.circle_tiles(center, radius, true, false) {
            map.carve(pos, Material::Dirt);
        }
    }

    /// Steps diagonally from `from` to `to`, clearing 1 to 3 tiles wide.
    fn carve_tunnel(&self, map: &mut Map, from: Position, to: Position, rng: &mut StdRng) {
        let mut pos = from;
        map.carve(pos, Material::Dirt);
        while pos != to {
            pos = Position::new(pos.x + (to.x - pos.x).signum(), pos.y + (to.y - pos.y).signum());
            let width = rng.gen_range(1..=3);
            for i in 0..width {
                map.carve(Position::new(pos.x + i, pos.y + i), Material::Dirt);
                map.carve(Position::new(pos.x + i, pos.y), Material::Dirt);
                map.carve(Position::new(pos.x, pos.y + i), Material::Dirt);
            }
        }
    }

    /// Wanders from open tiles, clearing rock, until the floor share is met.
    fn drunkard_walk(&self, map: &mut Map, target_fraction: f64, rng: &mut StdRng) {
        let open: Vec<Position> = map.walkable_positions().collect();
        let Some(mut walker) = open.choose(rng).copied() else {
            return;
        };
        let (max_x, max_y) = (map.width() as i32 - 2, map.height() as i32 - 2);
        let target = target_fraction * (max_x.max(0) * max_y.max(0)) as f64;
        let mut open_count = open.len();
        let budget = map.width() * map.height() * WALK_STEPS_PER_TILE;
        let mut steps = 0;
        while (open_count as f64) < target && steps < budget {
            let direction = Direction::all()[rng.gen_range(0..8)];
            let next = walker.step(direction);
            if (1..=max_x).contains(&next.x) && (1..=max_y).contains(&next.y) {
                walker = next;
                if map.is_blocked(walker) {
                    open_count += 1;
                }
                map.carve(walker, Material::Dirt);
            }
            steps += 1;
        }
    }
}

impl MapGenerator for CaveGenerator {
    fn generate_map(&self, width: u32, height: u32, config: &GenerationConfig, rng: &mut StdRng) -> WarrensResult<Map> {
        utils::check_size(width, height, config)?;
        let mut map = Map::filled(width, height, Material::Stone, true, TextureSet::Cave);
        let radius_range = config.cave_min_radius..=config.cave_max_radius.max(config.cave_min_radius);

        let first = self.random_center(&map, rng)?;
        let radius = rng.gen_range(radius_range.clone());
        self.clear_cavern(&mut map, first, radius);

        let mut previous = first;
        for _ in 0..rng.gen_range(1..=6) {
            let center = self.random_center(&map, rng)?;
            let radius = rng.gen_range(radius_range.clone());
            self.clear_cavern(&mut map, center, radius);
            self.carve_tunnel(&mut map, center, previous, rng);
            previous = center;
        }
        let last = previous;
        self.carve_tunnel(&mut map, last, first, rng);

        // The walk must not reach the border, so seal it first
        map.enforce_border();
        self.drunkard_walk(&mut map, config.cave_floor_fraction, rng);

        for pos in map.circle_tiles(last, 2, true, false) {
            if !map.is_border(pos) {
                map.carve(pos, Material::Water);
            }
        }

        map.entry = first;
        map.exit = last;
        utils::finish(self, map)
    }

    fn generator_type(&self) -> &'static str {
        "cave"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::pathfinding::is_reachable;

    #[test]
    fn test_cave_border_and_connectivity() {
        for seed in [1, 2, 3, 4, 5] {
            let config = GenerationConfig::for_testing(seed);
            let mut rng = utils::create_rng(&config);
            let map = CaveGenerator::new().generate_map(40, 30, &config, &mut rng).unwrap();

            assert!(map.tiles().filter(|t| map.is_border(t.position())).all(|t| t.is_blocked()));
            assert!(is_reachable(&map, map.entry, map.exit));
        }
    }

    #[test]
    fn test_cave_reaches_floor_fraction() {
        let config = GenerationConfig::for_testing(8);
        let mut rng = utils::create_rng(&config);
        let map = CaveGenerator::new().generate_map(40, 30, &config, &mut rng).unwrap();
        assert!(map.open_fraction() >= config.cave_floor_fraction);
    }

    #[test]
    fn test_walk_stops_at_target() {
        let mut map = Map::filled(30, 20, Material::Stone, true, TextureSet::Cave);
        map.carve(Position::new(15, 10), Material::Dirt);
        let mut rng = utils::create_rng(&GenerationConfig::for_testing(13));
        CaveGenerator::new().drunkard_walk(&mut map, 0.25, &mut rng);

        // one new tile per step at most, so the walk ends right on the target
        let interior = (28 * 18) as f64;
        assert!(map.open_fraction() >= 0.25);
        assert!(map.open_fraction() < 0.25 + 1.0 / interior + f64::EPSILON);
    }

    #[test]
    fn test_tiny_map_fails_instead_of_panicking() {
        let mut config = GenerationConfig::for_testing(3);
        config.min_room_size = 1;
        let mut rng = utils::create_rng(&config);
        for (w, h) in [(3, 3), (4, 9), (2, 2)] {
            let result = CaveGenerator::new().generate_map(w, h, &config, &mut rng);
            assert!(matches!(result, Err(WarrensError::GenerationFailed(_))));
        }

        let map = Map::filled(4, 4, Material::Stone, true, TextureSet::Cave);
        assert!(CaveGenerator::new().random_center(&map, &mut rng).is_err());
    }

    #[test]
    fn test_pool_at_exit() {
        let config = GenerationConfig::for_testing(21);
        let mut rng = utils::create_rng(&config);
        let map = CaveGenerator::new().generate_map(40, 30, &config, &mut rng).unwrap();
        assert_eq!(map.tile(map.exit).unwrap().material(), Material::Water);
        assert!(!map.is_blocked(map.exit));
    }
}
