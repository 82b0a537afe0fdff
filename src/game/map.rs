//! # Map
//!
//! The tile grid of a level. Tiles are stored row-major and only change
//! through [`Map`] methods so the derived caches (sight matrix, explored and
//! visible sets) never go stale.

use crate::game::Position;
use crate::generation::Room;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What a tile is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    None,
    Dirt,
    Stone,
    Water,
    Door,
}

/// Family of wall and floor sprites a renderer should use for a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureSet {
    Dungeon,
    Cave,
    Town,
    House,
}

/// One grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    position: Position,
    material: Material,
    blocked: bool,
    blocks_sight: bool,
    explored: bool,
    in_view: bool,
    /// Bit i set when neighbour i (row-major 3x3, centre included) blocks sight
    texture_hash: u16,
}

impl Tile {
    fn new(position: Position, material: Material, blocked: bool) -> Self {
        Self {
            position,
            material,
            blocked,
            blocks_sight: blocked,
            explored: false,
            in_view: false,
            texture_hash: 0,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn material(&self) -> Material {
        self.material
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn blocks_sight(&self) -> bool {
        self.blocks_sight
    }

    pub fn is_explored(&self) -> bool {
        self.explored
    }

    pub fn in_view(&self) -> bool {
        self.in_view
    }

    pub fn texture_hash(&self) -> u16 {
        self.texture_hash
    }
}

#[derive(Debug, Clone, Default)]
struct MapCaches {
    sight_blockers: Vec<bool>,
    explored: BTreeSet<Position>,
    visible: BTreeSet<Position>,
    fov_origin: Option<(Position, u32)>,
    dirty: bool,
}

/// A width x height grid of tiles with entry and exit points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "MapDocument", into = "MapDocument")]
pub struct Map {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
    pub entry: Position,
    pub exit: Position,
    pub texture_set: TextureSet,
    /// Rooms or houses the generator laid out
    pub areas: Vec<Room>,
    caches: MapCaches,
}

#[derive(Serialize, Deserialize)]
struct MapDocument {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
    entry: Position,
    exit: Position,
    texture_set: TextureSet,
    areas: Vec<Room>,
}

impl From<MapDocument> for Map {
    fn from(doc: MapDocument) -> Self {
        let mut map = Map {
            width: doc.width,
            height: doc.height,
            tiles: doc.tiles,
            entry: doc.entry,
            exit: doc.exit,
            texture_set: doc.texture_set,
            areas: doc.areas,
            caches: MapCaches::default(),
        };
        map.rebuild_caches();
        map
    }
}

impl From<Map> for MapDocument {
    fn from(map: Map) -> Self {
        MapDocument {
            width: map.width,
            height: map.height,
            tiles: map.tiles,
            entry: map.entry,
            exit: map.exit,
            texture_set: map.texture_set,
            areas: map.areas,
        }
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.entry == other.entry
            && self.exit == other.exit
            && self.texture_set == other.texture_set
            && self.areas == other.areas
            && self.tiles == other.tiles
    }
}

impl Map {
    /// Creates a map where every tile has the same material and blocking.
    pub fn filled(width: u32, height: u32, material: Material, blocked: bool, texture_set: TextureSet) -> Self {
        let mut tiles = Vec::with_capacity((width * height) as usize);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                tiles.push(Tile::new(Position::new(x, y), material, blocked));
            }
        }

        let mut map = Self {
            width,
            height,
            tiles,
            entry: Position::new(0, 0),
            exit: Position::new(0, 0),
            texture_set,
            areas: Vec::new(),
            caches: MapCaches::default(),
        };
        map.rebuild_caches();
        map
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// True for the outermost ring of tiles.
    pub fn is_border(&self, pos: Position) -> bool {
        self.in_bounds(pos)
            && (pos.x == 0
                || pos.y == 0
                || pos.x == self.width as i32 - 1
                || pos.y == self.height as i32 - 1)
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    pub fn tile(&self, pos: Position) -> Option<&Tile> {
        self.index(pos).map(|i| &self.tiles[i])
    }

    /// All tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Out-of-bounds positions count as blocked.
    pub fn is_blocked(&self, pos: Position) -> bool {
        self.tile(pos).map_or(true, |t| t.blocked)
    }

    /// Sight check against the cached blocker matrix.
    pub fn blocks_sight(&self, pos: Position) -> bool {
        match self.index(pos) {
            Some(i) => self.caches.sight_blockers.get(i).copied().unwrap_or(true),
            None => true,
        }
    }

    /// Turns a tile into walkable, see-through ground.
    pub fn carve(&mut self, pos: Position, material: Material) {
        self.set_tile_state(pos, material, false);
    }

    /// Turns a tile into solid wall or rock.
    pub fn fill(&mut self, pos: Position, material: Material) {
        self.set_tile_state(pos, material, true);
    }

    fn set_tile_state(&mut self, pos: Position, material: Material, blocked: bool) {
        let Some(i) = self.index(pos) else {
            return;
        };
        let tile = &mut self.tiles[i];
        tile.material = material;
        if tile.blocked != blocked || tile.blocks_sight != blocked {
            tile.blocked = blocked;
            tile.blocks_sight = blocked;
            self.caches.sight_blockers[i] = blocked;
            self.caches.dirty = true;
        }
    }

    /// Forces the outer ring to be blocked.
    pub fn enforce_border(&mut self) {
        let (w, h) = (self.width as i32, self.height as i32);
        for x in 0..w {
            self.seal(Position::new(x, 0));
            self.seal(Position::new(x, h - 1));
        }
        for y in 0..h {
            self.seal(Position::new(0, y));
            self.seal(Position::new(w - 1, y));
        }
    }

    fn seal(&mut self, pos: Position) {
        if !self.is_blocked(pos) {
            let material = self.tile(pos).map_or(Material::Stone, |t| t.material);
            self.fill(pos, material);
        }
    }

    /// Marks every tile explored, used for open-air maps.
    pub fn reveal_all(&mut self) {
        for tile in &mut self.tiles {
            tile.explored = true;
        }
        self.caches.explored = self.tiles.iter().map(|t| t.position).collect();
    }

    /// Positions within `radius` of `center`, clipped to the map.
    pub fn circle_tiles(
        &self,
        center: Position,
        radius: u32,
        include_center: bool,
        exclude_blocked: bool,
    ) -> Vec<Position> {
        let r = radius as i32;
        let mut positions = Vec::new();
        for y in (center.y - r)..=(center.y + r) {
            for x in (center.x - r)..=(center.x + r) {
                let pos = Position::new(x, y);
                if !self.in_bounds(pos) || center.euclidean_distance(pos) > radius as f64 {
                    continue;
                }
                if !include_center && pos == center {
                    continue;
                }
                if exclude_blocked && self.is_blocked(pos) {
                    continue;
                }
                positions.push(pos);
            }
        }
        positions
    }

    pub fn walkable_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.tiles.iter().filter(|t| !t.blocked).map(|t| t.position)
    }

    /// Share of non-border tiles that are walkable.
    pub fn open_fraction(&self) -> f64 {
        let interior = (self.width.saturating_sub(2) * self.height.saturating_sub(2)) as f64;
        if interior == 0.0 {
            return 0.0;
        }
        self.walkable_positions().count() as f64 / interior
    }

    pub fn explored_tiles(&self) -> &BTreeSet<Position> {
        &self.caches.explored
    }

    pub fn visible_tiles(&self) -> &BTreeSet<Position> {
        &self.caches.visible
    }

    pub fn is_visible(&self, pos: Position) -> bool {
        self.caches.visible.contains(&pos)
    }

    pub fn is_explored(&self, pos: Position) -> bool {
        self.tile(pos).map_or(false, |t| t.explored)
    }

    /// True when the next field of view refresh has to recompute.
    pub fn needs_fov_refresh(&self, origin: Position, radius: u32) -> bool {
        self.caches.dirty || self.caches.fov_origin != Some((origin, radius))
    }

    /// Forgets the last observer so the next refresh recomputes.
    pub fn invalidate_fov(&mut self) {
        self.caches.dirty = true;
    }

    /// Replaces the visible set. Newly visible tiles become explored.
    pub(crate) fn apply_visibility(&mut self, origin: Position, radius: u32, visible: BTreeSet<Position>) {
        for pos in &self.caches.visible {
            if let Some(i) = self.index(*pos) {
                self.tiles[i].in_view = false;
            }
        }
        for pos in &visible {
            if let Some(i) = self.index(*pos) {
                let tile = &mut self.tiles[i];
                tile.in_view = true;
                tile.explored = true;
            }
        }
        self.caches.explored.extend(visible.iter().copied());
        self.caches.visible = visible;
        self.caches.fov_origin = Some((origin, radius));
        self.caches.dirty = false;
    }

    /// Recomputes every derived structure from the tiles.
    pub fn rebuild_caches(&mut self) {
        self.caches.sight_blockers = self.tiles.iter().map(|t| t.blocks_sight).collect();
        self.caches.explored = self.tiles.iter().filter(|t| t.explored).map(|t| t.position).collect();
        self.caches.visible = self.tiles.iter().filter(|t| t.in_view).map(|t| t.position).collect();
        self.caches.fov_origin = None;
        self.caches.dirty = true;
    }

    /// Stores each tile's 3x3 sight-blocker neighbourhood for wall sprites.
    pub fn compute_textures(&mut self) {
        for i in 0..self.tiles.len() {
            let pos = self.tiles[i].position;
            let mut hash = 0u16;
            let mut bit = 0;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if self.blocks_sight(Position::new(pos.x + dx, pos.y + dy)) {
                        hash |= 1 << bit;
                    }
                    bit += 1;
                }
            }
            self.tiles[i].texture_hash = hash;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_map(width: u32, height: u32) -> Map {
        let mut map = Map::filled(width, height, Material::Dirt, false, TextureSet::Dungeon);
        map.enforce_border();
        map
    }

    #[test]
    fn test_filled_map_dimensions() {
        let map = Map::filled(10, 6, Material::Stone, true, TextureSet::Cave);
        assert_eq!(map.tiles().count(), 60);
        assert!(map.is_blocked(Position::new(3, 3)));
        assert!(map.is_blocked(Position::new(-1, 3)));
        assert!(map.tile(Position::new(10, 0)).is_none());
    }

    #[test]
    fn test_carve_and_fill_keep_sight_in_step() {
        let mut map = Map::filled(5, 5, Material::Stone, true, TextureSet::Dungeon);
        let pos = Position::new(2, 2);

        map.carve(pos, Material::Dirt);
        assert!(!map.is_blocked(pos));
        assert!(!map.blocks_sight(pos));
        assert_eq!(map.tile(pos).unwrap().material(), Material::Dirt);

        map.fill(pos, Material::Stone);
        assert!(map.is_blocked(pos));
        assert!(map.blocks_sight(pos));
    }

    #[test]
    fn test_enforce_border() {
        let map = open_map(6, 6);
        for tile in map.tiles() {
            assert_eq!(map.is_border(tile.position()), tile.is_blocked());
        }
    }

    #[test]
    fn test_circle_tiles() {
        let mut map = open_map(20, 20);
        let center = Position::new(10, 10);
        let circle = map.circle_tiles(center, 1, true, false);
        assert_eq!(circle.len(), 5);
        assert!(circle.contains(&center));

        let ring = map.circle_tiles(center, 1, false, false);
        assert_eq!(ring.len(), 4);

        map.fill(Position::new(11, 10), Material::Stone);
        let open = map.circle_tiles(center, 1, true, true);
        assert_eq!(open.len(), 4);
        assert!(!open.contains(&Position::new(11, 10)));
    }

    #[test]
    fn test_circle_is_clipped_to_map() {
        let map = open_map(5, 5);
        let circle = map.circle_tiles(Position::new(0, 0), 2, true, false);
        assert!(circle.iter().all(|p| map.in_bounds(*p)));
    }

    #[test]
    fn test_structure_change_marks_fov_dirty() {
        let mut map = open_map(10, 10);
        let origin = Position::new(5, 5);
        map.apply_visibility(origin, 3, BTreeSet::from([origin]));
        assert!(!map.needs_fov_refresh(origin, 3));
        assert!(map.needs_fov_refresh(Position::new(4, 5), 3));

        map.fill(Position::new(6, 6), Material::Stone);
        assert!(map.needs_fov_refresh(origin, 3));
    }

    #[test]
    fn test_visibility_keeps_exploration() {
        let mut map = open_map(10, 10);
        let a = Position::new(2, 2);
        let b = Position::new(7, 7);
        map.apply_visibility(a, 1, BTreeSet::from([a]));
        map.apply_visibility(b, 1, BTreeSet::from([b]));

        assert!(!map.tile(a).unwrap().in_view());
        assert!(map.tile(a).unwrap().is_explored());
        assert!(map.tile(b).unwrap().in_view());
        assert_eq!(map.explored_tiles().len(), 2);
        assert_eq!(map.visible_tiles().len(), 1);
    }

    #[test]
    fn test_serde_rebuilds_caches() {
        let mut map = open_map(8, 8);
        let origin = Position::new(3, 3);
        map.apply_visibility(origin, 2, BTreeSet::from([origin, Position::new(4, 3)]));

        let json = serde_json::to_string(&map).unwrap();
        let restored: Map = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, map);
        assert_eq!(restored.visible_tiles(), map.visible_tiles());
        assert_eq!(restored.explored_tiles(), map.explored_tiles());
        assert!(restored.blocks_sight(Position::new(0, 0)));
        assert!(!restored.blocks_sight(origin));
    }

    #[test]
    fn test_texture_hash_marks_walls() {
        let mut map = open_map(5, 5);
        map.compute_textures();
        let corner = map.tile(Position::new(1, 1)).unwrap().texture_hash();
        // top row and left column of the 3x3 are border walls
        assert_eq!(corner & 0b000_000_111, 0b111);
        let center = map.tile(Position::new(2, 2)).unwrap().texture_hash();
        assert_eq!(center, 0);
    }
}
