//! # Generation Module
//!
//! Procedural content: map generators for dungeons, caves, towns and single
//! rooms, plus the item and monster libraries that populate them.
//!
//! Every generator takes its randomness from the caller, so a level built
//! from the same seed and configuration always comes out the same.

pub mod catalog;
pub mod cave;
pub mod dungeon;
pub mod encounters;
pub mod items;
pub mod single_room;
pub mod town;

pub use catalog::{Catalog, Libraries};
pub use cave::CaveGenerator;
pub use dungeon::DungeonGenerator;
pub use encounters::MonsterLibrary;
pub use items::ItemLibrary;
pub use single_room::SingleRoomGenerator;
pub use town::TownGenerator;

use crate::game::{Map, Position};
use crate::{WarrensError, WarrensResult};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Configuration for procedural generation.
///
/// Missing fields in a config file fall back to [`GenerationConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Random seed for reproducible generation
    pub seed: u64,
    /// Minimum room size, walls included
    pub min_room_size: u32,
    /// Maximum room size, walls included
    pub max_room_size: u32,
    /// Number of room placement attempts per dungeon level
    pub max_rooms: u32,
    /// Minimum house size, walls included
    pub min_house_size: u32,
    /// Maximum house size, walls included
    pub max_house_size: u32,
    /// Number of house placement attempts per town
    pub max_houses: u32,
    /// Free tiles kept between houses
    pub house_margin: u32,
    /// Free tiles kept between dungeon rooms
    pub room_margin: u32,
    pub cave_min_radius: u32,
    pub cave_max_radius: u32,
    /// Share of the cave interior that must end up as floor
    pub cave_floor_fraction: f64,
}

/// Smallest room side a configuration may ask for.
pub const MIN_ROOM_SIZE: u32 = 3;

/// Smallest map side any generator accepts.
pub const MIN_MAP_SIDE: u32 = 5;

impl GenerationConfig {
    /// Creates a generation configuration with the standard sizes.
    ///
    /// # Examples
    ///
    /// ```
    /// use warrens::GenerationConfig;
    ///
    /// let config = GenerationConfig::new(7);
    /// assert!(config.min_room_size >= 3);
    /// assert!(config.max_room_size >= config.min_room_size);
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            min_room_size: 6,
            max_room_size: 10,
            max_rooms: 30,
            min_house_size: 8,
            max_house_size: 14,
            max_houses: 18,
            house_margin: 2,
            room_margin: 0,
            cave_min_radius: 5,
            cave_max_radius: 10,
            cave_floor_fraction: 0.3,
        }
    }

    /// Creates a configuration for testing with smaller, simpler levels.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            seed,
            min_room_size: 4,
            max_room_size: 8,
            max_rooms: 12,
            min_house_size: 5,
            max_house_size: 7,
            max_houses: 4,
            house_margin: 2,
            room_margin: 0,
            cave_min_radius: 3,
            cave_max_radius: 5,
            cave_floor_fraction: 0.3,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// A rectangle on the map, outline included.
///
/// The interior (`x1 + 1 .. x2`, `y1 + 1 .. y2`) is the walkable part.
///
/// # Examples
///
/// ```
/// use warrens::{Position, Room};
///
/// let room = Room::new(5, 5, 10, 8);
/// assert_eq!(room.center(), Position::new(10, 9));
/// assert_eq!(room.floor_positions().len(), 9 * 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    /// Door tile on the outline, if any
    #[serde(default)]
    pub door: Option<Position>,
}

impl Room {
    /// Room with its top left corner at `(x, y)`, reaching `width` and
    /// `height` tiles further.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x1: x,
            y1: y,
            x2: x + width as i32,
            y2: y + height as i32,
            door: None,
        }
    }

    pub fn center(&self) -> Position {
        Position::new((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    /// True when the rooms touch or overlap once grown by `margin`.
    pub fn intersects(&self, other: &Room, margin: u32) -> bool {
        let m = margin as i32;
        self.x1 - m <= other.x2 && self.x2 + m >= other.x1 && self.y1 - m <= other.y2 && self.y2 + m >= other.y1
    }

    pub fn contains(&self, pos: Position) -> bool {
        (self.x1..=self.x2).contains(&pos.x) && (self.y1..=self.y2).contains(&pos.y)
    }

    pub fn is_outline(&self, pos: Position) -> bool {
        self.contains(pos) && (pos.x == self.x1 || pos.x == self.x2 || pos.y == self.y1 || pos.y == self.y2)
    }

    /// Interior tiles, row by row.
    pub fn floor_positions(&self) -> Vec<Position> {
        let mut positions = Vec::new();
        for y in (self.y1 + 1)..self.y2 {
            for x in (self.x1 + 1)..self.x2 {
                positions.push(Position::new(x, y));
            }
        }
        positions
    }

    /// Outline tiles that are not corners.
    pub fn door_candidates(&self) -> Vec<Position> {
        let mut positions = Vec::new();
        for x in (self.x1 + 1)..self.x2 {
            positions.push(Position::new(x, self.y1));
            positions.push(Position::new(x, self.y2));
        }
        for y in (self.y1 + 1)..self.y2 {
            positions.push(Position::new(self.x1, y));
            positions.push(Position::new(self.x2, y));
        }
        positions
    }
}

/// Common interface for map generators.
pub trait MapGenerator {
    /// Builds a finished map: border blocked, textures assigned, entry and
    /// exit set and connected.
    fn generate_map(&self, width: u32, height: u32, config: &GenerationConfig, rng: &mut StdRng) -> WarrensResult<Map>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;

    /// Checks the structural guarantees every generated map must meet.
    fn validate(&self, map: &Map) -> WarrensResult<()> {
        utils::validate_map(map)
    }
}

/// Utility functions shared by the generators.
pub mod utils {
    use super::*;
    use crate::utils::pathfinding::is_reachable;
    use rand::SeedableRng;

    /// Creates a seeded random number generator from the config.
    pub fn create_rng(config: &GenerationConfig) -> StdRng {
        StdRng::seed_from_u64(config.seed)
    }

    /// Fails unless the map is big enough to hold at least two rooms side
    /// by side.
    pub fn check_size(width: u32, height: u32, config: &GenerationConfig) -> WarrensResult<()> {
        let min = (2 * config.min_room_size).max(MIN_MAP_SIDE);
        if width < min || height < min {
            return Err(WarrensError::GenerationFailed(format!(
                "Requested size {}x{} is too small, need at least {}x{}",
                width, height, min, min
            )));
        }
        Ok(())
    }

    /// Border blocked, entry and exit open and connected.
    pub fn validate_map(map: &Map) -> WarrensResult<()> {
        let border_open = map.tiles().any(|t| map.is_border(t.position()) && !t.is_blocked());
        if border_open {
            return Err(WarrensError::GenerationFailed("Map border is not blocked".to_string()));
        }
        for (name, pos) in [("entry", map.entry), ("exit", map.exit)] {
            if map.is_blocked(pos) {
                return Err(WarrensError::GenerationFailed(format!("Map {} {} is blocked", name, pos)));
            }
        }
        if !is_reachable(map, map.entry, map.exit) {
            return Err(WarrensError::GenerationFailed(format!(
                "Exit {} can not be reached from entry {}",
                map.exit, map.entry
            )));
        }
        Ok(())
    }

    /// Final touches shared by all generators.
    pub fn finish(generator: &dyn MapGenerator, mut map: Map) -> WarrensResult<Map> {
        map.enforce_border();
        map.compute_textures();
        generator.validate(&map)?;
        log::debug!(
            "{} generated {}x{} map, {:.0}% open",
            generator.generator_type(),
            map.width(),
            map.height(),
            map.open_fraction() * 100.0
        );
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_config_creation() {
        let config = GenerationConfig::new(12345);
        assert_eq!(config.seed, 12345);
        assert!(config.min_room_size >= 3);
        assert!(config.max_room_size >= config.min_room_size);
        assert!(config.min_house_size <= config.max_house_size);
    }

    #[test]
    fn test_room_geometry() {
        let room = Room::new(5, 5, 10, 8);
        assert_eq!(room.center(), Position::new(10, 9));
        assert!(room.contains(Position::new(15, 13)));
        assert!(!room.contains(Position::new(16, 13)));
        assert!(room.is_outline(Position::new(5, 7)));
        assert!(!room.is_outline(Position::new(7, 7)));
    }

    #[test]
    fn test_room_intersection_is_inclusive() {
        let room = Room::new(0, 0, 5, 5);
        let touching = Room::new(5, 0, 5, 5);
        let apart = Room::new(7, 0, 5, 5);

        assert!(room.intersects(&touching, 0));
        assert!(!room.intersects(&apart, 0));
        assert!(room.intersects(&apart, 2));
        assert!(!room.intersects(&apart, 1));
    }

    #[test]
    fn test_door_candidates_skip_corners() {
        let room = Room::new(0, 0, 4, 4);
        let doors = room.door_candidates();
        assert_eq!(doors.len(), 12);
        assert!(!doors.contains(&Position::new(0, 0)));
        assert!(doors.iter().all(|p| room.is_outline(*p)));
    }

    #[test]
    fn test_too_small_map_is_rejected() {
        let config = GenerationConfig::for_testing(1);
        assert!(utils::check_size(7, 40, &config).is_err());
        assert!(utils::check_size(8, 8, &config).is_ok());
    }
}
