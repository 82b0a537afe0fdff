//! # Configuration
//!
//! Rule constants and the runtime [`EngineConfig`], which can be read from a
//! TOML file. Every field has a default so partial files are fine.

use crate::generation::{GenerationConfig, MIN_MAP_SIDE, MIN_ROOM_SIZE};
use crate::{WarrensError, WarrensResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default map width in tiles
pub const DEFAULT_MAP_WIDTH: u32 = 80;

/// Default map height in tiles
pub const DEFAULT_MAP_HEIGHT: u32 = 50;

/// Sight radius underground
pub const TORCH_RADIUS: u32 = 10;

/// Sight radius in the open
pub const DAYLIGHT_RADIUS: u32 = 30;

/// Messages kept for the client
pub const MESSAGE_BUFFER_LENGTH: usize = 5;

/// Game events held until the hub delivers them to clients
pub const EVENT_QUEUE_SIZE: usize = 20;

/// Experience needed for the first level up
pub const XP_BASE: f64 = 300.0;

/// Growth of the experience curve
pub const XP_FACTOR: f64 = 1.3;

/// Attribute points gained per level
pub const LEVEL_UP_ATTRIBUTE_GAIN: i32 = 10;

/// Player hit points per point of body
pub const PLAYER_HITPOINT_FACTOR: i32 = 5;

/// How far a basic monster notices the player
pub const MONSTER_PERCEPTION_RANGE: f64 = 8.0;

/// Number of dungeon levels below the town
pub const DEFAULT_DUNGEON_DEPTH: u32 = 9;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub map_width: u32,
    pub map_height: u32,
    pub dungeon_depth: u32,
    pub torch_radius: u32,
    pub daylight_radius: u32,
    pub message_buffer_length: usize,
    pub event_queue_size: usize,
    /// Start with a chest of extra gear next to the player
    pub quick_start: bool,
    pub generation: GenerationConfig,
    pub server: ServerConfig,
}

impl EngineConfig {
    /// Small maps and a shallow dungeon, used by the test suite.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            map_width: 40,
            map_height: 30,
            dungeon_depth: 2,
            quick_start: false,
            generation: GenerationConfig::for_testing(seed),
            ..Self::default()
        }
    }

    /// Reads a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> WarrensResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
            .map_err(|e| WarrensError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(text: &str) -> WarrensResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| WarrensError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine cannot work with.
    pub fn validate(&self) -> WarrensResult<()> {
        if self.message_buffer_length == 0 {
            return Err(WarrensError::Config(
                "message_buffer_length must be at least 1".to_string(),
            ));
        }
        if self.generation.min_room_size < MIN_ROOM_SIZE {
            return Err(WarrensError::Config(format!(
                "min_room_size must be at least {}",
                MIN_ROOM_SIZE
            )));
        }
        let min_side = (2 * self.generation.min_room_size).max(MIN_MAP_SIDE);
        if self.map_width < min_side || self.map_height < min_side {
            return Err(WarrensError::Config(format!(
                "map of {}x{} is too small, need at least {}x{}",
                self.map_width, self.map_height, min_side, min_side
            )));
        }
        if self.generation.min_room_size > self.generation.max_room_size {
            return Err(WarrensError::Config(
                "min_room_size exceeds max_room_size".to_string(),
            ));
        }
        if self.generation.min_house_size > self.generation.max_house_size {
            return Err(WarrensError::Config(
                "min_house_size exceeds max_house_size".to_string(),
            ));
        }
        Ok(())
    }

    /// Seed used for everything random in a new game.
    pub fn seed(&self) -> u64 {
        self.generation.seed
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            map_width: DEFAULT_MAP_WIDTH,
            map_height: DEFAULT_MAP_HEIGHT,
            dungeon_depth: DEFAULT_DUNGEON_DEPTH,
            torch_radius: TORCH_RADIUS,
            daylight_radius: DAYLIGHT_RADIUS,
            message_buffer_length: MESSAGE_BUFFER_LENGTH,
            event_queue_size: EVENT_QUEUE_SIZE,
            quick_start: true,
            generation: GenerationConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Network settings for hosting and joining games.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub response_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl ServerConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7878".to_string(),
            response_timeout_ms: 5000,
            connect_timeout_ms: 3000,
        }
    }
}
