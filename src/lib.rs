//! # Warrens
//!
//! A turn-based dungeon crawl engine with a thin server layer that lets a local
//! or remote client drive one shared game.
//!
//! ## Architecture Overview
//!
//! - **Game**: levels, actors, effects and the turn loop that resolves one
//!   player intent followed by every monster's reaction
//! - **Generation**: dungeon, cave, town and single-room map generators plus
//!   the item and monster libraries that populate levels
//! - **Server**: the same request/response contract whether the game runs in
//!   process or behind a TCP socket
//!
//! Everything a client sees travels as a versioned [`GameSnapshot`] document,
//! so renderers never touch engine internals.

pub mod config;
pub mod game;
pub mod generation;
pub mod server;
pub mod utils;

pub use config::{EngineConfig, ServerConfig};

pub use game::{
    Actor, ActorId, Ai, Attributes, Character, Chest, Corpse, Direction, Effect, EffectKind,
    EffectScope, Element, Entity, EquipSlot, Game, GameEvent, GameOutcome, GameSnapshot,
    GameStatistics, GameStatus, HitPoints, Intent, Inventory, Item, ItemKind, Level, LevelId,
    LevelKind, LifeState, Map, Material, MessageLog, Portal, Position, Role, Stat, Target, Tile,
    TurnContext, TurnOutcome,
};

pub use generation::{
    CaveGenerator, DungeonGenerator, GenerationConfig, ItemLibrary, Libraries, MapGenerator,
    MonsterLibrary, Room, SingleRoomGenerator, TownGenerator,
};

pub use server::{LocalServer, RemoteServer, Server, TurnResponse};

/// Core error type for the Warrens engine.
#[derive(thiserror::Error, Debug)]
pub enum WarrensError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Game state is invalid
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Action cannot be performed
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Generation failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Catalog lookup or factory failure
    #[error("Library error: {0}")]
    Library(String),

    /// Saved game could not be restored
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration file could not be read
    #[error("Configuration error: {0}")]
    Config(String),

    /// Peer sent something we do not understand
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Connection closed or never established
    #[error("Disconnected: {0}")]
    Disconnected(String),

    /// No answer within the configured time
    #[error("Timed out: {0}")]
    Timeout(String),
}

impl WarrensError {
    /// True for errors that only reject a single intent.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, WarrensError::InvalidAction(_))
    }
}

/// Result type used throughout the Warrens codebase.
pub type WarrensResult<T> = Result<T, WarrensError>;

/// Version information for the engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
