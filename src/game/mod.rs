//! # Game Module
//!
//! The simulation itself: maps and visibility, actors, effects, AI and the
//! turn loop that ties them together.
//!
//! - [`map`] and [`fov`]: the tile grid and what the player can see
//! - [`actors`], [`items`], [`effects`], [`ai`], [`combat`]: things on tiles
//!   and the rules between them
//! - [`level`]: one map plus its actors, with the tile/actor index
//! - [`state`]: the [`Game`] that owns levels, player and scheduler

pub mod actions;
pub mod actors;
pub mod ai;
pub mod combat;
pub mod context;
pub mod effects;
pub mod fov;
pub mod items;
pub mod level;
pub mod map;
pub mod snapshot;
pub mod state;

pub use actions::{Intent, Target};
pub use actors::{
    Actor, ActorKind, Attributes, Character, Chest, Corpse, Entity, HitPoints, LifeState, Portal,
    PortalLink, Progression, Role, Stat,
};
pub use ai::Ai;
pub use context::{GameEvent, MessageLog, TurnContext};
pub use effects::{Effect, EffectKind, EffectScope, Element};
pub use items::{ConsumableSpec, EquipSlot, HitDie, Inventory, Item, ItemKind, ItemModifier};
pub use level::{Level, LevelKind};
pub use map::{Map, Material, TextureSet, Tile};
pub use snapshot::GameSnapshot;
pub use state::{Game, GameOutcome, GameStatistics, GameStatus, TurnOutcome};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tile coordinate on a map.
///
/// # Examples
///
/// ```
/// use warrens::Position;
///
/// let pos = Position::new(10, 5);
/// assert_eq!(pos.chebyshev_distance(Position::new(12, 9)), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Number of king moves between two positions.
    pub fn chebyshev_distance(self, other: Position) -> u32 {
        (self.x - other.x).unsigned_abs().max((self.y - other.y).unsigned_abs())
    }

    pub fn euclidean_distance(self, other: Position) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// True when the positions touch, diagonals included.
    pub fn is_adjacent(self, other: Position) -> bool {
        self != other && self.chebyshev_distance(other) == 1
    }

    /// The position one step away in `direction`.
    pub fn step(self, direction: Direction) -> Position {
        self + direction.to_delta()
    }

    /// All 8 neighbours, in [`Direction::all`] order.
    pub fn neighbors(self) -> impl Iterator<Item = Position> {
        Direction::all().into_iter().map(move |d| self.step(d))
    }
}

impl std::ops::Add for Position {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Position {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Directions for movement and attacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
    Northeast,
    Northwest,
    Southeast,
    Southwest,
}

impl Direction {
    /// Converts a direction to a position delta.
    ///
    /// ```
    /// use warrens::{Direction, Position};
    ///
    /// assert_eq!(Direction::North.to_delta(), Position::new(0, -1));
    /// ```
    pub fn to_delta(self) -> Position {
        match self {
            Direction::North => Position::new(0, -1),
            Direction::South => Position::new(0, 1),
            Direction::East => Position::new(1, 0),
            Direction::West => Position::new(-1, 0),
            Direction::Northeast => Position::new(1, -1),
            Direction::Northwest => Position::new(-1, -1),
            Direction::Southeast => Position::new(1, 1),
            Direction::Southwest => Position::new(-1, 1),
        }
    }

    /// Converts a unit delta back to a direction.
    pub fn from_delta(delta: Position) -> Option<Direction> {
        match (delta.x, delta.y) {
            (0, -1) => Some(Direction::North),
            (0, 1) => Some(Direction::South),
            (1, 0) => Some(Direction::East),
            (-1, 0) => Some(Direction::West),
            (1, -1) => Some(Direction::Northeast),
            (-1, -1) => Some(Direction::Northwest),
            (1, 1) => Some(Direction::Southeast),
            (-1, 1) => Some(Direction::Southwest),
            _ => None,
        }
    }

    /// Direction of a single step from `from` toward `to`.
    pub fn toward(from: Position, to: Position) -> Option<Direction> {
        let delta = to - from;
        Self::from_delta(Position::new(delta.x.signum(), delta.y.signum()))
    }

    /// Parses the short compass names used on the command line.
    pub fn from_short_name(name: &str) -> Option<Direction> {
        match name {
            "n" => Some(Direction::North),
            "s" => Some(Direction::South),
            "e" => Some(Direction::East),
            "w" => Some(Direction::West),
            "ne" => Some(Direction::Northeast),
            "nw" => Some(Direction::Northwest),
            "se" => Some(Direction::Southeast),
            "sw" => Some(Direction::Southwest),
            _ => None,
        }
    }

    pub fn all() -> [Direction; 8] {
        [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
            Direction::Northeast,
            Direction::Northwest,
            Direction::Southeast,
            Direction::Southwest,
        ]
    }
}

/// Unique identifier for actors.
pub type ActorId = Uuid;

/// Creates a new unique actor ID.
pub fn new_actor_id() -> ActorId {
    Uuid::new_v4()
}

/// Index of a level inside the game's level arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelId(pub usize);

impl std::fmt::Display for LevelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "level#{}", self.0)
    }
}
