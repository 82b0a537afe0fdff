//! # Utilities Module
//!
//! Dice, weighted choice and map reachability helpers.

pub mod math;
pub mod pathfinding;

pub use self::math::*;
pub use self::pathfinding::*;
