//! Dice and probability helpers.

use crate::WarrensError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dice expression such as `2d6`.
///
/// ```
/// use warrens::utils::math::HitDie;
///
/// let die: HitDie = "3d8".parse().unwrap();
/// assert_eq!(die.count, 3);
/// assert_eq!(die.max_roll(), 24);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HitDie {
    pub count: u32,
    pub sides: u32,
}

impl HitDie {
    pub fn new(count: u32, sides: u32) -> Self {
        Self { count, sides }
    }

    /// Sum of `count` rolls of a `sides`-sided die.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        if self.sides == 0 {
            return 0;
        }
        (0..self.count).map(|_| rng.gen_range(1..=self.sides) as i32).sum()
    }

    pub fn max_roll(&self) -> i32 {
        (self.count * self.sides) as i32
    }

    /// Same die with extra dice thrown in.
    pub fn with_extra_dice(self, extra: u32) -> Self {
        Self::new(self.count + extra, self.sides)
    }
}

impl FromStr for HitDie {
    type Err = WarrensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || WarrensError::Library(format!("invalid hit die '{}'", s));
        let (count, sides) = s.trim().split_once('d').ok_or_else(invalid)?;
        let count = count.parse().map_err(|_| invalid())?;
        let sides = sides.parse().map_err(|_| invalid())?;
        Ok(Self::new(count, sides))
    }
}

impl TryFrom<String> for HitDie {
    type Error = WarrensError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HitDie> for String {
    fn from(die: HitDie) -> Self {
        die.to_string()
    }
}

impl fmt::Display for HitDie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)
    }
}

/// Rolls a percentile die and checks it against `chance` (0-100).
pub fn percent_check<R: Rng + ?Sized>(rng: &mut R, chance: i32) -> (bool, i32) {
    let roll = rng.gen_range(1..=100);
    (roll <= chance, roll)
}

/// Picks an index with probability proportional to its weight.
///
/// Returns `None` when all weights are zero.
pub fn weighted_index<R: Rng + ?Sized>(rng: &mut R, weights: &[u64]) -> Option<usize> {
    let total: u64 = weights.iter().sum();
    if total == 0 {
        return None;
    }
    let mut pick = rng.gen_range(0..total);
    for (i, weight) in weights.iter().enumerate() {
        if pick < *weight {
            return Some(i);
        }
        pick -= weight;
    }
    None
}
