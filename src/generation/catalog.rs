//! # Catalog
//!
//! The data behind the item and monster libraries. A catalog ships inside
//! the binary and can be swapped for a JSON file on disk.

use crate::generation::encounters::{MonsterLibrary, MonsterTemplate};
use crate::generation::items::{ItemLibrary, ItemTemplate};
use crate::game::ItemModifier;
use crate::utils::math::weighted_index;
use crate::{WarrensError, WarrensResult};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

const EMBEDDED_CATALOG: &str = include_str!("../../data/catalog.json");

/// Raw catalog document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub monsters: Vec<MonsterTemplate>,
    pub items: Vec<ItemTemplate>,
    #[serde(default)]
    pub modifiers: Vec<ItemModifier>,
}

impl Catalog {
    /// The catalog compiled into the binary.
    pub fn embedded() -> WarrensResult<Self> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    pub fn from_json(json: &str) -> WarrensResult<Self> {
        let catalog: Catalog =
            serde_json::from_str(json).map_err(|e| WarrensError::Library(format!("Invalid catalog: {}", e)))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> WarrensResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        log::info!("Loading catalog from {}", path.display());
        Self::from_json(&json)
    }

    /// Keys must be unique within each section.
    pub fn validate(&self) -> WarrensResult<()> {
        check_unique("monster", self.monsters.iter().map(|m| m.key.as_str()))?;
        check_unique("item", self.items.iter().map(|i| i.key.as_str()))?;
        check_unique("modifier", self.modifiers.iter().map(|m| m.key.as_str()))?;
        if let Some(item) = self.items.iter().find(|i| i.item_level == 0) {
            return Err(WarrensError::Library(format!("Item '{}' has level 0", item.key)));
        }
        if let Some(monster) = self.monsters.iter().find(|m| m.challenge_rating == 0) {
            return Err(WarrensError::Library(format!(
                "Monster '{}' has challenge rating 0",
                monster.key
            )));
        }
        Ok(())
    }
}

fn check_unique<'a>(section: &str, keys: impl Iterator<Item = &'a str>) -> WarrensResult<()> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(WarrensError::Library(format!("Duplicate {} key '{}'", section, key)));
        }
    }
    Ok(())
}

/// Template keys bucketed by level, built once per library.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelIndex {
    buckets: BTreeMap<u32, Vec<String>>,
}

impl LevelIndex {
    pub fn build<'a>(entries: impl IntoIterator<Item = (u32, &'a str)>) -> Self {
        let mut index = Self::default();
        for (level, key) in entries {
            index.insert(level, key);
        }
        index
    }

    pub fn insert(&mut self, level: u32, key: &str) {
        self.buckets.entry(level).or_default().push(key.to_string());
    }

    /// Empty buckets are dropped so they never take part in a draw.
    pub fn remove(&mut self, level: u32, key: &str) {
        if let Some(bucket) = self.buckets.get_mut(&level) {
            bucket.retain(|k| k != key);
            if bucket.is_empty() {
                self.buckets.remove(&level);
            }
        }
    }

    pub fn bucket(&self, level: u32) -> &[String] {
        self.buckets.get(&level).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Picks one key among level buckets `1..=max_level`.
    ///
    /// Bucket `L` is chosen with weight `max_level - L + 1`, then a key is
    /// drawn uniformly from it. Cost depends on the number of buckets, not
    /// on `max_level`.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R, max_level: u32) -> Option<&str> {
        if max_level == 0 {
            return None;
        }
        let candidates: Vec<(&u32, &Vec<String>)> = self.buckets.range(1..=max_level).collect();
        let weights: Vec<u64> = candidates
            .iter()
            .map(|(level, _)| u64::from(max_level - **level) + 1)
            .collect();
        let (_, bucket) = candidates[weighted_index(rng, &weights)?];
        bucket.choose(rng).map(String::as_str)
    }
}

/// Both factories, saved together with the game so spawned uniques stay
/// spawned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Libraries {
    pub items: ItemLibrary,
    pub monsters: MonsterLibrary,
}

impl Libraries {
    pub fn from_catalog(catalog: Catalog) -> Self {
        Self {
            items: ItemLibrary::new(catalog.items, catalog.modifiers),
            monsters: MonsterLibrary::new(catalog.monsters),
        }
    }

    /// Libraries over the embedded catalog.
    pub fn standard() -> WarrensResult<Self> {
        Ok(Self::from_catalog(Catalog::embedded()?))
    }
}
