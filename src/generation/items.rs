//! # Item Library
//!
//! Creates items from catalog templates, optionally with a modifier, and
//! draws random loot for a given item level.

use crate::game::actors::ActorInfo;
use crate::game::{Attributes, Item, ItemKind, ItemModifier};
use crate::generation::catalog::LevelIndex;
use crate::{WarrensError, WarrensResult};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Catalog entry for one kind of item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTemplate {
    pub key: String,
    pub name: String,
    pub glyph: char,
    pub color: [u8; 3],
    pub sprite: String,
    pub item_level: u32,
    pub kind: ItemKind,
    #[serde(default)]
    pub bonuses: Attributes,
    #[serde(default = "single")]
    pub max_stack: u32,
    #[serde(default)]
    pub flavor: String,
}

fn single() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ItemLibraryDocument", into = "ItemLibraryDocument")]
pub struct ItemLibrary {
    templates: BTreeMap<String, ItemTemplate>,
    modifiers: BTreeMap<String, ItemModifier>,
    by_level: LevelIndex,
}

#[derive(Serialize, Deserialize)]
struct ItemLibraryDocument {
    templates: BTreeMap<String, ItemTemplate>,
    modifiers: BTreeMap<String, ItemModifier>,
}

impl From<ItemLibraryDocument> for ItemLibrary {
    fn from(doc: ItemLibraryDocument) -> Self {
        Self::from_maps(doc.templates, doc.modifiers)
    }
}

impl From<ItemLibrary> for ItemLibraryDocument {
    fn from(library: ItemLibrary) -> Self {
        ItemLibraryDocument {
            templates: library.templates,
            modifiers: library.modifiers,
        }
    }
}

impl ItemLibrary {
    pub fn new(templates: Vec<ItemTemplate>, modifiers: Vec<ItemModifier>) -> Self {
        Self::from_maps(
            templates.into_iter().map(|t| (t.key.clone(), t)).collect(),
            modifiers.into_iter().map(|m| (m.key.clone(), m)).collect(),
        )
    }

    fn from_maps(templates: BTreeMap<String, ItemTemplate>, modifiers: BTreeMap<String, ItemModifier>) -> Self {
        let by_level = LevelIndex::build(templates.values().map(|t| (t.item_level, t.key.as_str())));
        Self {
            templates,
            modifiers,
            by_level,
        }
    }

    pub fn available_items(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn template(&self, key: &str) -> Option<&ItemTemplate> {
        self.templates.get(key)
    }

    /// Modifier keys that can be applied to the given item.
    pub fn available_modifiers_for_item(&self, key: &str) -> WarrensResult<Vec<&str>> {
        let template = self.lookup(key)?;
        Ok(self
            .modifiers
            .values()
            .filter(|m| m.fits(&template.kind))
            .map(|m| m.key.as_str())
            .collect())
    }

    /// Maximum number of items per room.
    pub fn max_items_per_room(difficulty: u32) -> u32 {
        (difficulty / 2).max(1)
    }

    pub fn create_item(&self, key: &str) -> WarrensResult<Item> {
        let template = self.lookup(key)?;
        let mut info = ActorInfo::new(
            &template.key,
            &template.name,
            template.glyph,
            template.color,
            &template.sprite,
        );
        info.flavor = template.flavor.clone();
        Ok(Item {
            info,
            item_level: template.item_level,
            kind: template.kind.clone(),
            bonuses: template.bonuses,
            modifiers: Vec::new(),
            stack_size: 1,
            max_stack: template.max_stack.max(1),
        })
    }

    pub fn create_item_with_modifier(&self, key: &str, modifier_key: &str) -> WarrensResult<Item> {
        let mut item = self.create_item(key)?;
        let modifier = self
            .modifiers
            .get(modifier_key)
            .ok_or_else(|| WarrensError::Library(format!("Unknown item modifier '{}'", modifier_key)))?;
        if !modifier.fits(&item.kind) {
            return Err(WarrensError::Library(format!(
                "Incompatible item modifier type, can not apply {} to {}",
                modifier_key, key
            )));
        }
        item.modifiers.push(modifier.clone());
        Ok(item)
    }

    /// Random item of level `max_level` or below, lower levels more likely.
    ///
    /// The item gets a compatible modifier of level
    /// `max_level - item_level + 1` or below. Curses always qualify.
    pub fn get_random_item<R: Rng + ?Sized>(&self, rng: &mut R, max_level: u32) -> WarrensResult<Item> {
        let key = self.by_level.pick(rng, max_level).ok_or_else(|| {
            WarrensError::Library(format!("No items available at or below level {}", max_level))
        })?;
        let mut item = self.create_item(key)?;

        let max_modifier_level = i64::from(max_level) - i64::from(item.item_level) + 1;
        if max_modifier_level > 0 {
            let candidates: Vec<&ItemModifier> = self
                .modifiers
                .values()
                .filter(|m| m.fits(&item.kind) && i64::from(m.level) <= max_modifier_level)
                .collect();
            if let Some(modifier) = candidates.choose(rng) {
                item.modifiers.push((*modifier).clone());
            }
        }
        Ok(item)
    }

    fn lookup(&self, key: &str) -> WarrensResult<&ItemTemplate> {
        self.templates
            .get(key)
            .ok_or_else(|| WarrensError::Library(format!("Unknown item '{}'", key)))
    }
}
