//! # Items and Inventory
//!
//! Consumables stack, equipment does not. Modifiers add flat stat bonuses to
//! equipment and strengthen the effect of consumables.

use crate::game::actors::{ActorInfo, Attributes, Entity, Stat};
use crate::game::effects::{EffectKind, Element, TargetMode};
use crate::game::ActorId;
use crate::{WarrensError, WarrensResult};
use serde::{Deserialize, Serialize};

pub use crate::utils::math::HitDie;

/// Slot categories; at most one equipped item per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Weapon,
    Shield,
    Body,
    Ring,
}

/// What using a consumable does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumableSpec {
    pub effect: EffectKind,
    pub target: TargetMode,
    #[serde(default)]
    pub radius: u32,
    pub hit_die: HitDie,
    #[serde(default)]
    pub duration: u32,
    pub element: Element,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    Consumable(ConsumableSpec),
    Equipment {
        slot: EquipSlot,
        #[serde(default)]
        equipped: bool,
    },
}

/// Which item kinds a modifier fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierTarget {
    Consumable,
    Equipment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffixPlacement {
    Prefix,
    Suffix,
}

/// A named tweak applied to an item, e.g. "sharp" or "of fire".
///
/// Negative levels mark curses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemModifier {
    pub key: String,
    pub name: String,
    pub placement: AffixPlacement,
    pub applies_to: ModifierTarget,
    pub level: i32,
    #[serde(default)]
    pub bonuses: Attributes,
    #[serde(default)]
    pub extra_radius: u32,
    #[serde(default)]
    pub extra_dice: u32,
    #[serde(default = "one")]
    pub duration_factor: u32,
    #[serde(default)]
    pub element: Option<Element>,
}

fn one() -> u32 {
    1
}

impl ItemModifier {
    pub fn fits(&self, kind: &ItemKind) -> bool {
        matches!(
            (self.applies_to, kind),
            (ModifierTarget::Consumable, ItemKind::Consumable(_))
                | (ModifierTarget::Equipment, ItemKind::Equipment { .. })
        )
    }
}

/// An item lying on a tile or held in an inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub info: ActorInfo,
    pub item_level: u32,
    pub kind: ItemKind,
    #[serde(default)]
    pub bonuses: Attributes,
    #[serde(default)]
    pub modifiers: Vec<ItemModifier>,
    pub stack_size: u32,
    pub max_stack: u32,
}

impl Item {
    pub fn is_stackable(&self) -> bool {
        matches!(self.kind, ItemKind::Consumable(_)) && self.max_stack > 1
    }

    /// Same key and same modifiers, so one stack can hold both.
    pub fn can_stack_with(&self, other: &Item) -> bool {
        self.is_stackable()
            && self.info.key == other.info.key
            && self.modifier_keys() == other.modifier_keys()
    }

    fn modifier_keys(&self) -> Vec<&str> {
        self.modifiers.iter().map(|m| m.key.as_str()).collect()
    }

    pub fn slot(&self) -> Option<EquipSlot> {
        match self.kind {
            ItemKind::Equipment { slot, .. } => Some(slot),
            ItemKind::Consumable(_) => None,
        }
    }

    pub fn is_equipped(&self) -> bool {
        matches!(self.kind, ItemKind::Equipment { equipped: true, .. })
    }

    fn set_equipped(&mut self, value: bool) {
        if let ItemKind::Equipment { equipped, .. } = &mut self.kind {
            *equipped = value;
        }
    }

    /// Item bonus plus every modifier bonus for one stat.
    pub fn bonus(&self, stat: Stat) -> i32 {
        self.bonuses.get(stat) + self.modifiers.iter().map(|m| m.bonuses.get(stat)).sum::<i32>()
    }

    /// Consumable effect with every modifier folded in.
    pub fn effective_consumable(&self) -> Option<ConsumableSpec> {
        let ItemKind::Consumable(base) = &self.kind else {
            return None;
        };
        let mut spec = *base;
        for modifier in &self.modifiers {
            spec.radius += modifier.extra_radius;
            spec.hit_die = spec.hit_die.with_extra_dice(modifier.extra_dice);
            spec.duration *= modifier.duration_factor;
            if let Some(element) = modifier.element {
                spec.element = element;
            }
        }
        Some(spec)
    }

    /// Name with prefixes and suffixes, plus the stack count.
    pub fn display_name(&self) -> String {
        let mut parts = Vec::new();
        for m in self.modifiers.iter().filter(|m| m.placement == AffixPlacement::Prefix) {
            parts.push(m.name.clone());
        }
        parts.push(self.info.name.clone());
        for m in self.modifiers.iter().filter(|m| m.placement == AffixPlacement::Suffix) {
            parts.push(m.name.clone());
        }
        let name = parts.join(" ");
        if self.stack_size > 1 {
            format!("{} (x{})", name, self.stack_size)
        } else {
            name
        }
    }
}

impl Entity for Item {
    fn info(&self) -> &ActorInfo {
        &self.info
    }

    fn name(&self) -> String {
        self.display_name()
    }
}

/// Ordered item stacks held by a character or chest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<Item>,
}

impl Inventory {
    /// Adds an item, topping up matching stacks before starting a new one.
    pub fn add(&mut self, mut item: Item) {
        if item.is_stackable() {
            let matching: Vec<usize> = (0..self.items.len())
                .filter(|&i| self.items[i].can_stack_with(&item))
                .collect();
            for index in matching {
                let stack = &mut self.items[index];
                let room = stack.max_stack.saturating_sub(stack.stack_size);
                let moved = room.min(item.stack_size);
                stack.stack_size += moved;
                item.stack_size -= moved;
                if item.stack_size == 0 {
                    return;
                }
            }
            while item.stack_size > item.max_stack {
                let mut full = item.clone();
                full.info.id = crate::game::new_actor_id();
                full.stack_size = item.max_stack;
                item.stack_size -= item.max_stack;
                self.items.push(full);
            }
        }
        self.items.push(item);
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ActorId) -> Option<&Item> {
        self.items.iter().find(|i| i.info.id == id)
    }

    /// Looks up an entry by its position in the list.
    pub fn at(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    /// Removes a whole stack.
    pub fn remove(&mut self, id: ActorId) -> Option<Item> {
        let index = self.items.iter().position(|i| i.info.id == id)?;
        Some(self.items.remove(index))
    }

    /// Takes one unit off a stack, removing the entry when it runs out.
    pub fn take_one(&mut self, id: ActorId) -> Option<Item> {
        let index = self.items.iter().position(|i| i.info.id == id)?;
        if self.items[index].stack_size > 1 {
            let stack = &mut self.items[index];
            stack.stack_size -= 1;
            let mut single = stack.clone();
            single.info.id = crate::game::new_actor_id();
            single.stack_size = 1;
            Some(single)
        } else {
            Some(self.items.remove(index))
        }
    }

    /// Empties the inventory.
    pub fn drain(&mut self) -> Vec<Item> {
        std::mem::take(&mut self.items)
    }

    pub fn equipped(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|i| i.is_equipped())
    }

    /// Equips an item, unequipping whatever held its slot.
    ///
    /// Returns the id of the item that was displaced, if any.
    pub fn equip(&mut self, id: ActorId) -> WarrensResult<Option<ActorId>> {
        let item = self
            .get(id)
            .ok_or_else(|| WarrensError::InvalidAction("No such item in inventory".to_string()))?;
        let slot = item.slot().ok_or_else(|| {
            WarrensError::InvalidAction(format!("{} can not be equipped", item.display_name()))
        })?;
        if item.is_equipped() {
            return Ok(None);
        }

        let mut displaced = None;
        for other in self.items.iter_mut() {
            if other.is_equipped() && other.slot() == Some(slot) {
                other.set_equipped(false);
                displaced = Some(other.info.id);
            }
        }
        if let Some(item) = self.items.iter_mut().find(|i| i.info.id == id) {
            item.set_equipped(true);
        }
        Ok(displaced)
    }

    pub fn unequip(&mut self, id: ActorId) -> WarrensResult<()> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.info.id == id)
            .ok_or_else(|| WarrensError::InvalidAction("No such item in inventory".to_string()))?;
        if !item.is_equipped() {
            return Err(WarrensError::InvalidAction(format!(
                "{} is not equipped",
                item.display_name()
            )));
        }
        item.set_equipped(false);
        Ok(())
    }

    /// Sum of one stat over all equipped items.
    pub fn equipment_bonus(&self, stat: Stat) -> i32 {
        self.equipped().map(|i| i.bonus(stat)).sum()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn potion(stack: u32) -> Item {
        Item {
            info: ActorInfo::new("healingvial", "healing vial", '!', [255, 0, 0], "healingvial"),
            item_level: 1,
            kind: ItemKind::Consumable(ConsumableSpec {
                effect: EffectKind::Heal,
                target: TargetMode::SelfTarget,
                radius: 0,
                hit_die: HitDie::new(1, 8),
                duration: 0,
                element: Element::Heal,
            }),
            bonuses: Attributes::default(),
            modifiers: Vec::new(),
            stack_size: stack,
            max_stack: 5,
        }
    }

    pub(crate) fn gear(key: &str, slot: EquipSlot, damage: i32) -> Item {
        Item {
            info: ActorInfo::new(key, key, '/', [200, 200, 200], key),
            item_level: 1,
            kind: ItemKind::Equipment {
                slot,
                equipped: false,
            },
            bonuses: Attributes {
                damage,
                ..Attributes::default()
            },
            modifiers: Vec::new(),
            stack_size: 1,
            max_stack: 1,
        }
    }

    fn modifier(key: &str, applies_to: ModifierTarget) -> ItemModifier {
        ItemModifier {
            key: key.to_string(),
            name: key.to_string(),
            placement: AffixPlacement::Prefix,
            applies_to,
            level: 1,
            bonuses: Attributes {
                damage: 3,
                ..Attributes::default()
            },
            extra_radius: 1,
            extra_dice: 1,
            duration_factor: 2,
            element: Some(Element::Fire),
        }
    }

    #[test]
    fn test_stacking_fills_then_overflows() {
        let mut inventory = Inventory::default();
        inventory.add(potion(1));
        inventory.add(potion(1));
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.items()[0].stack_size, 2);

        inventory.add(potion(3));
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.items()[0].stack_size, 5);

        inventory.add(potion(1));
        assert_eq!(inventory.len(), 2);
        assert_eq!(inventory.items()[1].stack_size, 1);
    }

    #[test]
    fn test_modified_items_do_not_stack_with_plain_ones() {
        let mut inventory = Inventory::default();
        inventory.add(potion(1));
        let mut strong = potion(1);
        strong.modifiers.push(modifier("strong", ModifierTarget::Consumable));
        inventory.add(strong);
        assert_eq!(inventory.len(), 2);
    }

    #[test]
    fn test_take_one_splits_stack() {
        let mut inventory = Inventory::default();
        inventory.add(potion(2));
        let id = inventory.items()[0].info.id;

        let single = inventory.take_one(id).unwrap();
        assert_eq!(single.stack_size, 1);
        assert_ne!(single.info.id, id);
        assert_eq!(inventory.get(id).unwrap().stack_size, 1);

        inventory.take_one(id).unwrap();
        assert!(inventory.is_empty());
        assert!(inventory.take_one(id).is_none());
    }

    #[test]
    fn test_equip_swaps_within_slot() {
        let mut inventory = Inventory::default();
        let dagger = gear("dagger", EquipSlot::Weapon, 2);
        let sword = gear("sword", EquipSlot::Weapon, 6);
        let (dagger_id, sword_id) = (dagger.info.id, sword.info.id);
        inventory.add(dagger);
        inventory.add(sword);

        assert_eq!(inventory.equip(dagger_id).unwrap(), None);
        assert_eq!(inventory.equipment_bonus(Stat::Damage), 2);

        assert_eq!(inventory.equip(sword_id).unwrap(), Some(dagger_id));
        assert_eq!(inventory.equipment_bonus(Stat::Damage), 6);
        assert_eq!(inventory.equipped().count(), 1);

        inventory.unequip(sword_id).unwrap();
        assert_eq!(inventory.equipment_bonus(Stat::Damage), 0);
        assert!(inventory.unequip(sword_id).is_err());
    }

    #[test]
    fn test_consumables_cannot_be_equipped() {
        let mut inventory = Inventory::default();
        inventory.add(potion(1));
        let id = inventory.items()[0].info.id;
        assert!(matches!(
            inventory.equip(id),
            Err(WarrensError::InvalidAction(_))
        ));
    }

    #[test]
    fn test_modifiers_shape_consumable_and_name() {
        let mut item = potion(1);
        item.modifiers.push(modifier("blazing", ModifierTarget::Consumable));
        let spec = item.effective_consumable().unwrap();
        assert_eq!(spec.radius, 1);
        assert_eq!(spec.hit_die, HitDie::new(2, 8));
        assert_eq!(spec.element, Element::Fire);
        assert_eq!(item.display_name(), "blazing healing vial");

        let mut sword = gear("sword", EquipSlot::Weapon, 6);
        sword.modifiers.push(modifier("sharp", ModifierTarget::Equipment));
        assert_eq!(sword.bonus(Stat::Damage), 9);
        assert!(sword.effective_consumable().is_none());
    }
}
