//! # Actors
//!
//! Everything that can stand on a tile: characters, items, portals, chests
//! and corpses. Actors never know their tile; the owning
//! [`Level`](crate::game::Level) keeps that index.

use crate::config::{LEVEL_UP_ATTRIBUTE_GAIN, PLAYER_HITPOINT_FACTOR, XP_BASE, XP_FACTOR};
use crate::game::{new_actor_id, ActorId, Ai, Inventory, Item, LevelId};
use serde::{Deserialize, Serialize};

/// One of the six character attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Accuracy,
    Dodge,
    Damage,
    Armor,
    Body,
    Mind,
}

impl Stat {
    pub fn all() -> [Stat; 6] {
        [
            Stat::Accuracy,
            Stat::Dodge,
            Stat::Damage,
            Stat::Armor,
            Stat::Body,
            Stat::Mind,
        ]
    }
}

/// A full set of attribute values, used for base stats and for bonuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    pub accuracy: i32,
    pub dodge: i32,
    pub damage: i32,
    pub armor: i32,
    pub body: i32,
    pub mind: i32,
}

impl Attributes {
    pub fn uniform(value: i32) -> Self {
        Self {
            accuracy: value,
            dodge: value,
            damage: value,
            armor: value,
            body: value,
            mind: value,
        }
    }

    pub fn get(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Accuracy => self.accuracy,
            Stat::Dodge => self.dodge,
            Stat::Damage => self.damage,
            Stat::Armor => self.armor,
            Stat::Body => self.body,
            Stat::Mind => self.mind,
        }
    }

    pub fn set(&mut self, stat: Stat, value: i32) {
        match stat {
            Stat::Accuracy => self.accuracy = value,
            Stat::Dodge => self.dodge = value,
            Stat::Damage => self.damage = value,
            Stat::Armor => self.armor = value,
            Stat::Body => self.body = value,
            Stat::Mind => self.mind = value,
        }
    }

    pub fn raise_all(&mut self, amount: i32) {
        *self = *self + Attributes::uniform(amount);
    }
}

impl std::ops::Add for Attributes {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            accuracy: self.accuracy + other.accuracy,
            dodge: self.dodge + other.dodge,
            damage: self.damage + other.damage,
            armor: self.armor + other.armor,
            body: self.body + other.body,
            mind: self.mind + other.mind,
        }
    }
}

/// Identity and presentation shared by every actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorInfo {
    pub id: ActorId,
    /// Catalog key this actor was created from
    pub key: String,
    pub name: String,
    pub glyph: char,
    pub color: [u8; 3],
    pub sprite: String,
    #[serde(default)]
    pub flavor: String,
}

impl ActorInfo {
    pub fn new(key: &str, name: &str, glyph: char, color: [u8; 3], sprite: &str) -> Self {
        Self {
            id: new_actor_id(),
            key: key.to_string(),
            name: name.to_string(),
            glyph,
            color,
            sprite: sprite.to_string(),
            flavor: String::new(),
        }
    }
}

/// Common interface for anything placed on a map.
pub trait Entity {
    fn info(&self) -> &ActorInfo;

    fn id(&self) -> ActorId {
        self.info().id
    }

    fn key(&self) -> &str {
        &self.info().key
    }

    fn name(&self) -> String {
        self.info().name.clone()
    }

    fn glyph(&self) -> char {
        self.info().glyph
    }

    fn sprite(&self) -> &str {
        &self.info().sprite
    }

    /// Whether another blocking actor may share the tile.
    fn blocks_movement(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    pub current: i32,
    pub max: i32,
}

impl HitPoints {
    pub fn full(max: i32) -> Self {
        Self { current: max, max }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeState {
    Active,
    Dead,
}

/// Player experience and level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    pub xp: u32,
    pub level: u32,
}

impl Progression {
    /// Total experience needed to leave `level`.
    pub fn next_level_xp(level: u32) -> u32 {
        let l = level as f64;
        (XP_BASE + XP_BASE * XP_FACTOR * (l * l - 1.0)).round() as u32
    }
}

/// Monster-only data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterProfile {
    pub ai: Ai,
    pub challenge_rating: u32,
    pub xp_value: u32,
    pub unique: bool,
    /// Shown when this monster kills the player
    pub killed_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Player(Progression),
    Monster(MonsterProfile),
    Npc,
}

/// Outcome of a [`Character::take_damage`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    Survived,
    Killed,
    AlreadyDead,
}

/// A living (or formerly living) actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub info: ActorInfo,
    pub hit_points: HitPoints,
    /// Base layer of the attributes
    pub attributes: Attributes,
    /// Flat bonuses from monster modifiers and similar
    pub modifier_bonus: Attributes,
    pub inventory: Inventory,
    pub life: LifeState,
    pub role: Role,
}

impl Character {
    /// A fresh level 1 player.
    pub fn new_player(name: &str) -> Self {
        let attributes = Attributes::uniform(10);
        let mut info = ActorInfo::new("player", name, '@', [255, 255, 255], "player");
        info.flavor = "A brave adventurer".to_string();
        Self {
            info,
            hit_points: HitPoints::full(attributes.body * PLAYER_HITPOINT_FACTOR),
            attributes,
            modifier_bonus: Attributes::default(),
            inventory: Inventory::default(),
            life: LifeState::Active,
            role: Role::Player(Progression { xp: 0, level: 1 }),
        }
    }

    pub fn new_monster(info: ActorInfo, hit_points: i32, attributes: Attributes, profile: MonsterProfile) -> Self {
        Self {
            info,
            hit_points: HitPoints::full(hit_points.max(1)),
            attributes,
            modifier_bonus: Attributes::default(),
            inventory: Inventory::default(),
            life: LifeState::Active,
            role: Role::Monster(profile),
        }
    }

    /// A harmless villager.
    pub fn new_npc(name: &str) -> Self {
        let mut info = ActorInfo::new("villager", name, 'v', [200, 180, 50], "villager");
        info.flavor = "A local going about their day".to_string();
        Self {
            info,
            hit_points: HitPoints::full(20),
            attributes: Attributes::uniform(5),
            modifier_bonus: Attributes::default(),
            inventory: Inventory::default(),
            life: LifeState::Active,
            role: Role::Npc,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.life == LifeState::Active
    }

    pub fn is_player(&self) -> bool {
        matches!(self.role, Role::Player(_))
    }

    pub fn is_monster(&self) -> bool {
        matches!(self.role, Role::Monster(_))
    }

    pub fn monster_profile(&self) -> Option<&MonsterProfile> {
        match &self.role {
            Role::Monster(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn monster_profile_mut(&mut self) -> Option<&mut MonsterProfile> {
        match &mut self.role {
            Role::Monster(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn progression(&self) -> Option<&Progression> {
        match &self.role {
            Role::Player(progression) => Some(progression),
            _ => None,
        }
    }

    /// Base + equipment + modifier layers, never negative.
    ///
    /// Computed on every call so equipment changes show up immediately.
    pub fn effective(&self, stat: Stat) -> i32 {
        let total = self.attributes.get(stat)
            + self.inventory.equipment_bonus(stat)
            + self.modifier_bonus.get(stat);
        total.max(0)
    }

    /// Every stat at its [`Character::effective`] value.
    pub fn effective_attributes(&self) -> Attributes {
        let mut attributes = Attributes::default();
        for stat in Stat::all() {
            attributes.set(stat, self.effective(stat));
        }
        attributes
    }

    /// Experience granted to whoever kills this character.
    pub fn xp_value(&self) -> u32 {
        self.monster_profile().map_or(0, |p| p.xp_value)
    }

    /// Lowers hit points, floor 0. Dropping to 0 kills; dead stays dead.
    pub fn take_damage(&mut self, amount: i32) -> DamageOutcome {
        if !self.is_alive() {
            return DamageOutcome::AlreadyDead;
        }
        if amount > 0 {
            self.hit_points.current = (self.hit_points.current - amount).max(0);
        }
        if self.hit_points.current == 0 {
            self.life = LifeState::Dead;
            DamageOutcome::Killed
        } else {
            DamageOutcome::Survived
        }
    }

    /// Restores hit points up to the maximum. Returns the amount healed.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if !self.is_alive() || amount <= 0 {
            return 0;
        }
        let before = self.hit_points.current;
        self.hit_points.current = (before + amount).min(self.hit_points.max);
        self.hit_points.current - before
    }

    /// Adds experience and applies any level ups. Returns levels gained.
    pub fn gain_xp(&mut self, amount: u32) -> u32 {
        let Role::Player(progression) = &mut self.role else {
            return 0;
        };
        progression.xp += amount;
        let mut gained = 0;
        while progression.xp >= Progression::next_level_xp(progression.level) {
            progression.level += 1;
            gained += 1;
        }
        for _ in 0..gained {
            self.level_up();
        }
        gained
    }

    fn level_up(&mut self) {
        self.attributes.raise_all(LEVEL_UP_ATTRIBUTE_GAIN);
        let new_max = self.attributes.body * PLAYER_HITPOINT_FACTOR;
        let raise = new_max - self.hit_points.max;
        self.hit_points.max = new_max;
        self.hit_points.current += raise.max(0);
    }
}

impl Entity for Character {
    fn info(&self) -> &ActorInfo {
        &self.info
    }

    fn blocks_movement(&self) -> bool {
        self.is_alive()
    }
}

/// Where a portal leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalLink {
    pub level: LevelId,
    pub portal: ActorId,
}

/// Link between two levels. A portal without destination that is marked as
/// the exit ends the game in victory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    pub info: ActorInfo,
    pub destination: Option<PortalLink>,
    pub message: String,
    #[serde(default)]
    pub is_exit: bool,
}

impl Portal {
    pub fn stairs_down() -> Self {
        Self::new("stairs_down", "stairs down", '>', "You descend deeper.")
    }

    pub fn stairs_up() -> Self {
        Self::new("stairs_up", "stairs up", '<', "You climb up.")
    }

    pub fn door() -> Self {
        Self::new("door", "door", '+', "You step through the door.")
    }

    pub fn cave_mouth() -> Self {
        Self::new("portal", "cave mouth", 'O', "You pass through a dark opening.")
    }

    fn new(sprite: &str, name: &str, glyph: char, message: &str) -> Self {
        Self {
            info: ActorInfo::new(sprite, name, glyph, [255, 255, 255], sprite),
            destination: None,
            message: message.to_string(),
            is_exit: false,
        }
    }
}

impl Entity for Portal {
    fn info(&self) -> &ActorInfo {
        &self.info
    }
}

/// A container the player can empty by interacting with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chest {
    pub info: ActorInfo,
    pub inventory: Inventory,
}

impl Chest {
    pub fn new(name: &str) -> Self {
        Self {
            info: ActorInfo::new("chest", name, '=', [160, 110, 40], "chest"),
            inventory: Inventory::default(),
        }
    }
}

impl Entity for Chest {
    fn info(&self) -> &ActorInfo {
        &self.info
    }
}

/// What a dead character leaves behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corpse {
    pub info: ActorInfo,
    /// Id of the character that died here
    pub of: ActorId,
}

impl Corpse {
    pub fn from_character(character: &Character) -> Self {
        let mut info = ActorInfo::new(
            &character.info.key,
            &format!("{} corpse", character.info.name),
            '%',
            [127, 0, 0],
            &character.info.sprite,
        );
        info.flavor = format!("The remains of {}", character.info.name);
        Self {
            info,
            of: character.info.id,
        }
    }
}

impl Entity for Corpse {
    fn info(&self) -> &ActorInfo {
        &self.info
    }
}

/// Closed set of actor kinds a level can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Actor {
    Character(Character),
    Item(Item),
    Portal(Portal),
    Chest(Chest),
    Corpse(Corpse),
}

impl Actor {
    pub fn as_character(&self) -> Option<&Character> {
        match self {
            Actor::Character(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_character_mut(&mut self) -> Option<&mut Character> {
        match self {
            Actor::Character(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Actor::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_portal(&self) -> Option<&Portal> {
        match self {
            Actor::Portal(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_portal_mut(&mut self) -> Option<&mut Portal> {
        match self {
            Actor::Portal(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_chest_mut(&mut self) -> Option<&mut Chest> {
        match self {
            Actor::Chest(c) => Some(c),
            _ => None,
        }
    }

    pub fn kind(&self) -> ActorKind {
        match self {
            Actor::Character(c) if c.is_player() => ActorKind::Player,
            Actor::Character(c) if c.is_monster() => ActorKind::Monster,
            Actor::Character(_) => ActorKind::Npc,
            Actor::Item(_) => ActorKind::Item,
            Actor::Portal(_) => ActorKind::Portal,
            Actor::Chest(_) => ActorKind::Chest,
            Actor::Corpse(_) => ActorKind::Corpse,
        }
    }
}

/// What a renderer needs to tell actors apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Player,
    Monster,
    Npc,
    Item,
    Portal,
    Chest,
    Corpse,
}

impl ActorKind {
    /// Fixtures stay drawn on explored tiles out of sight.
    pub fn is_fixture(self) -> bool {
        matches!(self, ActorKind::Portal | ActorKind::Chest)
    }
}

impl Entity for Actor {
    fn info(&self) -> &ActorInfo {
        match self {
            Actor::Character(c) => c.info(),
            Actor::Item(i) => i.info(),
            Actor::Portal(p) => p.info(),
            Actor::Chest(c) => c.info(),
            Actor::Corpse(c) => c.info(),
        }
    }

    fn name(&self) -> String {
        match self {
            Actor::Item(i) => i.name(),
            other => other.info().name.clone(),
        }
    }

    fn blocks_movement(&self) -> bool {
        match self {
            Actor::Character(c) => c.blocks_movement(),
            _ => false,
        }
    }
}

impl From<Character> for Actor {
    fn from(c: Character) -> Self {
        Actor::Character(c)
    }
}

impl From<Item> for Actor {
    fn from(i: Item) -> Self {
        Actor::Item(i)
    }
}

impl From<Portal> for Actor {
    fn from(p: Portal) -> Self {
        Actor::Portal(p)
    }
}

impl From<Chest> for Actor {
    fn from(c: Chest) -> Self {
        Actor::Chest(c)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A plain monster with attributes 10 and the given hit points.
    pub(crate) fn monster(key: &str, hit_points: i32) -> Character {
        let info = ActorInfo::new(key, key, 'r', [150, 100, 50], key);
        let profile = MonsterProfile {
            ai: Ai::default(),
            challenge_rating: 1,
            xp_value: 50,
            unique: false,
            killed_by: format!("a {}", key),
        };
        Character::new_monster(info, hit_points, Attributes::uniform(10), profile)
    }

    #[test]
    fn test_new_player() {
        let player = Character::new_player("Hero");
        assert!(player.is_player());
        assert!(player.is_alive());
        assert_eq!(player.hit_points, HitPoints::full(50));
        assert_eq!(player.effective(Stat::Accuracy), 10);
        assert!(player.blocks_movement());
    }

    #[test]
    fn test_take_damage_to_death_is_idempotent() {
        let mut player = Character::new_player("Hero");
        player.hit_points = HitPoints::full(10);

        assert_eq!(player.take_damage(6), DamageOutcome::Survived);
        assert_eq!(player.hit_points.current, 4);
        assert_eq!(player.life, LifeState::Active);

        assert_eq!(player.take_damage(6), DamageOutcome::Killed);
        assert_eq!(player.hit_points.current, 0);
        assert_eq!(player.life, LifeState::Dead);
        assert!(!player.blocks_movement());

        assert_eq!(player.take_damage(6), DamageOutcome::AlreadyDead);
        assert_eq!(player.hit_points.current, 0);
        assert_eq!(player.heal(5), 0);
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut player = Character::new_player("Hero");
        player.take_damage(8);
        assert_eq!(player.heal(100), 8);
        assert_eq!(player.hit_points.current, player.hit_points.max);
    }

    #[test]
    fn test_effective_stat_is_clamped() {
        let mut player = Character::new_player("Hero");
        player.modifier_bonus.dodge = -25;
        assert_eq!(player.effective(Stat::Dodge), 0);
    }

    #[test]
    fn test_xp_curve() {
        assert_eq!(Progression::next_level_xp(1), 300);
        assert_eq!(Progression::next_level_xp(2), 1470);
    }

    #[test]
    fn test_level_up_raises_attributes_and_hit_points() {
        let mut player = Character::new_player("Hero");
        assert_eq!(player.gain_xp(299), 0);
        assert_eq!(player.gain_xp(1), 1);

        assert_eq!(player.progression().unwrap().level, 2);
        assert_eq!(player.attributes.body, 20);
        assert_eq!(player.hit_points.max, 100);
        assert_eq!(player.hit_points.current, 100);
    }

    #[test]
    fn test_npc_does_not_gain_xp() {
        let mut npc = Character::new_npc("Bob");
        assert_eq!(npc.gain_xp(10_000), 0);
        assert_eq!(npc.xp_value(), 0);
    }

    #[test]
    fn test_corpse_naming() {
        let npc = Character::new_npc("Bob");
        let corpse = Corpse::from_character(&npc);
        assert_eq!(corpse.name(), "Bob corpse");
        assert_eq!(corpse.glyph(), '%');
        assert_eq!(corpse.of, npc.id());
    }

    #[test]
    fn test_actor_serde_tagging() {
        let actor: Actor = Portal::stairs_down().into();
        let json = serde_json::to_value(&actor).unwrap();
        assert_eq!(json["kind"], "portal");
        let back: Actor = serde_json::from_value(json).unwrap();
        assert_eq!(back, actor);
    }
}
