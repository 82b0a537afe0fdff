//! # Effects
//!
//! Damage, healing and confusion produced by consumables. An effect has a
//! fixed scope (the user, one character or a frozen set of tiles) and a
//! duration counted in scheduler ticks.

use crate::game::actions::Target;
use crate::game::actors::{Character, Entity};
use crate::game::ai::Ai;
use crate::game::combat;
use crate::game::context::{GameEvent, TurnContext};
use crate::game::fov::has_line_of_sight;
use crate::game::items::{ConsumableSpec, HitDie};
use crate::game::level::Level;
use crate::game::{ActorId, LevelId, Position};
use crate::{WarrensError, WarrensResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Damage,
    Heal,
    Confuse,
}

/// How a consumable picks what it affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    #[serde(rename = "self")]
    SelfTarget,
    Character,
    Tile,
    /// Area around the user, the user's own tile excluded
    Nova,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Heal,
    Water,
    Air,
    Fire,
    Earth,
    Electricity,
    Mind,
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Element::Heal => "healing",
            Element::Water => "water",
            Element::Air => "air",
            Element::Fire => "fire",
            Element::Earth => "earth",
            Element::Electricity => "lightning",
            Element::Mind => "mind",
        };
        f.write_str(name)
    }
}

/// What an effect reaches. Area tiles are fixed when the effect is made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum EffectScope {
    SelfTarget { actor: ActorId },
    Character { actor: ActorId },
    Area { center: Position, tiles: Vec<Position> },
}

/// A running or one-shot effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub id: Uuid,
    pub kind: EffectKind,
    pub scope: EffectScope,
    pub level: LevelId,
    pub element: Element,
    pub hit_die: HitDie,
    /// Ticks left; 0 means apply once and forget
    pub remaining: u32,
    pub source: Option<ActorId>,
    pub source_name: String,
}

impl Effect {
    /// Builds the effect a consumable produces when `user` uses it.
    ///
    /// Character targets default to the nearest visible monster, tile
    /// targets to the user's own tile.
    pub fn from_consumable(
        spec: &ConsumableSpec,
        level: &Level,
        user: ActorId,
        target: Option<Target>,
    ) -> WarrensResult<Self> {
        let user_pos = level
            .position_of(user)
            .ok_or_else(|| WarrensError::InvalidState(format!("User {} is not on the level", user)))?;
        let source_name = level.actor(user).map(|a| a.name()).unwrap_or_default();

        let scope = match spec.target {
            TargetMode::SelfTarget => EffectScope::SelfTarget { actor: user },
            TargetMode::Character => {
                let actor = match target {
                    Some(Target::Actor(id)) => {
                        let pos = level
                            .position_of(id)
                            .filter(|_| level.character(id).map_or(false, Character::is_alive))
                            .ok_or_else(|| WarrensError::InvalidAction("Invalid target".to_string()))?;
                        if !level.map.is_visible(pos) {
                            return Err(WarrensError::InvalidAction("You can not see that target".to_string()));
                        }
                        id
                    }
                    Some(Target::Tile(pos)) => level
                        .characters_at(pos)
                        .into_iter()
                        .find(|id| *id != user)
                        .ok_or_else(|| WarrensError::InvalidAction("Nobody is there".to_string()))?,
                    None => nearest_visible_hostile(level, user_pos)
                        .ok_or_else(|| WarrensError::InvalidAction("No target in sight".to_string()))?,
                };
                EffectScope::Character { actor }
            }
            TargetMode::Tile => {
                let center = match target {
                    Some(Target::Tile(pos)) => pos,
                    Some(Target::Actor(id)) => level
                        .position_of(id)
                        .ok_or_else(|| WarrensError::InvalidAction("Invalid target".to_string()))?,
                    None => user_pos,
                };
                if !level.map.in_bounds(center) {
                    return Err(WarrensError::InvalidAction(format!("{} is off the map", center)));
                }
                EffectScope::Area {
                    center,
                    tiles: area_tiles(level, center, spec.radius, true),
                }
            }
            TargetMode::Nova => EffectScope::Area {
                center: user_pos,
                tiles: area_tiles(level, user_pos, spec.radius, false),
            },
        };

        Ok(Self {
            id: Uuid::new_v4(),
            kind: spec.effect,
            scope,
            level: level.id,
            element: spec.element,
            hit_die: spec.hit_die,
            remaining: spec.duration,
            source: Some(user),
            source_name,
        })
    }

    /// Characters currently affected. Area effects re-check their tiles on
    /// every call, so walking in or out of the area matters.
    pub fn targets(&self, level: &Level) -> Vec<ActorId> {
        let alive = |id: &ActorId| {
            level.position_of(*id).is_some() && level.character(*id).map_or(false, Character::is_alive)
        };
        match &self.scope {
            EffectScope::SelfTarget { actor } | EffectScope::Character { actor } => {
                Some(*actor).into_iter().filter(alive).collect()
            }
            EffectScope::Area { tiles, .. } => tiles
                .iter()
                .flat_map(|pos| level.characters_at(*pos))
                .collect(),
        }
    }

    /// Applies one dose of the effect to every current target.
    pub fn apply(&self, level: &mut Level, ctx: &mut TurnContext) {
        let targets = self.targets(level);
        match self.kind {
            EffectKind::Damage => {
                for target in targets {
                    let amount = self.hit_die.roll(ctx.rng()).max(1);
                    let name = level.actor(target).map(|a| a.name()).unwrap_or_default();
                    ctx.message(format!("{} is hit by {} for {} damage.", name, self.element, amount));
                    combat::apply_damage(level, target, amount, self.source, ctx);
                }
            }
            EffectKind::Heal => {
                for target in targets {
                    let amount = self.hit_die.roll(ctx.rng());
                    let Some(character) = level.character_mut(target) else {
                        continue;
                    };
                    let healed = character.heal(amount);
                    let name = character.name();
                    ctx.message(format!("{} heals {} hit points.", name, healed));
                    ctx.emit(GameEvent::ActorHealed {
                        actor: target,
                        amount: healed,
                    });
                }
            }
            // Confusion is installed once when the effect is registered
            EffectKind::Confuse => {}
        }
    }

    /// Wraps the AI of every targeted monster in a confused AI.
    pub fn install_confusion(&self, level: &mut Level, ctx: &mut TurnContext) {
        let turns = self.remaining.max(1);
        for target in self.targets(level) {
            let Some(character) = level.character_mut(target) else {
                continue;
            };
            let name = character.name();
            match character.monster_profile_mut() {
                Some(profile) => {
                    let inner = std::mem::take(&mut profile.ai);
                    profile.ai = Ai::confused(inner, turns);
                    ctx.message(format!("{} looks confused.", name));
                }
                None => ctx.message(format!("{} shrugs off the confusion.", name)),
            }
        }
    }
}

/// Open tiles within `radius` of `center` that the center can see.
pub fn area_tiles(level: &Level, center: Position, radius: u32, include_center: bool) -> Vec<Position> {
    level
        .map
        .circle_tiles(center, radius, include_center, true)
        .into_iter()
        .filter(|pos| *pos == center || has_line_of_sight(&level.map, center, *pos))
        .collect()
}

fn nearest_visible_hostile(level: &Level, from: Position) -> Option<ActorId> {
    level
        .active_characters()
        .into_iter()
        .filter(|id| level.character(*id).map_or(false, Character::is_monster))
        .filter_map(|id| level.position_of(id).map(|pos| (id, pos)))
        .filter(|(_, pos)| level.map.is_visible(*pos))
        .min_by(|(_, a), (_, b)| from.euclidean_distance(*a).total_cmp(&from.euclidean_distance(*b)))
        .map(|(id, _)| id)
}
