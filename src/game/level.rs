//! # Level
//!
//! A map plus the actors placed on it. The level owns both halves of the
//! tile/actor index (tile -> occupants and actor -> tile) and updates them
//! together, so neither can drift from the other.

use crate::game::actors::{Actor, Character, Entity};
use crate::game::{ActorId, LevelId, Map, Position};
use crate::{WarrensError, WarrensResult};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    Town,
    Dungeon,
    Cave,
    House,
    SingleRoom,
}

#[derive(Debug, Clone, Default)]
struct SpatialIndex {
    occupants: HashMap<Position, Vec<ActorId>>,
    placement: HashMap<ActorId, Position>,
}

impl SpatialIndex {
    fn place(&mut self, id: ActorId, pos: Position) {
        self.occupants.entry(pos).or_default().push(id);
        self.placement.insert(id, pos);
    }

    fn unplace(&mut self, id: ActorId) -> Option<Position> {
        let pos = self.placement.remove(&id)?;
        if let Some(ids) = self.occupants.get_mut(&pos) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.occupants.remove(&pos);
            }
        }
        Some(pos)
    }
}

/// One playable area.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "LevelDocument", into = "LevelDocument")]
pub struct Level {
    pub id: LevelId,
    pub name: String,
    pub kind: LevelKind,
    /// Drives monster and item strength
    pub difficulty: u32,
    /// How far the player sees here
    pub view_radius: u32,
    pub map: Map,
    pub parent: Option<LevelId>,
    pub sub_levels: Vec<LevelId>,
    order: Vec<ActorId>,
    actors: HashMap<ActorId, Actor>,
    index: SpatialIndex,
}

#[derive(Serialize, Deserialize)]
struct PlacedActor {
    position: Option<Position>,
    actor: Actor,
}

#[derive(Serialize, Deserialize)]
struct LevelDocument {
    id: LevelId,
    name: String,
    kind: LevelKind,
    difficulty: u32,
    view_radius: u32,
    map: Map,
    parent: Option<LevelId>,
    sub_levels: Vec<LevelId>,
    actors: Vec<PlacedActor>,
}

impl From<Level> for LevelDocument {
    fn from(mut level: Level) -> Self {
        let actors = level
            .order
            .iter()
            .filter_map(|id| {
                let actor = level.actors.remove(id)?;
                Some(PlacedActor {
                    position: level.index.placement.get(id).copied(),
                    actor,
                })
            })
            .collect();
        LevelDocument {
            id: level.id,
            name: level.name,
            kind: level.kind,
            difficulty: level.difficulty,
            view_radius: level.view_radius,
            map: level.map,
            parent: level.parent,
            sub_levels: level.sub_levels,
            actors,
        }
    }
}

impl From<LevelDocument> for Level {
    fn from(doc: LevelDocument) -> Self {
        let mut level = Level::new(doc.id, &doc.name, doc.kind, doc.difficulty, doc.view_radius, doc.map);
        level.parent = doc.parent;
        level.sub_levels = doc.sub_levels;
        for placed in doc.actors {
            let id = placed.actor.id();
            level.order.push(id);
            level.actors.insert(id, placed.actor);
            if let Some(pos) = placed.position {
                level.index.place(id, pos);
            }
        }
        level
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.kind == other.kind
            && self.difficulty == other.difficulty
            && self.view_radius == other.view_radius
            && self.parent == other.parent
            && self.sub_levels == other.sub_levels
            && self.order == other.order
            && self.actors == other.actors
            && self.index.placement == other.index.placement
            && self.map == other.map
    }
}

impl Level {
    pub fn new(id: LevelId, name: &str, kind: LevelKind, difficulty: u32, view_radius: u32, map: Map) -> Self {
        Self {
            id,
            name: name.to_string(),
            kind,
            difficulty,
            view_radius,
            map,
            parent: None,
            sub_levels: Vec::new(),
            order: Vec::new(),
            actors: HashMap::new(),
            index: SpatialIndex::default(),
        }
    }

    /// Places a new actor on a walkable tile.
    pub fn add_actor(&mut self, actor: impl Into<Actor>, pos: Position) -> WarrensResult<ActorId> {
        let actor = actor.into();
        let id = actor.id();
        if self.actors.contains_key(&id) {
            return Err(WarrensError::InvalidState(format!(
                "{} is already on {}",
                actor.name(),
                self.name
            )));
        }
        self.check_destination(&actor, pos)?;
        self.order.push(id);
        self.actors.insert(id, actor);
        self.index.place(id, pos);
        Ok(id)
    }

    /// Takes an actor off the level entirely.
    pub fn remove_actor(&mut self, id: ActorId) -> Option<Actor> {
        let actor = self.actors.remove(&id)?;
        self.index.unplace(id);
        self.order.retain(|other| *other != id);
        Some(actor)
    }

    /// Moves a placed actor to another tile.
    pub fn move_actor(&mut self, id: ActorId, to: Position) -> WarrensResult<()> {
        let actor = self
            .actors
            .get(&id)
            .ok_or_else(|| WarrensError::InvalidState(format!("Unknown actor {}", id)))?;
        if self.index.placement.get(&id) == Some(&to) {
            return Ok(());
        }
        self.check_destination(actor, to)?;
        self.index.unplace(id);
        self.index.place(id, to);
        Ok(())
    }

    /// Removes an actor from its tile but keeps it registered, e.g. a dead player.
    pub(crate) fn unplace(&mut self, id: ActorId) -> Option<Position> {
        self.index.unplace(id)
    }

    fn check_destination(&self, actor: &Actor, pos: Position) -> WarrensResult<()> {
        if self.map.is_blocked(pos) {
            return Err(WarrensError::InvalidAction(format!(
                "{} can not go to {}: the way is blocked",
                actor.name(),
                pos
            )));
        }
        if actor.blocks_movement() {
            if let Some(blocker) = self.blocking_actor_at(pos) {
                if blocker != actor.id() {
                    let name = self.actors.get(&blocker).map(|a| a.name()).unwrap_or_default();
                    return Err(WarrensError::InvalidAction(format!("{} is in the way", name)));
                }
            }
        }
        Ok(())
    }

    pub fn position_of(&self, id: ActorId) -> Option<Position> {
        self.index.placement.get(&id).copied()
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.actors.contains_key(&id)
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    pub fn character(&self, id: ActorId) -> Option<&Character> {
        self.actors.get(&id).and_then(Actor::as_character)
    }

    pub fn character_mut(&mut self, id: ActorId) -> Option<&mut Character> {
        self.actors.get_mut(&id).and_then(Actor::as_character_mut)
    }

    /// Ids of the actors on a tile, in arrival order.
    pub fn actor_ids_at(&self, pos: Position) -> Vec<ActorId> {
        self.index.occupants.get(&pos).cloned().unwrap_or_default()
    }

    pub fn actors_at(&self, pos: Position) -> impl Iterator<Item = &Actor> {
        self.index
            .occupants
            .get(&pos)
            .into_iter()
            .flatten()
            .filter_map(|id| self.actors.get(id))
    }

    /// Living characters currently on a tile.
    pub fn characters_at(&self, pos: Position) -> Vec<ActorId> {
        self.actors_at(pos)
            .filter_map(Actor::as_character)
            .filter(|c| c.is_alive())
            .map(|c| c.id())
            .collect()
    }

    pub fn blocking_actor_at(&self, pos: Position) -> Option<ActorId> {
        self.actors_at(pos).find(|a| a.blocks_movement()).map(|a| a.id())
    }

    /// Open tile without a blocking actor.
    pub fn is_walkable(&self, pos: Position) -> bool {
        !self.map.is_blocked(pos) && self.blocking_actor_at(pos).is_none()
    }

    /// All registered actors in the order they arrived.
    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.order.iter().filter_map(|id| self.actors.get(id))
    }

    /// Placed actors with their positions, in arrival order.
    pub fn placed_actors(&self) -> impl Iterator<Item = (Position, &Actor)> {
        self.order.iter().filter_map(|id| {
            let pos = self.index.placement.get(id)?;
            Some((*pos, self.actors.get(id)?))
        })
    }

    /// Living, placed characters in the order they arrived.
    pub fn active_characters(&self) -> Vec<ActorId> {
        self.order
            .iter()
            .filter(|id| self.index.placement.contains_key(id))
            .filter(|id| self.character(**id).map_or(false, Character::is_alive))
            .copied()
            .collect()
    }

    pub fn portal_ids(&self) -> Vec<ActorId> {
        self.actors()
            .filter(|a| a.as_portal().is_some())
            .map(|a| a.id())
            .collect()
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// A random walkable tile with nothing on it.
    pub fn random_empty_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Position> {
        let candidates: Vec<Position> = self
            .map
            .walkable_positions()
            .filter(|p| !self.index.occupants.contains_key(p))
            .collect();
        candidates.choose(rng).copied()
    }
}
