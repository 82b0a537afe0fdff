//! # Snapshots
//!
//! The one document clients ever see: the current level's tiles and visible
//! actors, the player's sheet and the recent messages. Renderers depend on
//! this format only, so it carries a version number.

use crate::game::actors::{Actor, ActorKind, Attributes, Entity, HitPoints};
use crate::game::effects::{Effect, Element};
use crate::game::items::{EquipSlot, Item};
use crate::game::level::{Level, LevelKind};
use crate::game::map::{Material, TextureSet};
use crate::game::state::{Game, GameStatus};
use crate::game::{ActorId, LevelId, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bumped whenever the snapshot layout changes.
pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub version: u32,
    pub turn: u64,
    pub status: GameStatus,
    pub level: Option<LevelSnapshot>,
    pub player: Option<PlayerSnapshot>,
    /// Most recent messages, oldest first
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    pub id: LevelId,
    pub name: String,
    pub kind: LevelKind,
    pub difficulty: u32,
    pub width: u32,
    pub height: u32,
    pub texture_set: TextureSet,
    /// Row-major, `width * height` entries
    pub tiles: Vec<TileSnapshot>,
    pub actors: Vec<ActorSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSnapshot {
    pub x: i32,
    pub y: i32,
    pub material: Material,
    pub blocked: bool,
    pub explored: bool,
    pub in_view: bool,
    pub texture: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    pub id: ActorId,
    pub kind: ActorKind,
    pub key: String,
    pub name: String,
    pub glyph: char,
    pub color: [u8; 3],
    pub sprite: String,
    pub position: Position,
    #[serde(default)]
    pub hit_points: Option<HitPoints>,
    /// Effective values, characters only
    #[serde(default)]
    pub attributes: Option<Attributes>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub xp: Option<u32>,
    #[serde(default)]
    pub challenge_rating: Option<u32>,
    /// Elements of the effects currently working on this actor
    #[serde(default)]
    pub effects: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: ActorId,
    pub name: String,
    pub hit_points: HitPoints,
    pub level: u32,
    pub xp: u32,
    /// Effective values, equipment included
    pub attributes: Attributes,
    pub inventory: Vec<ItemSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: ActorId,
    pub key: String,
    pub name: String,
    pub stack_size: u32,
    pub slot: Option<EquipSlot>,
    pub equipped: bool,
}

impl GameSnapshot {
    pub fn from_game(game: &Game) -> Self {
        let player = game.player();
        Self {
            version: SNAPSHOT_VERSION,
            turn: game.turn_number(),
            status: game.status(),
            level: game
                .current_level()
                .map(|level| LevelSnapshot::from_level(level, game.active_effects())),
            player: player.map(|p| {
                let progression = p.progression().copied();
                PlayerSnapshot {
                    id: p.id(),
                    name: p.name(),
                    hit_points: p.hit_points,
                    level: progression.map_or(1, |pr| pr.level),
                    xp: progression.map_or(0, |pr| pr.xp),
                    attributes: p.effective_attributes(),
                    inventory: p.inventory.items().iter().map(ItemSnapshot::from_item).collect(),
                }
            }),
            messages: game.messages(),
        }
    }

    /// Actor standing on a tile, if the snapshot shows one.
    pub fn actors_at(&self, pos: Position) -> impl Iterator<Item = &ActorSnapshot> {
        self.level
            .iter()
            .flat_map(|level| level.actors.iter())
            .filter(move |a| a.position == pos)
    }
}

impl LevelSnapshot {
    /// Tiles as they are; actors only where the player can see them.
    /// Portals and chests stay on the snapshot once their tile is explored.
    /// Effects registered for other levels are ignored.
    pub fn from_level(level: &Level, effects: &[Effect]) -> Self {
        let map = &level.map;
        let tiles = map
            .tiles()
            .map(|t| {
                let pos = t.position();
                TileSnapshot {
                    x: pos.x,
                    y: pos.y,
                    material: t.material(),
                    blocked: t.is_blocked(),
                    explored: t.is_explored(),
                    in_view: t.in_view(),
                    texture: t.texture_hash(),
                }
            })
            .collect();

        let mut elements: BTreeMap<ActorId, Vec<Element>> = BTreeMap::new();
        for effect in effects.iter().filter(|e| e.level == level.id) {
            for target in effect.targets(level) {
                let list = elements.entry(target).or_default();
                if !list.contains(&effect.element) {
                    list.push(effect.element);
                }
            }
        }

        let actors = level
            .placed_actors()
            .filter(|(pos, actor)| {
                let kind = actor.kind();
                map.is_visible(*pos) || (kind.is_fixture() && map.is_explored(*pos)) || kind == ActorKind::Player
            })
            .map(|(pos, actor)| {
                let mut snapshot = ActorSnapshot::from_actor(actor, pos);
                snapshot.effects = elements.remove(&snapshot.id).unwrap_or_default();
                snapshot
            })
            .collect();

        Self {
            id: level.id,
            name: level.name.clone(),
            kind: level.kind,
            difficulty: level.difficulty,
            width: map.width(),
            height: map.height(),
            texture_set: map.texture_set,
            tiles,
            actors,
        }
    }

    pub fn tile(&self, pos: Position) -> Option<&TileSnapshot> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width as i32 || pos.y >= self.height as i32 {
            return None;
        }
        self.tiles.get(pos.y as usize * self.width as usize + pos.x as usize)
    }
}

impl ActorSnapshot {
    /// Leaves `effects` empty; [`LevelSnapshot::from_level`] fills it in.
    pub fn from_actor(actor: &Actor, position: Position) -> Self {
        let info = actor.info();
        let character = actor.as_character();
        let progression = character.and_then(|c| c.progression());
        Self {
            id: info.id,
            kind: actor.kind(),
            key: info.key.clone(),
            name: actor.name(),
            glyph: info.glyph,
            color: info.color,
            sprite: info.sprite.clone(),
            position,
            hit_points: character.map(|c| c.hit_points),
            attributes: character.map(|c| c.effective_attributes()),
            level: progression.map(|p| p.level),
            xp: progression.map(|p| p.xp),
            challenge_rating: character.and_then(|c| c.monster_profile()).map(|p| p.challenge_rating),
            effects: Vec::new(),
        }
    }
}

impl ItemSnapshot {
    pub fn from_item(item: &Item) -> Self {
        Self {
            id: item.info.id,
            key: item.info.key.clone(),
            name: item.display_name(),
            stack_size: item.stack_size,
            slot: item.slot(),
            equipped: item.is_equipped(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::game::actors::tests::monster;
    use crate::game::level::tests::open_level;
    use crate::game::effects::{EffectKind, EffectScope};
    use crate::game::items::HitDie;
    use crate::game::{Character, Intent};

    fn arena() -> Game {
        let mut game = Game::new(EngineConfig::for_testing(5)).unwrap();
        let mut level = open_level(30, 10);
        // wall between the player and the far side
        for y in 1..9 {
            level.map.fill(Position::new(10, y), Material::Stone);
        }
        let id = game.add_level(level.map, "Arena", LevelKind::SingleRoom, 1);
        game.place_player(id, Position::new(2, 2)).unwrap();
        game.refresh_fov();
        game
    }

    #[test]
    fn test_snapshot_version_and_turn() {
        let mut game = arena();
        game.try_to_play_turn(Intent::Wait).unwrap();
        game.try_to_play_turn(Intent::Wait).unwrap();

        let snapshot = game.snapshot();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.turn, 2);
        assert_eq!(snapshot.status, GameStatus::Playing);

        let level = snapshot.level.as_ref().unwrap();
        assert_eq!(level.tiles.len(), 30 * 10);
        assert_eq!(level.tile(Position::new(10, 3)).unwrap().material, Material::Stone);
        assert!(level.tile(Position::new(30, 0)).is_none());
    }

    #[test]
    fn test_hidden_monsters_are_left_out() {
        let mut game = arena();
        let level = game.current_level_id();
        let hidden = game.level_mut(level).unwrap().add_actor(monster("rat", 5), Position::new(20, 5)).unwrap();
        let seen = game.level_mut(level).unwrap().add_actor(monster("bat", 5), Position::new(5, 5)).unwrap();
        game.refresh_fov();

        let snapshot = game.snapshot();
        let ids: Vec<ActorId> = snapshot.level.unwrap().actors.iter().map(|a| a.id).collect();
        assert!(ids.contains(&seen));
        assert!(!ids.contains(&hidden));
        assert!(ids.contains(&game.player_id().unwrap()));
    }

    #[test]
    fn test_player_sheet() {
        let game = arena();
        let player = game.snapshot().player.unwrap();
        assert_eq!(player.level, 1);
        assert_eq!(player.attributes, Attributes::uniform(10));
        assert_eq!(player.hit_points.max, 50);
    }

    #[test]
    fn test_snapshot_is_plain_json() {
        let snapshot = arena().snapshot();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["version"], SNAPSHOT_VERSION);
        assert_eq!(json["status"]["state"], "playing");
        let back: GameSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_actor_details_per_kind() {
        let mut game = arena();
        let level = game.current_level_id();
        let rat = game.level_mut(level).unwrap().add_actor(monster("rat", 5), Position::new(4, 2)).unwrap();
        let villager = game
            .level_mut(level)
            .unwrap()
            .add_actor(Character::new_npc("Mira"), Position::new(2, 4))
            .unwrap();
        game.refresh_fov();

        let snapshot = game.snapshot();
        let actors = &snapshot.level.as_ref().unwrap().actors;
        let find = |id: ActorId| actors.iter().find(|a| a.id == id).unwrap();

        let player = find(game.player_id().unwrap());
        assert_eq!(player.kind, ActorKind::Player);
        assert_eq!(player.level, Some(1));
        assert_eq!(player.xp, Some(0));
        assert_eq!(player.attributes, Some(Attributes::uniform(10)));
        assert_eq!(player.challenge_rating, None);

        let rat = find(rat);
        assert_eq!(rat.kind, ActorKind::Monster);
        assert_eq!(rat.challenge_rating, Some(1));
        assert_eq!(rat.level, None);
        assert_eq!(rat.attributes, Some(Attributes::uniform(10)));

        let villager = find(villager);
        assert_eq!(villager.kind, ActorKind::Npc);
        assert_eq!(villager.xp, None);

        let json = serde_json::to_value(rat).unwrap();
        assert_eq!(json["kind"], "monster");
    }

    #[test]
    fn test_active_effects_flag_their_targets() {
        let mut game = arena();
        let level = game.current_level_id();
        let rat = game.level_mut(level).unwrap().add_actor(monster("rat", 500), Position::new(5, 5)).unwrap();
        game.refresh_fov();
        let center = Position::new(5, 5);
        game.register_effect(Effect {
            id: uuid::Uuid::new_v4(),
            kind: EffectKind::Damage,
            scope: EffectScope::Area {
                center,
                tiles: vec![center],
            },
            level,
            element: Element::Fire,
            hit_die: HitDie::new(1, 1),
            remaining: 3,
            source: game.player_id(),
            source_name: "test".to_string(),
        })
        .unwrap();

        let snapshot = game.snapshot();
        let actors = &snapshot.level.as_ref().unwrap().actors;
        let burning = actors.iter().find(|a| a.id == rat).unwrap();
        assert_eq!(burning.effects, vec![Element::Fire]);
        let player = actors.iter().find(|a| a.kind == ActorKind::Player).unwrap();
        assert!(player.effects.is_empty());
    }
}
