//! # Game State Module
//!
//! The [`Game`] owns every level, the player, the libraries and the effect
//! scheduler, and resolves one turn at a time.
//!
//! A turn is the player's intent, then every other active character's AI,
//! then one tick of every active effect, then a field-of-view refresh and the
//! death check. Rejected intents change nothing and consume no turn.

use crate::config::EngineConfig;
use crate::game::actors::{Actor, Character, Chest, DamageOutcome, Portal, PortalLink};
use crate::game::context::{GameEvent, TurnContext};
use crate::game::effects::{Effect, EffectKind};
use crate::game::fov::refresh_field_of_view;
use crate::game::level::{Level, LevelKind};
use crate::game::snapshot::GameSnapshot;
use crate::game::{ai, combat, ActorId, Intent, LevelId, Map, Position};
use crate::generation::{
    CaveGenerator, DungeonGenerator, ItemLibrary, Libraries, MapGenerator, MonsterLibrary, Room,
    SingleRoomGenerator, TownGenerator,
};
use crate::{WarrensError, WarrensResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Version written into every save document.
pub const SAVE_FORMAT_VERSION: u32 = 1;

const VILLAGER_NAMES: [&str; 8] = [
    "Alda", "Bertil", "Cora", "Dunstan", "Edda", "Fenwick", "Greta", "Hob",
];

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    PlayerDied,
    Victory,
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOutcome::PlayerDied => f.write_str("the player died"),
            GameOutcome::Victory => f.write_str("the player escaped the warrens"),
        }
    }
}

/// Playing until the player dies or wins; finished is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "outcome", rename_all = "snake_case")]
pub enum GameStatus {
    Playing,
    Finished(GameOutcome),
}

impl GameStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, GameStatus::Finished(_))
    }
}

/// What one accepted intent led to.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Turn counter after this turn
    pub turn: u64,
    /// Everything that happened, in order
    pub events: Vec<GameEvent>,
    pub status: GameStatus,
}

/// Game statistics tracking player progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameStatistics {
    pub monsters_slain: u32,
    pub damage_dealt: u64,
    pub damage_taken: u64,
    pub items_collected: u32,
    pub steps_taken: u64,
    /// Highest level difficulty the player has set foot on
    pub deepest_difficulty: u32,
}

impl GameStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates statistics from an event, seen from the player's side.
    pub fn update_from_event(&mut self, event: &GameEvent, player: ActorId) {
        match event {
            GameEvent::ActorMoved { actor, .. } if *actor == player => {
                self.steps_taken += 1;
            }
            GameEvent::ActorDamaged { actor, damage, source } => {
                if *actor == player {
                    self.damage_taken += *damage as u64;
                } else if *source == Some(player) {
                    self.damage_dealt += *damage as u64;
                }
            }
            GameEvent::ActorDied { killer, .. } if *killer == Some(player) => {
                self.monsters_slain += 1;
            }
            GameEvent::ItemPickedUp { actor, .. } if *actor == player => {
                self.items_collected += 1;
            }
            _ => {}
        }
    }
}

/// One running game.
#[derive(Debug, Serialize, Deserialize)]
pub struct Game {
    pub config: EngineConfig,
    pub(crate) levels: Vec<Level>,
    pub(crate) current_level: LevelId,
    pub(crate) player_id: Option<ActorId>,
    pub libraries: Libraries,
    pub(crate) active_effects: Vec<Effect>,
    pub(crate) status: GameStatus,
    pub(crate) turn_number: u64,
    pub(crate) rng_seed: u64,
    pub statistics: GameStatistics,
    pub(crate) context: TurnContext,
}

#[derive(Serialize)]
struct SaveDocumentRef<'a> {
    format_version: u32,
    game: &'a Game,
}

#[derive(Deserialize)]
struct SaveHeader {
    format_version: u32,
}

#[derive(Deserialize)]
struct SaveDocument {
    game: Game,
}

impl Game {
    /// Creates an empty game over the embedded catalog.
    ///
    /// # Examples
    ///
    /// ```
    /// use warrens::{EngineConfig, Game};
    ///
    /// let game = Game::new(EngineConfig::for_testing(12345)).unwrap();
    /// assert_eq!(game.turn_number(), 0);
    /// assert!(game.player_id().is_none());
    /// ```
    pub fn new(config: EngineConfig) -> WarrensResult<Self> {
        config.validate()?;
        Ok(Self::with_libraries(config, Libraries::standard()?))
    }

    pub fn with_libraries(config: EngineConfig, libraries: Libraries) -> Self {
        let seed = config.seed();
        let context = TurnContext::new(config.message_buffer_length, config.event_queue_size, seed);
        Self {
            config,
            levels: Vec::new(),
            current_level: LevelId(0),
            player_id: None,
            libraries,
            active_effects: Vec::new(),
            status: GameStatus::Playing,
            turn_number: 0,
            rng_seed: seed,
            statistics: GameStatistics::new(),
            context,
        }
    }

    /// Town on top, `dungeon_depth` dungeon levels below it chained by
    /// stairs, and a cave linking the town with the deepest level.
    pub fn setup_new_game(&mut self) -> WarrensResult<()> {
        let town = self.add_town_level()?;
        let depth = self.config.dungeon_depth.max(1);

        let mut upper = town;
        let mut deepest = town;
        for difficulty in 1..=depth {
            let dungeon = self.add_dungeon_level(difficulty)?;
            let from = if upper == town {
                self.free_tile(town, difficulty as u64)?
            } else {
                self.level(upper)?.map.exit
            };
            let to = self.level(dungeon)?.map.entry;
            self.connect_levels(upper, from, Portal::stairs_down(), dungeon, to, Portal::stairs_up())?;
            upper = dungeon;
            deepest = dungeon;
        }

        let exit_pos = self.level(deepest)?.map.exit;
        let mut exit = Portal::stairs_down();
        exit.is_exit = true;
        exit.message = "You find a way out of the warrens.".to_string();
        self.level_mut(deepest)?.add_actor(exit, exit_pos)?;

        let cave = self.add_cave_level((depth + 1) / 2)?;
        let town_mouth = self.free_tile(town, 7)?;
        let cave_entry = self.level(cave)?.map.entry;
        self.connect_levels(town, town_mouth, Portal::cave_mouth(), cave, cave_entry, Portal::cave_mouth())?;
        let deep_mouth = self.free_tile(deepest, 11)?;
        let cave_exit = self.level(cave)?.map.exit;
        self.connect_levels(deepest, deep_mouth, Portal::cave_mouth(), cave, cave_exit, Portal::cave_mouth())?;

        let start = self.level(town)?.map.entry;
        let player = self.place_player(town, start)?;
        self.give_starting_items(player)?;
        if self.config.quick_start {
            self.place_starter_chest(town, start)?;
        }

        self.context.message("Welcome to the warrens. Find the way out below.");
        self.refresh_fov();
        log::info!("New game set up with {} levels", self.levels.len());
        Ok(())
    }

    /// One cave with the player at its entry and the way out at its exit.
    pub fn setup_debug_game(&mut self) -> WarrensResult<()> {
        let cave = self.add_cave_level(1)?;
        let exit_pos = self.level(cave)?.map.exit;
        let mut exit = Portal::cave_mouth();
        exit.is_exit = true;
        if exit_pos != self.level(cave)?.map.entry {
            self.level_mut(cave)?.add_actor(exit, exit_pos)?;
        }
        let start = self.level(cave)?.map.entry;
        let player = self.place_player(cave, start)?;
        self.give_starting_items(player)?;
        self.refresh_fov();
        log::info!("Debug game set up");
        Ok(())
    }

    /// Registers a level built from `map`. Town levels get daylight.
    pub fn add_level(&mut self, map: Map, name: &str, kind: LevelKind, difficulty: u32) -> LevelId {
        let id = LevelId(self.levels.len());
        let radius = match kind {
            LevelKind::Town => self.config.daylight_radius,
            _ => self.config.torch_radius,
        };
        self.levels.push(Level::new(id, name, kind, difficulty, radius, map));
        log::info!("Added {} ({:?}, difficulty {})", name, kind, difficulty);
        id
    }

    /// Generates a dungeon level and fills its rooms with monsters and loot.
    pub fn add_dungeon_level(&mut self, difficulty: u32) -> WarrensResult<LevelId> {
        let mut rng = self.level_rng();
        let map = self.generate(&DungeonGenerator, &mut rng)?;
        let rooms = map.areas.clone();
        let id = self.add_level(map, &format!("Dungeon level {}", difficulty), LevelKind::Dungeon, difficulty);
        self.populate_rooms(id, &rooms, &mut rng)?;
        Ok(id)
    }

    /// Generates a cave with aberrations and loot scattered around.
    pub fn add_cave_level(&mut self, difficulty: u32) -> WarrensResult<LevelId> {
        let mut rng = self.level_rng();
        let map = self.generate(&CaveGenerator, &mut rng)?;
        let id = self.add_level(map, "Cave", LevelKind::Cave, difficulty);
        self.populate_cave(id, &mut rng)?;
        Ok(id)
    }

    /// Generates the town, one house interior per house, and a villager in
    /// every house.
    pub fn add_town_level(&mut self) -> WarrensResult<LevelId> {
        let mut rng = self.level_rng();
        let map = self.generate(&TownGenerator, &mut rng)?;
        let houses: Vec<Room> = map.areas.clone();
        let (width, height) = (map.width(), map.height());
        let town = self.add_level(map, "Town", LevelKind::Town, 0);

        for (i, house) in houses.iter().enumerate() {
            let Some(door) = house.door else {
                continue;
            };
            let interior =
                SingleRoomGenerator::for_room(*house).generate_map(width, height, &self.config.generation, &mut rng)?;
            let center = interior.entry;
            let house_id = self.add_level(interior, &format!("House {}", i + 1), LevelKind::House, 0);
            self.level_mut(house_id)?.parent = Some(town);
            self.level_mut(town)?.sub_levels.push(house_id);
            self.connect_levels(town, door, Portal::door(), house_id, door, Portal::door())?;

            let name = VILLAGER_NAMES.choose(&mut rng).copied().unwrap_or("Villager");
            self.level_mut(house_id)?.add_actor(Character::new_npc(name), center)?;
        }
        Ok(town)
    }

    /// Places a portal on each side and points them at each other.
    pub fn connect_levels(
        &mut self,
        from_level: LevelId,
        from_pos: Position,
        mut from_portal: Portal,
        to_level: LevelId,
        to_pos: Position,
        mut to_portal: Portal,
    ) -> WarrensResult<(ActorId, ActorId)> {
        let from_id = from_portal.info.id;
        let to_id = to_portal.info.id;
        from_portal.destination = Some(PortalLink {
            level: to_level,
            portal: to_id,
        });
        to_portal.destination = Some(PortalLink {
            level: from_level,
            portal: from_id,
        });
        self.level_mut(from_level)?.add_actor(from_portal, from_pos)?;
        self.level_mut(to_level)?.add_actor(to_portal, to_pos)?;
        Ok((from_id, to_id))
    }

    /// Puts a fresh player on a level and makes it the current one.
    pub fn place_player(&mut self, level: LevelId, pos: Position) -> WarrensResult<ActorId> {
        let player = Character::new_player("Adventurer");
        let id = self.level_mut(level)?.add_actor(player, pos)?;
        self.player_id = Some(id);
        self.current_level = level;
        self.statistics.deepest_difficulty = self.level(level)?.difficulty;
        Ok(id)
    }

    /// Resolves one player intent and everything that follows from it.
    ///
    /// An `InvalidAction` error means the intent was rejected and no turn
    /// passed. A finished game rejects everything with `InvalidState`.
    pub fn try_to_play_turn(&mut self, intent: Intent) -> WarrensResult<TurnOutcome> {
        if let GameStatus::Finished(outcome) = self.status {
            return Err(WarrensError::InvalidState(format!("The game is over: {}", outcome)));
        }
        let player = self
            .player_id
            .ok_or_else(|| WarrensError::InvalidState("No player in the game".to_string()))?;

        self.context.begin_turn();
        if let Err(e) = self.resolve_intent(player, &intent) {
            log::warn!("Rejected {:?}: {}", intent, e);
            self.context.take_turn_events();
            return Err(e);
        }

        self.turn_number += 1;
        if !self.status.is_finished() {
            self.run_monsters(player);
            self.tick_effects();
            self.refresh_fov();
            self.check_player_death();
        }

        let events = self.context.take_turn_events();
        for event in &events {
            self.statistics.update_from_event(event, player);
        }
        Ok(TurnOutcome {
            turn: self.turn_number,
            events,
            status: self.status,
        })
    }

    /// Applies damage outside of combat, e.g. from a trap, and ends the game
    /// if that killed the player.
    pub fn inflict_damage(&mut self, target: ActorId, amount: i32, source: Option<ActorId>) -> WarrensResult<DamageOutcome> {
        let (level, ctx) = self.level_and_context()?;
        let outcome = combat::apply_damage(level, target, amount, source, ctx);
        self.check_player_death();
        Ok(outcome)
    }

    /// Starts an effect. Instant effects apply right away, lasting ones
    /// wait for the scheduler.
    pub fn register_effect(&mut self, effect: Effect) -> WarrensResult<()> {
        let level = self
            .levels
            .get_mut(effect.level.0)
            .ok_or_else(|| WarrensError::InvalidState(format!("Unknown {}", effect.level)))?;
        if effect.kind == EffectKind::Confuse {
            effect.install_confusion(level, &mut self.context);
        } else if effect.remaining == 0 {
            effect.apply(level, &mut self.context);
        }
        if effect.remaining > 0 {
            self.active_effects.push(effect);
        }
        Ok(())
    }

    /// One scheduler tick: every active effect applies once and counts down.
    pub fn tick_effects(&mut self) {
        let effects = std::mem::take(&mut self.active_effects);
        for mut effect in effects {
            if let Some(level) = self.levels.get_mut(effect.level.0) {
                effect.apply(level, &mut self.context);
            }
            effect.remaining = effect.remaining.saturating_sub(1);
            if effect.remaining > 0 {
                self.active_effects.push(effect);
            }
        }
    }

    /// Recomputes what the player sees if anything changed.
    pub fn refresh_fov(&mut self) {
        let Some(player) = self.player_id else {
            return;
        };
        let Some(level) = self.levels.get_mut(self.current_level.0) else {
            return;
        };
        if let Some(origin) = level.position_of(player) {
            let radius = level.view_radius;
            refresh_field_of_view(&mut level.map, origin, radius);
        }
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::from_game(self)
    }

    /// Queues a message for every client, outside of any turn.
    pub fn put_message(&mut self, text: impl Into<String>) {
        self.context.message(text);
    }

    /// Hands over events queued since the last call.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.context.drain_pending()
    }

    pub fn save_to_json(&self) -> WarrensResult<String> {
        let document = SaveDocumentRef {
            format_version: SAVE_FORMAT_VERSION,
            game: self,
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Restores a game saved by [`Game::save_to_json`].
    pub fn load_from_json(json: &str) -> WarrensResult<Self> {
        let header: SaveHeader = serde_json::from_str(json)
            .map_err(|e| WarrensError::Persistence(format!("Corrupt save: {}", e)))?;
        if header.format_version != SAVE_FORMAT_VERSION {
            return Err(WarrensError::Persistence(format!(
                "Save format version {} is not supported, expected {}",
                header.format_version, SAVE_FORMAT_VERSION
            )));
        }
        let document: SaveDocument = serde_json::from_str(json)
            .map_err(|e| WarrensError::Persistence(format!("Corrupt save: {}", e)))?;
        let mut game = document.game;
        game.context.reseed(game.rng_seed.wrapping_add(game.turn_number));
        Ok(game)
    }

    pub fn save_game(&self, path: impl AsRef<Path>) -> WarrensResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.save_to_json()?)?;
        log::info!("Saved game at turn {} to {}", self.turn_number, path.display());
        Ok(())
    }

    pub fn load_game(path: impl AsRef<Path>) -> WarrensResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let game = Self::load_from_json(&json)?;
        log::info!("Loaded game at turn {} from {}", game.turn_number, path.display());
        Ok(game)
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    pub fn turn_number(&self) -> u64 {
        self.turn_number
    }

    pub fn player_id(&self) -> Option<ActorId> {
        self.player_id
    }

    pub fn player(&self) -> Option<&Character> {
        let id = self.player_id?;
        self.levels.iter().find_map(|level| level.character(id))
    }

    pub fn player_mut(&mut self) -> Option<&mut Character> {
        let id = self.player_id?;
        self.levels.iter_mut().find_map(|level| level.character_mut(id))
    }

    pub fn player_position(&self) -> Option<Position> {
        let id = self.player_id?;
        self.current_level()?.position_of(id)
    }

    pub fn current_level_id(&self) -> LevelId {
        self.current_level
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level(&self, id: LevelId) -> WarrensResult<&Level> {
        self.levels
            .get(id.0)
            .ok_or_else(|| WarrensError::InvalidState(format!("Unknown {}", id)))
    }

    pub fn level_mut(&mut self, id: LevelId) -> WarrensResult<&mut Level> {
        self.levels
            .get_mut(id.0)
            .ok_or_else(|| WarrensError::InvalidState(format!("Unknown {}", id)))
    }

    /// Level the player is on, if the game has been set up.
    pub fn current_level(&self) -> Option<&Level> {
        self.levels.get(self.current_level.0)
    }

    pub fn active_effects(&self) -> &[Effect] {
        &self.active_effects
    }

    pub fn messages(&self) -> Vec<String> {
        self.context.messages.to_vec()
    }

    pub fn context_mut(&mut self) -> &mut TurnContext {
        &mut self.context
    }

    /// The current level and the turn context, borrowed side by side.
    pub(crate) fn level_and_context(&mut self) -> WarrensResult<(&mut Level, &mut TurnContext)> {
        let level = self
            .levels
            .get_mut(self.current_level.0)
            .ok_or_else(|| WarrensError::InvalidState("No current level".to_string()))?;
        Ok((level, &mut self.context))
    }

    /// Moves the player through a portal onto another level.
    pub(crate) fn transfer_player(&mut self, player: ActorId, link: PortalLink) -> WarrensResult<()> {
        let destination = self
            .level(link.level)?
            .position_of(link.portal)
            .ok_or_else(|| WarrensError::InvalidState(format!("Portal {} has no tile", link.portal)))?;
        if !self.level(link.level)?.is_walkable(destination) {
            return Err(WarrensError::InvalidAction("Something blocks the other side".to_string()));
        }
        let from = self.current_level;
        let actor = self
            .level_mut(from)?
            .remove_actor(player)
            .ok_or_else(|| WarrensError::InvalidState("Player is not on the current level".to_string()))?;
        self.level_mut(link.level)?.add_actor(actor, destination)?;
        self.current_level = link.level;

        let difficulty = self.level(link.level)?.difficulty;
        self.statistics.deepest_difficulty = self.statistics.deepest_difficulty.max(difficulty);
        self.context.emit(GameEvent::LevelChanged { from, to: link.level });
        log::info!("Player moved from {} to {}", from, link.level);
        self.refresh_fov();
        Ok(())
    }

    pub(crate) fn finish(&mut self, outcome: GameOutcome) {
        if self.status.is_finished() {
            return;
        }
        self.status = GameStatus::Finished(outcome);
        self.context.emit(GameEvent::GameFinished { outcome });
        log::info!("Game finished at turn {}: {}", self.turn_number, outcome);
    }

    fn run_monsters(&mut self, player: ActorId) {
        let Some(level) = self.levels.get_mut(self.current_level.0) else {
            return;
        };
        let target = level.position_of(player).map(|_| player);
        for id in level.active_characters() {
            if id == player || !level.character(id).map_or(false, Character::is_alive) {
                continue;
            }
            ai::run(id, level, target, &mut self.context);
        }
    }

    fn check_player_death(&mut self) {
        if self.player().map_or(false, |p| !p.is_alive()) {
            self.context.message("You die...");
            self.finish(GameOutcome::PlayerDied);
        }
    }

    fn level_rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.rng_seed.wrapping_add(self.levels.len() as u64 * 1000))
    }

    fn generate(&self, generator: &dyn MapGenerator, rng: &mut StdRng) -> WarrensResult<Map> {
        generator.generate_map(
            self.config.map_width,
            self.config.map_height,
            &self.config.generation,
            rng,
        )
    }

    /// A random empty tile on a level, seeded per call site.
    fn free_tile(&self, level: LevelId, salt: u64) -> WarrensResult<Position> {
        let mut rng = StdRng::seed_from_u64(self.rng_seed.wrapping_add(salt).wrapping_add(level.0 as u64 * 31));
        self.level(level)?
            .random_empty_position(&mut rng)
            .ok_or_else(|| WarrensError::GenerationFailed(format!("No free tile left on {}", level)))
    }

    /// Every room but the first gets up to `max_monsters_per_room`
    /// monsters; every room gets up to `max_items_per_room` items.
    fn populate_rooms(&mut self, id: LevelId, rooms: &[Room], rng: &mut StdRng) -> WarrensResult<()> {
        let difficulty = self.level(id)?.difficulty.max(1);
        let max_monsters = MonsterLibrary::max_monsters_per_room(difficulty);
        let max_items = ItemLibrary::max_items_per_room(difficulty);

        for (i, room) in rooms.iter().enumerate() {
            let floor = room.floor_positions();
            if i > 0 {
                for _ in 0..rng.gen_range(0..=max_monsters) {
                    let monster = match self.libraries.monsters.get_random_monster(rng, difficulty) {
                        Ok(monster) => monster,
                        Err(e) => {
                            log::debug!("No monster for room {}: {}", i, e);
                            break;
                        }
                    };
                    let level = self.level_mut(id)?;
                    let free: Vec<Position> = floor.iter().copied().filter(|p| level.is_walkable(*p)).collect();
                    if let Some(pos) = free.choose(rng) {
                        level.add_actor(monster, *pos)?;
                    }
                }
            }
            for _ in 0..rng.gen_range(0..=max_items) {
                let item = self.libraries.items.get_random_item(rng, difficulty)?;
                let level = self.level_mut(id)?;
                let open: Vec<Position> = floor.iter().copied().filter(|p| !level.map.is_blocked(*p)).collect();
                if let Some(pos) = open.choose(rng) {
                    level.add_actor(item, *pos)?;
                }
            }
        }
        Ok(())
    }

    fn populate_cave(&mut self, id: LevelId, rng: &mut StdRng) -> WarrensResult<()> {
        let difficulty = self.level(id)?.difficulty.max(1);
        let monsters = 2 + difficulty;
        let items = 3 * ItemLibrary::max_items_per_room(difficulty);

        for _ in 0..monsters {
            let monster = self.libraries.monsters.generate_monster(rng, difficulty);
            let level = self.level_mut(id)?;
            let entry = level.map.entry;
            let Some(pos) = level.random_empty_position(rng) else {
                break;
            };
            // keep the arrival tile and its surroundings clear
            if pos.chebyshev_distance(entry) > 1 {
                level.add_actor(monster, pos)?;
            }
        }
        for _ in 0..items {
            let item = self.libraries.items.get_random_item(rng, difficulty)?;
            let level = self.level_mut(id)?;
            if let Some(pos) = level.random_empty_position(rng) {
                level.add_actor(item, pos)?;
            }
        }
        Ok(())
    }

    fn give_starting_items(&mut self, player: ActorId) -> WarrensResult<()> {
        let mut potions = self.libraries.items.create_item("healingpotion")?;
        potions.stack_size = 2;
        let character = self
            .levels
            .iter_mut()
            .find_map(|level| level.character_mut(player))
            .ok_or_else(|| WarrensError::InvalidState("Player vanished".to_string()))?;
        character.inventory.add(potions);
        Ok(())
    }

    /// A chest next to the player with random gear and a few scrolls.
    fn place_starter_chest(&mut self, level: LevelId, near: Position) -> WarrensResult<()> {
        let mut rng = StdRng::seed_from_u64(self.rng_seed.wrapping_add(1));
        let mut chest = Chest::new("Supply chest");
        for _ in 0..3 {
            chest.inventory.add(self.libraries.items.get_random_item(&mut rng, 3)?);
        }
        chest.inventory.add(self.libraries.items.create_item("fireball")?);
        chest.inventory.add(self.libraries.items.create_item("confusion")?);

        let target = self.level(level)?;
        let pos = near
            .neighbors()
            .find(|p| !target.map.is_blocked(*p) && target.actor_ids_at(*p).is_empty())
            .unwrap_or(near);
        self.level_mut(level)?.add_actor(Actor::Chest(chest), pos)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::game::actors::tests::monster;
    use crate::game::level::tests::open_level;
    use crate::game::{Direction, EffectScope, Element, Entity, HitDie, LifeState};
    use uuid::Uuid;

    /// A game on a single open 12x8 room with the player at (2, 2).
    pub(crate) fn arena() -> Game {
        let mut game = Game::new(EngineConfig::for_testing(7)).unwrap();
        let level = open_level(12, 8);
        let id = game.add_level(level.map, "Arena", LevelKind::SingleRoom, 1);
        game.place_player(id, Position::new(2, 2)).unwrap();
        game.refresh_fov();
        game
    }

    fn fire_area(game: &Game, center: Position, remaining: u32) -> Effect {
        let tiles = vec![center];
        Effect {
            id: Uuid::new_v4(),
            kind: EffectKind::Damage,
            scope: EffectScope::Area { center, tiles },
            level: game.current_level_id(),
            element: Element::Fire,
            hit_die: HitDie::new(1, 1),
            remaining,
            source: game.player_id(),
            source_name: "test".to_string(),
        }
    }

    #[test]
    fn test_game_creation() {
        let game = Game::new(EngineConfig::for_testing(12345)).unwrap();
        assert_eq!(game.turn_number(), 0);
        assert!(game.player_id().is_none());
        assert_eq!(game.rng_seed, 12345);
        assert_eq!(game.status(), GameStatus::Playing);
    }

    #[test]
    fn test_move_consumes_turn() {
        let mut game = arena();
        let outcome = game.try_to_play_turn(Intent::Move { direction: Direction::East }).unwrap();

        assert_eq!(outcome.turn, 1);
        assert_eq!(game.player_position(), Some(Position::new(3, 2)));
        assert_eq!(game.statistics.steps_taken, 1);
    }

    #[test]
    fn test_rejected_intent_keeps_turn() {
        let mut game = arena();
        game.try_to_play_turn(Intent::Move { direction: Direction::North }).unwrap();
        // (2, 1) is next to the border, (2, 0) is the border
        let result = game.try_to_play_turn(Intent::Move { direction: Direction::North });

        assert!(matches!(result, Err(WarrensError::InvalidAction(_))));
        assert_eq!(game.turn_number(), 1);
        assert_eq!(game.player_position(), Some(Position::new(2, 1)));
    }

    #[test]
    fn test_player_death_finishes_game() {
        let mut game = arena();
        let player = game.player_id().unwrap();
        {
            let character = game.player_mut().unwrap();
            character.hit_points.max = 10;
            character.hit_points.current = 10;
        }

        assert_eq!(game.inflict_damage(player, 6, None).unwrap(), DamageOutcome::Survived);
        assert_eq!(game.player().unwrap().hit_points.current, 4);
        assert_eq!(game.player().unwrap().life, LifeState::Active);
        assert_eq!(game.status(), GameStatus::Playing);

        assert_eq!(game.inflict_damage(player, 6, None).unwrap(), DamageOutcome::Killed);
        assert_eq!(game.player().unwrap().hit_points.current, 0);
        assert_eq!(game.player().unwrap().life, LifeState::Dead);
        assert_eq!(game.status(), GameStatus::Finished(GameOutcome::PlayerDied));

        assert_eq!(game.inflict_damage(player, 6, None).unwrap(), DamageOutcome::AlreadyDead);
        let result = game.try_to_play_turn(Intent::Wait);
        assert!(matches!(result, Err(WarrensError::InvalidState(_))));
    }

    #[test]
    fn test_effect_with_duration_ticks_exactly_n_times() {
        let mut game = arena();
        let target = Position::new(8, 5);
        let dummy = game
            .level_mut(game.current_level_id())
            .unwrap()
            .add_actor(monster("dummy", 100), target)
            .unwrap();

        game.register_effect(fire_area(&game, target, 3)).unwrap();
        assert_eq!(game.active_effects().len(), 1);

        let hp = |game: &Game| game.current_level().unwrap().character(dummy).unwrap().hit_points.current;
        for expected in [99, 98, 97] {
            game.tick_effects();
            assert_eq!(hp(&game), expected);
        }
        assert!(game.active_effects().is_empty());
        game.tick_effects();
        assert_eq!(hp(&game), 97);
    }

    #[test]
    fn test_instant_effect_applies_once_and_is_not_registered() {
        let mut game = arena();
        let target = Position::new(8, 5);
        let dummy = game
            .level_mut(game.current_level_id())
            .unwrap()
            .add_actor(monster("dummy", 100), target)
            .unwrap();

        game.register_effect(fire_area(&game, target, 0)).unwrap();
        assert!(game.active_effects().is_empty());
        game.tick_effects();
        assert_eq!(game.current_level().unwrap().character(dummy).unwrap().hit_points.current, 99);
    }

    #[test]
    fn test_statistics_update() {
        let player = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut stats = GameStatistics::new();

        stats.update_from_event(
            &GameEvent::ActorMoved {
                actor: player,
                from: Position::new(0, 0),
                to: Position::new(1, 0),
            },
            player,
        );
        stats.update_from_event(
            &GameEvent::ActorDamaged {
                actor: other,
                damage: 25,
                source: Some(player),
            },
            player,
        );
        stats.update_from_event(
            &GameEvent::ActorDamaged {
                actor: player,
                damage: 4,
                source: Some(other),
            },
            player,
        );
        stats.update_from_event(&GameEvent::ActorDied { actor: other, killer: Some(player) }, player);

        assert_eq!(stats.steps_taken, 1);
        assert_eq!(stats.damage_dealt, 25);
        assert_eq!(stats.damage_taken, 4);
        assert_eq!(stats.monsters_slain, 1);
    }

    #[test]
    fn test_game_serialization() {
        let mut game = arena();
        game.try_to_play_turn(Intent::Wait).unwrap();
        let json = game.save_to_json().unwrap();

        let _: serde_json::Value = serde_json::from_str(&json).unwrap();
        let loaded = Game::load_from_json(&json).unwrap();
        assert_eq!(loaded.turn_number(), 1);
        assert_eq!(loaded.levels(), game.levels());
        assert_eq!(loaded.player_position(), game.player_position());
    }

    #[test]
    fn test_load_rejects_other_versions_and_garbage() {
        let game = arena();
        let json = game.save_to_json().unwrap().replacen(
            &format!("\"format_version\": {}", SAVE_FORMAT_VERSION),
            "\"format_version\": 99",
            1,
        );
        assert!(matches!(Game::load_from_json(&json), Err(WarrensError::Persistence(_))));
        assert!(matches!(Game::load_from_json("{ not json"), Err(WarrensError::Persistence(_))));
    }

    #[test]
    fn test_new_game_layout() {
        let mut game = Game::new(EngineConfig::for_testing(21)).unwrap();
        game.setup_new_game().unwrap();

        let town = game.current_level().unwrap();
        assert_eq!(town.kind, LevelKind::Town);
        assert!(!town.sub_levels.is_empty());
        let dungeons = game.levels().iter().filter(|l| l.kind == LevelKind::Dungeon).count();
        assert_eq!(dungeons, 2);
        assert_eq!(game.levels().iter().filter(|l| l.kind == LevelKind::Cave).count(), 1);

        let player = game.player().unwrap();
        assert_eq!(player.inventory.items()[0].key(), "healingpotion");
        assert_eq!(player.inventory.items()[0].stack_size, 2);
        assert!(!game.current_level().unwrap().map.visible_tiles().is_empty());
    }

    #[test]
    fn test_debug_game_is_one_cave() {
        let mut game = Game::new(EngineConfig::for_testing(3)).unwrap();
        game.setup_debug_game().unwrap();
        assert_eq!(game.levels().len(), 1);
        assert_eq!(game.current_level().unwrap().kind, LevelKind::Cave);
        assert!(game.player_position().is_some());
    }
}
