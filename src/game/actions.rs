//! # Actions
//!
//! Player intents and how the game resolves them.
//!
//! Resolution checks everything before it changes anything, so a rejected
//! intent (an `InvalidAction` error) leaves the game exactly as it was.

use crate::game::actors::{Actor, Entity};
use crate::game::context::GameEvent;
use crate::game::effects::Effect;
use crate::game::state::{Game, GameOutcome};
use crate::game::{combat, ActorId, Direction, Position};
use crate::{WarrensError, WarrensResult};
use serde::{Deserialize, Serialize};

/// Explicit target for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Actor(ActorId),
    Tile(Position),
}

/// What a client asks the player to do this turn.
///
/// ```
/// use warrens::{Direction, Intent};
///
/// let intent: Intent = serde_json::from_str(r#"{"kind":"move","direction":"north"}"#).unwrap();
/// assert_eq!(intent, Intent::Move { direction: Direction::North });
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Intent {
    /// Step to a neighbouring tile; bumping into a monster attacks it
    Move { direction: Direction },
    Attack { direction: Direction },
    UseItem {
        item: ActorId,
        #[serde(default)]
        target: Option<Target>,
    },
    DropItem { item: ActorId },
    /// Equips the item, or takes it off when it is already equipped
    Equip { item: ActorId },
    /// Opens a chest or picks up the top item on the player's tile
    Interact,
    FollowPortal,
    Wait,
}

fn rejected(text: impl Into<String>) -> WarrensError {
    WarrensError::InvalidAction(text.into())
}

impl Game {
    pub(crate) fn resolve_intent(&mut self, player: ActorId, intent: &Intent) -> WarrensResult<()> {
        match intent {
            Intent::Move { direction } => self.player_move(player, *direction),
            Intent::Attack { direction } => self.player_attack(player, *direction),
            Intent::UseItem { item, target } => self.player_use_item(player, *item, *target),
            Intent::DropItem { item } => self.player_drop_item(player, *item),
            Intent::Equip { item } => self.player_equip(player, *item),
            Intent::Interact => self.player_interact(player),
            Intent::FollowPortal => self.player_follow_portal(player),
            Intent::Wait => Ok(()),
        }
    }

    fn player_tile(&self, player: ActorId) -> WarrensResult<Position> {
        self.current_level()
            .and_then(|level| level.position_of(player))
            .ok_or_else(|| WarrensError::InvalidState("Player is not on the map".to_string()))
    }

    fn player_move(&mut self, player: ActorId, direction: Direction) -> WarrensResult<()> {
        let from = self.player_tile(player)?;
        let to = from.step(direction);
        let (level, ctx) = self.level_and_context()?;

        if let Some(blocker) = level.blocking_actor_at(to) {
            if level.character(blocker).map_or(false, |c| c.is_monster()) {
                combat::attack(level, player, blocker, ctx);
                return Ok(());
            }
            let name = level.actor(blocker).map(|a| a.name()).unwrap_or_default();
            return Err(rejected(format!("{} is in the way", name)));
        }

        level.move_actor(player, to)?;
        ctx.emit(GameEvent::ActorMoved { actor: player, from, to });
        Ok(())
    }

    fn player_attack(&mut self, player: ActorId, direction: Direction) -> WarrensResult<()> {
        let to = self.player_tile(player)?.step(direction);
        let (level, ctx) = self.level_and_context()?;
        let defender = level
            .characters_at(to)
            .into_iter()
            .next()
            .ok_or_else(|| rejected("There is nobody there to attack"))?;
        if let Some(other) = level.character(defender).filter(|c| !c.is_monster()) {
            return Err(rejected(format!("You do not want to attack {}", other.name())));
        }
        combat::attack(level, player, defender, ctx);
        Ok(())
    }

    fn player_use_item(&mut self, player: ActorId, item: ActorId, target: Option<Target>) -> WarrensResult<()> {
        let level_id = self.current_level;
        let level = self.level(level_id)?;
        let character = level
            .character(player)
            .ok_or_else(|| WarrensError::InvalidState("Player is not on the current level".to_string()))?;
        let held = character
            .inventory
            .get(item)
            .ok_or_else(|| rejected("You do not have that item"))?;
        let spec = held
            .effective_consumable()
            .ok_or_else(|| rejected(format!("{} can not be used, try equipping it", held.display_name())))?;
        let effect = Effect::from_consumable(&spec, level, player, target)?;

        let used = self
            .level_mut(level_id)?
            .character_mut(player)
            .and_then(|c| c.inventory.take_one(item))
            .ok_or_else(|| WarrensError::InvalidState("Item vanished from the inventory".to_string()))?;
        self.context.message(format!("You use the {}.", used.info.name));
        self.register_effect(effect)
    }

    fn player_drop_item(&mut self, player: ActorId, item: ActorId) -> WarrensResult<()> {
        let pos = self.player_tile(player)?;
        let (level, ctx) = self.level_and_context()?;
        let character = level
            .character_mut(player)
            .ok_or_else(|| WarrensError::InvalidState("Player is not on the current level".to_string()))?;
        let held = character
            .inventory
            .get(item)
            .ok_or_else(|| rejected("You do not have that item"))?;
        if held.is_equipped() {
            return Err(rejected(format!("Take off the {} first", held.display_name())));
        }
        let dropped = character
            .inventory
            .remove(item)
            .ok_or_else(|| rejected("You do not have that item"))?;
        let name = dropped.display_name();
        level.add_actor(Actor::Item(dropped), pos)?;
        ctx.message(format!("You drop the {}.", name));
        Ok(())
    }

    fn player_equip(&mut self, player: ActorId, item: ActorId) -> WarrensResult<()> {
        let (level, ctx) = self.level_and_context()?;
        let character = level
            .character_mut(player)
            .ok_or_else(|| WarrensError::InvalidState("Player is not on the current level".to_string()))?;
        let held = character
            .inventory
            .get(item)
            .ok_or_else(|| rejected("You do not have that item"))?;
        let name = held.display_name();

        if held.is_equipped() {
            character.inventory.unequip(item)?;
            ctx.message(format!("You take off the {}.", name));
            return Ok(());
        }
        let displaced = character.inventory.equip(item)?;
        if let Some(old) = displaced.and_then(|id| character.inventory.get(id)) {
            ctx.message(format!("You take off the {}.", old.display_name()));
        }
        ctx.message(format!("You equip the {}.", name));
        Ok(())
    }

    fn player_interact(&mut self, player: ActorId) -> WarrensResult<()> {
        let pos = self.player_tile(player)?;
        let (level, ctx) = self.level_and_context()?;
        let here = level.actor_ids_at(pos);

        let chest = here
            .iter()
            .copied()
            .find(|id| matches!(level.actor(*id), Some(Actor::Chest(_))));
        if let Some(chest) = chest {
            let (name, items) = match level.actor_mut(chest).and_then(Actor::as_chest_mut) {
                Some(chest) => (chest.info.name.clone(), chest.inventory.drain()),
                None => return Err(WarrensError::InvalidState("Chest vanished".to_string())),
            };
            if items.is_empty() {
                return Err(rejected(format!("The {} is empty", name)));
            }
            let count = items.len();
            let character = level
                .character_mut(player)
                .ok_or_else(|| WarrensError::InvalidState("Player is not on the current level".to_string()))?;
            for item in items {
                let id = item.info.id;
                character.inventory.add(item);
                ctx.emit(GameEvent::ItemPickedUp { actor: player, item: id });
            }
            ctx.message(format!("You empty the {} and take {} items.", name, count));
            return Ok(());
        }

        let top = here
            .iter()
            .rev()
            .copied()
            .find(|id| level.actor(*id).and_then(Actor::as_item).is_some())
            .ok_or_else(|| rejected("There is nothing here to pick up"))?;
        let Some(Actor::Item(item)) = level.remove_actor(top) else {
            return Err(WarrensError::InvalidState("Item vanished".to_string()));
        };
        let name = item.display_name();
        let character = level
            .character_mut(player)
            .ok_or_else(|| WarrensError::InvalidState("Player is not on the current level".to_string()))?;
        character.inventory.add(item);
        ctx.emit(GameEvent::ItemPickedUp { actor: player, item: top });
        ctx.message(format!("You pick up the {}.", name));
        Ok(())
    }

    fn player_follow_portal(&mut self, player: ActorId) -> WarrensResult<()> {
        let pos = self.player_tile(player)?;
        let level = self.level(self.current_level)?;
        let portal = level
            .actors_at(pos)
            .find_map(Actor::as_portal)
            .cloned()
            .ok_or_else(|| rejected("There is no way onward here"))?;

        match portal.destination {
            Some(link) => {
                self.transfer_player(player, link)?;
                self.context.message(portal.message);
            }
            None if portal.is_exit => {
                self.context.message(portal.message);
                self.finish(GameOutcome::Victory);
            }
            None => return Err(rejected(format!("The {} leads nowhere", portal.info.name))),
        }
        Ok(())
    }
}
