//! # Monster AI
//!
//! A monster's AI is plain data stored on the monster so it survives a save.
//! Confusion wraps the previous AI and hands control back when it wears off.

use crate::config::MONSTER_PERCEPTION_RANGE;
use crate::game::actors::Entity;
use crate::game::combat;
use crate::game::context::{GameEvent, TurnContext};
use crate::game::fov::has_line_of_sight;
use crate::game::level::Level;
use crate::game::{ActorId, Position};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "ai", rename_all = "snake_case")]
pub enum Ai {
    /// Chases and attacks the player once it is in sight
    #[default]
    Basic,
    /// Wanders randomly, then restores `inner`
    Confused { turns_left: u32, inner: Box<Ai> },
}

impl Ai {
    pub fn confused(inner: Ai, turns: u32) -> Self {
        // Confusing a confused monster only extends the wander
        let inner = match inner {
            Ai::Confused { inner, .. } => *inner,
            other => other,
        };
        Ai::Confused {
            turns_left: turns.max(1),
            inner: Box::new(inner),
        }
    }

    pub fn is_confused(&self) -> bool {
        matches!(self, Ai::Confused { .. })
    }

    /// Plays one turn for `me`.
    pub fn take_turn(&mut self, me: ActorId, level: &mut Level, player: Option<ActorId>, ctx: &mut TurnContext) {
        match self {
            Ai::Basic => basic_turn(me, level, player, ctx),
            Ai::Confused { turns_left, inner } => {
                let name = level.actor(me).map(|a| a.name()).unwrap_or_default();
                if *turns_left > 0 {
                    wander(me, level, ctx);
                    ctx.message(format!("{} stumbles around (confused).", name));
                    *turns_left -= 1;
                }
                if *turns_left == 0 {
                    let restored = std::mem::take(inner.as_mut());
                    *self = restored;
                    ctx.message(format!("{} is no longer confused.", name));
                }
            }
        }
    }
}

/// Runs the AI stored on a monster. Characters without an AI do nothing.
pub fn run(me: ActorId, level: &mut Level, player: Option<ActorId>, ctx: &mut TurnContext) {
    let Some(profile) = level.character_mut(me).and_then(|c| c.monster_profile_mut()) else {
        return;
    };
    let mut ai = std::mem::take(&mut profile.ai);
    ai.take_turn(me, level, player, ctx);
    if let Some(profile) = level.character_mut(me).and_then(|c| c.monster_profile_mut()) {
        profile.ai = ai;
    }
}

fn basic_turn(me: ActorId, level: &mut Level, player: Option<ActorId>, ctx: &mut TurnContext) {
    let Some(player) = player else {
        return;
    };
    let (Some(from), Some(target)) = (level.position_of(me), level.position_of(player)) else {
        return;
    };
    if from.euclidean_distance(target) > MONSTER_PERCEPTION_RANGE || !has_line_of_sight(&level.map, from, target) {
        return;
    }

    if from.chebyshev_distance(target) == 1 {
        combat::attack(level, me, player, ctx);
        return;
    }

    let current = from.euclidean_distance(target);
    let best = from
        .neighbors()
        .filter(|pos| level.is_walkable(*pos))
        .map(|pos| (pos, pos.euclidean_distance(target)))
        .filter(|(_, distance)| *distance < current)
        .min_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((to, _)) = best {
        step(me, from, to, level, ctx);
    }
}

fn wander(me: ActorId, level: &mut Level, ctx: &mut TurnContext) {
    let Some(from) = level.position_of(me) else {
        return;
    };
    let free: Vec<Position> = from.neighbors().filter(|pos| level.is_walkable(*pos)).collect();
    if let Some(to) = free.choose(ctx.rng()).copied() {
        step(me, from, to, level, ctx);
    }
}

fn step(me: ActorId, from: Position, to: Position, level: &mut Level, ctx: &mut TurnContext) {
    if level.move_actor(me, to).is_ok() {
        ctx.emit(GameEvent::ActorMoved { actor: me, from, to });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::actors::tests::monster;
    use crate::game::actors::Character;
    use crate::game::level::tests::open_level;

    #[test]
    fn test_basic_ai_approaches_player() {
        let mut level = open_level(20, 10);
        let hero = level.add_actor(Character::new_player("Hero"), Position::new(2, 5)).unwrap();
        let rat = level.add_actor(monster("rat", 5), Position::new(8, 5)).unwrap();
        let mut ctx = TurnContext::new(5, 20, 1);

        run(rat, &mut level, Some(hero), &mut ctx);
        assert_eq!(level.position_of(rat), Some(Position::new(7, 5)));
    }

    #[test]
    fn test_basic_ai_ignores_player_out_of_range() {
        let mut level = open_level(30, 10);
        let hero = level.add_actor(Character::new_player("Hero"), Position::new(2, 5)).unwrap();
        let rat = level.add_actor(monster("rat", 5), Position::new(20, 5)).unwrap();
        let mut ctx = TurnContext::new(5, 20, 1);

        run(rat, &mut level, Some(hero), &mut ctx);
        assert_eq!(level.position_of(rat), Some(Position::new(20, 5)));
    }

    #[test]
    fn test_basic_ai_attacks_when_adjacent() {
        let mut level = open_level(10, 10);
        let hero = level.add_actor(Character::new_player("Hero"), Position::new(2, 2)).unwrap();
        let rat = level.add_actor(monster("rat", 5), Position::new(3, 3)).unwrap();
        let mut ctx = TurnContext::new(5, 20, 1);

        run(rat, &mut level, Some(hero), &mut ctx);
        assert_eq!(level.position_of(rat), Some(Position::new(3, 3)));
        assert!(!ctx.messages.is_empty());
    }

    #[test]
    fn test_confusion_wears_off() {
        let mut level = open_level(10, 10);
        let rat = level.add_actor(monster("rat", 5), Position::new(5, 5)).unwrap();
        level.character_mut(rat).unwrap().monster_profile_mut().unwrap().ai = Ai::confused(Ai::Basic, 2);
        let mut ctx = TurnContext::new(5, 20, 3);

        run(rat, &mut level, None, &mut ctx);
        assert!(level.character(rat).unwrap().monster_profile().unwrap().ai.is_confused());
        run(rat, &mut level, None, &mut ctx);
        assert_eq!(level.character(rat).unwrap().monster_profile().unwrap().ai, Ai::Basic);
        assert!(ctx.messages.iter().any(|m| m == "rat is no longer confused."));
    }

    #[test]
    fn test_confusing_twice_does_not_nest() {
        let ai = Ai::confused(Ai::confused(Ai::Basic, 3), 2);
        assert_eq!(
            ai,
            Ai::Confused {
                turns_left: 2,
                inner: Box::new(Ai::Basic)
            }
        );
    }
}
