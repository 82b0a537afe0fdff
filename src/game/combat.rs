//! # Combat
//!
//! Melee resolution and the shared damage/death path used by attacks and
//! effects alike.

use crate::game::actors::{Actor, Character, Corpse, DamageOutcome, Entity, Stat};
use crate::game::context::{GameEvent, TurnContext};
use crate::game::level::Level;
use crate::game::ActorId;
use crate::utils::math::percent_check;

/// Result of one melee swing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackResult {
    Missed,
    Hit { damage: i32, outcome: DamageOutcome },
}

/// Chance to hit in percent, clamped to 5..=95.
pub fn hit_chance(attacker: &Character, defender: &Character) -> i32 {
    (50 + attacker.effective(Stat::Accuracy) - defender.effective(Stat::Dodge)).clamp(5, 95)
}

/// Damage for a hit with the given roll. Better rolls hit harder.
pub fn damage_for_roll(attacker: &Character, defender: &Character, chance: i32, roll: i32) -> i32 {
    let base = attacker.effective(Stat::Damage);
    (base + base * (chance - roll) / 100 - defender.effective(Stat::Armor)).max(1)
}

/// `attacker` swings at `defender`. Both must be on `level`.
pub fn attack(level: &mut Level, attacker: ActorId, defender: ActorId, ctx: &mut TurnContext) -> AttackResult {
    let (Some(a), Some(d)) = (level.character(attacker), level.character(defender)) else {
        return AttackResult::Missed;
    };
    let chance = hit_chance(a, d);
    let (hit, roll) = percent_check(ctx.rng(), chance);
    let (attacker_name, defender_name) = (a.name(), d.name());
    if !hit {
        ctx.message(format!("{} misses {}.", attacker_name, defender_name));
        return AttackResult::Missed;
    }
    let damage = damage_for_roll(a, d, chance, roll);
    ctx.message(format!("{} hits {} for {} damage.", attacker_name, defender_name, damage));
    let outcome = apply_damage(level, defender, damage, Some(attacker), ctx);
    AttackResult::Hit { damage, outcome }
}

/// Deals damage and handles a resulting death.
pub fn apply_damage(
    level: &mut Level,
    target: ActorId,
    amount: i32,
    source: Option<ActorId>,
    ctx: &mut TurnContext,
) -> DamageOutcome {
    let Some(character) = level.character_mut(target) else {
        return DamageOutcome::AlreadyDead;
    };
    let outcome = character.take_damage(amount);
    if outcome == DamageOutcome::AlreadyDead {
        return outcome;
    }
    ctx.emit(GameEvent::ActorDamaged {
        actor: target,
        damage: amount,
        source,
    });
    if outcome == DamageOutcome::Killed {
        handle_death(level, target, source, ctx);
    }
    outcome
}

fn handle_death(level: &mut Level, victim: ActorId, killer: Option<ActorId>, ctx: &mut TurnContext) {
    let Some(character) = level.character(victim).cloned() else {
        return;
    };
    let position = if character.is_player() {
        level.unplace(victim)
    } else {
        let pos = level.position_of(victim);
        level.remove_actor(victim);
        pos
    };

    let killer_character = killer.and_then(|id| level.character(id));
    if character.is_player() {
        let by = killer_character
            .and_then(|k| k.monster_profile().map(|p| p.killed_by.clone()))
            .or_else(|| killer_character.map(|k| k.name()))
            .unwrap_or_else(|| "misfortune".to_string());
        ctx.message(format!("{} was killed by {}.", character.name(), by));
    } else {
        ctx.message(format!("{} dies.", character.name()));
    }
    ctx.emit(GameEvent::ActorDied { actor: victim, killer });

    if let Some(pos) = position {
        let corpse = Corpse::from_character(&character);
        if let Err(e) = level.add_actor(Actor::Corpse(corpse), pos) {
            log::warn!("Could not place corpse at {}: {}", pos, e);
        }
    }

    let xp = character.xp_value();
    let Some(killer) = killer.and_then(|id| level.character_mut(id)).filter(|k| k.is_player()) else {
        return;
    };
    let gained = killer.gain_xp(xp);
    if gained > 0 {
        let (id, name) = (killer.id(), killer.name());
        let new_level = killer.progression().map_or(1, |p| p.level);
        ctx.message(format!("{} reached level {}!", name, new_level));
        ctx.emit(GameEvent::LevelUp { actor: id, level: new_level });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::actors::tests::monster;
    use crate::game::level::tests::open_level;
    use crate::game::Position;

    #[test]
    fn test_hit_chance_is_clamped() {
        let mut attacker = Character::new_player("Hero");
        let defender = monster("rat", 5);
        assert_eq!(hit_chance(&attacker, &defender), 50);
        attacker.attributes.accuracy = 200;
        assert_eq!(hit_chance(&attacker, &defender), 95);
        attacker.attributes.accuracy = -200;
        assert_eq!(hit_chance(&attacker, &defender), 5);
    }

    #[test]
    fn test_damage_formula() {
        let attacker = Character::new_player("Hero");
        let mut defender = monster("rat", 5);
        // 10 + 10 * (50 - 10) / 100 - 10
        assert_eq!(damage_for_roll(&attacker, &defender, 50, 10), 4);
        defender.attributes.armor = 100;
        assert_eq!(damage_for_roll(&attacker, &defender, 50, 10), 1);
    }

    #[test]
    fn test_killing_a_monster_leaves_corpse_and_grants_xp() {
        let mut level = open_level(10, 10);
        let hero = level.add_actor(Character::new_player("Hero"), Position::new(2, 2)).unwrap();
        let rat = level.add_actor(monster("rat", 5), Position::new(3, 2)).unwrap();
        let mut ctx = TurnContext::new(5, 20, 1);

        let outcome = apply_damage(&mut level, rat, 10, Some(hero), &mut ctx);

        assert_eq!(outcome, DamageOutcome::Killed);
        assert!(!level.contains(rat));
        let on_tile: Vec<_> = level.actors_at(Position::new(3, 2)).collect();
        assert_eq!(on_tile.len(), 1);
        assert_eq!(on_tile[0].name(), "rat corpse");
        assert!(level.is_walkable(Position::new(3, 2)));
        assert_eq!(level.character(hero).unwrap().progression().unwrap().xp, 50);
        assert!(ctx
            .take_turn_events()
            .contains(&GameEvent::ActorDied { actor: rat, killer: Some(hero) }));
    }

    #[test]
    fn test_dead_player_is_unplaced_but_kept() {
        let mut level = open_level(10, 10);
        let hero = level.add_actor(Character::new_player("Hero"), Position::new(2, 2)).unwrap();
        let rat = level.add_actor(monster("rat", 5), Position::new(3, 2)).unwrap();
        let mut ctx = TurnContext::new(5, 20, 1);

        apply_damage(&mut level, hero, 1000, Some(rat), &mut ctx);

        assert!(level.contains(hero));
        assert_eq!(level.position_of(hero), None);
        assert!(!level.character(hero).unwrap().is_alive());
        assert!(ctx.messages.iter().any(|m| m == "Hero was killed by a rat."));
        assert_eq!(apply_damage(&mut level, hero, 5, None, &mut ctx), DamageOutcome::AlreadyDead);
    }

    #[test]
    fn test_attack_reports_hit_or_miss() {
        let mut level = open_level(10, 10);
        let hero = level.add_actor(Character::new_player("Hero"), Position::new(2, 2)).unwrap();
        let rat = level.add_actor(monster("rat", 500), Position::new(3, 2)).unwrap();
        let mut ctx = TurnContext::new(5, 20, 9);

        for _ in 0..20 {
            match attack(&mut level, hero, rat, &mut ctx) {
                AttackResult::Missed => {}
                AttackResult::Hit { damage, outcome } => {
                    assert!(damage >= 1);
                    assert_eq!(outcome, DamageOutcome::Survived);
                }
            }
        }
        assert!(level.character(rat).unwrap().hit_points.current < 500);
    }
}
