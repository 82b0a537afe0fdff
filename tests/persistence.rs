//! Saving and restoring whole games.

use tempfile::tempdir;
use warrens::game::effects::EffectScope;
use warrens::game::items::HitDie;
use warrens::{Direction, Effect, EffectKind, Element, EngineConfig, Game, Intent, WarrensError, WarrensResult};

fn played_game() -> WarrensResult<Game> {
    let mut game = Game::new(EngineConfig::for_testing(8080))?;
    game.setup_new_game()?;
    for direction in [Direction::East, Direction::South, Direction::West, Direction::North] {
        // walls and villagers may reject a step
        let _ = game.try_to_play_turn(Intent::Move { direction });
    }
    game.try_to_play_turn(Intent::Wait)?;

    let center = game.player_position().expect("Player should be placed");
    game.register_effect(Effect {
        id: uuid::Uuid::new_v4(),
        kind: EffectKind::Heal,
        scope: EffectScope::Area {
            center,
            tiles: vec![center],
        },
        level: game.current_level_id(),
        element: Element::Heal,
        hit_die: HitDie::new(1, 4),
        remaining: 5,
        source: game.player_id(),
        source_name: "Adventurer".to_string(),
    })?;
    Ok(game)
}

#[test]
fn test_save_and_load_round_trip() -> WarrensResult<()> {
    let game = played_game()?;
    let dir = tempdir()?;
    let path = dir.path().join("warrens.json");

    game.save_game(&path)?;
    let restored = Game::load_game(&path)?;

    assert_eq!(restored.turn_number(), game.turn_number());
    assert_eq!(restored.status(), game.status());
    assert_eq!(restored.current_level_id(), game.current_level_id());
    assert_eq!(restored.player_id(), game.player_id());
    assert_eq!(restored.player_position(), game.player_position());
    assert_eq!(
        restored.player().map(|p| p.hit_points),
        game.player().map(|p| p.hit_points)
    );
    assert_eq!(restored.levels(), game.levels());
    assert_eq!(restored.active_effects(), game.active_effects());
    assert_eq!(restored.active_effects().len(), 1);
    assert_eq!(restored.messages(), game.messages());
    Ok(())
}

#[test]
fn test_restored_game_keeps_playing() -> WarrensResult<()> {
    let game = played_game()?;
    let mut restored = Game::load_from_json(&game.save_to_json()?)?;

    let before = restored.turn_number();
    restored.try_to_play_turn(Intent::Wait)?;
    assert_eq!(restored.turn_number(), before + 1);
    assert_eq!(restored.active_effects()[0].remaining, 4);
    Ok(())
}

#[test]
fn test_corrupt_save_is_rejected() -> WarrensResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{\"format_version\": 1, \"game\": 12}")?;
    assert!(matches!(Game::load_game(&path), Err(WarrensError::Persistence(_))));

    std::fs::write(&path, "not json at all")?;
    assert!(matches!(Game::load_game(&path), Err(WarrensError::Persistence(_))));
    Ok(())
}

#[test]
fn test_missing_save_is_an_io_error() {
    let dir = tempdir().unwrap();
    let result = Game::load_game(dir.path().join("nothing-here.json"));
    assert!(matches!(result, Err(WarrensError::Io(_))));
}
