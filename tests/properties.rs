//! Property tests for map generation and field of view.

use proptest::prelude::*;
use warrens::game::fov::{compute_visible, update_field_of_view};
use warrens::generation::utils::create_rng;
use warrens::utils::pathfinding::is_reachable;
use warrens::{CaveGenerator, DungeonGenerator, GenerationConfig, MapGenerator, Position, TownGenerator};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn dungeon_exit_is_reachable_from_entry(seed in any::<u64>(), width in 30u32..70, height in 24u32..50) {
        let config = GenerationConfig::for_testing(seed);
        let mut rng = create_rng(&config);
        let map = DungeonGenerator::new().generate_map(width, height, &config, &mut rng).unwrap();

        prop_assert!(!map.is_blocked(map.entry));
        prop_assert!(!map.is_blocked(map.exit));
        prop_assert!(is_reachable(&map, map.entry, map.exit));
        for x in 0..width as i32 {
            prop_assert!(map.is_blocked(Position::new(x, 0)));
            prop_assert!(map.is_blocked(Position::new(x, height as i32 - 1)));
        }
    }

    #[test]
    fn cave_exit_is_reachable_from_entry(seed in any::<u64>()) {
        let config = GenerationConfig::for_testing(seed);
        let mut rng = create_rng(&config);
        let map = CaveGenerator::new().generate_map(40, 30, &config, &mut rng).unwrap();
        prop_assert!(is_reachable(&map, map.entry, map.exit));
    }

    #[test]
    fn town_houses_never_overlap(seed in any::<u64>()) {
        let config = GenerationConfig::for_testing(seed);
        let mut rng = create_rng(&config);
        let map = TownGenerator.generate_map(60, 40, &config, &mut rng).unwrap();
        for (i, a) in map.areas.iter().enumerate() {
            for b in map.areas.iter().skip(i + 1) {
                prop_assert!(!a.intersects(b, 0));
            }
        }
    }

    #[test]
    fn visible_tiles_stay_within_radius(seed in any::<u64>(), radius in 1u32..12) {
        let config = GenerationConfig::for_testing(seed);
        let mut rng = create_rng(&config);
        let map = DungeonGenerator::new().generate_map(50, 40, &config, &mut rng).unwrap();

        let visible = compute_visible(&map, map.entry, radius);
        prop_assert!(visible.contains(&map.entry));
        for pos in &visible {
            prop_assert!(map.entry.euclidean_distance(*pos) <= radius as f64);
        }
    }

    #[test]
    fn explored_tiles_only_grow(seed in any::<u64>(), steps in 1usize..20) {
        let config = GenerationConfig::for_testing(seed);
        let mut rng = create_rng(&config);
        let mut map = DungeonGenerator::new().generate_map(50, 40, &config, &mut rng).unwrap();

        let walk: Vec<Position> = map.walkable_positions().step_by(7).take(steps).collect();
        let mut explored = map.explored_tiles().clone();
        for pos in walk {
            update_field_of_view(&mut map, pos, 6);
            prop_assert!(map.explored_tiles().is_superset(&explored));
            prop_assert!(map.explored_tiles().is_superset(map.visible_tiles()));
            explored = map.explored_tiles().clone();
        }
    }
}
