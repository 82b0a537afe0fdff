//! # Town Generation
//!
//! Open ground with stone houses. Each house has one door; the game turns
//! every house into a separate interior level behind that door.

use crate::game::{Map, Material, Position, TextureSet};
use crate::generation::{utils, GenerationConfig, MapGenerator, Room};
use crate::{WarrensError, WarrensResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone, Default)]
pub struct TownGenerator;

impl TownGenerator {
    pub fn new() -> Self {
        Self
    }

    fn place_houses(&self, map: &mut Map, config: &GenerationConfig, rng: &mut StdRng) -> Vec<Room> {
        let mut houses: Vec<Room> = Vec::new();
        for _ in 0..config.max_houses {
            let Some(mut house) = self.house_candidate(map, config, rng) else {
                continue;
            };
            if houses.iter().any(|other| house.intersects(other, config.house_margin)) {
                continue;
            }
            for y in house.y1..=house.y2 {
                for x in house.x1..=house.x2 {
                    let pos = Position::new(x, y);
                    if house.is_outline(pos) {
                        map.fill(pos, Material::Stone);
                    } else {
                        map.carve(pos, Material::Stone);
                    }
                }
            }
            let candidates = house.door_candidates();
            if let Some(door) = candidates.choose(rng).copied() {
                map.carve(door, Material::Door);
                house.door = Some(door);
            }
            houses.push(house);
        }
        houses
    }

    /// A house rectangle that keeps two tiles of open ground to the border.
    fn house_candidate(&self, map: &Map, config: &GenerationConfig, rng: &mut StdRng) -> Option<Room> {
        let w = rng.gen_range(config.min_house_size..=config.max_house_size.max(config.min_house_size));
        let h = rng.gen_range(config.min_house_size..=config.max_house_size.max(config.min_house_size));
        if map.width() < w + 5 || map.height() < h + 5 {
            return None;
        }
        let x = rng.gen_range(2..map.width() - w - 2) as i32;
        let y = rng.gen_range(2..map.height() - h - 2) as i32;
        Some(Room::new(x, y, w, h))
    }
}

impl MapGenerator for TownGenerator {
    fn generate_map(&self, width: u32, height: u32, config: &GenerationConfig, rng: &mut StdRng) -> WarrensResult<Map> {
        utils::check_size(width, height, config)?;
        let mut map = Map::filled(width, height, Material::Dirt, false, TextureSet::Town);
        map.enforce_border();
        map.reveal_all();

        let houses = self.place_houses(&mut map, config, rng);
        log::debug!("Built {} houses", houses.len());

        let ground: Vec<Position> = map
            .tiles()
            .filter(|t| !t.is_blocked() && t.material() == Material::Dirt)
            .map(|t| t.position())
            .collect();
        let start = ground
            .choose(rng)
            .copied()
            .ok_or_else(|| WarrensError::GenerationFailed("Town has no open ground".to_string()))?;
        map.entry = start;
        map.exit = start;
        map.areas = houses;

        utils::finish(self, map)
    }

    fn generator_type(&self) -> &'static str {
        "town"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::pathfinding::is_reachable;

    fn town(seed: u64) -> Map {
        let config = GenerationConfig::for_testing(seed);
        let mut rng = utils::create_rng(&config);
        TownGenerator::new().generate_map(40, 30, &config, &mut rng).unwrap()
    }

    #[test]
    fn test_town_is_explored_with_blocked_border() {
        let map = town(1);
        assert!(map.tiles().all(|t| t.is_explored()));
        assert!(map.tiles().filter(|t| map.is_border(t.position())).all(|t| t.is_blocked()));
        assert!(!map.is_blocked(map.entry));
        assert_eq!(map.entry, map.exit);
    }

    #[test]
    fn test_houses_have_reachable_doors() {
        for seed in 1..6 {
            let map = town(seed);
            assert!(!map.areas.is_empty());
            for house in &map.areas {
                let door = house.door.unwrap();
                assert!(house.is_outline(door));
                assert_eq!(map.tile(door).unwrap().material(), Material::Door);
                assert!(is_reachable(&map, map.entry, door));
            }
        }
    }

    #[test]
    fn test_houses_keep_their_distance() {
        let config = GenerationConfig::for_testing(4);
        let map = town(4);
        for (i, a) in map.areas.iter().enumerate() {
            for b in map.areas.iter().skip(i + 1) {
                assert!(!a.intersects(b, config.house_margin));
            }
        }
    }
}
