//! One room on an otherwise solid map, used for house interiors and for
//! quick test levels.

use crate::game::{Map, Material, TextureSet};
use crate::generation::{utils, GenerationConfig, MapGenerator, Room};
use crate::{WarrensError, WarrensResult};
use rand::rngs::StdRng;

#[derive(Debug, Clone, Default)]
pub struct SingleRoomGenerator {
    /// Room to carve; the whole map when unset
    pub room: Option<Room>,
    pub texture_set: Option<TextureSet>,
}

impl SingleRoomGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interior of a house: same rectangle and door as on the town map.
    pub fn for_room(room: Room) -> Self {
        Self {
            room: Some(room),
            texture_set: Some(TextureSet::House),
        }
    }
}

impl MapGenerator for SingleRoomGenerator {
    fn generate_map(&self, width: u32, height: u32, _config: &GenerationConfig, _rng: &mut StdRng) -> WarrensResult<Map> {
        if width < 3 || height < 3 {
            return Err(WarrensError::GenerationFailed(format!(
                "A {}x{} map has no room for a floor",
                width, height
            )));
        }
        let room = self
            .room
            .unwrap_or_else(|| Room::new(0, 0, width - 1, height - 1));
        let mut map = Map::filled(
            width,
            height,
            Material::Stone,
            true,
            self.texture_set.unwrap_or(TextureSet::Dungeon),
        );
        if !map.in_bounds(room.center()) || room.x2 - room.x1 < 2 || room.y2 - room.y1 < 2 {
            return Err(WarrensError::GenerationFailed(format!(
                "Room {:?} does not fit a {}x{} map",
                room, width, height
            )));
        }

        for pos in room.floor_positions() {
            map.carve(pos, Material::Dirt);
        }
        if let Some(door) = room.door {
            if !map.is_border(door) {
                map.carve(door, Material::Door);
            }
        }
        map.entry = room.center();
        map.exit = room.center();
        map.areas = vec![room];

        utils::finish(self, map)
    }

    fn generator_type(&self) -> &'static str {
        "single room"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Position;
    use crate::utils::pathfinding::is_reachable;

    #[test]
    fn test_whole_map_room() {
        let config = GenerationConfig::for_testing(1);
        let mut rng = utils::create_rng(&config);
        let map = SingleRoomGenerator::new().generate_map(10, 8, &config, &mut rng).unwrap();

        assert_eq!(map.walkable_positions().count(), 8 * 6);
        assert_eq!(map.entry, Position::new(4, 3));
    }

    #[test]
    fn test_house_interior_keeps_door() {
        let mut room = Room::new(5, 5, 6, 6);
        room.door = Some(Position::new(8, 5));
        let config = GenerationConfig::for_testing(1);
        let mut rng = utils::create_rng(&config);
        let map = SingleRoomGenerator::for_room(room).generate_map(30, 20, &config, &mut rng).unwrap();

        assert_eq!(map.tile(Position::new(8, 5)).unwrap().material(), Material::Door);
        assert!(is_reachable(&map, map.entry, Position::new(8, 5)));
        assert!(map.is_blocked(Position::new(4, 4)));
        assert_eq!(map.texture_set, TextureSet::House);
    }
}
