//! # Dungeon Generation
//!
//! Room-and-corridor dungeons. Rooms are placed at random and every accepted
//! room is joined to the one accepted before it, so the whole chain is
//! connected.

use crate::game::{Map, Material, Position, TextureSet};
use crate::generation::{utils, GenerationConfig, MapGenerator, Room};
use crate::{WarrensError, WarrensResult};
use rand::rngs::StdRng;
use rand::Rng;

/// Primary dungeon generator.
///
/// 1. Fill the map with rock
/// 2. Try `max_rooms` random rectangles, skipping ones that intersect
/// 3. Join each new room to the previous one with an L-shaped corridor
#[derive(Debug, Clone, Default)]
pub struct DungeonGenerator;

impl DungeonGenerator {
    pub fn new() -> Self {
        Self
    }

    fn place_rooms(&self, map: &mut Map, config: &GenerationConfig, rng: &mut StdRng) -> Vec<Room> {
        let mut rooms: Vec<Room> = Vec::new();
        for _ in 0..config.max_rooms {
            let room = self.room_candidate(map, config, rng);
            if rooms.iter().any(|other| room.intersects(other, config.room_margin)) {
                continue;
            }
            self.carve_room(map, &room);
            if let Some(previous) = rooms.last() {
                self.carve_l_corridor(map, previous.center(), room.center(), rng.gen_bool(0.5));
            }
            rooms.push(room);
        }
        rooms
    }

    fn room_candidate(&self, map: &Map, config: &GenerationConfig, rng: &mut StdRng) -> Room {
        let max_w = config.max_room_size.min(map.width() - 2);
        let max_h = config.max_room_size.min(map.height() - 2);
        let w = rng.gen_range(config.min_room_size.min(max_w)..=max_w);
        let h = rng.gen_range(config.min_room_size.min(max_h)..=max_h);
        let x = rng.gen_range(0..(map.width() - w)) as i32;
        let y = rng.gen_range(0..(map.height() - h)) as i32;
        Room::new(x, y, w, h)
    }

    fn carve_room(&self, map: &mut Map, room: &Room) {
        for pos in room.floor_positions() {
            map.carve(pos, Material::Dirt);
        }
    }

    /// Carves an L-shaped corridor between two points.
    fn carve_l_corridor(&self, map: &mut Map, start: Position, end: Position, horizontal_first: bool) {
        let corner = if horizontal_first {
            Position::new(end.x, start.y)
        } else {
            Position::new(start.x, end.y)
        };
        for (a, b) in [(start, corner), (corner, end)] {
            for y in a.y.min(b.y)..=a.y.max(b.y) {
                for x in a.x.min(b.x)..=a.x.max(b.x) {
                    map.carve(Position::new(x, y), Material::Dirt);
                }
            }
        }
    }
}

impl MapGenerator for DungeonGenerator {
    fn generate_map(&self, width: u32, height: u32, config: &GenerationConfig, rng: &mut StdRng) -> WarrensResult<Map> {
        utils::check_size(width, height, config)?;
        if config.min_room_size < 3 {
            return Err(WarrensError::GenerationFailed(
                "Rooms need at least 3 tiles to have a floor".to_string(),
            ));
        }

        let mut map = Map::filled(width, height, Material::Stone, true, TextureSet::Dungeon);
        let rooms = self.place_rooms(&mut map, config, rng);
        let (Some(first), Some(last)) = (rooms.first(), rooms.last()) else {
            return Err(WarrensError::GenerationFailed("No room could be placed".to_string()));
        };
        map.entry = first.center();
        map.exit = last.center();
        log::debug!("Placed {} of {} dungeon rooms", rooms.len(), config.max_rooms);
        map.areas = rooms;

        utils::finish(self, map)
    }

    fn generator_type(&self) -> &'static str {
        "dungeon"
    }
}
