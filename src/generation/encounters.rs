//! # Monster Library
//!
//! Creates monsters from catalog templates and keeps track of which unique
//! monsters already walk the world.

use crate::game::actors::{ActorInfo, MonsterProfile};
use crate::game::{Ai, Attributes, Character, HitDie};
use crate::generation::catalog::LevelIndex;
use crate::{WarrensError, WarrensResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Catalog entry for one kind of monster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterTemplate {
    pub key: String,
    pub name: String,
    pub glyph: char,
    pub color: [u8; 3],
    pub sprite: String,
    pub hit_die: HitDie,
    pub attributes: Attributes,
    pub xp: u32,
    #[serde(default)]
    pub unique: bool,
    pub challenge_rating: u32,
    #[serde(default)]
    pub flavor: String,
    pub killed_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "MonsterLibraryDocument", into = "MonsterLibraryDocument")]
pub struct MonsterLibrary {
    templates: BTreeMap<String, MonsterTemplate>,
    /// Unique monsters that were already created
    spawned_uniques: BTreeSet<String>,
    /// Spawnable monsters by challenge rating
    by_rating: LevelIndex,
}

#[derive(Serialize, Deserialize)]
struct MonsterLibraryDocument {
    templates: BTreeMap<String, MonsterTemplate>,
    #[serde(default)]
    spawned_uniques: BTreeSet<String>,
}

impl From<MonsterLibraryDocument> for MonsterLibrary {
    fn from(doc: MonsterLibraryDocument) -> Self {
        Self::from_parts(doc.templates, doc.spawned_uniques)
    }
}

impl From<MonsterLibrary> for MonsterLibraryDocument {
    fn from(library: MonsterLibrary) -> Self {
        MonsterLibraryDocument {
            templates: library.templates,
            spawned_uniques: library.spawned_uniques,
        }
    }
}

impl MonsterLibrary {
    pub fn new(templates: Vec<MonsterTemplate>) -> Self {
        Self::from_parts(
            templates.into_iter().map(|t| (t.key.clone(), t)).collect(),
            BTreeSet::new(),
        )
    }

    fn from_parts(templates: BTreeMap<String, MonsterTemplate>, spawned_uniques: BTreeSet<String>) -> Self {
        let by_rating = LevelIndex::build(
            templates
                .values()
                .filter(|t| !(t.unique && spawned_uniques.contains(&t.key)))
                .map(|t| (t.challenge_rating, t.key.as_str())),
        );
        Self {
            templates,
            spawned_uniques,
            by_rating,
        }
    }

    pub fn available_monsters(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn template(&self, key: &str) -> Option<&MonsterTemplate> {
        self.templates.get(key)
    }

    pub fn is_spawned(&self, key: &str) -> bool {
        self.spawned_uniques.contains(key)
    }

    /// Maximum number of monsters per room.
    pub fn max_monsters_per_room(difficulty: u32) -> u32 {
        (difficulty / 2).max(1)
    }

    /// Creates a monster, rolling its hit points from the template's hit die.
    pub fn create_monster<R: Rng + ?Sized>(&mut self, rng: &mut R, key: &str) -> WarrensResult<Character> {
        let template = self
            .templates
            .get(key)
            .ok_or_else(|| WarrensError::Library(format!("Unknown monster '{}'", key)))?;
        if template.unique && self.spawned_uniques.contains(key) {
            return Err(WarrensError::Library(format!("Unique monster {} already exists", key)));
        }
        let monster = build(template, rng);
        if template.unique {
            log::info!("Unique monster {} enters the world", template.name);
            self.by_rating.remove(template.challenge_rating, key);
            self.spawned_uniques.insert(key.to_string());
        }
        Ok(monster)
    }

    /// Random monster of challenge rating `max_challenge_rating` or below.
    ///
    /// Lower ratings are more likely; uniques that already exist are no
    /// longer candidates.
    pub fn get_random_monster<R: Rng + ?Sized>(&mut self, rng: &mut R, max_challenge_rating: u32) -> WarrensResult<Character> {
        let key = self
            .by_rating
            .pick(rng, max_challenge_rating)
            .map(str::to_string)
            .ok_or_else(|| {
                WarrensError::Library(format!(
                    "No monsters available at or below challenge rating {}",
                    max_challenge_rating
                ))
            })?;
        self.create_monster(rng, &key)
    }

    /// A monster made up on the spot, scaled to `difficulty`.
    pub fn generate_monster<R: Rng + ?Sized>(&self, rng: &mut R, difficulty: u32) -> Character {
        let d = difficulty.max(1);
        let template = MonsterTemplate {
            key: "random".to_string(),
            name: "Unrecognizable aberration".to_string(),
            glyph: 'M',
            color: [65, 255, 85],
            sprite: "aberration".to_string(),
            hit_die: HitDie::new(d, 8),
            attributes: Attributes::uniform(d as i32 * 10),
            xp: 50 * d * d,
            unique: false,
            challenge_rating: d,
            flavor: "An unrecognizable aberration approaches".to_string(),
            killed_by: "The aberration wanders around your remains.".to_string(),
        };
        build(&template, rng)
    }
}

fn build<R: Rng + ?Sized>(template: &MonsterTemplate, rng: &mut R) -> Character {
    let mut info = ActorInfo::new(
        &template.key,
        &template.name,
        template.glyph,
        template.color,
        &template.sprite,
    );
    info.flavor = template.flavor.clone();
    let profile = MonsterProfile {
        ai: Ai::Basic,
        challenge_rating: template.challenge_rating,
        xp_value: template.xp,
        unique: template.unique,
        killed_by: template.killed_by.clone(),
    };
    Character::new_monster(info, template.hit_die.roll(rng), template.attributes, profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Entity;
    use crate::generation::Catalog;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn library() -> MonsterLibrary {
        MonsterLibrary::new(Catalog::embedded().unwrap().monsters)
    }

    #[test]
    fn test_create_monster_rolls_hit_points() {
        let mut library = library();
        let mut rng = StdRng::seed_from_u64(1);
        let rat = library.create_monster(&mut rng, "rat").unwrap();
        let die = library.template("rat").unwrap().hit_die;
        assert!(rat.is_monster());
        assert!((1..=die.max_roll()).contains(&rat.hit_points.max));
        assert!(library.create_monster(&mut rng, "dragon_whelp_x").is_err());
    }

    #[test]
    fn test_unique_monster_only_once() {
        let mut library = library();
        let mut rng = StdRng::seed_from_u64(1);
        let unique = library
            .available_monsters()
            .find(|k| library.template(k).map_or(false, |t| t.unique))
            .map(str::to_string)
            .unwrap();

        assert!(library.create_monster(&mut rng, &unique).is_ok());
        assert!(library.is_spawned(&unique));
        let again = library.create_monster(&mut rng, &unique);
        assert!(matches!(again, Err(WarrensError::Library(_))));

        for _ in 0..200 {
            let monster = library.get_random_monster(&mut rng, 10).unwrap();
            assert_ne!(monster.key(), unique);
        }
    }

    #[test]
    fn test_random_monster_respects_rating() {
        let mut library = library();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let monster = library.get_random_monster(&mut rng, 2).unwrap();
            assert!(monster.monster_profile().unwrap().challenge_rating <= 2);
        }
        assert!(library.get_random_monster(&mut rng, 0).is_err());
    }

    #[test]
    fn test_generated_aberration_scales() {
        let library = library();
        let mut rng = StdRng::seed_from_u64(3);
        let monster = library.generate_monster(&mut rng, 3);
        assert_eq!(monster.name(), "Unrecognizable aberration");
        assert_eq!(monster.attributes, Attributes::uniform(30));
        assert_eq!(monster.xp_value(), 450);
        assert!((3..=24).contains(&monster.hit_points.max));
    }

    #[test]
    fn test_monsters_per_room() {
        assert_eq!(MonsterLibrary::max_monsters_per_room(1), 1);
        assert_eq!(MonsterLibrary::max_monsters_per_room(9), 4);
    }

    #[test]
    fn test_spawned_uniques_survive_serde() {
        let mut library = library();
        let mut rng = StdRng::seed_from_u64(5);
        let unique = library
            .available_monsters()
            .find(|k| library.template(k).map_or(false, |t| t.unique))
            .map(str::to_string)
            .unwrap();
        library.create_monster(&mut rng, &unique).unwrap();

        let json = serde_json::to_string(&library).unwrap();
        let mut restored: MonsterLibrary = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, library);
        assert!(restored.create_monster(&mut rng, &unique).is_err());
        for _ in 0..200 {
            let monster = restored.get_random_monster(&mut rng, 10).unwrap();
            assert_ne!(monster.key(), unique);
        }
    }

    #[test]
    fn test_random_monster_with_huge_rating() {
        let mut library = library();
        let mut rng = StdRng::seed_from_u64(12);
        for _ in 0..20 {
            let monster = library.get_random_monster(&mut rng, u32::MAX / 2).unwrap();
            assert!(library.template(monster.key()).is_some());
        }
    }
}
