//! Simulation state
//!
//! Owns the physics world, the scheduling collections, the particles and the
//! entity table. Scheduled work is addressed by [`EntityId`]; an entity that
//! is gone by the time its message arrives simply misses it.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::entity::{
    BUBBLE_MAX_SPEED, Bubble, Character, DEFAULT_BUBBLE_SCALE, ENEMY_MAX_SPEED, ENEMY_RADIUS, Enemy, Entity,
    EntityId, EntityKind, MAX_TIER, PLAYER_SCALE, Wall, apply_tier, bubble_body, enemy_body, wall_body,
};
use crate::particle::ParticleSystem;
use crate::persistence::{EntityRecord, LevelRecord, RecordKind};
use crate::physics::{Body, BodyId, CollisionInfo, ContactListener, Physics};
use crate::schedule::{InterpolatorCollection, TimerCollection, Tween};
use crate::{Settings, SimError};

/// Scheduled gameplay messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A popped character comes back at the origin
    Respawn(EntityId),
    /// A character that reached the top tier starts over at tier 0
    Reborn(EntityId),
    /// A bubble finished merging into the player
    MergeFinished(EntityId),
}

impl Event {
    pub fn target(&self) -> EntityId {
        match self {
            Event::Respawn(id) | Event::Reborn(id) | Event::MergeFinished(id) => *id,
        }
    }
}

/// Contacts collected during one physics update
#[derive(Debug, Default)]
pub struct ContactBuffer {
    pub penetrations: Vec<(BodyId, BodyId)>,
    pub collisions: Vec<(BodyId, BodyId)>,
}

impl ContactBuffer {
    pub fn clear(&mut self) {
        self.penetrations.clear();
        self.collisions.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.penetrations.is_empty() && self.collisions.is_empty()
    }
}

impl ContactListener for ContactBuffer {
    fn on_penetration(&mut self, a: BodyId, b: BodyId) {
        self.penetrations.push((a, b));
    }

    fn on_collision(&mut self, a: BodyId, b: BodyId, _info: &CollisionInfo) {
        self.collisions.push((a, b));
    }
}

/// One running level
#[derive(Debug)]
pub struct Simulation {
    pub name: String,
    pub number: u32,
    pub settings: Settings,
    pub physics: Physics,
    pub timers: TimerCollection<Event>,
    pub interpolators: InterpolatorCollection<Event>,
    pub particles: ParticleSystem,
    /// Simulation tick counter
    pub time_ticks: u64,

    pub(crate) entities: Vec<Entity>,
    pub(crate) by_body: HashMap<BodyId, EntityId>,
    pub(crate) player: Option<EntityId>,
    /// Records with no body, written back unchanged
    pub(crate) scenery: Vec<EntityRecord>,
    next_entity: u32,
    pub(crate) rng: Pcg32,

    // Scratch buffers reused every tick
    pub(crate) contacts: ContactBuffer,
    pub(crate) inbox: Vec<Event>,
    pub(crate) tweens: Vec<Tween<Event>>,
}

impl Simulation {
    pub fn new(settings: Settings) -> Result<Self, SimError> {
        let capacity = settings.collection_capacity;
        let growth = settings.pool_growth;
        Ok(Self {
            name: String::new(),
            number: 0,
            physics: Physics::new(settings.physics),
            timers: TimerCollection::new(capacity, growth)?,
            interpolators: InterpolatorCollection::new(capacity, growth)?,
            particles: ParticleSystem::from_settings(&settings)?,
            time_ticks: 0,
            entities: Vec::new(),
            by_body: HashMap::new(),
            player: None,
            scenery: Vec::new(),
            next_entity: 1,
            rng: Pcg32::seed_from_u64(settings.physics.seed.wrapping_add(2)),
            contacts: ContactBuffer::default(),
            inbox: Vec::new(),
            tweens: Vec::new(),
            settings,
        })
    }

    fn insert(&mut self, body: Body, kind: EntityKind, position: Vec3, size: Vec3) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        let body = self.physics.add_body(body);
        self.by_body.insert(body, id);
        log::debug!("Added {} {} ({})", kind.name(), id, body);
        self.entities.push(Entity {
            id,
            body,
            position,
            rotation: Vec3::ZERO,
            size,
            asset: String::new(),
            kind,
            removed: false,
        });
        id
    }

    /// Add the player character. A second call replaces which entity is the player.
    pub fn add_character(&mut self, position: Vec2) -> Result<EntityId, SimError> {
        let mut body = bubble_body(PLAYER_SCALE, self.settings.quality.body_segments())?;
        body.set_position(position);
        let character = Character {
            camera: Vec3::new(position.x, position.y, Character::default().camera.z),
            ..Character::default()
        };
        let id = self.insert(
            body,
            EntityKind::Character(character),
            position.extend(0.0),
            Vec3::splat(PLAYER_SCALE),
        );
        if let Some(previous) = self.player.replace(id) {
            log::warn!("Replacing player {} with {}", previous, id);
        }
        Ok(id)
    }

    /// Add a collectable bubble of radius `scale`
    pub fn add_bubble(&mut self, position: Vec2, scale: f32) -> Result<EntityId, SimError> {
        let mut body = bubble_body(scale, self.settings.quality.body_segments())?;
        body.set_position(position);
        let bubble = Bubble {
            scale,
            max_speed: BUBBLE_MAX_SPEED,
            popped: false,
        };
        Ok(self.insert(
            body,
            EntityKind::Bubble(bubble),
            position.extend(0.0),
            Vec3::splat(scale),
        ))
    }

    pub fn add_enemy(&mut self, position: Vec2) -> Result<EntityId, SimError> {
        let mut body = enemy_body()?;
        body.set_position(position);
        let enemy = Enemy {
            target: position,
            max_speed: ENEMY_MAX_SPEED,
            radius: ENEMY_RADIUS,
        };
        Ok(self.insert(body, EntityKind::Enemy(enemy), position.extend(0.0), Vec3::ONE))
    }

    /// Add a static rectangle of `size` centered on `position`
    pub fn add_wall(&mut self, position: Vec2, size: Vec2, angle: f32) -> Result<EntityId, SimError> {
        let body = wall_body(size, position, angle)?;
        let id = self.insert(
            body,
            EntityKind::Wall(Wall { size }),
            position.extend(0.0),
            size.extend(1.0),
        );
        if let Some(entity) = self.entity_mut(id) {
            entity.rotation.z = angle;
        }
        Ok(id)
    }

    /// Drop an entity and its body now. Pending messages for it are discarded on arrival.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let Some(index) = self.entities.iter().position(|e| e.id == id) else {
            return false;
        };
        let entity = self.entities.remove(index);
        self.by_body.remove(&entity.body);
        self.physics.remove_body(entity.body);
        if self.player == Some(id) {
            self.player = None;
        }
        log::debug!("Removed {}", entity);
        true
    }

    /// Drop every entity flagged `removed`
    pub(crate) fn remove_flagged(&mut self) {
        while let Some(entity) = self.entities.iter().find(|e| e.removed) {
            let id = entity.id;
            self.remove(id);
        }
    }

    // === Queries ===

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    pub fn entity_by_body(&self, body: BodyId) -> Option<&Entity> {
        self.by_body.get(&body).and_then(|id| self.entity(*id))
    }

    /// Entities in insertion order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.player
    }

    pub fn player(&self) -> Option<&Entity> {
        self.player.and_then(|id| self.entity(id))
    }

    pub fn character(&self) -> Option<&Character> {
        self.player().and_then(Entity::character)
    }

    pub fn character_mut(&mut self) -> Option<&mut Character> {
        let id = self.player?;
        self.entity_mut(id).and_then(Entity::character_mut)
    }

    pub fn body_of(&self, id: EntityId) -> Option<&Body> {
        self.entity(id).and_then(|e| self.physics.body(e.body))
    }

    pub fn body_of_mut(&mut self, id: EntityId) -> Option<&mut Body> {
        let body = self.entity(id)?.body;
        self.physics.body_mut(body)
    }

    /// Center of the player's body
    pub fn player_position(&self) -> Option<Vec2> {
        self.player.and_then(|id| self.body_of(id)).map(Body::position)
    }

    /// Set the player's size tier and update its body to match
    pub fn set_player_tier(&mut self, tier: usize) {
        let Some(id) = self.player else {
            return;
        };
        if let Some(character) = self.character_mut() {
            character.tier = tier.min(MAX_TIER);
        }
        if let Some(body) = self.body_of_mut(id) {
            apply_tier(body, tier);
        }
    }

    // === Records ===

    /// Build a simulation from a level record
    pub fn from_record(record: &LevelRecord, settings: Settings) -> Result<Self, SimError> {
        let mut sim = Self::new(settings)?;
        sim.name = record.name.clone();
        sim.number = record.number;
        for entry in &record.entities {
            let position = entry.position.truncate();
            let id = match entry.kind {
                RecordKind::Player => sim.add_character(position)?,
                RecordKind::Bubble => {
                    let scale = if entry.size.x > 0.0 {
                        entry.size.x
                    } else {
                        DEFAULT_BUBBLE_SCALE
                    };
                    sim.add_bubble(position, scale)?
                }
                RecordKind::Enemy => sim.add_enemy(position)?,
                RecordKind::Wall => {
                    sim.add_wall(position, entry.size.truncate(), entry.rotation.z)?
                }
                RecordKind::Scenery => {
                    sim.scenery.push(entry.clone());
                    continue;
                }
            };
            if let Some(entity) = sim.entity_mut(id) {
                entity.asset = entry.asset.clone();
                entity.position.z = entry.position.z;
                entity.rotation = entry.rotation;
                if entry.kind != RecordKind::Bubble {
                    entity.size = entry.size;
                }
            }
        }
        log::info!(
            "Level '{}' ready: {} entities, {} bodies",
            sim.name,
            sim.entities.len(),
            sim.physics.body_count()
        );
        Ok(sim)
    }

    /// Snapshot the physics-relevant state of every entity
    pub fn to_record(&self) -> LevelRecord {
        let mut record = LevelRecord::new(self.name.clone(), self.number);
        for entity in &self.entities {
            let kind = match entity.kind {
                EntityKind::Character(_) => RecordKind::Player,
                EntityKind::Bubble(_) => RecordKind::Bubble,
                EntityKind::Enemy(_) => RecordKind::Enemy,
                EntityKind::Wall(_) => RecordKind::Wall,
            };
            let position = match self.physics.body(entity.body) {
                Some(body) => body.position().extend(entity.position.z),
                None => entity.position,
            };
            record.entities.push(EntityRecord {
                kind,
                asset: entity.asset.clone(),
                position,
                rotation: entity.rotation,
                size: entity.size,
            });
        }
        record.entities.extend(self.scenery.iter().cloned());
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entities_indexed_by_body() {
        let mut sim = Simulation::new(Settings::default()).unwrap();
        let player = sim.add_character(Vec2::ZERO).unwrap();
        let bubble = sim.add_bubble(Vec2::new(1.0, 0.0), 0.03).unwrap();
        let wall = sim.add_wall(Vec2::new(0.0, -2.0), Vec2::new(4.0, 0.5), 0.0).unwrap();

        assert_eq!(sim.entity_count(), 3);
        assert_eq!(sim.physics.body_count(), 3);
        assert_eq!(sim.player_id(), Some(player));
        let body = sim.entity(bubble).unwrap().body;
        assert!(sim.entity_by_body(body).unwrap().is_bubble());
        assert!(sim.body_of(wall).unwrap().is_static());
        assert_eq!(sim.character().map(|c| c.tier), Some(0));
    }

    #[test]
    fn test_remove_drops_body_and_player() {
        let mut sim = Simulation::new(Settings::default()).unwrap();
        let player = sim.add_character(Vec2::ZERO).unwrap();
        let body = sim.entity(player).unwrap().body;
        assert!(sim.remove(player));
        assert!(!sim.remove(player));
        assert!(sim.physics.body(body).is_none());
        assert!(sim.entity_by_body(body).is_none());
        assert_eq!(sim.player_id(), None);
        assert_eq!(sim.player_position(), None);
    }

    #[test]
    fn test_entity_ids_not_reused() {
        let mut sim = Simulation::new(Settings::default()).unwrap();
        let first = sim.add_enemy(Vec2::ZERO).unwrap();
        sim.remove(first);
        let second = sim.add_enemy(Vec2::ZERO).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_set_player_tier_updates_body() {
        let mut sim = Simulation::new(Settings::default()).unwrap();
        let player = sim.add_character(Vec2::ZERO).unwrap();
        sim.set_player_tier(2);
        assert_eq!(sim.character().map(|c| c.tier), Some(2));
        assert_eq!(sim.body_of(player).unwrap().edge_k, 150.0);
    }

    #[test]
    fn test_bad_wall_is_an_error() {
        let mut sim = Simulation::new(Settings::default()).unwrap();
        assert!(matches!(
            sim.add_wall(Vec2::ZERO, Vec2::ZERO, 0.0),
            Err(SimError::Physics(_))
        ));
    }

    #[test]
    fn test_record_round_trip() {
        let mut level = LevelRecord::new("Reef", 3);
        level.entities = vec![
            EntityRecord::new(RecordKind::Player, Vec3::ZERO).with_asset("player"),
            EntityRecord::new(RecordKind::Bubble, Vec3::new(1.0, 1.0, 0.0)).with_size(Vec3::splat(0.05)),
            EntityRecord::new(RecordKind::Enemy, Vec3::new(-2.0, 1.0, 0.0)),
            EntityRecord::new(RecordKind::Wall, Vec3::new(0.0, -3.0, 0.0))
                .with_size(Vec3::new(8.0, 0.5, 1.0))
                .with_rotation(Vec3::new(0.0, 0.0, 0.2)),
            EntityRecord::new(RecordKind::Scenery, Vec3::new(0.0, 0.0, -5.0)).with_asset("kelp"),
        ];

        let sim = Simulation::from_record(&level, Settings::default()).unwrap();
        assert_eq!(sim.entity_count(), 4);
        assert_eq!(sim.physics.body_count(), 4);

        let saved = sim.to_record();
        assert_eq!(saved.name, "Reef");
        assert_eq!(saved.number, 3);
        assert_eq!(saved.entities.len(), level.entities.len());
        for (before, after) in level.entities.iter().zip(&saved.entities) {
            assert_eq!(before.kind, after.kind);
            assert_eq!(before.asset, after.asset);
            assert_eq!(before.rotation, after.rotation);
            assert_eq!(before.size, after.size);
            assert!((before.position - after.position).length() < 1e-4);
        }
    }
}
