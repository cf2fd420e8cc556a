//! Entity kinds and their tuning
//!
//! An entity pairs one physics body with gameplay state. The kind is fixed at
//! insertion; behaviour that needs the rest of the simulation lives in `tick`.

use std::fmt;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::PhysicsError;
use crate::physics::{Body, BodyId, Shape};

// === Size tiers ===

/// Largest size tier; reaching it triggers a rebirth
pub const MAX_TIER: usize = 3;
/// Edge and shape spring stiffness per tier (softer as the bubble grows)
pub const TIER_STIFFNESS: [f32; MAX_TIER + 1] = [1300.0, 400.0, 150.0, 50.0];
/// Gas pressure per tier
pub const TIER_PRESSURE: [f32; MAX_TIER + 1] = [1.0, 15.0, 20.0, 25.0];
/// Bubbles to collect before growing to the next tier
pub const TIER_BUBBLES: [u32; MAX_TIER + 1] = [5, 8, 10, 0];
/// Camera height per tier
pub const CAMERA_DISTANCES: [f32; MAX_TIER + 1] = [3.0, 3.0, 4.0, 5.0];
/// Spread of the tail particles per tier
pub const TAIL_RADIUS: [f32; MAX_TIER + 1] = [0.01, 0.1, 1.0, 1.5];

pub const SPRING_DAMPING: f32 = 20.0;

// === Bubbles ===

/// Added to a bubble's scale to get its outline radius
pub const BUBBLE_PADDING: f32 = 0.005;
pub const BUBBLE_MAX_SPEED: f32 = 1.5;
pub const DEFAULT_BUBBLE_SCALE: f32 = 0.03;

// === Character ===

pub const PLAYER_SCALE: f32 = 0.2;
pub const PLAYER_MAX_SPEED: f32 = 2.0;
/// Invulnerability after losing a tier or respawning
pub const HURT_COOLDOWN: f32 = 5.0;
/// Invulnerability after a rebirth
pub const REBIRTH_COOLDOWN: f32 = 10.0;
/// Delay before a popped or reborn character comes back
pub const RESPAWN_DELAY: f32 = 5.0;
/// Extra speed granted by a boost, decaying over a second
pub const BOOST: f32 = 1.5;
/// Steering acceleration from the move direction
pub const STEER_ACCEL: f32 = 10.0;
/// Per-update damping of the steering velocity
pub const STEER_DAMPING: f32 = 0.8;
/// Scale from steering velocity to body acceleration
pub const DRIVE: f32 = 3.0;

// === Enemies ===

pub const ENEMY_SIDE: f32 = 0.25;
pub const ENEMY_MAX_SPEED: f32 = 2.0;
/// Chase range and target tolerance
pub const ENEMY_RADIUS: f32 = 2.0;
/// Wander targets are picked within this many radii
pub const ENEMY_WANDER: f32 = 7.5;
/// Below this speed an enemy assumes it is stuck and picks a new target
pub const ENEMY_STUCK_SPEED: f32 = 0.1;

// === Merging ===

pub const MERGE_DURATION: f32 = 0.2;
/// Merged bubbles are parked this far along -x, well past the recycle threshold
pub const HIDE_DISTANCE: f32 = 1000.0;
/// Velocity kept by a merged bubble
pub const MERGE_VELOCITY_KEEP: f32 = 0.1;

/// Identifies an entity of one simulation; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Player-controlled bubble
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub tier: usize,
    pub num_collected: u32,
    /// Seconds of invulnerability left
    pub hurt: f32,
    /// Boost cooldown and extra speed
    pub boost: f32,
    pub popped: bool,
    /// Waiting for a rebirth or respawn; input is ignored
    pub hidden: bool,
    pub max_speed: f32,
    /// Smoothed move input
    pub steer: Vec2,
    /// Follows the character; z is the height
    pub camera: Vec3,
}

impl Default for Character {
    fn default() -> Self {
        Self {
            tier: 0,
            num_collected: 0,
            hurt: 0.0,
            boost: 0.0,
            popped: false,
            hidden: false,
            max_speed: PLAYER_MAX_SPEED,
            steer: Vec2::ZERO,
            camera: Vec3::new(0.0, 0.0, CAMERA_DISTANCES[0]),
        }
    }
}

impl Character {
    /// Bubbles still needed for the next tier
    pub fn bubbles_needed(&self) -> u32 {
        TIER_BUBBLES[self.tier].saturating_sub(self.num_collected)
    }

    /// Can enemies hurt or chase this character
    pub fn is_vulnerable(&self) -> bool {
        !self.popped && self.hurt <= 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub scale: f32,
    pub max_speed: f32,
    pub popped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub target: Vec2,
    pub max_speed: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wall {
    /// Outline size (width, height)
    pub size: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Character(Character),
    Bubble(Bubble),
    Enemy(Enemy),
    Wall(Wall),
}

impl EntityKind {
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Character(_) => "character",
            EntityKind::Bubble(_) => "bubble",
            EntityKind::Enemy(_) => "enemy",
            EntityKind::Wall(_) => "wall",
        }
    }
}

/// A body plus its gameplay state
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub body: BodyId,
    pub position: Vec3,
    pub rotation: Vec3,
    pub size: Vec3,
    pub asset: String,
    pub kind: EntityKind,
    /// Dropped from the simulation at the start of the next tick
    pub removed: bool,
}

impl Entity {
    pub fn character(&self) -> Option<&Character> {
        match &self.kind {
            EntityKind::Character(c) => Some(c),
            _ => None,
        }
    }

    pub fn character_mut(&mut self) -> Option<&mut Character> {
        match &mut self.kind {
            EntityKind::Character(c) => Some(c),
            _ => None,
        }
    }

    pub fn bubble(&self) -> Option<&Bubble> {
        match &self.kind {
            EntityKind::Bubble(b) => Some(b),
            _ => None,
        }
    }

    pub fn enemy(&self) -> Option<&Enemy> {
        match &self.kind {
            EntityKind::Enemy(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_enemy(&self) -> bool {
        matches!(self.kind, EntityKind::Enemy(_))
    }

    pub fn is_bubble(&self) -> bool {
        matches!(self.kind, EntityKind::Bubble(_))
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} at ({:.2}, {:.2})",
            self.kind.name(),
            self.id,
            self.position.x,
            self.position.y
        )
    }
}

/// Set pressure and both spring stiffnesses for a size tier.
pub fn apply_tier(body: &mut Body, tier: usize) {
    let tier = tier.min(MAX_TIER);
    body.edge_k = TIER_STIFFNESS[tier];
    if let Some(pressure) = body.pressure.as_mut() {
        pressure.pressure = TIER_PRESSURE[tier];
        pressure.shape_k = TIER_STIFFNESS[tier];
    }
}

/// Pressure bubble of radius `scale` at tier 0.
///
/// Mass is one unit per point mass.
pub fn bubble_body(scale: f32, segments: usize) -> Result<Body, PhysicsError> {
    let shape = Shape::circle(scale + BUBBLE_PADDING, segments)?;
    let mut body = Body::new_pressure(
        &shape,
        shape.count() as f32,
        TIER_PRESSURE[0],
        TIER_STIFFNESS[0],
        SPRING_DAMPING,
        TIER_STIFFNESS[0],
        SPRING_DAMPING,
    )?;
    apply_tier(&mut body, 0);
    Ok(body)
}

/// Square pressure body with stiff springs
pub fn enemy_body() -> Result<Body, PhysicsError> {
    let shape = Shape::rectangle(ENEMY_SIDE, ENEMY_SIDE)?;
    Body::new_pressure(
        &shape,
        shape.count() as f32,
        1.0,
        TIER_STIFFNESS[0],
        SPRING_DAMPING,
        1000.0,
        SPRING_DAMPING,
    )
}

/// Static rectangle at `position`, rotated by `angle`
pub fn wall_body(size: Vec2, position: Vec2, angle: f32) -> Result<Body, PhysicsError> {
    let shape = Shape::rectangle(size.x, size.y)?;
    let mut body = Body::new_static(&shape, position)?;
    body.set_angle(angle);
    Ok(body)
}

/// Rescale `velocity` so its length is at most `max_speed`
pub fn clamp_speed(velocity: Vec2, max_speed: f32) -> Vec2 {
    let speed = velocity.length();
    if speed <= max_speed {
        velocity
    } else {
        velocity.normalize_or_zero() * max_speed
    }
}
