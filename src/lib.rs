//! Bubble Bound - soft-body simulation core
//!
//! Core modules:
//! - `physics`: Pressure bodies, springs, chains and the collision world
//! - `schedule`: Allocation-free pools, timers and interpolators
//! - `particle`: Pooled visual particles (simulation side only)
//! - `sim`: Gameplay glue (entities, merging, hurting) driven by `tick`
//! - `persistence`: Level records for physics-relevant entity state
//! - `settings`: Data-driven tuning

pub mod error;
pub mod particle;
pub mod persistence;
pub mod physics;
pub mod schedule;
pub mod settings;
pub mod sim;

pub use error::{PhysicsError, ScheduleError, SettingsError, SimError};
pub use settings::{QualityPreset, Settings};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Fixed physics sub-step (240 Hz keeps the stiffest bubble tier stable)
    pub const PHYSICS_DT: f32 = 1.0 / 240.0;
    /// Maximum sub-steps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Distance below which a point mass counts as touching another body's edge
    pub const COLLISION_THRESHOLD: f32 = 0.05;

    /// Bodies farther than this from the player get recycled
    pub const TELEPORT_THRESHOLD: f32 = 15.0;
    /// Distance from the player at which recycled bodies reappear
    pub const TELEPORT_DISTANCE: f32 = 20.0;

    /// Slots added when a pool runs out of free items
    pub const POOL_GROWTH: usize = 20;
    /// Initial capacity of the timer and interpolator collections
    pub const COLLECTION_CAPACITY: usize = 10;

    /// Guard for lengths and areas treated as zero
    pub const EPSILON: f32 = 1e-6;
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Replace a non-finite vector with zero
#[inline]
pub(crate) fn finite_or_zero(v: Vec2, what: &str) -> Vec2 {
    if v.is_finite() {
        v
    } else {
        log::warn!("Discarding non-finite {}: {:?}", what, v);
        Vec2::ZERO
    }
}
