//! Point masses - the atomic simulation unit

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::finite_or_zero;

/// A zero-size particle with mass, position, velocity and a force accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointMass {
    pub mass: f32,
    /// Zero for immovable point masses
    pub inverse_mass: f32,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Accumulated this step, cleared by `integrate`
    pub force: Vec2,
}

impl PointMass {
    pub fn new(mass: f32, position: Vec2) -> Self {
        Self {
            mass,
            inverse_mass: inverse_of(mass),
            position,
            velocity: Vec2::ZERO,
            force: Vec2::ZERO,
        }
    }

    /// A point mass that forces cannot move
    pub fn pinned(position: Vec2) -> Self {
        Self {
            mass: f32::MAX,
            inverse_mass: 0.0,
            position,
            velocity: Vec2::ZERO,
            force: Vec2::ZERO,
        }
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.inverse_mass == 0.0
    }

    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
        self.inverse_mass = inverse_of(mass);
    }

    #[inline]
    pub fn apply_force(&mut self, force: Vec2) {
        self.force += force;
    }

    /// Semi-implicit Euler: velocity first, then position with the new velocity.
    pub fn integrate(&mut self, dt: f32) {
        if self.is_pinned() {
            self.velocity = Vec2::ZERO;
            self.force = Vec2::ZERO;
            return;
        }
        let force = finite_or_zero(self.force, "force");
        self.velocity += force * self.inverse_mass * dt;
        self.position += self.velocity * dt;
        self.force = Vec2::ZERO;
    }
}

/// Huge or non-finite masses behave as infinite.
fn inverse_of(mass: f32) -> f32 {
    if mass.is_finite() && mass > 0.0 && mass < f32::MAX {
        1.0 / mass
    } else {
        0.0
    }
}
