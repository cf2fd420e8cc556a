//! Open spring chains (tethers, ropes)

use glam::Vec2;

use super::pointmass::PointMass;
use super::spring::Spring;
use crate::PhysicsError;

/// An open sequence of point masses with a spring between each consecutive pair.
///
/// Chains never take part in collision detection.
#[derive(Debug, Clone)]
pub struct Chain {
    point_masses: Vec<PointMass>,
    springs: Vec<Spring>,
}

impl Chain {
    /// Straight chain from `start` to `end` with `segments` springs.
    pub fn new(
        start: Vec2,
        end: Vec2,
        segments: usize,
        mass_per_point: f32,
        stiffness: f32,
        damping: f32,
    ) -> Result<Self, PhysicsError> {
        if segments == 0 {
            return Err(PhysicsError::TooFewPoints { needed: 2, got: 1 });
        }
        let points = (0..=segments)
            .map(|i| start.lerp(end, i as f32 / segments as f32))
            .collect();
        Self::from_points(points, mass_per_point, stiffness, damping)
    }

    /// Chain through `points`; rest lengths are the initial spacing.
    pub fn from_points(
        points: Vec<Vec2>,
        mass_per_point: f32,
        stiffness: f32,
        damping: f32,
    ) -> Result<Self, PhysicsError> {
        if mass_per_point.is_nan() || mass_per_point <= 0.0 {
            return Err(PhysicsError::InvalidMass(mass_per_point));
        }
        if points.len() < 2 {
            return Err(PhysicsError::TooFewPoints {
                needed: 2,
                got: points.len(),
            });
        }

        let point_masses: Vec<PointMass> = points
            .into_iter()
            .map(|p| PointMass::new(mass_per_point, p))
            .collect();
        let springs = (0..point_masses.len() - 1)
            .map(|i| Spring::between(&point_masses, i, i + 1, stiffness, damping))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            point_masses,
            springs,
        })
    }

    /// Make a point mass immovable. False if `index` is out of range.
    pub fn pin(&mut self, index: usize) -> bool {
        let Some(pm) = self.point_masses.get_mut(index) else {
            return false;
        };
        pm.set_mass(f32::MAX);
        pm.velocity = Vec2::ZERO;
        true
    }

    pub fn unpin(&mut self, index: usize, mass: f32) -> bool {
        match self.point_masses.get_mut(index) {
            Some(pm) => {
                pm.set_mass(mass);
                true
            }
            None => false,
        }
    }

    /// Teleport a (usually pinned) point mass
    pub fn move_pin(&mut self, index: usize, position: Vec2) -> bool {
        match self.point_masses.get_mut(index) {
            Some(pm) => {
                pm.position = position;
                true
            }
            None => false,
        }
    }

    pub fn apply_force(&mut self, force: Vec2) {
        for pm in &mut self.point_masses {
            pm.apply_force(force);
        }
    }

    pub fn apply_force_at(&mut self, index: usize, force: Vec2) -> bool {
        match self.point_masses.get_mut(index) {
            Some(pm) => {
                pm.apply_force(force);
                true
            }
            None => false,
        }
    }

    /// Spring forces then integration; nothing else is derived.
    pub fn update(&mut self, dt: f32) {
        for spring in &self.springs {
            spring.apply(&mut self.point_masses);
        }
        for pm in &mut self.point_masses {
            pm.integrate(dt);
        }
    }

    pub fn point_masses(&self) -> &[PointMass] {
        &self.point_masses
    }

    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    pub fn len(&self) -> usize {
        self.point_masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.point_masses.is_empty()
    }
}
