//! Damped springs between point masses

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::pointmass::PointMass;
use crate::PhysicsError;
use crate::consts::EPSILON;

/// A damped spring connecting two point masses of the same owner by index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spring {
    pub pointmass_a: usize,
    pub pointmass_b: usize,
    pub rest_length: f32,
    pub stiffness: f32,
    pub damping: f32,
}

impl Spring {
    pub fn new(
        pointmass_a: usize,
        pointmass_b: usize,
        rest_length: f32,
        stiffness: f32,
        damping: f32,
    ) -> Result<Self, PhysicsError> {
        if rest_length.is_nan() || rest_length <= EPSILON {
            return Err(PhysicsError::ZeroRestLength {
                a: pointmass_a,
                b: pointmass_b,
            });
        }
        Ok(Self {
            pointmass_a,
            pointmass_b,
            rest_length,
            stiffness,
            damping,
        })
    }

    /// Spring whose rest length is the current distance between the two point masses
    pub fn between(
        points: &[PointMass],
        pointmass_a: usize,
        pointmass_b: usize,
        stiffness: f32,
        damping: f32,
    ) -> Result<Self, PhysicsError> {
        let rest = points[pointmass_a]
            .position
            .distance(points[pointmass_b].position);
        Self::new(pointmass_a, pointmass_b, rest, stiffness, damping)
    }

    /// Accumulate this spring's force into both ends
    pub fn apply(&self, points: &mut [PointMass]) {
        self.apply_with(points, self.stiffness, self.damping);
    }

    /// Same as `apply` but with externally driven coefficients
    pub fn apply_with(&self, points: &mut [PointMass], stiffness: f32, damping: f32) {
        let a = points[self.pointmass_a];
        let b = points[self.pointmass_b];
        let force = spring_force(
            a.position,
            a.velocity,
            b.position,
            b.velocity,
            self.rest_length,
            stiffness,
            damping,
        );
        points[self.pointmass_a].apply_force(force);
        points[self.pointmass_b].apply_force(-force);
    }
}

/// Force on end `a` of a damped spring (end `b` receives the negation).
///
/// Zero when the ends coincide, so a collapsed spring never produces NaN.
pub fn spring_force(
    pos_a: Vec2,
    vel_a: Vec2,
    pos_b: Vec2,
    vel_b: Vec2,
    rest_length: f32,
    stiffness: f32,
    damping: f32,
) -> Vec2 {
    let delta = pos_b - pos_a;
    let length = delta.length();
    if length < EPSILON {
        return Vec2::ZERO;
    }
    let dir = delta / length;
    let relative_velocity = (vel_b - vel_a).dot(dir);
    let magnitude = stiffness * (length - rest_length) + damping * relative_velocity;
    dir * magnitude
}

/// Force pulling a point mass toward an anchor with zero rest length.
pub fn anchor_force(
    position: Vec2,
    velocity: Vec2,
    anchor: Vec2,
    anchor_velocity: Vec2,
    stiffness: f32,
    damping: f32,
) -> Vec2 {
    let delta = anchor - position;
    let length = delta.length();
    if length < EPSILON {
        // Only damping remains once the point sits on its anchor
        return (anchor_velocity - velocity) * damping;
    }
    let dir = delta / length;
    let relative_velocity = (anchor_velocity - velocity).dot(dir);
    dir * (stiffness * length + damping * relative_velocity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(distance: f32) -> Vec<PointMass> {
        vec![
            PointMass::new(1.0, Vec2::ZERO),
            PointMass::new(1.0, Vec2::new(distance, 0.0)),
        ]
    }

    #[test]
    fn test_zero_rest_length_rejected() {
        assert_eq!(
            Spring::new(0, 1, 0.0, 10.0, 1.0),
            Err(PhysicsError::ZeroRestLength { a: 0, b: 1 })
        );
        assert!(Spring::new(0, 1, f32::NAN, 10.0, 1.0).is_err());
    }

    #[test]
    fn test_stretched_spring_pulls_ends_together() {
        let mut points = pair(2.0);
        let spring = Spring::new(0, 1, 1.0, 10.0, 0.0).unwrap();
        spring.apply(&mut points);
        assert!((points[0].force.x - 10.0).abs() < 1e-5);
        assert!((points[1].force.x + 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_compressed_spring_pushes_apart() {
        let mut points = pair(0.5);
        let spring = Spring::new(0, 1, 1.0, 10.0, 0.0).unwrap();
        spring.apply(&mut points);
        assert!(points[0].force.x < 0.0);
        assert!(points[1].force.x > 0.0);
    }

    #[test]
    fn test_damping_opposes_separation() {
        let mut points = pair(1.0);
        points[1].velocity = Vec2::new(2.0, 0.0);
        let spring = Spring::new(0, 1, 1.0, 0.0, 3.0).unwrap();
        spring.apply(&mut points);
        // b moves away from a, so a is dragged along and b is held back
        assert!((points[0].force.x - 6.0).abs() < 1e-5);
        assert!((points[1].force.x + 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_collapsed_spring_is_finite() {
        let force = spring_force(Vec2::ONE, Vec2::ZERO, Vec2::ONE, Vec2::ZERO, 1.0, 100.0, 5.0);
        assert_eq!(force, Vec2::ZERO);
    }

    #[test]
    fn test_anchor_force_points_at_anchor() {
        let f = anchor_force(Vec2::ZERO, Vec2::ZERO, Vec2::new(0.0, 2.0), Vec2::ZERO, 5.0, 0.0);
        assert!(f.x.abs() < 1e-6);
        assert!((f.y - 10.0).abs() < 1e-5);
    }
}
