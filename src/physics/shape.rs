//! Polygon templates used to seed a body's rest configuration

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{PhysicsError, polar_to_cartesian};

/// An ordered polygon outline in local space.
///
/// Bodies keep their own copy (see [`Shape::clone_centered`]) so a template can be
/// shared by any number of spawns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    points: Vec<Vec2>,
}

impl Shape {
    /// Store a copy of `points`, optionally moving their mean to the origin.
    pub fn new(points: Vec<Vec2>, center: bool) -> Result<Self, PhysicsError> {
        if points.is_empty() {
            return Err(PhysicsError::EmptyShape);
        }
        let mut shape = Self { points };
        if center {
            shape.center_at_zero();
        }
        Ok(shape)
    }

    /// Regular polygon of `segments` points on a circle, wound clockwise.
    pub fn circle(radius: f32, segments: usize) -> Result<Self, PhysicsError> {
        if segments < 3 {
            return Err(PhysicsError::TooFewPoints {
                needed: 3,
                got: segments,
            });
        }
        let step = std::f32::consts::TAU / segments as f32;
        let points = (0..segments)
            .map(|i| polar_to_cartesian(radius, -(i as f32) * step))
            .collect();
        Self::new(points, true)
    }

    /// Axis-aligned rectangle centered on the origin.
    pub fn rectangle(width: f32, height: f32) -> Result<Self, PhysicsError> {
        let points = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, height),
            Vec2::new(width, height),
            Vec2::new(width, 0.0),
        ];
        Self::new(points, true)
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Arithmetic mean of all points
    pub fn get_center(&self) -> Vec2 {
        self.points.iter().copied().sum::<Vec2>() / self.points.len() as f32
    }

    pub fn center_at_zero(&mut self) {
        let center = self.get_center();
        for p in &mut self.points {
            *p -= center;
        }
    }

    /// Independent copy, always re-centered
    pub fn clone_centered(&self) -> Self {
        let mut shape = self.clone();
        shape.center_at_zero();
        shape
    }

    /// Scale, then rotate by `angle` radians, then translate by `position`.
    ///
    /// `out` is cleared and refilled so callers can reuse its allocation.
    pub fn transform(points: &[Vec2], position: Vec2, angle: f32, scale: Vec2, out: &mut Vec<Vec2>) {
        let rotation = Vec2::from_angle(angle);
        out.clear();
        out.extend(
            points
                .iter()
                .map(|&p| rotation.rotate(p * scale) + position),
        );
    }

    /// Allocating form of [`Shape::transform`] for this shape's points
    pub fn transformed(&self, position: Vec2, angle: f32, scale: Vec2) -> Vec<Vec2> {
        let mut out = Vec::with_capacity(self.count());
        Self::transform(&self.points, position, angle, scale, &mut out);
        out
    }

    /// Enclosed area, independent of winding
    pub fn area(&self) -> f32 {
        super::pressure::signed_area(&self.points).abs()
    }
}
