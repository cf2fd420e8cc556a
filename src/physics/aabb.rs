//! Axis-aligned bounding boxes for broad-phase culling

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec2,
    pub max: Vec2,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min: Vec2::ZERO,
            max: Vec2::ZERO,
        }
    }
}

impl BoundingBox {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point; a single point gives a zero-size box.
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Self {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };
        let mut aabb = Self::new(first, first);
        for p in iter {
            aabb.expand_to_include(p);
        }
        aabb
    }

    #[inline]
    pub fn expand_to_include(&mut self, p: Vec2) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Box grown by `margin` on every side
    #[inline]
    pub fn inflated(&self, margin: f32) -> Self {
        Self::new(self.min - Vec2::splat(margin), self.max + Vec2::splat(margin))
    }

    /// Touching boxes count as intersecting
    #[inline]
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let aabb = BoundingBox::from_points([
            Vec2::new(1.0, -1.0),
            Vec2::new(-2.0, 3.0),
            Vec2::new(0.5, 0.5),
        ]);
        assert_eq!(aabb.min, Vec2::new(-2.0, -1.0));
        assert_eq!(aabb.max, Vec2::new(1.0, 3.0));
    }

    #[test]
    fn test_degenerate_box_still_intersects() {
        let point = BoundingBox::from_points([Vec2::new(1.0, 1.0)]);
        assert_eq!(point.size(), Vec2::ZERO);
        let other = BoundingBox::new(Vec2::ZERO, Vec2::new(2.0, 2.0));
        assert!(point.intersects(&other));
        assert!(other.intersects(&point));
    }

    #[test]
    fn test_disjoint_boxes() {
        let a = BoundingBox::new(Vec2::ZERO, Vec2::ONE);
        let b = BoundingBox::new(Vec2::new(1.5, 0.0), Vec2::new(2.0, 1.0));
        assert!(!a.intersects(&b));
        assert!(a.inflated(0.6).intersects(&b));
    }
}
