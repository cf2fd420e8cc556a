//! Gas pressure and shape-matching springs that keep a ring inflated
//!
//! A `Body` carries an optional [`PressureModel`]. The model adds two kinds of
//! force on top of the ring's edge springs:
//! - shape springs pulling each point mass toward its rest-shape anchor
//! - a gas force along each vertex normal, proportional to how far the enclosed
//!   area has drifted from the target area

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::pointmass::PointMass;
use super::spring::anchor_force;
use crate::consts::EPSILON;

/// Pressure and shape-spring parameters of a pressure body.
///
/// All three scalars may be changed between frames (size tiers do this).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureModel {
    pub pressure: f32,
    pub shape_k: f32,
    pub shape_damping: f32,
    /// Area the gas force tries to restore
    pub target_area: f32,
    #[serde(skip)]
    normals: Vec<Vec2>,
}

impl PressureModel {
    pub fn new(pressure: f32, shape_k: f32, shape_damping: f32, target_area: f32) -> Self {
        Self {
            pressure,
            shape_k,
            shape_damping,
            target_area,
            normals: Vec::new(),
        }
    }

    /// Pull every point mass toward its anchor (the rest shape placed in the body's frame).
    pub fn apply_shape_springs(&self, points: &mut [PointMass], anchors: &[Vec2], anchor_velocity: Vec2) {
        if self.shape_k == 0.0 && self.shape_damping == 0.0 {
            return;
        }
        for (pm, &anchor) in points.iter_mut().zip(anchors) {
            let force = anchor_force(
                pm.position,
                pm.velocity,
                anchor,
                anchor_velocity,
                self.shape_k,
                self.shape_damping,
            );
            pm.apply_force(force);
        }
    }

    /// Push every point mass along its outward normal; returns the area used.
    pub fn apply_gas_pressure(&mut self, points: &mut [PointMass], positions: &[Vec2]) -> f32 {
        let area = signed_area(positions);
        let deviation = area_deviation(area.abs(), self.target_area);
        if deviation == 0.0 || self.pressure == 0.0 {
            return area;
        }
        vertex_normals(positions, &mut self.normals);
        for (pm, normal) in points.iter_mut().zip(&self.normals) {
            pm.apply_force(*normal * (self.pressure * deviation));
        }
        area
    }
}

/// Relative shortfall of `area` against `target`, clamped to [-1, 1].
///
/// Positive inflates, negative deflates, zero at the target.
pub fn area_deviation(area: f32, target: f32) -> f32 {
    if target < EPSILON || !area.is_finite() {
        return 0.0;
    }
    ((target - area) / target).clamp(-1.0, 1.0)
}

/// Shoelace area; positive for counter-clockwise rings.
pub fn signed_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += a.perp_dot(b);
    }
    sum * 0.5
}

/// Unit outward normal at every vertex of a closed ring.
///
/// The normal is perpendicular to (from-previous + to-next), which averages the
/// two adjacent edges. Degenerate vertices get a zero normal.
pub fn vertex_normals(points: &[Vec2], out: &mut Vec<Vec2>) {
    out.clear();
    let n = points.len();
    if n < 3 {
        out.resize(n, Vec2::ZERO);
        return;
    }
    // perp() points outward for clockwise rings
    let outward = if signed_area(points) < 0.0 { 1.0 } else { -1.0 };
    for i in 0..n {
        let prev = points[if i > 0 { i - 1 } else { n - 1 }];
        let next = points[if i + 1 < n { i + 1 } else { 0 }];
        let pt = points[i];
        let tangent = (pt - prev) + (next - pt);
        out.push(tangent.perp().normalize_or_zero() * outward);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::Shape;

    fn masses(positions: &[Vec2]) -> Vec<PointMass> {
        positions.iter().map(|&p| PointMass::new(1.0, p)).collect()
    }

    #[test]
    fn test_signed_area_follows_winding() {
        let ccw = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        let mut cw = ccw;
        cw.reverse();
        assert!((signed_area(&ccw) - 1.0).abs() < 1e-6);
        assert!((signed_area(&cw) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normals_point_outward_for_both_windings() {
        let shape = Shape::circle(1.0, 8).unwrap();
        let cw = shape.points().to_vec();
        let mut ccw = cw.clone();
        ccw.reverse();
        for ring in [cw, ccw] {
            let mut normals = Vec::new();
            vertex_normals(&ring, &mut normals);
            for (p, n) in ring.iter().zip(&normals) {
                assert!(p.dot(*n) > 0.9, "normal {n:?} at {p:?} should point away from center");
            }
        }
    }

    #[test]
    fn test_zero_force_at_target_area() {
        let shape = Shape::circle(1.0, 9).unwrap();
        let positions = shape.points().to_vec();
        let mut points = masses(&positions);
        let mut model = PressureModel::new(25.0, 0.0, 0.0, shape.area());
        model.apply_gas_pressure(&mut points, &positions);
        for pm in &points {
            assert!(pm.force.length() < 1e-3, "force {:?}", pm.force);
        }
    }

    #[test]
    fn test_shrunk_ring_inflates() {
        let shape = Shape::circle(1.0, 9).unwrap();
        let positions: Vec<Vec2> = shape.points().iter().map(|p| *p * 0.5).collect();
        let mut points = masses(&positions);
        let mut model = PressureModel::new(10.0, 0.0, 0.0, shape.area());
        model.apply_gas_pressure(&mut points, &positions);
        for (pm, p) in points.iter().zip(&positions) {
            assert!(pm.force.dot(*p) > 0.0);
        }
    }

    #[test]
    fn test_collapsed_ring_stays_finite() {
        let positions = vec![Vec2::ZERO; 6];
        let mut points = masses(&positions);
        let mut model = PressureModel::new(10.0, 0.0, 0.0, 1.0);
        model.apply_gas_pressure(&mut points, &positions);
        for pm in &points {
            assert!(pm.force.is_finite());
        }
    }

    #[test]
    fn test_area_deviation_clamped() {
        assert_eq!(area_deviation(0.0, 2.0), 1.0);
        assert_eq!(area_deviation(10.0, 2.0), -1.0);
        assert_eq!(area_deviation(2.0, 2.0), 0.0);
        assert_eq!(area_deviation(1.0, 0.0), 0.0);
    }
}
