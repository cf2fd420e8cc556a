//! Narrow-phase tests between bodies
//!
//! Nothing here moves a body. Penetration is a merge signal and contacts are
//! reported to gameplay; pressure and edge springs are the only separating forces.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::Body;
use super::pressure::signed_area;
use crate::consts::EPSILON;

/// Deepest point-mass-vs-edge contact between two bodies.
///
/// `point_mass` indexes the first body of the reported pair, `edge` the second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionInfo {
    pub point_mass: usize,
    pub edge: (usize, usize),
    /// Closest point on the edge
    pub point: Vec2,
    /// Unit vector pointing out of the edge's body
    pub normal: Vec2,
    /// Positive depth when inside, negative gap when just outside
    pub penetration: f32,
    /// Number of point masses within the threshold
    pub contacts: usize,
}

/// Crossing-number test; correct for concave outlines.
pub fn point_in_polygon(point: Vec2, polygon: &[Vec2]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];
        let dy = pj.y - pi.y;
        if dy.abs() > f32::EPSILON
            && ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / dy + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Closest point to `point` on segment `a`-`b`, and the clamped segment parameter.
pub fn closest_point_on_segment(point: Vec2, a: Vec2, b: Vec2) -> (Vec2, f32) {
    let line_vec = b - a;
    let line_len_sq = line_vec.length_squared();
    if line_len_sq < EPSILON * EPSILON {
        return (a, 0.0);
    }
    let t = ((point - a).dot(line_vec) / line_len_sq).clamp(0.0, 1.0);
    (a + line_vec * t, t)
}

/// Outward normal of edge `a`-`b` for a ring with the given signed area.
fn edge_normal(a: Vec2, b: Vec2, ring_area: f32) -> Vec2 {
    let perp = (b - a).perp().normalize_or_zero();
    if ring_area < 0.0 { perp } else { -perp }
}

/// Does either body's centroid or any of its point masses lie inside the other?
pub fn penetrates(a: &Body, b: &Body) -> bool {
    if !a.aabb().intersects(b.aabb()) {
        return false;
    }
    b.contains_point(a.position())
        || a.contains_point(b.position())
        || a.curr_shape().iter().any(|&p| b.contains_point(p))
        || b.curr_shape().iter().any(|&p| a.contains_point(p))
}

/// Point masses of `points` touching or inside the outline of `edges`.
///
/// Returns the deepest contact, or `None` when no point mass is inside or
/// within `threshold` of an edge.
pub fn find_contacts(points: &Body, edges: &Body, threshold: f32) -> Option<CollisionInfo> {
    let outline = edges.curr_shape();
    let n = outline.len();
    if n < 2 {
        return None;
    }
    let reach = edges.aabb().inflated(threshold);
    let ring_area = signed_area(outline);

    let mut best: Option<CollisionInfo> = None;
    let mut contacts = 0;
    for (index, pm) in points.point_masses().iter().enumerate() {
        let p = pm.position;
        if !reach.contains(p) {
            continue;
        }

        let mut closest = (f32::MAX, 0, Vec2::ZERO);
        for i in 0..n {
            let j = (i + 1) % n;
            let (on_edge, _) = closest_point_on_segment(p, outline[i], outline[j]);
            let dist = p.distance(on_edge);
            if dist < closest.0 {
                closest = (dist, i, on_edge);
            }
        }
        let (dist, i, on_edge) = closest;
        let j = (i + 1) % n;

        let inside = point_in_polygon(p, outline);
        if !inside && dist >= threshold {
            continue;
        }
        contacts += 1;

        let penetration = if inside { dist } else { -dist };
        let towards = if inside { on_edge - p } else { p - on_edge };
        let mut normal = towards.normalize_or_zero();
        if normal == Vec2::ZERO {
            normal = edge_normal(outline[i], outline[j], ring_area);
        }

        if best.is_none_or(|b| penetration > b.penetration) {
            best = Some(CollisionInfo {
                point_mass: index,
                edge: (i, j),
                point: on_edge,
                normal,
                penetration,
                contacts: 0,
            });
        }
    }

    best.map(|info| CollisionInfo { contacts, ..info })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::Shape;

    fn concave() -> Vec<Vec2> {
        // U shape opening upward
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(3.0, 0.0),
            Vec2::new(3.0, 3.0),
            Vec2::new(2.0, 3.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 3.0),
            Vec2::new(0.0, 3.0),
        ]
    }

    fn body_at(radius: f32, position: Vec2) -> Body {
        let shape = Shape::circle(radius, 9).unwrap();
        let mut body = Body::new_pressure(&shape, 9.0, 1.0, 1300.0, 20.0, 1300.0, 20.0).unwrap();
        body.set_position(position);
        body
    }

    #[test]
    fn test_point_in_concave_polygon() {
        let u = concave();
        assert!(point_in_polygon(Vec2::new(0.5, 2.0), &u));
        assert!(point_in_polygon(Vec2::new(1.5, 0.5), &u));
        // The notch of the U is outside
        assert!(!point_in_polygon(Vec2::new(1.5, 2.0), &u));
        assert!(!point_in_polygon(Vec2::new(-1.0, 1.0), &u));
    }

    #[test]
    fn test_point_in_polygon_either_winding() {
        let mut u = concave();
        u.reverse();
        assert!(point_in_polygon(Vec2::new(2.5, 2.5), &u));
        assert!(!point_in_polygon(Vec2::new(1.5, 2.5), &u));
    }

    #[test]
    fn test_degenerate_polygon_contains_nothing() {
        assert!(!point_in_polygon(Vec2::ZERO, &[Vec2::ZERO, Vec2::X]));
    }

    #[test]
    fn test_closest_point_clamps_to_segment() {
        let (p, t) = closest_point_on_segment(Vec2::new(5.0, 1.0), Vec2::ZERO, Vec2::new(2.0, 0.0));
        assert_eq!(p, Vec2::new(2.0, 0.0));
        assert_eq!(t, 1.0);
        let (p, t) = closest_point_on_segment(Vec2::new(1.0, 1.0), Vec2::ZERO, Vec2::new(2.0, 0.0));
        assert_eq!(p, Vec2::new(1.0, 0.0));
        assert!((t - 0.5).abs() < 1e-6);
        let (p, _) = closest_point_on_segment(Vec2::ONE, Vec2::ZERO, Vec2::ZERO);
        assert_eq!(p, Vec2::ZERO);
    }

    #[test]
    fn test_small_body_inside_large_penetrates() {
        let player = body_at(0.2, Vec2::ZERO);
        let bubble = body_at(0.03, Vec2::new(0.05, 0.0));
        assert!(penetrates(&bubble, &player));
        assert!(penetrates(&player, &bubble));
    }

    #[test]
    fn test_separated_bodies_do_not_penetrate() {
        let a = body_at(0.2, Vec2::ZERO);
        let b = body_at(0.2, Vec2::new(1.0, 0.0));
        assert!(!penetrates(&a, &b));
        assert!(find_contacts(&a, &b, 0.05).is_none());
    }

    #[test]
    fn test_contact_within_threshold() {
        let a = body_at(0.5, Vec2::ZERO);
        let b = body_at(0.5, Vec2::new(0.99, 0.0));
        let info = find_contacts(&a, &b, 0.05).unwrap();
        assert!(info.penetration <= 0.0);
        assert!(info.penetration > -0.05);
        // The touching point of `a` is pushed back toward `a`
        assert!(info.normal.x < 0.0);
        assert!(info.contacts >= 1);
    }

    #[test]
    fn test_overlap_reports_deepest_contact() {
        let a = body_at(0.5, Vec2::ZERO);
        let b = body_at(0.5, Vec2::new(0.8, 0.0));
        let info = find_contacts(&a, &b, 0.05).unwrap();
        assert!(info.penetration > 0.1);
        let pm = a.point_masses()[info.point_mass].position;
        assert!(b.contains_point(pm));
        assert!(info.normal.x < 0.0);
    }
}
