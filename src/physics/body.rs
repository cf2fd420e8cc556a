//! Closed rings of point masses
//!
//! A body is a polygon outline made of point masses joined by edge springs,
//! including the wrap-around spring from the last point back to the first.
//! Pressure bodies are ordinary bodies carrying a [`PressureModel`].

use std::fmt;

use glam::Vec2;

use super::aabb::BoundingBox;
use super::collision::point_in_polygon;
use super::pointmass::PointMass;
use super::pressure::PressureModel;
use super::shape::Shape;
use super::spring::Spring;
use crate::PhysicsError;
use crate::consts::EPSILON;

/// Edge stiffness used when a body is built without explicit spring parameters
pub const DEFAULT_EDGE_K: f32 = 1000.0;
/// Edge damping used when a body is built without explicit spring parameters
pub const DEFAULT_EDGE_DAMPING: f32 = 20.0;

/// A soft polygon body.
#[derive(Debug, Clone)]
pub struct Body {
    point_masses: Vec<PointMass>,
    edge_springs: Vec<Spring>,
    /// Rest shape, centered on the origin
    shape: Shape,
    /// Current outline in world space
    curr_shape: Vec<Vec2>,
    /// Scratch: rest shape placed in the current frame
    anchors: Vec<Vec2>,
    position: Vec2,
    velocity: Vec2,
    angle: f32,
    scale: Vec2,
    aabb: BoundingBox,
    mass: f32,
    is_static: bool,
    /// Set by gameplay while a merge is in progress
    pub is_merging: bool,
    pub edge_k: f32,
    pub edge_damping: f32,
    /// Present on pressure bodies
    pub pressure: Option<PressureModel>,
}

impl Body {
    /// Dynamic body with `mass` split evenly across one point mass per shape point.
    pub fn new(shape: &Shape, mass: f32) -> Result<Self, PhysicsError> {
        Self::with_springs(shape, mass, DEFAULT_EDGE_K, DEFAULT_EDGE_DAMPING)
    }

    /// Dynamic body with explicit edge spring parameters.
    pub fn with_springs(
        shape: &Shape,
        mass: f32,
        edge_k: f32,
        edge_damping: f32,
    ) -> Result<Self, PhysicsError> {
        if mass.is_nan() || mass <= 0.0 {
            return Err(PhysicsError::InvalidMass(mass));
        }
        if shape.count() < 3 {
            return Err(PhysicsError::TooFewPoints {
                needed: 3,
                got: shape.count(),
            });
        }

        let shape = shape.clone_centered();
        let n = shape.count();
        let per_point = if mass >= f32::MAX { f32::MAX } else { mass / n as f32 };
        let point_masses: Vec<PointMass> = shape
            .points()
            .iter()
            .map(|&p| PointMass::new(per_point, p))
            .collect();

        let edge_springs = (0..n)
            .map(|i| Spring::between(&point_masses, i, (i + 1) % n, edge_k, edge_damping))
            .collect::<Result<Vec<_>, _>>()?;

        let mut body = Self {
            curr_shape: Vec::with_capacity(n),
            anchors: Vec::with_capacity(n),
            point_masses,
            edge_springs,
            shape,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            angle: 0.0,
            scale: Vec2::ONE,
            aabb: BoundingBox::default(),
            mass,
            is_static: false,
            is_merging: false,
            edge_k,
            edge_damping,
            pressure: None,
        };
        body.refresh();
        Ok(body)
    }

    /// Pressure body; parameter order follows the classic
    /// (mass, pressure, shape k, shape damping, edge k, edge damping) layout.
    pub fn new_pressure(
        shape: &Shape,
        mass: f32,
        pressure: f32,
        shape_k: f32,
        shape_damping: f32,
        edge_k: f32,
        edge_damping: f32,
    ) -> Result<Self, PhysicsError> {
        let mut body = Self::with_springs(shape, mass, edge_k, edge_damping)?;
        let target_area = body.shape.area();
        body.pressure = Some(PressureModel::new(pressure, shape_k, shape_damping, target_area));
        Ok(body)
    }

    /// Immovable body placed at `position`; its outline follows `position`/`angle` only.
    pub fn new_static(shape: &Shape, position: Vec2) -> Result<Self, PhysicsError> {
        let mut body = Self::new(shape, f32::MAX)?;
        body.set_static(true);
        body.set_position(position);
        Ok(body)
    }

    pub fn set_static(&mut self, is_static: bool) {
        self.is_static = is_static;
        let per_point = if is_static || self.mass >= f32::MAX {
            f32::MAX
        } else {
            self.mass / self.point_masses.len() as f32
        };
        for pm in &mut self.point_masses {
            pm.set_mass(per_point);
            pm.velocity = Vec2::ZERO;
        }
        self.velocity = Vec2::ZERO;
        if is_static {
            self.place_static();
        }
        self.refresh();
    }

    /// Advance the body by `dt` seconds.
    ///
    /// Dynamic bodies accumulate spring and pressure forces, integrate, then
    /// re-derive centroid, velocity, outline and bounds. Static bodies only
    /// re-place their outline at `position`.
    pub fn update(&mut self, dt: f32) {
        if self.is_static {
            self.place_static();
            self.refresh();
            return;
        }

        self.accumulate_forces();
        for pm in &mut self.point_masses {
            pm.integrate(dt);
        }
        self.refresh();
    }

    fn accumulate_forces(&mut self) {
        for spring in &self.edge_springs {
            spring.apply_with(&mut self.point_masses, self.edge_k, self.edge_damping);
        }

        if self.pressure.is_none() {
            return;
        }
        self.derive_frame();
        Shape::transform(
            self.shape.points(),
            self.position,
            self.angle,
            self.scale,
            &mut self.anchors,
        );
        self.curr_shape.clear();
        self.curr_shape
            .extend(self.point_masses.iter().map(|pm| pm.position));

        if let Some(model) = self.pressure.as_mut() {
            model.apply_shape_springs(&mut self.point_masses, &self.anchors, self.velocity);
            model.apply_gas_pressure(&mut self.point_masses, &self.curr_shape);
        }
    }

    fn place_static(&mut self) {
        Shape::transform(
            self.shape.points(),
            self.position,
            self.angle,
            self.scale,
            &mut self.anchors,
        );
        for (pm, &p) in self.point_masses.iter_mut().zip(&self.anchors) {
            pm.position = p;
            pm.velocity = Vec2::ZERO;
            pm.force = Vec2::ZERO;
        }
    }

    /// Recompute centroid, mean velocity and best-fit rotation from the point masses.
    fn derive_frame(&mut self) {
        if self.is_static {
            return;
        }
        let n = self.point_masses.len() as f32;
        self.position = self.point_masses.iter().map(|pm| pm.position).sum::<Vec2>() / n;
        self.velocity = self.point_masses.iter().map(|pm| pm.velocity).sum::<Vec2>() / n;

        let (mut cross, mut dot) = (0.0, 0.0);
        for (rest, pm) in self.shape.points().iter().zip(&self.point_masses) {
            let base = *rest * self.scale;
            let current = pm.position - self.position;
            cross += base.perp_dot(current);
            dot += base.dot(current);
        }
        if cross.abs() > EPSILON || dot.abs() > EPSILON {
            self.angle = cross.atan2(dot);
        }
    }

    fn refresh(&mut self) {
        self.derive_frame();
        self.curr_shape.clear();
        self.curr_shape
            .extend(self.point_masses.iter().map(|pm| pm.position));
        self.aabb = BoundingBox::from_points(self.curr_shape.iter().copied());
    }

    /// Move the whole body so its centroid lands on `position`.
    pub fn set_position(&mut self, position: Vec2) {
        if self.is_static {
            self.position = position;
            self.place_static();
        } else {
            let delta = position - self.position;
            for pm in &mut self.point_masses {
                pm.position += delta;
            }
        }
        self.refresh();
    }

    /// Set the mean velocity, keeping each point mass's deviation from it.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.add_velocity(velocity - self.velocity);
    }

    pub fn add_velocity(&mut self, delta: Vec2) {
        if self.is_static {
            return;
        }
        for pm in self.point_masses.iter_mut().filter(|pm| !pm.is_pinned()) {
            pm.velocity += delta;
        }
        self.velocity += delta;
    }

    /// Apply the same force to every point mass
    pub fn apply_force(&mut self, force: Vec2) {
        for pm in &mut self.point_masses {
            pm.apply_force(force);
        }
    }

    /// Rotation used to place a static body's outline
    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle;
        if self.is_static {
            self.place_static();
            self.refresh();
        }
    }

    pub fn set_scale(&mut self, scale: Vec2) {
        self.scale = scale;
        if self.is_static {
            self.place_static();
            self.refresh();
        }
    }

    /// Is `point` inside the current outline
    pub fn contains_point(&self, point: Vec2) -> bool {
        self.aabb.contains(point) && point_in_polygon(point, &self.curr_shape)
    }

    pub fn point_masses(&self) -> &[PointMass] {
        &self.point_masses
    }

    /// Direct access for gameplay that drives individual point masses
    pub fn point_masses_mut(&mut self) -> &mut [PointMass] {
        &mut self.point_masses
    }

    pub fn edge_springs(&self) -> &[Spring] {
        &self.edge_springs
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn curr_shape(&self) -> &[Vec2] {
        &self.curr_shape
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    pub fn aabb(&self) -> &BoundingBox {
        &self.aabb
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pos:({:.2},{:.2}) vel:({:.2},{:.2}) points:{}",
            self.position.x,
            self.position.y,
            self.velocity.x,
            self.velocity.y,
            self.point_masses.len()
        )?;
        if self.is_static {
            write!(f, " static")?;
        }
        if self.is_merging {
            write!(f, " merging")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bubble(radius: f32) -> Body {
        let shape = Shape::circle(radius, 9).unwrap();
        Body::new_pressure(&shape, 9.0, 1.0, 1300.0, 20.0, 1300.0, 20.0).unwrap()
    }

    #[test]
    fn test_ring_topology() {
        let shape = Shape::circle(1.0, 7).unwrap();
        let body = Body::new(&shape, 7.0).unwrap();
        let springs = body.edge_springs();
        assert_eq!(springs.len(), 7);
        for (i, s) in springs.iter().enumerate() {
            assert_eq!(s.pointmass_a, i);
            assert_eq!(s.pointmass_b, (i + 1) % 7);
        }
        assert!(springs.iter().any(|s| s.pointmass_a == 6 && s.pointmass_b == 0));
    }

    #[test]
    fn test_mass_split_per_point() {
        let shape = Shape::rectangle(1.0, 1.0).unwrap();
        let body = Body::new(&shape, 2.0).unwrap();
        assert_eq!(body.point_masses().len(), shape.count());
        for pm in body.point_masses() {
            assert!((pm.mass - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_construction_errors() {
        let shape = Shape::rectangle(1.0, 1.0).unwrap();
        assert_eq!(Body::new(&shape, 0.0).unwrap_err(), PhysicsError::InvalidMass(0.0));

        let line = Shape::new(vec![Vec2::ZERO, Vec2::X], false).unwrap();
        assert!(matches!(
            Body::new(&line, 1.0),
            Err(PhysicsError::TooFewPoints { needed: 3, got: 2 })
        ));

        let duplicate = Shape::new(vec![Vec2::ZERO, Vec2::ZERO, Vec2::X], false).unwrap();
        assert!(matches!(
            Body::new(&duplicate, 1.0),
            Err(PhysicsError::ZeroRestLength { .. })
        ));
    }

    #[test]
    fn test_body_does_not_mutate_template() {
        let template = Shape::new(
            vec![Vec2::new(5.0, 5.0), Vec2::new(6.0, 5.0), Vec2::new(5.0, 6.0)],
            false,
        )
        .unwrap();
        let body = Body::new(&template, 3.0).unwrap();
        assert_eq!(template.points()[0], Vec2::new(5.0, 5.0));
        assert!(body.shape().get_center().length() < 1e-5);
    }

    #[test]
    fn test_pressure_equilibrium_at_rest() {
        let mut body = bubble(0.2);
        body.set_position(Vec2::new(3.0, -1.0));
        let before: Vec<Vec2> = body.point_masses().iter().map(|pm| pm.position).collect();
        body.update(1.0 / 240.0);
        for (pm, p) in body.point_masses().iter().zip(&before) {
            assert!(pm.velocity.length() < 1e-3, "velocity {:?}", pm.velocity);
            assert!((pm.position - *p).length() < 1e-4);
        }
    }

    #[test]
    fn test_squashed_pressure_body_recovers() {
        let mut body = bubble(0.5);
        let rest_area = body.shape().area();
        for pm in body.point_masses_mut() {
            pm.position.y *= 0.5;
        }
        for _ in 0..600 {
            body.update(1.0 / 240.0);
        }
        let area = super::super::pressure::signed_area(body.curr_shape()).abs();
        assert!((area - rest_area).abs() / rest_area < 0.1, "area {area} vs {rest_area}");
        assert!(body.curr_shape().iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_static_body_ignores_forces() {
        let shape = Shape::rectangle(2.0, 1.0).unwrap();
        let mut body = Body::new_static(&shape, Vec2::new(4.0, 4.0)).unwrap();
        let before: Vec<Vec2> = body.point_masses().iter().map(|pm| pm.position).collect();
        for _ in 0..10 {
            body.apply_force(Vec2::new(1.0e6, -1.0e6));
            body.add_velocity(Vec2::new(5.0, 5.0));
            body.update(1.0 / 60.0);
        }
        for (pm, p) in body.point_masses().iter().zip(&before) {
            assert!((pm.position - *p).length() < 1e-6);
        }
        assert!((body.position() - Vec2::new(4.0, 4.0)).length() < 1e-6);
    }

    #[test]
    fn test_static_body_follows_position() {
        let shape = Shape::rectangle(2.0, 2.0).unwrap();
        let mut body = Body::new_static(&shape, Vec2::ZERO).unwrap();
        body.set_position(Vec2::new(10.0, 0.0));
        body.update(0.0);
        assert!(body.contains_point(Vec2::new(10.5, 0.5)));
        assert!(!body.contains_point(Vec2::new(0.5, 0.5)));
        assert_eq!(body.aabb().min, Vec2::new(9.0, -1.0));
    }

    #[test]
    fn test_set_position_and_velocity() {
        let mut body = bubble(0.2);
        body.set_position(Vec2::new(-2.0, 7.0));
        assert!((body.position() - Vec2::new(-2.0, 7.0)).length() < 1e-5);
        assert!(body.contains_point(Vec2::new(-2.0, 7.0)));

        body.set_velocity(Vec2::new(1.0, 0.0));
        body.update(0.1);
        assert!((body.velocity() - Vec2::new(1.0, 0.0)).length() < 1e-2);
        assert!(body.position().x > -2.0);
    }

    #[test]
    fn test_tier_parameters_change_without_rebuild() {
        let mut body = bubble(0.2);
        body.edge_k = 50.0;
        if let Some(model) = body.pressure.as_mut() {
            model.pressure = 25.0;
            model.shape_k = 50.0;
        }
        for _ in 0..60 {
            body.update(1.0 / 240.0);
        }
        assert_eq!(body.point_masses().len(), 9);
        assert_eq!(body.edge_springs().len(), 9);
        assert!(body.curr_shape().iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_display_is_simple() {
        let shape = Shape::rectangle(1.0, 1.0).unwrap();
        let body = Body::new_static(&shape, Vec2::new(1.0, 2.0)).unwrap();
        let text = body.to_string();
        assert!(text.contains("pos:(1.00,2.00)"));
        assert!(text.contains("static"));
    }
}
