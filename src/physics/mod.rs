//! Soft-body physics
//!
//! Point masses joined by damped springs form closed bodies (optionally
//! inflated by a pressure model) and open chains. [`Physics`] owns them all.

pub mod aabb;
pub mod body;
pub mod chain;
pub mod collision;
pub mod pointmass;
pub mod pressure;
pub mod shape;
pub mod spring;
pub mod world;

pub use aabb::BoundingBox;
pub use body::Body;
pub use chain::Chain;
pub use collision::{CollisionInfo, closest_point_on_segment, point_in_polygon};
pub use pointmass::PointMass;
pub use pressure::PressureModel;
pub use shape::Shape;
pub use spring::Spring;
pub use world::{BodyId, ChainId, ContactListener, NoContacts, Physics};
