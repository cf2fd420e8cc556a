//! Deterministic gameplay module
//!
//! Entities, merging, hurting and respawning on top of the physics world.
//! This module must stay deterministic:
//! - Caller-supplied timestep only
//! - Seeded RNG only
//! - Stable iteration order (entity insertion order)

pub mod entity;
pub mod state;
pub mod tick;

pub use entity::{Bubble, Character, Enemy, Entity, EntityId, EntityKind, MAX_TIER, Wall};
pub use state::{ContactBuffer, Event, Simulation};
pub use tick::{TickInput, tick};
