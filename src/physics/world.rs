//! The physics world
//!
//! Owns every body and chain, steps them at a fixed sub-step, then runs broad
//! and narrow phase once per frame and reports contacts.

use std::f32::consts::TAU;
use std::fmt;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::body::Body;
use super::chain::Chain;
use super::collision::{CollisionInfo, find_contacts, penetrates};
use crate::polar_to_cartesian;
use crate::settings::PhysicsConfig;

/// Angles tried when looking for a free teleport target
const TELEPORT_ATTEMPTS: usize = 8;

/// Slack past the landing ring before a recycled body is recycled again
const TELEPORT_MARGIN: f32 = 1.0;

/// Stable handle to a body owned by a [`Physics`] world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u32);

/// Stable handle to a chain owned by a [`Physics`] world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainId(pub u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Receives contacts found during [`Physics::update_with`].
///
/// Both methods default to doing nothing.
pub trait ContactListener {
    /// `a` and `b` overlap (merge signal). Reported at most once per pair per update.
    fn on_penetration(&mut self, _a: BodyId, _b: BodyId) {}

    /// A point mass of `a` is inside or within the threshold of an edge of `b`.
    fn on_collision(&mut self, _a: BodyId, _b: BodyId, _info: &CollisionInfo) {}
}

/// Discards every contact
pub struct NoContacts;

impl ContactListener for NoContacts {}

type PenetrationCallback = Box<dyn FnMut(BodyId, BodyId)>;
type CollisionCallback = Box<dyn FnMut(BodyId, BodyId, &CollisionInfo)>;

#[derive(Default)]
struct Callbacks {
    on_penetration: Option<PenetrationCallback>,
    on_collision: Option<CollisionCallback>,
}

impl ContactListener for Callbacks {
    fn on_penetration(&mut self, a: BodyId, b: BodyId) {
        if let Some(callback) = self.on_penetration.as_mut() {
            callback(a, b);
        }
    }

    fn on_collision(&mut self, a: BodyId, b: BodyId, info: &CollisionInfo) {
        if let Some(callback) = self.on_collision.as_mut() {
            callback(a, b, info);
        }
    }
}

/// Soft-body world.
pub struct Physics {
    bodies: Vec<(BodyId, Body)>,
    chains: Vec<(ChainId, Chain)>,
    next_body: u32,
    next_chain: u32,
    config: PhysicsConfig,
    rng: Pcg32,
    callbacks: Callbacks,
}

impl fmt::Debug for Physics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Physics")
            .field("bodies", &self.bodies.len())
            .field("chains", &self.chains.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

impl Physics {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            bodies: Vec::new(),
            chains: Vec::new(),
            next_body: 0,
            next_chain: 0,
            rng: Pcg32::seed_from_u64(config.seed),
            config,
            callbacks: Callbacks::default(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    // === Membership ===

    pub fn add_body(&mut self, body: Body) -> BodyId {
        let id = BodyId(self.next_body);
        self.next_body += 1;
        log::debug!("Added {} ({})", id, body);
        self.bodies.push((id, body));
        id
    }

    /// Remove and return a body; insertion order of the rest is kept.
    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        let index = self.bodies.iter().position(|(bid, _)| *bid == id)?;
        log::debug!("Removed {}", id);
        Some(self.bodies.remove(index).1)
    }

    pub fn add_chain(&mut self, chain: Chain) -> ChainId {
        let id = ChainId(self.next_chain);
        self.next_chain += 1;
        self.chains.push((id, chain));
        id
    }

    pub fn remove_chain(&mut self, id: ChainId) -> Option<Chain> {
        let index = self.chains.iter().position(|(cid, _)| *cid == id)?;
        Some(self.chains.remove(index).1)
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies
            .iter()
            .find(|(bid, _)| *bid == id)
            .map(|(_, body)| body)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies
            .iter_mut()
            .find(|(bid, _)| *bid == id)
            .map(|(_, body)| body)
    }

    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains
            .iter()
            .find(|(cid, _)| *cid == id)
            .map(|(_, chain)| chain)
    }

    pub fn chain_mut(&mut self, id: ChainId) -> Option<&mut Chain> {
        self.chains
            .iter_mut()
            .find(|(cid, _)| *cid == id)
            .map(|(_, chain)| chain)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.bodies.iter().map(|(id, body)| (*id, body))
    }

    pub fn chains(&self) -> impl Iterator<Item = (ChainId, &Chain)> {
        self.chains.iter().map(|(id, chain)| (*id, chain))
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    // === Callbacks ===

    /// Replace the merge hook used by [`Physics::update`]
    pub fn set_on_penetration(&mut self, callback: impl FnMut(BodyId, BodyId) + 'static) {
        self.callbacks.on_penetration = Some(Box::new(callback));
    }

    /// Replace the contact hook used by [`Physics::update`]
    pub fn set_on_collision(
        &mut self,
        callback: impl FnMut(BodyId, BodyId, &CollisionInfo) + 'static,
    ) {
        self.callbacks.on_collision = Some(Box::new(callback));
    }

    // === Stepping ===

    /// Step the world and report contacts to the registered callbacks.
    pub fn update(&mut self, dt: f32) {
        let mut callbacks = std::mem::take(&mut self.callbacks);
        self.update_with(dt, &mut callbacks);
        self.callbacks = callbacks;
    }

    /// Step the world and report contacts to `listener`.
    ///
    /// `dt` is split into equal sub-steps no longer than the configured
    /// sub-step. Time past `max_substeps` sub-steps is dropped. Contacts are
    /// detected once, after the last sub-step.
    pub fn update_with(&mut self, dt: f32, listener: &mut impl ContactListener) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let substeps = self.config.substeps_for(dt);
        let mut sub_dt = dt / substeps as f32;
        if self.config.sub_step > 0.0 && sub_dt > self.config.sub_step {
            let dropped = dt - self.config.sub_step * substeps as f32;
            log::debug!("Frame too long, dropping {:.3}s of simulation", dropped);
            sub_dt = self.config.sub_step;
        }

        for _ in 0..substeps {
            for (_, body) in &mut self.bodies {
                body.update(sub_dt);
            }
            for (_, chain) in &mut self.chains {
                chain.update(sub_dt);
            }
        }

        self.detect_contacts(listener);
    }

    fn detect_contacts(&self, listener: &mut impl ContactListener) {
        let threshold = self.config.collision_threshold;
        let mut penetrations = 0;
        let mut collisions = 0;

        for i in 0..self.bodies.len() {
            let (id_a, a) = &self.bodies[i];
            let reach = a.aabb().inflated(threshold);
            for (id_b, b) in &self.bodies[i + 1..] {
                // Walls never touch walls
                if a.is_static() && b.is_static() {
                    continue;
                }
                if !reach.intersects(b.aabb()) {
                    continue;
                }

                if penetrates(a, b) {
                    penetrations += 1;
                    listener.on_penetration(*id_a, *id_b);
                }

                let forward = find_contacts(a, b, threshold);
                let backward = find_contacts(b, a, threshold);
                let report = match (forward, backward) {
                    (Some(f), Some(r)) => {
                        let contacts = f.contacts + r.contacts;
                        if r.penetration > f.penetration {
                            Some((*id_b, *id_a, CollisionInfo { contacts, ..r }))
                        } else {
                            Some((*id_a, *id_b, CollisionInfo { contacts, ..f }))
                        }
                    }
                    (Some(f), None) => Some((*id_a, *id_b, f)),
                    (None, Some(r)) => Some((*id_b, *id_a, r)),
                    (None, None) => None,
                };
                if let Some((first, second, info)) = report {
                    collisions += 1;
                    listener.on_collision(first, second, &info);
                }
            }
        }

        log::trace!("{} penetrations, {} collisions", penetrations, collisions);
    }

    // === Spatial queries ===

    /// First non-static body whose outline contains `point`
    pub fn is_point_inside_any_body(&self, point: Vec2) -> Option<BodyId> {
        self.bodies
            .iter()
            .find(|(_, body)| !body.is_static() && body.contains_point(point))
            .map(|(id, _)| *id)
    }

    /// Recycle distant non-static bodies around `reference`.
    ///
    /// A body is recycled once it is farther than `threshold` and also past
    /// the landing ring (`teleport_distance` plus a small margin), so every
    /// recycled body ends up closer than it was and stays put until it
    /// drifts out again. It is moved to a random point `teleport_distance`
    /// from `reference`, avoiding other bodies when a free angle is found
    /// within a few tries. Velocities are kept. Returns how many bodies moved.
    pub fn move_distant_bodies(
        &mut self,
        reference: Vec2,
        threshold: f32,
        teleport_distance: f32,
    ) -> usize {
        let cutoff = threshold.max(teleport_distance + TELEPORT_MARGIN);
        let mut moved = 0;
        for index in 0..self.bodies.len() {
            let (id, body) = &self.bodies[index];
            if body.is_static() || body.position().distance(reference) <= cutoff {
                continue;
            }
            let id = *id;

            let mut target = reference;
            for _ in 0..TELEPORT_ATTEMPTS {
                let theta = self.rng.random_range(0.0..TAU);
                target = reference + polar_to_cartesian(teleport_distance, theta);
                let blocked = self
                    .bodies
                    .iter()
                    .any(|(other, body)| *other != id && body.contains_point(target));
                if !blocked {
                    break;
                }
            }

            log::debug!("Teleporting {} to ({:.1}, {:.1})", id, target.x, target.y);
            self.bodies[index].1.set_position(target);
            moved += 1;
        }
        moved
    }
}
