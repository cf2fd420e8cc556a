//! Pooled visual particles (simulation side only)
//!
//! Particles live in a [`Pool`] capped by the quality preset. Velocities are in
//! world units per update, matching the per-frame damping and drift constants.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::schedule::Pool;
use crate::{ScheduleError, Settings};

/// Per-update velocity damping
const VELOCITY_DAMPING: f32 = 0.99;
/// Constant sideways drift added every update
const DRIFT: f32 = 0.00005;
/// Velocity kick at the center of an explode/implode
const INTERACT_STRENGTH: f32 = 0.1;

/// How a particle fades and wanders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ParticleStyle {
    /// Linear fade out, no wander
    #[default]
    Simple,
    /// Fades in and out, wanders slowly
    Ambient,
    /// Faint trail behind a bubble
    Tail,
}

impl ParticleStyle {
    /// Blend factor toward a random velocity each update
    fn wander(&self) -> f32 {
        match self {
            ParticleStyle::Simple => 0.0,
            ParticleStyle::Ambient => 0.001,
            ParticleStyle::Tail => 0.002,
        }
    }

    fn alpha(&self, t: f32) -> f32 {
        match self {
            ParticleStyle::Simple => 1.0 - t,
            ParticleStyle::Ambient => (t * PI).sin(),
            ParticleStyle::Tail => (1.0 - t) * 0.4,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub scale: Vec2,
    pub alpha: f32,
    pub age: f32,
    pub life: f32,
    pub style: ParticleStyle,
    alive: bool,
}

impl Particle {
    fn reset(&mut self, position: Vec3, velocity: Vec3, life: f32, style: ParticleStyle) {
        self.position = position;
        self.velocity = velocity;
        self.scale = Vec2::ONE;
        self.alpha = style.alpha(0.0);
        self.age = 0.0;
        self.life = life;
        self.style = style;
        self.alive = true;
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    fn update(&mut self, dt: f32, rng: &mut Pcg32) {
        if !self.alive {
            return;
        }
        self.age += dt;
        if self.age > self.life {
            self.alive = false;
        }

        let t = if self.life > 0.0 {
            (self.age / self.life).min(1.0)
        } else {
            1.0
        };
        self.alpha = self.style.alpha(t).clamp(0.0, 1.0);

        let wander = self.style.wander();
        if wander > 0.0 {
            let target = Vec3::new(
                rng.random::<f32>() - 0.5,
                rng.random::<f32>() - 0.5,
                rng.random::<f32>() - 0.5,
            );
            self.velocity = self.velocity.lerp(target, wander);
        }

        self.position += self.velocity;
        self.velocity *= VELOCITY_DAMPING;
        self.velocity.x += DRIFT;
    }
}

/// Every particle of one simulation.
#[derive(Debug)]
pub struct ParticleSystem {
    particles: Pool<Particle>,
    max_particles: usize,
    rng: Pcg32,
}

impl ParticleSystem {
    pub fn new(max_particles: usize, growth: usize, seed: u64) -> Result<Self, ScheduleError> {
        Ok(Self {
            particles: Pool::with_default(max_particles, growth, Particle::is_alive)?,
            max_particles,
            rng: Pcg32::seed_from_u64(seed),
        })
    }

    /// Capacity from the quality preset, seed offset from the physics seed
    pub fn from_settings(settings: &Settings) -> Result<Self, ScheduleError> {
        Self::new(
            settings.max_particles(),
            settings.pool_growth,
            settings.physics.seed.wrapping_add(1),
        )
    }

    /// Start a particle; `None` once the cap is reached.
    pub fn emit(
        &mut self,
        position: Vec3,
        velocity: Vec3,
        life: f32,
        style: ParticleStyle,
    ) -> Option<&mut Particle> {
        if self.particles.valid_count() >= self.max_particles {
            return None;
        }
        let particle = self.particles.spawn();
        particle.reset(position, velocity, life, style);
        Some(particle)
    }

    /// Emit `count` particles scattered uniformly in a box of `extent` around `center`.
    pub fn emit_around(
        &mut self,
        center: Vec3,
        extent: Vec3,
        count: usize,
        life: f32,
        style: ParticleStyle,
    ) -> usize {
        let mut emitted = 0;
        for _ in 0..count {
            let offset = Vec3::new(
                self.rng.random::<f32>() - 0.5,
                self.rng.random::<f32>() - 0.5,
                self.rng.random::<f32>() - 0.5,
            ) * extent;
            let life = life * (0.5 + 0.5 * self.rng.random::<f32>());
            if self.emit(center + offset, Vec3::ZERO, life, style).is_none() {
                break;
            }
            emitted += 1;
        }
        emitted
    }

    /// Age and move every particle, then retire the dead. Returns how many died.
    pub fn update(&mut self, dt: f32) -> usize {
        for particle in self.particles.iter_mut() {
            particle.update(dt, &mut self.rng);
        }
        self.particles.clean_up()
    }

    /// Push live particles within `radius` away from `position`
    pub fn explode(&mut self, position: Vec3, radius: f32) {
        self.interact(position, radius, true);
    }

    /// Pull live particles within `radius` toward `position`
    pub fn implode(&mut self, position: Vec3, radius: f32) {
        self.interact(position, radius, false);
    }

    fn interact(&mut self, position: Vec3, radius: f32, explode: bool) {
        if radius <= 0.0 {
            return;
        }
        for particle in self.particles.iter_mut().filter(|p| p.alive) {
            let direction = if explode {
                particle.position - position
            } else {
                position - particle.position
            };
            let distance = direction.length();
            if distance < radius {
                particle.velocity +=
                    direction.normalize_or_zero() * INTERACT_STRENGTH * (1.0 - distance / radius);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(|p| p.alive)
    }

    pub fn live_count(&self) -> usize {
        self.iter().count()
    }

    pub fn count_of(&self, style: ParticleStyle) -> usize {
        self.iter().filter(|p| p.style == style).count()
    }

    pub fn max_particles(&self) -> usize {
        self.max_particles
    }

    /// Kill every particle
    pub fn clear(&mut self) {
        for particle in self.particles.iter_mut() {
            particle.alive = false;
        }
        self.particles.clean_up();
    }
}
