//! Error types
//!
//! Only configuration problems are reported as errors. Numerical trouble during
//! a step is absorbed by the solver and never surfaces here.

use thiserror::Error;

/// Errors raised while building physics objects.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("shape has no points")]
    EmptyShape,

    #[error("spring between point masses {a} and {b} has zero rest length")]
    ZeroRestLength { a: usize, b: usize },

    #[error("mass must be positive, got {0}")]
    InvalidMass(f32),

    #[error("need at least {needed} points, got {got}")]
    TooFewPoints { needed: usize, got: usize },
}

/// Errors raised by pools and scheduled items.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("duration must be greater than zero, got {0}")]
    NonPositiveDuration(f32),

    #[error("pool growth increment must be greater than zero")]
    ZeroGrowth,
}

/// Errors raised while loading or saving settings and level records.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while building or restoring a simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error(transparent)]
    Physics(#[from] PhysicsError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}
