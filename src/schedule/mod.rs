//! Allocation-free scheduling
//!
//! - `pool`: reusable object slab with a reusable/live partition
//! - `timer`: one-shot and repeating timers that deliver messages
//! - `interpolator`: linear ramps that deliver step and finish notifications

pub mod interpolator;
pub mod pool;
pub mod timer;

pub use interpolator::{Interpolator, InterpolatorCollection, InterpolatorHandle, Tween};
pub use pool::Pool;
pub use timer::{Timer, TimerCollection, TimerHandle};
