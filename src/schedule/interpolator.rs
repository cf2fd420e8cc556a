//! Pooled linear value ramps
//!
//! Every update of an active interpolator pushes a [`Tween::Step`]; the update
//! that reaches the end value also pushes a single [`Tween::Finished`].

use serde::{Deserialize, Serialize};

use super::pool::Pool;
use crate::ScheduleError;

/// Identifies one interpolator for its whole life; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterpolatorHandle(pub u64);

/// Notification produced by an interpolator
#[derive(Debug, Clone, PartialEq)]
pub enum Tween<E> {
    Step {
        handle: InterpolatorHandle,
        value: f32,
        message: E,
    },
    Finished {
        handle: InterpolatorHandle,
        value: f32,
        message: E,
    },
}

impl<E> Tween<E> {
    pub fn handle(&self) -> InterpolatorHandle {
        match self {
            Tween::Step { handle, .. } | Tween::Finished { handle, .. } => *handle,
        }
    }

    pub fn value(&self) -> f32 {
        match self {
            Tween::Step { value, .. } | Tween::Finished { value, .. } => *value,
        }
    }

    pub fn message(&self) -> &E {
        match self {
            Tween::Step { message, .. } | Tween::Finished { message, .. } => message,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Tween::Finished { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Interpolator<E> {
    handle: InterpolatorHandle,
    active: bool,
    /// Normalized progress in [0, 1]
    pub progress: f32,
    pub start: f32,
    pub end: f32,
    pub value: f32,
    speed: f32,
    message: Option<E>,
}

impl<E> Default for Interpolator<E> {
    fn default() -> Self {
        Self {
            handle: InterpolatorHandle(0),
            active: false,
            progress: 0.0,
            start: 0.0,
            end: 0.0,
            value: 0.0,
            speed: 0.0,
            message: None,
        }
    }
}

impl<E: Clone> Interpolator<E> {
    fn reset(&mut self, handle: InterpolatorHandle, start: f32, end: f32, duration: f32, message: E) {
        self.handle = handle;
        self.active = true;
        self.progress = 0.0;
        self.start = start;
        self.end = end;
        self.value = start;
        self.speed = 1.0 / duration;
        self.message = Some(message);
    }

    pub fn handle(&self) -> InterpolatorHandle {
        self.handle
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Deactivate without any notification
    pub fn stop(&mut self) {
        self.active = false;
        self.message = None;
    }

    /// Jump to the end value and notify as a natural finish would.
    pub fn force_finish(&mut self, out: &mut Vec<Tween<E>>) {
        if !self.active {
            return;
        }
        self.progress = 1.0;
        self.finish(out);
    }

    pub fn update(&mut self, dt: f32, out: &mut Vec<Tween<E>>) {
        // Stopped mid-pass, waiting for clean up
        if !self.active {
            return;
        }
        self.progress = (self.progress + self.speed * dt).min(1.0);
        if self.progress >= 1.0 {
            self.finish(out);
            return;
        }
        self.value = self.start + (self.end - self.start) * self.progress;
        if let Some(message) = &self.message {
            out.push(Tween::Step {
                handle: self.handle,
                value: self.value,
                message: message.clone(),
            });
        }
    }

    fn finish(&mut self, out: &mut Vec<Tween<E>>) {
        self.active = false;
        self.value = self.end;
        if let Some(message) = self.message.take() {
            out.push(Tween::Step {
                handle: self.handle,
                value: self.value,
                message: message.clone(),
            });
            out.push(Tween::Finished {
                handle: self.handle,
                value: self.value,
                message,
            });
        }
    }
}

/// Every interpolator of one owner, drawn from a pool.
#[derive(Debug)]
pub struct InterpolatorCollection<E> {
    interpolators: Pool<Interpolator<E>>,
    next_serial: u64,
}

impl<E: Clone + 'static> InterpolatorCollection<E> {
    pub fn new(capacity: usize, growth: usize) -> Result<Self, ScheduleError> {
        let mut interpolators =
            Pool::with_default(capacity, growth, |i: &Interpolator<E>| i.active)?;
        interpolators.set_on_deinitialize(|i| i.message = None);
        Ok(Self {
            interpolators,
            next_serial: 1,
        })
    }

    /// Ramp from `start` to `end` over `duration` seconds.
    pub fn create(
        &mut self,
        start: f32,
        end: f32,
        duration: f32,
        message: E,
    ) -> Result<InterpolatorHandle, ScheduleError> {
        if duration.is_nan() || duration <= 0.0 {
            return Err(ScheduleError::NonPositiveDuration(duration));
        }
        let handle = InterpolatorHandle(self.next_serial);
        self.next_serial += 1;
        self.interpolators
            .spawn()
            .reset(handle, start, end, duration, message);
        Ok(handle)
    }

    /// Advance every live interpolator, then retire the finished ones.
    pub fn update(&mut self, dt: f32, out: &mut Vec<Tween<E>>) {
        for interpolator in self.interpolators.iter_mut() {
            interpolator.update(dt, out);
        }
        self.interpolators.clean_up();
    }

    fn find_mut(&mut self, handle: InterpolatorHandle) -> Option<&mut Interpolator<E>> {
        self.interpolators
            .iter_mut()
            .find(|i| i.active && i.handle == handle)
    }

    pub fn get(&self, handle: InterpolatorHandle) -> Option<&Interpolator<E>> {
        self.interpolators
            .iter()
            .find(|i| i.active && i.handle == handle)
    }

    /// Stop an interpolator; false if it already finished or was stopped.
    pub fn stop(&mut self, handle: InterpolatorHandle) -> bool {
        match self.find_mut(handle) {
            Some(interpolator) => {
                interpolator.stop();
                true
            }
            None => false,
        }
    }

    /// Finish now; false if it is no longer active.
    pub fn force_finish(&mut self, handle: InterpolatorHandle, out: &mut Vec<Tween<E>>) -> bool {
        match self.find_mut(handle) {
            Some(interpolator) => {
                interpolator.force_finish(out);
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, handle: InterpolatorHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn active_count(&self) -> usize {
        self.interpolators.iter().filter(|i| i.active).count()
    }
}
