//! Pooled one-shot and repeating timers
//!
//! A timer carries a message instead of a callback. When it ticks, the message
//! is pushed into the inbox the caller passed to [`TimerCollection::update`].

use serde::{Deserialize, Serialize};

use super::pool::Pool;
use crate::ScheduleError;

/// Identifies one timer for its whole life; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(pub u64);

#[derive(Debug, Clone)]
pub struct Timer<E> {
    handle: TimerHandle,
    active: bool,
    /// Time accumulated toward the next tick
    pub time: f32,
    pub tick_length: f32,
    repeats: bool,
    message: Option<E>,
}

impl<E> Default for Timer<E> {
    fn default() -> Self {
        Self {
            handle: TimerHandle(0),
            active: false,
            time: 0.0,
            tick_length: 0.0,
            repeats: false,
            message: None,
        }
    }
}

impl<E: Clone> Timer<E> {
    fn reset(&mut self, handle: TimerHandle, tick_length: f32, repeats: bool, message: E) {
        self.handle = handle;
        self.active = true;
        self.time = 0.0;
        self.tick_length = tick_length;
        self.repeats = repeats;
        self.message = Some(message);
    }

    pub fn handle(&self) -> TimerHandle {
        self.handle
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn repeats(&self) -> bool {
        self.repeats
    }

    pub fn message(&self) -> Option<&E> {
        self.message.as_ref()
    }

    /// Deactivate without firing
    pub fn stop(&mut self) {
        self.active = false;
        self.message = None;
    }

    /// Fire now; the timer stays active only if it repeats.
    pub fn force_tick(&mut self, inbox: &mut Vec<E>) {
        if !self.active {
            return;
        }
        self.fire(inbox);
        self.time = 0.0;
    }

    /// Accumulate `dt`; at most one tick per update, remainder carried over.
    pub fn update(&mut self, dt: f32, inbox: &mut Vec<E>) {
        // Stopped mid-pass, waiting for clean up
        if !self.active {
            return;
        }
        self.time += dt;
        if self.time >= self.tick_length {
            self.fire(inbox);
            self.time -= self.tick_length;
        }
    }

    fn fire(&mut self, inbox: &mut Vec<E>) {
        if self.repeats {
            if let Some(message) = &self.message {
                inbox.push(message.clone());
            }
        } else {
            self.active = false;
            if let Some(message) = self.message.take() {
                inbox.push(message);
            }
        }
    }
}

/// Every timer of one owner, drawn from a pool.
#[derive(Debug)]
pub struct TimerCollection<E> {
    timers: Pool<Timer<E>>,
    next_serial: u64,
}

impl<E: Clone + 'static> TimerCollection<E> {
    pub fn new(capacity: usize, growth: usize) -> Result<Self, ScheduleError> {
        let mut timers = Pool::with_default(capacity, growth, |t: &Timer<E>| t.active)?;
        timers.set_on_deinitialize(|t| t.message = None);
        Ok(Self {
            timers,
            next_serial: 1,
        })
    }

    /// Schedule `message` to be delivered after `tick_length` seconds.
    pub fn create(
        &mut self,
        tick_length: f32,
        repeats: bool,
        message: E,
    ) -> Result<TimerHandle, ScheduleError> {
        if tick_length.is_nan() || tick_length <= 0.0 {
            return Err(ScheduleError::NonPositiveDuration(tick_length));
        }
        let handle = TimerHandle(self.next_serial);
        self.next_serial += 1;
        self.timers.spawn().reset(handle, tick_length, repeats, message);
        Ok(handle)
    }

    /// Advance every live timer, then retire the finished ones.
    pub fn update(&mut self, dt: f32, inbox: &mut Vec<E>) {
        for timer in self.timers.iter_mut() {
            timer.update(dt, inbox);
        }
        self.timers.clean_up();
    }

    fn find_mut(&mut self, handle: TimerHandle) -> Option<&mut Timer<E>> {
        self.timers
            .iter_mut()
            .find(|t| t.active && t.handle == handle)
    }

    /// Stop a timer; false if it already finished or was stopped.
    pub fn stop(&mut self, handle: TimerHandle) -> bool {
        match self.find_mut(handle) {
            Some(timer) => {
                timer.stop();
                true
            }
            None => false,
        }
    }

    /// Deliver a timer's message now; false if it is no longer active.
    pub fn force_tick(&mut self, handle: TimerHandle, inbox: &mut Vec<E>) -> bool {
        match self.find_mut(handle) {
            Some(timer) => {
                timer.force_tick(inbox);
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.timers.iter().any(|t| t.active && t.handle == handle)
    }

    pub fn active_count(&self) -> usize {
        self.timers.iter().filter(|t| t.active).count()
    }

    /// Stop every timer
    pub fn clear(&mut self) {
        for timer in self.timers.iter_mut() {
            timer.stop();
        }
        self.timers.clean_up();
    }
}
