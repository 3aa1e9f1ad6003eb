//! Debounce timer
//!
//! Each trigger restarts the quiet period; work runs only once the period
//! elapses without another trigger. Time is passed in by the caller so the
//! timer works with any clock, including a simulated one in tests.

use std::time::{Duration, Instant};

/// Restartable one-shot timer
#[derive(Debug, Clone)]
pub struct Debouncer {
    /// Quiet period
    delay: Duration,

    /// When the pending work becomes due
    deadline: Option<Instant>,

    /// Triggers since the last fire
    triggers: u32,
}

impl Debouncer {
    /// Create a new idle debouncer
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None, triggers: 0 }
    }

    /// Restart the quiet period at `now`
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
        self.triggers += 1;
    }

    /// Whether work is waiting
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Whether the quiet period has elapsed
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Clear the timer and return `true` if it was due at `now`
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.reset();
        true
    }

    /// Clear the timer immediately, returning whether work was pending
    pub fn flush(&mut self) -> bool {
        let pending = self.is_pending();
        self.reset();
        pending
    }

    /// Drop pending work
    pub fn cancel(&mut self) {
        self.reset();
    }

    /// When the pending work becomes due
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Triggers collapsed into the pending run
    pub fn triggers(&self) -> u32 {
        self.triggers
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn reset(&mut self) {
        self.deadline = None;
        self.triggers = 0;
    }
}
