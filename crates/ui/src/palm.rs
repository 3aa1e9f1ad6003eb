//! Palm rejection
//!
//! While a stylus touches any overlay, and for a short grace period after it
//! lifts, touch input is suppressed everywhere so a resting palm cannot draw
//! or trigger gestures. One instance is shared by all overlays.

use std::cell::Cell;

/// Grace period after the last stylus contact ends, in milliseconds
pub const PALM_GRACE_MS: f64 = 20.0;

/// Shared stylus-contact tracker
#[derive(Debug)]
pub struct PalmRejection {
    /// Stylus contacts currently down
    contacts: Cell<u32>,

    /// Touch stays suppressed until this time
    suppressed_until: Cell<f64>,

    grace_ms: f64,
}

impl Default for PalmRejection {
    fn default() -> Self {
        Self::new(PALM_GRACE_MS)
    }
}

impl PalmRejection {
    /// Create a new tracker with a custom grace period
    pub fn new(grace_ms: f64) -> Self {
        Self { contacts: Cell::new(0), suppressed_until: Cell::new(f64::NEG_INFINITY), grace_ms }
    }

    /// A stylus touched down
    pub fn contact_began(&self) {
        self.contacts.set(self.contacts.get() + 1);
    }

    /// A stylus lifted or was cancelled at `now`
    pub fn contact_ended(&self, now: f64) {
        self.contacts.set(self.contacts.get().saturating_sub(1));
        self.suppressed_until.set(self.suppressed_until.get().max(now + self.grace_ms));
    }

    /// Whether a stylus is touching right now
    pub fn in_contact(&self) -> bool {
        self.contacts.get() > 0
    }

    /// Whether touch input at `now` must be ignored
    pub fn suppresses_touch(&self, now: f64) -> bool {
        self.in_contact() || now < self.suppressed_until.get()
    }

    /// Forget every contact
    pub fn reset(&self) {
        self.contacts.set(0);
        self.suppressed_until.set(f64::NEG_INFINITY);
    }
}
