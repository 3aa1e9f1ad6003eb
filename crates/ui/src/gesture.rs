//! Two-finger double-tap recognizer
//!
//! A tap attempt starts when exactly two contacts are down. It ends when
//! fewer than two remain, and it counts as a tap if the contact centroid
//! stayed within `max_move_px` and the attempt took at most `max_tap_ms`.
//! A second tap within `max_inter_tap_ms` of the first fires.

use crate::input::{TouchEvent, TouchPhase, TouchPoint};

/// Recognizer thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoubleTapConfig {
    /// Longest duration of a single tap in milliseconds
    pub max_tap_ms: f64,

    /// Longest gap between the two taps in milliseconds
    pub max_inter_tap_ms: f64,

    /// Largest centroid displacement during a tap in CSS pixels
    pub max_move_px: f32,
}

impl Default for DoubleTapConfig {
    fn default() -> Self {
        Self { max_tap_ms: 250.0, max_inter_tap_ms: 300.0, max_move_px: 18.0 }
    }
}

/// Result of feeding one touch event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// Nothing recognized
    None,
    /// A valid first tap; waiting for the second
    FirstTap,
    /// Double tap recognized
    DoubleTap,
}

impl TapOutcome {
    /// Whether the triggering event's default handling must be suppressed
    pub fn suppresses_default(self) -> bool {
        self == TapOutcome::DoubleTap
    }
}

#[derive(Debug, Clone, Copy)]
struct TapAttempt {
    started_at: f64,
    start_centroid: (f32, f32),
    moved: bool,
}

/// Stateful two-finger double-tap detector
#[derive(Debug, Clone, Default)]
pub struct TwoFingerDoubleTap {
    config: DoubleTapConfig,
    attempt: Option<TapAttempt>,
    last_tap_at: Option<f64>,
}

impl TwoFingerDoubleTap {
    /// Create a new recognizer
    pub fn new(config: DoubleTapConfig) -> Self {
        Self { config, attempt: None, last_tap_at: None }
    }

    pub fn config(&self) -> &DoubleTapConfig {
        &self.config
    }

    /// Whether a two-finger tap attempt is in progress
    pub fn is_tracking(&self) -> bool {
        self.attempt.is_some()
    }

    /// Feed one touch event
    pub fn on_touch(&mut self, event: &TouchEvent) -> TapOutcome {
        match event.phase {
            TouchPhase::Start => {
                self.on_start(event);
                TapOutcome::None
            }
            TouchPhase::Move => {
                self.on_move(event);
                TapOutcome::None
            }
            TouchPhase::End => self.on_end(event),
            TouchPhase::Cancel => {
                self.attempt = None;
                TapOutcome::None
            }
        }
    }

    /// Forget any attempt and the remembered first tap
    pub fn reset(&mut self) {
        self.attempt = None;
        self.last_tap_at = None;
    }

    fn on_start(&mut self, event: &TouchEvent) {
        match centroid(&event.touches) {
            Some(start_centroid) if self.attempt.is_none() => {
                self.attempt =
                    Some(TapAttempt { started_at: event.timestamp, start_centroid, moved: false });
            }
            Some(_) => {}
            None => self.attempt = None,
        }
    }

    fn on_move(&mut self, event: &TouchEvent) {
        let (Some(attempt), Some((x, y))) = (self.attempt.as_mut(), centroid(&event.touches)) else {
            return;
        };
        let (dx, dy) = (x - attempt.start_centroid.0, y - attempt.start_centroid.1);
        if dx * dx + dy * dy > self.config.max_move_px * self.config.max_move_px {
            attempt.moved = true;
        }
    }

    fn on_end(&mut self, event: &TouchEvent) -> TapOutcome {
        let Some(attempt) = self.attempt else {
            return TapOutcome::None;
        };
        if event.touches.len() >= 2 {
            return TapOutcome::None;
        }
        self.attempt = None;

        let duration = event.timestamp - attempt.started_at;
        if attempt.moved || duration > self.config.max_tap_ms {
            return TapOutcome::None;
        }

        match self.last_tap_at {
            Some(previous) if event.timestamp - previous <= self.config.max_inter_tap_ms => {
                self.last_tap_at = None;
                log::debug!("two-finger double tap recognized");
                TapOutcome::DoubleTap
            }
            _ => {
                self.last_tap_at = Some(event.timestamp);
                TapOutcome::FirstTap
            }
        }
    }
}

/// Midpoint of the first two contacts when exactly two are down
fn centroid(touches: &[TouchPoint]) -> Option<(f32, f32)> {
    match touches {
        [a, b] => Some(((a.client_x + b.client_x) * 0.5, (a.client_y + b.client_y) * 0.5)),
        _ => None,
    }
}
