//! Normalized input events
//!
//! The host adapter translates platform pointer and touch events into these
//! structs; everything downstream is a pure state machine over them.
//! Timestamps are milliseconds on the host's monotonic clock.

use pdf_ink_core::{tilt_magnitude, DeviceKind, Point};

/// Pressure reported by devices without pressure sensing
pub const DEFAULT_PRESSURE: f32 = 0.5;

/// Global interaction mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InteractionMode {
    /// Pointer input draws on the overlay
    #[default]
    Draw,
    /// Pointer input falls through to the viewer for scrolling and zoom
    Pan,
}

impl InteractionMode {
    /// Whether the overlay surface receives pointer events
    pub fn accepts_pointer(self) -> bool {
        self == InteractionMode::Draw
    }

    /// CSS `touch-action` the surface should carry
    pub fn touch_action(self) -> &'static str {
        match self {
            InteractionMode::Draw => "none",
            InteractionMode::Pan => "pan-x pan-y pinch-zoom",
        }
    }
}

/// Whether the host should stop default handling of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// Not a drawing gesture; let the viewer handle it
    Ignored,
    /// Consumed; prevent default and stop propagation
    Handled,
}

impl EventDisposition {
    pub fn is_handled(self) -> bool {
        self == EventDisposition::Handled
    }
}

/// Axis-aligned rectangle in client (viewport CSS pixel) coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClientRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ClientRect {
    /// Create a new rectangle
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self { left, top, width, height }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Map a client position into `[0, 1]` surface coordinates
    ///
    /// Positions outside the rectangle map outside the unit range. A
    /// degenerate rectangle maps everything to the origin.
    pub fn normalize(&self, client_x: f32, client_y: f32) -> (f32, f32) {
        let axis = |value: f32, origin: f32, extent: f32| {
            if extent > 0.0 {
                (value - origin) / extent
            } else {
                0.0
            }
        };
        (axis(client_x, self.left, self.width), axis(client_y, self.top, self.height))
    }

    /// Area of the part of this rectangle inside a `width` x `height` viewport
    pub fn visible_area(&self, viewport_width: f32, viewport_height: f32) -> f32 {
        let x = (self.right().min(viewport_width) - self.left.max(0.0)).max(0.0);
        let y = (self.bottom().min(viewport_height) - self.top.max(0.0)).max(0.0);
        x * y
    }
}

/// One position sample of a pointer
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerSample {
    pub client_x: f32,
    pub client_y: f32,
    /// Normalized pressure, if the device reports one
    pub pressure: Option<f32>,
    /// Stylus tilt in degrees
    pub tilt_x: Option<f32>,
    pub tilt_y: Option<f32>,
    /// Stylus rotation in degrees
    pub twist: Option<f32>,
}

impl PointerSample {
    /// Create a new sample without pressure or orientation
    pub fn at(client_x: f32, client_y: f32) -> Self {
        Self { client_x, client_y, ..Self::default() }
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = Some(pressure);
        self
    }

    /// Build a stroke point normalized against `surface`
    pub fn to_point(&self, surface: &ClientRect, timestamp: f64) -> Point {
        let (x, y) = surface.normalize(self.client_x, self.client_y);
        Point::new(x, y, self.pressure.unwrap_or(DEFAULT_PRESSURE), timestamp)
            .with_orientation(tilt_magnitude(self.tilt_x, self.tilt_y), self.twist)
    }
}

/// A pointer down, move, up or cancel event
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub pointer_id: i32,
    pub device: DeviceKind,
    pub is_primary: bool,
    /// Event time in milliseconds
    pub timestamp: f64,
    /// Position at dispatch time
    pub sample: PointerSample,
    /// Samples the platform merged into this event, oldest first
    pub coalesced: Vec<PointerSample>,
}

impl PointerEvent {
    /// Create a new primary event with a single sample
    pub fn new(pointer_id: i32, device: DeviceKind, timestamp: f64, sample: PointerSample) -> Self {
        Self { pointer_id, device, is_primary: true, timestamp, sample, coalesced: Vec::new() }
    }

    pub fn with_coalesced(mut self, samples: Vec<PointerSample>) -> Self {
        self.coalesced = samples;
        self
    }

    /// Samples to consume in order: the coalesced list, or the event itself
    pub fn samples(&self) -> &[PointerSample] {
        if self.coalesced.is_empty() {
            std::slice::from_ref(&self.sample)
        } else {
            &self.coalesced
        }
    }
}

/// Touch event phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

/// One touch contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub id: i32,
    pub client_x: f32,
    pub client_y: f32,
}

impl TouchPoint {
    /// Create a new contact
    pub fn new(id: i32, client_x: f32, client_y: f32) -> Self {
        Self { id, client_x, client_y }
    }
}

/// A raw multi-touch event
#[derive(Debug, Clone, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    /// Event time in milliseconds
    pub timestamp: f64,
    /// Contacts still down after this event
    pub touches: Vec<TouchPoint>,
}

impl TouchEvent {
    /// Create a new touch event
    pub fn new(phase: TouchPhase, timestamp: f64, touches: Vec<TouchPoint>) -> Self {
        Self { phase, timestamp, touches }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_against_rect() {
        let rect = ClientRect::new(100.0, 50.0, 200.0, 400.0);
        assert_eq!(rect.normalize(200.0, 250.0), (0.5, 0.5));
        assert_eq!(rect.normalize(100.0, 50.0), (0.0, 0.0));
        assert_eq!(ClientRect::default().normalize(10.0, 10.0), (0.0, 0.0));
    }

    #[test]
    fn test_visible_area_clips_to_viewport() {
        let rect = ClientRect::new(-50.0, 700.0, 200.0, 200.0);
        assert_eq!(rect.visible_area(800.0, 800.0), 150.0 * 100.0);
        assert_eq!(ClientRect::new(0.0, 900.0, 10.0, 10.0).visible_area(800.0, 800.0), 0.0);
    }

    #[test]
    fn test_samples_prefer_coalesced() {
        let event = PointerEvent::new(1, DeviceKind::Pen, 10.0, PointerSample::at(5.0, 5.0));
        assert_eq!(event.samples().len(), 1);

        let event =
            event.with_coalesced(vec![PointerSample::at(1.0, 1.0), PointerSample::at(2.0, 2.0)]);
        assert_eq!(event.samples().len(), 2);
        assert_eq!(event.samples()[0].client_x, 1.0);
    }

    #[test]
    fn test_sample_to_point() {
        let rect = ClientRect::new(0.0, 0.0, 100.0, 100.0);
        let mut sample = PointerSample::at(25.0, 75.0);
        let point = sample.to_point(&rect, 3.0);
        assert_eq!((point.x, point.y, point.pressure), (0.25, 0.75, DEFAULT_PRESSURE));
        assert_eq!(point.tilt, None);

        sample.tilt_x = Some(30.0);
        sample.tilt_y = Some(40.0);
        sample.pressure = Some(0.8);
        let point = sample.to_point(&rect, 4.0);
        assert_eq!(point.pressure, 0.8);
        let tilt = point.tilt.expect("both tilt angles should yield a magnitude");
        assert!((tilt - 50.0 / 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_mode_surface_properties() {
        assert!(InteractionMode::Draw.accepts_pointer());
        assert!(!InteractionMode::Pan.accepts_pointer());
        assert_eq!(InteractionMode::Draw.touch_action(), "none");
    }
}
