//! Dynamic stroke width
//!
//! Width is evaluated per segment because speed varies along a gesture.

use crate::stroke::{DeviceKind, Segment, Stroke};

/// Smallest width any segment renders at
pub const MIN_WIDTH: f32 = 0.75;

/// Stylus strokes read heavier than mouse or touch strokes
const STYLUS_MULTIPLIER: f32 = 2.0;

/// Velocity thinning coefficient
const VELOCITY_FACTOR: f32 = 0.6;

/// Eraser segments never get thinner than this multiple of the base size
pub const ERASER_SIZE_FLOOR: f32 = 1.2;

/// Instantaneous stroke width from pressure, speed and device
///
/// Non-finite pressure counts as 0.5. The result is never below
/// [`MIN_WIDTH`].
pub fn stroke_width(
    pressure: f32,
    speed: f32,
    base: f32,
    velocity_affects_size: bool,
    device: DeviceKind,
) -> f32 {
    let pressure = if pressure.is_finite() { pressure } else { 0.5 }.clamp(0.0, 1.0);
    let mut width = base * (0.5 + pressure * 0.8);

    if device.is_stylus() {
        width = (width * STYLUS_MULTIPLIER).max(base);
    }

    if velocity_affects_size {
        width *= 1.0 / (1.0 + speed * VELOCITY_FACTOR);
    }

    width.max(MIN_WIDTH)
}

/// Ratio between the target surface and the stroke's reference surface
///
/// A zero reference dimension counts as ratio 1.
pub fn surface_scale(stroke: &Stroke, width: u32, height: u32) -> f32 {
    let ratio = |target: u32, reference: f32| {
        if reference > 0.0 {
            target as f32 / reference
        } else {
            1.0
        }
    };
    (ratio(width, stroke.ref_w) + ratio(height, stroke.ref_h)) * 0.5
}

/// Pixel width of one segment when rasterized at `scale`
///
/// Both rendering backends and the flatten export go through this so they
/// agree on geometry.
pub fn segment_pixel_width(
    stroke: &Stroke,
    segment: &Segment,
    velocity_affects_size: bool,
    scale: f32,
) -> f32 {
    let width = stroke_width(
        segment.pressure,
        segment.speed,
        stroke.size,
        velocity_affects_size,
        stroke.device,
    );

    if stroke.is_eraser() {
        width.max(stroke.size * ERASER_SIZE_FLOOR) * scale
    } else {
        width.max(MIN_WIDTH) * scale
    }
}
