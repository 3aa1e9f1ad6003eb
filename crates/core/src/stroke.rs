//! Stroke data model
//!
//! A stroke is one freehand gesture: an ordered run of points sharing the
//! same tool, device, color and size. Coordinates are normalized to the page
//! surface so strokes stay resolution and zoom independent.

use serde::{Deserialize, Serialize};

/// Tool that produced a stroke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Alpha-blended ink
    Pen,
    /// Subtractive stroke that clears ink underneath
    Eraser,
}

/// Input device kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Stylus
    Pen,
    /// Mouse or trackpad
    Mouse,
    /// Finger
    Touch,
}

impl DeviceKind {
    /// Whether this device is a stylus
    pub fn is_stylus(self) -> bool {
        matches!(self, DeviceKind::Pen)
    }
}

/// A single sampled point of a stroke
///
/// `x` and `y` are in `[0, 1]` relative to the page surface. The timestamp
/// is in milliseconds and only its differences matter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    #[serde(rename = "p")]
    pub pressure: f32,
    #[serde(rename = "t")]
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilt: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twist: Option<f32>,
}

impl Point {
    /// Create a new point without tilt or twist
    pub fn new(x: f32, y: f32, pressure: f32, timestamp: f64) -> Self {
        Self { x, y, pressure, timestamp, tilt: None, twist: None }
    }

    /// Attach a tilt magnitude and twist angle
    pub fn with_orientation(mut self, tilt: Option<f32>, twist: Option<f32>) -> Self {
        self.tilt = tilt;
        self.twist = twist;
        self
    }
}

/// Tilt magnitude in `[0, 1]` from the two stylus tilt angles in degrees
///
/// Returns `None` unless both angles were reported.
pub fn tilt_magnitude(tilt_x: Option<f32>, tilt_y: Option<f32>) -> Option<f32> {
    match (tilt_x, tilt_y) {
        (Some(tx), Some(ty)) => Some((tx.hypot(ty) / 90.0).min(1.0)),
        _ => None,
    }
}

/// Opaque RGB color parsed from a `#rrggbb` string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Create a new color
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (the leading `#` is optional)
    pub fn parse_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
        Some(Self { r: channel(0..2)?, g: channel(2..4)?, b: channel(4..6)? })
    }

    /// Parse a hex color, rendering unparsable input as black
    pub fn from_hex_or_black(hex: &str) -> Self {
        Self::parse_hex(hex).unwrap_or_default()
    }

    /// Format as lowercase `#rrggbb`
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

fn default_opacity() -> f32 {
    1.0
}

/// One freehand gesture
///
/// `ref_w`/`ref_h` record the surface pixel size at creation so the stroke
/// can be rescaled when the page is later drawn at another resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub tool: ToolKind,
    pub device: DeviceKind,
    pub color: String,
    /// Base size in device-independent units
    pub size: f32,
    #[serde(rename = "refW")]
    pub ref_w: f32,
    #[serde(rename = "refH")]
    pub ref_h: f32,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    pub points: Vec<Point>,
}

impl Stroke {
    /// Render color of this stroke
    pub fn rgb(&self) -> Rgb {
        Rgb::from_hex_or_black(&self.color)
    }

    /// Whether this stroke clears ink instead of depositing it
    pub fn is_eraser(&self) -> bool {
        self.tool == ToolKind::Eraser
    }

    /// Opacity used for compositing (erasers always clear fully)
    pub fn effective_opacity(&self) -> f32 {
        if self.is_eraser() {
            1.0
        } else {
            self.opacity.clamp(0.0, 1.0)
        }
    }

    /// Append a sampled point to a live stroke
    pub fn push_point(&mut self, point: Point) {
        self.points.push(point);
    }

    /// Number of line segments (one fewer than the point count)
    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// Iterate all segments in order
    pub fn segments(&self) -> Segments<'_> {
        self.segments_from(0)
    }

    /// Iterate segments starting at `first`
    ///
    /// Segment `k` joins point `k` and point `k + 1`.
    pub fn segments_from(&self, first: usize) -> Segments<'_> {
        Segments { points: &self.points, next: first }
    }
}

/// A line segment between two consecutive points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Segment index within the stroke
    pub index: usize,
    /// Start point
    pub start: Point,
    /// End point
    pub end: Point,
    /// Mean pressure of both endpoints
    pub pressure: f32,
    /// Speed in normalized units per second
    pub speed: f32,
}

impl Segment {
    fn between(index: usize, start: Point, end: Point) -> Self {
        let dt_ms = (end.timestamp - start.timestamp).max(1.0);
        let distance = (end.x - start.x).hypot(end.y - start.y);
        let speed = (f64::from(distance) / (dt_ms / 1000.0)) as f32;
        let pressure = (start.pressure + end.pressure) * 0.5;
        Self { index, start, end, pressure, speed }
    }
}

/// Iterator over stroke segments
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    points: &'a [Point],
    next: usize,
}

impl Iterator for Segments<'_> {
    type Item = Segment;

    fn next(&mut self) -> Option<Self::Item> {
        let start = *self.points.get(self.next)?;
        let end = *self.points.get(self.next + 1)?;
        let segment = Segment::between(self.next, start, end);
        self.next += 1;
        Some(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stroke() -> Stroke {
        Stroke {
            tool: ToolKind::Pen,
            device: DeviceKind::Mouse,
            color: "#ff2d55".to_string(),
            size: 3.0,
            ref_w: 200.0,
            ref_h: 100.0,
            opacity: 1.0,
            points: vec![
                Point::new(0.1, 0.1, 0.5, 0.0),
                Point::new(0.4, 0.5, 0.7, 100.0),
                Point::new(0.4, 0.5, 0.7, 100.0),
            ],
        }
    }

    #[test]
    fn test_rgb_parse() {
        assert_eq!(Rgb::parse_hex("#ff2d55"), Some(Rgb::new(255, 45, 85)));
        assert_eq!(Rgb::parse_hex("00FF00"), Some(Rgb::new(0, 255, 0)));
        assert_eq!(Rgb::parse_hex("#fff"), None);
        assert_eq!(Rgb::parse_hex("#zzzzzz"), None);
        assert_eq!(Rgb::from_hex_or_black("red"), Rgb::new(0, 0, 0));
        assert_eq!(Rgb::new(1, 171, 255).to_hex(), "#01abff");
    }

    #[test]
    fn test_segment_speed_and_pressure() {
        let stroke = sample_stroke();
        let segments: Vec<_> = stroke.segments().collect();
        assert_eq!(segments.len(), 2);

        // 0.5 units over 100 ms
        assert!((segments[0].speed - 5.0).abs() < 1e-4);
        assert!((segments[0].pressure - 0.6).abs() < 1e-6);

        // Equal timestamps clamp to 1 ms, zero distance gives zero speed
        assert_eq!(segments[1].speed, 0.0);
        assert_eq!(segments[1].index, 1);
    }

    #[test]
    fn test_segments_from_offset() {
        let stroke = sample_stroke();
        assert_eq!(stroke.segments_from(1).count(), 1);
        assert_eq!(stroke.segments_from(5).count(), 0);
        assert_eq!(stroke.segment_count(), 2);
    }

    #[test]
    fn test_tilt_magnitude() {
        assert_eq!(tilt_magnitude(None, Some(10.0)), None);
        let tilt = tilt_magnitude(Some(30.0), Some(40.0)).expect("tilt should be present");
        assert!((tilt - 50.0 / 90.0).abs() < 1e-6);
        assert_eq!(tilt_magnitude(Some(90.0), Some(90.0)), Some(1.0));
    }

    #[test]
    fn test_stroke_wire_format() {
        let json = r##"{"tool":"eraser","device":"pen","color":"#000000","size":4,
            "refW":100,"refH":50,"points":[{"x":0.5,"y":0.25,"p":1,"t":12.5,"tilt":0.2}]}"##;
        let stroke: Stroke = serde_json::from_str(json).expect("stroke should parse");

        assert!(stroke.is_eraser());
        assert_eq!(stroke.device, DeviceKind::Pen);
        assert_eq!(stroke.opacity, 1.0);
        assert_eq!(stroke.points[0].tilt, Some(0.2));
        assert_eq!(stroke.points[0].twist, None);

        let value = serde_json::to_value(&stroke).expect("stroke should serialize");
        assert_eq!(value["refW"], 100.0);
        assert!(value["points"][0].get("twist").is_none());
    }
}
