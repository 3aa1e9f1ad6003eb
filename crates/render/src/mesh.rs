//! Triangle mesh for the GPU rasterizer
//!
//! Each segment becomes one quad of the segment's pixel width laid along the
//! segment normal. Quads carry no miters and no round caps.

use pdf_ink_core::{segment_pixel_width, surface_scale, Stroke};

/// Vertices per segment quad (two triangles)
pub const VERTICES_PER_SEGMENT: usize = 6;

/// Build triangles for segments `from_segment..` of `stroke`
///
/// Positions are in pixels of a `width` x `height` surface. Degenerate
/// zero-length segments emit nothing.
pub fn stroke_triangles(
    stroke: &Stroke,
    from_segment: usize,
    width: u32,
    height: u32,
    velocity_affects_size: bool,
) -> Vec<[f32; 2]> {
    let scale = surface_scale(stroke, width, height);
    let (w, h) = (width as f32, height as f32);
    let remaining = stroke.segment_count().saturating_sub(from_segment);
    let mut positions = Vec::with_capacity(remaining * VERTICES_PER_SEGMENT);

    for segment in stroke.segments_from(from_segment) {
        let (x0, y0) = (segment.start.x * w, segment.start.y * h);
        let (x1, y1) = (segment.end.x * w, segment.end.y * h);

        let (nx, ny) = (y1 - y0, -(x1 - x0));
        let length = nx.hypot(ny);
        if length <= f32::EPSILON {
            continue;
        }

        let half = segment_pixel_width(stroke, &segment, velocity_affects_size, scale) * 0.5;
        let (ox, oy) = (nx / length * half, ny / length * half);

        let a = [x0 + ox, y0 + oy];
        let b = [x1 + ox, y1 + oy];
        let c = [x1 - ox, y1 - oy];
        let d = [x0 - ox, y0 - oy];
        positions.extend_from_slice(&[a, b, c, c, d, a]);
    }

    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_ink_core::{DeviceKind, Point, ToolKind};

    fn stroke(points: Vec<Point>) -> Stroke {
        Stroke {
            tool: ToolKind::Pen,
            device: DeviceKind::Mouse,
            color: "#000000".to_string(),
            size: 10.0,
            ref_w: 100.0,
            ref_h: 100.0,
            opacity: 1.0,
            points,
        }
    }

    #[test]
    fn test_quad_geometry() {
        let stroke = stroke(vec![Point::new(0.0, 0.5, 0.0, 0.0), Point::new(1.0, 0.5, 0.0, 10.0)]);
        let positions = stroke_triangles(&stroke, 0, 100, 100, false);
        assert_eq!(positions.len(), VERTICES_PER_SEGMENT);

        // Width 5 at pressure 0, half width 2.5 on either side of y = 50
        let ys: Vec<f32> = positions.iter().map(|p| p[1]).collect();
        let min = ys.iter().copied().fold(f32::MAX, f32::min);
        let max = ys.iter().copied().fold(f32::MIN, f32::max);
        assert!((min - 47.5).abs() < 1e-4);
        assert!((max - 52.5).abs() < 1e-4);
    }

    #[test]
    fn test_tail_range_and_degenerate_segments() {
        let stroke = stroke(vec![
            Point::new(0.1, 0.1, 0.5, 0.0),
            Point::new(0.1, 0.1, 0.5, 5.0),
            Point::new(0.3, 0.1, 0.5, 10.0),
            Point::new(0.5, 0.2, 0.5, 15.0),
        ]);

        assert_eq!(stroke_triangles(&stroke, 0, 100, 100, true).len(), 2 * VERTICES_PER_SEGMENT);
        assert_eq!(stroke_triangles(&stroke, 2, 100, 100, true).len(), VERTICES_PER_SEGMENT);
        assert!(stroke_triangles(&stroke, 3, 100, 100, true).is_empty());

        let full = stroke_triangles(&stroke, 0, 100, 100, true);
        let tail = stroke_triangles(&stroke, 2, 100, 100, true);
        assert_eq!(&full[VERTICES_PER_SEGMENT..], tail.as_slice());
    }
}
