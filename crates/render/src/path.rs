//! CPU path rasterizer
//!
//! Replays every segment as a round-capped anti-aliased line. One instance
//! is shared by all overlays since it keeps no per-surface state.

use crate::error::RenderError;
use crate::renderer::{Backend, InkRenderer, RendererInfo};
use pdf_ink_core::{segment_pixel_width, surface_scale, InkSettings, Stroke};
use tiny_skia::{BlendMode, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Transform};

/// Stateless tiny-skia stroke renderer
#[derive(Debug, Default, Clone, Copy)]
pub struct PathRenderer;

impl PathRenderer {
    /// Create a new path renderer
    pub fn new() -> Self {
        Self
    }

    /// Draw `stroke` with an explicit velocity setting
    ///
    /// Used by the flatten export, which always thins fast strokes.
    pub fn draw_with_velocity(
        &self,
        target: &mut Pixmap,
        stroke: &Stroke,
        velocity_affects_size: bool,
    ) {
        let scale = surface_scale(stroke, target.width(), target.height());
        let (width, height) = (target.width() as f32, target.height() as f32);

        let mut paint = Paint::default();
        paint.anti_alias = true;
        if stroke.is_eraser() {
            paint.blend_mode = BlendMode::DestinationOut;
            paint.set_color_rgba8(0, 0, 0, 255);
        } else {
            let rgb = stroke.rgb();
            let alpha = (stroke.effective_opacity() * 255.0).round() as u8;
            paint.blend_mode = BlendMode::SourceOver;
            paint.set_color_rgba8(rgb.r, rgb.g, rgb.b, alpha);
        }

        for segment in stroke.segments() {
            let mut builder = PathBuilder::new();
            builder.move_to(segment.start.x * width, segment.start.y * height);
            builder.line_to(segment.end.x * width, segment.end.y * height);
            let Some(path) = builder.finish() else {
                continue;
            };

            let line = tiny_skia::Stroke {
                width: segment_pixel_width(stroke, &segment, velocity_affects_size, scale),
                line_cap: LineCap::Round,
                line_join: LineJoin::Round,
                ..Default::default()
            };
            target.stroke_path(&path, &paint, &line, Transform::identity(), None);
        }
    }
}

impl InkRenderer for PathRenderer {
    fn info(&self) -> RendererInfo {
        RendererInfo { backend: Backend::Path, detail: "tiny-skia".to_string() }
    }

    fn draw_stroke(
        &mut self,
        target: &mut Pixmap,
        stroke: &Stroke,
        settings: &InkSettings,
    ) -> Result<(), RenderError> {
        self.draw_with_velocity(target, stroke, settings.velocity_affects_size);
        Ok(())
    }
}
