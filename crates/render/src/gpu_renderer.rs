//! GPU mesh rasterizer
//!
//! One instance per overlay. The renderer owns a [`GpuContext`] target and
//! supports tail rendering: the committed base is replayed once per gesture
//! and each frame appends only the new segments of the live stroke.

use crate::error::RenderError;
use crate::gpu::{BlendMode, GpuContext};
use crate::mesh::stroke_triangles;
use crate::renderer::{allocate_pixmap, Backend, IncrementalRenderer, InkRenderer, RendererInfo};
use pdf_ink_core::{InkSettings, Stroke};
use tiny_skia::Pixmap;

/// Triangle-mesh renderer over a GPU context
pub struct GpuRenderer {
    context: Box<dyn GpuContext>,
    presented: Pixmap,
}

impl GpuRenderer {
    /// Create a new renderer around `context`
    pub fn new(context: Box<dyn GpuContext>) -> Result<Self, RenderError> {
        let (width, height) = context.size();
        Ok(Self { context, presented: allocate_pixmap(width, height)? })
    }

    fn queue_stroke(&mut self, stroke: &Stroke, from_segment: usize, settings: &InkSettings) {
        let (width, height) = self.context.size();
        let positions =
            stroke_triangles(stroke, from_segment, width, height, settings.velocity_affects_size);
        if positions.is_empty() {
            return;
        }

        let rgb = stroke.rgb();
        let color = [
            f32::from(rgb.r) / 255.0,
            f32::from(rgb.g) / 255.0,
            f32::from(rgb.b) / 255.0,
            stroke.effective_opacity(),
        ];
        let blend = if stroke.is_eraser() { BlendMode::Erase } else { BlendMode::Ink };
        self.context.draw_triangles(&positions, color, blend);
    }

    fn match_target(&mut self, target: &Pixmap) -> Result<(), RenderError> {
        self.resize(target.width(), target.height())?;
        Ok(())
    }
}

impl InkRenderer for GpuRenderer {
    fn info(&self) -> RendererInfo {
        RendererInfo { backend: Backend::Gpu, detail: self.context.describe() }
    }

    fn draw_stroke(
        &mut self,
        target: &mut Pixmap,
        stroke: &Stroke,
        settings: &InkSettings,
    ) -> Result<(), RenderError> {
        self.match_target(target)?;
        self.context.upload(target)?;
        self.queue_stroke(stroke, 0, settings);
        self.context.read_pixels(target)?;
        Ok(())
    }

    fn redraw_page(
        &mut self,
        target: &mut Pixmap,
        strokes: &[Stroke],
        settings: &InkSettings,
    ) -> Result<(), RenderError> {
        self.match_target(target)?;
        self.redraw_surface(strokes, settings)?;
        self.context.read_pixels(target)?;
        Ok(())
    }

    fn incremental(&mut self) -> Option<&mut dyn IncrementalRenderer> {
        Some(self)
    }
}

impl IncrementalRenderer for GpuRenderer {
    fn resize(&mut self, width: u32, height: u32) -> Result<bool, RenderError> {
        let (width, height) = (width.max(1), height.max(1));
        if self.context.size() == (width, height) {
            return Ok(false);
        }

        self.context.resize(width, height)?;
        self.presented = allocate_pixmap(width, height)?;
        log::debug!("gpu surface resized to {width}x{height}");
        Ok(true)
    }

    fn size(&self) -> (u32, u32) {
        self.context.size()
    }

    fn redraw_surface(
        &mut self,
        strokes: &[Stroke],
        settings: &InkSettings,
    ) -> Result<(), RenderError> {
        self.context.clear();
        for stroke in strokes {
            self.queue_stroke(stroke, 0, settings);
        }
        Ok(())
    }

    fn draw_tail(
        &mut self,
        stroke: &Stroke,
        from_segment: usize,
        settings: &InkSettings,
    ) -> Result<(), RenderError> {
        self.queue_stroke(stroke, from_segment, settings);
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.context.flush()?;
        self.context.read_pixels(&mut self.presented)?;
        Ok(())
    }

    fn surface(&self) -> &Pixmap {
        &self.presented
    }
}
