//! Renderer capability interface
//!
//! Every renderer can draw a stroke onto a caller-owned pixmap and replay a
//! page. Renderers that keep their own surface additionally expose
//! [`IncrementalRenderer`] through [`InkRenderer::incremental`]; callers must
//! query for it rather than assume it.

use crate::error::RenderError;
use pdf_ink_core::{InkSettings, Stroke};
use std::cell::RefCell;
use std::rc::Rc;
use tiny_skia::{Color, Pixmap};

/// Rasterizer family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Immediate-mode CPU path rasterizer
    Path,
    /// Triangle-mesh GPU rasterizer
    Gpu,
}

/// Static description of a renderer instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererInfo {
    pub backend: Backend,
    /// Human readable backend detail (adapter name, "software", ...)
    pub detail: String,
}

/// Shared handle threaded to overlays
pub type RendererHandle = Rc<RefCell<dyn InkRenderer>>;

/// Required rendering operations
pub trait InkRenderer {
    fn info(&self) -> RendererInfo;

    /// Draw one stroke on top of the existing contents of `target`
    fn draw_stroke(
        &mut self,
        target: &mut Pixmap,
        stroke: &Stroke,
        settings: &InkSettings,
    ) -> Result<(), RenderError>;

    /// Clear `target` and replay `strokes` in insertion order
    fn redraw_page(
        &mut self,
        target: &mut Pixmap,
        strokes: &[Stroke],
        settings: &InkSettings,
    ) -> Result<(), RenderError> {
        target.fill(Color::TRANSPARENT);
        for stroke in strokes {
            self.draw_stroke(target, stroke, settings)?;
        }
        Ok(())
    }

    /// Tail-rendering capability, if this renderer owns its surface
    fn incremental(&mut self) -> Option<&mut dyn IncrementalRenderer> {
        None
    }
}

/// Optional operations of renderers that own a drawing surface
///
/// Draws accumulate on the owned surface and become visible on
/// [`present`](IncrementalRenderer::present).
pub trait IncrementalRenderer {
    /// Reallocate the surface if the size changed
    ///
    /// Returns `true` when it did; prior contents are then invalid and a
    /// full redraw must follow.
    fn resize(&mut self, width: u32, height: u32) -> Result<bool, RenderError>;

    fn size(&self) -> (u32, u32);

    /// Clear the owned surface and replay `strokes`
    fn redraw_surface(&mut self, strokes: &[Stroke], settings: &InkSettings)
        -> Result<(), RenderError>;

    /// Append segments `from_segment..` of `stroke` without clearing
    fn draw_tail(
        &mut self,
        stroke: &Stroke,
        from_segment: usize,
        settings: &InkSettings,
    ) -> Result<(), RenderError>;

    /// Make every queued draw visible now
    fn present(&mut self) -> Result<(), RenderError>;

    /// Last presented raster
    fn surface(&self) -> &Pixmap;
}

/// Allocate a transparent pixmap, clamping each side to at least one pixel
pub fn allocate_pixmap(width: u32, height: u32) -> Result<Pixmap, RenderError> {
    let (width, height) = (width.max(1), height.max(1));
    Pixmap::new(width, height).ok_or(RenderError::SurfaceAllocation { width, height })
}
