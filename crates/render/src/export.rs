//! Flatten-to-image export
//!
//! Bakes a page's strokes into a static raster. This is a one-shot batch
//! pass over the path rasterizer and is not part of the live loop.

use crate::error::RenderError;
use crate::path::PathRenderer;
use crate::renderer::allocate_pixmap;
use image::{ImageFormat, Rgba, RgbaImage};
use pdf_ink_core::Stroke;
use std::io::Cursor;
use std::path::Path;
use tiny_skia::Pixmap;

/// Default raster scale relative to the page size in points
pub const DEFAULT_EXPORT_SCALE: f32 = 2.0;

/// Rasterize `strokes` for a page of `page_width` x `page_height` points
///
/// The raster is `round(size * scale)` pixels on each side (at least 1).
/// Velocity thinning is always applied.
pub fn flatten_page(
    strokes: &[Stroke],
    page_width: f32,
    page_height: f32,
    scale: f32,
) -> Result<Pixmap, RenderError> {
    let width = (page_width * scale).round().max(1.0) as u32;
    let height = (page_height * scale).round().max(1.0) as u32;
    let mut pixmap = allocate_pixmap(width, height)?;

    let renderer = PathRenderer::new();
    for stroke in strokes {
        renderer.draw_with_velocity(&mut pixmap, stroke, true);
    }
    log::debug!("flattened {} strokes into {width}x{height}", strokes.len());

    Ok(pixmap)
}

/// Convert a premultiplied pixmap to a straight-alpha RGBA image
pub fn to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let width = pixmap.width();
    let pixels = pixmap.pixels();
    RgbaImage::from_fn(width, pixmap.height(), |x, y| {
        let color = pixels[(y * width + x) as usize].demultiply();
        Rgba([color.red(), color.green(), color.blue(), color.alpha()])
    })
}

/// Encode a pixmap as PNG bytes
pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, RenderError> {
    let mut bytes = Cursor::new(Vec::new());
    to_rgba_image(pixmap).write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

/// Write a pixmap to `path` as PNG
pub fn save_png(pixmap: &Pixmap, path: &Path) -> Result<(), RenderError> {
    to_rgba_image(pixmap).save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
