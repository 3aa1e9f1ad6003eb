//! CPU emulation of the GPU context
//!
//! Triangles are filled one at a time without anti-aliasing so overlapping
//! geometry blends exactly as separate GPU primitives would.

use super::{size_mismatch, BlendMode, GpuContext, GpuError};
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Transform};

struct QueuedDraw {
    positions: Vec<[f32; 2]>,
    color: [f32; 4],
    blend: BlendMode,
}

/// Software render target
pub struct SoftwareContext {
    target: Pixmap,
    queued: Vec<QueuedDraw>,
}

impl SoftwareContext {
    /// Create a new software context
    pub fn new(width: u32, height: u32) -> Result<Self, GpuError> {
        Ok(Self { target: allocate(width, height)?, queued: Vec::new() })
    }

    #[cfg(test)]
    fn queued_draws(&self) -> usize {
        self.queued.len()
    }

    fn rasterize(&mut self, draw: &QueuedDraw) {
        let mut paint = Paint::default();
        paint.anti_alias = false;
        match draw.blend {
            BlendMode::Ink => {
                let [r, g, b, a] = draw.color.map(|c| c.clamp(0.0, 1.0));
                paint.blend_mode = tiny_skia::BlendMode::SourceOver;
                paint.set_color(Color::from_rgba(r, g, b, a).unwrap_or(Color::BLACK));
            }
            BlendMode::Erase => {
                let alpha = draw.color[3].clamp(0.0, 1.0);
                paint.blend_mode = tiny_skia::BlendMode::DestinationOut;
                paint.set_color(Color::from_rgba(0.0, 0.0, 0.0, alpha).unwrap_or(Color::BLACK));
            }
        }

        for triangle in draw.positions.chunks_exact(3) {
            let mut builder = PathBuilder::new();
            builder.move_to(triangle[0][0], triangle[0][1]);
            builder.line_to(triangle[1][0], triangle[1][1]);
            builder.line_to(triangle[2][0], triangle[2][1]);
            builder.close();
            if let Some(path) = builder.finish() {
                let transform = Transform::identity();
                self.target.fill_path(&path, &paint, FillRule::Winding, transform, None);
            }
        }
    }
}

impl GpuContext for SoftwareContext {
    fn describe(&self) -> String {
        "software".to_string()
    }

    fn size(&self) -> (u32, u32) {
        (self.target.width(), self.target.height())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        self.target = allocate(width, height)?;
        self.queued.clear();
        Ok(())
    }

    fn clear(&mut self) {
        self.queued.clear();
        self.target.fill(Color::TRANSPARENT);
    }

    fn upload(&mut self, source: &Pixmap) -> Result<(), GpuError> {
        let source_size = (source.width(), source.height());
        if source_size != self.size() {
            return Err(size_mismatch(self.size(), source_size));
        }
        self.queued.clear();
        self.target.data_mut().copy_from_slice(source.data());
        Ok(())
    }

    fn draw_triangles(&mut self, positions: &[[f32; 2]], color: [f32; 4], blend: BlendMode) {
        if positions.len() < 3 {
            return;
        }
        self.queued.push(QueuedDraw { positions: positions.to_vec(), color, blend });
    }

    fn flush(&mut self) -> Result<(), GpuError> {
        let queued = std::mem::take(&mut self.queued);
        for draw in &queued {
            self.rasterize(draw);
        }
        Ok(())
    }

    fn read_pixels(&mut self, target: &mut Pixmap) -> Result<(), GpuError> {
        self.flush()?;
        let target_size = (target.width(), target.height());
        if target_size != self.size() {
            return Err(size_mismatch(self.size(), target_size));
        }
        target.data_mut().copy_from_slice(self.target.data());
        Ok(())
    }
}

fn allocate(width: u32, height: u32) -> Result<Pixmap, GpuError> {
    let (width, height) = (width.max(1), height.max(1));
    Pixmap::new(width, height).ok_or_else(|| {
        GpuError::TextureCreationFailed(format!("cannot allocate {width}x{height} target"))
    })
}
