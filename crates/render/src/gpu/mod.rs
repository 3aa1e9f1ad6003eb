//! GPU abstraction layer
//!
//! Offscreen triangle rasterization with two fixed blend modes. The wgpu
//! backend drives real hardware; the software backend emulates the same
//! triangle and blend semantics on the CPU for headless hosts and tests.

pub mod software;
#[cfg(feature = "wgpu")]
pub mod hardware;

use std::error::Error;
use std::fmt;
use std::rc::Rc;
use tiny_skia::Pixmap;

/// GPU backend error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// No usable adapter or backend
    InitializationFailed(String),
    /// Device creation failed
    DeviceCreationFailed(String),
    /// Render target allocation failed
    TextureCreationFailed(String),
    /// Reading the render target back failed
    ReadbackFailed(String),
    /// Other error
    Other(String),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::InitializationFailed(msg) => write!(f, "GPU initialization failed: {}", msg),
            GpuError::DeviceCreationFailed(msg) => write!(f, "Device creation failed: {}", msg),
            GpuError::TextureCreationFailed(msg) => write!(f, "Texture creation failed: {}", msg),
            GpuError::ReadbackFailed(msg) => write!(f, "Readback failed: {}", msg),
            GpuError::Other(msg) => write!(f, "GPU error: {}", msg),
        }
    }
}

impl Error for GpuError {}

/// Blend configuration of a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// color (src-alpha, 1 - src-alpha), alpha (one, 1 - src-alpha)
    Ink,
    /// (zero, 1 - src-alpha) on every channel
    Erase,
}

/// GPU context trait
///
/// Owns one offscreen RGBA render target holding premultiplied pixels.
/// Draws are queued and reach the target on [`flush`](GpuContext::flush).
pub trait GpuContext {
    /// Backend description
    fn describe(&self) -> String;

    /// Current target size in pixels
    fn size(&self) -> (u32, u32);

    /// Reallocate the target; contents become transparent
    fn resize(&mut self, width: u32, height: u32) -> Result<(), GpuError>;

    /// Clear the target to transparent, discarding queued draws
    fn clear(&mut self);

    /// Replace the target contents with `source`, discarding queued draws
    ///
    /// `source` must match the target size.
    fn upload(&mut self, source: &Pixmap) -> Result<(), GpuError>;

    /// Queue a triangle list in pixel coordinates with a straight RGBA color
    fn draw_triangles(&mut self, positions: &[[f32; 2]], color: [f32; 4], blend: BlendMode);

    /// Execute queued work
    fn flush(&mut self) -> Result<(), GpuError>;

    /// Flush, then copy the target into `target` (same size)
    fn read_pixels(&mut self, target: &mut Pixmap) -> Result<(), GpuError>;
}

/// Creates contexts of a given initial size
pub type ContextProvider = Rc<dyn Fn(u32, u32) -> Result<Box<dyn GpuContext>, GpuError>>;

/// Create a hardware GPU context
#[cfg(feature = "wgpu")]
pub fn create_context(width: u32, height: u32) -> Result<Box<dyn GpuContext>, GpuError> {
    hardware::WgpuContext::new(width, height).map(|ctx| Box::new(ctx) as Box<dyn GpuContext>)
}

#[cfg(not(feature = "wgpu"))]
pub fn create_context(_width: u32, _height: u32) -> Result<Box<dyn GpuContext>, GpuError> {
    Err(GpuError::InitializationFailed("No GPU backend compiled into this build".to_string()))
}

/// Provider backed by [`create_context`]
pub fn hardware_provider() -> ContextProvider {
    Rc::new(create_context)
}

/// Provider backed by [`software::SoftwareContext`]
pub fn software_provider() -> ContextProvider {
    Rc::new(|width, height| {
        software::SoftwareContext::new(width, height)
            .map(|ctx| Box::new(ctx) as Box<dyn GpuContext>)
    })
}

fn size_mismatch(expected: (u32, u32), actual: (u32, u32)) -> GpuError {
    GpuError::Other(format!(
        "pixmap is {}x{} but the render target is {}x{}",
        actual.0, actual.1, expected.0, expected.1
    ))
}
