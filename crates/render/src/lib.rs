//! PDF Ink Render Library
//!
//! Dual-backend stroke rendering: a shared CPU path rasterizer and a
//! per-overlay GPU mesh rasterizer with incremental tail updates.

mod error;
pub mod export;
pub mod gpu;
pub mod gpu_renderer;
pub mod mesh;
pub mod path;
pub mod renderer;
pub mod selection;

pub use error::RenderError;
pub use export::{encode_png, flatten_page, save_png, DEFAULT_EXPORT_SCALE};
pub use gpu::{
    create_context, hardware_provider, software_provider, BlendMode, ContextProvider, GpuContext,
    GpuError,
};
pub use gpu_renderer::GpuRenderer;
pub use path::PathRenderer;
pub use renderer::{
    allocate_pixmap, Backend, IncrementalRenderer, InkRenderer, RendererHandle, RendererInfo,
};
pub use selection::{PlatformFamily, RendererFactory};
pub use tiny_skia::Pixmap;
