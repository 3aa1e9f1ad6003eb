use crate::gpu::GpuError;

/// Rendering failure
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error("GPU renderer was forced but is unavailable: {0}")]
    GpuUnavailable(GpuError),
    #[error("unable to allocate a {width}x{height} surface")]
    SurfaceAllocation { width: u32, height: u32 },
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}
