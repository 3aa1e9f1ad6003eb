//! Renderer selection
//!
//! The factory is built once from [`RendererMode`] and handed to every
//! overlay; there is no ambient renderer state.

use crate::error::RenderError;
use crate::gpu::{hardware_provider, ContextProvider};
use crate::gpu_renderer::GpuRenderer;
use crate::path::PathRenderer;
use crate::renderer::{Backend, RendererHandle};
use pdf_ink_core::RendererMode;
use std::cell::RefCell;
use std::rc::Rc;

/// Platform families with distinct renderer behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFamily {
    /// iOS and iPadOS, where the path rasterizer is more reliable
    Ios,
    /// Everything else
    Other,
}

impl PlatformFamily {
    /// Family of the compilation target
    pub fn current() -> Self {
        if cfg!(target_os = "ios") {
            PlatformFamily::Ios
        } else {
            PlatformFamily::Other
        }
    }

    /// Whether the device pixel ratio must be pinned to 1
    pub fn pins_pixel_ratio(self) -> bool {
        self == PlatformFamily::Ios
    }
}

/// Hands out renderers to overlays according to the configured mode
pub struct RendererFactory {
    mode: RendererMode,
    backend: Backend,
    shared_path: RendererHandle,
    provider: ContextProvider,
}

impl std::fmt::Debug for RendererFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererFactory")
            .field("mode", &self.mode)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl RendererFactory {
    /// Create a factory backed by the hardware GPU context
    pub fn new(mode: RendererMode, platform: PlatformFamily) -> Result<Self, RenderError> {
        Self::with_provider(mode, platform, hardware_provider())
    }

    /// Create a factory with a custom GPU context provider
    ///
    /// In [`RendererMode::Gpu`] a failing probe context is an error. In
    /// [`RendererMode::Auto`] it selects the path rasterizer instead.
    pub fn with_provider(
        mode: RendererMode,
        platform: PlatformFamily,
        provider: ContextProvider,
    ) -> Result<Self, RenderError> {
        let backend = match mode {
            RendererMode::Path => Backend::Path,
            RendererMode::Gpu => {
                provider(1, 1).map_err(RenderError::GpuUnavailable)?;
                Backend::Gpu
            }
            RendererMode::Auto if platform == PlatformFamily::Ios => Backend::Path,
            RendererMode::Auto => match provider(1, 1) {
                Ok(_) => Backend::Gpu,
                Err(error) => {
                    log::warn!("GPU renderer unavailable, falling back to path: {error}");
                    Backend::Path
                }
            },
        };
        log::info!("ink renderer mode {mode:?} selected {backend:?} backend");

        let shared_path: RendererHandle = Rc::new(RefCell::new(PathRenderer::new()));
        Ok(Self { mode, backend, shared_path, provider })
    }

    pub fn mode(&self) -> RendererMode {
        self.mode
    }

    /// Backend new overlays receive
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// The path renderer shared by all overlays
    pub fn shared_path(&self) -> RendererHandle {
        Rc::clone(&self.shared_path)
    }

    /// Renderer for a newly created overlay
    ///
    /// GPU overlays each own a renderer. A late GPU failure is an error in
    /// forced mode and falls back to the shared path renderer in auto mode.
    pub fn renderer_for_overlay(
        &self,
        width: u32,
        height: u32,
    ) -> Result<RendererHandle, RenderError> {
        if self.backend == Backend::Path {
            return Ok(self.shared_path());
        }

        let created = (self.provider)(width, height)
            .map_err(RenderError::from)
            .and_then(GpuRenderer::new);
        match created {
            Ok(renderer) => Ok(Rc::new(RefCell::new(renderer))),
            Err(error) if self.mode == RendererMode::Auto => {
                log::warn!("GPU overlay renderer failed, using path renderer: {error}");
                Ok(self.shared_path())
            }
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{software_provider, GpuContext, GpuError};
    use std::cell::Cell;

    fn build(
        mode: RendererMode,
        platform: PlatformFamily,
        provider: ContextProvider,
    ) -> Result<RendererFactory, RenderError> {
        RendererFactory::with_provider(mode, platform, provider)
    }

    fn failing_provider() -> ContextProvider {
        Rc::new(|_: u32, _: u32| -> Result<Box<dyn GpuContext>, GpuError> {
            Err(GpuError::InitializationFailed("no adapter".to_string()))
        })
    }

    #[test]
    fn test_path_mode_shares_one_renderer() {
        let factory = build(RendererMode::Path, PlatformFamily::Other, failing_provider())
            .expect("path mode never probes the GPU");
        let first = factory.renderer_for_overlay(10, 10).expect("path renderer");
        let second = factory.renderer_for_overlay(10, 10).expect("path renderer");
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.borrow().info().backend, Backend::Path);
    }

    #[test]
    fn test_forced_gpu_fails_loudly() {
        let result = build(RendererMode::Gpu, PlatformFamily::Other, failing_provider());
        assert!(matches!(result, Err(RenderError::GpuUnavailable(_))));
    }

    #[test]
    fn test_forced_gpu_overlay_failure_is_error() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let provider: ContextProvider = Rc::new(move |width, height| {
            counter.set(counter.get() + 1);
            if counter.get() == 1 {
                software_provider()(width, height)
            } else {
                Err(GpuError::DeviceCreationFailed("lost".to_string()))
            }
        });

        let factory = build(RendererMode::Gpu, PlatformFamily::Other, provider)
            .expect("probe should succeed");
        assert!(factory.renderer_for_overlay(10, 10).is_err());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_auto_overlay_failure_falls_back_to_shared_path() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let provider: ContextProvider = Rc::new(move |width, height| {
            counter.set(counter.get() + 1);
            if counter.get() == 1 {
                software_provider()(width, height)
            } else {
                Err(GpuError::DeviceCreationFailed("lost".to_string()))
            }
        });

        let factory = build(RendererMode::Auto, PlatformFamily::Other, provider)
            .expect("probe should succeed");
        assert_eq!(factory.backend(), Backend::Gpu);

        let first = factory.renderer_for_overlay(10, 10).expect("auto mode should fall back");
        let second = factory.renderer_for_overlay(10, 10).expect("auto mode should fall back");
        assert_eq!(first.borrow().info().backend, Backend::Path);
        assert!(Rc::ptr_eq(&first, &second));
        assert!(Rc::ptr_eq(&first, &factory.shared_path()));
        assert!(first.borrow_mut().incremental().is_none());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_auto_prefers_gpu_and_gives_each_overlay_its_own() {
        let factory = build(RendererMode::Auto, PlatformFamily::Other, software_provider())
            .expect("auto mode should succeed");
        assert_eq!(factory.backend(), Backend::Gpu);

        let first = factory.renderer_for_overlay(10, 10).expect("gpu renderer");
        let second = factory.renderer_for_overlay(10, 10).expect("gpu renderer");
        assert!(!Rc::ptr_eq(&first, &second));
        assert!(first.borrow_mut().incremental().is_some());
    }

    #[test]
    fn test_auto_falls_back_to_path() {
        let factory = build(RendererMode::Auto, PlatformFamily::Other, failing_provider())
            .expect("auto mode should fall back");
        assert_eq!(factory.backend(), Backend::Path);
        let renderer = factory.renderer_for_overlay(10, 10).expect("path renderer");
        assert!(renderer.borrow_mut().incremental().is_none());
    }

    #[test]
    fn test_auto_uses_path_on_ios() {
        let factory = build(RendererMode::Auto, PlatformFamily::Ios, software_provider())
            .expect("auto mode should succeed");
        assert_eq!(factory.backend(), Backend::Path);
    }
}
