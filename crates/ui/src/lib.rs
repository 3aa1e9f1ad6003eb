//! PDF Ink UI Library
//!
//! Pointer-driven ink overlays for a paginated, virtualized viewer.
//!
//! An [`OverlayManager`] owns the drawing surface of one page: it turns
//! pointer samples into strokes, renders them through the selected backend
//! and keeps its surface aligned with the page's content layer. A
//! [`ViewportController`] keeps a bounded pool of overlays around the
//! visible pages and routes undo, redo and autosave for the document.
//!
//! # Example
//!
//! ```
//! use pdf_ink_ui::{InteractionMode, TwoFingerDoubleTap};
//!
//! let recognizer = TwoFingerDoubleTap::default();
//! assert!(!recognizer.is_tracking());
//! assert_eq!(InteractionMode::default(), InteractionMode::Draw);
//! ```

pub mod events;
pub mod gesture;
pub mod input;
pub mod layout;
pub mod overlay;
pub mod palm;
pub mod viewport;

pub use events::{EventOutbox, InkEvent};
pub use gesture::{DoubleTapConfig, TapOutcome, TwoFingerDoubleTap};
pub use input::{
    ClientRect, EventDisposition, InteractionMode, PointerEvent, PointerSample, TouchEvent,
    TouchPhase, TouchPoint, DEFAULT_PRESSURE,
};
pub use layout::{
    effective_pixel_ratio, surface_pixels, ElementId, PageGeometry, SurfaceLayout, SurfaceStyle,
};
pub use overlay::{Lifecycle, OverlayContext, OverlayManager, COALESCED_SAMPLE_STEP_MS};
pub use palm::{PalmRejection, PALM_GRACE_MS};
pub use viewport::{PageHost, SaveOutcome, ViewportController};
