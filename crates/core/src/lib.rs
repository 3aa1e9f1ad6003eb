//! PDF Ink Core Library
//!
//! Stroke model, width engine, per-page history and the document session
//! for freehand annotations over a paginated viewer.

pub mod document;
pub mod error;
pub mod history;
pub mod session;
pub mod settings;
pub mod store;
pub mod stroke;
pub mod tool;
pub mod width;

pub use document::{now_millis, PageState, SerializedDocument, DOCUMENT_VERSION};
pub use error::{SessionError, StoreError};
pub use history::RedoStack;
pub use session::DocumentSession;
pub use settings::{InkSettings, RendererMode};
pub use store::AnnotationStore;
pub use stroke::{tilt_magnitude, DeviceKind, Point, Rgb, Segment, Stroke, ToolKind};
pub use tool::{EraserTool, PenTool, StrokeInit, Tool, ToolRegistry};
pub use width::{segment_pixel_width, stroke_width, surface_scale, MIN_WIDTH};
