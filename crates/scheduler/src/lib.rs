//! PDF Ink Scheduler Library
//!
//! Timing and visibility primitives for the overlay engine: per-frame work
//! coalescing, a debounce timer for autosave, and the wanted-page window
//! that drives overlay virtualization.
//!
//! # Example
//!
//! ```
//! use pdf_ink_scheduler::{order_by_distance, PageVisibility, VisibilityTracker};
//!
//! let mut pages = VisibilityTracker::new(40, 2);
//! pages.update(&[PageVisibility::new(10, 1.0)]);
//! assert_eq!(pages.wanted(), Some(8..=12));
//!
//! let mut nearest: Vec<u32> = (8..=12).collect();
//! order_by_distance(&mut nearest, 10);
//! assert_eq!(nearest[..3], [10, 9, 11]);
//! ```

pub mod debounce;
pub mod frame;
pub mod visibility;

pub use debounce::Debouncer;
pub use frame::{FrameRequest, FrameScheduler};
pub use visibility::{
    order_by_distance, wanted_window, PageVisibility, VisibilityTracker, DEFAULT_PAGE_MARGIN,
};
