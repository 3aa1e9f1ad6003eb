//! Animation-frame coalescing
//!
//! Pointer moves and layout changes mark work on a [`FrameScheduler`]; the
//! host runs it once per display refresh. Any number of requests between
//! two ticks collapse into one frame.

/// Work pending for the next animation frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameRequest {
    /// Re-sync surface geometry against the page element
    pub layout: bool,

    /// Composite new live-stroke points
    pub flush: bool,

    /// Replay every committed stroke
    pub full_redraw: bool,
}

impl FrameRequest {
    /// Layout re-sync only
    pub fn layout() -> Self {
        Self { layout: true, ..Self::default() }
    }

    /// Live flush only
    pub fn flush() -> Self {
        Self { flush: true, ..Self::default() }
    }

    /// Full redraw only
    pub fn full_redraw() -> Self {
        Self { full_redraw: true, ..Self::default() }
    }

    /// Whether nothing is requested
    pub fn is_empty(&self) -> bool {
        !self.layout && !self.flush && !self.full_redraw
    }

    /// Union of two requests
    pub fn merge(self, other: FrameRequest) -> Self {
        Self {
            layout: self.layout || other.layout,
            flush: self.flush || other.flush,
            full_redraw: self.full_redraw || other.full_redraw,
        }
    }
}

/// Coalesces frame requests until the next tick
///
/// # Example
///
/// ```
/// use pdf_ink_scheduler::{FrameRequest, FrameScheduler};
///
/// let mut frames = FrameScheduler::new();
/// assert!(frames.request(FrameRequest::flush()));
/// assert!(!frames.request(FrameRequest::layout()));
///
/// let work = frames.take();
/// assert!(work.flush && work.layout);
/// assert!(!frames.is_scheduled());
/// ```
#[derive(Debug, Default)]
pub struct FrameScheduler {
    /// Accumulated work
    pending: FrameRequest,

    /// Requests merged into the pending frame
    merged: u32,

    /// Frames handed out so far
    frames: u64,
}

impl FrameScheduler {
    /// Create a new idle scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `request` into the next frame
    ///
    /// Returns `true` when this call scheduled a new frame, meaning the host
    /// should arm its animation-frame callback.
    pub fn request(&mut self, request: FrameRequest) -> bool {
        if request.is_empty() {
            return false;
        }
        let newly_scheduled = !self.is_scheduled();
        self.pending = self.pending.merge(request);
        self.merged += 1;
        newly_scheduled
    }

    /// Whether a frame is waiting to run
    pub fn is_scheduled(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Peek at the pending work
    pub fn pending(&self) -> FrameRequest {
        self.pending
    }

    /// Requests merged into the currently pending frame
    pub fn merged_requests(&self) -> u32 {
        self.merged
    }

    /// Take the pending work on an animation tick
    pub fn take(&mut self) -> FrameRequest {
        let work = std::mem::take(&mut self.pending);
        if !work.is_empty() {
            self.frames += 1;
        }
        self.merged = 0;
        work
    }

    /// Drop pending work without running it
    pub fn cancel(&mut self) {
        self.pending = FrameRequest::default();
        self.merged = 0;
    }

    /// Frames handed out since creation
    pub fn frames_run(&self) -> u64 {
        self.frames
    }
}
