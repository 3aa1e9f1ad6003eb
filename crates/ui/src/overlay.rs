//! Per-page ink overlay
//!
//! An [`OverlayManager`] owns one drawing surface bound to a page element,
//! the pointer-capture state machine for that surface and the compositing
//! loop for the live stroke.
//!
//! Two compositing strategies exist, chosen by the renderer's capabilities:
//!
//! - **Incremental** renderers own their surface. The committed strokes are
//!   replayed once at the start of a gesture, then every frame appends only
//!   the new segments of the live stroke and presents.
//! - **Path** renderers draw into caller-owned pixmaps. Committed strokes
//!   live in an ink layer, and the live stroke is replayed into a separate
//!   live layer each frame.
//!
//! Pointer moves and layout changes only mark work; the host drives
//! [`OverlayManager::on_animation_frame`] once per display refresh.

use crate::events::{EventOutbox, InkEvent};
use crate::input::{ClientRect, EventDisposition, InteractionMode, PointerEvent};
use crate::layout::{ElementId, PageGeometry, SurfaceLayout, SurfaceStyle};
use crate::palm::PalmRejection;
use pdf_ink_core::{
    DeviceKind, DocumentSession, InkSettings, Stroke, StrokeInit, ToolKind, ToolRegistry,
};
use pdf_ink_render::{allocate_pixmap, Backend, PlatformFamily, RenderError, RendererHandle};
use pdf_ink_scheduler::{FrameRequest, FrameScheduler};
use std::cell::RefCell;
use std::rc::Rc;
use tiny_skia::{Color, Pixmap, PixmapPaint, Transform};

/// Offset between coalesced samples sharing one event time, in milliseconds
pub const COALESCED_SAMPLE_STEP_MS: f64 = 0.05;

/// State shared by every overlay of a document
#[derive(Debug, Clone)]
pub struct OverlayContext {
    pub settings: Rc<RefCell<InkSettings>>,
    pub session: Rc<RefCell<DocumentSession>>,
    pub tools: Rc<RefCell<ToolRegistry>>,
    pub palm: Rc<PalmRejection>,
    pub outbox: EventOutbox,
    pub platform: PlatformFamily,
}

impl OverlayContext {
    /// Create a new context with the default tools
    pub fn new(
        settings: Rc<RefCell<InkSettings>>,
        session: Rc<RefCell<DocumentSession>>,
        platform: PlatformFamily,
    ) -> Self {
        Self {
            settings,
            session,
            tools: Rc::new(RefCell::new(ToolRegistry::new())),
            palm: Rc::new(PalmRejection::default()),
            outbox: EventOutbox::new(),
            platform,
        }
    }
}

/// Whether the overlay is attached to its page element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Mounted,
    Detached,
}

/// The in-progress stroke of a captured pointer
#[derive(Debug, Clone)]
struct LiveStroke {
    pointer_id: i32,
    stroke: Stroke,
    /// Points whose leading segments are already on the surface
    drawn_points: usize,
    last_timestamp: f64,
}

#[derive(Debug, Clone)]
enum GestureState {
    Idle,
    Active(LiveStroke),
}

/// Caller-owned layers for renderers without their own surface
#[derive(Debug, Clone)]
struct PathLayers {
    ink: Pixmap,
    live: Pixmap,
}

impl PathLayers {
    fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        Ok(Self { ink: allocate_pixmap(width, height)?, live: allocate_pixmap(width, height)? })
    }

    fn size(&self) -> (u32, u32) {
        (self.ink.width(), self.ink.height())
    }
}

#[derive(Debug, Clone)]
struct PendingLayout {
    layout: SurfaceLayout,
    needs_resize: bool,
}

/// Drawing surface and pointer state machine for one page
pub struct OverlayManager {
    page: u32,
    element: ElementId,
    lifecycle: Lifecycle,
    mode: InteractionMode,
    tool: ToolKind,
    context: OverlayContext,
    renderer: RendererHandle,

    /// Renderer exposes tail rendering
    incremental: bool,

    layers: Option<PathLayers>,
    layout: Option<SurfaceLayout>,
    pending_layout: Option<PendingLayout>,
    page_rect: ClientRect,
    surface_rect: ClientRect,
    frames: FrameScheduler,
    gesture: GestureState,

    /// The incremental surface holds the committed strokes of this gesture
    base_prepared: bool,
}

impl std::fmt::Debug for OverlayManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayManager")
            .field("page", &self.page)
            .field("lifecycle", &self.lifecycle)
            .field("mode", &self.mode)
            .field("tool", &self.tool)
            .field("incremental", &self.incremental)
            .field("stroke_active", &self.is_stroke_active())
            .finish_non_exhaustive()
    }
}

impl OverlayManager {
    /// Create a new detached overlay for `page`
    pub fn new(
        page: u32,
        element: ElementId,
        renderer: RendererHandle,
        context: OverlayContext,
    ) -> Self {
        let incremental = renderer.borrow_mut().incremental().is_some();
        Self {
            page,
            element,
            lifecycle: Lifecycle::Detached,
            mode: InteractionMode::default(),
            tool: ToolKind::Pen,
            context,
            renderer,
            incremental,
            layers: None,
            layout: None,
            pending_layout: None,
            page_rect: ClientRect::default(),
            surface_rect: ClientRect::default(),
            frames: FrameScheduler::new(),
            gesture: GestureState::Idle,
            base_prepared: false,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_mounted(&self) -> bool {
        self.lifecycle == Lifecycle::Mounted
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    /// Backend of the bound renderer
    pub fn backend(&self) -> Backend {
        self.renderer.borrow().info().backend
    }

    /// Whether live strokes are composited by tail rendering
    pub fn uses_tail_rendering(&self) -> bool {
        self.incremental
    }

    pub fn is_stroke_active(&self) -> bool {
        matches!(self.gesture, GestureState::Active(_))
    }

    /// The in-progress stroke, if a pointer is captured
    pub fn live_stroke(&self) -> Option<&Stroke> {
        match &self.gesture {
            GestureState::Active(live) => Some(&live.stroke),
            GestureState::Idle => None,
        }
    }

    /// Applied surface layout
    pub fn layout(&self) -> Option<&SurfaceLayout> {
        self.layout.as_ref()
    }

    /// CSS the host should apply to the surface
    pub fn style(&self) -> Option<SurfaceStyle> {
        self.layout.as_ref().map(|layout| layout.style(self.mode))
    }

    /// Whether an animation frame is wanted
    pub fn needs_frame(&self) -> bool {
        self.frames.is_scheduled()
    }

    /// Attach the surface to the page element and draw the committed strokes
    pub fn mount(&mut self, geometry: &PageGeometry, raw_ratio: f32) -> Result<(), RenderError> {
        self.lifecycle = Lifecycle::Mounted;
        self.page_rect = geometry.page_rect;
        self.surface_rect = geometry.surface_rect;
        self.pending_layout = None;

        let layout = self.resolve_layout(geometry, raw_ratio);
        self.apply_layout(layout, true)?;
        log::debug!("overlay mounted on page {}", self.page);
        self.redraw_all()
    }

    /// Remove the surface from its page, discarding any live stroke
    pub fn detach(&mut self) {
        if self.lifecycle == Lifecycle::Detached {
            return;
        }
        if let Some(live) = self.take_live() {
            let released_at = live.last_timestamp;
            self.release_contact(&live, released_at);
        }
        self.frames.cancel();
        self.pending_layout = None;
        self.base_prepared = false;
        self.lifecycle = Lifecycle::Detached;
        log::debug!("overlay detached from page {}", self.page);
    }

    /// Rebind a pooled overlay to another page element
    pub fn rebind(&mut self, page: u32, element: ElementId) {
        if self.is_mounted() {
            log::warn!("rebinding mounted overlay of page {}; detaching first", self.page);
            self.detach();
        }
        self.page = page;
        self.element = element;
        self.page_rect = ClientRect::default();
        self.surface_rect = ClientRect::default();
    }

    pub fn set_mode(&mut self, mode: InteractionMode) {
        self.mode = mode;
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
    }

    /// Re-sync against the page's geometry on the next frame
    ///
    /// A change of pixel size, or `force`, invalidates the surface and
    /// triggers a full redraw; otherwise only the live stroke is flushed.
    /// Returns `true` when a new frame was scheduled.
    pub fn sync_layout(&mut self, geometry: &PageGeometry, raw_ratio: f32, force: bool) -> bool {
        if !self.is_mounted() {
            return false;
        }
        self.page_rect = geometry.page_rect;
        self.surface_rect = geometry.surface_rect;

        let layout = self.resolve_layout(geometry, raw_ratio);
        let applied = self.layout.as_ref().map(SurfaceLayout::pixel_size);
        let already_pending = self.pending_layout.as_ref().is_some_and(|p| p.needs_resize);
        let needs_resize = force || already_pending || applied != Some(layout.pixel_size());

        self.pending_layout = Some(PendingLayout { layout, needs_resize });
        self.frames.request(FrameRequest::layout())
    }

    /// Run the work accumulated since the last frame
    pub fn on_animation_frame(&mut self) -> Result<(), RenderError> {
        if !self.is_mounted() {
            self.frames.cancel();
            return Ok(());
        }
        let merged = self.frames.merged_requests();
        let work = self.frames.take();
        if work.is_empty() {
            return Ok(());
        }
        log::trace!(
            "page {} frame {}: {merged} requests merged into {work:?}",
            self.page,
            self.frames.frames_run()
        );

        let mut redraw = work.full_redraw;
        if let Some(pending) = self.pending_layout.take() {
            redraw |= self.apply_layout(pending.layout, pending.needs_resize)?;
        }

        if redraw {
            self.redraw_all()
        } else {
            self.flush_frame()
        }
    }

    /// Handle a pointer down; starts a stroke when this is a drawing gesture
    pub fn on_pointer_down(&mut self, event: &PointerEvent) -> EventDisposition {
        if !self.is_mounted() || !self.mode.accepts_pointer() || !event.is_primary {
            return EventDisposition::Ignored;
        }
        if self.is_stroke_active() {
            return EventDisposition::Ignored;
        }

        let now = event.timestamp;
        let Some(stroke) = self.start_stroke(event) else {
            return EventDisposition::Ignored;
        };
        if event.device.is_stylus() {
            self.context.palm.contact_began();
        }

        log::trace!("pointer {} captured on page {}", event.pointer_id, self.page);
        self.gesture = GestureState::Active(LiveStroke {
            pointer_id: event.pointer_id,
            stroke,
            drawn_points: 1,
            last_timestamp: now,
        });
        self.base_prepared = false;
        self.frames.request(FrameRequest::flush());
        EventDisposition::Handled
    }

    /// Append the event's samples to the live stroke of the captured pointer
    pub fn on_pointer_move(&mut self, event: &PointerEvent) -> EventDisposition {
        let GestureState::Active(live) = &mut self.gesture else {
            return EventDisposition::Ignored;
        };
        if live.pointer_id != event.pointer_id {
            return EventDisposition::Ignored;
        }

        for (i, sample) in event.samples().iter().enumerate() {
            let candidate = event.timestamp + i as f64 * COALESCED_SAMPLE_STEP_MS;
            let timestamp = if candidate > live.last_timestamp {
                candidate
            } else {
                live.last_timestamp + COALESCED_SAMPLE_STEP_MS
            };
            live.last_timestamp = timestamp;
            live.stroke.push_point(sample.to_point(&self.surface_rect, timestamp));
        }

        self.frames.request(FrameRequest::flush());
        EventDisposition::Handled
    }

    /// Commit the live stroke of the captured pointer
    pub fn on_pointer_up(&mut self, event: &PointerEvent) -> Result<EventDisposition, RenderError> {
        if !self.is_captured(event.pointer_id) {
            return Ok(EventDisposition::Ignored);
        }
        let Some(live) = self.take_live() else {
            return Ok(EventDisposition::Ignored);
        };
        self.release_contact(&live, event.timestamp);

        self.context.session.borrow_mut().add_stroke(self.page, live.stroke);
        self.context.outbox.push(InkEvent::StrokeCommitted { page: self.page });
        self.base_prepared = false;
        self.redraw_all()?;
        Ok(EventDisposition::Handled)
    }

    /// Discard the live stroke of the captured pointer without committing
    pub fn on_pointer_cancel(&mut self, event: &PointerEvent) -> EventDisposition {
        if !self.is_captured(event.pointer_id) {
            return EventDisposition::Ignored;
        }
        if let Some(live) = self.take_live() {
            self.release_contact(&live, event.timestamp);
            self.discard_live_pixels();
        }
        EventDisposition::Handled
    }

    /// Undo the last stroke of this page, aborting an active stroke first
    ///
    /// Returns whether the page changed.
    pub fn request_undo(&mut self, now: f64) -> Result<bool, RenderError> {
        self.change_history(now, DocumentSession::undo)
    }

    /// Redo the last undone stroke of this page, aborting an active stroke first
    pub fn request_redo(&mut self, now: f64) -> Result<bool, RenderError> {
        self.change_history(now, DocumentSession::redo)
    }

    /// Clear and replay every committed stroke of the page
    pub fn redraw_all(&mut self) -> Result<(), RenderError> {
        if !self.is_mounted() {
            return Ok(());
        }
        {
            let session = self.context.session.borrow();
            let settings = self.context.settings.borrow();
            let strokes = session.strokes(self.page);

            if self.incremental {
                let mut renderer = self.renderer.borrow_mut();
                if let Some(surface) = renderer.incremental() {
                    surface.redraw_surface(strokes, &settings)?;
                    surface.present()?;
                }
                self.base_prepared = true;
                // The replay wiped any tail already drawn
                if let GestureState::Active(live) = &mut self.gesture {
                    live.drawn_points = 1;
                }
            } else if let Some(layers) = self.layers.as_mut() {
                self.renderer.borrow_mut().redraw_page(&mut layers.ink, strokes, &settings)?;
            }
        }
        self.flush_frame()
    }

    /// Client-space area of the page inside the viewport
    pub fn visible_area(&self, viewport_width: f32, viewport_height: f32) -> f32 {
        if !self.is_mounted() {
            return 0.0;
        }
        self.page_rect.visible_area(viewport_width, viewport_height)
    }

    /// The raster currently shown to the user
    pub fn snapshot(&self) -> Result<Pixmap, RenderError> {
        if self.incremental {
            let mut renderer = self.renderer.borrow_mut();
            if let Some(surface) = renderer.incremental() {
                return Ok(surface.surface().clone());
            }
        }

        let Some(layers) = &self.layers else {
            let (width, height) = self.layout.as_ref().map_or((1, 1), SurfaceLayout::pixel_size);
            return allocate_pixmap(width, height);
        };
        let mut composed = layers.ink.clone();
        composed.draw_pixmap(
            0,
            0,
            layers.live.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        Ok(composed)
    }

    fn resolve_layout(&self, geometry: &PageGeometry, raw_ratio: f32) -> SurfaceLayout {
        let cap = self.context.settings.borrow().device_pixel_ratio_cap;
        SurfaceLayout::compute(geometry, raw_ratio, cap, self.context.platform)
    }

    /// Adopt `layout`, reallocating as needed; returns whether a redraw must follow
    fn apply_layout(&mut self, layout: SurfaceLayout, force: bool) -> Result<bool, RenderError> {
        let (width, height) = layout.pixel_size();
        let mut invalidated = force;

        if self.incremental {
            let mut renderer = self.renderer.borrow_mut();
            if let Some(surface) = renderer.incremental() {
                invalidated |= surface.resize(width, height)?;
            }
        } else if self.layers.as_ref().map(PathLayers::size) != Some((width, height)) {
            self.layers = Some(PathLayers::new(width, height)?);
            invalidated = true;
        }

        self.layout = Some(layout);
        if invalidated {
            self.base_prepared = false;
        }
        Ok(invalidated)
    }

    /// Composite the live stroke
    fn flush_frame(&mut self) -> Result<(), RenderError> {
        let settings = self.context.settings.borrow();

        if self.incremental {
            let GestureState::Active(live) = &mut self.gesture else {
                return Ok(());
            };
            let mut renderer = self.renderer.borrow_mut();
            let Some(surface) = renderer.incremental() else {
                return Ok(());
            };

            if !self.base_prepared {
                let session = self.context.session.borrow();
                surface.redraw_surface(session.strokes(self.page), &settings)?;
                self.base_prepared = true;
                live.drawn_points = 1;
            }

            // Segment k joins points k and k + 1
            let from_segment = live.drawn_points.saturating_sub(1);
            surface.draw_tail(&live.stroke, from_segment, &settings)?;
            live.drawn_points = live.stroke.points.len();
            surface.present()?;
        } else if let Some(layers) = self.layers.as_mut() {
            layers.live.fill(Color::TRANSPARENT);
            if let GestureState::Active(live) = &self.gesture {
                self.renderer.borrow_mut().draw_stroke(&mut layers.live, &live.stroke, &settings)?;
            }
        }
        Ok(())
    }

    fn start_stroke(&self, event: &PointerEvent) -> Option<Stroke> {
        let settings = self.context.settings.borrow();
        match event.device {
            DeviceKind::Pen | DeviceKind::Mouse => {}
            DeviceKind::Touch => {
                if settings.only_pen_draws || self.context.palm.suppresses_touch(event.timestamp) {
                    return None;
                }
            }
        }

        let layout = self.layout.as_ref()?;
        let tools = self.context.tools.borrow();
        let Some(tool) = tools.get(self.tool) else {
            log::warn!("no tool registered for {:?}", self.tool);
            return None;
        };

        let init = StrokeInit {
            device: event.device,
            ref_w: layout.pixel_width as f32,
            ref_h: layout.pixel_height as f32,
            point: event.sample.to_point(&self.surface_rect, event.timestamp),
        };
        Some(tool.create_stroke(init, &settings))
    }

    fn change_history(
        &mut self,
        now: f64,
        apply: fn(&mut DocumentSession, u32) -> bool,
    ) -> Result<bool, RenderError> {
        if let Some(live) = self.take_live() {
            self.release_contact(&live, now);
            log::debug!("aborted live stroke on page {} for history change", self.page);
        }

        let changed = apply(&mut self.context.session.borrow_mut(), self.page);
        if changed {
            self.context.outbox.push(InkEvent::HistoryChanged { page: self.page });
        }
        self.base_prepared = false;
        self.redraw_all()?;
        Ok(changed)
    }

    fn is_captured(&self, pointer_id: i32) -> bool {
        matches!(&self.gesture, GestureState::Active(live) if live.pointer_id == pointer_id)
    }

    fn take_live(&mut self) -> Option<LiveStroke> {
        match std::mem::replace(&mut self.gesture, GestureState::Idle) {
            GestureState::Active(live) => Some(live),
            GestureState::Idle => None,
        }
    }

    fn release_contact(&self, live: &LiveStroke, now: f64) {
        if live.stroke.device.is_stylus() {
            self.context.palm.contact_ended(now);
        }
    }

    /// Remove an aborted stroke's pixels on the next frame
    fn discard_live_pixels(&mut self) {
        if self.incremental {
            // Tail segments are already baked into the surface
            self.frames.request(FrameRequest::full_redraw());
        } else {
            self.frames.request(FrameRequest::flush());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PointerSample;
    use pdf_ink_core::{Point, RendererMode};
    use pdf_ink_render::{
        software_provider, ContextProvider, GpuError, GpuRenderer, IncrementalRenderer,
        PathRenderer, RendererFactory,
    };
    use std::cell::Cell;

    fn settings() -> InkSettings {
        InkSettings { velocity_affects_size: false, pen_size: 6.0, ..InkSettings::default() }
    }

    fn context() -> OverlayContext {
        OverlayContext::new(
            Rc::new(RefCell::new(settings())),
            Rc::new(RefCell::new(DocumentSession::new())),
            PlatformFamily::Other,
        )
    }

    fn geometry(size: f32) -> PageGeometry {
        let rect = ClientRect::new(0.0, 0.0, size, size);
        PageGeometry {
            css_width: size,
            css_height: size,
            page_rect: rect,
            surface_rect: rect,
            ..PageGeometry::default()
        }
    }

    fn path_overlay(context: &OverlayContext) -> OverlayManager {
        let renderer: RendererHandle = Rc::new(RefCell::new(PathRenderer::new()));
        let mut overlay = OverlayManager::new(0, ElementId(1), renderer, context.clone());
        overlay.mount(&geometry(100.0), 1.0).expect("mount should succeed");
        overlay
    }

    fn gpu_renderer() -> GpuRenderer {
        let gpu = software_provider()(100, 100).expect("software context should exist");
        GpuRenderer::new(gpu).expect("renderer should allocate")
    }

    fn gpu_overlay(context: &OverlayContext) -> OverlayManager {
        let renderer: RendererHandle = Rc::new(RefCell::new(gpu_renderer()));
        let mut overlay = OverlayManager::new(0, ElementId(1), renderer, context.clone());
        overlay.mount(&geometry(100.0), 1.0).expect("mount should succeed");
        overlay
    }

    fn pointer(id: i32, device: DeviceKind, t: f64, x: f32, y: f32) -> PointerEvent {
        PointerEvent::new(id, device, t, PointerSample::at(x, y).with_pressure(1.0))
    }

    fn alpha_at(pixmap: &Pixmap, x: u32, y: u32) -> u8 {
        pixmap.pixel(x, y).map_or(0, |pixel| pixel.alpha())
    }

    #[test]
    fn test_pen_stroke_commits_on_release() {
        let context = context();
        let mut overlay = path_overlay(&context);

        let down = pointer(7, DeviceKind::Pen, 100.0, 10.0, 50.0);
        assert!(overlay.on_pointer_down(&down).is_handled());
        assert!(context.palm.in_contact());

        let step = pointer(7, DeviceKind::Pen, 116.0, 50.0, 50.0)
            .with_coalesced(vec![PointerSample::at(30.0, 50.0), PointerSample::at(50.0, 50.0)]);
        assert!(overlay.on_pointer_move(&step).is_handled());
        overlay.on_animation_frame().expect("frame should render");

        let live = overlay.snapshot().expect("snapshot");
        assert!(alpha_at(&live, 40, 50) > 0);

        let up = pointer(7, DeviceKind::Pen, 130.0, 50.0, 50.0);
        assert!(overlay.on_pointer_up(&up).expect("commit should render").is_handled());
        assert!(!overlay.is_stroke_active());

        let session = context.session.borrow();
        assert_eq!(session.strokes(0).len(), 1);
        assert_eq!(session.strokes(0)[0].points.len(), 3);
        assert_eq!(session.strokes(0)[0].ref_w, 100.0);
        assert_eq!(context.outbox.drain(), vec![InkEvent::StrokeCommitted { page: 0 }]);

        assert!(context.palm.suppresses_touch(140.0));
        assert!(!context.palm.suppresses_touch(151.0));

        let committed = overlay.snapshot().expect("snapshot");
        assert!(alpha_at(&committed, 40, 50) > 0);
    }

    #[test]
    fn test_non_drawing_input_is_ignored() {
        let context = context();
        let mut overlay = path_overlay(&context);

        let mut secondary = pointer(2, DeviceKind::Mouse, 0.0, 10.0, 10.0);
        secondary.is_primary = false;
        assert_eq!(overlay.on_pointer_down(&secondary), EventDisposition::Ignored);

        // Touch never draws while only the pen may
        let touch = pointer(3, DeviceKind::Touch, 0.0, 10.0, 10.0);
        assert_eq!(overlay.on_pointer_down(&touch), EventDisposition::Ignored);

        overlay.set_mode(InteractionMode::Pan);
        let mouse = pointer(1, DeviceKind::Mouse, 0.0, 10.0, 10.0);
        assert_eq!(overlay.on_pointer_down(&mouse), EventDisposition::Ignored);
        assert!(!overlay.is_stroke_active());
        assert!(!overlay.style().expect("mounted overlay has a style").pointer_events);
    }

    #[test]
    fn test_touch_draws_when_permitted_and_no_stylus() {
        let context = context();
        context.settings.borrow_mut().only_pen_draws = false;
        let mut overlay = path_overlay(&context);

        context.palm.contact_began();
        let touch = pointer(3, DeviceKind::Touch, 0.0, 10.0, 10.0);
        assert_eq!(overlay.on_pointer_down(&touch), EventDisposition::Ignored);

        context.palm.contact_ended(0.0);
        let later = pointer(3, DeviceKind::Touch, 50.0, 10.0, 10.0);
        assert!(overlay.on_pointer_down(&later).is_handled());
    }

    #[test]
    fn test_only_captured_pointer_extends_stroke() {
        let context = context();
        let mut overlay = path_overlay(&context);
        overlay.on_pointer_down(&pointer(1, DeviceKind::Mouse, 0.0, 10.0, 10.0));

        let other = pointer(2, DeviceKind::Mouse, 5.0, 90.0, 90.0);
        assert_eq!(overlay.on_pointer_down(&other), EventDisposition::Ignored);
        assert_eq!(overlay.on_pointer_move(&other), EventDisposition::Ignored);
        let released = overlay.on_pointer_up(&other).expect("ignored release");
        assert_eq!(released, EventDisposition::Ignored);

        let stroke = overlay.live_stroke().expect("stroke should still be live");
        assert_eq!(stroke.points.len(), 1);
    }

    #[test]
    fn test_coalesced_timestamps_strictly_increase() {
        let context = context();
        let mut overlay = path_overlay(&context);
        overlay.on_pointer_down(&pointer(1, DeviceKind::Pen, 100.0, 10.0, 10.0));

        let batch = vec![PointerSample::at(11.0, 10.0); 3];
        let same_time = pointer(1, DeviceKind::Pen, 100.0, 12.0, 10.0).with_coalesced(batch);
        overlay.on_pointer_move(&same_time);
        let later = pointer(1, DeviceKind::Pen, 200.0, 13.0, 10.0)
            .with_coalesced(vec![PointerSample::at(13.0, 10.0), PointerSample::at(14.0, 10.0)]);
        overlay.on_pointer_move(&later);

        let stroke = overlay.live_stroke().expect("stroke should be live");
        let times: Vec<f64> = stroke.points.iter().map(|point: &Point| point.timestamp).collect();
        assert_eq!(times.len(), 6);
        assert!(times.windows(2).all(|pair| pair[1] > pair[0]), "times were {times:?}");
        assert!((times[4] - 200.0).abs() < 1e-9);
        assert!((times[5] - 200.05).abs() < 1e-9);
    }

    #[test]
    fn test_cancel_discards_stroke() {
        let context = context();
        let mut overlay = gpu_overlay(&context);
        overlay.on_pointer_down(&pointer(1, DeviceKind::Pen, 0.0, 10.0, 50.0));
        overlay.on_pointer_move(&pointer(1, DeviceKind::Pen, 16.0, 90.0, 50.0));
        overlay.on_animation_frame().expect("frame should render");
        assert!(alpha_at(&overlay.snapshot().expect("snapshot"), 50, 50) > 0);

        let cancel = pointer(1, DeviceKind::Pen, 20.0, 90.0, 50.0);
        assert!(overlay.on_pointer_cancel(&cancel).is_handled());
        overlay.on_animation_frame().expect("frame should render");

        assert!(!overlay.is_stroke_active());
        assert_eq!(context.session.borrow().stroke_count(), 0);
        assert!(context.outbox.is_empty());
        assert_eq!(alpha_at(&overlay.snapshot().expect("snapshot"), 50, 50), 0);
        assert!(!context.palm.in_contact());
    }

    #[test]
    fn test_undo_aborts_active_stroke() {
        let context = context();
        let mut overlay = path_overlay(&context);
        overlay.on_pointer_down(&pointer(1, DeviceKind::Pen, 0.0, 10.0, 50.0));
        overlay.on_pointer_move(&pointer(1, DeviceKind::Pen, 10.0, 90.0, 50.0));
        overlay.on_pointer_up(&pointer(1, DeviceKind::Pen, 20.0, 90.0, 50.0)).expect("commit");
        context.outbox.drain();

        overlay.on_pointer_down(&pointer(1, DeviceKind::Pen, 100.0, 50.0, 10.0));
        assert!(overlay.request_undo(110.0).expect("undo should render"));
        assert!(!overlay.is_stroke_active());
        assert!(!context.palm.in_contact());
        assert_eq!(context.session.borrow().stroke_count(), 0);
        assert_eq!(context.outbox.drain(), vec![InkEvent::HistoryChanged { page: 0 }]);
        assert_eq!(alpha_at(&overlay.snapshot().expect("snapshot"), 50, 50), 0);

        assert!(overlay.request_redo(120.0).expect("redo should render"));
        assert_eq!(context.session.borrow().stroke_count(), 1);
        assert!(!overlay.request_redo(130.0).expect("empty redo is a no-op"));
    }

    #[test]
    fn test_tail_frames_match_full_replay() {
        let context = context();
        context.session.borrow_mut().add_stroke(
            0,
            Stroke {
                tool: ToolKind::Pen,
                device: DeviceKind::Mouse,
                color: "#0000ff".to_string(),
                size: 8.0,
                ref_w: 100.0,
                ref_h: 100.0,
                opacity: 0.5,
                points: vec![Point::new(0.5, 0.05, 1.0, 0.0), Point::new(0.5, 0.95, 1.0, 50.0)],
            },
        );

        let mut overlay = gpu_overlay(&context);
        assert!(overlay.uses_tail_rendering());
        overlay.on_pointer_down(&pointer(1, DeviceKind::Pen, 0.0, 5.0, 20.0));
        let path = [(25.0, 60.0), (45.0, 25.0), (65.0, 70.0), (85.0, 30.0), (95.0, 80.0)];
        for (i, (x, y)) in path.iter().enumerate() {
            let t = 16.0 * (i as f64 + 1.0);
            let midway = PointerSample::at(x - 5.0, *y);
            let event = pointer(1, DeviceKind::Pen, t, *x, *y)
                .with_coalesced(vec![midway, PointerSample::at(*x, *y)]);
            overlay.on_pointer_move(&event);
            overlay.on_animation_frame().expect("frame should render");
        }
        let composited = overlay.snapshot().expect("snapshot");

        let live = overlay.live_stroke().expect("stroke should be live").clone();
        let mut strokes = context.session.borrow().strokes(0).to_vec();
        strokes.push(live);
        let mut reference = gpu_renderer();
        reference.redraw_surface(&strokes, &settings()).expect("replay");
        reference.present().expect("present");

        assert_eq!(composited.data(), reference.surface().data());
    }

    #[test]
    fn test_gpu_and_fallback_overlays_commit_side_by_side() {
        // Probe and first overlay get a context, later overlays do not
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let provider: ContextProvider = Rc::new(move |width, height| {
            counter.set(counter.get() + 1);
            if counter.get() <= 2 {
                software_provider()(width, height)
            } else {
                Err(GpuError::DeviceCreationFailed("lost".to_string()))
            }
        });
        let factory =
            RendererFactory::with_provider(RendererMode::Auto, PlatformFamily::Other, provider)
                .expect("auto mode should succeed");

        let context = context();
        let mut overlays: Vec<OverlayManager> = (0..2)
            .map(|page| {
                let renderer =
                    factory.renderer_for_overlay(100, 100).expect("renderer should be handed out");
                let element = ElementId(u64::from(page) + 1);
                let mut overlay = OverlayManager::new(page, element, renderer, context.clone());
                overlay.mount(&geometry(100.0), 1.0).expect("mount should succeed");
                overlay
            })
            .collect();
        assert_eq!(overlays[0].backend(), Backend::Gpu);
        assert_eq!(overlays[1].backend(), Backend::Path);
        assert!(overlays[0].uses_tail_rendering());
        assert!(!overlays[1].uses_tail_rendering());

        for (id, overlay) in (1..).zip(overlays.iter_mut()) {
            overlay.on_pointer_down(&pointer(id, DeviceKind::Mouse, 0.0, 10.0, 50.0));
            overlay.on_pointer_move(&pointer(id, DeviceKind::Mouse, 16.0, 50.0, 50.0));
            overlay.on_animation_frame().expect("frame should render");
            let up = pointer(id, DeviceKind::Mouse, 32.0, 90.0, 50.0);
            assert!(overlay.on_pointer_up(&up).expect("commit should render").is_handled());
        }

        let session = context.session.borrow();
        assert_eq!(session.strokes(0).len(), 1);
        assert_eq!(session.strokes(1).len(), 1);
        for overlay in &overlays {
            let committed = overlay.snapshot().expect("snapshot");
            assert!(alpha_at(&committed, 70, 50) > 0, "page {} lost its ink", overlay.page());
        }
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_layout_change_waits_for_frame() {
        let context = context();
        let mut overlay = path_overlay(&context);
        assert_eq!(overlay.layout().map(SurfaceLayout::pixel_size), Some((100, 100)));

        assert!(overlay.sync_layout(&geometry(150.0), 2.0, false));
        assert_eq!(overlay.layout().map(SurfaceLayout::pixel_size), Some((100, 100)));

        overlay.on_animation_frame().expect("frame should render");
        assert_eq!(overlay.layout().map(SurfaceLayout::pixel_size), Some((300, 300)));
        let snapshot = overlay.snapshot().expect("snapshot");
        assert_eq!((snapshot.width(), snapshot.height()), (300, 300));
        assert!(!overlay.needs_frame());
    }

    #[test]
    fn test_detach_and_rebind() {
        let context = context();
        let mut overlay = path_overlay(&context);
        overlay.on_pointer_down(&pointer(1, DeviceKind::Pen, 0.0, 10.0, 10.0));

        overlay.detach();
        assert_eq!(overlay.lifecycle(), Lifecycle::Detached);
        assert!(!overlay.is_stroke_active());
        assert!(!context.palm.in_contact());
        assert_eq!(overlay.visible_area(800.0, 800.0), 0.0);

        overlay.rebind(5, ElementId(9));
        overlay.mount(&geometry(80.0), 1.0).expect("mount should succeed");
        assert_eq!((overlay.page(), overlay.element()), (5, ElementId(9)));
        assert_eq!(overlay.visible_area(800.0, 800.0), 6400.0);
    }
}
