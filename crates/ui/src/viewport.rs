//! Viewport controller
//!
//! Keeps a bounded set of live overlays around the visible pages of a
//! document and routes input, history and persistence between them.
//!
//! Overlays live in an arena of slots. Pages scrolling out are detached and
//! their slot goes to a free list; pages scrolling in pop the free list
//! before a new overlay is allocated. Only [`ViewportController::teardown`]
//! deallocates.
//!
//! # Reconciliation
//!
//! The wanted pages are the intersecting range widened by the configured
//! margin, ordered nearest-first around the most visible page:
//!
//! 1. While live overlays plus missing pages exceed the cap, the live
//!    overlay farthest outside the window is detached.
//! 2. Missing pages are created nearest-first until the cap is reached.

use crate::events::InkEvent;
use crate::gesture::{DoubleTapConfig, TapOutcome, TwoFingerDoubleTap};
use crate::input::{EventDisposition, InteractionMode, PointerEvent, TouchEvent};
use crate::layout::{ElementId, PageGeometry, SurfaceLayout};
use crate::overlay::{OverlayContext, OverlayManager};
use pdf_ink_core::{AnnotationStore, DocumentSession, InkSettings, StoreError, ToolKind};
use pdf_ink_render::{PlatformFamily, RenderError, RendererFactory};
use pdf_ink_scheduler::{order_by_distance, Debouncer, PageVisibility, VisibilityTracker};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Page layout queries answered by the host viewer
pub trait PageHost {
    /// Pages currently in the document
    fn page_count(&self) -> u32;

    /// Element of `page`, if the viewer has created it
    fn element(&self, page: u32) -> Option<ElementId>;

    /// Current geometry of `page`
    fn geometry(&self, page: u32) -> Option<PageGeometry>;

    /// Raw device pixel ratio of the window
    fn device_pixel_ratio(&self) -> f32;

    /// Size of the visible viewport in CSS pixels
    fn viewport_size(&self) -> (f32, f32);
}

/// Result of a save request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The document was written
    Saved { strokes: usize },
    /// The session holds no strokes; nothing was written
    NothingToSave,
}

/// Owns the overlay pool of one document view
pub struct ViewportController<H, S> {
    host: H,
    store: S,
    document_id: String,
    context: OverlayContext,
    factory: RendererFactory,

    /// Overlay arena; indices are stable until teardown
    slots: Vec<OverlayManager>,

    /// Slots of detached overlays
    free: Vec<usize>,

    /// Live overlay slot per page
    live: BTreeMap<u32, usize>,

    visibility: VisibilityTracker,
    cap: usize,
    mode: InteractionMode,
    double_tap: TwoFingerDoubleTap,
    autosave: Debouncer,
    events: Vec<InkEvent>,
}

impl<H, S> std::fmt::Debug for ViewportController<H, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportController")
            .field("document_id", &self.document_id)
            .field("live", &self.live)
            .field("free", &self.free.len())
            .field("cap", &self.cap)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl<H: PageHost, S: AnnotationStore> ViewportController<H, S> {
    /// Create a new controller with no overlays
    pub fn new(
        host: H,
        store: S,
        document_id: impl Into<String>,
        factory: RendererFactory,
        settings: Rc<RefCell<InkSettings>>,
        session: Rc<RefCell<DocumentSession>>,
    ) -> Self {
        let (cap, margin, delay) = {
            let settings = settings.borrow();
            (
                settings.overlay_cap.max(1),
                settings.page_margin,
                Duration::from_millis(settings.autosave_delay_ms),
            )
        };
        let visibility = VisibilityTracker::new(host.page_count(), margin);

        Self {
            host,
            store,
            document_id: document_id.into(),
            context: OverlayContext::new(settings, session, PlatformFamily::current()),
            factory,
            slots: Vec::new(),
            free: Vec::new(),
            live: BTreeMap::new(),
            visibility,
            cap,
            mode: InteractionMode::default(),
            double_tap: TwoFingerDoubleTap::default(),
            autosave: Debouncer::new(delay),
            events: Vec::new(),
        }
    }

    /// Override the platform family used for pixel ratio rules
    pub fn with_platform(mut self, platform: PlatformFamily) -> Self {
        self.context.platform = platform;
        self
    }

    pub fn with_double_tap(mut self, config: DoubleTapConfig) -> Self {
        self.double_tap = TwoFingerDoubleTap::new(config);
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session(&self) -> Rc<RefCell<DocumentSession>> {
        Rc::clone(&self.context.session)
    }

    pub fn settings(&self) -> Rc<RefCell<InkSettings>> {
        Rc::clone(&self.context.settings)
    }

    pub fn context(&self) -> &OverlayContext {
        &self.context
    }

    pub fn visibility(&self) -> &VisibilityTracker {
        &self.visibility
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn active_tool(&self) -> ToolKind {
        self.context.tools.borrow().active_kind()
    }

    /// Live overlay count
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Detached overlays waiting for reuse
    pub fn pooled_count(&self) -> usize {
        self.free.len()
    }

    /// Overlays ever allocated and not yet torn down
    pub fn allocated_count(&self) -> usize {
        self.slots.len()
    }

    /// Pages with a live overlay, ascending
    pub fn live_pages(&self) -> Vec<u32> {
        self.live.keys().copied().collect()
    }

    /// Live overlay of `page`
    pub fn overlay(&self, page: u32) -> Option<&OverlayManager> {
        self.live.get(&page).map(|&slot| &self.slots[slot])
    }

    fn overlay_mut(&mut self, page: u32) -> Option<&mut OverlayManager> {
        let slot = *self.live.get(&page)?;
        self.slots.get_mut(slot)
    }

    /// Live page with the largest visible area
    pub fn active_page(&self) -> Option<u32> {
        let (width, height) = self.host.viewport_size();
        let mut best: Option<(u32, f32)> = None;
        for (&page, &slot) in &self.live {
            let area = self.slots[slot].visible_area(width, height);
            if area > 0.0 && best.map_or(true, |(_, best_area)| area > best_area) {
                best = Some((page, area));
            }
        }
        best.map(|(page, _)| page)
    }

    /// Whether the host should schedule an animation frame
    pub fn needs_frame(&self) -> bool {
        self.autosave.is_pending()
            || !self.context.outbox.is_empty()
            || self.live.values().any(|&slot| self.slots[slot].needs_frame())
    }

    /// Events produced since the last call
    pub fn take_events(&mut self) -> Vec<InkEvent> {
        std::mem::take(&mut self.events)
    }

    /// Apply intersection reports and reconcile the overlay pool
    pub fn on_visibility(&mut self, reports: &[PageVisibility]) -> Result<(), RenderError> {
        self.visibility.update(reports);
        self.reconcile()
    }

    /// Pick up structural changes of the document (pages added or removed)
    pub fn sync_pages(&mut self) -> Result<(), RenderError> {
        let page_count = self.host.page_count();
        if page_count != self.visibility.page_count() {
            log::debug!("page count changed to {page_count}");
            self.visibility.set_page_count(page_count);
            let stale: Vec<u32> = self.live.range(page_count..).map(|(&page, _)| page).collect();
            for page in stale {
                self.release(page);
            }
        }
        self.reconcile()?;
        self.on_layout_changed(false);
        Ok(())
    }

    /// Re-sync every live overlay against its page geometry
    ///
    /// `force` invalidates every surface, as after a zoom of the page layer.
    pub fn on_layout_changed(&mut self, force: bool) {
        let ratio = self.host.device_pixel_ratio();
        for (&page, &slot) in &self.live {
            if let Some(geometry) = self.host.geometry(page) {
                self.slots[slot].sync_layout(&geometry, ratio, force);
            }
        }
    }

    /// Bring the live overlays in line with the wanted window
    pub fn reconcile(&mut self) -> Result<(), RenderError> {
        let Some(window) = self.visibility.wanted() else {
            return Ok(());
        };
        let focus = self
            .active_page()
            .or_else(|| self.visibility.most_visible())
            .unwrap_or(*window.start());

        let mut wanted: Vec<u32> = window.clone().collect();
        order_by_distance(&mut wanted, focus);
        let missing: Vec<u32> =
            wanted.into_iter().filter(|page| !self.live.contains_key(page)).collect();

        let mut outside: Vec<u32> =
            self.live.keys().copied().filter(|page| !window.contains(page)).collect();
        order_by_distance(&mut outside, focus);
        while self.live.len() + missing.len() > self.cap {
            let Some(farthest) = outside.pop() else {
                break;
            };
            self.release(farthest);
        }

        for page in missing {
            if self.live.len() >= self.cap {
                log::debug!("overlay cap {} reached; page {page} stays bare", self.cap);
                break;
            }
            self.materialize(page)?;
        }
        log::debug!(
            "reconciled around page {focus}: {} live, {} pooled",
            self.live.len(),
            self.free.len()
        );
        Ok(())
    }

    /// Switch every overlay between drawing and panning
    pub fn set_mode(&mut self, mode: InteractionMode) {
        self.mode = mode;
        self.propagate_tool_and_mode();
    }

    /// Select a tool; selecting the active tool again toggles draw and pan
    pub fn select_tool(&mut self, tool: ToolKind) {
        if tool == self.active_tool() {
            self.mode = match self.mode {
                InteractionMode::Draw => InteractionMode::Pan,
                InteractionMode::Pan => InteractionMode::Draw,
            };
        } else {
            self.context.tools.borrow_mut().set_active(tool);
            self.mode = InteractionMode::Draw;
        }
        self.propagate_tool_and_mode();
    }

    pub fn on_pointer_down(&mut self, page: u32, event: &PointerEvent) -> EventDisposition {
        self.overlay_mut(page)
            .map_or(EventDisposition::Ignored, |overlay| overlay.on_pointer_down(event))
    }

    pub fn on_pointer_move(&mut self, page: u32, event: &PointerEvent) -> EventDisposition {
        self.overlay_mut(page)
            .map_or(EventDisposition::Ignored, |overlay| overlay.on_pointer_move(event))
    }

    pub fn on_pointer_up(
        &mut self,
        page: u32,
        event: &PointerEvent,
    ) -> Result<EventDisposition, RenderError> {
        match self.overlay_mut(page) {
            Some(overlay) => overlay.on_pointer_up(event),
            None => Ok(EventDisposition::Ignored),
        }
    }

    pub fn on_pointer_cancel(&mut self, page: u32, event: &PointerEvent) -> EventDisposition {
        self.overlay_mut(page)
            .map_or(EventDisposition::Ignored, |overlay| overlay.on_pointer_cancel(event))
    }

    /// Feed a raw touch event through palm rejection and the double-tap recognizer
    pub fn on_touch(&mut self, event: &TouchEvent) -> Result<EventDisposition, RenderError> {
        if self.context.palm.suppresses_touch(event.timestamp) {
            self.double_tap.reset();
            return Ok(EventDisposition::Handled);
        }
        if !self.context.settings.borrow().double_tap_undo {
            return Ok(EventDisposition::Ignored);
        }

        match self.double_tap.on_touch(event) {
            TapOutcome::DoubleTap => {
                self.request_undo(event.timestamp)?;
                Ok(EventDisposition::Handled)
            }
            TapOutcome::FirstTap | TapOutcome::None => Ok(EventDisposition::Ignored),
        }
    }

    /// Undo on the most visible overlay
    pub fn request_undo(&mut self, now: f64) -> Result<bool, RenderError> {
        match self.active_page().and_then(|page| self.overlay_mut(page)) {
            Some(overlay) => overlay.request_undo(now),
            None => Ok(false),
        }
    }

    /// Redo on the most visible overlay
    pub fn request_redo(&mut self, now: f64) -> Result<bool, RenderError> {
        match self.active_page().and_then(|page| self.overlay_mut(page)) {
            Some(overlay) => overlay.request_redo(now),
            None => Ok(false),
        }
    }

    /// Run one animation frame on every live overlay, then service autosave
    pub fn on_animation_frame(&mut self, now: Instant) -> Result<(), RenderError> {
        let mut first_error = None;
        for &slot in self.live.values() {
            if let Err(error) = self.slots[slot].on_animation_frame() {
                log::error!("overlay frame failed: {error}");
                first_error.get_or_insert(error);
            }
        }
        self.service_autosave(now);
        first_error.map_or(Ok(()), Err)
    }

    /// Save right away, bypassing the debounce
    ///
    /// Failures are returned to the caller instead of being retried.
    pub fn save_now(&mut self) -> Result<SaveOutcome, StoreError> {
        self.collect_events();
        self.autosave.flush();
        self.write_document()
    }

    /// Replace the session with the stored document
    ///
    /// Returns `false` when the store has nothing usable; the session is
    /// then left untouched.
    pub fn load(&mut self) -> Result<bool, RenderError> {
        let Some(document) = self.store.load(&self.document_id) else {
            log::debug!("no stored annotations for {}", self.document_id);
            return Ok(false);
        };
        log::debug!("loaded {} strokes for {}", document.stroke_count(), self.document_id);
        self.context.session.borrow_mut().load_document(document);
        self.autosave.cancel();

        for &slot in self.live.values() {
            self.slots[slot].redraw_all()?;
        }
        Ok(true)
    }

    /// Save pending changes and deallocate every overlay
    pub fn teardown(&mut self) {
        let dirty = self.collect_events();
        if self.autosave.flush() || dirty {
            if let Err(error) = self.write_document() {
                log::error!("saving annotations on teardown failed: {error}");
            }
        }

        for overlay in &mut self.slots {
            overlay.detach();
        }
        log::debug!("tearing down {} overlays", self.slots.len());
        self.slots.clear();
        self.free.clear();
        self.live.clear();
        self.double_tap.reset();
        self.context.palm.reset();
    }

    fn propagate_tool_and_mode(&mut self) {
        let tool = self.active_tool();
        for &slot in self.live.values() {
            let overlay = &mut self.slots[slot];
            overlay.set_tool(tool);
            overlay.set_mode(self.mode);
        }
    }

    /// Detach the overlay of `page` into the pool
    fn release(&mut self, page: u32) {
        if let Some(slot) = self.live.remove(&page) {
            self.slots[slot].detach();
            self.free.push(slot);
        }
    }

    /// Bind an overlay to `page`, reusing a pooled one when possible
    fn materialize(&mut self, page: u32) -> Result<bool, RenderError> {
        let (Some(element), Some(geometry)) = (self.host.element(page), self.host.geometry(page))
        else {
            log::debug!("page {page} has no element yet");
            return Ok(false);
        };
        let ratio = self.host.device_pixel_ratio();

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot].rebind(page, element);
                slot
            }
            None => {
                let cap = self.context.settings.borrow().device_pixel_ratio_cap;
                let layout = SurfaceLayout::compute(&geometry, ratio, cap, self.context.platform);
                let renderer =
                    self.factory.renderer_for_overlay(layout.pixel_width, layout.pixel_height)?;
                self.slots.push(OverlayManager::new(page, element, renderer, self.context.clone()));
                self.slots.len() - 1
            }
        };

        let tool = self.active_tool();
        let overlay = &mut self.slots[slot];
        overlay.set_tool(tool);
        overlay.set_mode(self.mode);
        match overlay.mount(&geometry, ratio) {
            Ok(()) => {
                self.live.insert(page, slot);
                Ok(true)
            }
            Err(error) => {
                overlay.detach();
                self.free.push(slot);
                Err(error)
            }
        }
    }

    /// Move outbox events to the host queue; returns whether any dirtied the document
    fn collect_events(&mut self) -> bool {
        let mut dirty = false;
        for event in self.context.outbox.drain() {
            dirty |= event.modifies_document();
            self.events.push(event);
        }
        dirty
    }

    fn service_autosave(&mut self, now: Instant) {
        if self.collect_events() {
            self.autosave.trigger(now);
            log::debug!(
                "autosave deferred to {:?} after {} changes",
                self.autosave.deadline(),
                self.autosave.triggers()
            );
        }
        if !self.autosave.fire_if_due(now) {
            return;
        }
        if let Err(error) = self.write_document() {
            log::error!("autosave failed, retrying: {error}");
            self.events.push(InkEvent::SaveFailed { message: error.to_string() });
            self.autosave.trigger(now);
        }
    }

    fn write_document(&mut self) -> Result<SaveOutcome, StoreError> {
        let document = {
            let session = self.context.session.borrow();
            if !session.has_strokes() {
                log::debug!("nothing to save for {}", self.document_id);
                return Ok(SaveOutcome::NothingToSave);
            }
            session.to_document()
        };

        let strokes = document.stroke_count();
        self.store.save(&self.document_id, &document)?;
        log::debug!("saved {strokes} strokes for {}", self.document_id);
        self.events.push(InkEvent::Saved { strokes });
        Ok(SaveOutcome::Saved { strokes })
    }
}
