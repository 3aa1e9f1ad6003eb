//! Host-facing notifications
//!
//! Overlays push into a shared [`EventOutbox`]; the viewport controller
//! drains it on every frame to re-arm autosave and forwards the events to
//! the host.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Something the host may want to react to
#[derive(Debug, Clone, PartialEq)]
pub enum InkEvent {
    /// A stroke was committed to `page`
    StrokeCommitted { page: u32 },

    /// Undo or redo changed the strokes of `page`
    HistoryChanged { page: u32 },

    /// The document was written to the store
    Saved { strokes: usize },

    /// Writing the document failed; annotations remain in memory
    SaveFailed { message: String },
}

impl InkEvent {
    /// Whether the event dirties the document
    pub fn modifies_document(&self) -> bool {
        matches!(self, InkEvent::StrokeCommitted { .. } | InkEvent::HistoryChanged { .. })
    }
}

/// Single-threaded event queue shared between overlays and the controller
#[derive(Debug, Clone, Default)]
pub struct EventOutbox {
    queue: Rc<RefCell<VecDeque<InkEvent>>>,
}

impl EventOutbox {
    /// Create a new empty outbox
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: InkEvent) {
        self.queue.borrow_mut().push_back(event);
    }

    /// Remove and return every queued event, oldest first
    pub fn drain(&self) -> Vec<InkEvent> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_queue() {
        let outbox = EventOutbox::new();
        let overlay_side = outbox.clone();
        overlay_side.push(InkEvent::StrokeCommitted { page: 3 });
        overlay_side.push(InkEvent::Saved { strokes: 1 });

        assert_eq!(outbox.len(), 2);
        let events = outbox.drain();
        assert!(events[0].modifies_document());
        assert!(!events[1].modifies_document());
        assert!(overlay_side.is_empty());
    }
}
