//! Document session
//!
//! Owns every page's committed strokes and the per-page redo history.
//! Undo and redo are strictly per page: there is no cross-page ordering.

use crate::document::{PageState, SerializedDocument};
use crate::error::SessionError;
use crate::history::RedoStack;
use crate::stroke::Stroke;
use std::collections::BTreeMap;

/// In-memory annotation state of one open document
#[derive(Debug, Clone, Default)]
pub struct DocumentSession {
    /// Committed strokes by page index
    pages: BTreeMap<u32, PageState>,

    /// Redo stacks by page index
    history: BTreeMap<u32, RedoStack>,
}

impl DocumentSession {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable state for page `index`, created on first access
    pub fn page(&mut self, index: u32) -> &mut PageState {
        self.pages.entry(index).or_default()
    }

    /// Committed strokes of page `index` without creating the page
    pub fn strokes(&self, index: u32) -> &[Stroke] {
        self.pages.get(&index).map(|page| page.strokes.as_slice()).unwrap_or(&[])
    }

    /// Commit a stroke to page `index`
    ///
    /// Discards the page's redo branch; a following undo removes exactly
    /// this stroke.
    pub fn add_stroke(&mut self, index: u32, stroke: Stroke) {
        self.history_for(index).clear();
        self.page(index).strokes.push(stroke);
    }

    /// Move the last stroke of page `index` onto its redo stack
    ///
    /// Returns `false` when the page had nothing to undo.
    pub fn undo(&mut self, index: u32) -> bool {
        let Some(stroke) = self.page(index).strokes.pop() else {
            return false;
        };
        self.history_for(index).push(stroke);
        true
    }

    /// Re-append the most recently undone stroke of page `index`
    ///
    /// Returns `false` when there was nothing to redo.
    pub fn redo(&mut self, index: u32) -> bool {
        let Some(stroke) = self.history_for(index).pop() else {
            return false;
        };
        self.page(index).strokes.push(stroke);
        true
    }

    /// Whether page `index` has a pending redo
    pub fn can_redo(&self, index: u32) -> bool {
        self.history.get(&index).is_some_and(|stack| !stack.is_empty())
    }

    /// Whether any page holds a committed stroke
    pub fn has_strokes(&self) -> bool {
        self.pages.values().any(|page| !page.is_empty())
    }

    /// Total committed strokes across all pages
    pub fn stroke_count(&self) -> usize {
        self.pages.values().map(|page| page.strokes.len()).sum()
    }

    /// Indices of pages that currently hold strokes
    pub fn page_indices(&self) -> Vec<u32> {
        self.pages.iter().filter(|(_, page)| !page.is_empty()).map(|(index, _)| *index).collect()
    }

    /// Snapshot the session, omitting empty pages
    pub fn to_document(&self) -> SerializedDocument {
        let pages = self
            .pages
            .iter()
            .filter(|(_, page)| !page.is_empty())
            .map(|(index, page)| (*index, page.clone()))
            .collect();
        SerializedDocument::new(pages)
    }

    /// Replace every page with the contents of `document`
    ///
    /// This is a full replacement, not a merge. Empty pages are dropped and
    /// all redo history is reset.
    pub fn load_document(&mut self, document: SerializedDocument) {
        self.pages = document
            .pages
            .into_iter()
            .filter_map(|(index, mut page)| {
                page.strokes.retain(|stroke| !stroke.points.is_empty());
                (!page.is_empty()).then_some((index, page))
            })
            .collect();
        self.history.clear();
    }

    /// Encode the session as pretty JSON
    pub fn to_json(&self) -> Result<String, SessionError> {
        self.to_document().to_json_pretty()
    }

    /// Replace the session from JSON text, tolerating malformed pages
    pub fn from_json(&mut self, text: &str) -> Result<(), SessionError> {
        let document = SerializedDocument::from_json_lenient(text)?;
        self.load_document(document);
        Ok(())
    }

    fn history_for(&mut self, index: u32) -> &mut RedoStack {
        self.history.entry(index).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::{DeviceKind, Point, ToolKind};

    fn stroke(tag: f32) -> Stroke {
        Stroke {
            tool: ToolKind::Pen,
            device: DeviceKind::Pen,
            color: "#112233".to_string(),
            size: 2.0,
            ref_w: 640.0,
            ref_h: 480.0,
            opacity: 0.8,
            points: vec![
                Point::new(tag, 0.1, 0.25, 0.0),
                Point::new(tag, 0.9, 0.75, 16.0).with_orientation(Some(0.3), Some(45.0)),
            ],
        }
    }

    #[test]
    fn test_page_created_lazily() {
        let mut session = DocumentSession::new();
        assert!(session.strokes(3).is_empty());
        assert!(session.page_indices().is_empty());

        session.page(3);
        assert!(!session.has_strokes());
    }

    #[test]
    fn test_undo_then_redo_restores_sequence() {
        let mut session = DocumentSession::new();
        session.add_stroke(0, stroke(0.1));
        session.add_stroke(0, stroke(0.2));
        session.add_stroke(0, stroke(0.3));
        let before = session.strokes(0).to_vec();

        assert!(session.undo(0));
        assert!(session.undo(0));
        assert_eq!(session.strokes(0).len(), 1);
        assert!(session.redo(0));
        assert!(session.redo(0));

        assert_eq!(session.strokes(0), before.as_slice());
        assert!(!session.can_redo(0));
    }

    #[test]
    fn test_commit_after_undo_discards_redo() {
        let mut session = DocumentSession::new();
        session.add_stroke(1, stroke(0.1));
        session.undo(1);
        assert!(session.can_redo(1));

        session.add_stroke(1, stroke(0.5));
        assert!(!session.redo(1));
        assert_eq!(session.strokes(1), &[stroke(0.5)]);
    }

    #[test]
    fn test_history_is_per_page() {
        let mut session = DocumentSession::new();
        session.add_stroke(0, stroke(0.1));
        session.add_stroke(1, stroke(0.2));

        assert!(session.undo(1));
        assert!(!session.redo(0));
        assert_eq!(session.strokes(0).len(), 1);
        assert!(!session.undo(7));
    }

    #[test]
    fn test_json_round_trip_omits_empty_pages() {
        let mut session = DocumentSession::new();
        session.add_stroke(2, stroke(0.4));
        session.add_stroke(2, stroke(0.6));
        session.add_stroke(5, stroke(0.7));
        session.undo(5);
        session.page(9);

        let json = session.to_json().expect("session should encode");

        let mut restored = DocumentSession::new();
        restored.from_json(&json).expect("session should decode");

        assert_eq!(restored.page_indices(), vec![2]);
        assert_eq!(restored.strokes(2), session.strokes(2));
        assert!(restored.strokes(5).is_empty());
    }

    #[test]
    fn test_reload_replaces_and_resets_history() {
        let mut session = DocumentSession::new();
        session.add_stroke(0, stroke(0.1));
        session.add_stroke(4, stroke(0.2));
        session.undo(4);

        let mut other = DocumentSession::new();
        other.add_stroke(1, stroke(0.9));
        session.load_document(other.to_document());

        assert_eq!(session.page_indices(), vec![1]);
        assert!(session.strokes(0).is_empty());
        assert!(!session.redo(4));
    }

    #[test]
    fn test_from_json_rejects_garbage_without_clearing() {
        let mut session = DocumentSession::new();
        session.add_stroke(0, stroke(0.1));

        assert!(session.from_json("{{").is_err());
        assert_eq!(session.stroke_count(), 1);
    }
}
