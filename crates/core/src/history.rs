//! Per-page redo history

use crate::stroke::Stroke;

/// Strokes popped by undo, waiting to be redone
///
/// Committing a new stroke discards the branch, so the stack is only
/// non-empty right after an undo.
#[derive(Debug, Clone, Default)]
pub struct RedoStack {
    strokes: Vec<Stroke>,
}

impl RedoStack {
    /// Create an empty redo stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a stroke removed by undo
    pub fn push(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    /// Pop the most recently undone stroke
    pub fn pop(&mut self) -> Option<Stroke> {
        self.strokes.pop()
    }

    /// Discard every pending redo
    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }
}
