//! Persistence collaborator

use crate::document::SerializedDocument;
use crate::error::StoreError;

/// Loads and saves the annotation document of one viewed document
///
/// `id` identifies the viewed document (typically its path). Implementations
/// treat missing or unreadable data as absent rather than as an error.
pub trait AnnotationStore {
    fn load(&self, id: &str) -> Option<SerializedDocument>;

    fn save(&self, id: &str, document: &SerializedDocument) -> Result<(), StoreError>;
}
