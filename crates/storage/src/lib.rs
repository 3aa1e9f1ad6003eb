//! JSON sidecar store for ink annotations
//!
//! Each viewed document gets one `.ink.json` file holding its
//! [`SerializedDocument`]. Where that file lives is decided by a
//! [`SidecarLayout`]; loading also probes the locations older layouts wrote
//! to, so switching layouts never loses annotations.

use directories::ProjectDirs;
use pdf_ink_core::{AnnotationStore, SerializedDocument, StoreError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Suffix appended to the document id to form a sidecar name
pub const SIDECAR_SUFFIX: &str = ".ink.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<StorageError> for StoreError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Io(error) => StoreError::Io(error),
            StorageError::Serde(error) => StoreError::Serde(error),
            StorageError::NoDataDirectory => {
                StoreError::Unavailable(StorageError::NoDataDirectory.to_string())
            }
        }
    }
}

/// Placement of sidecar files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidecarLayout {
    /// `<id>.ink.json` next to the document
    Sibling,
    /// `<root>/<id>.ink.json`, mirroring the document's folders
    Mirror,
    /// `<root>/<basename>.<hash>.ink.json` in a single folder
    #[default]
    Flat,
}

/// FNV-1a 32-bit hash of `input`'s UTF-16 code units as 8 hex digits
pub fn short_hash(input: &str) -> String {
    let hash = input
        .encode_utf16()
        .fold(2_166_136_261_u32, |h, unit| (h ^ u32::from(unit)).wrapping_mul(16_777_619));
    format!("{hash:08x}")
}

fn with_suffix(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Sidecar store rooted at a folder
#[derive(Debug, Clone)]
pub struct SidecarStore {
    root: PathBuf,
    layout: SidecarLayout,
}

impl SidecarStore {
    /// Store rooted in the platform's local data directory
    pub fn from_default_project(layout: SidecarLayout) -> Result<Self, StorageError> {
        let dirs =
            ProjectDirs::from("dev", "PdfInk", "PdfInk").ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().join("annotations"), layout })
    }

    pub fn with_root(root: impl Into<PathBuf>, layout: SidecarLayout) -> Self {
        Self { root: root.into(), layout }
    }

    /// Store that keeps every sidecar next to its document
    pub fn sibling() -> Self {
        Self { root: PathBuf::new(), layout: SidecarLayout::Sibling }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> SidecarLayout {
        self.layout
    }

    /// Path written by [`SidecarStore::save_document`]
    pub fn resolve_path(&self, id: &str) -> PathBuf {
        match self.layout {
            SidecarLayout::Sibling => self.sibling_path(id),
            SidecarLayout::Mirror => self.mirror_path(id),
            SidecarLayout::Flat => self.flat_path(id),
        }
    }

    /// Paths probed on load, most specific first
    pub fn candidate_paths(&self, id: &str) -> Vec<PathBuf> {
        match self.layout {
            SidecarLayout::Sibling => vec![self.sibling_path(id)],
            SidecarLayout::Mirror => vec![self.mirror_path(id), self.sibling_path(id)],
            SidecarLayout::Flat => {
                vec![self.flat_path(id), self.mirror_path(id), self.sibling_path(id)]
            }
        }
    }

    /// Load the first candidate that parses
    ///
    /// Accepts the versioned envelope and a bare page map. Unreadable or
    /// malformed files are skipped with a warning.
    pub fn load_document(&self, id: &str) -> Option<SerializedDocument> {
        for path in self.candidate_paths(id) {
            if !path.is_file() {
                continue;
            }
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(error) => {
                    log::warn!("unable to read {}: {error}", path.display());
                    continue;
                }
            };
            match SerializedDocument::from_json_lenient(&text) {
                Ok(document) => {
                    log::debug!("loaded annotations from {}", path.display());
                    return Some(document);
                }
                Err(error) => log::warn!("ignoring malformed sidecar {}: {error}", path.display()),
            }
        }
        None
    }

    /// Write pretty-printed JSON through a temporary file, creating folders
    pub fn save_document(
        &self,
        id: &str,
        document: &SerializedDocument,
    ) -> Result<PathBuf, StorageError> {
        let path = self.resolve_path(id);
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let bytes = serde_json::to_vec_pretty(document)?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;

        log::debug!("saved {} strokes to {}", document.stroke_count(), path.display());
        Ok(path)
    }

    fn sibling_path(&self, id: &str) -> PathBuf {
        with_suffix(Path::new(id))
    }

    fn mirror_path(&self, id: &str) -> PathBuf {
        // Absolute ids are mirrored below the root too
        let relative: PathBuf = Path::new(id)
            .components()
            .filter(|component| matches!(component, Component::Normal(_)))
            .collect();
        with_suffix(&self.root.join(relative))
    }

    fn flat_path(&self, id: &str) -> PathBuf {
        let base = id.rsplit('/').next().unwrap_or(id);
        self.root.join(format!("{base}.{}{SIDECAR_SUFFIX}", short_hash(id)))
    }
}

impl AnnotationStore for SidecarStore {
    fn load(&self, id: &str) -> Option<SerializedDocument> {
        self.load_document(id)
    }

    fn save(&self, id: &str, document: &SerializedDocument) -> Result<(), StoreError> {
        self.save_document(id, document).map(|_| ()).map_err(StoreError::from)
    }
}
