//! Persisted annotation document
//!
//! Wire format of the sidecar file:
//!
//! ```json
//! { "version": 4, "updated": 1700000000000, "pages": { "0": { "strokes": [] } } }
//! ```
//!
//! Older files may hold only the bare page map without the envelope.

use crate::error::SessionError;
use crate::stroke::Stroke;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current document schema version
pub const DOCUMENT_VERSION: u32 = 4;

/// Committed strokes of one page, in draw order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageState {
    pub strokes: Vec<Stroke>,
}

impl PageState {
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}

/// Snapshot of every annotated page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedDocument {
    pub version: u32,
    /// Milliseconds since the Unix epoch
    pub updated: u64,
    pub pages: BTreeMap<u32, PageState>,
}

impl SerializedDocument {
    /// Create a document stamped with the current time
    pub fn new(pages: BTreeMap<u32, PageState>) -> Self {
        Self { version: DOCUMENT_VERSION, updated: now_millis(), pages }
    }

    /// Total committed strokes across all pages
    pub fn stroke_count(&self) -> usize {
        self.pages.values().map(|page| page.strokes.len()).sum()
    }

    /// Parse a document, skipping whatever does not parse
    ///
    /// Accepts both the versioned envelope and a bare page map. Pages with
    /// a non-numeric key, strokes that fail to decode and strokes without
    /// points are dropped; pages left empty are omitted. Only text that is
    /// not JSON at all is an error.
    pub fn from_json_lenient(text: &str) -> Result<Self, SessionError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value_lenient(value))
    }

    /// Lenient decoding of an already parsed JSON value
    pub fn from_value_lenient(value: Value) -> Self {
        let Value::Object(mut root) = value else {
            log::warn!("annotation document is not a JSON object, treating as empty");
            return Self::new(BTreeMap::new());
        };

        let (version, updated, raw_pages) = match root.remove("pages") {
            Some(Value::Object(pages)) => {
                let version = root
                    .get("version")
                    .and_then(Value::as_u64)
                    .and_then(|v| u32::try_from(v).ok())
                    .unwrap_or(DOCUMENT_VERSION);
                let updated =
                    root.get("updated").and_then(Value::as_u64).unwrap_or_else(now_millis);
                (version, updated, pages)
            }
            Some(_) => {
                log::warn!("annotation document has a non-object page map, treating as empty");
                (DOCUMENT_VERSION, now_millis(), Map::new())
            }
            None => (DOCUMENT_VERSION, now_millis(), root),
        };

        let mut pages = BTreeMap::new();
        for (key, page) in raw_pages {
            let Ok(index) = key.parse::<u32>() else {
                log::warn!("skipping annotation page with invalid index {key:?}");
                continue;
            };
            let strokes = decode_strokes(index, page);
            if !strokes.is_empty() {
                pages.insert(index, PageState { strokes });
            }
        }

        Self { version, updated, pages }
    }

    /// Encode as pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn decode_strokes(index: u32, page: Value) -> Vec<Stroke> {
    let raw = match page {
        Value::Object(mut fields) => fields.remove("strokes"),
        _ => None,
    };
    let Some(Value::Array(raw)) = raw else {
        return Vec::new();
    };

    let mut strokes = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value::<Stroke>(value) {
            Ok(stroke) if !stroke.points.is_empty() => strokes.push(stroke),
            Ok(_) => {}
            Err(error) => log::warn!("skipping malformed stroke on page {index}: {error}"),
        }
    }
    strokes
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
