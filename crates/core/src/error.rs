//! Error types for the ink core

/// Failure to decode or encode an annotation document
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("malformed annotation document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failure reported by an annotation store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
