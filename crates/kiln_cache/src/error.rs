//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur while computing fingerprints or reading and writing
/// snapshots.
///
/// Callers at the server boundary treat every variant as fail-safe: a failed
/// load is a cache miss and a failed save is logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing a snapshot file.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization {
            reason: err.to_string(),
        }
    }
}
