//! Errors that prevent a server instance from starting or serving.
//!
//! Request-time failures never appear here: they become 404 responses.

use std::path::PathBuf;

use kiln_build::BuildError;
use kiln_cache::CacheError;

/// Errors raised while starting or running a [`DevServer`](crate::DevServer).
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The project root does not exist or cannot be resolved.
    #[error("cannot open project root {path}: {source}")]
    Root {
        /// The requested root.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The cache fingerprint could not be computed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The build driver could not start.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Binding or serving the listener failed.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
