//! Error types for starting and running the build driver.

use std::path::PathBuf;

/// Errors that prevent the build driver from starting.
///
/// Compile problems are never errors: they are diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// An I/O error occurred while setting up the build.
    #[error("build I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file watcher could not be created or attached.
    #[error("failed to watch project: {0}")]
    Watch(#[from] notify::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = BuildError::Io {
            path: PathBuf::from("/project"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "spawn failed"),
        };
        assert!(err.to_string().contains("/project"));
    }

    #[test]
    fn watch_error_display() {
        let err = BuildError::from(notify::Error::generic("inotify limit reached"));
        assert!(err.to_string().starts_with("failed to watch project"));
    }
}
