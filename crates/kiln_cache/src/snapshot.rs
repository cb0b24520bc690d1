//! Persisted snapshots of the artifact cache.
//!
//! A snapshot is the whole [`ArtifactCache`] serialized as one JSON object
//! and written to `<dir>/kiln-<fingerprint>.json`. Snapshots are read once at
//! startup and overwritten on graceful shutdown; they are never deleted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::artifact::ArtifactCache;
use crate::error::CacheError;
use crate::fingerprint::Fingerprint;

/// Reads and writes the snapshot file named by one [`Fingerprint`].
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Creates a store for the snapshot of `fingerprint` inside `dir`.
    pub fn new(dir: &Path, fingerprint: Fingerprint) -> Self {
        Self {
            path: dir.join(fingerprint.file_name()),
        }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the snapshot file.
    pub fn load(&self) -> Result<BTreeMap<String, String>, CacheError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| CacheError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Merges the snapshot into `cache`, returning the number of entries loaded.
    ///
    /// This is fail-safe: a missing or malformed snapshot loads nothing.
    pub fn load_into(&self, cache: &ArtifactCache) -> usize {
        match self.load() {
            Ok(entries) => {
                let count = entries.len();
                cache.extend(entries);
                tracing::debug!(path = %self.path.display(), count, "loaded cache snapshot");
                count
            }
            Err(CacheError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                tracing::debug!(path = %self.path.display(), "no cache snapshot");
                0
            }
            Err(e) => {
                tracing::warn!("ignoring unreadable cache snapshot: {e}");
                0
            }
        }
    }

    /// Writes the full contents of `cache` to the snapshot file.
    ///
    /// Creates the snapshot directory if it doesn't exist.
    pub fn save(&self, cache: &ArtifactCache) -> Result<(), CacheError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| CacheError::Io {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string(&cache.snapshot())?;
        std::fs::write(&self.path, json).map_err(|e| CacheError::Io {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Best-effort [`save`](Self::save): failures are logged and dropped.
    pub fn persist(&self, cache: &ArtifactCache) {
        match self.save(cache) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), entries = cache.len(), "saved cache snapshot")
            }
            Err(e) => tracing::warn!("failed to save cache snapshot: {e}"),
        }
    }
}
