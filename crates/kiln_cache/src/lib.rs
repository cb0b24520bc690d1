//! Artifact caching and snapshot persistence.
//!
//! The [`ArtifactCache`] maps project-relative paths to served text. It is
//! seeded at startup from the [`SnapshotStore`] named by the current
//! [`Fingerprint`] and written back to it on graceful shutdown.

#![warn(missing_docs)]

pub mod artifact;
pub mod error;
pub mod fingerprint;
pub mod snapshot;

pub use artifact::{ArtifactCache, BUILD_INFO_KEY};
pub use error::CacheError;
pub use fingerprint::Fingerprint;
pub use snapshot::SnapshotStore;
