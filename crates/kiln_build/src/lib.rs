//! Incremental, watch-driven builds feeding the artifact cache.
//!
//! A [`BuildDriver`] runs a [`BuildEngine`] against an [`InterceptingFs`].
//! Every file the engine emits is written through the adapter, which
//! normalizes the path into an artifact key and stores either the raw build
//! state or the [`Pipeline`] output in the shared
//! [`ArtifactCache`](kiln_cache::ArtifactCache).

#![warn(missing_docs)]

pub mod driver;
pub mod engine;
pub mod error;
pub mod fs;
pub mod paths;
pub mod status;
pub mod transform;

pub use driver::{report, BuildDriver, DriverState, Reporter};
pub use engine::{BuildEngine, BuildOutput, OxcEngine};
pub use error::BuildError;
pub use fs::{FileSystem, InterceptingFs, RealFs};
pub use paths::artifact_key;
pub use status::BuildStatus;
pub use transform::Pipeline;
