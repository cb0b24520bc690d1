//! Shared state for the request handler.

use std::path::PathBuf;
use std::sync::Arc;

use kiln_build::Pipeline;
use kiln_cache::ArtifactCache;

/// Everything a request needs. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    /// Project root that request paths are resolved against.
    pub root: Arc<PathBuf>,
    /// The artifact cache shared with the build driver.
    pub cache: ArtifactCache,
    /// Transform used for on-demand script requests.
    pub pipeline: Pipeline,
}
