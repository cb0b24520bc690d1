//! File-system capability used by build engines, with a real implementation
//! and an intercepting decorator that routes reads and writes through the
//! artifact cache.

use std::io;
use std::path::{Path, PathBuf};

use kiln_cache::{ArtifactCache, BUILD_INFO_KEY};
use kiln_config::PROJECT_CONFIG_FILE;

use crate::paths::artifact_key;
use crate::transform::Pipeline;

/// The reads and writes a build engine performs.
pub trait FileSystem: Send + Sync {
    /// Reads a whole file as UTF-8 text.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Writes `contents` to `path`, replacing any previous content.
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;
}

/// Passes every operation to `std::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RealFs;

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        std::fs::write(path, contents)
    }
}

/// Decorates a [`FileSystem`] so that a build never touches disk for its
/// configuration, its build state, or its output.
///
/// - `<root>/tsconfig.json` is served from the configured override when set.
/// - `<root>/tsconfig.tsbuildinfo` is served from the artifact cache.
/// - Every write is stored in the artifact cache under its
///   [`artifact_key`]: build state verbatim, everything else through the
///   [`Pipeline`].
///
/// All other reads go to the inner file system.
pub struct InterceptingFs<F: FileSystem = RealFs> {
    inner: F,
    root: PathBuf,
    config_override: Option<String>,
    cache: ArtifactCache,
    pipeline: Pipeline,
}

impl InterceptingFs<RealFs> {
    /// Creates an adapter over the real file system.
    pub fn new(
        root: impl Into<PathBuf>,
        config_override: Option<String>,
        cache: ArtifactCache,
        pipeline: Pipeline,
    ) -> Self {
        Self::with_inner(RealFs, root, config_override, cache, pipeline)
    }
}

impl<F: FileSystem> InterceptingFs<F> {
    /// Creates an adapter over an arbitrary inner file system.
    pub fn with_inner(
        inner: F,
        root: impl Into<PathBuf>,
        config_override: Option<String>,
        cache: ArtifactCache,
        pipeline: Pipeline,
    ) -> Self {
        Self {
            inner,
            root: root.into(),
            config_override,
            cache,
            pipeline,
        }
    }

    /// The project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The cache that receives writes.
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    fn is_root_file(&self, path: &Path, name: &str) -> bool {
        path.strip_prefix(&self.root)
            .map(|rel| rel == Path::new(name))
            .unwrap_or(path == Path::new(name))
    }
}

impl<F: FileSystem> FileSystem for InterceptingFs<F> {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        if self.is_root_file(path, PROJECT_CONFIG_FILE) {
            if let Some(config) = &self.config_override {
                return Ok(config.clone());
            }
        }
        if self.is_root_file(path, BUILD_INFO_KEY) {
            return self.cache.build_info().ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "no build state in cache")
            });
        }
        self.inner.read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let key = artifact_key(&self.root, path);
        if key == BUILD_INFO_KEY {
            self.cache.insert(key, contents);
        } else {
            let output = self.pipeline.transform(&key, contents);
            tracing::debug!(key = %key, bytes = output.len(), "cached artifact");
            self.cache.insert(key, output);
        }
        Ok(())
    }
}
