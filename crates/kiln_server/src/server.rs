//! Server instance lifecycle: start, serve, close and the shutdown hook.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use axum::Router;
use kiln_build::{BuildDriver, BuildStatus, DriverState, InterceptingFs, OxcEngine, Pipeline, Reporter};
use kiln_cache::{ArtifactCache, Fingerprint, SnapshotStore};
use kiln_config::{read_manifest, BuildMode, ServerOptions};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::error::ServerError;
use crate::handler;
use crate::state::AppState;

/// One dev server instance and every resource it owns.
///
/// Dropping the instance closes its build driver. The cache is only written
/// to disk by [`persist`](Self::persist) or [`shutdown`](Self::shutdown).
pub struct DevServer {
    root: PathBuf,
    options: ServerOptions,
    cache: ArtifactCache,
    pipeline: Pipeline,
    snapshots: SnapshotStore,
    driver: Mutex<BuildDriver>,
    status: BuildStatus,
}

impl DevServer {
    /// Starts a server instance for the project at `root`.
    ///
    /// Seeds the artifact cache from the snapshot matching the current
    /// fingerprint, then runs the first build pass before returning.
    pub fn start(
        root: impl AsRef<Path>,
        options: ServerOptions,
        mode: BuildMode,
        reporter: Reporter,
    ) -> Result<Self, ServerError> {
        let requested = root.as_ref();
        let root = requested.canonicalize().map_err(|e| ServerError::Root {
            path: requested.to_path_buf(),
            source: e,
        })?;

        let fingerprint = Fingerprint::compute(&read_manifest(&root), &options)?;
        let snapshots = SnapshotStore::new(&options.snapshot_dir(), fingerprint);
        let cache = ArtifactCache::new();
        let restored = snapshots.load_into(&cache);

        let pipeline = Pipeline::new(options.transform.clone());
        let fs = InterceptingFs::new(
            &root,
            options.tsconfig_text(),
            cache.clone(),
            pipeline.clone(),
        );
        let driver = BuildDriver::start(&root, OxcEngine::new(&root), fs, mode, reporter)?;
        let status = driver.status().clone();

        tracing::info!(
            root = %root.display(),
            fingerprint = %fingerprint,
            restored,
            mode = ?mode,
            "dev server started"
        );

        Ok(Self {
            root,
            options,
            cache,
            pipeline,
            snapshots,
            driver: Mutex::new(driver),
            status,
        })
    }

    /// The catch-all router serving this instance.
    pub fn router(&self) -> Router {
        let state = AppState {
            root: Arc::new(self.root.clone()),
            cache: self.cache.clone(),
            pipeline: self.pipeline.clone(),
        };
        Router::new()
            .fallback(handler::handle)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Serves requests on `listener` until `shutdown` resolves, then closes
    /// the build driver.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("kiln listening on http://{addr}");
        }
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        self.close();
        Ok(())
    }

    /// Tears down the watch session. Closing twice is a no-op.
    pub fn close(&self) {
        self.driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .close();
    }

    /// Writes the artifact cache to its snapshot file. Failures are logged.
    pub fn persist(&self) {
        self.snapshots.persist(&self.cache);
    }

    /// Shutdown hook: persists the cache, closes the build and returns the
    /// process exit code.
    pub fn shutdown(self) -> i32 {
        self.persist();
        self.close();
        self.status.exit_code()
    }

    /// The project root (canonicalized).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The options this instance was started with.
    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// The shared artifact cache.
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Outcome of the build passes so far.
    pub fn status(&self) -> &BuildStatus {
        &self.status
    }

    /// Current build driver state.
    pub fn driver_state(&self) -> DriverState {
        self.driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state()
    }

    /// Path of the snapshot file this instance reads and writes.
    pub fn snapshot_path(&self) -> &Path {
        self.snapshots.path()
    }
}
