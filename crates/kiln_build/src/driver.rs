//! The build driver: one incremental build for the lifetime of a server.
//!
//! The driver runs a first pass synchronously in [`BuildDriver::start`]. In
//! [`BuildMode::Watch`] it then hands the engine to a watch thread that
//! coalesces file events and runs another pass per burst. In
//! [`BuildMode::OneShot`] the engine is dropped after the first pass.
//! [`BuildDriver::close`] is terminal.

use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use kiln_config::BuildMode;
use kiln_diagnostics::{Diagnostic, DiagnosticRenderer, Severity, SourceDb, TerminalRenderer};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::engine::{BuildEngine, BuildOutput};
use crate::error::BuildError;
use crate::fs::FileSystem;
use crate::paths::is_watch_relevant;
use crate::status::BuildStatus;

/// Quiet period that ends a burst of file events.
const DEBOUNCE: Duration = Duration::from_millis(75);

/// Lifecycle of a [`BuildDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Loading configuration and running the first pass.
    Initializing,
    /// Rebuilding on every relevant file change.
    Watching,
    /// First pass done, watch session torn down. The cache stays populated.
    OneShot,
    /// Closed by its owner. Terminal.
    Closed,
}

/// Renders diagnostics with source context to the diagnostic channel.
pub struct Reporter {
    out: Box<dyn Write + Send>,
    renderer: TerminalRenderer,
}

impl Reporter {
    /// Reports to `out`.
    pub fn new(out: impl Write + Send + 'static, color: bool) -> Self {
        Self {
            out: Box::new(out),
            renderer: TerminalRenderer::new(color),
        }
    }

    /// Reports to standard error.
    pub fn stderr(color: bool) -> Self {
        Self::new(io::stderr(), color)
    }

    /// Reports one pass and returns its error count.
    pub fn report(&mut self, output: &BuildOutput) -> usize {
        report(
            &mut self.out,
            &self.renderer,
            &output.diagnostics,
            &output.sources,
        )
    }
}

/// Writes every diagnostic followed by a one-line summary, and returns the
/// number of errors. A failing writer does not change the count.
pub fn report(
    out: &mut dyn Write,
    renderer: &dyn DiagnosticRenderer,
    diagnostics: &[Diagnostic],
    sources: &SourceDb,
) -> usize {
    let error_count = diagnostics.iter().filter(|d| d.severity.is_error()).count();
    if diagnostics.is_empty() {
        return 0;
    }
    let warning_count = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();

    let written = diagnostics
        .iter()
        .try_for_each(|diag| writeln!(out, "{}", renderer.render(diag, sources)))
        .and_then(|()| {
            writeln!(
                out,
                "   Result: {error_count} error(s), {warning_count} warning(s)"
            )
        })
        .and_then(|()| out.flush());
    if let Err(e) = written {
        tracing::debug!("diagnostics not written: {e}");
    }
    error_count
}

/// Everything a pass needs. Owned by the driver until the first pass is
/// done, then by the watch thread.
struct Session {
    engine: Box<dyn BuildEngine>,
    fs: Box<dyn FileSystem>,
    status: BuildStatus,
    reporter: Reporter,
}

impl Session {
    fn run_pass(&mut self, changed: &[PathBuf]) {
        let started = Instant::now();
        let output = self.engine.build(self.fs.as_ref(), changed);
        for (path, text) in &output.emitted {
            if let Err(e) = self.fs.write(path, text) {
                tracing::warn!(path = %path.display(), "failed to store build output: {e}");
            }
        }
        let errors = self.reporter.report(&output);
        self.status.record_pass(errors);
        tracing::info!(
            emitted = output.emitted.len(),
            errors,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "build pass finished"
        );
    }
}

enum WatchMessage {
    Fs(Event),
    Stop,
}

/// The file watcher and the thread that rebuilds on its events.
struct WatchSession {
    watcher: Option<RecommendedWatcher>,
    tx: Sender<WatchMessage>,
    thread: Option<JoinHandle<()>>,
}

impl WatchSession {
    fn stop(mut self) {
        // No more events once the watcher is gone.
        drop(self.watcher.take());
        let _ = self.tx.send(WatchMessage::Stop);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("watch thread panicked");
            }
        }
    }
}

/// Owns the incremental build session of one server instance.
pub struct BuildDriver {
    root: PathBuf,
    state: DriverState,
    status: BuildStatus,
    watch: Option<WatchSession>,
}

impl BuildDriver {
    /// Runs the first pass and, in watch mode, starts watching `root`.
    ///
    /// Every emitted file is written through `fs`; diagnostics go to
    /// `reporter`.
    pub fn start(
        root: impl Into<PathBuf>,
        engine: impl BuildEngine + 'static,
        fs: impl FileSystem + 'static,
        mode: BuildMode,
        reporter: Reporter,
    ) -> Result<Self, BuildError> {
        let mut driver = Self {
            root: root.into(),
            state: DriverState::Initializing,
            status: BuildStatus::new(),
            watch: None,
        };
        let mut session = Session {
            engine: Box::new(engine),
            fs: Box::new(fs),
            status: driver.status.clone(),
            reporter,
        };

        match mode {
            BuildMode::OneShot => {
                session.run_pass(&[]);
                driver.transition(DriverState::OneShot);
            }
            BuildMode::Watch => {
                // Attach the watcher first so edits made during the first
                // pass are picked up by the watch thread.
                let (tx, rx) = mpsc::channel();
                let mut watcher = create_watcher(tx.clone())?;
                watcher.watch(&driver.root, RecursiveMode::Recursive)?;

                session.run_pass(&[]);

                let root = driver.root.clone();
                let thread = thread::Builder::new()
                    .name("kiln-watch".to_string())
                    .spawn(move || watch_loop(session, &root, rx))
                    .map_err(|e| BuildError::Io {
                        path: driver.root.clone(),
                        source: e,
                    })?;
                driver.watch = Some(WatchSession {
                    watcher: Some(watcher),
                    tx,
                    thread: Some(thread),
                });
                driver.transition(DriverState::Watching);
            }
        }
        Ok(driver)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Shared outcome of all passes so far.
    pub fn status(&self) -> &BuildStatus {
        &self.status
    }

    /// Releases the watcher and joins the watch thread. Closing twice is a
    /// no-op.
    pub fn close(&mut self) {
        if self.state == DriverState::Closed {
            return;
        }
        if let Some(watch) = self.watch.take() {
            watch.stop();
        }
        self.transition(DriverState::Closed);
    }

    fn transition(&mut self, next: DriverState) {
        tracing::debug!(root = %self.root.display(), from = ?self.state, to = ?next, "build driver");
        self.state = next;
    }
}

impl Drop for BuildDriver {
    fn drop(&mut self) {
        self.close();
    }
}

fn create_watcher(tx: Sender<WatchMessage>) -> Result<RecommendedWatcher, BuildError> {
    let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let _ = tx.send(WatchMessage::Fs(event));
        }
        Err(e) => tracing::warn!("file watcher error: {e}"),
    })?;
    Ok(watcher)
}

fn watch_loop(mut session: Session, root: &Path, rx: Receiver<WatchMessage>) {
    loop {
        let mut changed = BTreeSet::new();
        match rx.recv() {
            Ok(WatchMessage::Fs(event)) => collect_changes(root, &event, &mut changed),
            Ok(WatchMessage::Stop) | Err(_) => return,
        }
        if changed.is_empty() {
            continue;
        }

        loop {
            match rx.recv_timeout(DEBOUNCE) {
                Ok(WatchMessage::Fs(event)) => collect_changes(root, &event, &mut changed),
                Ok(WatchMessage::Stop) | Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => break,
            }
        }

        let changed: Vec<PathBuf> = changed.into_iter().collect();
        tracing::debug!(files = changed.len(), "change detected");
        session.run_pass(&changed);
    }
}

fn collect_changes(root: &Path, event: &Event, changed: &mut BTreeSet<PathBuf>) {
    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }
    changed.extend(
        event
            .paths
            .iter()
            .filter(|path| is_watch_relevant(root, path))
            .cloned(),
    );
}
