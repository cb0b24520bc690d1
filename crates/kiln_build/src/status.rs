//! Process-level build failure indicator.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Counters {
    failed: AtomicBool,
    passes: AtomicUsize,
    last_error_count: AtomicUsize,
}

/// Outcome of the build passes run so far, shared with the server.
///
/// The failure flag is sticky: once any pass reports an error it stays set,
/// so the process exits with a failure code even if later passes are clean.
#[derive(Clone, Debug, Default)]
pub struct BuildStatus {
    counters: Arc<Counters>,
}

impl BuildStatus {
    /// Creates a status with no passes recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a finished pass that reported `error_count` errors.
    pub fn record_pass(&self, error_count: usize) {
        self.counters.passes.fetch_add(1, Ordering::SeqCst);
        self.counters
            .last_error_count
            .store(error_count, Ordering::SeqCst);
        if error_count > 0 {
            self.counters.failed.store(true, Ordering::SeqCst);
        }
    }

    /// Returns `true` once any pass has reported an error.
    pub fn has_failed(&self) -> bool {
        self.counters.failed.load(Ordering::SeqCst)
    }

    /// Number of completed passes.
    pub fn passes(&self) -> usize {
        self.counters.passes.load(Ordering::SeqCst)
    }

    /// Error count of the most recent pass.
    pub fn last_error_count(&self) -> usize {
        self.counters.last_error_count.load(Ordering::SeqCst)
    }

    /// `1` if any pass failed, else `0`.
    pub fn exit_code(&self) -> i32 {
        i32::from(self.has_failed())
    }
}
