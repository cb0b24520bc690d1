//! Build engines: "given a changed-file set, produce emitted files plus
//! diagnostics".
//!
//! Engines own their incremental state. They read through a [`FileSystem`]
//! and never write; the driver writes every emitted file back through the
//! same adapter.

mod build_info;
mod oxc;

use std::path::PathBuf;

use kiln_diagnostics::{Diagnostic, SourceDb};

use crate::fs::FileSystem;

pub use build_info::{BuildInfo, ChangeSet, BUILD_INFO_VERSION};
pub use oxc::OxcEngine;

/// Result of one build pass.
#[derive(Default)]
pub struct BuildOutput {
    /// `(absolute output path, text)` for every file the pass emitted,
    /// including the engine's build state.
    pub emitted: Vec<(PathBuf, String)>,
    /// Problems found during the pass.
    pub diagnostics: Vec<Diagnostic>,
    /// Sources referenced by `diagnostics`.
    pub sources: SourceDb,
}

impl BuildOutput {
    /// Number of error-severity diagnostics.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity.is_error())
            .count()
    }
}

/// An incremental compiler behind a narrow interface.
pub trait BuildEngine: Send {
    /// Runs one pass. `changed` names files known to have changed since the
    /// previous pass and is a hint: engines may rebuild more.
    fn build(&mut self, fs: &dyn FileSystem, changed: &[PathBuf]) -> BuildOutput;
}
