//! The engine's persisted incremental state and change detection against it.

use std::collections::BTreeMap;

use kiln_common::ContentHash;
use serde::{Deserialize, Serialize};

/// Format version of [`BuildInfo`]. State with another version is discarded.
pub const BUILD_INFO_VERSION: u32 = 1;

/// Content hashes of every input that compiled cleanly in the last pass,
/// keyed by project-relative path, plus the hash of the project
/// configuration they were compiled under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Format version.
    pub version: u32,
    /// Hash of the project configuration text of the pass that wrote this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ContentHash>,
    /// Input path to content hash at the time it was last emitted.
    pub files: BTreeMap<String, ContentHash>,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version: BUILD_INFO_VERSION,
            config: None,
            files: BTreeMap::new(),
        }
    }
}

impl BuildInfo {
    /// Parses build state, returning `None` if it is malformed or was written
    /// by another format version. Either case means a full rebuild.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str::<Self>(text)
            .ok()
            .filter(|info| info.version == BUILD_INFO_VERSION)
    }

    /// Empty state for a pass compiled under `config`.
    pub fn for_config(config: ContentHash) -> Self {
        Self {
            config: Some(config),
            ..Self::default()
        }
    }

    /// Returns this state if it was written under `config`, otherwise empty
    /// state. A configuration change invalidates every recorded input.
    pub fn under_config(self, config: ContentHash) -> Self {
        if self.config == Some(config) {
            self
        } else {
            Self::for_config(config)
        }
    }

    /// Serializes the state as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Compares current input hashes against this state.
    pub fn detect_changes(&self, current: &BTreeMap<String, ContentHash>) -> ChangeSet {
        let mut changes = ChangeSet::default();
        for (path, hash) in current {
            match self.files.get(path) {
                Some(previous) if previous == hash => changes.unchanged_files.push(path.clone()),
                Some(_) => changes.modified_files.push(path.clone()),
                None => changes.new_files.push(path.clone()),
            }
        }
        changes.deleted_files = self
            .files
            .keys()
            .filter(|path| !current.contains_key(*path))
            .cloned()
            .collect();
        changes
    }
}

/// Inputs categorized against the previous [`BuildInfo`]. Each list is sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Inputs not present in the previous state.
    pub new_files: Vec<String>,
    /// Inputs whose hash changed.
    pub modified_files: Vec<String>,
    /// Previously built inputs that no longer exist.
    pub deleted_files: Vec<String>,
    /// Inputs whose hash matches the previous state.
    pub unchanged_files: Vec<String>,
}

impl ChangeSet {
    /// Returns `true` if there are no new, modified or deleted inputs.
    pub fn is_empty(&self) -> bool {
        self.new_files.is_empty() && self.modified_files.is_empty() && self.deleted_files.is_empty()
    }

    /// Number of inputs that need recompiling (new + modified).
    pub fn dirty_count(&self) -> usize {
        self.new_files.len() + self.modified_files.len()
    }
}
