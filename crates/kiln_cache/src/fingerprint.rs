//! Cache fingerprints: one per (project manifest, effective options) pair.

use kiln_common::ContentHash;
use serde::Serialize;
use std::fmt;

use crate::error::CacheError;

/// Identifies exactly one persisted snapshot.
///
/// Any change to the manifest text or to a serialized option field yields a
/// different fingerprint, so a snapshot built under other settings is never
/// loaded.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Fingerprint(ContentHash);

impl Fingerprint {
    /// Hashes the manifest text together with the JSON form of `options`.
    pub fn compute<T: Serialize>(manifest: &str, options: &T) -> Result<Self, CacheError> {
        let options_json = serde_json::to_string(options)?;
        Ok(Self(ContentHash::from_parts(&[
            manifest.as_bytes(),
            options_json.as_bytes(),
        ])))
    }

    /// The snapshot file name for this fingerprint: `kiln-<hex>.json`.
    pub fn file_name(&self) -> String {
        format!("kiln-{}.json", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
