//! The in-memory artifact cache shared by the build driver and the request
//! handler.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

/// Key under which the engine's incremental build state is stored.
///
/// The value under this key is an opaque blob, never a served artifact.
pub const BUILD_INFO_KEY: &str = "tsconfig.tsbuildinfo";

/// Mapping from project-relative path to final served text.
///
/// Cloning is cheap and every clone shares the same storage. Absence of a key
/// means "not built yet", not "does not exist". Writes overwrite; there is no
/// at-most-once guarantee per key.
#[derive(Clone, Debug, Default)]
pub struct ArtifactCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl ArtifactCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the artifact stored under `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    /// Stores `value` under `key`, replacing any previous artifact.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.into(), value.into());
    }

    /// Returns `true` if an artifact is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(key)
    }

    /// Number of stored entries, including build state.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merges `entries` into the cache, overwriting existing keys.
    pub fn extend(&self, entries: impl IntoIterator<Item = (String, String)>) {
        let mut current = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        current.extend(entries);
    }

    /// A sorted point-in-time copy of every entry.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// The stored incremental build state, if any.
    pub fn build_info(&self) -> Option<String> {
        self.get(BUILD_INFO_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let cache = ArtifactCache::new();
        assert!(cache.is_empty());
        cache.insert("src/a.ts", "export {};");
        assert_eq!(cache.get("src/a.ts").as_deref(), Some("export {};"));
        assert!(cache.contains("src/a.ts"));
        assert!(!cache.contains("src/b.ts"));
    }

    #[test]
    fn overwrite_last_writer_wins() {
        let cache = ArtifactCache::new();
        cache.insert("src/a.ts", "one");
        cache.insert("src/a.ts", "two");
        assert_eq!(cache.get("src/a.ts").as_deref(), Some("two"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clones_share_storage() {
        let cache = ArtifactCache::new();
        let other = cache.clone();
        other.insert(BUILD_INFO_KEY, "{}");
        assert_eq!(cache.build_info().as_deref(), Some("{}"));
    }

    #[test]
    fn snapshot_is_sorted_copy() {
        let cache = ArtifactCache::new();
        cache.extend([
            ("src/b.ts".to_string(), "b".to_string()),
            ("src/a.ts".to_string(), "a".to_string()),
        ]);
        let snap = cache.snapshot();
        cache.insert("src/c.ts", "c");
        assert_eq!(snap.keys().collect::<Vec<_>>(), vec!["src/a.ts", "src/b.ts"]);
    }

    #[test]
    fn concurrent_inserts() {
        use std::thread;

        let cache = ArtifactCache::new();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        cache.insert(format!("src/{t}/{i}.ts"), "x");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 400);
    }
}
