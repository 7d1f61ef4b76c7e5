//! Persistent GUID cache keyed by version label.
//!
//! The upgrade code of a product must never change between releases, and each
//! release needs its own package code. Both are kept in a small JSON file that
//! is rewritten atomically whenever a new key is issued:
//!
//! ```json
//! {
//!     "0.1.0": "0C3C3D9E-2D0B-4B8A-9E0B-5E1C2A7F4D11",
//!     "upgrade": "A6B1E8C0-5F3E-4C2D-8B9A-1D2E3F4A5B6C"
//! }
//! ```

use crate::error::{Error, ErrorExt, Result};
use crate::utils::fs::write_atomic;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Reserved key holding the product's upgrade code.
pub const UPGRADE_KEY: &str = "upgrade";

/// Version label → GUID mapping with optional on-disk backing.
#[derive(Debug, Clone, Default)]
pub struct GuidCache {
    entries: BTreeMap<String, String>,
    path: Option<PathBuf>,
}

impl GuidCache {
    /// Wraps an existing mapping. Nothing is ever written to disk.
    pub fn in_memory(entries: BTreeMap<String, String>) -> Self {
        Self {
            entries,
            path: None,
        }
    }

    /// Loads the cache file at `path` if it exists, otherwise starts empty.
    ///
    /// The file is created on the first cache miss.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let contents =
                std::fs::read_to_string(&path).fs_context("reading GUID cache", &path)?;
            serde_json::from_str(&contents).map_err(|source| Error::GuidCache {
                path: path.clone(),
                source,
            })?
        } else {
            log::debug!("GUID cache {} not found, starting empty", path.display());
            BTreeMap::new()
        };

        Ok(Self {
            entries,
            path: Some(path),
        })
    }

    /// Returns the GUID stored under `key`, generating and persisting one on a miss.
    ///
    /// Existing entries are never replaced. A hit performs no I/O.
    pub fn get_or_create(&mut self, key: &str) -> Result<String> {
        if let Some(existing) = self.entries.get(key) {
            return Ok(existing.clone());
        }

        let guid = new_guid();
        self.entries.insert(key.to_string(), guid.clone());

        if let Some(path) = &self.path {
            if let Err(e) = persist(path, &self.entries) {
                self.entries.remove(key);
                return Err(e);
            }
            log::debug!("Stored GUID for '{}' in {}", key, path.display());
        }

        Ok(guid)
    }

    /// Looks up `key` without generating anything.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Generates a random GUID in uppercase 8-4-4-4-12 form.
pub fn new_guid() -> String {
    uuid::Uuid::new_v4().hyphenated().to_string().to_uppercase()
}

/// Whether `s` is an uppercase canonical GUID.
pub fn is_canonical_guid(s: &str) -> bool {
    uuid::Uuid::try_parse(s).is_ok()
        && s.len() == 36
        && !s.chars().any(|c| c.is_ascii_lowercase())
}

fn persist(path: &Path, entries: &BTreeMap<String, String>) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    entries.serialize(&mut ser)?;
    write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_guid_is_uppercase_canonical() {
        let guid = new_guid();
        assert!(is_canonical_guid(&guid), "{guid}");
        let groups: Vec<usize> = guid.split('-').map(str::len).collect();
        assert_eq!(groups, vec![8, 4, 4, 4, 12]);
    }

    #[test]
    fn test_lowercase_guid_is_not_canonical() {
        assert!(!is_canonical_guid("0c3c3d9e-2d0b-4b8a-9e0b-5e1c2a7f4d11"));
        assert!(!is_canonical_guid("not-a-guid"));
    }

    #[test]
    fn test_in_memory_hit_returns_existing() {
        let mut seeded = BTreeMap::new();
        seeded.insert(UPGRADE_KEY.to_string(), "SEEDED".to_string());
        let mut cache = GuidCache::in_memory(seeded);

        assert_eq!(cache.get_or_create(UPGRADE_KEY).unwrap(), "SEEDED");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_in_memory_miss_generates_distinct_values() {
        let mut cache = GuidCache::default();
        let a = cache.get_or_create("1.0.0").unwrap();
        let b = cache.get_or_create("1.1.0").unwrap();
        assert_ne!(a, b);
        assert_eq!(cache.get_or_create("1.0.0").unwrap(), a);
        assert!(cache.path().is_none());
    }

    #[test]
    fn test_failed_persist_leaves_no_entry() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let mut cache = GuidCache::load(blocker.join("guids.json")).unwrap();
        assert!(cache.get_or_create(UPGRADE_KEY).is_err());
        assert_eq!(cache.len(), 0);
        assert!(cache.get(UPGRADE_KEY).is_none());
    }
}
