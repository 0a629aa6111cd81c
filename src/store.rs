//! Fingerprint → chunk metadata index.
//!
//! The [`IndexManager`] trait captures the four things an index must do
//! (add, exact lookup, load, save). [`InMemoryIndex`] is the one
//! implementation: an [`IndexMap`] keyed by the decimal string of each
//! fingerprint, holding entries in insertion order. Several chunks may share
//! a fingerprint; that is a valid collision, not an error.
//!
//! Mutation takes `&mut self`, so only one context can populate an index at
//! a time. The orchestrator's consumer thread owns it while indexing.
//!
//! # On-disk format
//!
//! A single JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "created_at": "2026-01-01T00:00:00Z",
//!   "features": { "strategy": "word", "normalize": true },
//!   "entry_count": 3,
//!   "entries": { "14607312263354641902": [ { "original_file": "...", ... } ] }
//! }
//! ```
//!
//! [`save`](IndexManager::save) writes to a temporary file next to the
//! destination and renames it into place, so readers never observe a
//! half-written index.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::features::FeatureConfig;

/// Current on-disk format version.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Metadata for one indexed chunk. Never holds the chunk bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub original_file: String,
    pub size: usize,
    /// Byte offset of the chunk in the (extracted) document.
    pub position: u64,
    /// First few words of the chunk, for display.
    pub associated_words: Vec<String>,
}

/// Fingerprint (decimal string) → entries in insertion order.
pub type IndexMap = BTreeMap<String, Vec<IndexEntry>>;

/// Operations every index backend provides.
pub trait IndexManager {
    /// Append `entry` under `key`, creating the key if absent.
    fn add(&mut self, key: String, entry: IndexEntry);

    /// Entries stored under exactly `key`.
    fn lookup_exact(&self, key: &str) -> Result<&[IndexEntry]>;

    /// Persist the full index to `path`.
    fn save(&self, path: &Path) -> Result<()>;

    /// Read an index previously written by [`save`](Self::save).
    fn load(path: &Path) -> Result<Self>
    where
        Self: Sized;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryIndex {
    entries: IndexMap,
    features: Option<FeatureConfig>,
}

#[derive(Serialize)]
struct IndexFileRef<'a> {
    version: u32,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    features: Option<&'a FeatureConfig>,
    entry_count: usize,
    entries: &'a IndexMap,
}

#[derive(Deserialize)]
struct IndexFile {
    version: u32,
    #[serde(default)]
    #[allow(dead_code)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    features: Option<FeatureConfig>,
    #[serde(default)]
    entry_count: Option<usize>,
    entries: IndexMap,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty index that records which extractor produced its fingerprints.
    pub fn with_features(features: FeatureConfig) -> Self {
        Self {
            entries: IndexMap::new(),
            features: Some(features),
        }
    }

    pub fn from_map(entries: IndexMap) -> Self {
        Self {
            entries,
            features: None,
        }
    }

    pub fn add_fingerprint(&mut self, fingerprint: u64, entry: IndexEntry) {
        self.add(fingerprint.to_string(), entry);
    }

    pub fn map(&self) -> &IndexMap {
        &self.entries
    }

    pub fn into_map(self) -> IndexMap {
        self.entries
    }

    pub fn features(&self) -> Option<&FeatureConfig> {
        self.features.as_ref()
    }

    /// Number of distinct fingerprints.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total entries across all fingerprints.
    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

impl IndexManager for InMemoryIndex {
    fn add(&mut self, key: String, entry: IndexEntry) {
        self.entries.entry(key).or_default().push(entry);
    }

    fn lookup_exact(&self, key: &str) -> Result<&[IndexEntry]> {
        match self.entries.get(key) {
            Some(entries) if !entries.is_empty() => Ok(entries.as_slice()),
            _ => Err(Error::NoMatch {
                query: key.to_string(),
                threshold: 0,
            }),
        }
    }

    fn save(&self, path: &Path) -> Result<()> {
        let file = IndexFileRef {
            version: INDEX_FORMAT_VERSION,
            created_at: Utc::now(),
            features: self.features.as_ref(),
            entry_count: self.entry_count(),
            entries: &self.entries,
        };
        let json = serde_json::to_vec(&file)
            .map_err(|e| Error::Format(format!("failed to encode index: {}", e)))?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| Error::io("create directory", dir, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| Error::io("create temporary file in", dir, e))?;
        tmp.write_all(&json)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| Error::io("write index", tmp.path(), e))?;
        tmp.persist(path)
            .map_err(|e| Error::io("write index", path, e.error))?;
        Ok(())
    }

    fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| Error::io("read index", path, e))?;
        let file: IndexFile = serde_json::from_slice(&bytes).map_err(|e| {
            Error::Format(format!("{} is not a valid index file: {}", path.display(), e))
        })?;

        if file.version != INDEX_FORMAT_VERSION {
            return Err(Error::Format(format!(
                "{} has index format version {}, expected {}",
                path.display(),
                file.version,
                INDEX_FORMAT_VERSION
            )));
        }

        let index = Self {
            entries: file.entries,
            features: file.features,
        };
        if let Some(expected) = file.entry_count {
            if expected != index.entry_count() {
                return Err(Error::Format(format!(
                    "{} is truncated: header says {} entries, found {}",
                    path.display(),
                    expected,
                    index.entry_count()
                )));
            }
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(file: &str, position: u64, words: &[&str]) -> IndexEntry {
        IndexEntry {
            original_file: file.to_string(),
            size: 4096,
            position,
            associated_words: words.iter().map(|w| w.to_string()).collect(),
        }
    }

    fn sample() -> InMemoryIndex {
        let mut index = InMemoryIndex::with_features(FeatureConfig::default());
        index.add(
            "3e4f1b2c".to_string(),
            entry("large_text.txt", 0, &["Once", "upon", "a", "time"]),
        );
        index.add(
            "3e4f1b2c".to_string(),
            entry("another_text.txt", 4096, &["The", "story", "continues"]),
        );
        index.add_fingerprint(12345, entry("large_text.txt", 8192, &["In", "a", "faraway", "land"]));
        index
    }

    #[test]
    fn add_keeps_insertion_order_per_key() {
        let index = sample();
        let entries = index.lookup_exact("3e4f1b2c").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].original_file, "large_text.txt");
        assert_eq!(entries[1].original_file, "another_text.txt");
        assert_eq!(index.len(), 2);
        assert_eq!(index.entry_count(), 3);
    }

    #[test]
    fn lookup_exact_missing_is_no_match() {
        let index = sample();
        assert!(index.lookup_exact("12345").is_ok());
        let err = index.lookup_exact("12344").unwrap_err();
        assert!(err.is_no_match());
    }

    #[test]
    fn save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.idx");
        let index = sample();
        index.save(&path).unwrap();
        let loaded = InMemoryIndex::load(&path).unwrap();
        assert_eq!(loaded, index);
    }

    #[test]
    fn empty_index_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.idx");
        let index = InMemoryIndex::new();
        index.save(&path).unwrap();
        let loaded = InMemoryIndex::load(&path).unwrap();
        assert_eq!(loaded, index);
        assert!(loaded.is_empty());
    }

    #[test]
    fn save_creates_parent_directories_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/index.idx");
        sample().save(&path).unwrap();
        InMemoryIndex::new().save(&path).unwrap();
        assert!(InMemoryIndex::load(&path).unwrap().is_empty());
        // Only the index itself remains; no temporary files left behind.
        let files: Vec<_> = std::fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = InMemoryIndex::load(Path::new("/no/such/index.idx")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn load_garbage_is_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.idx");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(InMemoryIndex::load(&path), Err(Error::Format(_))));
    }

    #[test]
    fn load_rejects_unknown_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("future.idx");
        std::fs::write(&path, r#"{"version": 99, "entries": {}}"#).unwrap();
        let err = InMemoryIndex::load(&path).unwrap_err();
        assert!(err.to_string().contains("version 99"));
    }

    #[test]
    fn load_detects_entry_count_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.idx");
        std::fs::write(&path, r#"{"version": 1, "entry_count": 2, "entries": {}}"#).unwrap();
        assert!(matches!(InMemoryIndex::load(&path), Err(Error::Format(_))));
    }
}
