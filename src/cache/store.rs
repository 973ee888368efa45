//! Key-value persistence for cached records.
//!
//! Values are JSON documents addressed by fixed string keys. Stores report
//! errors; the typed helpers [`load_json`] and [`save_json`] swallow them so
//! that a broken store looks like an empty one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{LayermapError, Result};

/// Key of the persisted [`CachedAnalysis`](super::CachedAnalysis).
pub const ANALYSIS_KEY: &str = "project-analysis";

/// Key of the persisted [`ContextState`](crate::context::ContextState).
pub const CONTEXT_STATE_KEY: &str = "project-context-state";

/// A single-slot-per-key string store.
///
/// Writes are last-writer-wins; there is no locking across processes.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `Ok(None)` if the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value under `key`.
    fn put(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LayermapError::io(&path, e)),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| LayermapError::io(&self.dir, e))?;

        let temp_path = self.dir.join(format!("{}.json.tmp", key));
        let path = self.path_for(key);

        std::fs::write(&temp_path, value).map_err(|e| LayermapError::io(&temp_path, e))?;
        std::fs::rename(&temp_path, &path).map_err(|e| LayermapError::io(&path, e))?;
        Ok(())
    }
}

/// Process-local store, used by tests and embedders without a cache dir.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| LayermapError::store(key, "store mutex poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| LayermapError::store(key, "store mutex poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Read and decode a record; any failure is logged and reads as a miss.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!("Failed to read '{}' from cache: {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Cached '{}' is corrupted, ignoring it: {}", key, e);
            None
        }
    }
}

/// Encode and write a record; failures are logged and dropped.
///
/// Returns whether the write went through.
pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> bool {
    let json = match serde_json::to_string_pretty(value) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialise '{}': {}", key, e);
            return false;
        }
    };

    match store.put(key, &json) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to write '{}' to cache: {}", key, e);
            false
        }
    }
}
