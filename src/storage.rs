//! Persistent key/value storage for the translation client.
//!
//! The client keeps two values between sessions: the serialized translation
//! cache and the selected language. `FileStore` keeps every key in a single
//! JSON object on disk; `MemoryStore` keeps them in process and can simulate
//! a full disk.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::warn;

/// Storage key holding the serialized translation cache.
pub const CACHE_KEY: &str = "translationCache";

/// Storage key holding the selected language code.
pub const LANGUAGE_KEY: &str = "preferredLanguage";

/// A synchronous string key/value store.
///
/// Implementations may block on I/O. Async callers should reach them through
/// `tokio::task::spawn_blocking`.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` means the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Store backed by one JSON object file.
///
/// Writes go to a sibling temporary file which is then renamed over the
/// original, so a crash mid-write leaves the previous contents intact.
/// Every `get` and `set` is blocking file I/O.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_entries(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read store file {}", self.path.display()))?;

        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse store file {}", self.path.display()))
    }

    fn write_entries(&self, entries: &HashMap<String, String>) -> Result<()> {
        let json = serde_json::to_string(entries).context("Failed to serialize store entries")?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, json)
            .with_context(|| format!("Failed to write store file {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace store file {}", self.path.display()))?;

        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        // A damaged file must not block every future write
        let mut entries = self.read_entries().unwrap_or_else(|e| {
            warn!("Discarding unreadable store file: {:#}", e);
            HashMap::new()
        });
        entries.insert(key.to_string(), value.to_string());

        self.write_entries(&entries)
    }
}

/// In-process store, used for sessions that should not touch disk and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key, as if written by an earlier session.
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Make every subsequent `set` fail, like a browser storage quota error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("Storage quota exceeded while writing '{}'", key);
        }

        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ==================== FileStore Tests ====================

    #[test]
    fn test_file_store_missing_file_reads_none() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("store.json"));

        assert_eq!(store.get(CACHE_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_store_set_then_get() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("store.json"));

        store.set(LANGUAGE_KEY, "es").unwrap();
        assert_eq!(store.get(LANGUAGE_KEY).unwrap().as_deref(), Some("es"));
    }

    #[test]
    fn test_file_store_keeps_other_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("store.json"));

        store.set(LANGUAGE_KEY, "vi").unwrap();
        store.set(CACHE_KEY, "{}").unwrap();

        assert_eq!(store.get(LANGUAGE_KEY).unwrap().as_deref(), Some("vi"));
        assert_eq!(store.get(CACHE_KEY).unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        FileStore::new(&path).set(LANGUAGE_KEY, "ko").unwrap();
        let reopened = FileStore::new(&path);

        assert_eq!(reopened.get(LANGUAGE_KEY).unwrap().as_deref(), Some("ko"));
    }

    #[test]
    fn test_file_store_corrupt_file_errors_on_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json at all").unwrap();

        let store = FileStore::new(&path);
        assert!(store.get(CACHE_KEY).is_err());
    }

    #[test]
    fn test_file_store_corrupt_file_is_replaced_on_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{broken").unwrap();

        let store = FileStore::new(&path);
        store.set(LANGUAGE_KEY, "fr").unwrap();

        assert_eq!(store.get(LANGUAGE_KEY).unwrap().as_deref(), Some("fr"));
    }

    #[test]
    fn test_file_store_unwritable_directory_errors() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("missing").join("store.json"));

        assert!(store.set(LANGUAGE_KEY, "es").is_err());
    }

    // ==================== MemoryStore Tests ====================

    #[test]
    fn test_memory_store_with_entry() {
        let store = MemoryStore::new().with_entry(LANGUAGE_KEY, "tl");
        assert_eq!(store.get(LANGUAGE_KEY).unwrap().as_deref(), Some("tl"));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_memory_store_counts_writes() {
        let store = MemoryStore::new();
        store.set(CACHE_KEY, "{}").unwrap();
        store.set(CACHE_KEY, "{}").unwrap();
        assert_eq!(store.writes(), 2);
    }

    #[test]
    fn test_memory_store_fail_writes() {
        let store = MemoryStore::new().with_entry(LANGUAGE_KEY, "es");
        store.set_fail_writes(true);

        let result = store.set(LANGUAGE_KEY, "fr");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("quota"));
        assert_eq!(store.get(LANGUAGE_KEY).unwrap().as_deref(), Some("es"));
    }
}
