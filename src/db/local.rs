use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::{AppError, AppResult};

/// Well-known key the whole list blob is stored under
pub const LOCAL_LISTS_KEY: &str = "cinelist:lists";

/// Synchronous, best-effort on-device key/value storage
pub trait LocalKeyValueStore: Send + Sync {
    fn read(&self, key: &str) -> AppResult<Option<String>>;

    fn write(&self, key: &str, value: &str) -> AppResult<()>;
}

/// Stores each key as a file inside a directory
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

impl LocalKeyValueStore for FileKeyValueStore {
    fn read(&self, key: &str) -> AppResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> AppResult<()> {
        fs::create_dir_all(&self.dir)?;

        // Write then rename so readers never see a truncated blob
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;

        tracing::trace!(path = %path.display(), bytes = value.len(), "Wrote local entry");

        Ok(())
    }
}

/// Keeps entries in memory; can simulate a full or disabled storage
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, like a storage quota error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Seeds an entry without counting it as a write
    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }
}

impl LocalKeyValueStore for InMemoryKeyValueStore {
    fn read(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::LocalStorage(std::io::Error::new(
                std::io::ErrorKind::Other,
                "local storage quota exceeded",
            )));
        }

        self.insert(key, value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path());
        assert_eq!(store.read(LOCAL_LISTS_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_store_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("nested"));

        store.write(LOCAL_LISTS_KEY, r#"{"favorites":["42"]}"#).unwrap();
        store.write(LOCAL_LISTS_KEY, r#"{"favorites":["7"]}"#).unwrap();

        assert_eq!(
            store.read(LOCAL_LISTS_KEY).unwrap().as_deref(),
            Some(r#"{"favorites":["7"]}"#)
        );
    }

    #[test]
    fn test_file_store_sanitizes_key() {
        let store = FileKeyValueStore::new("/tmp/cinelist");
        assert_eq!(
            store.path_for("cinelist:lists"),
            PathBuf::from("/tmp/cinelist/cinelist_lists.json")
        );
        assert_eq!(
            store.path_for("../escape"),
            PathBuf::from("/tmp/cinelist/___escape.json")
        );
    }

    #[test]
    fn test_memory_store_counts_writes() {
        let store = InMemoryKeyValueStore::new();
        store.insert("seed", "1");
        assert_eq!(store.write_count(), 0);

        store.write("k", "v").unwrap();
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.read("k").unwrap().as_deref(), Some("v"));
        assert_eq!(store.read("seed").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_memory_store_failing_writes() {
        let store = InMemoryKeyValueStore::new();
        store.set_fail_writes(true);

        let result = store.write("k", "v");
        assert!(matches!(result, Err(AppError::LocalStorage(_))));
        assert_eq!(store.read("k").unwrap(), None);
        assert_eq!(store.write_count(), 0);
    }
}
