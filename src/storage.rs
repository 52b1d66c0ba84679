use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

const STORAGE_FILE: &str = "local_storage.json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Corrupt storage file {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Device-local string key/value store backed by a JSON file.
///
/// Every write rewrites the whole file; the store only ever holds a
/// handful of small keys (theme preference, persisted auth session).
#[derive(Debug)]
pub struct LocalStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl LocalStorage {
    /// Open (or lazily create) the storage file inside `dir`.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        let path = dir.join(STORAGE_FILE);
        let items = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Json {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        debug!(path = ?path, keys = items.len(), "local storage opened");

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.lock();
        items.insert(key.to_string(), value.to_string());
        self.flush(&items)
    }

    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.lock();
        if items.remove(key).is_some() {
            self.flush(&items)?;
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn flush(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let raw = serde_json::to_string_pretty(items).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, raw).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();
        assert_eq!(storage.get_item("theme"), None);

        storage.set_item("theme", "dark").unwrap();
        storage.set_item("other", "x").unwrap();
        storage.remove_item("other").unwrap();

        let reopened = LocalStorage::open(dir.path()).unwrap();
        assert_eq!(reopened.get_item("theme").as_deref(), Some("dark"));
        assert_eq!(reopened.get_item("other"), None);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STORAGE_FILE), "{not json").unwrap();
        let err = LocalStorage::open(dir.path()).unwrap_err();
        assert!(matches!(err, StorageError::Json { .. }));
    }

    #[test]
    fn missing_directory_is_created_on_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = LocalStorage::open(&nested).unwrap();
        storage.set_item("theme", "light").unwrap();
        assert!(nested.join(STORAGE_FILE).exists());
    }
}
