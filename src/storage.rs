//! Durable key/value storage for client state.
//!
//! Plays the role browser local storage plays for a web client: the auth
//! session, the anonymous history list and UI settings survive restarts.
//! Each key is one JSON (or raw string) file in the data directory,
//! replaced atomically on write.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Storage keys used by the stores.
pub mod keys {
    pub const AUTH: &str = "auth";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const HISTORY: &str = "diagnosis-history";
    pub const SETTINGS: &str = "app-settings";
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Stored value for '{key}' is not valid JSON: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize value for '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
    #[error("Internal lock error")]
    LockPoisoned,
}

/// String key/value store with local-storage semantics.
pub trait KeyValueStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Load and decode a JSON value. Missing key → `None`.
pub fn load_json<T: DeserializeOwned>(
    storage: &dyn KeyValueStorage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match storage.get_item(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Encode and store a JSON value.
pub fn save_json<T: Serialize>(
    storage: &dyn KeyValueStorage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })?;
    storage.set_item(key, &raw)
}

// ═══════════════════════════════════════════════════════════
// FileStorage
// ═══════════════════════════════════════════════════════════

/// One file per key under a directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let io_err = |source| StorageError::Io {
            path: path.clone(),
            source,
        };

        // Write to a sibling temp file, then rename over the target.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(value.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;

        tracing::trace!(key, "storage item written");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// MemoryStorage
// ═══════════════════════════════════════════════════════════

/// Non-durable storage.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().map_err(|_| StorageError::LockPoisoned)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().map_err(|_| StorageError::LockPoisoned)?;
        items.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, serde::Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn file_storage_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(tmp.path()).unwrap();

        assert_eq!(storage.get_item("auth").unwrap(), None);
        storage.set_item("auth", "{\"x\":1}").unwrap();
        assert_eq!(storage.get_item("auth").unwrap().as_deref(), Some("{\"x\":1}"));

        storage.set_item("auth", "{\"x\":2}").unwrap();
        assert_eq!(storage.get_item("auth").unwrap().as_deref(), Some("{\"x\":2}"));

        storage.remove_item("auth").unwrap();
        assert_eq!(storage.get_item("auth").unwrap(), None);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let storage = FileStorage::open(tmp.path()).unwrap();
            storage.set_item(keys::ACCESS_TOKEN, "tok").unwrap();
        }
        let reopened = FileStorage::open(tmp.path()).unwrap();
        assert_eq!(reopened.get_item(keys::ACCESS_TOKEN).unwrap().as_deref(), Some("tok"));
    }

    #[test]
    fn file_storage_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        let storage = FileStorage::open(&nested).unwrap();
        assert!(storage.dir().is_dir());
    }

    #[test]
    fn removing_missing_key_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(tmp.path()).unwrap();
        storage.remove_item("never-written").unwrap();
    }

    #[test]
    fn path_traversal_keys_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(tmp.path()).unwrap();
        assert!(matches!(
            storage.set_item("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(storage.get_item(""), Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn json_helpers_round_trip() {
        let storage = MemoryStorage::new();
        let value = Sample {
            name: "history".into(),
            count: 3,
        };
        save_json(&storage, "sample", &value).unwrap();
        let loaded: Option<Sample> = load_json(&storage, "sample").unwrap();
        assert_eq!(loaded, Some(value));
    }

    #[test]
    fn corrupt_json_reported() {
        let storage = MemoryStorage::new();
        storage.set_item("sample", "not json").unwrap();
        let result: Result<Option<Sample>, _> = load_json(&storage, "sample");
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
    }
}
