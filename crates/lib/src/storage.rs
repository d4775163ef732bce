//! Client-local key/value storage for the bearer token and the identity snapshot.
//!
//! `FileStorage` keeps a single JSON object on disk (e.g. `~/.ayna/state.json`);
//! `MemoryStorage` is used by tests and short-lived tools.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Local-storage key holding the bearer token.
pub const TOKEN_KEY: &str = "actkn";
/// Local-storage key holding the identity snapshot JSON.
pub const USER_KEY: &str = "user";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("storage file {path} is not a JSON object: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("storage lock poisoned")]
    Poisoned,
}

/// String key/value store with local-storage semantics.
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut g = self.inner.lock().map_err(|_| StorageError::Poisoned)?;
        g.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut g = self.inner.lock().map_err(|_| StorageError::Poisoned)?;
        g.remove(key);
        Ok(())
    }
}

/// JSON-object file storage. Every write rewrites the whole file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<serde_json::Map<String, serde_json::Value>, StorageError> {
        let s = match std::fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(serde_json::Map::new())
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if s.trim().is_empty() {
            return Ok(serde_json::Map::new());
        }
        serde_json::from_str(&s).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_map(&self, map: &serde_json::Map<String, serde_json::Value>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let s = serde_json::to_string_pretty(map).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, s).map_err(io_err)
    }
}

impl LocalStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let _g = self.lock.lock().ok()?;
        match self.read_map() {
            Ok(map) => map.get(key).and_then(|v| v.as_str()).map(str::to_string),
            Err(e) => {
                log::warn!("reading local state failed: {}", e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _g = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _g = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}
