//! Key-value persistence for small records such as the rate-limit counter.
//!
//! `FileStore` keeps one JSON file per key under the user's local data
//! directory. `MemoryStore` keeps everything in a map and forgets it on exit.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

static DEFAULT_STORAGE_DIR: Lazy<PathBuf> = Lazy::new(|| {
    if let Some(data_dir) = dirs::data_local_dir() {
        return data_dir.join("parking-assistant").join("storage");
    }

    PathBuf::from("cache").join("storage")
});

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to create storage directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("Failed to write to storage: {0}")]
    Write(io::Error),

    #[error("Failed to delete from storage: {0}")]
    Delete(io::Error),
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Sanitize storage key for filesystem use
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect()
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted in `<data_local_dir>/parking-assistant/storage`.
    pub fn default_location() -> Self {
        Self::new(DEFAULT_STORAGE_DIR.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path_for(key);
        debug!(path = %path.display(), "writing storage record");
        fs::write(path, value).map_err(StorageError::Write)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path).map_err(StorageError::Delete)?;
        }
        Ok(())
    }
}

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
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().expect("memory store poisoned");
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        entries.remove(key);
        Ok(())
    }
}
