//! Saved-session persistence
//!
//! The wizard writes `{data, step, timestamp}` to a key-value store after every
//! change so an interrupted onboarding can be resumed. Persistence is
//! best-effort: failures are logged and never reach the user.

use crate::state::FormValues;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Default key the onboarding session is stored under
pub const DEFAULT_STORAGE_KEY: &str = "vendor_form_data";

/// Errors raised by a session store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Durable key-value storage for saved sessions. Last writer wins.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, contents: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// One JSON file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the platform data directory, if one can be resolved
    pub fn default_location() -> Option<Self> {
        ProjectDirs::from("in", "vendorhub", "vendor-onboard")
            .map(|dirs| Self::new(dirs.data_dir().join("sessions")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a sibling temp file and rename it over the record
    fn set(&self, key: &str, contents: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, contents)?;
        if let Err(e) = fs::rename(&staging, &path) {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, contents: &str) -> Result<(), StoreError> {
        self.lock()?.insert(key.to_string(), contents.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

fn first_step() -> usize {
    1
}

/// On-disk layout of a saved session
#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    data: FormValues,
    #[serde(default = "first_step")]
    step: usize,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

/// A session read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct SavedSession {
    pub values: FormValues,
    pub step: usize,
    pub saved_at: Option<DateTime<Utc>>,
}

/// Best-effort save/load/clear of the wizard session under a fixed key
#[derive(Clone)]
pub struct Persistence {
    store: Arc<dyn SessionStore>,
    key: String,
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence").field("key", &self.key).finish()
    }
}

impl Persistence {
    pub fn new(store: Arc<dyn SessionStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Non-durable persistence, for tests and when no data directory exists
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()), DEFAULT_STORAGE_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Overwrite the saved session with `values` at `step`
    pub fn save(&self, values: &FormValues, step: usize) {
        let record = SessionRecord {
            data: values.clone(),
            step,
            timestamp: Some(Utc::now()),
        };
        let contents = match serde_json::to_string(&record) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(key = %self.key, "Failed to serialize session: {e}");
                return;
            }
        };
        match self.store.set(&self.key, &contents) {
            Ok(()) => tracing::debug!(key = %self.key, step, "Session saved"),
            Err(e) => tracing::warn!(key = %self.key, "Failed to save session: {e}"),
        }
    }

    /// Read the saved session; `None` when absent or unreadable
    pub fn load(&self) -> Option<SavedSession> {
        let contents = match self.store.get(&self.key) {
            Ok(Some(contents)) => contents,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %self.key, "Failed to read saved session: {e}");
                return None;
            }
        };
        match serde_json::from_str::<SessionRecord>(&contents) {
            Ok(record) => Some(SavedSession {
                values: record.data,
                step: record.step,
                saved_at: record.timestamp,
            }),
            Err(e) => {
                tracing::warn!(key = %self.key, "Ignoring malformed saved session: {e}");
                None
            }
        }
    }

    /// Remove the saved session
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            tracing::warn!(key = %self.key, "Failed to clear saved session: {e}");
        }
    }
}
