use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock, PoisonError, RwLock},
};

use chrono::Utc;
use shared::domain::{SessionId, SESSION_STORAGE_KEY};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StorageError;

const SESSION_ENTROPY_LEN: usize = 13;

/// Tab-scoped key/value storage. A missing key is the initializing case.
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    items: RwLock<HashMap<String, String>>,
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug)]
pub struct FileSessionStorage {
    path: PathBuf,
    items: RwLock<HashMap<String, String>>,
}

impl FileSessionStorage {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = read_items(&path);
        Self {
            path,
            items: RwLock::new(items),
        }
    }
}

fn read_items(path: &Path) -> HashMap<String, String> {
    let Ok(raw) = fs::read_to_string(path) else {
        return HashMap::new();
    };
    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(err) => {
            warn!(
                path = %path.display(),
                "session storage is malformed, starting empty: {err}"
            );
            HashMap::new()
        }
    }
}

impl SessionStorage for FileSessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        let encoded = serde_json::to_string_pretty(&*items)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, encoded).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

pub struct SessionManager {
    storage: Arc<dyn SessionStorage>,
    cached: OnceLock<SessionId>,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            storage,
            cached: OnceLock::new(),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.cached.get_or_init(|| self.load_or_create()).clone()
    }

    fn load_or_create(&self) -> SessionId {
        if let Some(existing) = self
            .storage
            .get_item(SESSION_STORAGE_KEY)
            .filter(|id| !id.trim().is_empty())
        {
            debug!(session_id = %existing, "session: reusing stored id");
            return SessionId(existing);
        }

        let session_id = generate_session_id();
        if let Err(err) = self.storage.set_item(SESSION_STORAGE_KEY, session_id.as_str()) {
            warn!(session_id = %session_id, "session: could not persist id: {err}");
        }
        info!(session_id = %session_id, "session: created new id");
        session_id
    }
}

/// `<unix millis>-<13 random hex chars>`
pub fn generate_session_id() -> SessionId {
    let timestamp = Utc::now().timestamp_millis();
    let entropy = Uuid::new_v4().simple().to_string();
    SessionId(format!("{timestamp}-{}", &entropy[..SESSION_ENTROPY_LEN]))
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
