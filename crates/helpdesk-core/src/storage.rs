//! Durable key-value slots and the typed persistence adapter on top of them.
//!
//! A backend stores opaque text under a fixed key. [`Slot`] binds a key to a
//! serde type and implements the load/save contract the stores rely on:
//! loads never fail (missing or corrupt text reads as `None`), saves always
//! replace the whole value.

use crate::error::StorageError;
use crate::lock::WriteLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Key holding the serialized ticket collection (comments nested).
pub const TICKETS_KEY: &str = "servicedesk_tickets";
/// Key holding the serialized todo collection.
pub const TODOS_KEY: &str = "todo-app-tasks";
/// Key holding the current actor snapshot.
pub const SESSION_KEY: &str = "servicedesk_user";
/// Key holding accounts registered on top of the demo roster.
pub const ROSTER_KEY: &str = "servicedesk_roster";

const LOCK_FILE: &str = ".write.lock";
const LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// A named-slot text store, the equivalent of browser local storage.
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, `None` if it was never written.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Shared handle to a backend.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Directory-backed store: one `<key>.json` file per slot.
///
/// Writes land in a temp file in the same directory and are renamed over
/// the target under an exclusive lock, so readers see either the old or
/// the new value, never a prefix.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            action: "create",
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    fn lock(&self) -> Result<WriteLock, StorageError> {
        WriteLock::acquire(&self.root.join(LOCK_FILE), LOCK_TIMEOUT)
    }
}

impl KeyValueStore for DirStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.slot_path(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                action: "read",
                path,
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.slot_path(key)?;
        let tmp = self.root.join(format!(".{key}.json.tmp"));
        let io_err = |action, source| StorageError::Io {
            action,
            path: path.clone(),
            source,
        };

        let _lock = self.lock()?;
        let mut file = fs::File::create(&tmp).map_err(|e| io_err("create", e))?;
        file.write_all(value.as_bytes())
            .map_err(|e| io_err("write", e))?;
        file.sync_all().map_err(|e| io_err("sync", e))?;
        drop(file);
        fs::rename(&tmp, &path).map_err(|e| io_err("rename", e))?;
        debug!(key, bytes = value.len(), "slot written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.slot_path(key)?;
        let _lock = self.lock()?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                action: "remove",
                path,
                source,
            }),
        }
    }
}

/// Process-local store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor returning a [`SharedStore`].
    #[must_use]
    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
        Ok(())
    }
}

/// Typed view of one key in a backend.
pub struct Slot<T> {
    backend: SharedStore,
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Slot<T>
where
    T: Serialize + DeserializeOwned,
{
    #[must_use]
    pub fn new(backend: SharedStore, key: &'static str) -> Self {
        Self {
            backend,
            key,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.key
    }

    /// Read and decode the slot.
    ///
    /// Returns `None` when the slot is empty, unreadable, or fails to parse.
    /// Problems are logged, never returned.
    pub fn load(&self) -> Option<T> {
        let text = match self.backend.get(self.key) {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(err) => {
                error!(key = self.key, %err, "error reading stored slot");
                return None;
            }
        };

        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(err) => {
                error!(key = self.key, %err, "error parsing stored slot");
                None
            }
        }
    }

    /// Encode and overwrite the slot.
    ///
    /// Write failures are logged and dropped; the caller's in-memory copy
    /// stays authoritative.
    pub fn save(&self, value: &T) {
        let text = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(err) => {
                error!(key = self.key, %err, "error encoding slot");
                return;
            }
        };
        if let Err(err) = self.backend.set(self.key, &text) {
            warn!(key = self.key, %err, "slot write failed");
        }
    }

    /// Delete the slot.
    pub fn clear(&self) {
        if let Err(err) = self.backend.remove(self.key) {
            warn!(key = self.key, %err, "slot removal failed");
        }
    }
}

impl<T> std::fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot").field("key", &self.key).finish()
    }
}
