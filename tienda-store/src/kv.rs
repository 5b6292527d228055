//! Durable key-value storage: the client-side analogue of the browser
//! profile storage the cart and session are persisted in. Writes are
//! last-write-wins; no cross-process merge is attempted.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Reads a JSON value stored under `key`. A corrupt value is treated as
/// absent, never as a fatal error.
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, "discarding corrupt stored value: {err}");
            None
        }
    }
}

pub fn set_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, &raw),
        Err(err) => warn!(key, "failed to serialize value for storage: {err}"),
    }
}

fn entries<'a>(
    lock: &'a Mutex<HashMap<String, String>>,
) -> MutexGuard<'a, HashMap<String, String>> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
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
        entries(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        entries(&self.entries).insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        entries(&self.entries).remove(key);
    }
}

/// Single-file JSON store. A missing or unreadable file loads as empty; a
/// corrupt one is discarded with a warning.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let loaded = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(err) => {
                    warn!("discarding corrupt store file {}: {err}", path.display());
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            entries: Mutex::new(loaded),
        }
    }

    fn flush(&self, map: &HashMap<String, String>) {
        match serde_json::to_string(map) {
            Ok(raw) => {
                if let Err(err) = std::fs::write(&self.path, raw) {
                    warn!("failed to persist store file {}: {err}", self.path.display());
                }
            }
            Err(err) => warn!("failed to encode store file: {err}"),
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        entries(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut map = entries(&self.entries);
        map.insert(key.to_string(), value.to_string());
        self.flush(&map);
    }

    fn remove(&self, key: &str) {
        let mut map = entries(&self.entries);
        map.remove(key);
        self.flush(&map);
    }
}
