//! In-memory key/value store.

use crate::kv::{KeyListener, KeyValueStore};
use crate::record::ListenerId;
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use rxstore_core::{Error, Result, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Thread-safe in-memory implementation of [`KeyValueStore`].
///
/// Listeners run on the mutating thread after the entry map is unlocked, so a
/// listener may read the store it is registered on.
pub struct MemoryPreferences {
    entries: RwLock<HashMap<String, Value>>,
    listeners: Mutex<HashMap<ListenerId, KeyListener>>,
    next_listener_id: AtomicU64,
}

impl Default for MemoryPreferences {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// Removes every entry, notifying once per removed key.
    pub fn clear(&self) {
        let removed: Vec<String> = self.entries.write().drain().map(|(k, _)| k).collect();
        for key in &removed {
            self.notify(key);
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the number of registered change listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn notify(&self, key: &str) {
        let targets: Vec<KeyListener> = self.listeners.lock().values().cloned().collect();
        trace!(key, listeners = targets.len(), "notify key change");
        for listener in targets {
            listener(key);
        }
    }
}

impl KeyValueStore for MemoryPreferences {
    fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    fn put(&self, key: &str, value: Value) -> Result<()> {
        if value.is_null() {
            return Err(Error::invalid_operation(format!(
                "cannot store null under {}; remove the key instead",
                key
            )));
        }
        self.entries.write().insert(key.to_string(), value);
        self.notify(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let removed = self.entries.write().remove(key).is_some();
        if removed {
            self.notify(key);
        }
        Ok(())
    }

    fn register_on_change(&self, listener: KeyListener) -> Result<ListenerId> {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.lock().insert(id, listener);
        debug!(listener = %id, "registered key listener");
        Ok(id)
    }

    fn unregister_on_change(&self, id: ListenerId) -> Result<()> {
        match self.listeners.lock().remove(&id) {
            Some(_) => {
                debug!(listener = %id, "unregistered key listener");
                Ok(())
            }
            None => Err(Error::configuration(format!("{} is not registered", id))),
        }
    }
}
