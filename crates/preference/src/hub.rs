//! Shared change listener for one key/value store.
//!
//! However many preference streams are active, a `ListenerHub` keeps at most
//! one native listener registered on its store. Streams subscribe per key;
//! the hub registers the native listener with the first subscriber and
//! unregisters it when the last one leaves. The subscriber map and the
//! native registration are guarded by one lock.

use hashbrown::HashMap;
use parking_lot::Mutex;
use rxstore_core::Result;
use rxstore_reactive::{Subscription, Trigger};
use rxstore_storage::{KeyValueStore, ListenerId};
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
struct HubState {
    native: Option<ListenerId>,
    subscribers: HashMap<String, HashMap<u64, Trigger>>,
    next_id: u64,
}

impl HubState {
    fn subscriber_count(&self) -> usize {
        self.subscribers.values().map(HashMap::len).sum()
    }
}

/// Routes a store's change callbacks to per-key subscribers.
#[derive(Clone)]
pub struct ListenerHub {
    store: Arc<dyn KeyValueStore>,
    state: Arc<Mutex<HubState>>,
}

impl ListenerHub {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(HubState::default())),
        }
    }

    /// Subscribes `trigger` to changes of `key`.
    ///
    /// Registers the native listener if this is the first subscriber. The
    /// returned subscription unsubscribes exactly once.
    pub fn subscribe(&self, key: &str, trigger: Trigger) -> Result<Subscription> {
        let id = {
            let mut state = self.state.lock();
            if state.native.is_none() {
                let routes = Arc::downgrade(&self.state);
                let native = self.store.register_on_change(Arc::new(move |changed: &str| {
                    let Some(state) = routes.upgrade() else {
                        return;
                    };
                    let targets: Vec<Trigger> = state
                        .lock()
                        .subscribers
                        .get(changed)
                        .map(|subs| subs.values().cloned().collect())
                        .unwrap_or_default();
                    for trigger in targets {
                        trigger.fire();
                    }
                }))?;
                debug!(listener = %native, "registered shared key listener");
                state.native = Some(native);
            }
            let id = state.next_id;
            state.next_id += 1;
            state
                .subscribers
                .entry(key.to_string())
                .or_default()
                .insert(id, trigger);
            id
        };

        let hub = self.clone();
        let key = key.to_string();
        Ok(Subscription::new(move || hub.unsubscribe(&key, id)))
    }

    fn unsubscribe(&self, key: &str, id: u64) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(subs) = state.subscribers.get_mut(key) {
            subs.remove(&id);
            if subs.is_empty() {
                state.subscribers.remove(key);
            }
        }
        if state.subscribers.is_empty() {
            if let Some(native) = state.native {
                // kept on failure so the next subscriber reuses it
                self.store.unregister_on_change(native)?;
                state.native = None;
                debug!(listener = %native, "unregistered shared key listener");
            }
        }
        Ok(())
    }

    /// Returns the number of active subscribers across all keys.
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscriber_count()
    }

    /// Returns the number of active subscribers for `key`.
    pub fn key_subscriber_count(&self, key: &str) -> usize {
        self.state.lock().subscribers.get(key).map_or(0, HashMap::len)
    }

    /// Returns true while the native listener is registered.
    pub fn is_registered(&self) -> bool {
        self.state.lock().native.is_some()
    }

    /// Returns the store this hub listens to.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }
}
