//! Listener registration guards.
//!
//! A `Subscription` owns the teardown of whatever listener registrations a
//! stream made against its store. Teardown runs exactly once: on the first
//! call to `cancel`, or on drop if it never ran.

use parking_lot::Mutex;
use rxstore_core::Result;
use rxstore_storage::{ListenerId, RecordStore};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

type Teardown = Box<dyn FnOnce() -> Result<()> + Send>;

/// Owns the teardown of a set of listener registrations.
pub struct Subscription {
    teardown: Mutex<Option<Teardown>>,
}

impl Subscription {
    /// Wraps a teardown closure.
    pub fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        Self {
            teardown: Mutex::new(Some(Box::new(teardown))),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn empty() -> Self {
        Self {
            teardown: Mutex::new(None),
        }
    }

    /// Unregisters the record store listeners in `ids` on teardown.
    pub fn for_record_listeners(store: Arc<dyn RecordStore>, ids: Vec<ListenerId>) -> Self {
        Self::new(move || unregister_all(store.as_ref(), ids))
    }

    /// Runs the teardown if it has not run yet.
    ///
    /// Only the first call can fail; later calls return `Ok(())`.
    pub fn cancel(&self) -> Result<()> {
        // taken under the lock so concurrent callers cannot both run it
        let teardown = self.teardown.lock().take();
        match teardown {
            Some(teardown) => teardown(),
            None => Ok(()),
        }
    }

    /// Returns true once the teardown has run.
    pub fn is_cancelled(&self) -> bool {
        self.teardown.lock().is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Err(e) = self.cancel() {
            warn!(error = %e, "listener teardown failed on drop");
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Unregisters every listener, continuing past failures. Returns the first failure.
pub(crate) fn unregister_all(store: &dyn RecordStore, ids: Vec<ListenerId>) -> Result<()> {
    let mut first_error = None;
    for id in ids {
        if let Err(e) = store.unregister_change_listener(id) {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
