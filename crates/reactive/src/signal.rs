//! Change signals.
//!
//! A change signal turns a store's listener callbacks into a [`Stream`] of
//! payload-free [`ChangeEvent`]s.
//!
//! - Listeners are registered eagerly when the signal is created, and one
//!   synthetic event is pending right after registration, so every
//!   subscriber sees at least one event.
//! - Native callbacks hop onto the [`Dispatcher`] thread before they are
//!   published.
//! - Events coalesce: a slow consumer sees at most one pending event no
//!   matter how many changes happened since it last polled.
//! - Cancelling (or dropping) the stream unregisters every listener exactly
//!   once, and no event is published after cancellation.

use crate::dispatcher::Dispatcher;
use crate::subscription::{unregister_all, Subscription};
use futures::stream::{FusedStream, Stream};
use futures::task::AtomicWaker;
use parking_lot::Mutex;
use rxstore_core::{Error, Result, Uri};
use rxstore_storage::{ChangeListener, RecordStore};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, trace, warn};

/// Marker meaning "something watched changed; re-read current state".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChangeEvent;

/// State shared between a stream and the callbacks feeding it.
struct SignalState {
    pending: AtomicBool,
    cancelled: AtomicBool,
    error: Mutex<Option<Error>>,
    waker: AtomicWaker,
}

impl SignalState {
    fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            error: Mutex::new(None),
            waker: AtomicWaker::new(),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Marks an event pending and wakes the consumer.
    fn publish(&self) {
        if self.is_cancelled() {
            return;
        }
        trace!("emit change event");
        self.pending.store(true, Ordering::SeqCst);
        self.waker.wake();
    }

    /// Records a terminal error. The first error wins.
    fn fail(&self, error: Error) {
        if self.is_cancelled() {
            return;
        }
        self.error.lock().get_or_insert(error);
        self.waker.wake();
    }
}

/// Handle given to native listeners to publish a change.
///
/// Firing never runs consumer code on the calling thread: the event is
/// published from the dispatch thread.
#[derive(Clone)]
pub struct Trigger {
    state: Arc<SignalState>,
    dispatcher: Dispatcher,
}

impl Trigger {
    /// Publishes a change event through the dispatcher.
    pub fn fire(&self) {
        if self.state.is_cancelled() {
            return;
        }
        let state = self.state.clone();
        let posted = self.dispatcher.post(Box::new(move || state.publish()));
        if let Err(e) = posted {
            self.state.fail(e);
        }
    }

    /// Returns true once the stream fed by this trigger is cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }
}

/// Constructors for change signals.
pub struct ChangeSignal;

impl ChangeSignal {
    /// Watches every identifier in `uris` on `store`, including descendants.
    pub fn observe<I>(dispatcher: &Dispatcher, store: Arc<dyn RecordStore>, uris: I) -> ChangeStream
    where
        I: IntoIterator<Item = Uri>,
    {
        let uris: Vec<Uri> = uris.into_iter().collect();
        ChangeStream::register(dispatcher, move |trigger| {
            let mut ids = Vec::with_capacity(uris.len());
            for uri in &uris {
                if trigger.is_cancelled() {
                    break;
                }
                let t = trigger.clone();
                let listener: ChangeListener = Arc::new(move |_: &Uri| t.fire());
                match store.register_change_listener(uri, true, listener) {
                    Ok(id) => ids.push(id),
                    Err(e) => {
                        // roll back what was registered before the failure
                        if let Err(rollback) = unregister_all(store.as_ref(), ids) {
                            warn!(error = %rollback, "rollback of partial registration failed");
                        }
                        return Err(into_configuration(e));
                    }
                }
            }
            debug!(uris = uris.len(), "change signal registered");
            Ok(Subscription::for_record_listeners(store, ids))
        })
    }

    /// Watches a single identifier.
    pub fn observe_one(dispatcher: &Dispatcher, store: Arc<dyn RecordStore>, uri: Uri) -> ChangeStream {
        Self::observe(dispatcher, store, [uri])
    }
}

fn into_configuration(error: Error) -> Error {
    match error {
        Error::Configuration { .. } => error,
        other => Error::configuration(format!("listener registration failed: {}", other)),
    }
}

/// A coalescing stream of change events.
///
/// Ends after yielding a terminal error or once cancelled.
pub struct ChangeStream {
    state: Arc<SignalState>,
    subscription: Subscription,
    terminated: bool,
}

impl ChangeStream {
    /// Builds a stream whose listeners are installed by `register`.
    ///
    /// `register` receives the trigger its listeners must fire and returns
    /// the subscription that tears them down. If it fails, the stream yields
    /// that error and ends.
    pub fn register<F>(dispatcher: &Dispatcher, register: F) -> Self
    where
        F: FnOnce(Trigger) -> Result<Subscription>,
    {
        let state = Arc::new(SignalState::new());
        let trigger = Trigger {
            state: state.clone(),
            dispatcher: dispatcher.clone(),
        };
        let subscription = match register(trigger) {
            Ok(subscription) => {
                // synthetic first event, published once registration is complete
                state.pending.store(true, Ordering::SeqCst);
                subscription
            }
            Err(e) => {
                state.fail(e);
                Subscription::empty()
            }
        };
        Self {
            state,
            subscription,
            terminated: false,
        }
    }

    /// Unregisters every listener. No event is yielded afterwards.
    ///
    /// Only the first call performs the unregistration and can fail.
    pub fn cancel(&mut self) -> Result<()> {
        self.terminated = true;
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.pending.store(false, Ordering::SeqCst);
        self.subscription.cancel()
    }

    /// Returns true once cancelled or terminated by an error.
    pub fn is_cancelled(&self) -> bool {
        self.terminated
    }

    fn take_event(&mut self) -> Option<Result<ChangeEvent>> {
        let error = self.state.error.lock().take();
        if let Some(error) = error {
            if let Err(e) = self.cancel() {
                warn!(error = %e, "listener teardown failed after stream error");
            }
            return Some(Err(error));
        }
        if self.state.pending.swap(false, Ordering::SeqCst) {
            return Some(Ok(ChangeEvent));
        }
        None
    }
}

impl Stream for ChangeStream {
    type Item = Result<ChangeEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.terminated || self.state.is_cancelled() {
            return Poll::Ready(None);
        }
        if let Some(item) = self.take_event() {
            return Poll::Ready(Some(item));
        }
        self.state.waker.register(cx.waker());
        // re-check after registering so a publish in between is not lost
        match self.take_event() {
            Some(item) => Poll::Ready(Some(item)),
            None => Poll::Pending,
        }
    }
}

impl FusedStream for ChangeStream {
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl Drop for ChangeStream {
    fn drop(&mut self) {
        if let Err(e) = self.cancel() {
            warn!(error = %e, "listener teardown failed on drop");
        }
    }
}
