//! Notification dispatch thread.
//!
//! A `Dispatcher` owns one dedicated thread that runs posted jobs in FIFO
//! order. Every change signal created from the same dispatcher delivers its
//! events on that thread, so delivery is serialized across signals while the
//! store's mutating threads and the query workers never block on it.
//!
//! The dispatcher is created explicitly (usually by `ReactiveContext`) and
//! handed to the signals that need it; there is no process-wide instance.

use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use rxstore_core::{Error, Result};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, trace};

/// A unit of work run on the dispatch thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Shutdown,
}

struct Inner {
    name: String,
    sender: Sender<Message>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl Inner {
    fn shutdown(&self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        // queued jobs run before the thread exits
        let _ = self.sender.send(Message::Shutdown);
        if thread::current().id() == self.thread_id {
            // dropped from one of its own jobs; the loop exits on its own
            return;
        }
        let _ = handle.join();
        debug!(name = %self.name, "dispatcher stopped");
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Handle to a running dispatch thread. Clones share the same thread.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Spawns the dispatch thread.
    pub fn start(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = unbounded::<Message>();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    match message {
                        Message::Run(job) => job(),
                        Message::Shutdown => break,
                    }
                }
            })
            .map_err(|e| Error::configuration(format!("failed to spawn dispatcher {}: {}", name, e)))?;

        debug!(name = %name, "dispatcher started");
        Ok(Self {
            inner: Arc::new(Inner {
                name,
                thread_id: handle.thread().id(),
                sender,
                handle: Mutex::new(Some(handle)),
            }),
        })
    }

    /// Queues `job` to run on the dispatch thread.
    pub fn post(&self, job: Job) -> Result<()> {
        if self.is_shutdown() {
            return Err(self.stopped());
        }
        trace!(name = %self.inner.name, "post job");
        self.inner
            .sender
            .send(Message::Run(job))
            .map_err(|_| self.stopped())
    }

    /// Returns the dispatch thread's name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns true when called from the dispatch thread.
    pub fn is_dispatch_thread(&self) -> bool {
        thread::current().id() == self.inner.thread_id
    }

    /// Returns true once `shutdown` has been called.
    pub fn is_shutdown(&self) -> bool {
        self.inner.handle.lock().is_none()
    }

    /// Stops the dispatch thread after it drains the queued jobs.
    ///
    /// Jobs posted afterwards are rejected. Calling this more than once, or
    /// from a job running on the dispatch thread, is allowed.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    fn stopped(&self) -> Error {
        Error::configuration(format!("dispatcher {} is shut down", self.inner.name))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.inner.name)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
