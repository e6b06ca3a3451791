//! Runtime context: the dispatcher plus a default worker pool.

use crate::dispatcher::Dispatcher;
use crate::executor::{Executor, WorkerPool};
use crate::query::QueryStream;
use crate::signal::{ChangeSignal, ChangeStream};
use rxstore_core::{Result, Uri};
use rxstore_storage::RecordStore;
use std::sync::Arc;
use std::thread;
use tracing::debug;

/// Default name of the dispatch thread.
pub const DEFAULT_DISPATCHER_NAME: &str = "rxstore-dispatch";

/// Default name prefix of worker threads.
pub const DEFAULT_WORKER_PREFIX: &str = "rxstore-worker";

/// Settings for a [`ReactiveContext`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactiveConfig {
    pub dispatcher_name: String,
    /// Size of the default worker pool. Must be at least 1.
    pub worker_threads: usize,
    pub worker_name_prefix: String,
}

impl Default for ReactiveConfig {
    fn default() -> Self {
        Self {
            dispatcher_name: DEFAULT_DISPATCHER_NAME.into(),
            worker_threads: thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            worker_name_prefix: DEFAULT_WORKER_PREFIX.into(),
        }
    }
}

/// Builder for [`ReactiveContext`].
#[derive(Clone, Debug, Default)]
pub struct ReactiveContextBuilder {
    config: ReactiveConfig,
}

impl ReactiveContextBuilder {
    pub fn dispatcher_name(mut self, name: impl Into<String>) -> Self {
        self.config.dispatcher_name = name.into();
        self
    }

    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.config.worker_threads = threads;
        self
    }

    pub fn worker_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.worker_name_prefix = prefix.into();
        self
    }

    /// Starts the context.
    pub fn build(self) -> Result<ReactiveContext> {
        ReactiveContext::start(self.config)
    }
}

/// Owns the dispatch thread and the default worker pool.
///
/// Streams created from the context keep working until the context is shut
/// down or dropped; after that their next change surfaces a configuration
/// error.
pub struct ReactiveContext {
    config: ReactiveConfig,
    dispatcher: Dispatcher,
    workers: Arc<WorkerPool>,
}

impl ReactiveContext {
    /// Returns a builder seeded with the default configuration.
    pub fn builder() -> ReactiveContextBuilder {
        ReactiveContextBuilder::default()
    }

    /// Starts the dispatch thread and the worker pool.
    pub fn start(config: ReactiveConfig) -> Result<Self> {
        let workers = Arc::new(WorkerPool::new(config.worker_threads, config.worker_name_prefix.clone())?);
        let dispatcher = Dispatcher::start(config.dispatcher_name.clone())?;
        debug!(
            dispatcher = %config.dispatcher_name,
            workers = config.worker_threads,
            "reactive context started"
        );
        Ok(Self {
            config,
            dispatcher,
            workers,
        })
    }

    pub fn config(&self) -> &ReactiveConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns the default worker pool as an executor.
    pub fn default_executor(&self) -> Arc<dyn Executor> {
        self.workers.clone()
    }

    /// Watches `uris` on `store`. See [`ChangeSignal::observe`].
    pub fn observe<I>(&self, store: Arc<dyn RecordStore>, uris: I) -> ChangeStream
    where
        I: IntoIterator<Item = Uri>,
    {
        ChangeSignal::observe(&self.dispatcher, store, uris)
    }

    /// Runs `query` on the default pool after every change to `uris`.
    pub fn observe_query<T, I, F>(&self, store: Arc<dyn RecordStore>, uris: I, query: F) -> QueryStream<T>
    where
        T: Send + 'static,
        I: IntoIterator<Item = Uri>,
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        QueryStream::observe(&self.dispatcher, store, uris, self.default_executor(), query)
    }

    /// Stops the dispatch thread and the worker pool.
    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
        self.workers.shutdown();
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
