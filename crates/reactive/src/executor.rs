//! Worker contexts for query execution.
//!
//! Queries and preference writes may block on storage, so they never run on
//! the dispatch thread. They are handed to an [`Executor`] instead, and their
//! result travels back through a [`TaskHandle`].

use crossbeam_channel::{unbounded, Sender};
use futures::channel::oneshot;
use parking_lot::Mutex;
use rxstore_core::{Error, Result};
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// A unit of work run on a worker context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A context that runs tasks, possibly on other threads.
pub trait Executor: Send + Sync {
    /// Schedules `task`. Fails if the executor no longer accepts work.
    fn execute(&self, task: Task) -> Result<()>;
}

/// Runs every task inline on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateExecutor;

impl Executor for ImmediateExecutor {
    fn execute(&self, task: Task) -> Result<()> {
        task();
        Ok(())
    }
}

/// A fixed-size pool of worker threads fed from one shared queue.
pub struct WorkerPool {
    name: String,
    sender: Mutex<Option<Sender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawns `size` workers named `<prefix>-<n>`.
    pub fn new(size: usize, prefix: impl Into<String>) -> Result<Self> {
        let name = prefix.into();
        if size == 0 {
            return Err(Error::configuration(format!("worker pool {} needs at least one thread", name)));
        }
        let (sender, receiver) = unbounded::<Task>();
        let mut workers = Vec::with_capacity(size);
        for n in 0..size {
            let receiver = receiver.clone();
            let worker = thread::Builder::new()
                .name(format!("{}-{}", name, n))
                .spawn(move || {
                    while let Ok(task) = receiver.recv() {
                        // a panicking task must not take the worker down with it
                        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                            warn!(reason = panic_message(payload.as_ref()), "task panicked");
                        }
                    }
                })
                .map_err(|e| Error::configuration(format!("failed to spawn worker {}-{}: {}", name, n, e)))?;
            workers.push(worker);
        }
        debug!(name = %name, size, "worker pool started");
        Ok(Self {
            name,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// Returns the number of worker threads still owned by the pool.
    pub fn size(&self) -> usize {
        self.workers.lock().len()
    }

    /// Stops accepting tasks and joins the workers once the queue drains.
    pub fn shutdown(&self) {
        if self.sender.lock().take().is_none() {
            return;
        }
        let current = thread::current().id();
        let workers: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for worker in workers {
            if worker.thread().id() != current {
                let _ = worker.join();
            }
        }
        debug!(name = %self.name, "worker pool stopped");
    }
}

impl Executor for WorkerPool {
    fn execute(&self, task: Task) -> Result<()> {
        let sender = self.sender.lock();
        let sender = sender
            .as_ref()
            .ok_or_else(|| Error::configuration(format!("worker pool {} is shut down", self.name)))?;
        sender
            .send(task)
            .map_err(|_| Error::configuration(format!("worker pool {} is shut down", self.name)))
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, task: Task) -> Result<()> {
        (**self).execute(task)
    }
}

/// Runs `work` on `executor` and returns a future of its result.
pub fn spawn<R, F>(executor: &dyn Executor, work: F) -> TaskHandle<R>
where
    R: Send + 'static,
    F: FnOnce() -> Result<R> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let scheduled = executor.execute(Box::new(move || {
        trace!("run task");
        let result = panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
            Err(Error::invalid_operation(format!(
                "task panicked: {}",
                panic_message(payload.as_ref())
            )))
        });
        // the receiver is gone when the result went stale
        let _ = tx.send(result);
    }));
    match scheduled {
        Ok(()) => TaskHandle { state: HandleState::Running(rx) },
        Err(e) => TaskHandle { state: HandleState::Failed(Some(e)) },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

enum HandleState<R> {
    Running(oneshot::Receiver<Result<R>>),
    Failed(Option<Error>),
}

/// The pending result of a task started with [`spawn`].
///
/// Dropping the handle discards the result; the task itself still runs to
/// completion.
pub struct TaskHandle<R> {
    state: HandleState<R>,
}

impl<R> Future for TaskHandle<R> {
    type Output = Result<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            HandleState::Running(rx) => match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(Error::configuration(
                    "worker dropped the task before it completed",
                ))),
                Poll::Pending => Poll::Pending,
            },
            HandleState::Failed(error) => Poll::Ready(Err(error
                .take()
                .unwrap_or_else(|| Error::invalid_operation("task handle polled after completion")))),
        }
    }
}
