//! Re-executing query streams.
//!
//! A `QueryStream` runs its query once per change event and yields each
//! result. Queries run on an [`Executor`], never on the dispatch thread, and
//! at most one runs at a time per stream: an event arriving while a query is
//! in flight marks it stale. A stale result is still yielded, and the query
//! runs again right after it completes, so results keep flowing under
//! sustained change. Only cancellation discards a result. A query error ends
//! the stream.

use crate::dispatcher::Dispatcher;
use crate::executor::{spawn, Executor, TaskHandle};
use crate::signal::{ChangeSignal, ChangeStream};
use futures::stream::{FusedStream, Stream};
use futures::FutureExt;
use rxstore_core::{Result, Uri};
use rxstore_storage::RecordStore;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{trace, warn};

type QueryFn<T> = Arc<dyn Fn() -> Result<T> + Send + Sync>;

/// A stream of query results, refreshed on every change event.
pub struct QueryStream<T> {
    events: ChangeStream,
    query: QueryFn<T>,
    executor: Arc<dyn Executor>,
    in_flight: Option<TaskHandle<T>>,
    stale: bool,
    events_done: bool,
    done: bool,
}

impl<T: Send + 'static> QueryStream<T> {
    /// Runs `query` on `executor` for every event of `events`.
    pub fn new<F>(events: ChangeStream, executor: Arc<dyn Executor>, query: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Self {
            events,
            query: Arc::new(query),
            executor,
            in_flight: None,
            stale: false,
            events_done: false,
            done: false,
        }
    }

    /// Watches `uris` on `store` and runs `query` after every change.
    pub fn observe<I, F>(
        dispatcher: &Dispatcher,
        store: Arc<dyn RecordStore>,
        uris: I,
        executor: Arc<dyn Executor>,
        query: F,
    ) -> Self
    where
        I: IntoIterator<Item = Uri>,
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Self::new(ChangeSignal::observe(dispatcher, store, uris), executor, query)
    }

    /// Stops the stream and unregisters its listeners.
    ///
    /// A query already running completes, but its result is discarded.
    pub fn cancel(&mut self) -> Result<()> {
        self.done = true;
        self.in_flight = None;
        self.events.cancel()
    }

    /// Returns true while a query is running for this stream.
    pub fn is_querying(&self) -> bool {
        self.in_flight.is_some()
    }

    fn launch(&mut self) {
        trace!("launch query");
        let query = self.query.clone();
        self.in_flight = Some(spawn(self.executor.as_ref(), move || query()));
    }

    fn finish(&mut self) {
        self.done = true;
        self.in_flight = None;
        if let Err(e) = self.events.cancel() {
            warn!(error = %e, "listener teardown failed after query error");
        }
    }
}

impl<T: Send + 'static> Stream for QueryStream<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.done {
            return Poll::Ready(None);
        }

        // drain events; coalescing keeps this to at most one per poll
        while !this.events_done {
            match Pin::new(&mut this.events).poll_next(cx) {
                Poll::Ready(Some(Ok(_))) => {
                    if this.in_flight.is_some() {
                        this.stale = true;
                    } else {
                        this.launch();
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finish();
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => this.events_done = true,
                Poll::Pending => break,
            }
        }

        if let Some(handle) = this.in_flight.as_mut() {
            let result = match handle.poll_unpin(cx) {
                Poll::Ready(result) => result,
                Poll::Pending => return Poll::Pending,
            };
            this.in_flight = None;
            return match result {
                Ok(value) => {
                    if this.stale {
                        // a change arrived while this ran; emit it and re-run
                        this.stale = false;
                        this.launch();
                    }
                    Poll::Ready(Some(Ok(value)))
                }
                Err(e) => {
                    this.finish();
                    Poll::Ready(Some(Err(e)))
                }
            };
        }

        if this.events_done {
            this.done = true;
            return Poll::Ready(None);
        }
        Poll::Pending
    }
}

impl<T: Send + 'static> FusedStream for QueryStream<T> {
    fn is_terminated(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ImmediateExecutor, WorkerPool};
    use futures::StreamExt;
    use rxstore_core::{Error, Value};
    use rxstore_storage::{MemoryRecordStore, Query, RowCursor};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    fn songs() -> Uri {
        Uri::new("content://media/songs")
    }

    fn make_store() -> Arc<MemoryRecordStore> {
        let store = Arc::new(MemoryRecordStore::new());
        store.create_table(songs(), &["title"]).unwrap();
        store
    }

    fn count_rows(store: &MemoryRecordStore) -> Result<usize> {
        let mut cursor = store
            .query(&songs(), &Query::new())?
            .ok_or_else(|| Error::malformed_response(songs().as_str(), "cursor is null"))?;
        let count = cursor.count();
        cursor.close();
        Ok(count)
    }

    async fn next<T: Send + 'static>(stream: &mut QueryStream<T>) -> Option<Result<T>> {
        timeout(WAIT, stream.next()).await.unwrap()
    }

    #[tokio::test]
    async fn test_initial_result_without_changes() {
        let dispatcher = Dispatcher::start("test-dispatch").unwrap();
        let store = make_store();
        let s = store.clone();
        let mut stream = QueryStream::observe(&dispatcher, store.clone(), [songs()], Arc::new(ImmediateExecutor), move || {
            count_rows(&s)
        });
        assert_eq!(next(&mut stream).await.unwrap().unwrap(), 0);
        assert!(timeout(Duration::from_millis(50), stream.next()).await.is_err());
    }

    #[tokio::test]
    async fn test_requery_on_change() {
        let dispatcher = Dispatcher::start("test-dispatch").unwrap();
        let pool = Arc::new(WorkerPool::new(2, "test-worker").unwrap());
        let store = make_store();
        let s = store.clone();
        let mut stream = QueryStream::observe(&dispatcher, store.clone(), [songs()], pool, move || count_rows(&s));
        assert_eq!(next(&mut stream).await.unwrap().unwrap(), 0);

        store.insert(&songs(), vec![Value::String("Intro".into())]).unwrap();
        assert_eq!(next(&mut stream).await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_query_runs_on_worker() {
        let dispatcher = Dispatcher::start("test-dispatch").unwrap();
        let pool = Arc::new(WorkerPool::new(1, "test-worker").unwrap());
        let store = make_store();
        let mut stream = QueryStream::observe(&dispatcher, store, [songs()], pool, || {
            Ok(std::thread::current().name().map(String::from))
        });
        let name = next(&mut stream).await.unwrap().unwrap().unwrap();
        assert!(name.starts_with("test-worker"));
    }

    #[tokio::test]
    async fn test_burst_catches_up() {
        let dispatcher = Dispatcher::start("test-dispatch").unwrap();
        let pool = Arc::new(WorkerPool::new(2, "test-worker").unwrap());
        let store = make_store();
        let s = store.clone();
        let mut stream = QueryStream::observe(&dispatcher, store.clone(), [songs()], pool, move || {
            std::thread::sleep(Duration::from_millis(5));
            count_rows(&s)
        });
        assert_eq!(next(&mut stream).await.unwrap().unwrap(), 0);

        for i in 0..25 {
            store.insert(&songs(), vec![Value::String(format!("t{}", i))]).unwrap();
        }
        let mut last = 0;
        while last != 25 {
            last = next(&mut stream).await.unwrap().unwrap();
            assert!(last <= 25);
        }
        // late coalesced events may re-run the query, but never regress
        while let Ok(item) = timeout(Duration::from_millis(100), stream.next()).await {
            assert_eq!(item.unwrap().unwrap(), 25);
        }
    }

    #[tokio::test]
    async fn test_change_during_query_emits_then_reruns() {
        let dispatcher = Dispatcher::start("test-dispatch").unwrap();
        let pool = Arc::new(WorkerPool::new(1, "test-worker").unwrap());
        let store = make_store();
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded::<()>();
        let runs = Arc::new(AtomicUsize::new(0));
        let (s, r) = (store.clone(), runs.clone());
        let mut stream = QueryStream::observe(&dispatcher, store.clone(), [songs()], pool, move || {
            r.fetch_add(1, Ordering::SeqCst);
            gate_rx.recv().map_err(|_| Error::configuration("gate closed"))?;
            count_rows(&s)
        });

        // first query blocks until released
        assert!(timeout(Duration::from_millis(50), stream.next()).await.is_err());
        assert!(stream.is_querying());
        store.insert(&songs(), vec![Value::String("Intro".into())]).unwrap();
        // make sure the change reached the stream while the query was running
        assert!(timeout(Duration::from_millis(50), stream.next()).await.is_err());

        gate_tx.send(()).unwrap();
        assert_eq!(next(&mut stream).await.unwrap().unwrap(), 1);
        assert!(stream.is_querying());

        gate_tx.send(()).unwrap();
        assert_eq!(next(&mut stream).await.unwrap().unwrap(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(timeout(Duration::from_millis(50), stream.next()).await.is_err());
    }

    #[tokio::test]
    async fn test_sustained_churn_still_emits() {
        let dispatcher = Dispatcher::start("test-dispatch").unwrap();
        let pool = Arc::new(WorkerPool::new(1, "test-worker").unwrap());
        let store = make_store();
        let s = store.clone();
        let mut stream = QueryStream::observe(&dispatcher, store.clone(), [songs()], pool, move || {
            std::thread::sleep(Duration::from_millis(20));
            count_rows(&s)
        });

        // changes arrive four times faster than a query completes
        let stop = Arc::new(AtomicBool::new(false));
        let churn = {
            let (store, stop) = (store.clone(), stop.clone());
            std::thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    store.notify_change(&songs());
                    std::thread::sleep(Duration::from_millis(5));
                }
            })
        };

        let mut emissions = 0;
        while emissions < 3 {
            assert_eq!(next(&mut stream).await.unwrap().unwrap(), 0);
            emissions += 1;
        }
        stop.store(true, Ordering::SeqCst);
        churn.join().unwrap();
    }

    #[tokio::test]
    async fn test_cancel_while_querying_discards_result() {
        let dispatcher = Dispatcher::start("test-dispatch").unwrap();
        let pool = Arc::new(WorkerPool::new(1, "test-worker").unwrap());
        let store = make_store();
        let baseline = store.listener_count();
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded::<()>();
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<()>();
        let s = store.clone();
        let mut stream = QueryStream::observe(&dispatcher, store.clone(), [songs()], pool, move || {
            gate_rx.recv().map_err(|_| Error::configuration("gate closed"))?;
            let rows = count_rows(&s);
            let _ = done_tx.send(());
            rows
        });

        assert!(timeout(Duration::from_millis(50), stream.next()).await.is_err());
        assert!(stream.is_querying());
        stream.cancel().unwrap();
        assert_eq!(store.listener_count(), baseline);

        // the running query is not interrupted, only its result is dropped
        gate_tx.send(()).unwrap();
        done_rx.recv_timeout(WAIT).unwrap();
        assert!(next(&mut stream).await.is_none());
        assert!(!stream.is_querying());
        assert_eq!(store.listener_count(), baseline);
    }

    #[tokio::test]
    async fn test_query_error_terminates_and_unregisters() {
        let dispatcher = Dispatcher::start("test-dispatch").unwrap();
        let store = make_store();
        let s = store.clone();
        let mut stream = QueryStream::observe(&dispatcher, store.clone(), [songs()], Arc::new(ImmediateExecutor), move || {
            count_rows(&s)
        });
        assert_eq!(next(&mut stream).await.unwrap().unwrap(), 0);

        store.set_unreachable(true);
        store.notify_change(&songs());
        assert!(matches!(
            next(&mut stream).await,
            Some(Err(Error::MalformedResponse { .. }))
        ));
        assert_eq!(store.listener_count(), 0);
        assert!(next(&mut stream).await.is_none());
        assert!(stream.is_terminated());
    }

    #[tokio::test]
    async fn test_cancel_discards_and_unregisters() {
        let dispatcher = Dispatcher::start("test-dispatch").unwrap();
        let store = make_store();
        let s = store.clone();
        let mut stream = QueryStream::observe(&dispatcher, store.clone(), [songs()], Arc::new(ImmediateExecutor), move || {
            count_rows(&s)
        });
        assert_eq!(next(&mut stream).await.unwrap().unwrap(), 0);

        stream.cancel().unwrap();
        assert_eq!(store.listener_count(), 0);
        store.insert(&songs(), vec![Value::String("late".into())]).unwrap();
        assert!(next(&mut stream).await.is_none());
    }

    #[tokio::test]
    async fn test_executor_rejection_is_terminal() {
        let dispatcher = Dispatcher::start("test-dispatch").unwrap();
        let pool = Arc::new(WorkerPool::new(1, "test-worker").unwrap());
        pool.shutdown();
        let store = make_store();
        let mut stream = QueryStream::observe(&dispatcher, store.clone(), [songs()], pool, || Ok(()));
        assert!(matches!(
            next(&mut stream).await,
            Some(Err(Error::Configuration { .. }))
        ));
        assert_eq!(store.listener_count(), 0);
    }
}
