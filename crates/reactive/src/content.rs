//! Record store query helpers.
//!
//! [`query`] watches a collection and yields every matching row mapped
//! through a [`CursorMapper`]; an empty result is an empty list.
//! [`query_item`] watches a single item and fails with `NotFound` once the
//! item is gone. A store that returns no result set at all is reported as
//! `MalformedResponse`.

use crate::dispatcher::Dispatcher;
use crate::executor::Executor;
use crate::query::QueryStream;
use crate::signal::ChangeSignal;
use rxstore_core::{Error, Result, RowId, Uri};
use rxstore_storage::{Query, RecordStore, RowCursor};
use std::sync::Arc;

/// Maps the row under a cursor to a value.
///
/// Called once per row while the cursor is open. Implementations must not
/// move the cursor or keep it past the call.
pub trait CursorMapper<T>: Send + Sync {
    fn map_row(&self, cursor: &dyn RowCursor) -> Result<T>;
}

impl<T, F> CursorMapper<T> for F
where
    F: Fn(&dyn RowCursor) -> Result<T> + Send + Sync,
{
    fn map_row(&self, cursor: &dyn RowCursor) -> Result<T> {
        self(cursor)
    }
}

/// Closes the wrapped cursor when dropped.
struct CursorGuard(Box<dyn RowCursor>);

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

fn open(store: &dyn RecordStore, uri: &Uri, query: &Query) -> Result<CursorGuard> {
    store
        .query(uri, query)?
        .map(CursorGuard)
        .ok_or_else(|| Error::malformed_response(uri.as_str(), "cursor is null"))
}

/// Reads every row behind `uri` once.
pub fn read_all<T, M>(store: &dyn RecordStore, uri: &Uri, query: &Query, mapper: &M) -> Result<Vec<T>>
where
    M: CursorMapper<T> + ?Sized,
{
    let mut cursor = open(store, uri, query)?;
    let mut items = Vec::with_capacity(cursor.0.count());
    if cursor.0.move_to_first() {
        loop {
            items.push(mapper.map_row(cursor.0.as_ref())?);
            if !cursor.0.move_to_next() {
                break;
            }
        }
    }
    Ok(items)
}

/// Reads the first row behind `uri` once. Fails with `NotFound` when there is none.
pub fn read_one<T, M>(store: &dyn RecordStore, uri: &Uri, query: &Query, mapper: &M) -> Result<T>
where
    M: CursorMapper<T> + ?Sized,
{
    let mut cursor = open(store, uri, query)?;
    if !cursor.0.move_to_first() {
        return Err(Error::not_found(uri.as_str()));
    }
    mapper.map_row(cursor.0.as_ref())
}

/// Watches `uri` and yields the mapped rows after every change.
pub fn query<T, M>(
    dispatcher: &Dispatcher,
    store: Arc<dyn RecordStore>,
    uri: Uri,
    query: Query,
    executor: Arc<dyn Executor>,
    mapper: M,
) -> QueryStream<Vec<T>>
where
    T: Send + 'static,
    M: CursorMapper<T> + 'static,
{
    let events = ChangeSignal::observe_one(dispatcher, store.clone(), uri.clone());
    QueryStream::new(events, executor, move || read_all(store.as_ref(), &uri, &query, &mapper))
}

/// Watches the item `<uri>/<id>` and yields it, mapped, after every change.
///
/// An empty `projection` reads every column.
pub fn query_item<T, M>(
    dispatcher: &Dispatcher,
    store: Arc<dyn RecordStore>,
    uri: &Uri,
    projection: &[&str],
    id: RowId,
    executor: Arc<dyn Executor>,
    mapper: M,
) -> QueryStream<T>
where
    T: Send + 'static,
    M: CursorMapper<T> + 'static,
{
    let item = uri.with_appended_id(id);
    let query = if projection.is_empty() {
        Query::new()
    } else {
        Query::new().project(projection)
    };
    let events = ChangeSignal::observe_one(dispatcher, store.clone(), item.clone());
    QueryStream::new(events, executor, move || read_one(store.as_ref(), &item, &query, &mapper))
}
