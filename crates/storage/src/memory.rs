//! In-memory record store.
//!
//! `MemoryRecordStore` keeps tables of rows keyed by their base identifier
//! (e.g. `content://media/songs`); individual rows are addressed as
//! `<base>/<id>`. Every mutation notifies the registered change listeners on
//! the mutating thread, after the store's locks have been released.

use crate::cursor::{RowCursor, VecCursor};
use crate::query::{Query, Selection, SortOrder, ID_COLUMN};
use crate::record::{ChangeListener, ListenerId, RecordStore};
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use rxstore_core::{Error, Result, Row, RowId, Uri, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, trace};

/// Row storage backend: HashMap (O(1) lookup) or BTreeMap (ordered scans).
#[cfg(feature = "hash-store")]
type RowMap = hashbrown::HashMap<RowId, Row>;
#[cfg(not(feature = "hash-store"))]
type RowMap = std::collections::BTreeMap<RowId, Row>;

/// Rows of a single table.
struct Table {
    /// Column names, excluding the implicit `_id` column.
    columns: Vec<String>,
    rows: RowMap,
    next_id: RowId,
}

impl Table {
    fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: RowMap::new(),
            next_id: 1,
        }
    }

    /// Column names as seen by readers: `_id` followed by the table columns.
    fn result_columns(&self) -> Vec<String> {
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(ID_COLUMN.to_string());
        columns.extend(self.columns.iter().cloned());
        columns
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Error::column_not_found(name))
    }
}

/// A registered change listener.
struct ListenerEntry {
    uri: Uri,
    notify_for_descendants: bool,
    listener: ChangeListener,
}

/// Thread-safe in-memory implementation of [`RecordStore`].
pub struct MemoryRecordStore {
    tables: RwLock<HashMap<Uri, Table>>,
    listeners: Mutex<HashMap<ListenerId, ListenerEntry>>,
    next_listener_id: AtomicU64,
    unreachable: AtomicBool,
    reject_listeners: AtomicBool,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
            next_listener_id: AtomicU64::new(1),
            unreachable: AtomicBool::new(false),
            reject_listeners: AtomicBool::new(false),
        }
    }

    /// Creates a table at `uri` with the given columns.
    pub fn create_table<S: AsRef<str>>(&self, uri: impl Into<Uri>, columns: &[S]) -> Result<()> {
        let uri = uri.into();
        let columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        if columns.iter().any(|c| c == ID_COLUMN) {
            return Err(Error::invalid_operation(format!(
                "{} is reserved for the row identifier",
                ID_COLUMN
            )));
        }
        let mut tables = self.tables.write();
        if tables.contains_key(&uri) {
            return Err(Error::invalid_operation(format!("Table already exists: {}", uri)));
        }
        tables.insert(uri, Table::new(columns));
        Ok(())
    }

    /// Inserts a row and returns its item identifier.
    pub fn insert(&self, table: &Uri, values: Vec<Value>) -> Result<Uri> {
        let item = {
            let mut tables = self.tables.write();
            let t = tables
                .get_mut(table)
                .ok_or_else(|| Error::invalid_operation(format!("Unknown table: {}", table)))?;
            if values.len() != t.columns.len() {
                return Err(Error::invalid_operation(format!(
                    "expected {} values, got {}",
                    t.columns.len(),
                    values.len()
                )));
            }
            let id = t.next_id;
            t.next_id += 1;
            t.rows.insert(id, Row::new(id, values));
            table.with_appended_id(id)
        };
        self.notify_change(&item);
        Ok(item)
    }

    /// Updates columns of the row at `item`. Returns the number of rows changed.
    pub fn update(&self, item: &Uri, changes: &[(&str, Value)]) -> Result<usize> {
        let updated = {
            let mut tables = self.tables.write();
            let (table, id) = Self::split_item(item)?;
            let t = tables
                .get_mut(&table)
                .ok_or_else(|| Error::invalid_operation(format!("Unknown table: {}", table)))?;
            let mut indices = Vec::with_capacity(changes.len());
            for (column, _) in changes {
                indices.push(t.column_index(column)?);
            }
            match t.rows.get_mut(&id) {
                Some(row) => {
                    for (index, (_, value)) in indices.into_iter().zip(changes) {
                        row.set(index, value.clone());
                    }
                    1
                }
                None => 0,
            }
        };
        if updated > 0 {
            self.notify_change(item);
        }
        Ok(updated)
    }

    /// Deletes the row at an item identifier, or every row of a table
    /// identifier. Returns the number of rows removed.
    pub fn delete(&self, uri: &Uri) -> Result<usize> {
        let removed = {
            let mut tables = self.tables.write();
            if let Some(t) = tables.get_mut(uri) {
                let count = t.rows.len();
                t.rows.clear();
                count
            } else {
                let (table, id) = Self::split_item(uri)?;
                let t = tables
                    .get_mut(&table)
                    .ok_or_else(|| Error::invalid_operation(format!("Unknown table: {}", table)))?;
                usize::from(t.rows.remove(&id).is_some())
            }
        };
        if removed > 0 {
            self.notify_change(uri);
        }
        Ok(removed)
    }

    /// Returns the number of rows in a table.
    pub fn row_count(&self, table: &Uri) -> usize {
        self.tables.read().get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    /// Notifies every listener watching `uri`, an ancestor of it (with
    /// descendant notification), or an identifier beneath it.
    pub fn notify_change(&self, uri: &Uri) {
        let targets: Vec<ChangeListener> = {
            let listeners = self.listeners.lock();
            listeners
                .values()
                .filter(|entry| uri.matches(&entry.uri, entry.notify_for_descendants))
                .map(|entry| entry.listener.clone())
                .collect()
        };
        trace!(uri = %uri, listeners = targets.len(), "notify change");
        for listener in targets {
            listener(uri);
        }
    }

    /// Returns the number of registered change listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Makes every subsequent query fail as if the store were unreachable.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Makes every subsequent listener registration fail.
    pub fn set_reject_listeners(&self, reject: bool) {
        self.reject_listeners.store(reject, Ordering::SeqCst);
    }

    fn split_item(item: &Uri) -> Result<(Uri, RowId)> {
        match (item.parent(), item.last_id()) {
            (Some(table), Some(id)) => Ok((table, id)),
            _ => Err(Error::invalid_operation(format!("Not an item identifier: {}", item))),
        }
    }

    fn read(&self, uri: &Uri, query: &Query) -> Result<Option<VecCursor>> {
        let tables = self.tables.read();

        let (table, mut rows) = if let Some(t) = tables.get(uri) {
            (t, t.rows.values().map(Row::with_leading_id).collect::<Vec<_>>())
        } else {
            let Ok((table_uri, id)) = Self::split_item(uri) else {
                return Ok(None);
            };
            let Some(t) = tables.get(&table_uri) else {
                return Ok(None);
            };
            (t, t.rows.get(&id).map(Row::with_leading_id).into_iter().collect())
        };

        let columns = table.result_columns();
        if let Some(selection) = query.selection() {
            let selection = Selection::compile(selection, query.selection_args(), &columns)?;
            rows.retain(|row| selection.matches(row));
        }
        // the row map may be unordered, so identifier order is the baseline
        rows.sort_by_key(Row::id);
        if let Some(order) = query.sort_order() {
            SortOrder::compile(order, &columns)?.sort(&mut rows);
        }

        let Some(projection) = query.projection() else {
            return Ok(Some(VecCursor::new(columns, rows)));
        };
        let mut indices = Vec::with_capacity(projection.len());
        for column in projection {
            let index = columns
                .iter()
                .position(|c| c == column)
                .ok_or_else(|| Error::column_not_found(column.as_str()))?;
            indices.push(index);
        }
        let rows = rows.iter().map(|row| row.project(&indices)).collect();
        Ok(Some(VecCursor::new(projection.to_vec(), rows)))
    }
}

impl RecordStore for MemoryRecordStore {
    fn register_change_listener(
        &self,
        uri: &Uri,
        notify_for_descendants: bool,
        listener: ChangeListener,
    ) -> Result<ListenerId> {
        if self.reject_listeners.load(Ordering::SeqCst) {
            return Err(Error::configuration(format!(
                "listener registration rejected for {}",
                uri
            )));
        }
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.lock().insert(
            id,
            ListenerEntry {
                uri: uri.clone(),
                notify_for_descendants,
                listener,
            },
        );
        debug!(uri = %uri, listener = %id, "registered change listener");
        Ok(id)
    }

    fn unregister_change_listener(&self, id: ListenerId) -> Result<()> {
        match self.listeners.lock().remove(&id) {
            Some(entry) => {
                debug!(uri = %entry.uri, listener = %id, "unregistered change listener");
                Ok(())
            }
            None => Err(Error::configuration(format!("{} is not registered", id))),
        }
    }

    fn query(&self, uri: &Uri, query: &Query) -> Result<Option<Box<dyn RowCursor>>> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(Error::malformed_response(uri.as_str(), "store unreachable"));
        }
        Ok(self
            .read(uri, query)?
            .map(|cursor| Box::new(cursor) as Box<dyn RowCursor>))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn songs() -> Uri {
        Uri::new("content://media/songs")
    }

    fn make_store() -> MemoryRecordStore {
        let store = MemoryRecordStore::new();
        store.create_table(songs(), &["title", "album"]).unwrap();
        for (title, album) in [("Intro", "A"), ("Verse", "B"), ("Outro", "A")] {
            store
                .insert(&songs(), vec![Value::String(title.into()), Value::String(album.into())])
                .unwrap();
        }
        store
    }

    fn titles(cursor: &mut dyn RowCursor) -> Vec<String> {
        let mut out = Vec::new();
        if cursor.move_to_first() {
            loop {
                out.push(cursor.get_string("title").unwrap());
                if !cursor.move_to_next() {
                    break;
                }
            }
        }
        out
    }

    fn counting_listener() -> (ChangeListener, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let listener: ChangeListener = Arc::new(move |_: &Uri| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (listener, count)
    }

    #[test]
    fn test_insert_returns_item_uri() {
        let store = make_store();
        let item = store
            .insert(&songs(), vec![Value::String("Bonus".into()), Value::Null])
            .unwrap();
        assert_eq!(item.as_str(), "content://media/songs/4");
        assert_eq!(store.row_count(&songs()), 4);
    }

    #[test]
    fn test_query_all_in_id_order() {
        let store = make_store();
        let mut cursor = store.query(&songs(), &Query::new()).unwrap().unwrap();
        assert_eq!(cursor.count(), 3);
        assert_eq!(cursor.column_names(), &["_id", "title", "album"]);
        assert_eq!(titles(cursor.as_mut()), vec!["Intro", "Verse", "Outro"]);
    }

    #[test]
    fn test_query_filter_order_projection() {
        let store = make_store();
        let query = Query::new()
            .project(&["title"])
            .filter("album = ?", [Value::String("A".into())])
            .order_by("title DESC");
        let mut cursor = store.query(&songs(), &query).unwrap().unwrap();
        assert_eq!(cursor.column_names(), &["title"]);
        assert_eq!(titles(cursor.as_mut()), vec!["Outro", "Intro"]);
    }

    #[test]
    fn test_query_item() {
        let store = make_store();
        let mut cursor = store
            .query(&songs().with_appended_id(2), &Query::new())
            .unwrap()
            .unwrap();
        assert_eq!(titles(cursor.as_mut()), vec!["Verse"]);

        let cursor = store
            .query(&songs().with_appended_id(99), &Query::new())
            .unwrap()
            .unwrap();
        assert_eq!(cursor.count(), 0);
    }

    #[test]
    fn test_query_unknown_uri_has_no_result_set() {
        let store = make_store();
        assert!(store.query(&Uri::new("content://media/albums"), &Query::new()).unwrap().is_none());
    }

    #[test]
    fn test_query_unreachable() {
        let store = make_store();
        store.set_unreachable(true);
        assert!(matches!(
            store.query(&songs(), &Query::new()),
            Err(Error::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_update_and_delete() {
        let store = make_store();
        let item = songs().with_appended_id(1);
        assert_eq!(store.update(&item, &[("title", Value::String("Prelude".into()))]).unwrap(), 1);
        assert!(store.update(&item, &[("nope", Value::Null)]).is_err());

        let mut cursor = store.query(&item, &Query::new()).unwrap().unwrap();
        assert_eq!(titles(cursor.as_mut()), vec!["Prelude"]);

        assert_eq!(store.delete(&item).unwrap(), 1);
        assert_eq!(store.delete(&item).unwrap(), 0);
        assert_eq!(store.delete(&songs()).unwrap(), 2);
        assert_eq!(store.row_count(&songs()), 0);
    }

    #[test]
    fn test_listener_descendant_semantics() {
        let store = make_store();
        let (table_listener, table_count) = counting_listener();
        let (item_listener, item_count) = counting_listener();
        let (exact_listener, exact_count) = counting_listener();

        store.register_change_listener(&songs(), true, table_listener).unwrap();
        store
            .register_change_listener(&songs().with_appended_id(1), false, item_listener)
            .unwrap();
        store.register_change_listener(&songs(), false, exact_listener).unwrap();

        store.delete(&songs().with_appended_id(2)).unwrap();
        assert_eq!(table_count.load(Ordering::SeqCst), 1);
        assert_eq!(item_count.load(Ordering::SeqCst), 0);
        assert_eq!(exact_count.load(Ordering::SeqCst), 0);

        store.notify_change(&songs());
        assert_eq!(table_count.load(Ordering::SeqCst), 2);
        assert_eq!(item_count.load(Ordering::SeqCst), 1);
        assert_eq!(exact_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregister() {
        let store = make_store();
        let (listener, count) = counting_listener();
        let id = store.register_change_listener(&songs(), true, listener).unwrap();
        assert_eq!(store.listener_count(), 1);

        store.unregister_change_listener(id).unwrap();
        assert_eq!(store.listener_count(), 0);
        assert!(store.unregister_change_listener(id).is_err());

        store.notify_change(&songs());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reject_listeners() {
        let store = make_store();
        store.set_reject_listeners(true);
        let (listener, _) = counting_listener();
        assert!(matches!(
            store.register_change_listener(&songs(), true, listener),
            Err(Error::Configuration { .. })
        ));
        assert_eq!(store.listener_count(), 0);
    }
}
