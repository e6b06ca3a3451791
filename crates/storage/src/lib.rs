//! rxstore Storage - Store contracts consumed by the reactive layer.
//!
//! This crate provides the two boundary contracts and their in-memory
//! backends:
//!
//! - `RecordStore`: Queryable store addressed by identifier, with change listeners
//! - `RowCursor`: Positional, closable result set returned by a record query
//! - `Query`: Projection, filter, filter arguments and ordering of a read
//! - `KeyValueStore`: Flat typed key/value store with change callbacks
//! - `MemoryRecordStore` / `MemoryPreferences`: Thread-safe in-memory backends
//!
//! # Example
//!
//! ```rust
//! use rxstore_core::{Uri, Value};
//! use rxstore_storage::{MemoryRecordStore, Query, RecordStore, RowCursor};
//!
//! let store = MemoryRecordStore::new();
//! let songs = Uri::new("content://media/songs");
//! store.create_table(songs.clone(), &["title"]).unwrap();
//! let item = store.insert(&songs, vec![Value::String("Intro".into())]).unwrap();
//! assert_eq!(item.as_str(), "content://media/songs/1");
//!
//! let mut cursor = store.query(&songs, &Query::new()).unwrap().unwrap();
//! assert!(cursor.move_to_first());
//! assert_eq!(cursor.get_string("title").unwrap(), "Intro");
//! cursor.close();
//! ```

pub mod cursor;
pub mod kv;
pub mod memory;
pub mod memory_kv;
pub mod query;
pub mod record;

pub use cursor::{RowCursor, VecCursor};
pub use kv::{KeyListener, KeyValueStore};
pub use memory::MemoryRecordStore;
pub use memory_kv::MemoryPreferences;
pub use query::{CompareOp, Query, Selection, SortOrder, ID_COLUMN};
pub use record::{ChangeListener, ListenerId, RecordStore};
