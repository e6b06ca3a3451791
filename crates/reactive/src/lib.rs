//! rxstore Reactive - Push-based views over change-notified stores.
//!
//! This crate bridges store change notifications onto `futures` streams:
//!
//! - `ChangeSignal` / `ChangeStream`: Coalescing stream of change events for a set of identifiers
//! - `QueryStream`: Re-runs a query on a worker after every change event, latest wins
//! - `content`: Row-mapping helpers for collection and single-item queries
//! - `Dispatcher`: The single thread every change event is published from
//! - `Executor` / `WorkerPool`: Worker contexts queries run on
//! - `ReactiveContext`: Owns the dispatcher and the default worker pool
//!
//! # Example
//!
//! ```rust
//! use futures::executor::block_on;
//! use futures::StreamExt;
//! use rxstore_core::{Result, Uri, Value};
//! use rxstore_reactive::{content, ReactiveContext};
//! use rxstore_storage::{MemoryRecordStore, Query, RowCursor};
//! use std::sync::Arc;
//!
//! let ctx = ReactiveContext::builder().worker_threads(1).build().unwrap();
//! let store = Arc::new(MemoryRecordStore::new());
//! let songs = Uri::new("content://media/songs");
//! store.create_table(songs.clone(), &["title"]).unwrap();
//! store.insert(&songs, vec![Value::String("Intro".into())]).unwrap();
//!
//! let mut titles = content::query(
//!     ctx.dispatcher(),
//!     store.clone(),
//!     songs.clone(),
//!     Query::new(),
//!     ctx.default_executor(),
//!     |cursor: &dyn RowCursor| -> Result<String> { cursor.get_string("title") },
//! );
//!
//! // the first result arrives without any change
//! assert_eq!(block_on(titles.next()).unwrap().unwrap(), vec!["Intro"]);
//!
//! store.insert(&songs, vec![Value::String("Outro".into())]).unwrap();
//! assert_eq!(block_on(titles.next()).unwrap().unwrap(), vec!["Intro", "Outro"]);
//! ```

pub mod content;
pub mod context;
pub mod dispatcher;
pub mod executor;
pub mod query;
pub mod signal;
pub mod subscription;

pub use content::CursorMapper;
pub use context::{ReactiveConfig, ReactiveContext, ReactiveContextBuilder};
pub use dispatcher::{Dispatcher, Job};
pub use executor::{spawn, Executor, ImmediateExecutor, Task, TaskHandle, WorkerPool};
pub use query::QueryStream;
pub use signal::{ChangeEvent, ChangeSignal, ChangeStream, Trigger};
pub use subscription::Subscription;
