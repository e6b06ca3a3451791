//! rxstore Preference - Typed, observable key/value settings.
//!
//! - `Preferences`: Factory bound to one key/value store and a reactive context
//! - `Preference<T>`: Blocking and asynchronous access to one key, plus a value stream
//! - `PreferenceValue`: The six storable kinds
//! - `ListenerHub`: Shares a single native store listener among all streams
//!
//! # Example
//!
//! ```rust
//! use futures::executor::block_on;
//! use futures::StreamExt;
//! use rxstore_preference::Preferences;
//! use rxstore_reactive::ReactiveContext;
//! use rxstore_storage::MemoryPreferences;
//! use std::sync::Arc;
//!
//! let ctx = ReactiveContext::builder().worker_threads(1).build().unwrap();
//! let prefs = Preferences::new(Arc::new(MemoryPreferences::new()), &ctx);
//! let flag = prefs.boolean("flag");
//!
//! let mut values = flag.get_or(false);
//! assert!(!block_on(values.next()).unwrap().unwrap());
//!
//! block_on(flag.set(true)).unwrap();
//! assert!(block_on(values.next()).unwrap().unwrap());
//! ```

pub mod hub;
pub mod kind;
pub mod preference;

pub use hub::ListenerHub;
pub use kind::PreferenceValue;
pub use preference::{Preference, Preferences};
