//! rxstore Core - Core types shared by every rxstore crate.
//!
//! This crate provides the foundational types for the reactive store layer:
//!
//! - `ValueKind`: The closed set of primitive kinds (Boolean, Int32, Int64, Float32, String, StringSet)
//! - `Value`: Runtime values held by key/value entries and record cells
//! - `Row`: A record with a table-unique identifier
//! - `Uri`: Resource identifiers with descendant matching
//! - `Error`: Error taxonomy for reactive store operations
//!
//! # Example
//!
//! ```rust
//! use rxstore_core::{Row, Uri, Value, ValueKind};
//!
//! let songs = Uri::new("content://media/songs");
//! let item = songs.with_appended_id(7);
//! assert!(item.is_descendant_of(&songs));
//!
//! let row = Row::new(7, vec![Value::Int64(7), Value::String("Intro".into())]);
//! assert_eq!(row.get(1).and_then(|v| v.kind()), Some(ValueKind::String));
//! ```

#![no_std]

extern crate alloc;

mod error;
mod row;
mod types;
mod uri;
mod value;

pub use error::{Error, Result};
pub use row::{Row, RowId};
pub use types::ValueKind;
pub use uri::Uri;
pub use value::Value;
