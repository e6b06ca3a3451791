//! Key/value store contract.
//!
//! A key/value store holds typed primitive values under string keys and
//! notifies registered listeners with the key that changed.

use crate::record::ListenerId;
use rxstore_core::{Error, Result, Value, ValueKind};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Callback invoked with the key that changed.
pub type KeyListener = Arc<dyn Fn(&str) + Send + Sync>;

/// A typed key/value store with change notification.
pub trait KeyValueStore: Send + Sync {
    /// Returns true if an entry exists for `key`.
    fn contains(&self, key: &str) -> bool;

    /// Returns the stored value, if any.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key`. `Value::Null` is rejected; use `remove`.
    fn put(&self, key: &str, value: Value) -> Result<()>;

    /// Removes the entry for `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Registers a listener called after every change.
    fn register_on_change(&self, listener: KeyListener) -> Result<ListenerId>;

    /// Removes a listener previously returned by `register_on_change`.
    fn unregister_on_change(&self, id: ListenerId) -> Result<()>;

    /// Reads a boolean, or `default` when absent.
    fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        read_typed(self.get(key), key, ValueKind::Boolean, default, Value::as_bool)
    }

    /// Reads a 32-bit integer, or `default` when absent.
    fn get_i32(&self, key: &str, default: i32) -> Result<i32> {
        read_typed(self.get(key), key, ValueKind::Int32, default, Value::as_i32)
    }

    /// Reads a 64-bit integer, or `default` when absent.
    fn get_i64(&self, key: &str, default: i64) -> Result<i64> {
        read_typed(self.get(key), key, ValueKind::Int64, default, |v| match v {
            Value::Int64(n) => Some(*n),
            _ => None,
        })
    }

    /// Reads a float, or `default` when absent.
    fn get_f32(&self, key: &str, default: f32) -> Result<f32> {
        read_typed(self.get(key), key, ValueKind::Float32, default, Value::as_f32)
    }

    /// Reads a string, or `default` when absent.
    fn get_string(&self, key: &str, default: &str) -> Result<String> {
        read_typed(self.get(key), key, ValueKind::String, default.to_string(), |v| {
            v.as_str().map(String::from)
        })
    }

    /// Reads a string set, or `default` when absent.
    fn get_string_set(&self, key: &str, default: BTreeSet<String>) -> Result<BTreeSet<String>> {
        read_typed(self.get(key), key, ValueKind::StringSet, default, |v| {
            v.as_string_set().cloned()
        })
    }

    fn put_bool(&self, key: &str, value: bool) -> Result<()> {
        self.put(key, Value::Boolean(value))
    }

    fn put_i32(&self, key: &str, value: i32) -> Result<()> {
        self.put(key, Value::Int32(value))
    }

    fn put_i64(&self, key: &str, value: i64) -> Result<()> {
        self.put(key, Value::Int64(value))
    }

    fn put_f32(&self, key: &str, value: f32) -> Result<()> {
        self.put(key, Value::Float32(value))
    }

    fn put_string(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, Value::String(value.to_string()))
    }

    fn put_string_set(&self, key: &str, value: BTreeSet<String>) -> Result<()> {
        self.put(key, Value::StringSet(value))
    }
}

/// Extracts a typed value, failing on a stored value of another kind.
fn read_typed<T>(
    stored: Option<Value>,
    key: &str,
    expected: ValueKind,
    default: T,
    extract: impl FnOnce(&Value) -> Option<T>,
) -> Result<T> {
    let Some(value) = stored else {
        return Ok(default);
    };
    match extract(&value) {
        Some(v) => Ok(v),
        None => match value.kind() {
            Some(got) => Err(Error::type_mismatch(key, expected, got)),
            None => Ok(default),
        },
    }
}
