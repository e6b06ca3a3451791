//! Value kinds a preference can hold.
//!
//! `PreferenceValue` is sealed: it is implemented for exactly the six kinds
//! the key/value store supports, so a `Preference<T>` of any other type
//! cannot be constructed.

use rxstore_core::{Error, Result, Value, ValueKind};
use rxstore_storage::KeyValueStore;
use std::collections::BTreeSet;
use std::fmt::Debug;

mod sealed {
    pub trait Sealed {}

    impl Sealed for bool {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl Sealed for f32 {}
    impl Sealed for String {}
    impl Sealed for std::collections::BTreeSet<String> {}
}

/// A type that can be stored in a key/value store.
pub trait PreferenceValue: sealed::Sealed + Clone + Debug + PartialEq + Send + Sync + 'static {
    /// The stored kind.
    const KIND: ValueKind;

    /// Reads the value at `key`, or `default` when absent.
    fn read(store: &dyn KeyValueStore, key: &str, default: Self) -> Result<Self>;

    /// Writes `value` at `key`.
    fn write(store: &dyn KeyValueStore, key: &str, value: Self) -> Result<()>;

    /// Extracts a value of this kind, or None for any other kind.
    fn from_value(value: &Value) -> Option<Self>;

    /// Reads the value at `key`, distinguishing absence from any stored value.
    fn read_optional(store: &dyn KeyValueStore, key: &str) -> Result<Option<Self>> {
        let Some(value) = store.get(key) else {
            return Ok(None);
        };
        match Self::from_value(&value) {
            Some(v) => Ok(Some(v)),
            None => match value.kind() {
                Some(got) => Err(Error::type_mismatch(key, Self::KIND, got)),
                None => Ok(None),
            },
        }
    }
}

impl PreferenceValue for bool {
    const KIND: ValueKind = ValueKind::Boolean;

    fn read(store: &dyn KeyValueStore, key: &str, default: Self) -> Result<Self> {
        store.get_bool(key, default)
    }

    fn write(store: &dyn KeyValueStore, key: &str, value: Self) -> Result<()> {
        store.put_bool(key, value)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl PreferenceValue for i32 {
    const KIND: ValueKind = ValueKind::Int32;

    fn read(store: &dyn KeyValueStore, key: &str, default: Self) -> Result<Self> {
        store.get_i32(key, default)
    }

    fn write(store: &dyn KeyValueStore, key: &str, value: Self) -> Result<()> {
        store.put_i32(key, value)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i32()
    }
}

impl PreferenceValue for i64 {
    const KIND: ValueKind = ValueKind::Int64;

    fn read(store: &dyn KeyValueStore, key: &str, default: Self) -> Result<Self> {
        store.get_i64(key, default)
    }

    fn write(store: &dyn KeyValueStore, key: &str, value: Self) -> Result<()> {
        store.put_i64(key, value)
    }

    // stored kinds are exact, so a 32-bit entry is not a long
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

impl PreferenceValue for f32 {
    const KIND: ValueKind = ValueKind::Float32;

    fn read(store: &dyn KeyValueStore, key: &str, default: Self) -> Result<Self> {
        store.get_f32(key, default)
    }

    fn write(store: &dyn KeyValueStore, key: &str, value: Self) -> Result<()> {
        store.put_f32(key, value)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f32()
    }
}

impl PreferenceValue for String {
    const KIND: ValueKind = ValueKind::String;

    fn read(store: &dyn KeyValueStore, key: &str, default: Self) -> Result<Self> {
        store.get_string(key, &default)
    }

    fn write(store: &dyn KeyValueStore, key: &str, value: Self) -> Result<()> {
        store.put(key, Value::String(value))
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(String::from)
    }
}

impl PreferenceValue for BTreeSet<String> {
    const KIND: ValueKind = ValueKind::StringSet;

    fn read(store: &dyn KeyValueStore, key: &str, default: Self) -> Result<Self> {
        store.get_string_set(key, default)
    }

    fn write(store: &dyn KeyValueStore, key: &str, value: Self) -> Result<()> {
        store.put_string_set(key, value)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_string_set().cloned()
    }
}
