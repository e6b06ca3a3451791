//! Stored values.
//!
//! `Value` is what a key/value entry or a record cell holds: one of the six
//! [`ValueKind`]s, or `Null` for a cell with nothing in it. Key/value entries
//! are never `Null`.

use crate::types::ValueKind;
use alloc::collections::BTreeSet;
use alloc::string::{String, ToString};
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    String(String),
    StringSet(BTreeSet<String>),
}

impl Value {
    /// The kind of this value; None for `Null`.
    pub fn kind(&self) -> Option<ValueKind> {
        Some(match self {
            Value::Null => return None,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Int32(_) => ValueKind::Int32,
            Value::Int64(_) => ValueKind::Int64,
            Value::Float32(_) => ValueKind::Float32,
            Value::String(_) => ValueKind::String,
            Value::StringSet(_) => ValueKind::StringSet,
        })
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    /// Exact: an `Int64` is not narrowed.
    pub fn as_i32(&self) -> Option<i32> {
        if let Value::Int32(n) = self {
            Some(*n)
        } else {
            None
        }
    }

    /// Accepts `Int64`, and widens `Int32`. Record cells use this; typed
    /// key/value reads check the kind first.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int64(n) => Some(n),
            Value::Int32(n) => Some(i64::from(n)),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        if let Value::Float32(x) = self {
            Some(*x)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn as_string_set(&self) -> Option<&BTreeSet<String>> {
        if let Value::StringSet(set) = self {
            Some(set)
        } else {
            None
        }
    }

    /// Like `cmp`, except that integers of both widths with the same value
    /// compare equal. Used to match filter arguments against cells.
    pub fn loose_cmp(&self, other: &Value) -> Ordering {
        match (self.as_i64(), other.as_i64()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self.cmp(other),
        }
    }

    /// Position of this value's kind in the cross-kind sort order. Null first.
    fn rank(&self) -> u8 {
        self.kind().map_or(0, |kind| kind as u8 + 1)
    }
}

// Floats compare by total order so NaN equals itself and values stay usable
// as map keys and sort keys.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    /// Integers of both widths compare numerically. Other mixed kinds order
    /// by kind.
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Int32(_) | Int64(_), Int32(_) | Int64(_)) => {
                let by_value = self.as_i64().cmp(&other.as_i64());
                by_value.then(self.rank().cmp(&other.rank()))
            }
            (Float32(a), Float32(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (StringSet(a), StringSet(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Int32(n) => n.hash(state),
            Value::Int64(n) => n.hash(state),
            Value::Float32(x) => x.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::StringSet(set) => set.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int32(n) => write!(f, "{}", n),
            Value::Int64(n) => write!(f, "{}", n),
            Value::Float32(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::StringSet(set) => f.debug_list().entries(set.iter()).finish(),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Boolean,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    String => String,
    BTreeSet<String> => StringSet,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn test_kind() {
        assert_eq!(Value::Int64(42).kind(), Some(ValueKind::Int64));
        assert_eq!(Value::StringSet(BTreeSet::new()).kind(), Some(ValueKind::StringSet));
        assert_eq!(Value::Null.kind(), None);
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_accessors_are_kind_exact() {
        assert_eq!(Value::Boolean(true).as_bool(), Some(true));
        assert_eq!(Value::Int32(42).as_i32(), Some(42));
        assert_eq!(Value::Int64(42).as_i32(), None);
        assert_eq!(Value::Int32(7).as_i64(), Some(7));
        assert_eq!(Value::Float32(2.5).as_f32(), Some(2.5));
        assert_eq!(Value::String("42".into()).as_i32(), None);
        assert_eq!(Value::Int32(42).as_str(), None);
    }

    #[test]
    fn test_equality_keeps_kinds_apart() {
        assert_ne!(Value::Int32(42), Value::Int64(42));
        assert_ne!(Value::Boolean(false), Value::Null);
        assert_eq!(Value::Float32(f32::NAN), Value::Float32(f32::NAN));
        assert_eq!(Value::from("a"), Value::String("a".into()));
    }

    #[test]
    fn test_ordering() {
        assert!(Value::Int32(1) < Value::Int64(2));
        assert!(Value::Int64(1) < Value::Int32(2));
        assert!(Value::Null < Value::Boolean(false));
        assert!(Value::Float32(1.0) < Value::Float32(f32::NAN));
        assert!(Value::String("a".into()) < Value::String("b".into()));
        assert_eq!(Value::Int64(1).loose_cmp(&Value::Int32(1)), Ordering::Equal);
        assert_ne!(Value::Int64(1).cmp(&Value::Int32(1)), Ordering::Equal);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(Some(100i64)).as_i64(), Some(100));
        assert!(Value::from(None::<i32>).is_null());
    }

    #[test]
    fn test_display() {
        let set: BTreeSet<String> = ["b", "a"].iter().map(|s| s.to_string()).collect();
        assert_eq!(format!("{}", Value::StringSet(set)), "[\"a\", \"b\"]");
        assert_eq!(format!("{}", Value::Int64(-3)), "-3");
        assert_eq!(format!("{}", Value::Null), "null");
    }
}
