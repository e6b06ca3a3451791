//! Value kind definitions for rxstore.
//!
//! This module defines the closed set of primitive kinds a stored value can have.

use core::fmt;

/// Kinds of values that can be held by a key/value store or a record column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Boolean (true/false)
    Boolean,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit floating point number
    Float32,
    /// UTF-8 string
    String,
    /// Ordered set of UTF-8 strings
    StringSet,
}

impl ValueKind {
    /// Returns the name used when reporting this kind.
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Int32 => "int",
            ValueKind::Int64 => "long",
            ValueKind::Float32 => "float",
            ValueKind::String => "string",
            ValueKind::StringSet => "string set",
        }
    }

    /// Returns whether this kind is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueKind::Int32 | ValueKind::Int64 | ValueKind::Float32)
    }

    /// Returns the default value for this kind as a string representation.
    pub fn default_value_repr(&self) -> &'static str {
        match self {
            ValueKind::Boolean => "false",
            ValueKind::Int32 => "0",
            ValueKind::Int64 => "0",
            ValueKind::Float32 => "0.0",
            ValueKind::String => "\"\"",
            ValueKind::StringSet => "[]",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
