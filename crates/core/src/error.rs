//! Error types for rxstore.

use crate::types::ValueKind;
use alloc::string::String;
use core::fmt;

/// Result type alias for rxstore operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for reactive store operations.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Listener registration or deregistration failed, or a required
    /// execution context is unavailable.
    Configuration {
        message: String,
    },
    /// A single-item query found no matching record.
    NotFound {
        uri: String,
    },
    /// The store returned an unreadable result, e.g. no result set at all.
    MalformedResponse {
        uri: String,
        message: String,
    },
    /// A key was read with a kind other than the one it was written with.
    TypeMismatch {
        key: String,
        expected: ValueKind,
        got: ValueKind,
    },
    /// Column not present in a result set.
    ColumnNotFound {
        column: String,
    },
    /// Invalid operation.
    InvalidOperation {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Error::NotFound { uri } => {
                write!(f, "Item not found: uri={}", uri)
            }
            Error::MalformedResponse { uri, message } => {
                write!(f, "Malformed response for uri={}: {}", uri, message)
            }
            Error::TypeMismatch { key, expected, got } => {
                write!(
                    f,
                    "Type mismatch for key {}: expected {}, got {}",
                    key, expected, got
                )
            }
            Error::ColumnNotFound { column } => {
                write!(f, "Column not found: {}", column)
            }
            Error::InvalidOperation { message } => {
                write!(f, "Invalid operation: {}", message)
            }
        }
    }
}

impl core::error::Error for Error {}

impl Error {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(uri: impl Into<String>) -> Self {
        Error::NotFound { uri: uri.into() }
    }

    /// Creates a malformed response error.
    pub fn malformed_response(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MalformedResponse {
            uri: uri.into(),
            message: message.into(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(key: impl Into<String>, expected: ValueKind, got: ValueKind) -> Self {
        Error::TypeMismatch {
            key: key.into(),
            expected,
            got,
        }
    }

    /// Creates a column not found error.
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Error::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for errors that mean "no such record".
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns true for errors that mean "the store is broken or misconfigured".
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration { .. } | Error::MalformedResponse { .. }
        )
    }
}
