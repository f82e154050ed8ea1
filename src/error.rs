//! Error types for the deferred-value runtime

use crate::runtime::Value;
use std::fmt;
use thiserror::Error;

/// Main error type
///
/// Most variants are raised synchronously to the caller. [`Error::Thrown`] is
/// different: it is the Rust rendition of a handler "throwing" an arbitrary
/// value, and it is what a promise converts into a rejection reason.
#[derive(Error, Debug)]
pub enum Error {
    /// Contract violation - TypeError and friends
    #[error("{kind}: {message}")]
    RuntimeError { kind: ErrorKind, message: String },

    /// An arbitrary value raised by an initializer or reaction handler
    #[error("Uncaught {0}")]
    Thrown(Value),

    /// Invalid configuration value
    #[error("ConfigError: {0}")]
    Config(String),

    /// Malformed configuration document
    #[error("ConfigError: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// IO error
    #[error("IOError: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

/// Error kinds carried by [`Error::RuntimeError`] and by error values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// TypeError - wrong type for operation
    TypeError,
    /// Generic Error - user-raised error values
    GenericError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::TypeError => write!(f, "TypeError"),
            ErrorKind::GenericError => write!(f, "Error"),
        }
    }
}

impl Error {
    /// Create a TypeError
    pub fn type_error(message: impl Into<String>) -> Self {
        Error::RuntimeError {
            kind: ErrorKind::TypeError,
            message: message.into(),
        }
    }

    /// Raise an arbitrary value, the way `throw value` would
    pub fn thrown(value: impl Into<Value>) -> Self {
        Error::Thrown(value.into())
    }

    /// Kind of this error, if it has one
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::RuntimeError { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Convert into the value a promise is rejected with.
    ///
    /// A thrown value is handed through untouched; every other error becomes
    /// an error value so handlers further down the chain can inspect it.
    pub fn into_reason(self) -> Value {
        match self {
            Error::Thrown(value) => value,
            Error::RuntimeError { kind, message } => Value::Error { kind, message },
            other => Value::Error {
                kind: ErrorKind::GenericError,
                message: other.to_string(),
            },
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Standardized error message templates
pub mod messages {
    pub const NOT_A_FUNCTION: &str = "is not a function";
    pub const NOT_A_PROMISE: &str = "is not a promise";
    pub const NOT_ITERABLE: &str = "is not iterable";
    pub const CHAINING_CYCLE: &str = "Chaining cycle detected for promise";
    pub const BUDGET_TOO_SMALL: &str = "must be at least 1";

    /// Format a "X is not a function" error message
    pub fn not_a_function(name: &str) -> String {
        format!("'{}' {}", name, NOT_A_FUNCTION)
    }

    /// Format a "X is not a promise" error message
    pub fn not_a_promise(name: &str) -> String {
        format!("'{}' {}", name, NOT_A_PROMISE)
    }

    /// Format a "X is not iterable" error message
    pub fn not_iterable(name: &str) -> String {
        format!("'{}' {}", name, NOT_ITERABLE)
    }

    /// Format a "X must be Y" error message
    pub fn must_be(what: &str, requirement: &str) -> String {
        format!("{} {}", what, requirement)
    }
}
