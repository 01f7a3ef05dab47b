//! Error types raised by executors, handlers and async function bodies.
//!
//! A [`JsError`] is what a callback returns in its `Err` arm. When it crosses
//! into a promise it becomes a rejection payload via [`JsError::into_value`];
//! when a rejection is re-raised (by `await` or `finally`) it comes back via
//! [`JsError::from_value`].

use crate::Value;
use std::fmt;

/// The kind of error.
///
/// These correspond to JavaScript's built-in error constructors, plus
/// [`ErrorKind::Thrown`] for arbitrary raised values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Plain `Error`
    Error,
    /// Type error (e.g., calling a non-function, resolving a promise with itself)
    TypeError,
    /// Reference to an undefined variable
    ReferenceError,
    /// Value out of allowed range
    RangeError,
    /// Internal runtime error
    InternalError,
    /// A non-error value was raised; the value is kept in [`JsError::thrown`]
    Thrown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::InternalError => "InternalError",
            ErrorKind::Thrown => "Uncaught",
        };
        f.write_str(name)
    }
}

/// A raised failure.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, JsError, Value};
///
/// let error = JsError::new(ErrorKind::Error, "whoops");
/// let reason = error.clone().into_value();
/// assert!(matches!(reason, Value::Error(_)));
/// assert_eq!(JsError::from_value(reason), error);
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct JsError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The raised value, when something other than an error object was thrown
    pub thrown: Option<Box<Value>>,
}

impl JsError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            thrown: None,
        }
    }

    /// Creates a plain `Error`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Error, message)
    }

    /// Creates a `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// Creates an `InternalError`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    /// Raises an arbitrary value, like `throw value`.
    ///
    /// Raising an error object yields that error itself, unless the object
    /// already carries a thrown value; that one is kept whole as the payload.
    pub fn throw(value: Value) -> Self {
        match value {
            Value::Error(error) if error.thrown.is_none() => *error,
            other => Self {
                kind: ErrorKind::Thrown,
                message: other.to_string(),
                thrown: Some(Box::new(other)),
            },
        }
    }

    /// Converts a rejection payload back into a raised failure.
    ///
    /// This is the inverse of [`JsError::into_value`].
    pub fn from_value(value: Value) -> Self {
        Self::throw(value)
    }

    /// Converts this failure into a rejection payload.
    ///
    /// A thrown plain value is returned unchanged; any other error is wrapped
    /// in [`Value::Error`].
    pub fn into_value(self) -> Value {
        match self.thrown {
            Some(value) => *value,
            None => Value::Error(Box::new(self)),
        }
    }
}

impl From<JsError> for Value {
    fn from(error: JsError) -> Self {
        error.into_value()
    }
}
