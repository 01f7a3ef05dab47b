//! Core value and error types for the promise runtime.
//!
//! This crate provides the payload and failure types that flow through
//! deferred values, reactions and async functions.
//!
//! # Overview
//!
//! - [`Value`] - Opaque payload carried by fulfilled and rejected promises
//! - [`JsError`] - A raised failure, convertible to and from a rejection payload
//! - [`ErrorKind`] - Types of failures
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, JsError, Value};
//!
//! let num = Value::Smi(42);
//! assert!(num.is_truthy());
//! assert_eq!(num.type_of(), "number");
//!
//! let error = JsError::new(ErrorKind::TypeError, "undefined is not a function");
//! assert_eq!(error.to_string(), "TypeError: undefined is not a function");
//!
//! // A raised plain value comes back unchanged as a rejection payload.
//! let thrown = JsError::throw(Value::from("E"));
//! assert_eq!(thrown.into_value(), Value::from("E"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod value;

pub use error::{ErrorKind, JsError};
pub use value::Value;
