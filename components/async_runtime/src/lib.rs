//! Async runtime: promises, the microtask queue and async functions.
//!
//! This crate provides the deferred-value machinery of a JavaScript-style
//! runtime:
//! - Promise implementation following the Promise/A+ specification
//! - Microtask queue drained to empty after every task
//! - `then`/`catch`/`finally`/`all` combinators
//! - Async functions built on Rust's `async` transform
//! - Unhandled-rejection tracking
//! - Event loop with host completions from worker threads
//!
//! # Overview
//!
//! - [`Agent`] - Owner of the microtask queue; every promise belongs to one
//! - [`Promise`] - Deferred value with irrevocable settlement
//! - [`EventLoop`] - Task loop coordinating host completions and checkpoints
//! - [`spawn_async`] / [`AsyncFunction`] - Async functions returning promises
//!
//! # Examples
//!
//! ## Chaining
//!
//! ```
//! use async_runtime::{Agent, Function, Promise};
//! use core_types::Value;
//!
//! let agent = Agent::new();
//! let double = || Function::unary(|v| Ok(Value::Smi(v.as_number().unwrap_or(0.0) as i32 * 2)));
//!
//! let chain = Promise::resolve(&agent, 2)
//!     .then(Some(double()), None)
//!     .then(Some(double()), None);
//!
//! agent.perform_microtask_checkpoint().unwrap();
//! assert_eq!(chain.result(), Some(Value::Smi(8)));
//! ```
//!
//! ## Unhandled rejections
//!
//! ```
//! use async_runtime::{Agent, DiagnosticEvent, Promise};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let agent = Agent::new();
//! let reported = Rc::new(Cell::new(0));
//! let r = reported.clone();
//! agent.on_diagnostic(move |event| {
//!     if matches!(event, DiagnosticEvent::UnhandledRejection { .. }) {
//!         r.set(r.get() + 1);
//!     }
//! });
//!
//! let _forgotten = Promise::reject(&agent, "X");
//! agent.perform_microtask_checkpoint().unwrap();
//! assert_eq!(reported.get(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod agent;
pub mod async_fn;
mod combinators;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod host;
pub mod promise;
mod reaction;
pub mod rejection;
pub mod task_queue;

// Re-export main types at crate root
pub use agent::Agent;
pub use async_fn::{spawn_async, AsyncContext, AsyncFunction, Await};
pub use config::RuntimeConfig;
pub use error::RuntimeError;
pub use event_loop::EventLoop;
pub use host::Completion;
pub use promise::{Function, Promise, PromiseId, PromiseState, Resolver};
pub use rejection::DiagnosticEvent;
pub use task_queue::{MicroTask, MicrotaskQueue, Task, TaskQueue};
