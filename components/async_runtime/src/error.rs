//! Errors surfaced by the scheduler itself.
//!
//! Failures inside executors, handlers and microtasks never show up here:
//! they are converted into rejections or diagnostic events. Only conditions
//! that stop the loop are reported as [`RuntimeError`].

use core_types::JsError;

/// An error that aborts the event loop.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A task (not a microtask) failed and nothing caught it
    #[error("uncaught exception in task: {0}")]
    UncaughtException(JsError),

    /// A single checkpoint ran more jobs than the configured limit
    #[error("microtask limit of {limit} jobs exceeded in a single checkpoint")]
    MicrotaskLimitExceeded {
        /// The configured limit
        limit: usize,
    },
}
