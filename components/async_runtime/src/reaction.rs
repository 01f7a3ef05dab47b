//! Reaction records and the job that runs them.

use crate::promise::{Function, Promise};
use crate::task_queue::MicroTask;
use core_types::Value;

/// The outcome a reaction runs against.
#[derive(Debug, Clone)]
pub(crate) enum Settlement {
    Fulfilled(Value),
    Rejected(Value),
}

/// Handlers registered against a promise, plus the promise they settle.
///
/// Created by `then`/`catch`/`finally` (with a downstream promise) and by the
/// runtime itself for adoption, `await` and `all` (without one).
#[derive(Debug)]
pub(crate) struct PromiseReaction {
    on_fulfilled: Option<Function>,
    on_rejected: Option<Function>,
    downstream: Option<Promise>,
}

impl PromiseReaction {
    pub(crate) fn new(
        on_fulfilled: Option<Function>,
        on_rejected: Option<Function>,
        downstream: Option<Promise>,
    ) -> Self {
        Self {
            on_fulfilled,
            on_rejected,
            downstream,
        }
    }

    /// A reaction with no handlers that copies the source's outcome onto
    /// `target`.
    pub(crate) fn forward_to(target: Promise) -> Self {
        Self::new(None, None, Some(target))
    }

    /// Wraps this reaction into a microtask for the given outcome.
    pub(crate) fn into_job(self, settlement: Settlement) -> MicroTask {
        MicroTask::new(move || {
            self.run(settlement);
            Ok(Value::Undefined)
        })
    }

    /// Runs the matching handler and settles the downstream promise.
    ///
    /// A missing handler passes the outcome through unchanged. A failing
    /// handler rejects the downstream promise with the failure.
    pub(crate) fn run(self, settlement: Settlement) {
        let (handler, payload, fulfilled) = match settlement {
            Settlement::Fulfilled(value) => (self.on_fulfilled, value, true),
            Settlement::Rejected(reason) => (self.on_rejected, reason, false),
        };

        let Some(mut handler) = handler else {
            if let Some(downstream) = self.downstream {
                if fulfilled {
                    downstream.settle_fulfilled(payload);
                } else {
                    downstream.settle_rejected(payload);
                }
            }
            return;
        };

        match (self.downstream, handler.call(vec![payload])) {
            (Some(downstream), Ok(value)) => downstream.resolve_with(value),
            (Some(downstream), Err(error)) => downstream.settle_rejected(error.into_value()),
            (None, Ok(_)) => {}
            (None, Err(error)) => {
                tracing::warn!(%error, "internal reaction handler failed");
            }
        }
    }
}
