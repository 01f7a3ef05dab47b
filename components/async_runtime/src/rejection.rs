//! Unhandled-rejection tracking.
//!
//! A promise rejected while no reaction is attached is remembered here. When
//! the next microtask checkpoint finishes draining, every remembered promise
//! that is still unhandled is reported exactly once. Attaching a reaction to a
//! promise that was already reported marks it handled and produces a
//! [`DiagnosticEvent::RejectionHandled`] at the following checkpoint; the
//! earlier report stands.

use crate::promise::{PromiseId, PromiseRecord, PromiseState};
use core_types::{JsError, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// A process-wide notification delivered to [`Agent::on_diagnostic`](crate::Agent::on_diagnostic) subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    /// A rejected promise had no reaction attached when the queue drained
    UnhandledRejection {
        /// The offending promise
        promise: PromiseId,
        /// Its rejection payload
        reason: Value,
    },
    /// A reaction was attached to a promise already reported as unhandled
    RejectionHandled {
        /// The promise that was handled late
        promise: PromiseId,
    },
    /// A plain microtask (not a promise reaction) returned an error
    MicrotaskError {
        /// The error the job returned
        error: JsError,
    },
}

#[derive(Debug, Default)]
pub(crate) struct RejectionTracker {
    about_to_be_notified: Vec<Rc<RefCell<PromiseRecord>>>,
    handled_late: Vec<PromiseId>,
}

impl RejectionTracker {
    pub(crate) fn track(&mut self, record: Rc<RefCell<PromiseRecord>>) {
        self.about_to_be_notified.push(record);
    }

    pub(crate) fn handled_after_report(&mut self, promise: PromiseId) {
        self.handled_late.push(promise);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.about_to_be_notified.is_empty() && self.handled_late.is_empty()
    }

    /// Collects the events due at the end of a checkpoint.
    pub(crate) fn take_events(&mut self) -> Vec<DiagnosticEvent> {
        let mut events = Vec::new();

        for record in std::mem::take(&mut self.about_to_be_notified) {
            let mut record = record.borrow_mut();
            if record.handled || record.reported {
                continue;
            }
            if let PromiseState::Rejected(reason) = &record.state {
                events.push(DiagnosticEvent::UnhandledRejection {
                    promise: record.id,
                    reason: reason.clone(),
                });
                record.reported = true;
            }
        }

        events.extend(
            std::mem::take(&mut self.handled_late)
                .into_iter()
                .map(|promise| DiagnosticEvent::RejectionHandled { promise }),
        );

        events
    }
}
