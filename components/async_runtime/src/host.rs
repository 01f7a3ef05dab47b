//! Host completions: results produced off the loop thread.
//!
//! A host (I/O worker, timer thread, network callback) receives a
//! [`Completion`] for a pending promise. The completion is `Send`; calling
//! [`Completion::complete`] ships a producer closure back over a crossbeam
//! channel. The loop thread turns it into a [`Task`], runs the producer there
//! and settles the promise, so promise state is only ever touched on the
//! loop thread.

use crate::promise::Resolver;
use crate::task_queue::{Task, TaskQueue};
use core_types::{JsError, Value};
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::fmt;

type Producer = Box<dyn FnOnce() -> Result<Value, JsError> + Send>;

enum HostMessage {
    Complete { id: u64, produce: Producer },
    Abandoned { id: u64 },
}

/// One-shot capability to settle a promise from another thread.
///
/// Dropping a `Completion` without calling [`Completion::complete`] rejects
/// the promise with an `InternalError`.
pub struct Completion {
    id: u64,
    sender: Option<Sender<HostMessage>>,
}

impl Completion {
    /// Identifier of the operation, unique within its event loop.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Settles the operation's promise with the producer's result.
    ///
    /// The producer runs on the loop thread, so it may build values that
    /// are not `Send` themselves.
    pub fn complete<F>(mut self, produce: F)
    where
        F: FnOnce() -> Result<Value, JsError> + Send + 'static,
    {
        if let Some(sender) = self.sender.take() {
            let message = HostMessage::Complete {
                id: self.id,
                produce: Box::new(produce),
            };
            if sender.send(message).is_err() {
                tracing::debug!(operation = self.id, "event loop gone; completion dropped");
            }
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(HostMessage::Abandoned { id: self.id });
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").field("id", &self.id).finish()
    }
}

/// Loop-side end of the completion channel.
pub(crate) struct HostBridge {
    sender: Sender<HostMessage>,
    receiver: Receiver<HostMessage>,
    outstanding: HashMap<u64, Resolver>,
    next_id: u64,
}

impl HostBridge {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            outstanding: HashMap::new(),
            next_id: 1,
        }
    }

    pub(crate) fn register(&mut self, resolver: Resolver) -> Completion {
        let id = self.next_id;
        self.next_id += 1;
        self.outstanding.insert(id, resolver);
        Completion {
            id,
            sender: Some(self.sender.clone()),
        }
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Moves every completion that has already arrived onto the task queue.
    pub(crate) fn poll_ready(&mut self, tasks: &mut TaskQueue) {
        while let Ok(message) = self.receiver.try_recv() {
            self.deliver(message, tasks);
        }
    }

    /// Blocks until at least one completion arrives.
    pub(crate) fn wait_next(&mut self, tasks: &mut TaskQueue) {
        tracing::trace!(outstanding = self.outstanding.len(), "waiting for host completion");
        if let Ok(message) = self.receiver.recv() {
            self.deliver(message, tasks);
        }
        self.poll_ready(tasks);
    }

    fn deliver(&mut self, message: HostMessage, tasks: &mut TaskQueue) {
        match message {
            HostMessage::Complete { id, produce } => {
                let Some(resolver) = self.outstanding.remove(&id) else {
                    return;
                };
                tracing::trace!(operation = id, "host operation completed");
                tasks.enqueue(Task::new(move || {
                    match produce() {
                        Ok(value) => resolver.resolve(value),
                        Err(error) => resolver.reject(error.into_value()),
                    }
                    Ok(Value::Undefined)
                }));
            }
            HostMessage::Abandoned { id } => {
                let Some(resolver) = self.outstanding.remove(&id) else {
                    return;
                };
                tracing::debug!(operation = id, "host operation abandoned");
                tasks.enqueue(Task::new(move || {
                    resolver.reject(JsError::internal(
                        "host operation abandoned before completion",
                    ));
                    Ok(Value::Undefined)
                }));
            }
        }
    }
}
