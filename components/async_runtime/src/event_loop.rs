//! Event loop implementation.
//!
//! This module provides the main event loop that coordinates task and microtask
//! execution following the JavaScript event loop model.

use crate::agent::Agent;
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::host::{Completion, HostBridge};
use crate::promise::Promise;
use crate::task_queue::{MicroTask, Task, TaskQueue};

/// The JavaScript event loop.
///
/// Each iteration (turn) of the loop:
/// 1. Collects host completions that have arrived
/// 2. Takes the oldest task from the task queue and executes it
/// 3. Drains all microtasks, then delivers rejection diagnostics
/// 4. Repeats, blocking for host completions when nothing else is queued
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, Function, Promise};
/// use core_types::Value;
///
/// let mut event_loop = EventLoop::new();
/// let (promise, completion) = event_loop.start_operation();
/// let doubled = promise.then(
///     Some(Function::unary(|v| Ok(Value::Smi(v.as_number().unwrap_or(0.0) as i32 * 2)))),
///     None,
/// );
///
/// std::thread::spawn(move || completion.complete(|| Ok(Value::Smi(21))));
///
/// event_loop.run_until_done().unwrap();
/// assert_eq!(doubled.result(), Some(Value::Smi(42)));
/// ```
pub struct EventLoop {
    agent: Agent,
    task_queue: TaskQueue,
    host: HostBridge,
}

impl EventLoop {
    /// Creates a new EventLoop with empty queues.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Creates an EventLoop whose agent uses `config`.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            agent: Agent::with_config(config),
            task_queue: TaskQueue::new(),
            host: HostBridge::new(),
        }
    }

    /// The agent promises on this loop must be created with.
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Runs the event loop until no task, microtask or host operation is left.
    ///
    /// # Errors
    ///
    /// Returns an error if a task fails or the microtask limit is exceeded.
    pub fn run_until_done(&mut self) -> Result<(), RuntimeError> {
        loop {
            self.process_one_cycle()?;

            let idle = self.task_queue.is_empty()
                && self.agent.pending_microtasks() == 0
                && !self.agent.has_pending_diagnostics();
            if !idle {
                continue;
            }
            if self.host.outstanding() == 0 {
                break;
            }
            self.host.wait_next(&mut self.task_queue);
        }

        Ok(())
    }

    /// Adds a task to the task queue.
    pub fn enqueue_task(&mut self, task: Task) {
        self.task_queue.enqueue(task);
    }

    /// Adds a microtask to the microtask queue.
    pub fn enqueue_microtask(&mut self, microtask: MicroTask) {
        self.agent.enqueue_microtask(microtask);
    }

    /// Returns true if the task queue is empty.
    pub fn is_task_queue_empty(&self) -> bool {
        self.task_queue.is_empty()
    }

    /// Returns true if the microtask queue is empty.
    pub fn is_microtask_queue_empty(&self) -> bool {
        self.agent.pending_microtasks() == 0
    }

    /// Number of host operations started but not yet delivered.
    pub fn outstanding_operations(&self) -> usize {
        self.host.outstanding()
    }

    /// Starts a host operation: returns its pending promise and the
    /// completion the host uses to settle it.
    pub fn start_operation(&mut self) -> (Promise, Completion) {
        let (promise, resolver) = Promise::pending(&self.agent);
        let completion = self.host.register(resolver);
        tracing::trace!(
            promise = %promise.id(),
            operation = completion.id(),
            "host operation started"
        );
        (promise, completion)
    }

    /// Runs all microtasks in the queue until empty.
    ///
    /// New microtasks added during execution are processed before this
    /// method returns.
    pub fn run_all_microtasks(&mut self) -> Result<(), RuntimeError> {
        self.agent.perform_microtask_checkpoint()
    }

    /// Processes one complete cycle: one task followed by all microtasks.
    pub fn process_one_cycle(&mut self) -> Result<(), RuntimeError> {
        self.host.poll_ready(&mut self.task_queue);

        if let Some(task) = self.task_queue.dequeue() {
            task.run().map_err(RuntimeError::UncaughtException)?;
        }

        self.agent.perform_microtask_checkpoint()
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("agent", &self.agent)
            .field("tasks", &self.task_queue.len())
            .field("outstanding_operations", &self.host.outstanding())
            .finish()
    }
}
