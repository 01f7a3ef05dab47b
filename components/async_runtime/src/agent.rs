//! The agent: single owner of the microtask queue and promise bookkeeping.
//!
//! Every [`Promise`](crate::Promise) holds a handle to the agent that created
//! it. Settlement enqueues reaction jobs here, and
//! [`Agent::perform_microtask_checkpoint`] drains them to empty before
//! delivering rejection diagnostics. All promise state changes are funnelled
//! through this one point, so no locking is needed.

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::promise::{PromiseId, PromiseRecord};
use crate::rejection::{DiagnosticEvent, RejectionTracker};
use crate::task_queue::{MicroTask, MicrotaskQueue};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

type DiagnosticHook = Box<dyn FnMut(&DiagnosticEvent)>;

struct AgentState {
    config: RuntimeConfig,
    microtasks: RefCell<MicrotaskQueue>,
    tracker: RefCell<RejectionTracker>,
    hooks: RefCell<Vec<DiagnosticHook>>,
    /// Events waiting for the running dispatch to deliver them
    undelivered: RefCell<VecDeque<DiagnosticEvent>>,
    dispatching: Cell<bool>,
    next_promise_id: Cell<u64>,
    draining: Cell<bool>,
}

/// Handle to the scheduler state shared by a family of promises.
///
/// Cloning an `Agent` is cheap and yields a handle to the same queue.
///
/// # Examples
///
/// ```
/// use async_runtime::{Agent, MicroTask};
/// use core_types::Value;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let agent = Agent::new();
/// let order = Rc::new(RefCell::new(Vec::new()));
///
/// let o = order.clone();
/// agent.enqueue_microtask(MicroTask::new(move || {
///     o.borrow_mut().push("microtask");
///     Ok(Value::Undefined)
/// }));
/// order.borrow_mut().push("sync");
///
/// agent.perform_microtask_checkpoint().unwrap();
/// assert_eq!(*order.borrow(), vec!["sync", "microtask"]);
/// ```
#[derive(Clone)]
pub struct Agent {
    state: Rc<AgentState>,
}

impl Agent {
    /// Creates an agent with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Creates an agent with the given configuration.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            state: Rc::new(AgentState {
                config,
                microtasks: RefCell::new(MicrotaskQueue::new()),
                tracker: RefCell::new(RejectionTracker::default()),
                hooks: RefCell::new(Vec::new()),
                undelivered: RefCell::new(VecDeque::new()),
                dispatching: Cell::new(false),
                next_promise_id: Cell::new(1),
                draining: Cell::new(false),
            }),
        }
    }

    /// Returns the configuration this agent was created with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.state.config
    }

    /// Appends a job to the microtask queue.
    pub fn enqueue_microtask(&self, microtask: MicroTask) {
        self.state.microtasks.borrow_mut().enqueue(microtask);
    }

    /// Number of jobs currently waiting in the microtask queue.
    pub fn pending_microtasks(&self) -> usize {
        self.state.microtasks.borrow().len()
    }

    /// Subscribes to diagnostic events (unhandled rejections and friends).
    pub fn on_diagnostic<F>(&self, hook: F)
    where
        F: FnMut(&DiagnosticEvent) + 'static,
    {
        self.state.hooks.borrow_mut().push(Box::new(hook));
    }

    /// Returns true if both handles refer to the same agent.
    pub fn ptr_eq(&self, other: &Agent) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Runs microtasks until the queue is empty, then delivers rejection
    /// diagnostics.
    ///
    /// Jobs enqueued by running jobs are drained in the same call. A job that
    /// returns an error is reported as [`DiagnosticEvent::MicrotaskError`]
    /// and draining continues. Calling this from inside a running job is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::MicrotaskLimitExceeded`] when the configured
    /// limit is hit; the remaining jobs stay queued.
    pub fn perform_microtask_checkpoint(&self) -> Result<(), RuntimeError> {
        if self.state.draining.replace(true) {
            return Ok(());
        }
        let drained = self.drain_microtasks();
        self.state.draining.set(false);
        drained?;

        self.notify_rejections();
        Ok(())
    }

    fn drain_microtasks(&self) -> Result<(), RuntimeError> {
        let mut ran = 0usize;
        loop {
            let job = {
                let mut queue = self.state.microtasks.borrow_mut();
                if queue.is_empty() {
                    break;
                }
                if let Some(limit) = self.state.config.microtask_limit {
                    if ran >= limit {
                        tracing::error!(limit, remaining = queue.len(), "microtask limit exceeded");
                        return Err(RuntimeError::MicrotaskLimitExceeded { limit });
                    }
                }
                queue.dequeue()
            };
            let Some(job) = job else { break };
            ran += 1;

            if let Err(error) = job.run() {
                tracing::error!(%error, "microtask failed");
                self.dispatch(vec![DiagnosticEvent::MicrotaskError { error }]);
            }
        }
        if ran > 0 {
            tracing::debug!(jobs = ran, "microtask checkpoint drained");
        }
        Ok(())
    }

    fn notify_rejections(&self) {
        if !self.state.config.track_rejections {
            return;
        }
        let events = self.state.tracker.borrow_mut().take_events();
        for event in &events {
            match event {
                DiagnosticEvent::UnhandledRejection { promise, reason } => {
                    tracing::warn!(%promise, %reason, "unhandled promise rejection");
                }
                DiagnosticEvent::RejectionHandled { promise } => {
                    tracing::debug!(%promise, "rejection handled after report");
                }
                DiagnosticEvent::MicrotaskError { .. } => {}
            }
        }
        if !events.is_empty() {
            self.dispatch(events);
        }
    }

    fn dispatch(&self, events: Vec<DiagnosticEvent>) {
        self.state.undelivered.borrow_mut().extend(events);
        // A hook that raises further events (say by running a checkpoint)
        // leaves them queued for the dispatch already in progress.
        if self.state.dispatching.replace(true) {
            return;
        }

        let mut hooks = std::mem::take(&mut *self.state.hooks.borrow_mut());
        loop {
            let next = self.state.undelivered.borrow_mut().pop_front();
            let Some(event) = next else { break };
            for hook in hooks.iter_mut() {
                hook(&event);
            }
        }
        // Hooks registered while dispatching go after the existing ones.
        {
            let mut slot = self.state.hooks.borrow_mut();
            let added = std::mem::replace(&mut *slot, hooks);
            slot.extend(added);
        }
        self.state.dispatching.set(false);
    }

    pub(crate) fn allocate_promise_id(&self) -> PromiseId {
        let id = self.state.next_promise_id.get();
        self.state.next_promise_id.set(id + 1);
        PromiseId(id)
    }

    pub(crate) fn track_rejection(&self, record: Rc<RefCell<PromiseRecord>>) {
        if self.state.config.track_rejections {
            self.state.tracker.borrow_mut().track(record);
        }
    }

    pub(crate) fn rejection_handled_late(&self, promise: PromiseId) {
        if self.state.config.track_rejections {
            self.state.tracker.borrow_mut().handled_after_report(promise);
        }
    }

    /// Returns true if rejection diagnostics are waiting for the next checkpoint.
    pub fn has_pending_diagnostics(&self) -> bool {
        !self.state.tracker.borrow().is_empty()
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("config", &self.state.config)
            .field("pending_microtasks", &self.pending_microtasks())
            .finish()
    }
}
