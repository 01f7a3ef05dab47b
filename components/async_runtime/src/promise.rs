//! Promise implementation following the Promise/A+ specification.
//!
//! A [`Promise`] is a handle to a shared record holding the state, the
//! pending reactions and the bookkeeping for unhandled-rejection tracking.
//! Settlement happens at most once; reactions always run from the microtask
//! queue, never synchronously, even when attached to an already-settled
//! promise.

use crate::agent::Agent;
use crate::reaction::{PromiseReaction, Settlement};
use core_types::{JsError, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// The state of a Promise.
///
/// The only transitions are `Pending → Fulfilled` and `Pending → Rejected`.
#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState {
    /// The initial state; the promise is neither fulfilled nor rejected.
    Pending,
    /// The promise has been fulfilled with a value.
    Fulfilled(Value),
    /// The promise has been rejected with a reason.
    Rejected(Value),
}

impl PromiseState {
    /// Returns true while the promise is unsettled.
    pub fn is_pending(&self) -> bool {
        matches!(self, PromiseState::Pending)
    }

    /// Returns true once the promise is fulfilled or rejected.
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }
}

/// Identifies a promise within its agent, for diagnostics and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromiseId(pub u64);

impl fmt::Display for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "promise#{}", self.0)
    }
}

/// A function that can be called with arguments and returns a Result.
///
/// Used for promise handlers. An `Err` return is the handler raising.
pub struct Function {
    callback: Box<dyn FnMut(Vec<Value>) -> Result<Value, JsError>>,
}

impl Function {
    /// Creates a new Function from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnMut(Vec<Value>) -> Result<Value, JsError> + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Creates a Function that only looks at its first argument.
    ///
    /// Extra arguments are discarded; a missing argument is `Undefined`.
    pub fn unary<F>(mut f: F) -> Self
    where
        F: FnMut(Value) -> Result<Value, JsError> + 'static,
    {
        Self::new(move |args| f(args.into_iter().next().unwrap_or(Value::Undefined)))
    }

    /// Calls the function with the given arguments.
    pub fn call(&mut self, args: Vec<Value>) -> Result<Value, JsError> {
        (self.callback)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function {{ ... }}")
    }
}

#[derive(Debug)]
pub(crate) struct PromiseRecord {
    pub(crate) id: PromiseId,
    pub(crate) state: PromiseState,
    pub(crate) reactions: Vec<PromiseReaction>,
    /// Set once any reaction has been attached
    pub(crate) handled: bool,
    /// Set once reported as an unhandled rejection
    pub(crate) reported: bool,
    /// Set by the first call to either resolving function
    pub(crate) already_resolved: bool,
}

/// A deferred value.
///
/// Cloning a `Promise` clones the handle; both clones observe the same state.
///
/// # Examples
///
/// ```
/// use async_runtime::{Agent, Function, Promise, PromiseState};
/// use core_types::Value;
///
/// let agent = Agent::new();
/// let promise = Promise::new(&agent, |resolver| {
///     resolver.resolve(2);
///     resolver.reject("ignored");
///     Ok(())
/// });
/// assert_eq!(promise.state(), PromiseState::Fulfilled(Value::Smi(2)));
///
/// let doubled = promise.then(
///     Some(Function::unary(|v| Ok(Value::Smi(v.as_number().unwrap_or(0.0) as i32 * 2)))),
///     None,
/// );
/// // Handlers never run synchronously.
/// assert!(doubled.is_pending());
///
/// agent.perform_microtask_checkpoint().unwrap();
/// assert_eq!(doubled.result(), Some(Value::Smi(4)));
/// ```
#[derive(Clone)]
pub struct Promise {
    record: Rc<RefCell<PromiseRecord>>,
    agent: Agent,
}

impl Promise {
    fn allocate(agent: &Agent) -> Self {
        let id = agent.allocate_promise_id();
        tracing::trace!(promise = %id, "promise created");
        Self {
            record: Rc::new(RefCell::new(PromiseRecord {
                id,
                state: PromiseState::Pending,
                reactions: Vec::new(),
                handled: false,
                reported: false,
                already_resolved: false,
            })),
            agent: agent.clone(),
        }
    }

    /// Creates a promise and runs `executor` synchronously with its resolver.
    ///
    /// If the executor returns `Err`, the promise is rejected with that
    /// failure, unless the executor already resolved it.
    pub fn new<F>(agent: &Agent, executor: F) -> Self
    where
        F: FnOnce(Resolver) -> Result<(), JsError>,
    {
        let (promise, resolver) = Self::pending(agent);
        if let Err(error) = executor(resolver.clone()) {
            tracing::trace!(promise = %promise.id(), %error, "executor failed");
            resolver.reject(error.into_value());
        }
        promise
    }

    /// Creates a pending promise together with its resolver.
    pub fn pending(agent: &Agent) -> (Promise, Resolver) {
        let promise = Self::allocate(agent);
        let resolver = Resolver {
            promise: promise.clone(),
        };
        (promise, resolver)
    }

    /// Returns a promise resolved with `value`.
    ///
    /// A promise of the same agent is returned as is; any other value is
    /// adopted or fulfilled without running an executor.
    pub fn resolve(agent: &Agent, value: impl Into<Value>) -> Promise {
        let value = value.into();
        if let Some(existing) = Promise::from_value(&value) {
            if existing.agent.ptr_eq(agent) {
                return existing;
            }
        }
        let (promise, resolver) = Self::pending(agent);
        resolver.resolve(value);
        promise
    }

    /// Returns a promise already rejected with `reason`.
    pub fn reject(agent: &Agent, reason: impl Into<Value>) -> Promise {
        let (promise, resolver) = Self::pending(agent);
        resolver.reject(reason);
        promise
    }

    /// Recovers a promise that travelled through a payload position.
    pub fn from_value(value: &Value) -> Option<Promise> {
        let Value::NativeObject(object) = value else {
            return None;
        };
        let object = object.try_borrow().ok()?;
        object.downcast_ref::<Promise>().cloned()
    }

    /// The diagnostic identifier of this promise.
    pub fn id(&self) -> PromiseId {
        self.record.borrow().id
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> PromiseState {
        self.record.borrow().state.clone()
    }

    /// Returns true while the promise is unsettled.
    pub fn is_pending(&self) -> bool {
        self.record.borrow().state.is_pending()
    }

    /// The fulfillment value, if fulfilled.
    pub fn result(&self) -> Option<Value> {
        match &self.record.borrow().state {
            PromiseState::Fulfilled(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// The rejection payload, if rejected.
    pub fn reason(&self) -> Option<Value> {
        match &self.record.borrow().state {
            PromiseState::Rejected(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Returns true once any reaction has been attached.
    pub fn is_handled(&self) -> bool {
        self.record.borrow().handled
    }

    /// Number of reactions waiting for this promise to settle.
    pub fn pending_reactions(&self) -> usize {
        self.record.borrow().reactions.len()
    }

    /// The agent whose queue runs this promise's reactions.
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Registers handlers and returns the promise they settle.
    ///
    /// A missing handler passes the corresponding outcome through.
    pub fn then(&self, on_fulfilled: Option<Function>, on_rejected: Option<Function>) -> Promise {
        let downstream = Self::allocate(&self.agent);
        self.add_reaction(PromiseReaction::new(
            on_fulfilled,
            on_rejected,
            Some(downstream.clone()),
        ));
        downstream
    }

    /// Registers a rejection handler; fulfillment passes through.
    pub fn catch(&self, on_rejected: Function) -> Promise {
        self.then(None, Some(on_rejected))
    }

    /// Attaches a reaction, queueing it right away if already settled.
    pub(crate) fn add_reaction(&self, reaction: PromiseReaction) {
        let settlement = {
            let mut guard = self.record.borrow_mut();
            let record = &mut *guard;
            if !record.handled {
                record.handled = true;
                if record.reported {
                    self.agent.rejection_handled_late(record.id);
                }
            }
            match &record.state {
                PromiseState::Pending => {
                    record.reactions.push(reaction);
                    return;
                }
                PromiseState::Fulfilled(value) => Settlement::Fulfilled(value.clone()),
                PromiseState::Rejected(reason) => Settlement::Rejected(reason.clone()),
            }
        };
        self.agent.enqueue_microtask(reaction.into_job(settlement));
    }

    /// Resolves with `value`, adopting its outcome if it is itself a promise.
    pub(crate) fn resolve_with(&self, value: Value) {
        let Some(inner) = Promise::from_value(&value) else {
            self.settle_fulfilled(value);
            return;
        };
        if inner == *self {
            self.settle_rejected(
                JsError::type_error("Chaining cycle detected for promise").into_value(),
            );
            return;
        }
        tracing::trace!(promise = %self.id(), inner = %inner.id(), "adopting promise");
        inner.add_reaction(PromiseReaction::forward_to(self.clone()));
    }

    pub(crate) fn settle_fulfilled(&self, value: Value) {
        let (id, reactions) = {
            let mut record = self.record.borrow_mut();
            if !record.state.is_pending() {
                return;
            }
            record.state = PromiseState::Fulfilled(value.clone());
            (record.id, std::mem::take(&mut record.reactions))
        };
        tracing::trace!(promise = %id, reactions = reactions.len(), "promise fulfilled");
        self.trigger_reactions(reactions, Settlement::Fulfilled(value));
    }

    pub(crate) fn settle_rejected(&self, reason: Value) {
        let (id, reactions, unobserved) = {
            let mut record = self.record.borrow_mut();
            if !record.state.is_pending() {
                return;
            }
            record.state = PromiseState::Rejected(reason.clone());
            (
                record.id,
                std::mem::take(&mut record.reactions),
                !record.handled,
            )
        };
        tracing::trace!(promise = %id, reactions = reactions.len(), "promise rejected");
        if unobserved {
            self.agent.track_rejection(self.record.clone());
        }
        self.trigger_reactions(reactions, Settlement::Rejected(reason));
    }

    fn trigger_reactions(&self, reactions: Vec<PromiseReaction>, settlement: Settlement) {
        for reaction in reactions {
            self.agent
                .enqueue_microtask(reaction.into_job(settlement.clone()));
        }
    }
}

impl PartialEq for Promise {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.record, &other.record)
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.record.borrow();
        f.debug_struct("Promise")
            .field("id", &record.id)
            .field("state", &record.state)
            .field("reactions", &record.reactions.len())
            .finish()
    }
}

impl From<Promise> for Value {
    fn from(promise: Promise) -> Self {
        Value::NativeObject(Rc::new(RefCell::new(promise)))
    }
}

/// The pair of one-shot settlement capabilities handed to an executor.
///
/// Only the first call to [`Resolver::resolve`] or [`Resolver::reject`]
/// has any effect, including when the first call resolves with a pending
/// promise that is still being adopted.
#[derive(Debug, Clone)]
pub struct Resolver {
    promise: Promise,
}

impl Resolver {
    /// Resolves the promise, adopting `value` if it is itself a promise.
    pub fn resolve(&self, value: impl Into<Value>) {
        if self.lock() {
            self.promise.resolve_with(value.into());
        }
    }

    /// Rejects the promise with `reason`.
    pub fn reject(&self, reason: impl Into<Value>) {
        if self.lock() {
            self.promise.settle_rejected(reason.into());
        }
    }

    /// Returns true once either capability has been used.
    pub fn is_resolved(&self) -> bool {
        self.promise.record.borrow().already_resolved
    }

    /// The promise this resolver settles.
    pub fn promise(&self) -> &Promise {
        &self.promise
    }

    /// Splits into `(resolve, reject)` functions that keep only their first argument.
    pub fn into_functions(self) -> (Function, Function) {
        let resolver = self.clone();
        let resolve = Function::unary(move |value| {
            resolver.resolve(value);
            Ok(Value::Undefined)
        });
        let reject = Function::unary(move |reason| {
            self.reject(reason);
            Ok(Value::Undefined)
        });
        (resolve, reject)
    }

    fn lock(&self) -> bool {
        let mut record = self.promise.record.borrow_mut();
        if record.already_resolved {
            return false;
        }
        record.already_resolved = true;
        true
    }
}
