//! Async functions driven by promises.
//!
//! The body of an async function is an ordinary Rust `async` block, so the
//! compiler performs the state-machine transform. This module only supplies
//! the driver: the body is polled synchronously up to its first suspension
//! point, and each [`AsyncContext::await_value`] registers a continuation
//! reaction that polls it again from the microtask queue once the awaited
//! promise settles. The body's `Ok`/`Err` settles the function's promise.

use crate::agent::Agent;
use crate::promise::{Function, Promise, Resolver};
use crate::reaction::{PromiseReaction, Settlement};
use core_types::{JsError, Value};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

type Body = Pin<Box<dyn Future<Output = Result<Value, JsError>>>>;

struct Coroutine {
    /// `None` while being polled and after completion
    body: RefCell<Option<Body>>,
    resolver: Resolver,
}

impl Coroutine {
    fn resume(&self) {
        let Some(mut body) = self.body.borrow_mut().take() else {
            return;
        };
        let mut cx = Context::from_waker(Waker::noop());
        match body.as_mut().poll(&mut cx) {
            Poll::Ready(Ok(value)) => self.resolver.resolve(value),
            Poll::Ready(Err(error)) => self.resolver.reject(error.into_value()),
            Poll::Pending => *self.body.borrow_mut() = Some(body),
        }
    }
}

/// Handle an async function body uses to suspend on promises.
#[derive(Clone)]
pub struct AsyncContext {
    coroutine: Weak<Coroutine>,
    agent: Agent,
}

impl AsyncContext {
    /// The agent running this function.
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Suspends until `value` settles; a non-promise is wrapped with
    /// [`Promise::resolve`] first.
    ///
    /// The result is `Err` with the rejection payload raised as a
    /// [`JsError`] when the awaited promise rejects.
    pub fn await_value(&self, value: impl Into<Value>) -> Await {
        self.await_promise(&Promise::resolve(&self.agent, value))
    }

    /// Suspends until `promise` settles.
    pub fn await_promise(&self, promise: &Promise) -> Await {
        Await {
            promise: Some(promise.clone()),
            coroutine: self.coroutine.clone(),
            outcome: Rc::new(RefCell::new(None)),
        }
    }
}

impl fmt::Debug for AsyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncContext")
            .field("running", &(self.coroutine.strong_count() > 0))
            .finish()
    }
}

/// A suspension point inside an async function.
///
/// Once registered, the awaited promise owns the suspended function through
/// its continuation and the `Await` drops its own handle, so a function
/// waiting on a promise nobody can settle any more is freed with it.
#[must_use = "an await does nothing unless `.await`ed"]
pub struct Await {
    /// `None` once the continuation is registered
    promise: Option<Promise>,
    coroutine: Weak<Coroutine>,
    outcome: Rc<RefCell<Option<Settlement>>>,
}

impl Future for Await {
    type Output = Result<Value, JsError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let settled = this.outcome.borrow_mut().take();
        if let Some(settlement) = settled {
            return Poll::Ready(match settlement {
                Settlement::Fulfilled(value) => Ok(value),
                Settlement::Rejected(reason) => Err(JsError::from_value(reason)),
            });
        }

        if let Some(promise) = this.promise.take() {
            match this.coroutine.upgrade() {
                Some(coroutine) => {
                    promise.add_reaction(continuation(coroutine, this.outcome.clone()))
                }
                None => {
                    tracing::warn!(
                        promise = %promise.id(),
                        "await polled outside its async function"
                    );
                }
            }
        }
        Poll::Pending
    }
}

fn continuation(
    coroutine: Rc<Coroutine>,
    outcome: Rc<RefCell<Option<Settlement>>>,
) -> PromiseReaction {
    let (resume_ok, outcome_ok) = (coroutine.clone(), outcome.clone());
    let on_fulfilled = Function::unary(move |value| {
        *outcome_ok.borrow_mut() = Some(Settlement::Fulfilled(value));
        resume_ok.resume();
        Ok(Value::Undefined)
    });
    let on_rejected = Function::unary(move |reason| {
        *outcome.borrow_mut() = Some(Settlement::Rejected(reason));
        coroutine.resume();
        Ok(Value::Undefined)
    });
    PromiseReaction::new(Some(on_fulfilled), Some(on_rejected), None)
}

/// Calls an async function body and returns its promise.
///
/// The body runs synchronously until its first await; the promise is
/// returned to the caller at that point. `Ok(v)` resolves the promise with
/// `v` (adopting it if `v` is a promise), `Err(e)` rejects it.
///
/// # Examples
///
/// ```
/// use async_runtime::{spawn_async, Agent, Promise};
/// use core_types::Value;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let agent = Agent::new();
/// let log = Rc::new(RefCell::new(Vec::new()));
///
/// let l = log.clone();
/// let promise = spawn_async(&agent, move |cx| async move {
///     let value = cx.await_value(1).await?;
///     l.borrow_mut().push("A");
///     Ok(value)
/// });
/// log.borrow_mut().push("after call");
///
/// agent.perform_microtask_checkpoint().unwrap();
/// assert_eq!(*log.borrow(), vec!["after call", "A"]);
/// assert_eq!(promise.result(), Some(Value::Smi(1)));
/// ```
pub fn spawn_async<F, Fut>(agent: &Agent, body: F) -> Promise
where
    F: FnOnce(AsyncContext) -> Fut,
    Fut: Future<Output = Result<Value, JsError>> + 'static,
{
    let (promise, resolver) = Promise::pending(agent);
    let coroutine = Rc::new_cyclic(|weak: &Weak<Coroutine>| {
        let cx = AsyncContext {
            coroutine: weak.clone(),
            agent: agent.clone(),
        };
        let future: Body = Box::pin(body(cx));
        Coroutine {
            body: RefCell::new(Some(future)),
            resolver,
        }
    });
    tracing::trace!(promise = %promise.id(), "async function started");
    coroutine.resume();
    promise
}

/// A reusable async-marked function.
///
/// # Examples
///
/// ```
/// use async_runtime::{Agent, AsyncFunction};
/// use core_types::Value;
///
/// let add_one = AsyncFunction::new(|cx, args| async move {
///     let first = args.into_iter().next().unwrap_or(Value::Smi(0));
///     let value = cx.await_value(first).await?;
///     Ok(Value::Smi(value.as_number().unwrap_or(0.0) as i32 + 1))
/// });
///
/// let agent = Agent::new();
/// let promise = add_one.call(&agent, vec![Value::Smi(41)]);
/// agent.perform_microtask_checkpoint().unwrap();
/// assert_eq!(promise.result(), Some(Value::Smi(42)));
/// ```
#[derive(Clone)]
pub struct AsyncFunction {
    body: Rc<dyn Fn(AsyncContext, Vec<Value>) -> Body>,
}

impl AsyncFunction {
    /// Wraps an async body taking the call arguments.
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: Fn(AsyncContext, Vec<Value>) -> Fut + 'static,
        Fut: Future<Output = Result<Value, JsError>> + 'static,
    {
        Self {
            body: Rc::new(move |cx: AsyncContext, args: Vec<Value>| -> Body {
                Box::pin(body(cx, args))
            }),
        }
    }

    /// Calls the function; always returns a promise.
    pub fn call(&self, agent: &Agent, args: Vec<Value>) -> Promise {
        let body = self.body.clone();
        spawn_async(agent, move |cx| body(cx, args))
    }

    /// Adapts the function into a promise handler returning its promise.
    pub fn into_function(self, agent: &Agent) -> Function {
        let agent = agent.clone();
        Function::new(move |args| Ok(self.call(&agent, args).into()))
    }
}

impl fmt::Debug for AsyncFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AsyncFunction {{ ... }}")
    }
}
