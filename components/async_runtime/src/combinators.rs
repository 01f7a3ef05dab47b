//! `finally` and `all`, built on top of the reaction primitive.

use crate::agent::Agent;
use crate::promise::{Function, Promise};
use crate::reaction::PromiseReaction;
use core_types::{JsError, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

impl Promise {
    /// Runs `on_settled` with no arguments whatever the outcome, then settles
    /// the returned promise with the original outcome.
    ///
    /// The callback's return value is ignored, except that a returned promise
    /// is waited for. If the callback fails (or its returned promise
    /// rejects), that failure replaces the original outcome.
    ///
    /// # Examples
    ///
    /// ```
    /// use async_runtime::{Agent, Function, Promise};
    /// use core_types::Value;
    ///
    /// let agent = Agent::new();
    /// let caught = Promise::reject(&agent, "E")
    ///     .finally(Function::new(|_| Ok(Value::from("ignored"))))
    ///     .catch(Function::unary(Ok));
    ///
    /// agent.perform_microtask_checkpoint().unwrap();
    /// assert_eq!(caught.result(), Some(Value::from("E")));
    /// ```
    pub fn finally(&self, on_settled: Function) -> Promise {
        let callback = Rc::new(RefCell::new(on_settled));

        let cb = callback.clone();
        let on_fulfilled = Function::unary(move |value| {
            let returned = cb.borrow_mut().call(Vec::new())?;
            Ok(match Promise::from_value(&returned) {
                Some(pending) => pending
                    .then(Some(Function::unary(move |_| Ok(value.clone()))), None)
                    .into(),
                None => value,
            })
        });

        let on_rejected = Function::unary(move |reason| {
            let returned = callback.borrow_mut().call(Vec::new())?;
            match Promise::from_value(&returned) {
                Some(pending) => Ok(pending
                    .then(
                        Some(Function::unary(move |_| {
                            Err(JsError::from_value(reason.clone()))
                        })),
                        None,
                    )
                    .into()),
                None => Err(JsError::from_value(reason)),
            }
        });

        self.then(Some(on_fulfilled), Some(on_rejected))
    }

    /// Waits for every input and fulfills with their values in input order.
    ///
    /// Non-promise inputs are treated as already fulfilled. The first input
    /// to reject rejects the result; later outcomes are ignored by this
    /// combinator. An empty input fulfills with an empty array.
    ///
    /// # Examples
    ///
    /// ```
    /// use async_runtime::{Agent, Promise};
    /// use core_types::Value;
    ///
    /// let agent = Agent::new();
    /// let (slow, resolve_slow) = Promise::pending(&agent);
    /// let fast = Promise::resolve(&agent, 1);
    ///
    /// let all = Promise::all(&agent, vec![slow.into(), fast.into()]);
    /// agent.perform_microtask_checkpoint().unwrap();
    /// assert!(all.is_pending());
    ///
    /// resolve_slow.resolve(3);
    /// agent.perform_microtask_checkpoint().unwrap();
    /// assert_eq!(all.result(), Some(Value::from(vec![Value::Smi(3), Value::Smi(1)])));
    /// ```
    pub fn all<I>(agent: &Agent, values: I) -> Promise
    where
        I: IntoIterator<Item = Value>,
    {
        let (result, resolver) = Promise::pending(agent);
        let inputs: Vec<Promise> = values
            .into_iter()
            .map(|value| Promise::resolve(agent, value))
            .collect();

        if inputs.is_empty() {
            resolver.resolve(Value::Array(Vec::new()));
            return result;
        }

        let slots = Rc::new(RefCell::new(vec![Value::Undefined; inputs.len()]));
        let remaining = Rc::new(Cell::new(inputs.len()));

        for (index, input) in inputs.into_iter().enumerate() {
            let slots = slots.clone();
            let remaining = remaining.clone();
            let on_fulfilled_resolver = resolver.clone();
            let on_fulfilled = Function::unary(move |value| {
                slots.borrow_mut()[index] = value;
                remaining.set(remaining.get() - 1);
                if remaining.get() == 0 {
                    let values = std::mem::take(&mut *slots.borrow_mut());
                    on_fulfilled_resolver.resolve(Value::Array(values));
                }
                Ok(Value::Undefined)
            });

            let on_rejected_resolver = resolver.clone();
            let on_rejected = Function::unary(move |reason| {
                on_rejected_resolver.reject(reason);
                Ok(Value::Undefined)
            });

            input.add_reaction(PromiseReaction::new(
                Some(on_fulfilled),
                Some(on_rejected),
                None,
            ));
        }

        result
    }
}
