//! Behavioral contracts every promise implementation on this runtime keeps.

use async_runtime::{
    spawn_async, Agent, DiagnosticEvent, Function, MicroTask, Promise, PromiseState,
};
use core_types::{JsError, Value};
use std::cell::RefCell;
use std::rc::Rc;

fn double() -> Function {
    Function::unary(|value| match value {
        Value::Smi(n) => Ok(Value::Smi(n * 2)),
        other => Err(JsError::type_error(format!("{} is not a number", other))),
    })
}

fn recorder(log: &Rc<RefCell<Vec<String>>>, label: &'static str) -> Function {
    let log = log.clone();
    Function::unary(move |value| {
        log.borrow_mut().push(label.to_string());
        Ok(value)
    })
}

#[test]
fn contract_settlement_happens_once() {
    let agent = Agent::new();
    let (fulfilled, resolver) = Promise::pending(&agent);
    resolver.resolve(1);
    resolver.reject("no");
    resolver.resolve(2);
    assert_eq!(fulfilled.state(), PromiseState::Fulfilled(Value::Smi(1)));

    let (rejected, resolver) = Promise::pending(&agent);
    resolver.reject("first");
    resolver.resolve(3);
    let _ = rejected.catch(Function::unary(Ok));
    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(rejected.state(), PromiseState::Rejected(Value::from("first")));
}

#[test]
fn contract_reactions_run_in_fifo_order() {
    let agent = Agent::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let (a, resolve_a) = Promise::pending(&agent);
    let b = Promise::resolve(&agent, "b");

    let _ = a.then(Some(recorder(&log, "R1")), None);
    let _ = b.then(Some(recorder(&log, "R2")), None);
    let _ = a.then(Some(recorder(&log, "R3")), None);
    resolve_a.resolve("a");

    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(*log.borrow(), vec!["R2", "R1", "R3"]);

    log.borrow_mut().clear();
    let first = Promise::resolve(&agent, 1);
    let second = Promise::resolve(&agent, 2);
    let _ = first.then(Some(recorder(&log, "R1")), None);
    let _ = second.then(Some(recorder(&log, "R2")), None);
    let _ = first.then(Some(recorder(&log, "R3")), None);
    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(*log.borrow(), vec!["R1", "R2", "R3"]);
}

#[test]
fn contract_chain_propagates_values() {
    let agent = Agent::new();
    let result = Promise::resolve(&agent, 2)
        .then(Some(double()), None)
        .then(Some(double()), None);
    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(result.result(), Some(Value::Smi(8)));
}

#[test]
fn contract_catch_passes_fulfillment_through() {
    let agent = Agent::new();
    let invoked = Rc::new(RefCell::new(false));
    let flag = invoked.clone();
    let result = Promise::resolve(&agent, 5).catch(Function::unary(move |_| {
        *flag.borrow_mut() = true;
        Ok(Value::Smi(0))
    }));
    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(result.result(), Some(Value::Smi(5)));
    assert!(!*invoked.borrow());
}

#[test]
fn contract_finally_keeps_original_outcome() {
    let agent = Agent::new();
    let result = Promise::reject(&agent, "E")
        .finally(Function::new(|_| Ok(Value::from("ignored"))))
        .catch(Function::unary(Ok));
    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(result.result(), Some(Value::from("E")));
}

#[test]
fn contract_finally_failure_overrides_outcome() {
    let agent = Agent::new();
    let result = Promise::resolve(&agent, 1)
        .finally(Function::new(|_| Err(JsError::throw(Value::from("F")))))
        .catch(Function::unary(Ok));
    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(result.result(), Some(Value::from("F")));
}

#[test]
fn contract_all_keeps_input_order() {
    let agent = Agent::new();
    let (slow, resolve_slow) = Promise::pending(&agent);
    let (fast, resolve_fast) = Promise::pending(&agent);
    let all = Promise::all(&agent, vec![slow.into(), fast.into()]);

    resolve_fast.resolve(1);
    agent.perform_microtask_checkpoint().unwrap();
    resolve_slow.resolve(3);
    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(
        all.result(),
        Some(Value::Array(vec![Value::Smi(3), Value::Smi(1)]))
    );
}

#[test]
fn contract_returned_promise_is_flattened() {
    let agent = Agent::new();
    let a = agent.clone();
    let received = Rc::new(RefCell::new(None));
    let sink = received.clone();
    let _ = Promise::resolve(&agent, 1)
        .then(
            Some(Function::unary(move |_| Ok(Promise::resolve(&a, "inner").into()))),
            None,
        )
        .then(
            Some(Function::unary(move |value| {
                *sink.borrow_mut() = Some(value.clone());
                Ok(value)
            })),
            None,
        );
    agent.perform_microtask_checkpoint().unwrap();

    let value = received.borrow_mut().take();
    assert_eq!(value, Some(Value::from("inner")));
}

#[test]
fn contract_unhandled_rejection_detected_once() {
    let agent = Agent::new();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    agent.on_diagnostic(move |event| sink.borrow_mut().push(event.clone()));

    let unhandled = Promise::reject(&agent, "X");
    let handled = Promise::reject(&agent, "Y");
    let _ = handled.catch(Function::unary(Ok));
    agent.perform_microtask_checkpoint().unwrap();
    agent.perform_microtask_checkpoint().unwrap();

    assert_eq!(
        *events.borrow(),
        vec![DiagnosticEvent::UnhandledRejection {
            promise: unhandled.id(),
            reason: Value::from("X"),
        }]
    );
}

#[test]
fn contract_await_resumes_after_caller() {
    let agent = Agent::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let l = log.clone();
    let _ = spawn_async(&agent, move |cx| async move {
        cx.await_value(1).await?;
        l.borrow_mut().push("A");
        Ok(Value::Undefined)
    });
    log.borrow_mut().push("after call");

    agent.enqueue_microtask(MicroTask::new(|| Ok(Value::Undefined)));
    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(*log.borrow(), vec!["after call", "A"]);
}
