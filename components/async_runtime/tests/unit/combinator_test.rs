//! Unit tests for finally and all

use crate::support::{identity, Log};
use async_runtime::{Agent, Function, Promise};
use core_types::{JsError, Value};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn finally_passes_value_through() {
    let agent = Agent::new();
    let log = Log::new();
    let l = log.clone();
    let result = Promise::resolve(&agent, "value")
        .finally(Function::new(move |_| {
            l.push("Promise ready");
            Ok(Value::Undefined)
        }))
        .then(Some(log.handler("then")), None);

    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(result.result(), Some(Value::from("value")));
    assert_eq!(log.entries(), vec!["Promise ready", "then: value"]);
}

#[test]
fn finally_receives_no_arguments() {
    let agent = Agent::new();
    let arg_count = Rc::new(Cell::new(usize::MAX));
    let c = arg_count.clone();
    let _result = Promise::resolve(&agent, 1).finally(Function::new(move |args| {
        c.set(args.len());
        Ok(Value::Undefined)
    }));

    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(arg_count.get(), 0);
}

#[test]
fn finally_does_not_transform_rejection() {
    let agent = Agent::new();
    let caught = Promise::reject(&agent, "E")
        .finally(Function::new(|_| Ok(Value::from("ignored"))))
        .catch(identity());

    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(caught.result(), Some(Value::from("E")));
}

#[test]
fn finally_failure_overrides_fulfillment() {
    let agent = Agent::new();
    let caught = Promise::resolve(&agent, 1)
        .finally(Function::new(|_| Err(JsError::throw(Value::from("F")))))
        .catch(identity());

    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(caught.result(), Some(Value::from("F")));
}

#[test]
fn finally_failure_overrides_rejection() {
    let agent = Agent::new();
    let caught = Promise::reject(&agent, "original")
        .finally(Function::new(|_| Err(JsError::error("cleanup failed"))))
        .catch(identity());

    agent.perform_microtask_checkpoint().unwrap();
    match caught.result() {
        Some(Value::Error(e)) => assert_eq!(e.message, "cleanup failed"),
        other => panic!("Expected cleanup failure, got {:?}", other),
    }
}

#[test]
fn finally_waits_for_returned_promise() {
    let agent = Agent::new();
    let (cleanup, finish_cleanup) = Promise::pending(&agent);
    let c = cleanup.clone();
    let result = Promise::resolve(&agent, 10).finally(Function::new(move |_| Ok(c.clone().into())));

    agent.perform_microtask_checkpoint().unwrap();
    assert!(result.is_pending());

    finish_cleanup.resolve("cleanup value is ignored");
    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(result.result(), Some(Value::Smi(10)));
}

#[test]
fn finally_returned_rejection_overrides() {
    let agent = Agent::new();
    let a = agent.clone();
    let caught = Promise::resolve(&agent, 10)
        .finally(Function::new(move |_| Ok(Promise::reject(&a, "cleanup").into())))
        .catch(identity());

    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(caught.result(), Some(Value::from("cleanup")));
}

#[test]
fn all_preserves_input_order() {
    let agent = Agent::new();
    let (slow, resolve_slow) = Promise::pending(&agent);
    let (fast, resolve_fast) = Promise::pending(&agent);
    let all = Promise::all(&agent, vec![slow.into(), fast.into()]);

    resolve_fast.resolve(1);
    agent.perform_microtask_checkpoint().unwrap();
    assert!(all.is_pending());

    resolve_slow.resolve(3);
    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(
        all.result(),
        Some(Value::Array(vec![Value::Smi(3), Value::Smi(1)]))
    );
}

#[test]
fn all_wraps_plain_values() {
    let agent = Agent::new();
    let all = Promise::all(
        &agent,
        vec![Value::Smi(1), Promise::resolve(&agent, 2).into(), Value::from("three")],
    );

    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(
        all.result(),
        Some(Value::Array(vec![
            Value::Smi(1),
            Value::Smi(2),
            Value::from("three")
        ]))
    );
}

#[test]
fn all_of_nothing_fulfills_with_empty_array() {
    let agent = Agent::new();
    let all = Promise::all(&agent, Vec::new());
    assert_eq!(all.result(), Some(Value::Array(Vec::new())));
}

#[test]
fn all_rejects_with_first_rejection() {
    let agent = Agent::new();
    let (a, reject_a) = Promise::pending(&agent);
    let (b, reject_b) = Promise::pending(&agent);
    let (c, resolve_c) = Promise::pending(&agent);
    let all = Promise::all(&agent, vec![a.into(), b.into(), c.into()]);
    let caught = all.catch(identity());

    reject_b.reject("B");
    agent.perform_microtask_checkpoint().unwrap();
    reject_a.reject("A");
    resolve_c.resolve(3);
    agent.perform_microtask_checkpoint().unwrap();

    assert_eq!(all.reason(), Some(Value::from("B")));
    assert_eq!(caught.result(), Some(Value::from("B")));
}

#[test]
fn all_rejection_leaves_other_reactions_alone() {
    let agent = Agent::new();
    let log = Log::new();
    let (ok, resolve_ok) = Promise::pending(&agent);
    let own = ok.then(Some(log.handler("own reaction")), None);
    let all = Promise::all(&agent, vec![Promise::reject(&agent, "bad").into(), ok.into()]);
    let _ = all.catch(identity());

    agent.perform_microtask_checkpoint().unwrap();
    resolve_ok.resolve(5);
    agent.perform_microtask_checkpoint().unwrap();

    assert_eq!(all.reason(), Some(Value::from("bad")));
    assert_eq!(own.result(), Some(Value::Smi(5)));
    assert_eq!(log.entries(), vec!["own reaction: 5"]);
}
