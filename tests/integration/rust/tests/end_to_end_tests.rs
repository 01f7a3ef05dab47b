//! End-to-end behavior across the public API
//!
//! Mirrors the classic promise walkthroughs: executors, chains, error
//! handling and async functions, all on one event loop.

use async_runtime::{
    spawn_async, AsyncFunction, DiagnosticEvent, EventLoop, Function, MicroTask, Promise, Task,
};
use core_types::{JsError, Value};
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn logger(log: &Log, label: &'static str) -> Function {
    let log = log.clone();
    Function::unary(move |value| {
        log.borrow_mut().push(format!("{}: {}", label, value));
        Ok(value)
    })
}

/// Test: script, microtasks and the next task interleave like a browser
#[test]
fn test_task_microtask_interleaving() {
    let mut event_loop = EventLoop::new();
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let agent = event_loop.agent().clone();

    let l = log.clone();
    event_loop.enqueue_task(Task::new(move || {
        l.borrow_mut().push("script start".to_string());
        let _ = Promise::resolve(&agent, 1)
            .then(Some(logger(&l, "then 1")), None)
            .then(Some(logger(&l, "then 2")), None);
        let inner = l.clone();
        agent.enqueue_microtask(MicroTask::new(move || {
            inner.borrow_mut().push("queueMicrotask".to_string());
            Ok(Value::Undefined)
        }));
        l.borrow_mut().push("script end".to_string());
        Ok(Value::Undefined)
    }));
    let l = log.clone();
    event_loop.enqueue_task(Task::new(move || {
        l.borrow_mut().push("timeout".to_string());
        Ok(Value::Undefined)
    }));

    event_loop.run_until_done().unwrap();
    assert_eq!(
        *log.borrow(),
        vec![
            "script start",
            "script end",
            "then 1: 1",
            "queueMicrotask",
            "then 2: 1",
            "timeout"
        ]
    );
}

/// Test: an error thrown deep in a chain skips to the nearest catch and
/// the chain continues after it
#[test]
fn test_error_skips_to_catch_and_recovers() {
    let event_loop = EventLoop::new();
    let agent = event_loop.agent();
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    let result = Promise::resolve(agent, "ok")
        .then(Some(Function::unary(|_| Err(JsError::error("Whoops!")))), None)
        .then(Some(logger(&log, "skipped")), None)
        .catch(Function::unary(|reason| match reason {
            Value::Error(error) => Ok(Value::from(format!("recovered from {}", error.message))),
            other => Ok(other),
        }))
        .then(Some(logger(&log, "after catch")), None);

    agent.perform_microtask_checkpoint().unwrap();
    assert_eq!(*log.borrow(), vec!["after catch: recovered from Whoops!"]);
    assert_eq!(result.result(), Some(Value::from("recovered from Whoops!")));
}

/// Test: async functions compose with then, finally and all
#[test]
fn test_async_functions_compose() {
    let mut event_loop = EventLoop::new();
    let agent = event_loop.agent().clone();
    let cleanups = Rc::new(RefCell::new(0));

    let square = AsyncFunction::new(|cx, args| async move {
        let n = cx
            .await_value(args.into_iter().next().unwrap_or(Value::Smi(0)))
            .await?;
        match n {
            Value::Smi(n) => Ok(Value::Smi(n * n)),
            other => Err(JsError::type_error(format!("{} is not a number", other))),
        }
    });

    let inputs: Vec<Value> = (1..=4)
        .map(|n| square.call(&agent, vec![Value::Smi(n)]).into())
        .collect();
    let c = cleanups.clone();
    let all = Promise::all(&agent, inputs).finally(Function::new(move |_| {
        *c.borrow_mut() += 1;
        Ok(Value::Undefined)
    }));

    let total = spawn_async(&agent, move |cx| async move {
        let squares = cx.await_promise(&all).await?;
        let sum = match squares {
            Value::Array(values) => values.iter().filter_map(Value::as_number).sum::<f64>(),
            _ => 0.0,
        };
        Ok(Value::Double(sum))
    });

    event_loop.run_until_done().unwrap();
    assert_eq!(total.result(), Some(Value::Double(30.0)));
    assert_eq!(*cleanups.borrow(), 1);
}

/// Test: an async function that rejects without a handler is reported
#[test]
fn test_unhandled_async_rejection_reported() {
    let mut event_loop = EventLoop::new();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    event_loop
        .agent()
        .on_diagnostic(move |event| sink.borrow_mut().push(event.clone()));

    let failing = spawn_async(event_loop.agent(), |cx| async move {
        cx.await_value(Value::Undefined).await?;
        Err(JsError::error("async failure"))
    });

    event_loop.run_until_done().unwrap();
    match events.borrow().as_slice() {
        [DiagnosticEvent::UnhandledRejection { promise, reason }] => {
            assert_eq!(*promise, failing.id());
            assert_eq!(reason.to_string(), "Error: async failure");
        }
        other => panic!("Expected one unhandled rejection, got {:?}", other),
    };
}
