//! Unit tests for EventLoop

use crate::support::Log;
use async_runtime::{
    EventLoop, Function, MicroTask, Promise, RuntimeConfig, RuntimeError, Task,
};
use core_types::Value;
use std::time::Duration;

#[test]
fn new_event_loop_has_empty_task_queue() {
    let event_loop = EventLoop::new();
    assert!(event_loop.is_task_queue_empty());
}

#[test]
fn new_event_loop_has_empty_microtask_queue() {
    let event_loop = EventLoop::new();
    assert!(event_loop.is_microtask_queue_empty());
}

#[test]
fn enqueue_task_adds_to_task_queue() {
    let mut event_loop = EventLoop::new();
    event_loop.enqueue_task(Task::new(|| Ok(Value::Undefined)));
    assert!(!event_loop.is_task_queue_empty());
}

#[test]
fn enqueue_microtask_adds_to_microtask_queue() {
    let mut event_loop = EventLoop::new();
    event_loop.enqueue_microtask(MicroTask::new(|| Ok(Value::Undefined)));
    assert!(!event_loop.is_microtask_queue_empty());
}

#[test]
fn task_queue_fifo_order() {
    let mut event_loop = EventLoop::new();
    let log = Log::new();

    for label in ["task 1", "task 2", "task 3"] {
        let l = log.clone();
        event_loop.enqueue_task(Task::new(move || {
            l.push(label);
            Ok(Value::Undefined)
        }));
    }

    event_loop.run_until_done().unwrap();
    assert_eq!(log.entries(), vec!["task 1", "task 2", "task 3"]);
}

#[test]
fn microtasks_enqueued_while_draining_run_in_same_checkpoint() {
    let mut event_loop = EventLoop::new();
    let log = Log::new();
    let agent = event_loop.agent().clone();

    let l = log.clone();
    event_loop.enqueue_microtask(MicroTask::new(move || {
        l.push("outer");
        let inner = l.clone();
        agent.enqueue_microtask(MicroTask::new(move || {
            inner.push("nested");
            Ok(Value::Undefined)
        }));
        Ok(Value::Undefined)
    }));
    let l = log.clone();
    event_loop.enqueue_microtask(MicroTask::new(move || {
        l.push("second");
        Ok(Value::Undefined)
    }));

    event_loop.run_all_microtasks().unwrap();
    assert_eq!(log.entries(), vec!["outer", "second", "nested"]);
    assert!(event_loop.is_microtask_queue_empty());
}

#[test]
fn promise_reactions_run_before_next_task() {
    let mut event_loop = EventLoop::new();
    let log = Log::new();
    let agent = event_loop.agent().clone();

    let l = log.clone();
    event_loop.enqueue_task(Task::new(move || {
        l.push("script start");
        let _ = Promise::resolve(&agent, "promise done!").then(Some(l.handler("then")), None);
        l.push("code finished");
        Ok(Value::Undefined)
    }));
    let l = log.clone();
    event_loop.enqueue_task(Task::new(move || {
        l.push("next task");
        Ok(Value::Undefined)
    }));

    event_loop.run_until_done().unwrap();
    assert_eq!(
        log.entries(),
        vec![
            "script start",
            "code finished",
            "then: promise done!",
            "next task"
        ]
    );
}

#[test]
fn host_completion_from_worker_thread_settles_promise() {
    let mut event_loop = EventLoop::new();
    let log = Log::new();
    let (promise, completion) = event_loop.start_operation();
    let observed = promise.then(Some(log.handler("loaded")), None);
    assert_eq!(event_loop.outstanding_operations(), 1);

    let worker = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(10));
        completion.complete(|| Ok(Value::from("script.js")));
    });

    event_loop.run_until_done().unwrap();
    worker.join().unwrap();

    assert_eq!(observed.result(), Some(Value::from("script.js")));
    assert_eq!(log.entries(), vec!["loaded: script.js"]);
    assert_eq!(event_loop.outstanding_operations(), 0);
}

#[test]
fn host_completion_error_rejects_promise() {
    let mut event_loop = EventLoop::new();
    let (promise, completion) = event_loop.start_operation();
    let caught = promise.catch(Function::unary(Ok));

    std::thread::spawn(move || {
        completion.complete(|| Err(core_types::JsError::error("Script load error")))
    });

    event_loop.run_until_done().unwrap();
    match caught.result() {
        Some(Value::Error(e)) => assert_eq!(e.message, "Script load error"),
        other => panic!("Expected error value, got {:?}", other),
    }
}

#[test]
fn microtask_limit_stops_runaway_queue() {
    fn spin(agent: async_runtime::Agent) -> MicroTask {
        MicroTask::new(move || {
            agent.enqueue_microtask(spin(agent.clone()));
            Ok(Value::Undefined)
        })
    }

    let mut event_loop =
        EventLoop::with_config(RuntimeConfig::default().with_microtask_limit(Some(100)));
    let agent = event_loop.agent().clone();
    event_loop.enqueue_microtask(spin(agent));

    match event_loop.run_until_done() {
        Err(RuntimeError::MicrotaskLimitExceeded { limit }) => assert_eq!(limit, 100),
        other => panic!("Expected microtask limit error, got {:?}", other),
    }
    assert!(!event_loop.is_microtask_queue_empty());
}
