//! Simulated `setTimeout` host.
//!
//! Timers run on a logical clock: each timer is due at the clock value when
//! it was set plus its delay, and timers fire in `(deadline, insertion)`
//! order. Firing a timer advances the clock to its deadline and hands its
//! callback to the event loop as a task. Optionally the host also sleeps
//! for the scaled real delay so a demonstration unfolds at a watchable pace.
//! Output never depends on wall-clock timing.

use async_runtime::Task;
use core_types::{JsError, Value};
use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

type Callback = Box<dyn FnOnce() -> Result<Value, JsError>>;

struct TimerEntry {
    deadline_ms: u64,
    seq: u64,
    callback: Callback,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimerEntry {}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.deadline_ms, self.seq).cmp(&(other.deadline_ms, other.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct TimerState {
    now_ms: u64,
    seq: u64,
    timers: BinaryHeap<Reverse<TimerEntry>>,
}

/// Shared handle to the timer heap.
///
/// Clones refer to the same clock, so handlers running inside the event
/// loop can schedule further timers.
#[derive(Clone, Default)]
pub struct TimerHost {
    state: Rc<RefCell<TimerState>>,
}

impl TimerHost {
    /// Creates a host with the clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `callback` to run as a task `delay_ms` after the current time.
    ///
    /// Returns the timer's sequence number.
    pub fn set_timeout<F>(&self, delay_ms: u64, callback: F) -> u64
    where
        F: FnOnce() -> Result<Value, JsError> + 'static,
    {
        let mut state = self.state.borrow_mut();
        let seq = state.seq;
        state.seq += 1;
        let deadline_ms = state.now_ms.saturating_add(delay_ms);
        tracing::trace!(timer = seq, deadline_ms, "timer scheduled");
        state.timers.push(Reverse(TimerEntry {
            deadline_ms,
            seq,
            callback: Box::new(callback),
        }));
        seq
    }

    /// Current simulated time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.state.borrow().now_ms
    }

    /// Number of timers that have not fired yet.
    pub fn pending(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// Pops the earliest timer, advances the clock to its deadline and
    /// returns its callback as a task.
    ///
    /// With a positive `delay_scale` the calling thread first sleeps for the
    /// elapsed simulated time multiplied by the scale.
    pub fn fire_next(&self, delay_scale: f64) -> Option<Task> {
        let (entry, waited_ms) = {
            let mut state = self.state.borrow_mut();
            let Reverse(entry) = state.timers.pop()?;
            let waited_ms = entry.deadline_ms.saturating_sub(state.now_ms);
            state.now_ms = state.now_ms.max(entry.deadline_ms);
            (entry, waited_ms)
        };

        if delay_scale > 0.0 && waited_ms > 0 {
            match Duration::try_from_secs_f64(waited_ms as f64 * delay_scale / 1000.0) {
                Ok(pause) => std::thread::sleep(pause),
                Err(error) => {
                    tracing::warn!(%error, waited_ms, delay_scale, "timer pause skipped")
                }
            }
        }
        tracing::trace!(timer = entry.seq, now_ms = entry.deadline_ms, "timer fired");
        Some(Task::new(entry.callback))
    }
}

impl fmt::Debug for TimerHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("TimerHost")
            .field("now_ms", &state.now_ms)
            .field("pending", &state.timers.len())
            .finish()
    }
}
