//! Runtime orchestration for the demonstration scenarios
//!
//! The Runtime owns the settings shared by every run. Each run gets a fresh
//! event loop, timer host and console:
//! - the scenario script is queued as the first task
//! - the loop runs until idle
//! - the earliest timer fires as the next task, until none are left

use crate::error::{CliError, CliResult};
use crate::report::ScenarioReport;
use crate::scenarios::{Console, Scenario, ScenarioContext};
use crate::timers::TimerHost;
use async_runtime::{DiagnosticEvent, EventLoop, RuntimeConfig, Task};
use core_types::Value;
use std::cell::Cell;
use std::rc::Rc;

/// Largest accepted `delay_scale`; the slowest scenario then sleeps a few minutes.
pub const MAX_DELAY_SCALE: f64 = 100.0;

/// Runs scenarios with a given configuration.
#[derive(Debug, Clone)]
pub struct Runtime {
    /// Configuration for each run's agent
    config: RuntimeConfig,
    /// Real seconds slept per simulated second
    delay_scale: f64,
}

impl Runtime {
    /// Create a runtime with default settings and real-time delays.
    ///
    /// # Example
    /// ```
    /// use promise_cli::{Runtime, Scenario};
    ///
    /// let runtime = Runtime::new().with_delay_scale(0.0);
    /// let report = runtime.run(Scenario::Microtasks).unwrap();
    /// assert_eq!(report.lines[0], "code finished");
    /// ```
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            delay_scale: 1.0,
        }
    }

    /// Scale simulated latencies (0 runs without sleeping)
    pub fn with_delay_scale(mut self, scale: f64) -> Self {
        self.delay_scale = scale;
        self
    }

    /// Enable or disable unhandled-rejection reporting
    pub fn with_rejection_tracking(mut self, enabled: bool) -> Self {
        self.config = self.config.with_rejection_tracking(enabled);
        self
    }

    /// Bound the number of microtasks per checkpoint
    pub fn with_microtask_limit(mut self, limit: Option<usize>) -> Self {
        self.config = self.config.with_microtask_limit(limit);
        self
    }

    /// Run one scenario to completion.
    ///
    /// # Errors
    /// Returns `CliError` if the delay scale is outside `0..=MAX_DELAY_SCALE`,
    /// the script fails
    /// or the microtask limit is exceeded
    pub fn run(&self, scenario: Scenario) -> CliResult<ScenarioReport> {
        if !(0.0..=MAX_DELAY_SCALE).contains(&self.delay_scale) {
            return Err(CliError::InvalidDelayScale(self.delay_scale));
        }

        let span = tracing::info_span!("scenario", name = %scenario);
        let _entered = span.enter();

        let mut event_loop = EventLoop::with_config(self.config.clone());
        let timers = TimerHost::new();
        let console = Console::new();
        let unhandled = Rc::new(Cell::new(0usize));

        let (sink, count) = (console.clone(), unhandled.clone());
        event_loop
            .agent()
            .on_diagnostic(move |event| match event {
                DiagnosticEvent::UnhandledRejection { reason, .. } => {
                    count.set(count.get() + 1);
                    sink.log(format!("unhandled rejection: {}", reason));
                }
                DiagnosticEvent::RejectionHandled { .. } => {
                    sink.log("rejection handled after report");
                }
                DiagnosticEvent::MicrotaskError { error } => {
                    sink.log(format!("microtask error: {}", error));
                }
            });

        let cx = ScenarioContext::new(event_loop.agent().clone(), timers.clone(), console.clone());
        event_loop.enqueue_task(Task::new(move || {
            scenario.script(&cx)?;
            Ok(Value::Undefined)
        }));

        loop {
            event_loop.run_until_done()?;
            match timers.fire_next(self.delay_scale) {
                Some(task) => event_loop.enqueue_task(task),
                None => break,
            }
        }

        tracing::info!(elapsed_ms = timers.now_ms(), "scenario finished");
        Ok(ScenarioReport {
            scenario,
            lines: console.lines(),
            unhandled_rejections: unhandled.get(),
            elapsed_ms: timers.now_ms(),
        })
    }

    /// Run every scenario in order.
    ///
    /// # Errors
    /// Stops at the first scenario that fails
    pub fn run_all(&self) -> CliResult<Vec<ScenarioReport>> {
        Scenario::ALL
            .iter()
            .map(|&scenario| self.run(scenario))
            .collect()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
