//! Scenario reports

use crate::scenarios::Scenario;
use serde::Serialize;
use std::fmt;

/// What one scenario printed, in order, and what the runtime reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    /// Scenario that produced the report
    pub scenario: Scenario,
    /// Console lines in the order they were logged
    pub lines: Vec<String>,
    /// Unhandled-rejection diagnostics observed
    pub unhandled_rejections: usize,
    /// Simulated time when the loop went idle
    pub elapsed_ms: u64,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {}: {}", self.scenario, self.scenario.description())?;
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        write!(
            f,
            "-- {} unhandled rejection(s), {}ms simulated",
            self.unhandled_rejections, self.elapsed_ms
        )
    }
}
