//! Promise runtime demonstration CLI
//!
//! Provides the [`Runtime`] that drives the demonstration scenarios on an
//! [`async_runtime::EventLoop`], plus the argument parser and report types
//! used by the `promise-demo` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod report;
pub mod runtime;
pub mod scenarios;
pub mod timers;

pub use cli::Cli;
pub use error::{CliError, CliResult};
pub use report::ScenarioReport;
pub use runtime::{Runtime, MAX_DELAY_SCALE};
pub use scenarios::Scenario;
pub use timers::TimerHost;
