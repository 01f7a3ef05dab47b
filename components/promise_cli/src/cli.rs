//! Command-line arguments

use crate::scenarios::Scenario;
use clap::Parser;

/// Runs promise and async/await demonstrations on the event loop.
#[derive(Debug, Parser)]
#[command(name = "promise-demo", version)]
pub struct Cli {
    /// Scenario to run
    #[arg(value_enum)]
    pub scenario: Option<Scenario>,

    /// List the available scenarios and exit
    #[arg(short, long, conflicts_with_all = ["scenario", "all"])]
    pub list: bool,

    /// Run every scenario in order
    #[arg(short, long, conflicts_with = "scenario")]
    pub all: bool,

    /// Print the reports as JSON
    #[arg(long)]
    pub json: bool,

    /// Multiplier applied to simulated latencies, from 0 (instant) to 100
    #[arg(long, default_value_t = 1.0)]
    pub delay_scale: f64,

    /// Do not report unhandled promise rejections
    #[arg(long)]
    pub no_rejection_tracking: bool,

    /// Abort a checkpoint after this many microtasks
    #[arg(long)]
    pub microtask_limit: Option<usize>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}
