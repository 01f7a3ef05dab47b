//! Error types for the CLI

use async_runtime::RuntimeError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// The event loop stopped with an error
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// A report could not be encoded as JSON
    #[error("could not encode report: {0}")]
    Json(#[from] serde_json::Error),

    /// `--delay-scale` was negative, not a number or above `MAX_DELAY_SCALE`
    #[error("invalid delay scale {0}: expected a number from 0 to 100")]
    InvalidDelayScale(f64),

    /// Neither a scenario, `--list` nor `--all` was given
    #[error("no scenario given; pass a scenario name, --list or --all")]
    NoScenario,
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
