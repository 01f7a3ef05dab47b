//! Promise runtime demonstration CLI
//!
//! Entry point for `promise-demo`. Parses CLI arguments, sets up logging and
//! delegates to the Runtime for execution.

use clap::Parser as ClapParser;
use promise_cli::{Cli, CliError, Runtime, Scenario};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    if cli.list {
        for scenario in Scenario::ALL {
            println!("{:<12} {}", scenario.name(), scenario.description());
        }
        return Ok(());
    }

    let runtime = Runtime::new()
        .with_delay_scale(cli.delay_scale)
        .with_rejection_tracking(!cli.no_rejection_tracking)
        .with_microtask_limit(cli.microtask_limit);

    let reports = if cli.all {
        runtime.run_all()?
    } else {
        let scenario = cli.scenario.ok_or(CliError::NoScenario)?;
        vec![runtime.run(scenario)?]
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for (i, report) in reports.iter().enumerate() {
            if i > 0 {
                println!();
            }
            println!("{}", report);
        }
    }

    Ok(())
}
