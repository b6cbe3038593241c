//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - installs the log subscriber
//! - runs the pipeline
//! - prints the report and writes optional exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, SimulateArgs};
use crate::domain::SimulationConfig;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `dsd` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let config = simulation_config_from_args(&args);
    let run = pipeline::run_simulation(&config)?;

    println!("{}", crate::report::format_run_summary(&run.report));

    if let Some(path) = &config.export {
        crate::io::export::write_report_json(path, &run.report)?;
    }

    Ok(())
}

pub fn simulation_config_from_args(args: &SimulateArgs) -> SimulationConfig {
    SimulationConfig {
        steps: args.steps,
        seed: args.seed,
        interval_secs: args.interval,
        dry_fraction: args.dry_fraction,
        bin_noise: args.bin_noise,
        band: args.band,
        shape: args.shape,
        nw_method: args.nw,
        form: args.form,
        export: args.export.clone(),
    }
}

/// Log to stderr, filtered by `RUST_LOG` or else by `-v` count.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed (e.g. by a test harness).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
