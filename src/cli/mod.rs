//! Command-line parsing for the DSD radar toolkit.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the physics/fitting code.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::domain::{Band, FitForm, NwMethod, ShapeKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "dsd",
    version,
    about = "Drop size distribution parameterization and radar rainfall relationships"
)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a synthetic gamma-DSD series, derive radar observables and
    /// fit the rain-rate relationships.
    Simulate(SimulateArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Number of timesteps to generate.
    #[arg(short = 'n', long, default_value_t = 720)]
    pub steps: usize,

    /// Random seed for the synthetic series.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Spacing between timesteps (seconds).
    #[arg(long, default_value_t = 60)]
    pub interval: i64,

    /// Fraction of timesteps without drops.
    #[arg(long, default_value_t = 0.05)]
    pub dry_fraction: f64,

    /// Log-normal noise (std-dev of ln) applied to each bin.
    #[arg(long, default_value_t = 0.1)]
    pub bin_noise: f64,

    /// Radar band for the scattering calculation.
    #[arg(short = 'b', long, value_enum, default_value_t = Band::X)]
    pub band: Band,

    /// Raindrop axis-ratio model.
    #[arg(long, value_enum, default_value_t = ShapeKind::BeardChuang)]
    pub shape: ShapeKind,

    /// Normalized intercept definition.
    #[arg(long, value_enum, default_value_t = NwMethod::Bringi)]
    pub nw: NwMethod,

    /// Power-law solve: direct nonlinear or log-linear.
    #[arg(long, value_enum, default_value_t = FitForm::Direct)]
    pub form: FitForm,

    /// Write the full report (summary, fits, per-timestep series) to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}
