//! `dsd-radar` library crate.
//!
//! Drop size distribution (DSD) time series from disdrometers: moments, DSD
//! parameters, rain rate, polarimetric radar observables and fitted
//! radar-rainfall power laws.
//!
//! The binary (`dsd`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the scattering model is swappable behind `scattering::ScatteringModel`

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod dsd;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod scattering;
