//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration enums (`Band`, `NwMethod`, `FitForm`, `ShapeKind`)
//! - the `DropSizeDistribution` series and its reader input (`DsdInput`)
//! - derived outputs (`RadarParameters`, `DsdParameters`, `PowerLawFit`)

pub mod distribution;
pub mod types;

pub use distribution::*;
pub use types::*;
