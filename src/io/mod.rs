//! Input/output helpers.
//!
//! - run report export (JSON) (`export`)

pub mod export;

pub use export::*;
