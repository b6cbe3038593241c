//! Relationship fitting.
//!
//! Responsibilities:
//!
//! - select the valid rows for each relationship family (`relationships`)
//! - fit `R = a · x^b` / `R = a · x1^b · x2^c` by nonlinear least squares
//!   seeded from a log-linear OLS (`fitter`)

pub mod fitter;
pub mod relationships;

pub use fitter::*;
pub use relationships::*;
