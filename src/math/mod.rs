//! Mathematical utilities: dB conversions, least squares and Levenberg–Marquardt.

pub mod db;
pub mod lm;
pub mod ols;

pub use db::*;
pub use lm::*;
pub use ols::*;
