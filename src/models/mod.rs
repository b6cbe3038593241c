//! Power-law relationship models.
//!
//! Models are small, pure functions so that the fitting code can stay generic
//! over the number of predictors.

pub mod model;

pub use model::*;
