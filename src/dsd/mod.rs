//! Moments and bulk descriptors of binned drop size distributions.
//!
//! Everything here is a pure function of `(Nd, diameter, spread[, bin_edges])`
//! and returns one value per timestep. `DropSizeDistribution` wraps these
//! functions and stores the results in its derived fields.

pub mod moments;
pub mod parameters;
pub mod rain_rate;

pub use moments::*;
pub use parameters::*;
pub use rain_rate::*;
