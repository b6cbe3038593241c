//! Decibel conversions for radar quantities.

/// dB → linear: `10^(0.1·x)`.
pub fn idb(db: f64) -> f64 {
    10f64.powf(0.1 * db)
}

/// Linear → dB: `10·log10(x)`. Non-positive input yields `-inf` or `NaN`.
pub fn db(linear: f64) -> f64 {
    10.0 * linear.log10()
}
