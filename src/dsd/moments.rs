//! Moments of the binned DSD.
//!
//! `M_m[t] = Σ_i D_i^m · Nd[t,i] · ΔD_i`
//!
//! Each moment is one matrix–vector product `Nd · w` with per-bin weights
//! `w_i = D_i^m · ΔD_i`, so the bin axis is handled by nalgebra rather than an
//! explicit inner loop.

use nalgebra::{DMatrix, DVector};

/// `m`-th moment for every timestep.
///
/// All-zero rows yield 0.
pub fn moment(nd: &DMatrix<f64>, diameter: &[f64], spread: &[f64], m: f64) -> Vec<f64> {
    let weights = DVector::from_iterator(
        diameter.len(),
        diameter.iter().zip(spread).map(|(d, s)| d.powf(m) * s),
    );
    weighted_sum(nd, &weights)
}

/// `Nd · weights`, returned as a plain vector indexed by timestep.
pub(crate) fn weighted_sum(nd: &DMatrix<f64>, weights: &DVector<f64>) -> Vec<f64> {
    (nd * weights).iter().copied().collect()
}
