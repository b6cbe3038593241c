//! Rain rate and reflectivity factor from the binned DSD.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};

use crate::dsd::moments::{moment, weighted_sum};

/// Fall speed assigned to the smallest bin (m/s).
///
/// The exponential fit is unreliable there.
pub const FIRST_BIN_VELOCITY: f64 = 0.5;

/// Atlas-type terminal velocity (m/s) for each bin center (mm).
///
/// `v(D) = 9.65 - 10.3 · exp(-0.6 D)`, except bin 0 which is pinned to
/// [`FIRST_BIN_VELOCITY`].
pub fn terminal_velocity(diameter: &[f64]) -> Vec<f64> {
    diameter
        .iter()
        .enumerate()
        .map(|(i, d)| {
            if i == 0 {
                FIRST_BIN_VELOCITY
            } else {
                9.65 - 10.3 * (-0.6 * d).exp()
            }
        })
        .collect()
}

/// Rain rate (mm/h) per timestep.
///
/// `R = 0.6π·10⁻³ · Σ_i v_i · Nd[t,i] · ΔD_i · D_i³`
pub fn rain_rate(nd: &DMatrix<f64>, diameter: &[f64], spread: &[f64]) -> Vec<f64> {
    let velocity = terminal_velocity(diameter);
    let weights = DVector::from_iterator(
        diameter.len(),
        velocity
            .iter()
            .zip(diameter)
            .zip(spread)
            .map(|((v, d), s)| 0.6 * PI * 1e-3 * v * s * d.powi(3)),
    );
    weighted_sum(nd, &weights)
}

/// Rayleigh reflectivity factor `10·log10(Σ Nd D⁶ ΔD)` (dBZ).
///
/// Empty timesteps give `-inf`.
pub fn reflectivity_factor(nd: &DMatrix<f64>, diameter: &[f64], spread: &[f64]) -> Vec<f64> {
    moment(nd, diameter, spread, 6.0)
        .into_iter()
        .map(crate::math::db)
        .collect()
}
