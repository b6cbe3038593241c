//! Bulk DSD descriptors: Nt, W, D0, Nw, Dmax, Dm.
//!
//! D0 and Nw follow Bringi & Chandrasekar. Timesteps with an empty
//! distribution produce `NaN` for D0, Dmax, Dm and Nw (Nt and W are 0).

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};

use crate::domain::{DsdParameters, NwMethod, RHO_W, W_CONST};
use crate::dsd::moments::{moment, weighted_sum};

/// Compute every descriptor for every timestep.
pub fn parameterize(
    nd: &DMatrix<f64>,
    diameter: &[f64],
    spread: &[f64],
    bin_edges: &[f64],
    method: NwMethod,
) -> DsdParameters {
    let m3 = moment(nd, diameter, spread, 3.0);
    let m4 = moment(nd, diameter, spread, 4.0);

    let dm: Vec<f64> = m4.iter().zip(&m3).map(|(a, b)| a / b).collect();
    let nt = weighted_sum(nd, &DVector::from_column_slice(spread));
    let w: Vec<f64> = m3.iter().map(|m| W_CONST * m).collect();

    let mut d0 = Vec::with_capacity(nd.nrows());
    let mut dmax = Vec::with_capacity(nd.nrows());
    for t in 0..nd.nrows() {
        let row: Vec<f64> = nd.row(t).iter().copied().collect();
        d0.push(median_volume_diameter(&row, diameter, spread, bin_edges));
        dmax.push(max_diameter(&row, diameter));
    }

    let nw = (0..nd.nrows())
        .map(|t| match method {
            NwMethod::Bringi => normalized_intercept_bringi(w[t], dm[t]),
            NwMethod::Testud => normalized_intercept_testud(w[t], d0[t]),
        })
        .collect();

    DsdParameters {
        nt,
        w,
        d0,
        nw,
        dmax,
        dm,
    }
}

/// `Nw = 256/(π ρw) · W / Dm⁴`
pub fn normalized_intercept_bringi(w: f64, dm: f64) -> f64 {
    256.0 / (PI * RHO_W) * w / dm.powi(4)
}

/// `Nw = 3.67⁴/π · (10³ W) / D0⁴`
pub fn normalized_intercept_testud(w: f64, d0: f64) -> f64 {
    3.67_f64.powi(4) / PI * (1e3 * w) / d0.powi(4)
}

/// Cumulative water content over bins `0..=k`.
pub fn cumulative_water(nd_row: &[f64], diameter: &[f64], spread: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    nd_row
        .iter()
        .zip(diameter)
        .zip(spread)
        .map(|((n, d), s)| {
            acc += n * s * d.powi(3);
            W_CONST * acc
        })
        .collect()
}

/// Smallest bin index whose cumulative water reaches half the total.
///
/// Returns `None` when the total is zero (or not finite).
pub fn half_mass_bin(cum_w: &[f64]) -> Option<usize> {
    let total = *cum_w.last()?;
    if !(total.is_finite() && total > 0.0) {
        return None;
    }
    let half = 0.5 * total;
    cum_w.iter().position(|c| *c >= half)
}

/// Median volume diameter by linear interpolation of the cumulative water
/// curve between bin centers.
///
/// When the half-mass point falls in bin 0 the curve is anchored at the
/// lower edge of that bin, `(bin_edges[0], 0)`.
pub fn median_volume_diameter(
    nd_row: &[f64],
    diameter: &[f64],
    spread: &[f64],
    bin_edges: &[f64],
) -> f64 {
    let cum_w = cumulative_water(nd_row, diameter, spread);
    let Some(k) = half_mass_bin(&cum_w) else {
        return f64::NAN;
    };
    let half = 0.5 * cum_w[cum_w.len() - 1];

    let (x0, y0) = if k == 0 {
        (bin_edges[0], 0.0)
    } else {
        (diameter[k - 1], cum_w[k - 1])
    };
    let (x1, y1) = (diameter[k], cum_w[k]);

    let slope = (y1 - y0) / (x1 - x0);
    let run = (half - y0) / slope;
    x0 + run
}

/// Center of the last bin with non-zero concentration, `NaN` if none.
pub fn max_diameter(nd_row: &[f64], diameter: &[f64]) -> f64 {
    nd_row
        .iter()
        .rposition(|n| *n != 0.0)
        .map(|i| diameter[i])
        .unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EDGES: [f64; 5] = [0.0, 1.0, 2.0, 3.0, 4.0];
    const DIAMETER: [f64; 4] = [0.5, 1.5, 2.5, 3.5];
    const SPREAD: [f64; 4] = [1.0; 4];

    fn params_for(rows: &[[f64; 4]], method: NwMethod) -> DsdParameters {
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let nd = DMatrix::from_row_slice(rows.len(), 4, &flat);
        parameterize(&nd, &DIAMETER, &SPREAD, &EDGES, method)
    }

    #[test]
    fn dm_is_ratio_of_fourth_to_third_moment() {
        let rows = [[0.0, 10.0, 5.0, 0.0], [4.0, 3.0, 2.0, 1.0]];
        let p = params_for(&rows, NwMethod::Bringi);
        let nd = DMatrix::from_row_slice(2, 4, &rows.concat());
        let m3 = moment(&nd, &DIAMETER, &SPREAD, 3.0);
        let m4 = moment(&nd, &DIAMETER, &SPREAD, 4.0);
        for t in 0..2 {
            assert_relative_eq!(p.dm[t], m4[t] / m3[t], epsilon = 1e-12);
        }
        assert_relative_eq!(p.dm[0], 245.9375 / 111.875, epsilon = 1e-12);
    }

    #[test]
    fn total_concentration_and_water_content() {
        let p = params_for(&[[0.0, 10.0, 5.0, 0.0]], NwMethod::Bringi);
        assert_relative_eq!(p.nt[0], 15.0);
        assert_relative_eq!(p.w[0], W_CONST * 111.875, epsilon = 1e-12);
        assert_relative_eq!(W_CONST, 1e-2 * PI / 6.0);
    }

    #[test]
    fn d0_interpolates_between_centers() {
        // cum_w (in units of W_CONST): [0, 33.75, 111.875, 111.875]; half = 55.9375
        let p = params_for(&[[0.0, 10.0, 5.0, 0.0]], NwMethod::Bringi);
        let expected = 1.5 + (55.9375 - 33.75) / (111.875 - 33.75);
        assert_relative_eq!(p.d0[0], expected, epsilon = 1e-12);
    }

    #[test]
    fn single_bin_spike_crosses_in_its_own_bin() {
        let row = [0.0, 0.0, 7.0, 0.0];
        let cum = cumulative_water(&row, &DIAMETER, &SPREAD);
        assert_eq!(half_mass_bin(&cum), Some(2));

        // Interpolates from the previous center (cumulative 0) to the spike
        // center (cumulative total), so half mass sits at their midpoint.
        let d0 = median_volume_diameter(&row, &DIAMETER, &SPREAD, &EDGES);
        assert_relative_eq!(d0, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn d0_lands_on_center_when_half_mass_is_reached_exactly() {
        // Equal water in bins 1 and 2: cumulative water hits exactly half at bin 1.
        let n1 = 1.0 / DIAMETER[1].powi(3);
        let n2 = 1.0 / DIAMETER[2].powi(3);
        let row = [0.0, n1, n2, 0.0];
        let d0 = median_volume_diameter(&row, &DIAMETER, &SPREAD, &EDGES);
        assert_relative_eq!(d0, DIAMETER[1], epsilon = 1e-12);
    }

    #[test]
    fn d0_in_first_bin_uses_lower_edge() {
        // All water in bin 0: interpolate from (edge 0.0, 0) to (0.5, total).
        let row = [3.0, 0.0, 0.0, 0.0];
        let d0 = median_volume_diameter(&row, &DIAMETER, &SPREAD, &EDGES);
        assert_relative_eq!(d0, 0.25, epsilon = 1e-12);
        assert!(d0 >= EDGES[0] && d0 <= DIAMETER[0]);
    }

    #[test]
    fn empty_distribution_is_nan_not_panic() {
        let p = params_for(&[[0.0; 4], [1.0, 0.0, 0.0, 0.0]], NwMethod::Bringi);
        assert!(p.d0[0].is_nan());
        assert!(p.dmax[0].is_nan());
        assert!(p.dm[0].is_nan());
        assert!(p.nw[0].is_nan());
        assert_eq!(p.nt[0], 0.0);
        assert_eq!(p.w[0], 0.0);
        assert!(p.d0[1].is_finite());
    }

    #[test]
    fn dmax_is_last_non_zero_bin() {
        let p = params_for(&[[1.0, 0.0, 2.0, 0.0], [0.0, 0.0, 0.0, 9.0]], NwMethod::Bringi);
        assert_eq!(p.dmax, vec![2.5, 3.5]);
    }

    #[test]
    fn nw_variants() {
        let bringi = params_for(&[[0.0, 10.0, 5.0, 0.0]], NwMethod::Bringi);
        let w = bringi.w[0];
        let dm = bringi.dm[0];
        assert_relative_eq!(bringi.nw[0], 256.0 / PI * w / dm.powi(4), epsilon = 1e-9);

        let testud = params_for(&[[0.0, 10.0, 5.0, 0.0]], NwMethod::Testud);
        let d0 = testud.d0[0];
        assert_relative_eq!(testud.nw[0], 3.67_f64.powi(4) / PI * 1e3 * w / d0.powi(4), epsilon = 1e-9);
        assert_eq!(bringi.d0, testud.d0);
    }
}
