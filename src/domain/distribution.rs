//! The drop size distribution time series.
//!
//! `DropSizeDistribution` holds the reader-supplied inputs (time axis, bin
//! geometry, per-bin concentrations) together with derived fields that are
//! filled in place by explicit compute calls.
//!
//! Call-order dependencies:
//!
//! - `compute_dsd_parameterization`, `compute_rain_rate`,
//!   `compute_reflectivity_factor` and `compute_radar_parameters` read only the
//!   inputs and may run in any order.
//! - the `calc_r_*_relationship` fits read `radar` and `rain_rate`. They see
//!   whatever was last written there; rerun the compute steps after changing
//!   inputs.

use chrono::{DateTime, Utc};
use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::domain::{DsdParameters, FitForm, NwMethod, PowerLawFit, RadarParameters, Relationship};
use crate::error::DsdError;
use crate::fit::FitOptions;
use crate::scattering::ScatteringModel;

/// Reader output used to build a `DropSizeDistribution`.
///
/// At least one of `bin_edges` / `diameter` must be present; the other is
/// derived from it and `spread`.
#[derive(Debug, Clone)]
pub struct DsdInput {
    pub time: Vec<DateTime<Utc>>,
    /// `T × N` concentrations (mm⁻¹ m⁻³).
    pub nd: DMatrix<f64>,
    /// Bin widths (mm).
    pub spread: Vec<f64>,
    pub bin_edges: Option<Vec<f64>>,
    pub diameter: Option<Vec<f64>>,
    pub rain_rate: Option<Vec<f64>>,
    pub z: Option<Vec<f64>>,
    pub num_particles: Option<Vec<f64>>,
}

impl DsdInput {
    pub fn new(time: Vec<DateTime<Utc>>, nd: DMatrix<f64>, spread: Vec<f64>) -> Self {
        Self {
            time,
            nd,
            spread,
            bin_edges: None,
            diameter: None,
            rain_rate: None,
            z: None,
            num_particles: None,
        }
    }

    pub fn with_bin_edges(mut self, bin_edges: Vec<f64>) -> Self {
        self.bin_edges = Some(bin_edges);
        self
    }

    pub fn with_diameter(mut self, diameter: Vec<f64>) -> Self {
        self.diameter = Some(diameter);
        self
    }

    pub fn with_rain_rate(mut self, rain_rate: Vec<f64>) -> Self {
        self.rain_rate = Some(rain_rate);
        self
    }
}

/// A validated time series of binned drop size distributions.
#[derive(Debug, Clone)]
pub struct DropSizeDistribution {
    time: Vec<DateTime<Utc>>,
    nd: DMatrix<f64>,
    spread: Vec<f64>,
    bin_edges: Vec<f64>,
    diameter: Vec<f64>,

    /// Rain rate (mm/h), reader-supplied or from `compute_rain_rate`.
    pub rain_rate: Option<Vec<f64>>,
    /// Equivalent reflectivity factor (dBZ).
    pub z: Option<Vec<f64>>,
    pub num_particles: Option<Vec<f64>>,

    pub radar: RadarParameters,
    pub params: DsdParameters,
}

impl DropSizeDistribution {
    /// Validate reader output and build the series.
    ///
    /// Fails fast on any length disagreement between the arrays, on
    /// non-increasing or negative bin edges, on a diameter outside its own
    /// bin and on negative or non-finite concentrations.
    pub fn new(input: DsdInput) -> Result<Self, DsdError> {
        let DsdInput {
            time,
            nd,
            spread,
            bin_edges,
            diameter,
            rain_rate,
            z,
            num_particles,
        } = input;

        let t = time.len();
        let n = spread.len();
        if n == 0 {
            return Err(DsdError::InvalidInput("at least one size bin is required".to_string()));
        }

        check_len("nd rows", t, nd.nrows())?;
        check_len("nd columns", n, nd.ncols())?;

        let (bin_edges, diameter) = match (bin_edges, diameter) {
            (Some(edges), Some(diameter)) => (edges, diameter),
            (Some(edges), None) => {
                check_len("bin_edges", n + 1, edges.len())?;
                let centers = edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();
                (edges, centers)
            }
            (None, Some(diameter)) => {
                check_len("diameter", n, diameter.len())?;
                let mut edges: Vec<f64> = diameter
                    .iter()
                    .zip(&spread)
                    .map(|(d, s)| d - 0.5 * s)
                    .collect();
                edges.push(diameter[n - 1] + 0.5 * spread[n - 1]);
                (edges, diameter)
            }
            (None, None) => {
                return Err(DsdError::InvalidInput(
                    "either bin_edges or diameter must be supplied".to_string(),
                ));
            }
        };

        check_len("bin_edges", n + 1, bin_edges.len())?;
        check_len("diameter", n, diameter.len())?;

        if bin_edges.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(DsdError::InvalidInput("bin_edges must be strictly increasing".to_string()));
        }
        if !(bin_edges[0] >= 0.0) {
            return Err(DsdError::InvalidInput(format!(
                "bin_edges[0] = {} (diameters cannot be negative)",
                bin_edges[0]
            )));
        }
        let outside = |i: &usize| !(bin_edges[*i] <= diameter[*i] && diameter[*i] <= bin_edges[*i + 1]);
        if let Some(i) = (0..n).find(outside) {
            return Err(DsdError::InvalidInput(format!(
                "diameter[{i}] = {} lies outside its bin [{}, {}]",
                diameter[i],
                bin_edges[i],
                bin_edges[i + 1]
            )));
        }
        if spread.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(DsdError::InvalidInput("spread entries must be finite and > 0".to_string()));
        }
        if diameter.iter().any(|d| !(d.is_finite() && *d >= 0.0)) {
            return Err(DsdError::InvalidInput("diameter entries must be finite and >= 0".to_string()));
        }
        if let Some((idx, v)) = nd.iter().enumerate().find(|(_, v)| !(v.is_finite() && **v >= 0.0)) {
            // Column-major storage: recover (row, col) for the message.
            let (row, col) = (idx % t.max(1), idx / t.max(1));
            return Err(DsdError::InvalidInput(format!(
                "Nd[{row},{col}] = {v} (must be finite and non-negative)"
            )));
        }

        if let Some(r) = &rain_rate {
            check_len("rain_rate", t, r.len())?;
        }
        if let Some(z) = &z {
            check_len("z", t, z.len())?;
        }
        if let Some(np) = &num_particles {
            check_len("num_particles", t, np.len())?;
        }

        Ok(Self {
            time,
            nd,
            spread,
            bin_edges,
            diameter,
            rain_rate,
            z,
            num_particles,
            radar: RadarParameters::zeros(t),
            params: DsdParameters::zeros(t),
        })
    }

    /// Series length T.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Number of size bins N.
    pub fn bin_count(&self) -> usize {
        self.spread.len()
    }

    pub fn time(&self) -> &[DateTime<Utc>] {
        &self.time
    }

    pub fn nd(&self) -> &DMatrix<f64> {
        &self.nd
    }

    pub fn spread(&self) -> &[f64] {
        &self.spread
    }

    pub fn bin_edges(&self) -> &[f64] {
        &self.bin_edges
    }

    pub fn diameter(&self) -> &[f64] {
        &self.diameter
    }

    /// Timesteps whose distribution is entirely zero.
    ///
    /// D0, Dmax, Dm and Nw are `NaN` at these timesteps.
    pub fn empty_timesteps(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&t| self.nd.row(t).iter().all(|v| *v == 0.0))
            .collect()
    }

    /// `m`-th moment per timestep: `Σ_i D_i^m · Nd[t,i] · ΔD_i`.
    pub fn moment(&self, m: f64) -> Vec<f64> {
        crate::dsd::moment(&self.nd, &self.diameter, &self.spread, m)
    }

    /// Fill `params` (Nt, W, D0, Nw, Dmax, Dm).
    pub fn compute_dsd_parameterization(&mut self, method: NwMethod) {
        self.params = crate::dsd::parameterize(
            &self.nd,
            &self.diameter,
            &self.spread,
            &self.bin_edges,
            method,
        );
    }

    /// Fill (overwrite) `rain_rate` from the fixed fall-velocity model.
    pub fn compute_rain_rate(&mut self) {
        self.rain_rate = Some(crate::dsd::rain_rate(&self.nd, &self.diameter, &self.spread));
    }

    /// Fill `z` with the Rayleigh reflectivity factor `10·log10(moment(6))`.
    pub fn compute_reflectivity_factor(&mut self) {
        self.z = Some(crate::dsd::reflectivity_factor(&self.nd, &self.diameter, &self.spread));
    }

    /// Fill `radar` (Zh, Zdr, Kdp, Ai) from a scattering model.
    pub fn compute_radar_parameters<M: ScatteringModel + ?Sized>(
        &mut self,
        model: &M,
        wavelength_mm: f64,
    ) -> Result<(), DsdError> {
        self.radar = crate::scattering::radar_parameters(model, wavelength_mm, &self.bin_edges, &self.nd)?;
        Ok(())
    }

    /// Fit `R = a · Kdp^b` on rows with `Kdp > 0` and `R > 0`.
    pub fn calc_r_kdp_relationship(&self) -> Result<PowerLawFit, DsdError> {
        self.calc_r_kdp_relationship_with(&FitOptions::default())
    }

    pub fn calc_r_kdp_relationship_with(&self, opts: &FitOptions) -> Result<PowerLawFit, DsdError> {
        self.calc_relationship(Relationship::RKdp, opts)
    }

    /// Fit `R = a · Zh^b` (Zh linear) on rows with `R > 0`.
    pub fn calc_r_zh_relationship(&self) -> Result<PowerLawFit, DsdError> {
        self.calc_r_zh_relationship_with(&FitOptions::default())
    }

    pub fn calc_r_zh_relationship_with(&self, opts: &FitOptions) -> Result<PowerLawFit, DsdError> {
        self.calc_relationship(Relationship::RZh, opts)
    }

    /// Fit `R = a · Zh^b · Zdr^c` on rows with `R > 0`, `Zdr > 0`, `Kdp > 0`.
    pub fn calc_r_zh_zdr_relationship(&self) -> Result<PowerLawFit, DsdError> {
        self.calc_r_zh_zdr_relationship_with(&FitOptions::default())
    }

    pub fn calc_r_zh_zdr_relationship_with(&self, opts: &FitOptions) -> Result<PowerLawFit, DsdError> {
        self.calc_relationship(Relationship::RZhZdr, opts)
    }

    /// Fit `R = a · Zh^b · Kdp^c` on rows with `R > 0`, `Zdr > 0`, `Kdp > 0`.
    pub fn calc_r_zh_kdp_relationship(&self) -> Result<PowerLawFit, DsdError> {
        self.calc_r_zh_kdp_relationship_with(&FitOptions::default())
    }

    pub fn calc_r_zh_kdp_relationship_with(&self, opts: &FitOptions) -> Result<PowerLawFit, DsdError> {
        self.calc_relationship(Relationship::RZhKdp, opts)
    }

    /// Fit `R = a · Zdr^b · Kdp^c` on rows with `R > 0`, `Zdr > 0`, `Kdp > 0`.
    pub fn calc_r_zdr_kdp_relationship(&self) -> Result<PowerLawFit, DsdError> {
        self.calc_r_zdr_kdp_relationship_with(&FitOptions::default())
    }

    pub fn calc_r_zdr_kdp_relationship_with(&self, opts: &FitOptions) -> Result<PowerLawFit, DsdError> {
        self.calc_relationship(Relationship::RZdrKdp, opts)
    }

    /// Fit any relationship family with explicit options.
    pub fn calc_relationship(
        &self,
        relationship: Relationship,
        opts: &FitOptions,
    ) -> Result<PowerLawFit, DsdError> {
        let rain_rate = self.rain_rate.as_deref().ok_or(DsdError::MissingField("rain_rate"))?;
        crate::fit::fit_relationship(relationship, &self.radar, rain_rate, opts)
    }

    /// Fit every relationship family, keeping per-family outcomes in
    /// `Relationship::ALL` order.
    pub fn fit_all_relationships(
        &self,
        form: FitForm,
    ) -> Vec<(Relationship, Result<PowerLawFit, DsdError>)> {
        let opts = FitOptions {
            form,
            ..FitOptions::default()
        };
        Relationship::ALL
            .par_iter()
            .map(|&rel| (rel, self.calc_relationship(rel, &opts)))
            .collect()
    }
}

fn check_len(what: &'static str, expected: usize, found: usize) -> Result<(), DsdError> {
    if expected == found {
        Ok(())
    } else {
        Err(DsdError::ShapeMismatch {
            what,
            expected,
            found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn times(n: usize) -> Vec<DateTime<Utc>> {
        (0..n)
            .map(|i| Utc.timestamp_opt(1_400_000_000 + 60 * i as i64, 0).unwrap())
            .collect()
    }

    fn base_input() -> DsdInput {
        let nd = DMatrix::from_row_slice(2, 4, &[0.0, 10.0, 5.0, 0.0, 1.0, 2.0, 3.0, 4.0]);
        DsdInput::new(times(2), nd, vec![1.0; 4])
    }

    #[test]
    fn derives_centers_from_edges() {
        let dsd = DropSizeDistribution::new(base_input().with_bin_edges(vec![0.0, 1.0, 2.0, 3.0, 4.0]))
            .unwrap();
        assert_eq!(dsd.diameter(), &[0.5, 1.5, 2.5, 3.5]);
        assert_eq!(dsd.radar.zh.len(), 2);
        assert_eq!(dsd.params.d0, vec![0.0, 0.0]);
    }

    #[test]
    fn derives_edges_from_centers_and_spread() {
        let dsd = DropSizeDistribution::new(base_input().with_diameter(vec![0.5, 1.5, 2.5, 3.5]))
            .unwrap();
        assert_eq!(dsd.bin_edges(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn rejects_edge_count_mismatch() {
        let err = DropSizeDistribution::new(base_input().with_bin_edges(vec![0.0, 1.0, 2.0]))
            .unwrap_err();
        assert_eq!(
            err,
            DsdError::ShapeMismatch {
                what: "bin_edges",
                expected: 5,
                found: 3
            }
        );
    }

    #[test]
    fn rejects_time_row_mismatch() {
        let mut input = base_input().with_bin_edges(vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        input.time = times(3);
        let err = DropSizeDistribution::new(input).unwrap_err();
        assert!(matches!(err, DsdError::ShapeMismatch { what: "nd rows", .. }));
    }

    #[test]
    fn rejects_non_increasing_edges() {
        let err = DropSizeDistribution::new(base_input().with_bin_edges(vec![0.0, 1.0, 1.0, 3.0, 4.0]))
            .unwrap_err();
        assert!(matches!(err, DsdError::InvalidInput(_)));
    }

    #[test]
    fn rejects_diameter_outside_its_bin() {
        // Reversed centers: Dmax would otherwise report the smallest bin.
        let nd = DMatrix::from_row_slice(1, 3, &[0.0, 4.0, 4.0]);
        let input = DsdInput::new(times(1), nd, vec![1.0; 3])
            .with_bin_edges(vec![0.0, 1.0, 2.0, 3.0])
            .with_diameter(vec![2.5, 1.5, 0.5]);
        let err = DropSizeDistribution::new(input).unwrap_err();
        assert_eq!(
            err,
            DsdError::InvalidInput("diameter[0] = 2.5 lies outside its bin [0, 1]".to_string())
        );

        let consistent = base_input()
            .with_bin_edges(vec![0.0, 1.0, 2.0, 3.0, 4.0])
            .with_diameter(vec![0.4, 1.5, 2.0, 4.0]);
        assert!(DropSizeDistribution::new(consistent).is_ok());
    }

    #[test]
    fn rejects_negative_edges() {
        let err = DropSizeDistribution::new(base_input().with_bin_edges(vec![-1.0, 1.0, 2.0, 3.0, 4.0]))
            .unwrap_err();
        assert!(matches!(err, DsdError::InvalidInput(_)));

        // Centers minus half the spread reach below zero.
        let err = DropSizeDistribution::new(base_input().with_diameter(vec![0.2, 1.5, 2.5, 3.5]))
            .unwrap_err();
        assert!(matches!(err, DsdError::InvalidInput(_)));
    }

    #[test]
    fn rejects_negative_concentration() {
        let mut input = base_input().with_bin_edges(vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        input.nd[(1, 2)] = -1.0;
        let err = DropSizeDistribution::new(input).unwrap_err();
        assert_eq!(
            err,
            DsdError::InvalidInput("Nd[1,2] = -1 (must be finite and non-negative)".to_string())
        );
    }

    #[test]
    fn rejects_missing_geometry() {
        let err = DropSizeDistribution::new(base_input()).unwrap_err();
        assert!(matches!(err, DsdError::InvalidInput(_)));
    }

    #[test]
    fn rejects_short_rain_rate() {
        let input = base_input()
            .with_bin_edges(vec![0.0, 1.0, 2.0, 3.0, 4.0])
            .with_rain_rate(vec![1.0]);
        let err = DropSizeDistribution::new(input).unwrap_err();
        assert!(matches!(err, DsdError::ShapeMismatch { what: "rain_rate", .. }));
    }

    #[test]
    fn fits_require_rain_rate() {
        let dsd = DropSizeDistribution::new(base_input().with_bin_edges(vec![0.0, 1.0, 2.0, 3.0, 4.0]))
            .unwrap();
        assert_eq!(
            dsd.calc_r_kdp_relationship().unwrap_err(),
            DsdError::MissingField("rain_rate")
        );
    }

    #[test]
    fn compute_rain_rate_overwrites_supplied_values() {
        let input = base_input()
            .with_bin_edges(vec![0.0, 1.0, 2.0, 3.0, 4.0])
            .with_rain_rate(vec![-5.0, -5.0]);
        let mut dsd = DropSizeDistribution::new(input).unwrap();
        dsd.compute_rain_rate();
        let rr = dsd.rain_rate.as_ref().unwrap();
        assert!(rr.iter().all(|r| *r > 0.0));
    }

    #[test]
    fn reports_empty_timesteps() {
        let nd = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        let input = DsdInput::new(times(3), nd, vec![1.0, 1.0]).with_bin_edges(vec![0.0, 1.0, 2.0]);
        let dsd = DropSizeDistribution::new(input).unwrap();
        assert_eq!(dsd.empty_timesteps(), vec![0, 2]);
    }
}
