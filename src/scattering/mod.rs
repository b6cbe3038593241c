//! Radar observables from a binned drop size distribution.
//!
//! The pipeline only depends on [`ScatteringModel`]; [`RayleighScatterer`]
//! is the bundled implementation.

pub mod dielectric;
pub mod rayleigh;
pub mod shape;
pub mod table;

use std::sync::Arc;

use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::Serialize;

use crate::domain::RadarParameters;
use crate::error::DsdError;
use crate::math::db;

pub use rayleigh::RayleighScatterer;
pub use shape::DropShape;
pub use table::{ScatteringConfig, ScatteringTable};

/// Linear radar quantities for one distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RadarObservables {
    /// Horizontal reflectivity (mm⁶ m⁻³).
    pub zh: f64,
    /// Differential reflectivity `Zh/Zv`.
    pub zdr: f64,
    /// Specific differential phase (deg/km).
    pub kdp: f64,
    /// Specific attenuation, horizontal (dB/km).
    pub ai: f64,
}

/// Radar observables of binned distributions at one fixed wavelength.
pub trait PsdIntegrator: Sync {
    /// `nd_row[i]` is constant on `(bin_edges[i], bin_edges[i+1]]`.
    fn integrate(&self, bin_edges: &[f64], nd_row: &[f64]) -> Result<RadarObservables, DsdError>;
}

impl<T: PsdIntegrator + Send + ?Sized> PsdIntegrator for Arc<T> {
    fn integrate(&self, bin_edges: &[f64], nd_row: &[f64]) -> Result<RadarObservables, DsdError> {
        (**self).integrate(bin_edges, nd_row)
    }
}

/// A scattering solver.
pub trait ScatteringModel: Sync {
    /// Observables for one distribution, `nd_row[i]` on
    /// `(bin_edges[i], bin_edges[i+1]]`.
    fn observables(
        &self,
        wavelength_mm: f64,
        bin_edges: &[f64],
        nd_row: &[f64],
    ) -> Result<RadarObservables, DsdError>;

    /// Evaluator bound to `wavelength_mm`, shared by every row of a batch.
    ///
    /// Solvers with per-wavelength setup override this to do the setup once.
    fn integrator(&self, wavelength_mm: f64) -> Result<Box<dyn PsdIntegrator + '_>, DsdError> {
        Ok(Box::new(AtWavelength {
            model: self,
            wavelength_mm,
        }))
    }
}

struct AtWavelength<'a, M: ?Sized> {
    model: &'a M,
    wavelength_mm: f64,
}

impl<M: ScatteringModel + ?Sized> PsdIntegrator for AtWavelength<'_, M> {
    fn integrate(&self, bin_edges: &[f64], nd_row: &[f64]) -> Result<RadarObservables, DsdError> {
        self.model.observables(self.wavelength_mm, bin_edges, nd_row)
    }
}

/// Evaluate `model` for every timestep (row) of `nd`.
///
/// Zh and Zdr are stored in dB, Kdp and Ai as returned.
pub fn radar_parameters<M>(
    model: &M,
    wavelength_mm: f64,
    bin_edges: &[f64],
    nd: &DMatrix<f64>,
) -> Result<RadarParameters, DsdError>
where
    M: ScatteringModel + ?Sized,
{
    let integrator = model.integrator(wavelength_mm)?;

    let observables = (0..nd.nrows())
        .into_par_iter()
        .map(|t| {
            let row: Vec<f64> = nd.row(t).iter().copied().collect();
            integrator.integrate(bin_edges, &row)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut radar = RadarParameters::zeros(observables.len());
    for (t, obs) in observables.iter().enumerate() {
        radar.zh[t] = db(obs.zh);
        radar.zdr[t] = db(obs.zdr);
        radar.kdp[t] = obs.kdp;
        radar.ai[t] = obs.ai;
    }
    Ok(radar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ShapeKind;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns fixed linear values so the dB conversion is visible.
    struct Constant;

    impl ScatteringModel for Constant {
        fn observables(&self, _: f64, _: &[f64], nd_row: &[f64]) -> Result<RadarObservables, DsdError> {
            Ok(RadarObservables {
                zh: 1000.0 * nd_row[0],
                zdr: 2.0,
                kdp: 0.25,
                ai: 0.01,
            })
        }
    }

    #[test]
    fn stores_reflectivities_in_db() {
        let nd = DMatrix::from_row_slice(2, 1, &[1.0, 10.0]);
        let radar = radar_parameters(&Constant, 33.3, &[0.0, 1.0], &nd).unwrap();
        assert_relative_eq!(radar.zh[0], 30.0, epsilon = 1e-12);
        assert_relative_eq!(radar.zh[1], 40.0, epsilon = 1e-12);
        assert_relative_eq!(radar.zdr[0], 10.0 * 2.0_f64.log10(), epsilon = 1e-12);
        assert_eq!(radar.kdp, vec![0.25, 0.25]);
        assert_eq!(radar.ai, vec![0.01, 0.01]);
    }

    /// Counts how rows reach the model.
    #[derive(Default)]
    struct Batched {
        integrators: AtomicUsize,
        single_calls: AtomicUsize,
    }

    impl ScatteringModel for Batched {
        fn observables(&self, _: f64, _: &[f64], _: &[f64]) -> Result<RadarObservables, DsdError> {
            self.single_calls.fetch_add(1, Ordering::Relaxed);
            Err(DsdError::Scattering("rows must go through the integrator".to_string()))
        }

        fn integrator(&self, _: f64) -> Result<Box<dyn PsdIntegrator + '_>, DsdError> {
            self.integrators.fetch_add(1, Ordering::Relaxed);
            Ok(Box::new(Arc::new(Fixed)))
        }
    }

    struct Fixed;

    impl PsdIntegrator for Fixed {
        fn integrate(&self, _: &[f64], nd_row: &[f64]) -> Result<RadarObservables, DsdError> {
            Ok(RadarObservables {
                zh: nd_row[0],
                zdr: 1.0,
                kdp: 0.0,
                ai: 0.0,
            })
        }
    }

    #[test]
    fn batch_uses_one_integrator_for_every_row() {
        let model = Batched::default();
        let nd = DMatrix::from_fn(50, 1, |t, _| (t + 1) as f64);
        let radar = radar_parameters(&model, 33.3, &[0.0, 1.0], &nd).unwrap();

        assert_eq!(model.integrators.load(Ordering::Relaxed), 1);
        assert_eq!(model.single_calls.load(Ordering::Relaxed), 0);
        assert_relative_eq!(radar.zh[9], 10.0, epsilon = 1e-12);
    }

    #[test]
    fn default_integrator_forwards_to_observables() {
        let integrator = Constant.integrator(33.3).unwrap();
        let obs = integrator.integrate(&[0.0, 1.0], &[2.0]).unwrap();
        assert_eq!(obs, Constant.observables(33.3, &[0.0, 1.0], &[2.0]).unwrap());
    }

    #[test]
    fn parallel_rows_keep_timestep_order() {
        let rows = 64;
        let nd = DMatrix::from_fn(rows, 3, |t, i| (t + 1) as f64 * (3 - i) as f64);
        let scatterer = RayleighScatterer::new(ShapeKind::BeardChuang);
        let radar = radar_parameters(&scatterer, 33.3, &[0.5, 1.5, 2.5, 3.5], &nd).unwrap();

        assert_eq!(scatterer.tables_built(), 1);
        // Nd scales linearly with t, so Zh rises by 10·log10((t+1)/t).
        for t in 1..rows {
            let expected = 10.0 * ((t + 1) as f64 / t as f64).log10();
            assert_relative_eq!(radar.zh[t] - radar.zh[t - 1], expected, epsilon = 1e-9);
            assert_relative_eq!(radar.zdr[t], radar.zdr[0], epsilon = 1e-9);
        }
    }
}
