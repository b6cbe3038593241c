//! Synthetic disdrometer series from a normalized gamma DSD.
//!
//! Each wet timestep draws `(Nw, Dm, μ)` and evaluates
//!
//! ```text
//! N(D) = N0 · (D/Dm)^μ · exp(-(4 + μ) D / Dm)
//! ```
//!
//! at the bin centers of a Joss–Waldvogel RD-80 style instrument. `N0` is
//! chosen so that the binned third moment satisfies `M3 = 6 Nw Dm⁴ / 4⁴`,
//! the defining property of `Nw` for gamma spectra.

use chrono::{DateTime, TimeZone, Utc};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma, Normal};

use crate::domain::{DsdInput, SimulationConfig};
use crate::error::AppError;

/// RD-80 bin centers (mm).
pub const RD80_DIAMETER: [f64; 20] = [
    0.359, 0.455, 0.551, 0.656, 0.771, 0.917, 1.131, 1.331, 1.506, 1.665, 1.912, 2.259, 2.589,
    2.869, 3.205, 3.544, 3.916, 4.350, 4.859, 5.373,
];

/// RD-80 bin widths (mm).
pub const RD80_SPREAD: [f64; 20] = [
    0.092, 0.100, 0.091, 0.119, 0.112, 0.172, 0.233, 0.197, 0.153, 0.166, 0.329, 0.364, 0.286,
    0.284, 0.374, 0.319, 0.423, 0.446, 0.572, 0.455,
];

/// Lower edge of the first RD-80 bin (mm).
pub const RD80_FIRST_EDGE: f64 = 0.313;

/// 2014-05-20T00:00:00Z.
const SERIES_START: i64 = 1_400_544_000;

/// Mean mass-weighted diameter of the generated spectra (mm).
const DM_MEAN: f64 = 1.6;
const DM_SHAPE: f64 = 6.0;
const DM_RANGE: (f64, f64) = (0.5, 3.0);

const MU_MEAN: f64 = 3.0;
const MU_STD: f64 = 2.0;
const MU_RANGE: (f64, f64) = (-1.0, 10.0);

const LOG10_NW_MEAN: f64 = 3.6;
const LOG10_NW_STD: f64 = 0.4;

/// Concentrations below this are reported as zero (mm⁻¹ m⁻³).
const DETECTION_FLOOR: f64 = 1e-3;

/// Gamma parameters used for one timestep; all zero for a dry timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaParams {
    pub nw: f64,
    pub dm: f64,
    pub mu: f64,
}

#[derive(Debug, Clone)]
pub struct SampleData {
    pub input: DsdInput,
    /// Generating parameters per timestep.
    pub truth: Vec<GammaParams>,
}

impl SampleData {
    /// Indices of timesteps generated without drops.
    pub fn dry_timesteps(&self) -> Vec<usize> {
        self.truth
            .iter()
            .enumerate()
            .filter(|(_, p)| p.nw == 0.0)
            .map(|(i, _)| i)
            .collect()
    }
}

/// RD-80 bin edges built from the first edge and the widths.
pub fn rd80_bin_edges() -> Vec<f64> {
    let mut edges = Vec::with_capacity(RD80_SPREAD.len() + 1);
    let mut edge = RD80_FIRST_EDGE;
    edges.push(edge);
    for s in RD80_SPREAD {
        edge += s;
        edges.push(edge);
    }
    edges
}

pub fn generate_sample(config: &SimulationConfig) -> Result<SampleData, AppError> {
    if config.steps == 0 {
        return Err(AppError::new(2, "Step count must be > 0."));
    }
    if config.interval_secs <= 0 {
        return Err(AppError::new(2, "Sample interval must be > 0 seconds."));
    }
    if !(0.0..1.0).contains(&config.dry_fraction) {
        return Err(AppError::new(2, "Dry fraction must be in [0, 1)."));
    }
    if !(config.bin_noise.is_finite() && config.bin_noise >= 0.0) {
        return Err(AppError::new(2, "Bin noise must be finite and >= 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let dm_dist = Gamma::new(DM_SHAPE, DM_MEAN / DM_SHAPE)
        .map_err(|e| AppError::new(4, format!("Dm distribution error: {e}")))?;
    let mu_dist = Normal::new(MU_MEAN, MU_STD)
        .map_err(|e| AppError::new(4, format!("mu distribution error: {e}")))?;
    let nw_dist = Normal::new(LOG10_NW_MEAN, LOG10_NW_STD)
        .map_err(|e| AppError::new(4, format!("Nw distribution error: {e}")))?;
    let noise = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let n_bins = RD80_DIAMETER.len();
    let mut nd = DMatrix::<f64>::zeros(config.steps, n_bins);
    let mut truth = Vec::with_capacity(config.steps);
    let mut time = Vec::with_capacity(config.steps);

    for t in 0..config.steps {
        time.push(timestamp(SERIES_START + t as i64 * config.interval_secs)?);

        let roll: f64 = rng.r#gen();
        if roll < config.dry_fraction {
            truth.push(GammaParams {
                nw: 0.0,
                dm: 0.0,
                mu: 0.0,
            });
            continue;
        }

        let params = GammaParams {
            nw: 10f64.powf(nw_dist.sample(&mut rng)),
            dm: dm_dist.sample(&mut rng).clamp(DM_RANGE.0, DM_RANGE.1),
            mu: mu_dist.sample(&mut rng).clamp(MU_RANGE.0, MU_RANGE.1),
        };
        let row = gamma_row(&params);
        for (i, v) in row.into_iter().enumerate() {
            let jitter = (config.bin_noise * noise.sample(&mut rng)).exp();
            let value = v * jitter;
            nd[(t, i)] = if value >= DETECTION_FLOOR { value } else { 0.0 };
        }
        truth.push(params);
    }

    tracing::debug!(
        steps = config.steps,
        seed = config.seed,
        dry = truth.iter().filter(|p| p.nw == 0.0).count(),
        "generated synthetic DSD series"
    );

    let input = DsdInput::new(time, nd, RD80_SPREAD.to_vec())
        .with_bin_edges(rd80_bin_edges())
        .with_diameter(RD80_DIAMETER.to_vec());
    Ok(SampleData { input, truth })
}

/// Noise-free concentrations at the RD-80 bin centers.
pub fn gamma_row(params: &GammaParams) -> Vec<f64> {
    let shape: Vec<f64> = RD80_DIAMETER
        .iter()
        .map(|d| {
            let x = d / params.dm;
            x.powf(params.mu) * (-(4.0 + params.mu) * x).exp()
        })
        .collect();

    let m3: f64 = shape
        .iter()
        .zip(RD80_DIAMETER.iter().zip(RD80_SPREAD))
        .map(|(g, (d, s))| g * d.powi(3) * s)
        .sum();
    if !(m3 > 0.0) {
        return vec![0.0; shape.len()];
    }

    let n0 = 6.0 * params.nw * params.dm.powi(4) / (256.0 * m3);
    shape.into_iter().map(|g| n0 * g).collect()
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, AppError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| AppError::new(2, format!("Timestamp {secs} is out of range.")))
}
