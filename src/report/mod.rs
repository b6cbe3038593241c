//! Run summaries: per-field statistics and fit outcomes.

pub mod format;

pub use format::*;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    Band, DropSizeDistribution, FitForm, NwMethod, PowerLawFit, Relationship, ShapeKind,
    SimulationConfig,
};
use crate::error::DsdError;

/// Min/mean/max over the finite entries of one derived series.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSummary {
    pub name: &'static str,
    pub unit: &'static str,
    /// Number of finite entries.
    pub n: usize,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

/// Result of one relationship family.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FitOutcome {
    Fitted {
        fit: PowerLawFit,
        std_errors: Vec<f64>,
    },
    Failed {
        relationship: Relationship,
        error: String,
    },
}

impl FitOutcome {
    pub fn relationship(&self) -> Relationship {
        match self {
            FitOutcome::Fitted { fit, .. } => fit.relationship,
            FitOutcome::Failed { relationship, .. } => *relationship,
        }
    }
}

/// One exported timestep.
#[derive(Debug, Clone, Serialize)]
pub struct TimestepRecord {
    pub time: DateTime<Utc>,
    pub rain_rate: f64,
    pub zh: f64,
    pub zdr: f64,
    pub kdp: f64,
    pub ai: f64,
    pub nt: f64,
    pub w: f64,
    pub d0: f64,
    pub dm: f64,
    pub nw: f64,
    pub dmax: f64,
}

/// Everything printed or exported for a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub steps: usize,
    pub seed: u64,
    pub band: Band,
    pub wavelength_mm: f64,
    pub shape: ShapeKind,
    pub nw_method: NwMethod,
    pub form: FitForm,
    pub empty_timesteps: usize,
    pub summaries: Vec<FieldSummary>,
    pub fits: Vec<FitOutcome>,
    pub series: Vec<TimestepRecord>,
}

/// Summarize the finite values of `values`; NaN statistics when none are.
pub fn summarize(name: &'static str, unit: &'static str, values: &[f64]) -> FieldSummary {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return FieldSummary {
            name,
            unit,
            n: 0,
            min: f64::NAN,
            mean: f64::NAN,
            max: f64::NAN,
        };
    }
    FieldSummary {
        name,
        unit,
        n: finite.len(),
        min: finite.iter().copied().fold(f64::INFINITY, f64::min),
        mean: finite.iter().sum::<f64>() / finite.len() as f64,
        max: finite.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

pub fn build_report(
    dsd: &DropSizeDistribution,
    config: &SimulationConfig,
    fits: &[(Relationship, Result<PowerLawFit, DsdError>)],
) -> RunReport {
    let t = dsd.len();
    let rain_rate = dsd.rain_rate.clone().unwrap_or_else(|| vec![f64::NAN; t]);
    let p = &dsd.params;
    let r = &dsd.radar;

    let summaries = vec![
        summarize("R", "mm/h", &rain_rate),
        summarize("Zh", "dBZ", &r.zh),
        summarize("Zdr", "dB", &r.zdr),
        summarize("Kdp", "deg/km", &r.kdp),
        summarize("Ai", "dB/km", &r.ai),
        summarize("Nt", "m^-3", &p.nt),
        summarize("W", "g/m^3", &p.w),
        summarize("D0", "mm", &p.d0),
        summarize("Dm", "mm", &p.dm),
        summarize("Nw", "mm^-1 m^-3", &p.nw),
        summarize("Dmax", "mm", &p.dmax),
    ];

    let fits = fits
        .iter()
        .map(|(rel, res)| match res {
            Ok(fit) => FitOutcome::Fitted {
                std_errors: fit.std_errors(),
                fit: fit.clone(),
            },
            Err(e) => FitOutcome::Failed {
                relationship: *rel,
                error: e.to_string(),
            },
        })
        .collect();

    let series = (0..t)
        .map(|i| TimestepRecord {
            time: dsd.time()[i],
            rain_rate: rain_rate[i],
            zh: r.zh[i],
            zdr: r.zdr[i],
            kdp: r.kdp[i],
            ai: r.ai[i],
            nt: p.nt[i],
            w: p.w[i],
            d0: p.d0[i],
            dm: p.dm[i],
            nw: p.nw[i],
            dmax: p.dmax[i],
        })
        .collect();

    RunReport {
        steps: t,
        seed: config.seed,
        band: config.band,
        wavelength_mm: config.band.wavelength_mm(),
        shape: config.shape,
        nw_method: config.nw_method,
        form: config.form,
        empty_timesteps: dsd.empty_timesteps().len(),
        summaries,
        fits,
        series,
    }
}
