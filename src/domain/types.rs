//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - populated in place by the compute steps on `DropSizeDistribution`
//! - exported to JSON alongside fitted relationships
//! - selected from the command line via `clap::ValueEnum`

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Density of liquid water (g/cm³).
pub const RHO_W: f64 = 1.0;

/// Water-content scaling from mm-diameter bins to g/m³.
///
/// Used by both `W` and the cumulative curve behind `D0`, so the two stay on
/// one unit convention.
pub const W_CONST: f64 = 1e-2 * std::f64::consts::PI / 6.0 * RHO_W;

/// Standard weather-radar bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    S,
    C,
    X,
    Ku,
    Ka,
    W,
}

impl Band {
    /// Nominal wavelength (mm).
    pub fn wavelength_mm(self) -> f64 {
        match self {
            Band::S => 111.0,
            Band::C => 53.5,
            Band::X => 33.3,
            Band::Ku => 22.0,
            Band::Ka => 8.43,
            Band::W => 3.19,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Band::S => "S",
            Band::C => "C",
            Band::X => "X",
            Band::Ku => "Ku",
            Band::Ka => "Ka",
            Band::W => "W",
        }
    }
}

/// Which published form of the normalized intercept parameter to compute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NwMethod {
    /// Bringi–Chandrasekar: `Nw = 256/(π ρw) · W / Dm⁴`.
    #[default]
    Bringi,
    /// Testud et al.: `Nw = 3.67⁴/π · (10³ W) / D0⁴`.
    Testud,
}

/// How the power-law relationships are solved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FitForm {
    /// Levenberg–Marquardt on the power-law residuals in linear space.
    #[default]
    Direct,
    /// Ordinary least squares on `ln R = ln a + b ln x (+ c ln x2)`.
    LogLinear,
}

/// Drop-shape model selectable from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeKind {
    #[default]
    BeardChuang,
    PruppacherBeard,
    Thurai,
    Brandes,
    Spherical,
}

/// Empirical rain-rate relationship families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    /// `R = a · Kdp^b`
    RKdp,
    /// `R = a · Zh^b` (Zh linear)
    RZh,
    /// `R = a · Zh^b · Zdr^c` (both linear)
    RZhZdr,
    /// `R = a · Zh^b · Kdp^c`
    RZhKdp,
    /// `R = a · Zdr^b · Kdp^c`
    RZdrKdp,
}

impl Relationship {
    pub const ALL: [Relationship; 5] = [
        Relationship::RKdp,
        Relationship::RZh,
        Relationship::RZhZdr,
        Relationship::RZhKdp,
        Relationship::RZdrKdp,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            Relationship::RKdp => "R(Kdp)",
            Relationship::RZh => "R(Zh)",
            Relationship::RZhZdr => "R(Zh,Zdr)",
            Relationship::RZhKdp => "R(Zh,Kdp)",
            Relationship::RZdrKdp => "R(Zdr,Kdp)",
        }
    }

    /// Number of predictors (1 or 2).
    pub fn predictor_count(self) -> usize {
        match self {
            Relationship::RKdp | Relationship::RZh => 1,
            Relationship::RZhZdr | Relationship::RZhKdp | Relationship::RZdrKdp => 2,
        }
    }

    /// Number of free coefficients (`a` plus one exponent per predictor).
    pub fn param_count(self) -> usize {
        self.predictor_count() + 1
    }
}

/// Radar observables per timestep.
///
/// `zh` and `zdr` are stored in dB, `kdp` in deg/km and `ai` in dB/km.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarParameters {
    pub zh: Vec<f64>,
    pub zdr: Vec<f64>,
    pub kdp: Vec<f64>,
    pub ai: Vec<f64>,
}

impl RadarParameters {
    pub fn zeros(len: usize) -> Self {
        Self {
            zh: vec![0.0; len],
            zdr: vec![0.0; len],
            kdp: vec![0.0; len],
            ai: vec![0.0; len],
        }
    }
}

/// Bulk DSD descriptors per timestep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DsdParameters {
    /// Total number concentration (m⁻³).
    pub nt: Vec<f64>,
    /// Liquid water content (g/m³).
    pub w: Vec<f64>,
    /// Median volume diameter (mm).
    pub d0: Vec<f64>,
    /// Normalized intercept parameter (mm⁻¹ m⁻³).
    pub nw: Vec<f64>,
    /// Largest diameter with non-zero concentration (mm).
    pub dmax: Vec<f64>,
    /// Mass-weighted mean diameter (mm).
    pub dm: Vec<f64>,
}

impl DsdParameters {
    pub fn zeros(len: usize) -> Self {
        Self {
            nt: vec![0.0; len],
            w: vec![0.0; len],
            d0: vec![0.0; len],
            nw: vec![0.0; len],
            dmax: vec![0.0; len],
            dm: vec![0.0; len],
        }
    }
}

/// Fitted power-law relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerLawFit {
    pub relationship: Relationship,
    /// `[a, b]` or `[a, b, c]`.
    pub coefficients: Vec<f64>,
    /// Row-major `p × p` covariance of the coefficients.
    pub covariance: Vec<Vec<f64>>,
    /// Rows that survived filtering.
    pub n_used: usize,
    pub sse: f64,
    pub rmse: f64,
    pub iterations: usize,
}

impl PowerLawFit {
    /// One-sigma standard errors from the covariance diagonal.
    pub fn std_errors(&self) -> Vec<f64> {
        self.covariance
            .iter()
            .enumerate()
            .map(|(i, row)| row[i].sqrt())
            .collect()
    }
}

/// Settings for a `dsd simulate` run.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Number of timesteps to generate.
    pub steps: usize,
    pub seed: u64,
    /// Spacing of the time axis (seconds).
    pub interval_secs: i64,
    /// Fraction of timesteps with no drops at all.
    pub dry_fraction: f64,
    /// Std-dev of the multiplicative log-normal noise applied per bin.
    pub bin_noise: f64,

    pub band: Band,
    pub shape: ShapeKind,
    pub nw_method: NwMethod,
    pub form: FitForm,

    pub export: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps: 720,
            seed: 42,
            interval_secs: 60,
            dry_fraction: 0.05,
            bin_noise: 0.1,
            band: Band::X,
            shape: ShapeKind::BeardChuang,
            nw_method: NwMethod::Bringi,
            form: FitForm::Direct,
            export: None,
        }
    }
}
