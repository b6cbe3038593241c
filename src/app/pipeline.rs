//! The `simulate` workflow, independent of how its output is presented.
//!
//! synthetic series -> parameterization -> rain rate -> scattering -> fits -> report

use crate::data::{GammaParams, generate_sample};
use crate::domain::{DropSizeDistribution, PowerLawFit, Relationship, SimulationConfig};
use crate::error::{AppError, DsdError};
use crate::report::{RunReport, build_report};
use crate::scattering::RayleighScatterer;

/// All computed outputs of a single `dsd simulate` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dsd: DropSizeDistribution,
    /// Generating gamma parameters per timestep.
    pub truth: Vec<GammaParams>,
    pub fits: Vec<(Relationship, Result<PowerLawFit, DsdError>)>,
    pub report: RunReport,
}

/// Execute the full pipeline and return the computed outputs.
pub fn run_simulation(config: &SimulationConfig) -> Result<RunOutput, AppError> {
    let sample = generate_sample(config)?;
    let mut dsd = DropSizeDistribution::new(sample.input)?;

    dsd.compute_dsd_parameterization(config.nw_method);
    dsd.compute_rain_rate();
    dsd.compute_reflectivity_factor();

    let scatterer = RayleighScatterer::new(config.shape);
    dsd.compute_radar_parameters(&scatterer, config.band.wavelength_mm())?;

    let fits = dsd.fit_all_relationships(config.form);
    for (rel, res) in &fits {
        if let Err(e) = res {
            tracing::warn!(relationship = rel.display_name(), error = %e, "relationship fit failed");
        }
    }

    let report = build_report(&dsd, config, &fits);
    Ok(RunOutput {
        dsd,
        truth: sample.truth,
        fits,
        report,
    })
}
