//! Rayleigh spheroid scatterer with a per-wavelength table cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::DsdError;
use crate::scattering::shape::DropShape;
use crate::scattering::table::{ScatteringConfig, ScatteringTable, check_edges};
use crate::scattering::{PsdIntegrator, RadarObservables, ScatteringModel};

/// Scatterer for a fixed drop-shape model.
///
/// Tables are built lazily on first use of a wavelength and reused for every
/// later call with the same wavelength.
pub struct RayleighScatterer<S: DropShape> {
    shape: S,
    config: ScatteringConfig,
    tables: Mutex<HashMap<u64, Arc<ScatteringTable>>>,
    built: AtomicUsize,
}

impl<S: DropShape> RayleighScatterer<S> {
    pub fn new(shape: S) -> Self {
        Self::with_config(shape, ScatteringConfig::default())
    }

    pub fn with_config(shape: S, config: ScatteringConfig) -> Self {
        Self {
            shape,
            config,
            tables: Mutex::new(HashMap::new()),
            built: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &ScatteringConfig {
        &self.config
    }

    /// Number of tables built so far.
    pub fn tables_built(&self) -> usize {
        self.built.load(Ordering::Relaxed)
    }

    /// Cached table for `wavelength_mm`, building it if needed.
    pub fn table(&self, wavelength_mm: f64) -> Result<Arc<ScatteringTable>, DsdError> {
        if !(wavelength_mm.is_finite() && wavelength_mm > 0.0) {
            return Err(DsdError::InvalidInput(format!(
                "wavelength must be finite and positive (got {wavelength_mm})"
            )));
        }

        let mut tables = self
            .tables
            .lock()
            .map_err(|_| DsdError::Scattering("table cache lock poisoned".to_string()))?;

        if let Some(table) = tables.get(&wavelength_mm.to_bits()) {
            return Ok(Arc::clone(table));
        }

        tracing::debug!(
            wavelength_mm,
            grid_points = self.config.grid_points,
            canting_std_deg = self.config.canting_std_deg,
            "building scattering table"
        );
        let table = Arc::new(ScatteringTable::build(wavelength_mm, &self.shape, &self.config));
        tables.insert(wavelength_mm.to_bits(), Arc::clone(&table));
        self.built.fetch_add(1, Ordering::Relaxed);
        Ok(table)
    }
}

impl<S: DropShape> ScatteringModel for RayleighScatterer<S> {
    fn observables(
        &self,
        wavelength_mm: f64,
        bin_edges: &[f64],
        nd_row: &[f64],
    ) -> Result<RadarObservables, DsdError> {
        check_edges(bin_edges, nd_row)?;
        Ok(self.table(wavelength_mm)?.integrate_bins(bin_edges, nd_row))
    }

    fn integrator(&self, wavelength_mm: f64) -> Result<Box<dyn PsdIntegrator + '_>, DsdError> {
        Ok(Box::new(self.table(wavelength_mm)?))
    }
}
