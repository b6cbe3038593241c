//! Export a run report to JSON.
//!
//! Non-finite values (empty timesteps, undefined covariances) are written as
//! `null`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::AppError;
use crate::report::RunReport;

/// Write `report` as pretty-printed JSON.
pub fn write_report_json(path: &Path, report: &RunReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, report)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON: {e}")))?;
    writeln!(writer).map_err(|e| AppError::new(2, format!("Failed to write export JSON: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export JSON: {e}")))?;

    tracing::debug!(path = %path.display(), fits = report.fits.len(), "wrote report");
    Ok(())
}
