//! Read/write curve JSON files.
//!
//! Curve JSON is the "portable" representation of a fit:
//! - the histogram that was fitted
//! - model kind, parameters with errors, covariance, quality
//! - the dense overlay grid for quick plotting
//!
//! The schema is defined by `domain::CurveFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{BinnedSample, CurveFile, FitResult};
use crate::error::AppError;

pub const TOOL_NAME: &str = "spectra";

/// Bundle a fit with its input for saving.
pub fn curve_file(sample: &BinnedSample, fit: &FitResult, source: Option<&Path>) -> CurveFile {
    CurveFile {
        tool: TOOL_NAME.to_string(),
        generated_at: Utc::now(),
        source: source.map(|p| p.display().to_string()),
        sample: sample.clone(),
        result: fit.clone(),
    }
}

/// Write a curve JSON file.
pub fn write_curve_json(path: &Path, curve: &CurveFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create curve JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, curve).map_err(|e| AppError::new(2, format!("Failed to write curve JSON: {e}")))
}

/// Read a curve JSON file.
pub fn read_curve_json(path: &Path) -> Result<CurveFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open curve JSON '{}': {e}", path.display())))?;
    let curve: CurveFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid curve JSON: {e}")))?;
    Ok(curve)
}
