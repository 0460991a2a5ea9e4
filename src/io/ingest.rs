//! CSV ingest of binned spectra.
//!
//! Schema: one row per bin with columns `low`, `high`, `count` (any order,
//! case-insensitive, extra columns ignored). Rows must be contiguous: each
//! bin's `high` is the next bin's `low`.
//!
//! Unlike a point list, a histogram cannot drop a bad row without shifting
//! every later bin, so the first malformed row fails the whole file.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::info;

use crate::domain::BinnedSample;
use crate::error::AppError;

/// Ingest output: the histogram plus where it came from.
#[derive(Debug, Clone)]
pub struct IngestedSpectrum {
    pub source: PathBuf,
    pub sample: BinnedSample,
}

/// Load a binned spectrum from a CSV file.
pub fn load_binned_csv(path: &Path) -> Result<IngestedSpectrum, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let sample = parse_binned_csv(file).map_err(|e| AppError::new(e.exit_code(), format!("{}: {e}", path.display())))?;
    info!("loaded {} bins from {}", sample.len(), path.display());
    Ok(IngestedSpectrum {
        source: path.to_path_buf(),
        sample,
    })
}

/// Parse a binned spectrum from any CSV reader.
pub fn parse_binned_csv<R: Read>(input: R) -> Result<BinnedSample, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    for col in ["low", "high", "count"] {
        if !header_map.contains_key(col) {
            return Err(AppError::new(2, format!("Missing required column: `{col}`")));
        }
    }

    let mut edges: Vec<f64> = Vec::new();
    let mut counts = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; CSV lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::new(2, format!("Line {line}: CSV parse error: {e}")))?;

        let low = parse_field(&record, &header_map, "low").map_err(|e| row_error(line, e))?;
        let high = parse_field(&record, &header_map, "high").map_err(|e| row_error(line, e))?;
        let count = parse_field(&record, &header_map, "count").map_err(|e| row_error(line, e))?;

        if high <= low {
            return Err(row_error(line, format!("`high` ({high}) must exceed `low` ({low}).")));
        }
        match edges.last() {
            None => edges.push(low),
            Some(&prev_high) if prev_high == low => {}
            Some(&prev_high) => {
                return Err(row_error(
                    line,
                    format!("bin starts at {low} but the previous bin ends at {prev_high}."),
                ));
            }
        }
        edges.push(high);
        counts.push(count);
    }

    if counts.is_empty() {
        return Err(AppError::new(3, "No bins found in CSV."));
    }

    Ok(BinnedSample::from_edges(edges, counts))
}

fn row_error(line: usize, message: String) -> AppError {
    AppError::new(2, format!("Line {line}: {message}"))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_field(record: &StringRecord, header_map: &HashMap<String, usize>, col: &str) -> Result<f64, String> {
    let raw = header_map
        .get(col)
        .and_then(|&idx| record.get(idx))
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing `{col}` value."))?;
    let v: f64 = raw
        .parse()
        .map_err(|_| format!("Invalid `{col}` value '{raw}'."))?;
    if !v.is_finite() {
        return Err(format!("Non-finite `{col}` value."));
    }
    Ok(v)
}
