//! Shared "fit pipeline" logic.
//!
//! Keeping this in one place keeps the command handlers about presentation:
//! CSV ingest -> parallel fits -> residuals.

use std::path::PathBuf;

use tracing::info;

use crate::domain::{BinnedSample, FitResult, RunConfig};
use crate::error::AppError;
use crate::fit::fit_all;
use crate::io::{IngestedSpectrum, load_binned_csv};
use crate::report::{BinResidual, compute_residuals};

/// Computed outputs for one input file.
#[derive(Debug, Clone)]
pub struct SpectrumRun {
    pub source: PathBuf,
    pub sample: BinnedSample,
    pub fit: FitResult,
    pub residuals: Vec<BinResidual>,
}

/// Ingest every input, then fit them all in parallel.
///
/// The first failure (ingest or fit) aborts the run; its error keeps the
/// input path in the message.
pub fn run_fit(config: &RunConfig) -> Result<Vec<SpectrumRun>, AppError> {
    let ingested: Vec<IngestedSpectrum> = config
        .inputs
        .iter()
        .map(|path| load_binned_csv(path))
        .collect::<Result<_, _>>()?;

    let samples: Vec<BinnedSample> = ingested.iter().map(|i| i.sample.clone()).collect();
    info!("fitting {} spectra with {}", samples.len(), config.fit.model);
    let results = fit_all(&samples, &config.fit);

    ingested
        .into_iter()
        .zip(results)
        .map(|(input, result)| {
            let fit = result.map_err(|e| with_source(e.into(), &input.source))?;
            let residuals =
                compute_residuals(&input.sample, &fit).map_err(|e| with_source(e.into(), &input.source))?;
            Ok(SpectrumRun {
                source: input.source,
                sample: input.sample,
                fit,
                residuals,
            })
        })
        .collect()
}

fn with_source(err: AppError, source: &std::path::Path) -> AppError {
    AppError::new(err.exit_code(), format!("{}: {err}", source.display()))
}
