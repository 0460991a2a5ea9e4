//! CSV writers: per-bin fit results and plain `low,high,count` histograms.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{BinnedSample, FitResult};
use crate::error::AppError;
use crate::report::BinResidual;

/// Write per-bin results (`low,high,center,count,fit,residual`) to a CSV file.
///
/// Parameter values and errors go in `#` comment lines ahead of the header,
/// which `load_binned_csv` skips.
pub fn write_results_csv(
    path: &Path,
    sample: &BinnedSample,
    fit: &FitResult,
    residuals: &[BinResidual],
) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_results(&mut file, sample, fit, residuals)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV '{}': {e}", path.display())))
}

fn write_results<W: Write>(
    out: &mut W,
    sample: &BinnedSample,
    fit: &FitResult,
    residuals: &[BinResidual],
) -> std::io::Result<()> {
    writeln!(out, "# model={}", fit.model.display_name())?;
    for p in &fit.params {
        writeln!(out, "# {}={:.10},{:.10}", p.name, p.value, p.error)?;
    }

    writeln!(out, "low,high,center,count,fit,residual")?;
    for (r, w) in residuals.iter().zip(sample.edges.windows(2)) {
        writeln!(
            out,
            "{},{},{},{},{:.6},{:.6}",
            w[0], w[1], r.center, r.count, r.fitted, r.residual
        )?;
    }
    Ok(())
}

/// Write a histogram in the `low,high,count` schema read by `parse_binned_csv`.
pub fn write_binned_csv<W: Write>(out: &mut W, sample: &BinnedSample) -> std::io::Result<()> {
    writeln!(out, "low,high,count")?;
    for (w, count) in sample.edges.windows(2).zip(&sample.counts) {
        writeln!(out, "{},{},{}", w[0], w[1], count)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FitConfig;
    use crate::fit::fit;
    use crate::io::parse_binned_csv;
    use crate::report::compute_residuals;

    #[test]
    fn export_reloads_as_the_same_histogram() {
        let sample = BinnedSample::new(
            vec![-2.0, -1.0, 0.0, 1.0, 2.0],
            vec![1.0, 5.0, 10.0, 5.0, 1.0],
            vec![-2.5, -1.5, -0.5, 0.5, 1.5, 2.5],
        );
        let fit = fit(&sample, &FitConfig::default()).unwrap();
        let residuals = compute_residuals(&sample, &fit).unwrap();

        let mut buf = Vec::new();
        write_results(&mut buf, &sample, &fit, &residuals).unwrap();
        let txt = String::from_utf8(buf).unwrap();

        assert!(txt.starts_with("# model=Gaussian\n# mean="));
        assert_eq!(txt.lines().filter(|l| !l.starts_with('#')).count(), 6);

        let reloaded = parse_binned_csv(txt.as_bytes()).unwrap();
        assert_eq!(reloaded, sample);
    }

    #[test]
    fn binned_csv_output_reloads() {
        let sample = BinnedSample::from_edges(vec![-1.0, 0.0, 0.5], vec![3.0, 7.0]);
        let mut buf = Vec::new();
        write_binned_csv(&mut buf, &sample).unwrap();
        assert_eq!(String::from_utf8(buf.clone()).unwrap(), "low,high,count\n-1,0,3\n0,0.5,7\n");
        assert_eq!(parse_binned_csv(buf.as_slice()).unwrap(), sample);
    }
}
