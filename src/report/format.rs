//! Text output for fits: legend labels, run summaries, residual tables.

use crate::domain::{BinnedSample, FitResult, ModelKind, ParamEstimate};
use crate::error::FitError;
use crate::models::evaluate;

/// Observed vs fitted value for one bin.
#[derive(Debug, Clone, PartialEq)]
pub struct BinResidual {
    pub center: f64,
    pub count: f64,
    pub fitted: f64,
    pub residual: f64,
}

/// Evaluate the fitted model at every bin center.
pub fn compute_residuals(sample: &BinnedSample, fit: &FitResult) -> Result<Vec<BinResidual>, FitError> {
    let fitted = evaluate(fit.model, &sample.centers, &fit.values());
    let mut out = Vec::with_capacity(sample.len());
    for ((&center, &count), y_fit) in sample.centers.iter().zip(&sample.counts).zip(fitted) {
        if !y_fit.is_finite() {
            return Err(FitError::NonFinite(format!("fitted value at x={center}")));
        }
        out.push(BinResidual {
            center,
            count,
            fitted: y_fit,
            residual: count - y_fit,
        });
    }
    Ok(out)
}

/// Mathtext symbol used for a parameter in legend labels.
pub fn tex_symbol(name: &str) -> &str {
    match name {
        "mean" => "$\\mu$",
        "sigma" => "$\\sigma$",
        "alpha" => "$\\alpha$",
        other => other,
    }
}

/// Legend label: a title line, then `sym=value$\pm$error` per parameter.
///
/// Values and errors use two decimals. Lines follow
/// [`ModelKind::label_order`].
pub fn format_fit_label(model: ModelKind, params: &[ParamEstimate]) -> String {
    let mut lines = vec![model.legend_title().to_string()];
    for &i in model.label_order() {
        if let Some(p) = params.get(i) {
            lines.push(format!("{}={:.2}$\\pm${:.2}", tex_symbol(&p.name), p.value, p.error));
        }
    }
    lines.join("\n")
}

/// Exposure mark text, e.g. `2.50×10^20 POT`.
///
/// Returns `None` for non-positive or non-finite exposure.
pub fn format_pot(exposure: f64) -> Option<String> {
    if !(exposure.is_finite() && exposure > 0.0) {
        return None;
    }
    let mag = exposure.log10().floor() as i32;
    let mantissa = exposure / 10f64.powi(mag);
    Some(format!("{mantissa:.2}×10^{mag} POT"))
}

/// Format the full fit summary (input stats + parameters + quality).
pub fn format_fit_summary(sample: &BinnedSample, fit: &FitResult, source: Option<&str>) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== spectra - {} fit ===\n", fit.model.display_name()));
    if let Some(source) = source {
        out.push_str(&format!("Source: {}\n", truncate(source, 60)));
    }
    if let Some((lo, hi)) = sample.x_range() {
        out.push_str(&format!(
            "Bins: n={} | x=[{lo:.3}, {hi:.3}] | total={:.2} | area={:.2}\n",
            sample.len(),
            sample.total(),
            sample.integral(),
        ));
    }
    out.push_str(&format!("Initial guess: {}\n", fmt_vec(&fit.initial)));

    out.push_str("\nParameters:\n");
    for p in &fit.params {
        out.push_str(&format!("  {:<6} = {:>12.4} ± {:.4}\n", p.name, p.value, p.error));
    }

    let q = &fit.quality;
    out.push_str(&format!(
        "\nQuality: SSE={:.4} RMSE={:.4} ndf={} chi2/ndf={:.4} iterations={}\n",
        q.sse, q.rmse, q.ndf, q.reduced_chi2, q.iterations
    ));

    out
}

/// Format a per-bin residual table.
pub fn format_residual_table(rows: &[BinResidual]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:>10} {:>12} {:>12} {:>12}\n", "x", "count", "fit", "residual").trim_end());
    out.push('\n');
    out.push_str(format!("{:->10} {:->12} {:->12} {:->12}\n", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        out.push_str(&format!(
            "{:>10.3} {:>12.3} {:>12.3} {:>12.3}\n",
            r.center, r.count, r.fitted, r.residual
        ));
    }

    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
