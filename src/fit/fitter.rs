//! Fit a single binned spectrum with a chosen peak model.
//!
//! Given:
//! - bin centers `x_i`, counts `y_i`, and bin edges
//! - a model kind (Gaussian / Crystal Ball / Crystal Ball + linear)
//!
//! we:
//! - validate the histogram shape (no solver work on malformed input)
//! - seed the parameters from the histogram moments
//! - minimize `Σ (y_i - f(x_i; p))²` with Levenberg–Marquardt
//! - report parameters with `sqrt(diag(cov))` errors and a dense overlay curve

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::{BinnedSample, CurveGrid, FitConfig, FitQuality, FitResult, ModelKind, ParamEstimate};
use crate::error::FitError;
use crate::fit::seed::initial_guess;
use crate::math::{covariance, levenberg_marquardt, linspace};
use crate::models::evaluate;
use crate::report::format_fit_label;

/// Fit `sample` with the model and settings in `config`.
pub fn fit(sample: &BinnedSample, config: &FitConfig) -> Result<FitResult, FitError> {
    let model = config.model;
    validate_sample(sample, model)?;
    let (eval_min, eval_max) = config.eval_range;
    let x_eval = linspace(eval_min, eval_max, config.curve_points)?;

    let initial = initial_guess(sample, model)?;
    debug!("{model} fit over {} bins, initial guess {initial:?}", sample.len());

    let centers = &sample.centers;
    let solved = levenberg_marquardt(|p| evaluate(model, centers, p), &sample.counts, &initial, &config.solver)
        .inspect_err(|e| warn!("{model} fit failed: {e}"))?;
    let cov = covariance(&solved.jacobian, solved.sse)
        .inspect_err(|e| warn!("{model} fit converged but has no usable covariance: {e}"))?;

    let params: Vec<ParamEstimate> = model
        .param_names()
        .iter()
        .zip(&solved.params)
        .enumerate()
        .map(|(i, (name, &value))| ParamEstimate {
            name: name.to_string(),
            value,
            error: cov[(i, i)].sqrt(),
        })
        .collect();

    let n = sample.len();
    let ndf = n - model.param_count();
    if ndf > 0 {
        let unresolved: Vec<&str> = params
            .iter()
            .filter(|p| p.error.is_infinite())
            .map(|p| p.name.as_str())
            .collect();
        if !unresolved.is_empty() {
            warn!("{model} fit: data do not constrain {unresolved:?}; their errors are infinite");
        }
    }
    let quality = FitQuality {
        sse: solved.sse,
        rmse: (solved.sse / n as f64).sqrt(),
        ndf,
        reduced_chi2: if ndf > 0 { solved.sse / ndf as f64 } else { f64::INFINITY },
        iterations: solved.iterations,
        n,
    };

    let curve = CurveGrid {
        y: evaluate(model, &x_eval, &solved.params),
        x: x_eval,
    };
    let label = format_fit_label(model, &params);

    let covariance = (0..cov.nrows())
        .map(|i| cov.row(i).iter().copied().collect())
        .collect();

    Ok(FitResult {
        model,
        initial,
        params,
        covariance,
        quality,
        curve,
        label,
    })
}

/// Fit parallel sequences of bin centers, counts, and edges.
///
/// Convenience wrapper over [`fit`] for callers that do not hold a
/// [`BinnedSample`]; other solver settings take their defaults.
pub fn fit_bins(
    centers: &[f64],
    counts: &[f64],
    edges: &[f64],
    model: ModelKind,
    eval_range: (f64, f64),
) -> Result<FitResult, FitError> {
    let sample = BinnedSample::new(centers.to_vec(), counts.to_vec(), edges.to_vec());
    let config = FitConfig::new(model).with_range(eval_range.0, eval_range.1);
    fit(&sample, &config)
}

/// Fit independent spectra in parallel. Results keep the input order.
pub fn fit_all(samples: &[BinnedSample], config: &FitConfig) -> Vec<Result<FitResult, FitError>> {
    samples.par_iter().map(|s| fit(s, config)).collect()
}

/// Check the histogram shape against the model before fitting.
pub fn validate_sample(sample: &BinnedSample, model: ModelKind) -> Result<(), FitError> {
    let n = sample.centers.len();
    if sample.counts.len() != n {
        return Err(FitError::InvalidInput(format!(
            "Counts length {} does not match centers length {n}.",
            sample.counts.len()
        )));
    }
    if sample.edges.len() != n + 1 {
        return Err(FitError::InvalidInput(format!(
            "Edges length {} must be centers length + 1 = {}.",
            sample.edges.len(),
            n + 1
        )));
    }

    let k = model.param_count();
    if n < k {
        return Err(FitError::InsufficientData { expected: k, actual: n });
    }

    let all_finite = sample
        .centers
        .iter()
        .chain(&sample.counts)
        .chain(&sample.edges)
        .all(|v| v.is_finite());
    if !all_finite {
        return Err(FitError::InvalidInput("Bins contain NaN or infinite values.".to_string()));
    }

    for (i, w) in sample.edges.windows(2).enumerate() {
        if w[1] <= w[0] {
            return Err(FitError::InvalidInput(format!(
                "Edges must be strictly increasing (edge {} = {} >= edge {} = {}).",
                i,
                w[0],
                i + 1,
                w[1]
            )));
        }
        let c = sample.centers[i];
        if c < w[0] || c > w[1] {
            return Err(FitError::InvalidInput(format!(
                "Center {c} of bin {i} lies outside [{}, {}].",
                w[0], w[1]
            )));
        }
    }

    if let Some(i) = sample.counts.iter().position(|&c| c < 0.0) {
        return Err(FitError::InvalidInput(format!(
            "Bin {i} has a negative count ({}).",
            sample.counts[i]
        )));
    }
    if sample.total() <= 0.0 {
        return Err(FitError::InvalidInput("Histogram is empty (all counts are zero).".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::crystal_ball;

    fn symmetric() -> BinnedSample {
        BinnedSample::new(
            vec![-2.0, -1.0, 0.0, 1.0, 2.0],
            vec![1.0, 5.0, 10.0, 5.0, 1.0],
            vec![-2.5, -1.5, -0.5, 0.5, 1.5, 2.5],
        )
    }

    /// Uniform bins on `[lo, hi)` with counts from `f(center)` plus an
    /// alternating ±`wiggle` so the fit has non-zero residuals.
    fn binned(lo: f64, width: f64, bins: usize, wiggle: f64, f: impl Fn(&[f64]) -> Vec<f64>) -> BinnedSample {
        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
        let mut sample = BinnedSample::from_edges(edges, vec![]);
        sample.counts = f(&sample.centers)
            .into_iter()
            .enumerate()
            .map(|(i, y)| (y + if i % 2 == 1 { wiggle } else { -wiggle }).max(0.0))
            .collect();
        sample
    }

    #[test]
    fn gaussian_fit_on_symmetric_histogram() {
        let config = FitConfig::new(ModelKind::Gaussian).with_range(-3.0, 3.0);
        let fit = fit(&symmetric(), &config).unwrap();

        let mean = fit.param("mean").unwrap();
        let sigma = fit.param("sigma").unwrap();
        let norm = fit.param("N").unwrap();
        assert!(mean.value.abs() < 0.2, "mean={}", mean.value);
        assert!((sigma.value - 1.0).abs() < 0.3, "sigma={}", sigma.value);
        assert!((norm.value - 22.0).abs() < 3.0, "N={}", norm.value);
        assert!(fit.errors().iter().all(|e| e.is_finite() && *e > 0.0));

        assert_eq!(fit.curve.len(), 1000);
        assert_eq!(fit.curve.x[0], -3.0);
        assert_eq!(fit.curve.x[999], 3.0);
        assert_eq!(fit.quality.ndf, 2);
        assert!(fit.label.starts_with("Gaussian Fit\n$\\mu$="));
    }

    #[test]
    fn gaussian_overlay_has_single_peak_at_mean() {
        let config = FitConfig::new(ModelKind::Gaussian).with_range(-3.0, 3.0);
        let fit = fit(&symmetric(), &config).unwrap();

        let (imax, _) = fit
            .curve
            .y
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |acc, (i, &y)| if y > acc.1 { (i, y) } else { acc });
        assert!(fit.curve.x[imax].abs() < 0.01);

        // Rising before the peak, falling after it.
        assert!(fit.curve.y[..=imax].windows(2).all(|w| w[1] >= w[0]));
        assert!(fit.curve.y[imax..].windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn fit_bins_matches_sample_api() {
        let s = symmetric();
        let a = fit_bins(&s.centers, &s.counts, &s.edges, ModelKind::Gaussian, (-1.0, 1.0)).unwrap();
        let b = fit(&s, &FitConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn crystal_ball_recovers_generated_shape() {
        let sample = binned(-5.0, 0.25, 40, 0.15, |x| crystal_ball(x, 1.2, 4.0, 0.0, 1.0, 100.0));
        let config = FitConfig::new(ModelKind::CrystalBall).with_range(-5.0, 5.0);
        let fit = fit(&sample, &config).unwrap();

        let v = fit.values();
        assert!((v[0] - 1.2).abs() < 0.05, "alpha={}", v[0]);
        assert!((v[1] - 4.0).abs() < 0.5, "n={}", v[1]);
        assert!(v[2].abs() < 0.05, "mean={}", v[2]);
        assert!((v[3] - 1.0).abs() < 0.05, "sigma={}", v[3]);
        assert!((v[4] - 100.0).abs() < 1.0, "N={}", v[4]);
        assert!(fit.errors().iter().all(|e| e.is_finite()));
    }

    #[test]
    fn crystal_ball_on_symmetric_peak_reports_finite_alpha_error() {
        let sample = binned(-4.0, 0.2, 40, 0.3, |x| {
            x.iter().map(|&xi| 100.0 * (-0.5 * xi * xi).exp()).collect()
        });
        let config = FitConfig::new(ModelKind::CrystalBall).with_range(-4.0, 4.0);
        let fit = fit(&sample, &config).unwrap();

        let alpha = fit.param("alpha").unwrap();
        assert!(alpha.error.is_finite());
        assert!(fit.param("mean").unwrap().value.abs() < 0.05);
        assert!((fit.param("sigma").unwrap().value - 1.0).abs() < 0.05);
    }

    #[test]
    fn crystal_ball_on_exact_gaussian_keeps_the_converged_fit() {
        // No wiggle: the tail never reaches the data, so `n` has no effect.
        let sample = binned(-4.0, 0.2, 40, 0.0, |x| {
            x.iter().map(|&xi| 100.0 * (-0.5 * xi * xi).exp()).collect()
        });
        let config = FitConfig::new(ModelKind::CrystalBall).with_range(-4.0, 4.0);
        let fit = fit(&sample, &config).unwrap();

        assert!(fit.param("mean").unwrap().value.abs() < 1e-3);
        assert!((fit.param("sigma").unwrap().value - 1.0).abs() < 1e-3);
        assert!((fit.param("N").unwrap().value - 100.0).abs() < 0.1);
        for name in ["mean", "sigma", "N"] {
            assert!(fit.param(name).unwrap().error.is_finite(), "{name}");
        }
        assert!(fit.label.contains("$\\alpha$="));
    }

    #[test]
    fn crystal_ball_on_gaussian_toys_reports_the_core() {
        use crate::data::{SimConfig, simulate};

        let config = FitConfig::new(ModelKind::CrystalBall).with_range(-5.0, 5.0);
        for seed in [2, 4, 6] {
            let sample = simulate(&SimConfig {
                events: 20_000,
                seed,
                ..SimConfig::default()
            })
            .unwrap();
            let fit = fit(&sample, &config).unwrap();

            let mean = fit.param("mean").unwrap();
            let sigma = fit.param("sigma").unwrap();
            assert!(mean.value.abs() < 0.05, "seed {seed}: mean={}", mean.value);
            assert!((sigma.value - 1.0).abs() < 0.05, "seed {seed}: sigma={}", sigma.value);
            for name in ["mean", "sigma", "N"] {
                assert!(fit.param(name).unwrap().error.is_finite(), "seed {seed}: {name}");
            }
        }
    }

    #[test]
    fn crystal_ball_linear_absorbs_background() {
        let sample = binned(-5.0, 0.25, 40, 0.15, |x| crystal_ball(x, 1.2, 4.0, 0.0, 1.0, 100.0));
        let config = FitConfig::new(ModelKind::CrystalBallLinear).with_range(-5.0, 5.0);
        let fit = fit(&sample, &config).unwrap();

        assert_eq!(fit.params.len(), 7);
        assert!(fit.param("m").unwrap().value.abs() < 0.2);
        assert!(fit.param("b").unwrap().value.abs() < 0.5);
        assert!((fit.param("sigma").unwrap().value - 1.0).abs() < 0.05);
        assert!(fit.label.lines().count() == 8);
    }

    #[test]
    fn mismatched_edges_fail_before_solving() {
        let mut s = symmetric();
        s.edges.pop();
        let err = fit(&s, &FitConfig::default()).unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(ref m) if m.contains("Edges length")));
        assert!(err.is_input_error());
    }

    #[test]
    fn too_few_bins_for_model() {
        let s = BinnedSample::from_edges(vec![0.0, 1.0, 2.0, 3.0], vec![1.0, 3.0, 1.0]);
        let err = fit(&s, &FitConfig::new(ModelKind::CrystalBall)).unwrap_err();
        assert_eq!(err, FitError::InsufficientData { expected: 5, actual: 3 });
    }

    #[test]
    fn validation_rejects_malformed_bins() {
        let base = symmetric();

        let mut s = base.clone();
        s.counts.push(1.0);
        assert!(validate_sample(&s, ModelKind::Gaussian).is_err());

        let mut s = base.clone();
        s.edges[2] = s.edges[1];
        assert!(validate_sample(&s, ModelKind::Gaussian).is_err());

        let mut s = base.clone();
        s.centers[0] = 7.0;
        assert!(validate_sample(&s, ModelKind::Gaussian).is_err());

        let mut s = base.clone();
        s.counts[1] = -1.0;
        assert!(validate_sample(&s, ModelKind::Gaussian).is_err());

        let mut s = base.clone();
        s.counts = vec![0.0; 5];
        assert!(validate_sample(&s, ModelKind::Gaussian).is_err());

        let mut s = base;
        s.centers[2] = f64::NAN;
        assert!(validate_sample(&s, ModelKind::Gaussian).is_err());
    }

    #[test]
    fn bad_eval_range_is_an_input_error() {
        let config = FitConfig::new(ModelKind::Gaussian).with_range(1.0, -1.0);
        assert!(fit(&symmetric(), &config).unwrap_err().is_input_error());
    }

    #[test]
    fn iteration_cap_surfaces_as_fit_failure() {
        let mut config = FitConfig::new(ModelKind::CrystalBall).with_range(-5.0, 5.0);
        config.solver.max_iterations = Some(1);
        let sample = binned(-5.0, 0.25, 40, 0.15, |x| crystal_ball(x, 1.2, 4.0, 0.0, 1.0, 100.0));
        let err = fit(&sample, &config).unwrap_err();
        assert!(matches!(err, FitError::NotConverged { .. }));
        assert!(!err.is_input_error());
    }

    #[test]
    fn fit_all_keeps_order_and_isolates_failures() {
        let mut broken = symmetric();
        broken.edges.pop();
        let samples = vec![symmetric(), broken, symmetric()];
        let results = fit_all(&samples, &FitConfig::default());
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert_eq!(results[0], results[2]);
    }
}
