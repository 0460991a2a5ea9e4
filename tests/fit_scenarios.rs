use std::collections::BTreeMap;
use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use spine_spectra::artist::{Artist, Spectrum};
use spine_spectra::data::{Sample, Shape, SimConfig, simulate, simulate_events};
use spine_spectra::domain::{BinnedSample, FitConfig, ModelKind};
use spine_spectra::error::{AppError, FitError};
use spine_spectra::fit::{fit, fit_all, fit_bins};
use spine_spectra::io::{curve_file, load_binned_csv, read_curve_json, write_curve_json};

fn temp_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("spectra_{}_{name}", std::process::id()));
    path
}

#[test]
fn five_bin_gaussian_peak() {
    let result = fit_bins(
        &[-2.0, -1.0, 0.0, 1.0, 2.0],
        &[1.0, 5.0, 10.0, 5.0, 1.0],
        &[-2.5, -1.5, -0.5, 0.5, 1.5, 2.5],
        ModelKind::Gaussian,
        (-3.0, 3.0),
    )
    .unwrap();

    assert_abs_diff_eq!(result.values()[0], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.values()[1], 0.8764, epsilon = 1e-3);
    assert_abs_diff_eq!(result.values()[2], 21.7046, epsilon = 1e-2);
    assert_abs_diff_eq!(result.errors()[1], 0.0310, epsilon = 1e-3);

    assert_eq!(result.initial.len(), 3);
    assert_eq!(result.curve.len(), 1000);
    assert!(result.label.contains("$\\sigma$=0.88$\\pm$0.03"));
}

#[test]
fn exactly_determined_fit_reports_infinite_errors() {
    let sample = BinnedSample::from_edges(vec![-1.5, -0.5, 0.5, 1.5], vec![1.0, 10.0, 1.0]);
    let result = fit(&sample, &FitConfig::new(ModelKind::Gaussian)).unwrap();

    assert_abs_diff_eq!(result.param("sigma").unwrap().value, 0.46599, epsilon = 1e-4);
    assert!(result.errors().iter().all(|e| e.is_infinite()));
    assert_eq!(result.quality.ndf, 0);
    assert!(result.quality.reduced_chi2.is_infinite());
}

#[test]
fn fit_errors_map_to_exit_codes() {
    let short = BinnedSample::from_edges(vec![0.0, 1.0, 2.0], vec![1.0, 2.0]);
    let err = fit(&short, &FitConfig::new(ModelKind::CrystalBallLinear)).unwrap_err();
    assert_eq!(err, FitError::InsufficientData { expected: 7, actual: 2 });
    assert_eq!(AppError::from(err).exit_code(), 2);

    let peak = BinnedSample::from_edges(
        (0..=20).map(|i| -5.0 + 0.5 * i as f64).collect(),
        (0..20).map(|i| if i == 10 { 50.0 } else { 1.0 + i as f64 * 0.1 }).collect(),
    );
    let mut config = FitConfig::new(ModelKind::CrystalBall);
    config.solver.max_iterations = Some(1);
    let err = fit(&peak, &config).unwrap_err();
    assert_eq!(AppError::from(err).exit_code(), 4);
}

#[test]
fn simulated_spectra_fit_in_parallel() {
    let centered = simulate(&SimConfig {
        shape: Shape::CrystalBall,
        events: 20_000,
        seed: 11,
        ..SimConfig::default()
    })
    .unwrap();
    let shifted = simulate(&SimConfig {
        shape: Shape::CrystalBall,
        events: 20_000,
        seed: 12,
        mean: 1.0,
        sigma: 0.7,
        ..SimConfig::default()
    })
    .unwrap();

    let config = FitConfig::new(ModelKind::CrystalBall).with_range(-5.0, 5.0);
    let results = fit_all(&[centered, shifted], &config);
    assert_eq!(results.len(), 2);

    for (result, (mean, sigma)) in results.iter().zip([(0.0, 1.0), (1.0, 0.7)]) {
        let result = result.as_ref().unwrap();
        assert_abs_diff_eq!(result.param("mean").unwrap().value, mean, epsilon = 0.05);
        assert_abs_diff_eq!(result.param("sigma").unwrap().value, sigma, epsilon = 0.05);
        assert_abs_diff_eq!(result.param("alpha").unwrap().value.abs(), 1.5, epsilon = 0.3);
        assert!(result.errors().iter().all(|e| e.is_finite()));
    }
}

#[test]
fn csv_to_curve_json_and_back() {
    let csv = temp_path("peak.csv");
    std::fs::write(
        &csv,
        "low,high,count\n-2.5,-1.5,1\n-1.5,-0.5,5\n-0.5,0.5,10\n0.5,1.5,5\n1.5,2.5,1\n",
    )
    .unwrap();

    let ingested = load_binned_csv(&csv).unwrap();
    let result = fit(&ingested.sample, &FitConfig::new(ModelKind::Gaussian).with_range(-3.0, 3.0)).unwrap();

    let json = temp_path("peak.json");
    write_curve_json(&json, &curve_file(&ingested.sample, &result, Some(csv.as_path()))).unwrap();
    let back = read_curve_json(&json).unwrap();

    let _ = std::fs::remove_file(&csv);
    let _ = std::fs::remove_file(&json);

    assert_eq!(back.result.label, result.label);
    assert_eq!(back.result.curve.len(), result.curve.len());
    for (a, b) in back.result.values().iter().zip(result.values()) {
        assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
    }
    assert_eq!(back.sample.counts, vec![1.0, 5.0, 10.0, 5.0, 1.0]);
}

#[test]
fn spectrum_artist_fits_stacked_categories() {
    let signal = simulate_events(&SimConfig {
        events: 3_000,
        ..SimConfig::default()
    })
    .unwrap();
    let n = signal.len();
    let mut values = signal.values;
    values.extend((0..1_000).map(|i| -3.0 + 6.0 * i as f64 / 1_000.0));
    let categories = (0..values.len()).map(|i| if i < n { 0 } else { 1 }).collect();
    let sample = Sample::new("data", values, 6.6e20).with_categories(categories);

    let edges: Vec<f64> = (0..=30).map(|i| -3.0 + 0.2 * i as f64).collect();
    let mut spectrum = Spectrum::new(
        edges,
        BTreeMap::from([(0, "Signal".to_string()), (1, "Flat".to_string())]),
    )
    .unwrap();
    spectrum.add_sample(&sample).unwrap();
    assert_eq!(spectrum.exposure(), Some(6.6e20));
    assert_abs_diff_eq!(spectrum.category_counts("Flat").unwrap().iter().sum::<f64>(), 1_000.0);

    let config = FitConfig::new(ModelKind::CrystalBallLinear).with_range(-3.0, 3.0);
    let result = spectrum.fit_with(&config).unwrap();
    assert_abs_diff_eq!(result.param("mean").unwrap().value, 0.0, epsilon = 0.15);
    assert_abs_diff_eq!(result.param("sigma").unwrap().value, 1.0, epsilon = 0.15);

    let txt = spectrum.render(80, 20);
    assert!(txt.contains("6.60×10^20 POT"));
}
