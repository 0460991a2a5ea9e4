//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - reads binned spectra and fits them
//! - prints reports/plots
//! - writes optional exports
//! - generates toy spectra

use std::fs::File;

use clap::Parser;

use crate::artist::Spectrum;
use crate::cli::{Command, FitArgs, PlotArgs, SimulateArgs};
use crate::data::{SimConfig, simulate};
use crate::domain::{FitConfig, RunConfig, SolverSettings};
use crate::error::AppError;
use crate::io::write_binned_csv;

pub mod pipeline;

/// Entry point for the `spectra` binary.
pub fn run() -> Result<(), AppError> {
    // Solver tolerances may come from a local `.env`; clap reads them via `env`.
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Plot(args) => handle_plot(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let runs = pipeline::run_fit(&config)?;

    for run in &runs {
        let source = run.source.display().to_string();
        println!(
            "{}",
            crate::report::format_fit_summary(&run.sample, &run.fit, Some(source.as_str()))
        );
        println!("{}", crate::report::format_residual_table(&run.residuals));

        if config.plot {
            let spectrum = spectrum_for_run(run, &config)?;
            println!("{}", spectrum.render(config.plot_width, config.plot_height));
        }
    }

    // Optional exports (single input, checked in `run_config_from_args`).
    if let Some(run) = runs.first() {
        if let Some(path) = &config.export_results {
            crate::io::write_results_csv(path, &run.sample, &run.fit, &run.residuals)?;
        }
        if let Some(path) = &config.export_curve {
            let curve = crate::io::curve_file(&run.sample, &run.fit, Some(run.source.as_path()));
            crate::io::write_curve_json(path, &curve)?;
        }
    }

    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let curve = crate::io::read_curve_json(&args.curve)?;
    let spectrum = Spectrum::from_binned("data", &curve.sample)?.with_fit(curve.result);
    println!("{}", spectrum.render(args.width, args.height));
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let config = SimConfig {
        shape: args.shape,
        events: args.events,
        seed: args.seed,
        bins: args.bins,
        range: range_pair(&args.range)?,
        mean: args.mean,
        sigma: args.sigma,
        alpha: args.alpha,
        n: args.n,
    };
    let sample = simulate(&config)?;

    match &args.output {
        Some(path) => {
            let mut file = File::create(path)
                .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;
            write_binned_csv(&mut file, &sample)
                .map_err(|e| AppError::new(2, format!("Failed to write CSV '{}': {e}", path.display())))?;
        }
        None => {
            let stdout = std::io::stdout();
            write_binned_csv(&mut stdout.lock(), &sample)
                .map_err(|e| AppError::new(2, format!("Failed to write CSV: {e}")))?;
        }
    }
    Ok(())
}

/// The fitted histogram as an artist, with the marks requested on the command line.
fn spectrum_for_run(run: &pipeline::SpectrumRun, config: &RunConfig) -> Result<Spectrum, AppError> {
    let mut spectrum = Spectrum::from_binned("data", &run.sample)?
        .with_fit(run.fit.clone())
        .with_vertical_pot(config.pot_vertical)
        .with_error_boxes(config.error_boxes);
    if let Some(pot) = config.pot {
        spectrum = spectrum.with_exposure(pot);
    }
    if let Some(label) = &config.preliminary {
        spectrum = spectrum.with_preliminary(label.clone());
    }
    Ok(spectrum)
}

pub fn run_config_from_args(args: &FitArgs) -> Result<RunConfig, AppError> {
    let (min, max) = range_pair(&args.range)?;
    if args.inputs.len() > 1 && (args.export.is_some() || args.export_curve.is_some()) {
        return Err(AppError::new(2, "Exports need a single `--input` file."));
    }

    Ok(RunConfig {
        inputs: args.inputs.clone(),
        fit: FitConfig {
            model: args.model,
            eval_range: (min, max),
            curve_points: args.points,
            solver: SolverSettings {
                max_iterations: args.max_iter,
                ftol: args.ftol,
                xtol: args.xtol,
                gtol: args.gtol,
            },
        },
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        pot: args.pot,
        pot_vertical: args.pot_vertical,
        error_boxes: args.error_boxes,
        preliminary: args.preliminary.clone(),
        export_results: args.export.clone(),
        export_curve: args.export_curve.clone(),
    })
}

fn range_pair(range: &[f64]) -> Result<(f64, f64), AppError> {
    match range {
        [min, max] => Ok((*min, *max)),
        _ => Err(AppError::new(2, "`--range` takes exactly two values: MIN MAX.")),
    }
}
