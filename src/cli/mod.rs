//! Command-line parsing for the spectrum peak fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::data::Shape;
use crate::domain::ModelKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "spectra", version, about = "Peak fits (Gaussian / Crystal Ball) on binned spectra")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit one or more binned spectra, print the results, and optionally plot/export.
    Fit(FitArgs),
    /// Plot a previously exported curve JSON.
    Plot(PlotArgs),
    /// Generate a seeded toy spectrum as binned CSV.
    Simulate(SimulateArgs),
}

/// Options for fitting.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Binned CSV files (`low,high,count`). Several files are fitted in parallel.
    #[arg(short = 'i', long = "input", value_name = "CSV", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Peak model.
    #[arg(short = 'm', long, value_enum, default_value_t = ModelKind::Gaussian)]
    pub model: ModelKind,

    /// Range of the fitted overlay curve.
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], allow_negative_numbers = true, default_values_t = [-1.0, 1.0])]
    pub range: Vec<f64>,

    /// Number of overlay curve points.
    #[arg(long, default_value_t = 1000)]
    pub points: usize,

    /// Solver iteration cap (default: 200 * (params + 1)).
    #[arg(long, env = "SPECTRA_MAX_ITER")]
    pub max_iter: Option<usize>,

    /// Relative cost-reduction tolerance.
    #[arg(long, env = "SPECTRA_FTOL", default_value_t = 1.49012e-8)]
    pub ftol: f64,

    /// Relative step-size tolerance.
    #[arg(long, env = "SPECTRA_XTOL", default_value_t = 1.49012e-8)]
    pub xtol: f64,

    /// Gradient max-norm tolerance.
    #[arg(long, env = "SPECTRA_GTOL", default_value_t = 0.0)]
    pub gtol: f64,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Exposure (protons on target) to mark on the plot.
    #[arg(long, value_name = "EXPOSURE")]
    pub pot: Option<f64>,

    /// Run the exposure mark down the left edge instead of the top right.
    #[arg(long, requires = "pot")]
    pub pot_vertical: bool,

    /// Outline each bin with its Poisson (`±sqrt(count)`) error box.
    #[arg(long)]
    pub error_boxes: bool,

    /// Preliminary-result label to mark on the plot.
    #[arg(long, value_name = "LABEL")]
    pub preliminary: Option<String>,

    /// Export per-bin results to CSV (single input only).
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export curve (histogram + fit + overlay grid) to JSON (single input only).
    #[arg(long = "export-curve")]
    pub export_curve: Option<PathBuf>,
}

/// Options for plotting a saved curve.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Curve JSON file produced by `spectra fit --export-curve`.
    #[arg(long, value_name = "JSON")]
    pub curve: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

/// Options for the toy generator.
#[derive(Debug, Parser)]
pub struct SimulateArgs {
    /// Peak shape.
    #[arg(long, value_enum, default_value_t = Shape::Gaussian)]
    pub shape: Shape,

    /// Number of events to draw.
    #[arg(long, default_value_t = 10_000)]
    pub events: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of equal-width bins.
    #[arg(long, default_value_t = 50)]
    pub bins: usize,

    /// Histogram range.
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], allow_negative_numbers = true, default_values_t = [-5.0, 5.0])]
    pub range: Vec<f64>,

    /// Peak mean.
    #[arg(long, allow_negative_numbers = true, default_value_t = 0.0)]
    pub mean: f64,

    /// Peak width.
    #[arg(long, default_value_t = 1.0)]
    pub sigma: f64,

    /// Crystal Ball transition point (in sigmas).
    #[arg(long, default_value_t = 1.5)]
    pub alpha: f64,

    /// Crystal Ball tail power.
    #[arg(long, default_value_t = 5.0)]
    pub n: f64,

    /// Output CSV (default: stdout).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_args_parse_range_and_model() {
        let cli = Cli::parse_from([
            "spectra", "fit", "-i", "a.csv", "b.csv", "--model", "crystal-ball", "--range", "-3", "3", "--no-plot",
        ]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.inputs.len(), 2);
        assert_eq!(args.model, ModelKind::CrystalBall);
        assert_eq!(args.range, vec![-3.0, 3.0]);
        assert!(args.no_plot);
        assert_eq!(args.points, 1000);
    }

    #[test]
    fn simulate_defaults() {
        let cli = Cli::parse_from(["spectra", "simulate", "--shape", "crystal-ball"]);
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.shape, Shape::CrystalBall);
        assert_eq!(args.range, vec![-5.0, 5.0]);
        assert_eq!(args.bins, 50);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
