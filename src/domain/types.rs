//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};

/// Parametric peak model used by the fitter.
///
/// Each kind has a fixed parameter layout; fitted vectors and covariance rows
/// follow the order returned by [`ModelKind::param_names`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// `[mean, sigma, N]`
    Gaussian,
    /// `[alpha, n, mean, sigma, N]`
    CrystalBall,
    /// `[alpha, n, mean, sigma, N, m, b]`
    CrystalBallLinear,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::Gaussian,
        ModelKind::CrystalBall,
        ModelKind::CrystalBallLinear,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Gaussian => "Gaussian",
            ModelKind::CrystalBall => "Crystal Ball",
            ModelKind::CrystalBallLinear => "Crystal Ball + linear",
        }
    }

    /// Legend header. Both Crystal Ball variants share one title.
    pub fn legend_title(self) -> &'static str {
        match self {
            ModelKind::Gaussian => "Gaussian Fit",
            ModelKind::CrystalBall | ModelKind::CrystalBallLinear => "Crystal Ball Fit",
        }
    }

    /// Parameter names in solver order.
    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Gaussian => &["mean", "sigma", "N"],
            ModelKind::CrystalBall => &["alpha", "n", "mean", "sigma", "N"],
            ModelKind::CrystalBallLinear => &["alpha", "n", "mean", "sigma", "N", "m", "b"],
        }
    }

    /// Number of free parameters.
    pub fn param_count(self) -> usize {
        self.param_names().len()
    }

    /// Parameter indices in the order they appear in the legend label:
    /// peak position and width first, shape parameters next, background and
    /// normalization last.
    pub fn label_order(self) -> &'static [usize] {
        match self {
            ModelKind::Gaussian => &[0, 1, 2],
            ModelKind::CrystalBall => &[2, 3, 0, 1, 4],
            ModelKind::CrystalBallLinear => &[2, 3, 0, 1, 5, 6, 4],
        }
    }

    /// Index of a named parameter, if the model has it.
    pub fn param_index(self, name: &str) -> Option<usize> {
        self.param_names().iter().position(|&n| n == name)
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Histogram representation of a spectrum.
///
/// Invariants (checked by the fitter, not by construction):
/// - `edges.len() == centers.len() + 1`
/// - `counts.len() == centers.len()`
/// - edges strictly increasing, each center inside its bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinnedSample {
    pub centers: Vec<f64>,
    pub counts: Vec<f64>,
    pub edges: Vec<f64>,
}

impl BinnedSample {
    pub fn new(centers: Vec<f64>, counts: Vec<f64>, edges: Vec<f64>) -> Self {
        Self {
            centers,
            counts,
            edges,
        }
    }

    /// Build a sample from bin edges and counts, using bin midpoints as centers.
    pub fn from_edges(edges: Vec<f64>, counts: Vec<f64>) -> Self {
        let centers = edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();
        Self {
            centers,
            counts,
            edges,
        }
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Bin widths (`edges[i+1] - edges[i]`).
    pub fn widths(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Area under the histogram: `Σ counts[i] * width[i]`.
    pub fn integral(&self) -> f64 {
        self.counts
            .iter()
            .zip(self.edges.windows(2))
            .map(|(c, w)| c * (w[1] - w[0]))
            .sum()
    }

    /// Sum of raw counts.
    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// `(first edge, last edge)` if the sample has any bins.
    pub fn x_range(&self) -> Option<(f64, f64)> {
        match (self.edges.first(), self.edges.last()) {
            (Some(&lo), Some(&hi)) if self.edges.len() >= 2 => Some((lo, hi)),
            _ => None,
        }
    }
}

/// A fitted parameter with its ±1σ error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamEstimate {
    pub name: String,
    pub value: f64,
    /// `+inf` when the fit has no residual degrees of freedom.
    #[serde(deserialize_with = "f64_or_inf")]
    pub error: f64,
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    /// Sum of squared residuals at the solution.
    pub sse: f64,
    pub rmse: f64,
    /// Degrees of freedom (`bins - params`).
    pub ndf: usize,
    /// `sse / ndf`; infinite when `ndf == 0`.
    #[serde(deserialize_with = "f64_or_inf")]
    pub reduced_chi2: f64,
    /// Solver iterations used.
    pub iterations: usize,
    pub n: usize,
}

/// Dense evaluation of a fitted model for overlay drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl CurveGrid {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Iterate `(x, y)` pairs.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }
}

/// Output of a single fit. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub model: ModelKind,
    /// Starting point handed to the solver.
    pub initial: Vec<f64>,
    pub params: Vec<ParamEstimate>,
    /// Row-major parameter covariance, in solver order.
    #[serde(deserialize_with = "matrix_or_inf")]
    pub covariance: Vec<Vec<f64>>,
    pub quality: FitQuality,
    pub curve: CurveGrid,
    /// Legend text with every parameter and its ±1σ error.
    pub label: String,
}

impl FitResult {
    /// Fitted parameter vector in solver order.
    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.value).collect()
    }

    /// Standard errors in solver order.
    pub fn errors(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.error).collect()
    }

    /// Look up a parameter by name (`"mean"`, `"sigma"`, ...).
    pub fn param(&self, name: &str) -> Option<&ParamEstimate> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// Levenberg–Marquardt stopping rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Iteration cap. `None` means `200 * (params + 1)`.
    pub max_iterations: Option<usize>,
    /// Relative reduction in the sum of squares considered converged.
    pub ftol: f64,
    /// Relative step size considered converged.
    pub xtol: f64,
    /// Gradient max-norm considered converged.
    pub gtol: f64,
}

impl SolverSettings {
    /// Iteration cap for a model with `params` free parameters.
    pub fn iteration_cap(&self, params: usize) -> usize {
        self.max_iterations
            .unwrap_or_else(|| 200 * (params + 1))
            .max(1)
    }
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: None,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.0,
        }
    }
}

/// Per-fit configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    pub model: ModelKind,
    /// `(min, max)` of the overlay curve.
    pub eval_range: (f64, f64),
    /// Number of overlay points (endpoints included).
    pub curve_points: usize,
    pub solver: SolverSettings,
}

impl FitConfig {
    pub fn new(model: ModelKind) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.eval_range = (min, max);
        self
    }
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::Gaussian,
            eval_range: (-1.0, 1.0),
            curve_points: 1000,
            solver: SolverSettings::default(),
        }
    }
}

/// A full `spectra fit` run as understood by the pipeline.
///
/// This is derived from CLI flags (plus environment and defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub inputs: Vec<PathBuf>,
    pub fit: FitConfig,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    /// Exposure (protons on target) shown on the plot.
    pub pot: Option<f64>,
    /// Run the exposure mark down the left edge.
    pub pot_vertical: bool,
    /// Outline each bin with its Poisson error box.
    pub error_boxes: bool,
    /// Preliminary-result marker shown on the plot.
    pub preliminary: Option<String>,

    pub export_results: Option<PathBuf>,
    pub export_curve: Option<PathBuf>,
}

/// A saved curve file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    /// Input the fit was run on, if it came from a file.
    pub source: Option<String>,
    pub sample: BinnedSample,
    pub result: FitResult,
}

// JSON has no infinity; serde_json writes non-finite floats as `null`.
fn f64_or_inf<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}

fn matrix_or_inf<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<f64>>, D::Error> {
    let rows = Vec::<Vec<Option<f64>>>::deserialize(deserializer)?;
    Ok(rows
        .into_iter()
        .map(|row| row.into_iter().map(|v| v.unwrap_or(f64::INFINITY)).collect())
        .collect())
}
