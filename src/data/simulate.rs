//! Seeded toy spectra for demos and tests.
//!
//! Gaussian events come straight from `rand_distr::Normal`; Crystal Ball
//! events are drawn by rejection against the unit-height core.

use clap::ValueEnum;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::Sample;
use crate::domain::BinnedSample;
use crate::error::FitError;
use crate::math::linspace;
use crate::models::crystal_ball;

/// Rejection-sampling budget for Crystal Ball events.
const MAX_TRIES_PER_EVENT: usize = 1000;

/// Shape of the generated peak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Gaussian,
    CrystalBall,
}

/// Generator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub shape: Shape,
    pub events: usize,
    pub seed: u64,
    pub bins: usize,
    pub range: (f64, f64),
    pub mean: f64,
    pub sigma: f64,
    /// Crystal Ball tail parameters; unused for Gaussian.
    pub alpha: f64,
    pub n: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            shape: Shape::Gaussian,
            events: 10_000,
            seed: 42,
            bins: 50,
            range: (-5.0, 5.0),
            mean: 0.0,
            sigma: 1.0,
            alpha: 1.5,
            n: 5.0,
        }
    }
}

/// Draw `config.events` values. Gaussian values may fall outside `range`;
/// Crystal Ball values are confined to it.
pub fn simulate_events(config: &SimConfig) -> Result<Sample, FitError> {
    validate(config)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let (lo, hi) = config.range;

    let values: Vec<f64> = match config.shape {
        Shape::Gaussian => {
            let normal = Normal::new(config.mean, config.sigma)
                .map_err(|e| FitError::InvalidInput(format!("Noise distribution error: {e}")))?;
            (0..config.events).map(|_| rng.sample(normal)).collect()
        }
        Shape::CrystalBall => {
            let mut out = Vec::with_capacity(config.events);
            let max_tries = config.events.saturating_mul(MAX_TRIES_PER_EVENT);
            let mut tries = 0usize;
            while out.len() < config.events {
                if tries == max_tries {
                    return Err(FitError::InvalidInput(format!(
                        "Crystal Ball sampling accepted {} of {tries} draws (rate {:.1e}); \
                         narrow the range or widen sigma.",
                        out.len(),
                        out.len() as f64 / tries as f64
                    )));
                }
                tries += 1;
                let x = rng.gen_range(lo..hi);
                let density = crystal_ball(&[x], config.alpha, config.n, config.mean, config.sigma, 1.0)[0];
                if rng.r#gen::<f64>() < density {
                    out.push(x);
                }
            }
            debug!("crystal ball rejection sampling: {} accepted of {tries}", out.len());
            out
        }
    };

    Ok(Sample::new(format!("toy {:?}", config.shape).to_lowercase(), values, 0.0))
}

/// Draw events and histogram them over `config.bins` equal-width bins.
pub fn simulate(config: &SimConfig) -> Result<BinnedSample, FitError> {
    let sample = simulate_events(config)?;
    let edges = linspace(config.range.0, config.range.1, config.bins + 1)?;
    sample.histogram(&edges)
}

fn validate(config: &SimConfig) -> Result<(), FitError> {
    if config.events == 0 {
        return Err(FitError::InvalidInput("Event count must be > 0.".to_string()));
    }
    if config.bins == 0 {
        return Err(FitError::InvalidInput("Bin count must be > 0.".to_string()));
    }
    let (lo, hi) = config.range;
    if !(lo.is_finite() && hi.is_finite() && hi > lo) {
        return Err(FitError::InvalidInput(format!("Invalid range: [{lo}, {hi}].")));
    }
    if !(config.sigma.is_finite() && config.sigma > 0.0 && config.mean.is_finite()) {
        return Err(FitError::InvalidInput("Peak mean must be finite and sigma > 0.".to_string()));
    }
    if config.shape == Shape::CrystalBall {
        if !(config.alpha.is_finite() && config.alpha != 0.0 && config.n.is_finite() && config.n > 0.0) {
            return Err(FitError::InvalidInput("Crystal Ball needs alpha != 0 and n > 0.".to_string()));
        }
        // Rejection sampling needs the core inside the window.
        if config.mean < lo || config.mean > hi {
            return Err(FitError::InvalidInput("Crystal Ball mean must lie inside the range.".to_string()));
        }
    }
    Ok(())
}
