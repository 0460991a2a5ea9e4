//! Unbinned samples and histogramming.

use serde::{Deserialize, Serialize};

use crate::domain::BinnedSample;
use crate::error::FitError;

/// A named collection of per-event values, each tagged with a category.
///
/// `exposure` is the sample's protons-on-target; the ordinate sample of a
/// spectrum sets the exposure shown on the plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
    pub values: Vec<f64>,
    pub categories: Vec<u32>,
    pub exposure: f64,
}

impl Sample {
    /// Sample where every event belongs to category 0.
    pub fn new(name: impl Into<String>, values: Vec<f64>, exposure: f64) -> Self {
        let categories = vec![0; values.len()];
        Self {
            name: name.into(),
            values,
            categories,
            exposure,
        }
    }

    pub fn with_categories(mut self, categories: Vec<u32>) -> Self {
        self.categories = categories;
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values of events in `category`.
    pub fn values_in(&self, category: u32) -> impl Iterator<Item = f64> + '_ {
        self.values
            .iter()
            .zip(&self.categories)
            .filter(move |&(_, &c)| c == category)
            .map(|(&v, _)| v)
    }

    /// Histogram all events over `edges`.
    pub fn histogram(&self, edges: &[f64]) -> Result<BinnedSample, FitError> {
        let counts = histogram(self.values.iter().copied(), edges)?;
        Ok(BinnedSample::from_edges(edges.to_vec(), counts))
    }
}

/// Count values per bin. The last bin includes its upper edge; values outside
/// the edges or non-finite are dropped.
pub fn histogram(values: impl IntoIterator<Item = f64>, edges: &[f64]) -> Result<Vec<f64>, FitError> {
    if edges.len() < 2 {
        return Err(FitError::InvalidInput("Histogram needs at least two edges.".to_string()));
    }
    if edges.windows(2).any(|w| !(w[1] > w[0])) || edges.iter().any(|e| !e.is_finite()) {
        return Err(FitError::InvalidInput(
            "Histogram edges must be finite and strictly increasing.".to_string(),
        ));
    }

    let bins = edges.len() - 1;
    let (lo, hi) = (edges[0], edges[bins]);
    let mut counts = vec![0.0; bins];
    for v in values {
        if !(v >= lo && v <= hi) {
            continue;
        }
        let i = edges.partition_point(|&e| e <= v).saturating_sub(1).min(bins - 1);
        counts[i] += 1.0;
    }
    Ok(counts)
}
