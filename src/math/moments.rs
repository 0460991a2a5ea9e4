//! Weighted moments of binned data.

/// Weighted average of `values`.
///
/// Returns `None` when lengths differ or the weights do not sum to a positive
/// finite value.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> Option<f64> {
    if values.len() != weights.len() {
        return None;
    }
    let sw: f64 = weights.iter().sum();
    if !(sw.is_finite() && sw > 0.0) {
        return None;
    }
    let swx: f64 = values.iter().zip(weights).map(|(x, w)| x * w).sum();
    Some(swx / sw)
}

/// Weighted (population) variance of `values` about `mean`.
pub fn weighted_variance(values: &[f64], weights: &[f64], mean: f64) -> Option<f64> {
    let sq: Vec<f64> = values.iter().map(|x| (x - mean).powi(2)).collect();
    weighted_mean(&sq, weights)
}

/// Weighted mean and standard deviation in one pass over the helpers.
pub fn weighted_mean_std(values: &[f64], weights: &[f64]) -> Option<(f64, f64)> {
    let mean = weighted_mean(values, weights)?;
    let var = weighted_variance(values, weights, mean)?;
    Some((mean, var.sqrt()))
}
