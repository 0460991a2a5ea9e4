//! Initial parameter estimates.
//!
//! A nonlinear fit started far from the optimum tends to wander into the
//! Crystal Ball's invalid region or a flat tail. The seeds below come straight
//! from the histogram:
//!
//! - `mean`: count-weighted average of the bin centers
//! - `sigma`: square root of the count-weighted variance about `mean`
//! - `N`: histogram area `Σ counts[i] * width[i]`
//!
//! Crystal Ball shape parameters start at `alpha = 1.5`, `n = 5`; the linear
//! background starts flat at the mean bin count.

use crate::domain::{BinnedSample, ModelKind};
use crate::error::FitError;
use crate::math::weighted_mean_std;

/// Starting transition point (in units of sigma) for Crystal Ball fits.
pub const SEED_ALPHA: f64 = 1.5;
/// Starting tail exponent for Crystal Ball fits.
pub const SEED_N: f64 = 5.0;

/// Compute the solver starting point for `model` in solver parameter order.
pub fn initial_guess(sample: &BinnedSample, model: ModelKind) -> Result<Vec<f64>, FitError> {
    let (mean, sigma) = weighted_mean_std(&sample.centers, &sample.counts).ok_or_else(|| {
        FitError::InvalidInput("Bin counts must have matching length and a positive sum.".to_string())
    })?;
    let norm = sample.integral();

    let guess = match model {
        ModelKind::Gaussian => vec![mean, sigma, norm],
        ModelKind::CrystalBall => vec![SEED_ALPHA, SEED_N, mean, sigma, norm],
        ModelKind::CrystalBallLinear => {
            let intercept = sample.total() / sample.len() as f64;
            vec![SEED_ALPHA, SEED_N, mean, sigma, norm, 0.0, intercept]
        }
    };
    Ok(guess)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn symmetric() -> BinnedSample {
        BinnedSample::new(
            vec![-2.0, -1.0, 0.0, 1.0, 2.0],
            vec![1.0, 5.0, 10.0, 5.0, 1.0],
            vec![-2.5, -1.5, -0.5, 0.5, 1.5, 2.5],
        )
    }

    #[test]
    fn gaussian_seed_uses_moments_and_area() {
        let g = initial_guess(&symmetric(), ModelKind::Gaussian).unwrap();
        assert_eq!(g.len(), 3);
        assert_relative_eq!(g[0], 0.0);
        assert_relative_eq!(g[1], (18.0_f64 / 22.0).sqrt(), max_relative = 1e-12);
        assert_relative_eq!(g[2], 22.0);
    }

    #[test]
    fn area_accounts_for_bin_width() {
        let s = BinnedSample::from_edges(vec![0.0, 0.5, 1.0], vec![4.0, 2.0]);
        let g = initial_guess(&s, ModelKind::Gaussian).unwrap();
        assert_relative_eq!(g[2], 3.0);
    }

    #[test]
    fn crystal_ball_seeds_shape_parameters() {
        let g = initial_guess(&symmetric(), ModelKind::CrystalBall).unwrap();
        assert_eq!(&g[..2], &[SEED_ALPHA, SEED_N]);
        assert_relative_eq!(g[4], 22.0);

        let g = initial_guess(&symmetric(), ModelKind::CrystalBallLinear).unwrap();
        assert_eq!(g.len(), 7);
        assert_eq!(g[5], 0.0);
        assert_relative_eq!(g[6], 22.0 / 5.0);
    }

    #[test]
    fn empty_histogram_has_no_seed() {
        let s = BinnedSample::from_edges(vec![0.0, 1.0, 2.0], vec![0.0, 0.0]);
        assert!(initial_guess(&s, ModelKind::Gaussian).is_err());
    }
}
