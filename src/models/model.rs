//! Model evaluation for Gaussian / Crystal Ball / Crystal Ball + linear.
//!
//! All functions are vectorized over `x` and never panic on bad parameters:
//! invalid Crystal Ball parameters yield an all-NaN vector, and the power-law
//! tail is masked to zero where it would take a non-positive base.

use std::f64::consts::PI;

use crate::domain::ModelKind;

/// Gaussian density scaled to area `norm`:
/// `norm * exp(-0.5 * ((x - mean) / sigma)^2) / (sigma * sqrt(2π))`.
pub fn gaussian(x: &[f64], mean: f64, sigma: f64, norm: f64) -> Vec<f64> {
    x.iter().map(|&xi| gaussian_at(xi, mean, sigma, norm)).collect()
}

/// Scalar form of [`gaussian`].
pub fn gaussian_at(x: f64, mean: f64, sigma: f64, norm: f64) -> f64 {
    let exponent = -0.5 * ((x - mean) / sigma).powi(2);
    exponent.exp() * norm / (sigma * (2.0 * PI).sqrt())
}

/// Crystal Ball function: Gaussian core with a power-law tail on the low side.
///
/// With `z = (x - mean) / sigma` and `a = |alpha|`:
///
/// - `z > -a`: `exp(-z²/2)`
/// - otherwise: `A * (B - z)^(-n)` where `A = (n/a)^n exp(-a²/2)`,
///   `B = n/a - a`, or `0` when `B - z <= 0`
///
/// The piecewise value is scaled by `norm`. Returns all-NaN when `a == 0`,
/// `n <= 0` or `sigma <= 0`; the whole vector is marked, not single points.
pub fn crystal_ball(x: &[f64], alpha: f64, n: f64, mean: f64, sigma: f64, norm: f64) -> Vec<f64> {
    let abs_alpha = alpha.abs();
    // Negated form so NaN parameters also hit the guard.
    if !(abs_alpha != 0.0 && n > 0.0 && sigma > 0.0) {
        return vec![f64::NAN; x.len()];
    }

    let a = (n / abs_alpha).powf(n) * (-abs_alpha * abs_alpha / 2.0).exp();
    let b = n / abs_alpha - abs_alpha;

    x.iter()
        .map(|&xi| {
            let z = (xi - mean) / sigma;
            let value = if z > -abs_alpha {
                (-z * z / 2.0).exp()
            } else {
                let tail_arg = b - z;
                if tail_arg > 0.0 { a * tail_arg.powf(-n) } else { 0.0 }
            };
            norm * nan_to_num(value)
        })
        .collect()
}

/// Crystal Ball plus a linear background `m * x + b`.
#[allow(clippy::too_many_arguments)]
pub fn crystal_ball_linear(
    x: &[f64],
    alpha: f64,
    n: f64,
    mean: f64,
    sigma: f64,
    norm: f64,
    m: f64,
    b: f64,
) -> Vec<f64> {
    crystal_ball(x, alpha, n, mean, sigma, norm)
        .into_iter()
        .zip(x)
        .map(|(cb, &xi)| cb + m * xi + b)
        .collect()
}

/// Evaluate `model` at every `x` with a parameter vector in solver order.
///
/// # Panics
/// Panics if `params.len() != model.param_count()`. Callers size the vector
/// from the model kind.
pub fn evaluate(model: ModelKind, x: &[f64], params: &[f64]) -> Vec<f64> {
    assert_eq!(
        params.len(),
        model.param_count(),
        "{} expects {} parameters",
        model.display_name(),
        model.param_count()
    );
    match model {
        ModelKind::Gaussian => gaussian(x, params[0], params[1], params[2]),
        ModelKind::CrystalBall => crystal_ball(x, params[0], params[1], params[2], params[3], params[4]),
        ModelKind::CrystalBallLinear => crystal_ball_linear(
            x, params[0], params[1], params[2], params[3], params[4], params[5], params[6],
        ),
    }
}

/// NaN to zero, infinities to the largest finite values.
fn nan_to_num(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else if v == f64::INFINITY {
        f64::MAX
    } else if v == f64::NEG_INFINITY {
        f64::MIN
    } else {
        v
    }
}
