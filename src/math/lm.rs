//! Levenberg–Marquardt nonlinear least squares.
//!
//! Minimizes `Σ (y_i - f_i(p))²` for a model `f` evaluated at fixed abscissae.
//! The implementation follows the classic MINPACK-style loop:
//!
//! - forward-difference Jacobian of the model
//! - Marquardt scaling `D = diag(max column norms seen so far)`
//! - damped step from the stacked system `[J; sqrt(λ) D] δ = [r; 0]`
//! - `λ ÷ 10` on an accepted step, `λ × 10` on a rejected one
//!
//! A trial point whose residuals are not finite counts as a rejected step, so
//! models that return NaN for invalid parameters steer the solver back into the
//! valid region instead of aborting the fit.
//!
//! Parameters are unconstrained.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace};

use crate::domain::SolverSettings;
use crate::error::FitError;
use crate::math::{solve_least_squares, vstack};

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-15;
const LAMBDA_MAX: f64 = 1e32;

/// Which stopping rule ended the iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// Relative reduction of the sum of squares fell below `ftol`.
    CostReduction,
    /// Relative step size fell below `xtol`.
    StepSize,
    /// Gradient max-norm fell below `gtol` (includes exact fits).
    Gradient,
}

/// Solver output at the accepted minimum.
#[derive(Debug, Clone)]
pub struct LmOutcome {
    pub params: Vec<f64>,
    /// Model Jacobian `∂f/∂p` at `params`.
    pub jacobian: DMatrix<f64>,
    /// `y - f(params)`.
    pub residuals: DVector<f64>,
    pub sse: f64,
    pub iterations: usize,
    pub convergence: Convergence,
}

/// Fit `model` to `y` starting from `p0`.
///
/// `model` maps a parameter vector to predictions, one per observation.
pub fn levenberg_marquardt<F>(
    model: F,
    y: &[f64],
    p0: &[f64],
    settings: &SolverSettings,
) -> Result<LmOutcome, FitError>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let n = y.len();
    let k = p0.len();
    if k == 0 || n < k {
        return Err(FitError::InsufficientData {
            expected: k.max(1),
            actual: n,
        });
    }

    let y = DVector::from_column_slice(y);
    let mut p = DVector::from_column_slice(p0);
    let mut f = model(p.as_slice());
    let mut r = residuals(&y, &f);
    if !r.iter().all(|v| v.is_finite()) {
        return Err(FitError::NonFinite(format!("parameters {p0:?}")));
    }
    let mut cost = r.norm_squared();

    let cap = settings.iteration_cap(k);
    let mut lambda = LAMBDA_INIT;
    let mut diag = DVector::<f64>::zeros(k);

    for iter in 1..=cap {
        let jac = jacobian(&model, p.as_slice(), &f)?;

        for j in 0..k {
            diag[j] = diag[j].max(jac.column(j).norm());
        }
        let scale = diag.map(|d| if d > 0.0 { d } else { 1.0 });

        let grad = jac.transpose() * &r;
        if grad.amax() <= settings.gtol {
            return Ok(outcome(p, jac, r, cost, iter, Convergence::Gradient));
        }

        let mut rhs = DVector::<f64>::zeros(n + k);
        rhs.rows_mut(0, n).copy_from(&r);

        loop {
            let damping = DMatrix::from_diagonal(&(&scale * lambda.sqrt()));
            let Some(delta) = solve_least_squares(&vstack(&jac, &damping), &rhs) else {
                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    return Err(not_converged(iter, "damped system could not be solved"));
                }
                continue;
            };

            let p_norm = scale.component_mul(&p).norm();
            let step_norm = scale.component_mul(&delta).norm();
            let small_step = step_norm <= settings.xtol * (p_norm + settings.xtol);

            let trial = &p + &delta;
            let f_trial = model(trial.as_slice());
            let r_trial = residuals(&y, &f_trial);
            let cost_trial = r_trial.norm_squared();

            if cost_trial.is_finite() && cost_trial < cost {
                let reduction = (cost - cost_trial) / cost;
                trace!("lm iter {iter}: accepted, sse {cost:.6e} -> {cost_trial:.6e}, lambda {lambda:.1e}");
                p = trial;
                f = f_trial;
                r = r_trial;
                cost = cost_trial;
                lambda = (lambda / 10.0).max(LAMBDA_MIN);

                let converged = if reduction <= settings.ftol {
                    Some(Convergence::CostReduction)
                } else if small_step {
                    Some(Convergence::StepSize)
                } else {
                    None
                };
                if let Some(reason) = converged {
                    let jac = jacobian(&model, p.as_slice(), &f)?;
                    debug!("lm converged after {iter} iterations ({reason:?}), sse={cost:.6e}");
                    return Ok(outcome(p, jac, r, cost, iter, reason));
                }
                break;
            }

            lambda *= 10.0;
            if small_step {
                debug!("lm converged after {iter} iterations (StepSize), sse={cost:.6e}");
                return Ok(outcome(p, jac, r, cost, iter, Convergence::StepSize));
            }
            if lambda > LAMBDA_MAX {
                return Err(not_converged(iter, "damping exhausted without reducing the residual"));
            }
        }
    }

    Err(not_converged(cap, "iteration cap reached"))
}

/// Parameter covariance `pinv(JᵀJ) * sse / (n - k)` from the SVD of `J`.
///
/// Singular values at or below `eps * max(n, k) * s_max` mark directions the
/// data cannot resolve. Every parameter with a component along such a
/// direction gets `+inf` in its row and column; the rest come from the
/// pseudo-inverse over the resolved directions. With `n == k` there are no
/// residual degrees of freedom and every entry is `+inf`. A Jacobian with no
/// resolved direction at all is an error.
///
/// Expects `n >= k`.
pub fn covariance(jacobian: &DMatrix<f64>, sse: f64) -> Result<DMatrix<f64>, FitError> {
    let (n, k) = jacobian.shape();
    if !jacobian.iter().all(|v| v.is_finite()) {
        return Err(FitError::NonFinite("Jacobian at the solution".to_string()));
    }

    let svd = jacobian.clone().svd(false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| FitError::NonFinite("SVD of the Jacobian".to_string()))?;
    let s = &svd.singular_values;

    let threshold = f64::EPSILON * n.max(k) as f64 * s.max();
    let rank = s.iter().filter(|&&v| v > threshold).count();
    if rank == 0 {
        return Err(FitError::SingularJacobian { rank, params: k });
    }

    if n == k {
        return Ok(DMatrix::from_element(k, k, f64::INFINITY));
    }

    let unresolved = unresolved_params(&v_t, s.as_slice(), threshold);
    if !unresolved.is_empty() {
        debug!("Jacobian rank {rank} < {k}; unresolved parameters {unresolved:?}");
    }

    let inv_s2 = DMatrix::from_diagonal(&s.map(|v| if v > threshold { 1.0 / (v * v) } else { 0.0 }));
    let mut cov = v_t.transpose() * inv_s2 * &v_t * (sse / (n - k) as f64);
    for &j in &unresolved {
        cov.row_mut(j).fill(f64::INFINITY);
        cov.column_mut(j).fill(f64::INFINITY);
    }
    Ok(cov)
}

/// Indices of parameters with a non-negligible weight in the null space.
fn unresolved_params(v_t: &DMatrix<f64>, singular_values: &[f64], threshold: f64) -> Vec<usize> {
    let tol = f64::EPSILON.sqrt();
    (0..v_t.ncols())
        .filter(|&j| {
            singular_values
                .iter()
                .enumerate()
                .any(|(r, &sv)| sv <= threshold && v_t[(r, j)].abs() > tol)
        })
        .collect()
}

/// Forward-difference Jacobian `∂f/∂p` with step `sqrt(eps) * max(|p_j|, 1)`.
fn jacobian<F>(model: &F, p: &[f64], f0: &[f64]) -> Result<DMatrix<f64>, FitError>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let n = f0.len();
    let k = p.len();
    let mut jac = DMatrix::<f64>::zeros(n, k);
    let mut shifted = p.to_vec();

    for j in 0..k {
        let h = f64::EPSILON.sqrt() * p[j].abs().max(1.0);
        shifted[j] = p[j] + h;
        let f1 = model(&shifted);
        shifted[j] = p[j];

        for i in 0..n {
            jac[(i, j)] = (f1[i] - f0[i]) / h;
        }
    }

    if jac.iter().all(|v| v.is_finite()) {
        Ok(jac)
    } else {
        Err(FitError::NonFinite(format!("Jacobian at parameters {p:?}")))
    }
}

fn residuals(y: &DVector<f64>, f: &[f64]) -> DVector<f64> {
    DVector::from_iterator(y.len(), y.iter().zip(f).map(|(yi, fi)| yi - fi))
}

fn outcome(
    p: DVector<f64>,
    jacobian: DMatrix<f64>,
    residuals: DVector<f64>,
    sse: f64,
    iterations: usize,
    convergence: Convergence,
) -> LmOutcome {
    LmOutcome {
        params: p.iter().copied().collect(),
        jacobian,
        residuals,
        sse,
        iterations,
        convergence,
    }
}

fn not_converged(iterations: usize, reason: &str) -> FitError {
    FitError::NotConverged {
        iterations,
        reason: reason.to_string(),
    }
}
