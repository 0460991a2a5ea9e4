//! Linear least squares solver.
//!
//! Each Levenberg–Marquardt iteration solves a damped linear problem of the form:
//!
//! ```text
//! minimize ‖J δ - r‖² + λ ‖D δ‖²
//! ```
//!
//! which is an ordinary least squares problem on the stacked system
//! `[J; sqrt(λ) D] δ = [r; 0]`.
//!
//! Implementation choices:
//! - SVD handles tall systems (more rows than columns) without special casing.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Parameter counts are tiny (3–7 columns), so SVD cost is negligible.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Stack `a` on top of `b` (same column count).
pub fn vstack(a: &DMatrix<f64>, b: &DMatrix<f64>) -> DMatrix<f64> {
    debug_assert_eq!(a.ncols(), b.ncols());
    let mut out = DMatrix::<f64>::zeros(a.nrows() + b.nrows(), a.ncols());
    out.rows_mut(0, a.nrows()).copy_from(a);
    out.rows_mut(a.nrows(), b.nrows()).copy_from(b);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn damped_system_shrinks_the_step() {
        let j = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let r = DVector::from_row_slice(&[2.0, 2.0]);
        let undamped = solve_least_squares(&j, &r).unwrap();

        let damping = DMatrix::from_row_slice(1, 1, &[2.0]);
        let stacked = vstack(&j, &damping);
        let rhs = DVector::from_row_slice(&[2.0, 2.0, 0.0]);
        let damped = solve_least_squares(&stacked, &rhs).unwrap();

        assert!((undamped[0] - 2.0).abs() < 1e-10);
        // (JᵀJ + D²) δ = Jᵀr -> (2 + 4) δ = 4
        assert!((damped[0] - 4.0 / 6.0).abs() < 1e-10);
    }
}
