//! Evaluation grids for overlay curves.

use crate::error::FitError;

/// Generate `steps` evenly spaced points between `min` and `max` (inclusive).
///
/// The last point is set to `max` exactly so the grid spans the full range
/// regardless of rounding.
pub fn linspace(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, FitError> {
    if !(min.is_finite() && max.is_finite() && max > min) {
        return Err(FitError::InvalidInput(format!(
            "Invalid evaluation range: min={min}, max={max} (must be finite and max>min)."
        )));
    }
    if steps < 2 {
        return Err(FitError::InvalidInput("Curve points must be >= 2.".to_string()));
    }

    let step = (max - min) / (steps as f64 - 1.0);
    let mut out: Vec<f64> = (0..steps).map(|i| min + step * i as f64).collect();
    out[steps - 1] = max;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_includes_endpoints() {
        let v = linspace(-3.0, 3.0, 1000).unwrap();
        assert_eq!(v.len(), 1000);
        assert_eq!(v[0], -3.0);
        assert_eq!(v[999], 3.0);
        assert!(v.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn linspace_rejects_bad_ranges() {
        assert!(linspace(1.0, 1.0, 10).is_err());
        assert!(linspace(2.0, 1.0, 10).is_err());
        assert!(linspace(f64::NAN, 1.0, 10).is_err());
        assert!(linspace(0.0, 1.0, 1).is_err());
    }
}
