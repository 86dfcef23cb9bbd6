// src/validation/mod.rs

//! Provides functions to validate amplitude vectors and gate matrices.

use crate::core::{Result, WorldError};
use nalgebra::DMatrix;
use num_complex::Complex64;

// Default tolerance values (can be overridden by caller)
const DEFAULT_NORM_TOLERANCE: f64 = 1e-9;
const DEFAULT_UNITARY_TOLERANCE: f64 = 1e-8;

/// Squared norm of an amplitude sequence.
pub fn norm_sqr(amplitudes: &[Complex64]) -> f64 {
    amplitudes.iter().map(|c| c.norm_sqr()).sum()
}

/// Checks if the state vector is normalized (sum of squared amplitudes ≈ 1.0).
///
/// # Arguments
/// * `amplitudes` - The amplitudes to check.
/// * `tolerance` - Allowed deviation from 1.0 (e.g., 1e-9). Defaults are available.
///
/// # Returns
/// * `Ok(())` if normalized within tolerance.
/// * `Err(WorldError::Simulation)` if normalization fails.
pub fn check_normalization(amplitudes: &[Complex64], tolerance: Option<f64>) -> Result<()> {
    let effective_tolerance = tolerance.unwrap_or(DEFAULT_NORM_TOLERANCE);
    let norm_sq = norm_sqr(amplitudes);
    if (norm_sq - 1.0).abs() > effective_tolerance {
        Err(WorldError::Simulation {
            message: format!("State vector normalization failed. Sum(|c_i|^2) = {} (Deviation > {})", norm_sq, effective_tolerance)
        })
    } else {
        Ok(())
    }
}

/// Checks that `matrix` is square and satisfies `U†U ≈ I`.
///
/// # Returns
/// * `Ok(())` if unitary within tolerance.
/// * `Err(WorldError::InvalidOperation)` otherwise.
pub fn check_unitary(matrix: &DMatrix<Complex64>, tolerance: Option<f64>) -> Result<()> {
    if !matrix.is_square() {
        return Err(WorldError::InvalidOperation {
            message: format!("Matrix of shape {}x{} is not square", matrix.nrows(), matrix.ncols()),
        });
    }
    let effective_tolerance = tolerance.unwrap_or(DEFAULT_UNITARY_TOLERANCE);
    let product = matrix.adjoint() * matrix;
    let identity = DMatrix::<Complex64>::identity(matrix.nrows(), matrix.ncols());
    let deviation = (product - identity).iter().map(|c| c.norm()).fold(0.0, f64::max);
    if deviation > effective_tolerance {
        Err(WorldError::InvalidOperation {
            message: format!("Matrix is not unitary (max |U†U - I| entry = {:.3e})", deviation),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_1_SQRT_2;

    #[test]
    fn normalization() {
        let good = [Complex64::new(FRAC_1_SQRT_2, 0.0), Complex64::new(0.0, FRAC_1_SQRT_2)];
        assert!(check_normalization(&good, None).is_ok());
        let bad = [Complex64::new(1.0, 0.0), Complex64::new(1.0, 0.0)];
        assert!(check_normalization(&bad, None).is_err());
        assert!(check_normalization(&bad, Some(1.5)).is_ok());
    }

    #[test]
    fn unitarity() {
        let r = Complex64::new(FRAC_1_SQRT_2, 0.0);
        let hadamard = DMatrix::from_row_slice(2, 2, &[r, r, r, -r]);
        assert!(check_unitary(&hadamard, None).is_ok());

        let skew = DMatrix::from_row_slice(2, 2, &[r, r, r, r]);
        assert!(check_unitary(&skew, None).is_err());

        let rect = DMatrix::<Complex64>::zeros(2, 3);
        assert!(check_unitary(&rect, None).is_err());
    }
}
