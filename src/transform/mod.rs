// src/transform/mod.rs

//! Conversions between a native d-dimensional basis and the padded
//! power-of-two basis used when qudits are compiled onto binary cells.
//!
//! A system of `n` qudits of dimension `d` has `dⁿ` amplitudes. Padding each
//! axis to `p = nearest_power_of_two(d)` gives `pⁿ` amplitudes that can be
//! addressed by `n·log₂ p` binary cells. Every function here is pure.

use crate::core::{Result, WorldError};
use nalgebra::DMatrix;
use num_complex::Complex64;
use num_traits::{One, Zero};

/// Smallest `2^k` that is `>= d`.
pub fn nearest_power_of_two(d: usize) -> usize {
    d.max(1).next_power_of_two()
}

/// Number of binary cells needed to hold one qudit of dimension `d`.
pub fn num_cells(d: usize) -> usize {
    nearest_power_of_two(d).trailing_zeros() as usize
}

fn checked_pow(base: usize, exp: usize) -> Result<usize> {
    u32::try_from(exp)
        .ok()
        .and_then(|e| base.checked_pow(e))
        .ok_or_else(|| WorldError::InvalidOperation {
            message: format!("{}^{} overflows the addressable state size", base, exp),
        })
}

/// Rewrites `index`, read as `n` digits in base `from`, into base `to`.
/// Returns `None` when a digit does not exist in the target base.
fn reindex(index: usize, from: usize, to: usize, n: usize) -> Option<usize> {
    let mut rest = index;
    let mut out = 0;
    let mut scale = 1;
    for _ in 0..n {
        let digit = rest % from;
        rest /= from;
        if digit >= to {
            return None;
        }
        out += digit * scale;
        scale *= to;
    }
    Some(out)
}

fn expect_len(context: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(WorldError::DimensionMismatch { context: context.to_string(), expected, actual });
    }
    Ok(())
}

/// Pads a flat `dⁿ` vector to `pⁿ`, filling every padding position with `fill`.
pub fn embed_state(d: usize, n: usize, vector: &[Complex64], fill: Complex64) -> Result<Vec<Complex64>> {
    let p = nearest_power_of_two(d);
    expect_len("embedded state", checked_pow(d, n)?, vector.len())?;
    let padded = checked_pow(p, n)?;
    Ok((0..padded)
        .map(|idx| reindex(idx, p, d, n).map_or(fill, |src| vector[src]))
        .collect())
}

/// Inverse of [`embed_state`]: drops every padding position.
pub fn project_state(d: usize, n: usize, vector: &[Complex64]) -> Result<Vec<Complex64>> {
    let p = nearest_power_of_two(d);
    expect_len("projected state", checked_pow(p, n)?, vector.len())?;
    let native = checked_pow(d, n)?;
    // Every base-d digit is valid in base p, so reindex never fails here.
    Ok((0..native)
        .map(|src| reindex(src, d, p, n).map_or(Complex64::zero(), |idx| vector[idx]))
        .collect())
}

fn row_major(matrix: &DMatrix<Complex64>) -> Vec<Complex64> {
    let cols = matrix.ncols();
    (0..matrix.nrows() * cols).map(|k| matrix[(k / cols, k % cols)]).collect()
}

/// Embeds a `dⁿ × dⁿ` unitary into the padded `pⁿ × pⁿ` space.
///
/// Padding-only basis states are mapped to themselves, so the result is
/// unitary whenever the input is.
pub fn embed_unitary(d: usize, n: usize, unitary: &DMatrix<Complex64>) -> Result<DMatrix<Complex64>> {
    let native = checked_pow(d, n)?;
    expect_len("unitary rows", native, unitary.nrows())?;
    expect_len("unitary columns", native, unitary.ncols())?;

    let p = nearest_power_of_two(d);
    let padded = checked_pow(p, n)?;
    let flat = embed_state(d, 2 * n, &row_major(unitary), Complex64::zero())?;
    let mut embedded = DMatrix::from_row_slice(padded, padded, &flat);
    for i in (0..padded).filter(|&i| reindex(i, p, d, n).is_none()) {
        embedded[(i, i)] = Complex64::one();
    }
    Ok(embedded)
}

/// Inverse of [`embed_unitary`].
pub fn project_unitary(d: usize, n: usize, matrix: &DMatrix<Complex64>) -> Result<DMatrix<Complex64>> {
    let padded = checked_pow(nearest_power_of_two(d), n)?;
    expect_len("embedded matrix rows", padded, matrix.nrows())?;
    expect_len("embedded matrix columns", padded, matrix.ncols())?;

    let native = checked_pow(d, n)?;
    let flat = project_state(d, 2 * n, &row_major(matrix))?;
    Ok(DMatrix::from_row_slice(native, native, &flat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::check_unitary;
    use approx::assert_abs_diff_eq;

    const CASES: [(usize, usize); 8] = [(2, 1), (2, 2), (3, 1), (3, 2), (4, 2), (5, 1), (3, 3), (6, 2)];

    fn ramp(len: usize) -> Vec<Complex64> {
        (0..len).map(|i| Complex64::new(i as f64 + 1.0, -(i as f64) * 0.5)).collect()
    }

    /// Cyclic shift on each of `n` qudits, built as a permutation matrix.
    fn shift_all(d: usize, n: usize) -> DMatrix<Complex64> {
        let dim = d.pow(n as u32);
        DMatrix::from_fn(dim, dim, |r, c| {
            let mut image = 0;
            let mut scale = 1;
            let mut rest = c;
            for _ in 0..n {
                image += ((rest % d + 1) % d) * scale;
                rest /= d;
                scale *= d;
            }
            if image == r { Complex64::one() } else { Complex64::zero() }
        })
    }

    #[test]
    fn powers_of_two() {
        assert_eq!(nearest_power_of_two(2), 2);
        assert_eq!(nearest_power_of_two(3), 4);
        assert_eq!(nearest_power_of_two(5), 8);
        assert_eq!(nearest_power_of_two(8), 8);
        assert_eq!(num_cells(2), 1);
        assert_eq!(num_cells(3), 2);
        assert_eq!(num_cells(9), 4);
    }

    #[test]
    fn state_round_trip() -> Result<()> {
        for (d, n) in CASES {
            let v = ramp(d.pow(n as u32));
            let embedded = embed_state(d, n, &v, Complex64::zero())?;
            assert_eq!(embedded.len(), nearest_power_of_two(d).pow(n as u32));
            assert_eq!(project_state(d, n, &embedded)?, v, "d={} n={}", d, n);
        }
        Ok(())
    }

    #[test]
    fn qutrit_padding_positions() -> Result<()> {
        let v = vec![Complex64::new(1.0, 0.0), Complex64::new(2.0, 0.0), Complex64::new(3.0, 0.0)];
        let fill = Complex64::new(9.0, 0.0);
        let embedded = embed_state(3, 1, &v, fill)?;
        assert_eq!(embedded, vec![v[0], v[1], v[2], fill]);
        Ok(())
    }

    #[test]
    fn unitary_round_trip_stays_unitary() -> Result<()> {
        for (d, n) in CASES {
            let u = shift_all(d, n);
            let embedded = embed_unitary(d, n, &u)?;
            check_unitary(&embedded, None)?;
            let back = project_unitary(d, n, &embedded)?;
            assert_eq!(back, u, "d={} n={}", d, n);
        }
        Ok(())
    }

    #[test]
    fn embedded_unitary_acts_like_native_one() -> Result<()> {
        let u = shift_all(3, 2);
        let embedded = embed_unitary(3, 2, &u)?;
        let v = ramp(9);
        let native = &u * nalgebra::DVector::from_column_slice(&v);
        let padded = &embedded * nalgebra::DVector::from_column_slice(&embed_state(3, 2, &v, Complex64::zero())?);
        let projected = project_state(3, 2, padded.as_slice())?;
        for (a, b) in projected.iter().zip(native.iter()) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn length_mismatch_is_reported() {
        let err = embed_state(3, 1, &ramp(4), Complex64::zero()).unwrap_err();
        assert_eq!(
            err,
            WorldError::DimensionMismatch { context: "embedded state".to_string(), expected: 3, actual: 4 }
        );
        assert!(project_unitary(3, 1, &DMatrix::identity(3, 3)).is_err());
    }
}
