// src/simulation/sparse.rs

//! Sparse amplitude engine.
//!
//! The state is a list of `(label, amplitude)` pairs where a label is the
//! joint basis state of every binary cell, one bit per cell. Only labels with
//! non-negligible amplitude are tracked, so a state that mid-game measurements
//! have pruned down costs memory proportional to its support rather than to
//! `2^cells`.

use super::AmplitudeEngine;
use crate::core::{Result, WorldError};
use nalgebra::DMatrix;
use num_bigint::BigUint;
use num_complex::Complex64;
use num_traits::{One, Zero};
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use std::collections::HashMap;

/// Amplitudes with magnitude at or below this are dropped after a gate.
pub const EPSILON: f64 = 1e-14;

/// Parallel label/amplitude lists. Labels are pairwise distinct.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseState {
    labels: Vec<BigUint>,
    amplitudes: Vec<Complex64>,
}

impl SparseState {
    /// The all-zero basis state.
    pub fn zero() -> Self {
        Self { labels: vec![BigUint::zero()], amplitudes: vec![Complex64::one()] }
    }

    pub fn labels(&self) -> &[BigUint] {
        &self.labels
    }

    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Number of tracked basis labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(|a| a.norm_sqr()).sum()
    }

    /// `(label, |amplitude|²)` for every tracked label.
    pub fn probabilities(&self) -> impl Iterator<Item = (&BigUint, f64)> {
        self.labels.iter().zip(self.amplitudes.iter().map(|a| a.norm_sqr()))
    }
}

/// Gate application, post-selective pruning and sampling over binary cells.
#[derive(Debug, Clone)]
pub struct SparseEngine {
    num_cells: usize,
    state: SparseState,
}

fn is_bit_flip(unitary: &DMatrix<Complex64>) -> bool {
    unitary.shape() == (2, 2)
        && unitary[(0, 0)] == Complex64::zero()
        && unitary[(1, 1)] == Complex64::zero()
        && unitary[(0, 1)] == Complex64::one()
        && unitary[(1, 0)] == Complex64::one()
}

impl SparseEngine {
    /// Starts `num_cells` cells in the all-zero label.
    pub fn new(num_cells: usize) -> Self {
        Self { num_cells, state: SparseState::zero() }
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    pub fn state(&self) -> &SparseState {
        &self.state
    }

    fn check_cells(&self, cells: &[usize]) -> Result<()> {
        for (i, &c) in cells.iter().enumerate() {
            if c >= self.num_cells {
                return Err(WorldError::Simulation {
                    message: format!("Cell {} not found among {} cells", c, self.num_cells),
                });
            }
            if cells[..i].contains(&c) {
                return Err(WorldError::InvalidOperation { message: format!("Cell {} targeted twice", c) });
            }
        }
        Ok(())
    }

    /// Flips one cell in every label.
    pub fn flip(&mut self, cell: usize) -> Result<()> {
        self.check_cells(&[cell])?;
        let bit = cell as u64;
        for label in self.state.labels.iter_mut() {
            let current = label.bit(bit);
            label.set_bit(bit, !current);
        }
        Ok(())
    }
}

impl AmplitudeEngine for SparseEngine {
    /// Applies `unitary` to `target_cells` (first cell is the most significant bit of the matrix index).
    ///
    /// Labels are split into the bit pattern over the targets (a row) and the
    /// remaining bits (a column). The grouped amplitudes form a dense
    /// `2^k × columns` matrix which is left-multiplied by the unitary and
    /// expanded back, dropping entries at or below [`EPSILON`].
    fn apply(&mut self, unitary: &DMatrix<Complex64>, target_cells: &[usize]) -> Result<()> {
        self.check_cells(target_cells)?;
        let k = target_cells.len();
        let rows = 1usize.checked_shl(k as u32).ok_or_else(|| WorldError::Simulation {
            message: format!("Gate on {} cells is too wide", k),
        })?;
        if unitary.nrows() != rows || unitary.ncols() != rows {
            return Err(WorldError::DimensionMismatch {
                context: "sparse gate matrix".to_string(),
                expected: rows,
                actual: unitary.nrows(),
            });
        }
        if k == 1 && is_bit_flip(unitary) {
            return self.flip(target_cells[0]);
        }

        let bits: Vec<u64> = target_cells.iter().map(|&c| c as u64).collect();
        let mut column_of: HashMap<BigUint, usize> = HashMap::new();
        let mut remainders: Vec<BigUint> = Vec::new();
        let mut placed: Vec<(usize, usize, Complex64)> = Vec::with_capacity(self.state.len());

        for (label, amp) in self.state.labels.iter().zip(&self.state.amplitudes) {
            let mut row = 0;
            let mut rest = label.clone();
            for (j, &bit) in bits.iter().enumerate() {
                if label.bit(bit) {
                    row |= 1 << (k - 1 - j);
                    rest.set_bit(bit, false);
                }
            }
            let col = *column_of.entry(rest).or_insert_with_key(|rest| {
                remainders.push(rest.clone());
                remainders.len() - 1
            });
            placed.push((row, col, *amp));
        }

        let mut grouped = DMatrix::<Complex64>::zeros(rows, remainders.len());
        for (row, col, amp) in placed {
            grouped[(row, col)] += amp;
        }
        let evolved = unitary * grouped;

        let mut labels = Vec::new();
        let mut amplitudes = Vec::new();
        for (col, rest) in remainders.iter().enumerate() {
            for row in 0..rows {
                let amp = evolved[(row, col)];
                if amp.norm() <= EPSILON {
                    continue;
                }
                let mut label = rest.clone();
                for (j, &bit) in bits.iter().enumerate() {
                    if (row >> (k - 1 - j)) & 1 == 1 {
                        label.set_bit(bit, true);
                    }
                }
                labels.push(label);
                amplitudes.push(amp);
            }
        }
        self.state = SparseState { labels, amplitudes };
        Ok(())
    }

    /// Keeps only labels whose `cell` bit equals `value`, then renormalizes.
    fn post_select(&mut self, cell: usize, value: u64) -> Result<()> {
        self.check_cells(&[cell])?;
        let want = value != 0;
        let (labels, amplitudes): (Vec<BigUint>, Vec<Complex64>) = self
            .state
            .labels
            .iter()
            .zip(&self.state.amplitudes)
            .filter(|(label, _)| label.bit(cell as u64) == want)
            .map(|(label, amp)| (label.clone(), *amp))
            .unzip();

        let mass: f64 = amplitudes.iter().map(|a| a.norm_sqr()).sum();
        if labels.is_empty() || mass == 0.0 {
            return Err(WorldError::PostSelectionUnsatisfiable {
                message: format!("no basis state has cell {} equal to {}", cell, value),
            });
        }
        let scale = 1.0 / mass.sqrt();
        self.state = SparseState { labels, amplitudes: amplitudes.into_iter().map(|a| a * scale).collect() };
        Ok(())
    }

    /// Draws `repetitions` labels with probability `|amplitude|²` and reads the requested cells.
    fn sample<R: Rng + ?Sized>(&self, cells: &[usize], repetitions: usize, rng: &mut R) -> Result<Vec<Vec<u64>>> {
        self.check_cells(cells)?;
        let dist = WeightedIndex::new(self.state.amplitudes.iter().map(|a| a.norm_sqr())).map_err(|e| {
            WorldError::Simulation { message: format!("Cannot sample sparse state: {}", e) }
        })?;
        Ok((0..repetitions)
            .map(|_| {
                let label = &self.state.labels[dist.sample(rng)];
                cells.iter().map(|&c| u64::from(label.bit(c as u64))).collect()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::Gate;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn label(bits: &[usize]) -> BigUint {
        let mut l = BigUint::zero();
        for &b in bits {
            l.set_bit(b as u64, true);
        }
        l
    }

    #[test]
    fn flip_is_xor_on_every_label() -> Result<()> {
        let mut engine = SparseEngine::new(3);
        engine.apply(&Gate::fourier(2).matrix(), &[0])?;
        engine.apply(&Gate::flip().matrix(), &[2])?;
        let mut labels = engine.state().labels().to_vec();
        labels.sort();
        assert_eq!(labels, vec![label(&[2]), label(&[0, 2])]);
        Ok(())
    }

    #[test]
    fn interference_prunes_cancelled_labels() -> Result<()> {
        let mut engine = SparseEngine::new(2);
        engine.apply(&Gate::fourier(2).matrix(), &[1])?;
        assert_eq!(engine.state().len(), 2);
        engine.apply(&Gate::fourier(2).matrix(), &[1])?;
        assert_eq!(engine.state().labels(), &[BigUint::zero()]);
        assert_abs_diff_eq!(engine.state().norm_sqr(), 1.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn multi_cell_gate_uses_operand_order() -> Result<()> {
        // |cell0 = 1, cell1 = 0>, swap written as (cell1, cell0)
        let mut engine = SparseEngine::new(2);
        engine.flip(0)?;
        engine.apply(&Gate::swap(2).matrix(), &[1, 0])?;
        assert_eq!(engine.state().labels(), &[label(&[1])]);
        Ok(())
    }

    #[test]
    fn labels_wider_than_a_machine_word() -> Result<()> {
        let mut engine = SparseEngine::new(200);
        engine.flip(150)?;
        engine.apply(&Gate::fourier(2).matrix(), &[199])?;
        let mut rng = StdRng::seed_from_u64(11);
        let shots = engine.sample(&[150, 199], 200, &mut rng)?;
        assert!(shots.iter().all(|s| s[0] == 1));
        assert!(shots.iter().any(|s| s[1] == 0));
        assert!(shots.iter().any(|s| s[1] == 1));
        Ok(())
    }

    #[test]
    fn post_select_renormalizes_and_fails_on_empty_support() -> Result<()> {
        let mut engine = SparseEngine::new(2);
        engine.apply(&Gate::fourier(2).matrix(), &[0])?;
        engine.apply(&Gate::fourier(2).matrix(), &[1])?;
        engine.post_select(0, 1)?;
        assert_eq!(engine.state().len(), 2);
        assert_abs_diff_eq!(engine.state().norm_sqr(), 1.0, epsilon = 1e-12);
        for (l, p) in engine.state().probabilities() {
            assert!(l.bit(0));
            assert_abs_diff_eq!(p, 0.5, epsilon = 1e-12);
        }

        let mut fixed = SparseEngine::new(1);
        assert!(matches!(fixed.post_select(0, 1), Err(WorldError::PostSelectionUnsatisfiable { .. })));
        Ok(())
    }

    #[test]
    fn sampling_follows_amplitudes() -> Result<()> {
        // Ry rotation putting 0.2 probability on |1>
        let (c, s) = (0.8f64.sqrt(), 0.2f64.sqrt());
        let ry = DMatrix::from_row_slice(
            2,
            2,
            &[Complex64::new(c, 0.0), Complex64::new(-s, 0.0), Complex64::new(s, 0.0), Complex64::new(c, 0.0)],
        );
        let mut engine = SparseEngine::new(1);
        engine.apply(&ry, &[0])?;
        let mut rng = StdRng::seed_from_u64(3);
        let ones = engine.sample(&[0], 10_000, &mut rng)?.iter().filter(|s| s[0] == 1).count();
        assert!((1_700..2_300).contains(&ones), "got {} ones", ones);
        Ok(())
    }

    #[test]
    fn bad_targets_are_rejected() {
        let mut engine = SparseEngine::new(2);
        assert!(engine.apply(&Gate::flip().matrix(), &[5]).is_err());
        assert!(engine.apply(&Gate::swap(2).matrix(), &[1, 1]).is_err());
        assert!(matches!(
            engine.apply(&Gate::swap(2).matrix(), &[1]),
            Err(WorldError::DimensionMismatch { .. })
        ));
    }
}
