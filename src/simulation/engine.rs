// src/simulation/engine.rs
use super::AmplitudeEngine;
use crate::core::{Result, WorldError};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use num_traits::{One, Zero};
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

/// Largest state vector the dense engine agrees to allocate.
const MAX_DENSE_AMPLITUDES: usize = 1 << 26;

/// Dense state-vector engine over wires of arbitrary dimension.
///
/// The global state is a mixed-radix vector: wire 0 is the most significant
/// digit. Memory is proportional to the full Hilbert space, which is why the
/// world only hands it the wires a circuit actually touches.
#[derive(Debug, Clone)]
pub struct DenseEngine {
    /// Dimension of each wire.
    dims: Vec<usize>,
    /// `strides[i]` is the index distance between consecutive values of wire `i`.
    strides: Vec<usize>,
    /// The global amplitude vector, `Π dims` entries.
    amplitudes: Vec<Complex64>,
}

impl DenseEngine {
    /// Initializes the engine at |0...0> for the given wire dimensions.
    pub fn new(dims: &[usize]) -> Result<Self> {
        if let Some(&bad) = dims.iter().find(|&&d| d < 2) {
            return Err(WorldError::InvalidOperation { message: format!("Wire dimension {} is below 2", bad) });
        }
        let total = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .filter(|&t| t <= MAX_DENSE_AMPLITUDES)
            .ok_or_else(|| WorldError::Simulation {
                message: format!("Dense state over dimensions {:?} exceeds {} amplitudes", dims, MAX_DENSE_AMPLITUDES),
            })?;

        let mut strides = vec![1; dims.len()];
        for i in (0..dims.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * dims[i + 1];
        }

        let mut amplitudes = vec![Complex64::zero(); total];
        amplitudes[0] = Complex64::one();
        Ok(Self { dims: dims.to_vec(), strides, amplitudes })
    }

    pub fn num_wires(&self) -> usize {
        self.dims.len()
    }

    /// Read-only access to the global state vector.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// `|amplitude|²` for every basis state.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|c| c.norm_sqr()).collect()
    }

    fn digit(&self, index: usize, wire: usize) -> usize {
        (index / self.strides[wire]) % self.dims[wire]
    }

    fn check_targets(&self, targets: &[usize]) -> Result<()> {
        for (i, &t) in targets.iter().enumerate() {
            if t >= self.dims.len() {
                return Err(WorldError::Simulation {
                    message: format!("Wire {} not found in a {}-wire state", t, self.dims.len()),
                });
            }
            if targets[..i].contains(&t) {
                return Err(WorldError::InvalidOperation { message: format!("Wire {} targeted twice", t) });
            }
        }
        Ok(())
    }
}

impl AmplitudeEngine for DenseEngine {
    /// Applies `unitary` to the subspace spanned by `targets`.
    ///
    /// For every assignment of the untouched wires the amplitudes of the
    /// target subspace are gathered, multiplied and scattered back.
    fn apply(&mut self, unitary: &DMatrix<Complex64>, targets: &[usize]) -> Result<()> {
        self.check_targets(targets)?;
        let sub_dim: usize = targets.iter().map(|&t| self.dims[t]).product();
        if unitary.nrows() != sub_dim || unitary.ncols() != sub_dim {
            return Err(WorldError::DimensionMismatch {
                context: "dense gate matrix".to_string(),
                expected: sub_dim,
                actual: unitary.nrows(),
            });
        }

        // Offset of each target-subspace basis state relative to the base index.
        let offsets: Vec<usize> = (0..sub_dim)
            .map(|sub| {
                let mut rest = sub;
                let mut offset = 0;
                for &t in targets.iter().rev() {
                    offset += (rest % self.dims[t]) * self.strides[t];
                    rest /= self.dims[t];
                }
                offset
            })
            .collect();

        for base in 0..self.amplitudes.len() {
            if targets.iter().any(|&t| self.digit(base, t) != 0) {
                continue;
            }
            let psi = DVector::from_iterator(sub_dim, offsets.iter().map(|o| self.amplitudes[base + o]));
            let evolved = unitary * psi;
            for (o, value) in offsets.iter().zip(evolved.iter()) {
                self.amplitudes[base + o] = *value;
            }
        }
        Ok(())
    }

    fn post_select(&mut self, target: usize, value: u64) -> Result<()> {
        self.check_targets(&[target])?;
        let mut mass = 0.0;
        for index in 0..self.amplitudes.len() {
            if self.digit(index, target) as u64 == value {
                mass += self.amplitudes[index].norm_sqr();
            } else {
                self.amplitudes[index] = Complex64::zero();
            }
        }
        if mass <= 0.0 {
            return Err(WorldError::PostSelectionUnsatisfiable {
                message: format!("wire {} has zero probability of reading {}", target, value),
            });
        }
        let scale = 1.0 / mass.sqrt();
        for amp in self.amplitudes.iter_mut() {
            *amp *= scale;
        }
        Ok(())
    }

    fn sample<R: Rng + ?Sized>(&self, targets: &[usize], repetitions: usize, rng: &mut R) -> Result<Vec<Vec<u64>>> {
        self.check_targets(targets)?;
        let dist = WeightedIndex::new(self.probabilities()).map_err(|e| WorldError::Simulation {
            message: format!("Cannot sample dense state: {}", e),
        })?;
        Ok((0..repetitions)
            .map(|_| {
                let index = dist.sample(rng);
                targets.iter().map(|&t| self.digit(index, t) as u64).collect()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::Gate;
    use crate::validation::check_normalization;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn shift_on_mixed_radix_state() -> Result<()> {
        let mut engine = DenseEngine::new(&[3, 2])?;
        engine.apply(&Gate::shift(3, 2).matrix(), &[0])?;
        engine.apply(&Gate::flip().matrix(), &[1])?;
        // |2,1> sits at 2 * 2 + 1
        assert_eq!(engine.amplitudes()[5], Complex64::one());
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(engine.sample(&[1, 0], 3, &mut rng)?, vec![vec![1, 2]; 3]);
        Ok(())
    }

    #[test]
    fn gate_operand_order_is_respected() -> Result<()> {
        // SWAP on (1, 0) after preparing |1,0>
        let mut engine = DenseEngine::new(&[2, 2])?;
        engine.apply(&Gate::flip().matrix(), &[0])?;
        engine.apply(&Gate::swap(2).matrix(), &[1, 0])?;
        assert_eq!(engine.amplitudes()[1], Complex64::one());
        Ok(())
    }

    #[test]
    fn post_select_renormalizes() -> Result<()> {
        let mut engine = DenseEngine::new(&[2, 2])?;
        engine.apply(&Gate::fourier(2).matrix(), &[0])?;
        engine.apply(&Gate::fourier(2).matrix(), &[1])?;
        engine.post_select(1, 1)?;
        check_normalization(engine.amplitudes(), None)?;
        assert_abs_diff_eq!(engine.probabilities()[1], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(engine.probabilities()[0], 0.0, epsilon = 1e-12);

        let mut collapsed = DenseEngine::new(&[2])?;
        assert!(matches!(collapsed.post_select(0, 1), Err(WorldError::PostSelectionUnsatisfiable { .. })));
        Ok(())
    }

    #[test]
    fn refuses_oversized_states() {
        assert!(matches!(DenseEngine::new(&[2; 40]), Err(WorldError::Simulation { .. })));
        assert!(DenseEngine::new(&[1]).is_err());
    }

    #[test]
    fn rejects_wrong_matrix_and_duplicate_targets() -> Result<()> {
        let mut engine = DenseEngine::new(&[2, 2])?;
        assert!(engine.apply(&Gate::swap(2).matrix(), &[0, 0]).is_err());
        assert!(matches!(
            engine.apply(&Gate::swap(2).matrix(), &[0]),
            Err(WorldError::DimensionMismatch { expected: 2, actual: 4, .. })
        ));
        Ok(())
    }
}
