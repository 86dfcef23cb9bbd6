// src/simulation/mod.rs

//! Replays a `qworld::circuits::Circuit` on one of two amplitude engines.
//! This module contains the `Simulator` entry point, the dense engine and
//! the sparse engine, both driven through the [`AmplitudeEngine`] seam.

pub mod engine;
mod results;
pub mod sparse;

pub use engine::DenseEngine;
pub use results::SimulationResult;
pub use sparse::{SparseEngine, SparseState};

use crate::circuits::Circuit;
use crate::core::{Result, WorldError};
use crate::operations::Operation;
use crate::validation::check_normalization;
use log::trace;
use nalgebra::DMatrix;
use num_complex::Complex64;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which engine a world simulates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Sparse label/amplitude lists over binary cells, pruned eagerly.
    Sparse,
    /// Full state vector over native qudit wires; post-selection by rejection.
    #[default]
    Dense,
}

/// Operations every amplitude engine supports.
pub trait AmplitudeEngine {
    /// Applies a unitary to the given targets (first target = most significant digit).
    fn apply(&mut self, unitary: &DMatrix<Complex64>, targets: &[usize]) -> Result<()>;

    /// Projects onto `target == value` and renormalizes.
    fn post_select(&mut self, target: usize, value: u64) -> Result<()>;

    /// Draws `repetitions` independent shots of the given targets.
    fn sample<R: Rng + ?Sized>(&self, targets: &[usize], repetitions: usize, rng: &mut R) -> Result<Vec<Vec<u64>>>;
}

#[derive(Debug, Clone)]
enum Prepared {
    Sparse(SparseEngine),
    Dense(DenseEngine),
}

/// A circuit replayed once, ready to be sampled any number of times.
#[derive(Debug, Clone)]
pub struct PreparedState {
    engine: Prepared,
    /// Circuit wires the engine tracks, in engine order.
    active: Vec<usize>,
}

impl PreparedState {
    fn local(&self, wire: usize) -> Result<usize> {
        self.active.binary_search(&wire).map_err(|_| WorldError::Simulation {
            message: format!("Wire {} was not prepared for measurement", wire),
        })
    }

    /// Number of wires the engine actually tracks.
    pub fn num_active_wires(&self) -> usize {
        self.active.len()
    }

    /// Number of basis states with tracked amplitude.
    pub fn support_size(&self) -> usize {
        match &self.engine {
            Prepared::Sparse(e) => e.state().len(),
            Prepared::Dense(e) => e.amplitudes().iter().filter(|a| a.norm_sqr() > 0.0).count(),
        }
    }

    /// Draws `repetitions` shots of `wires`.
    pub fn sample<R: Rng + ?Sized>(&self, wires: &[usize], repetitions: usize, rng: &mut R) -> Result<SimulationResult> {
        let locals = wires.iter().map(|&w| self.local(w)).collect::<Result<Vec<_>>>()?;
        let shots = match &self.engine {
            Prepared::Sparse(e) => e.sample(&locals, repetitions, rng)?,
            Prepared::Dense(e) => e.sample(&locals, repetitions, rng)?,
        };
        Ok(SimulationResult::new(wires.to_vec(), shots))
    }
}

/// The main simulator orchestrating the execution of circuits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Simulator {
    backend: Backend,
}

impl Simulator {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Replays `circuit` and returns the resulting state.
    ///
    /// Only wires touched by an operation or listed in `measured` are
    /// simulated; every other wire is known to be |0> and is skipped.
    ///
    /// # Arguments
    /// * `circuit` - The log to replay.
    /// * `wire_dims` - Dimension of every circuit wire.
    /// * `measured` - Wires that will be sampled afterwards.
    pub fn prepare(&self, circuit: &Circuit, wire_dims: &[usize], measured: &[usize]) -> Result<PreparedState> {
        if wire_dims.len() != circuit.num_wires() {
            return Err(WorldError::DimensionMismatch {
                context: "wire dimension table".to_string(),
                expected: circuit.num_wires(),
                actual: wire_dims.len(),
            });
        }
        let ops: Vec<Operation> = circuit.resolved_operations().collect();
        let mut active: BTreeSet<usize> = measured.iter().copied().collect();
        for op in &ops {
            active.extend(op.involved_labels());
        }
        let active: Vec<usize> = active.into_iter().collect();
        if let Some(&bad) = active.iter().find(|&&w| w >= wire_dims.len()) {
            return Err(WorldError::Simulation { message: format!("Wire {} does not exist", bad) });
        }
        let dims: Vec<usize> = active.iter().map(|&w| wire_dims[w]).collect();
        trace!("preparing {} operations on {} active wires ({:?})", ops.len(), active.len(), self.backend);

        let mut prepared = PreparedState {
            engine: match self.backend {
                Backend::Sparse => {
                    if let Some(d) = dims.iter().find(|&&d| d != 2) {
                        return Err(WorldError::Simulation {
                            message: format!("Sparse backend only tracks binary cells, found a wire of dimension {}", d),
                        });
                    }
                    Prepared::Sparse(SparseEngine::new(dims.len()))
                }
                Backend::Dense => Prepared::Dense(DenseEngine::new(&dims)?),
            },
            active,
        };

        for op in ops {
            match op {
                Operation::Apply { gate, labels } => {
                    let locals = labels.iter().map(|&w| prepared.local(w)).collect::<Result<Vec<_>>>()?;
                    let matrix = gate.matrix();
                    match &mut prepared.engine {
                        Prepared::Sparse(e) => e.apply(&matrix, &locals)?,
                        Prepared::Dense(e) => e.apply(&matrix, &locals)?,
                    }
                }
                Operation::PostSelect { label, value } => {
                    let local = prepared.local(label)?;
                    match &mut prepared.engine {
                        Prepared::Sparse(e) => e.post_select(local, value)?,
                        Prepared::Dense(e) => e.post_select(local, value)?,
                    }
                }
            }
        }
        let amplitudes = match &prepared.engine {
            Prepared::Sparse(e) => e.state().amplitudes(),
            Prepared::Dense(e) => e.amplitudes(),
        };
        check_normalization(amplitudes, None)?;
        Ok(prepared)
    }

    /// Replays `circuit` and samples `measured` `repetitions` times.
    pub fn run<R: Rng + ?Sized>(
        &self,
        circuit: &Circuit,
        wire_dims: &[usize],
        measured: &[usize],
        repetitions: usize,
        rng: &mut R,
    ) -> Result<SimulationResult> {
        self.prepare(circuit, wire_dims, measured)?.sample(measured, repetitions, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuits::CircuitBuilder;
    use crate::operations::Gate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_empty_circuit() -> Result<()> {
        let circuit = CircuitBuilder::new(2).build()?;
        let mut rng = StdRng::seed_from_u64(1);
        for backend in [Backend::Sparse, Backend::Dense] {
            let result = Simulator::new(backend).run(&circuit, &[2, 2], &[0, 1], 10, &mut rng)?;
            assert_eq!(result.shots(), vec![vec![0, 0]; 10].as_slice());
        }
        Ok(())
    }

    #[test]
    fn both_backends_agree_on_entangled_pairs() -> Result<()> {
        let cnot = Gate::unitary("CNOT", vec![2, 2], {
            let mut m = nalgebra::DMatrix::<Complex64>::identity(4, 4);
            m.swap_rows(2, 3);
            m
        })?;
        let circuit = CircuitBuilder::new(3).apply(Gate::fourier(2), &[2]).apply(cnot, &[2, 0]).build()?;
        let mut rng = StdRng::seed_from_u64(5);
        for backend in [Backend::Sparse, Backend::Dense] {
            let result = Simulator::new(backend).run(&circuit, &[2, 2, 2], &[0, 2], 200, &mut rng)?;
            assert!(result.shots().iter().all(|s| s[0] == s[1]), "{:?}", backend);
            let counts = result.histogram(0).unwrap_or_default();
            assert_eq!(counts.len(), 2, "{:?}\n{}", backend, result);
        }
        Ok(())
    }

    #[test]
    fn untouched_wires_are_not_simulated() -> Result<()> {
        let circuit = CircuitBuilder::new(60).apply(Gate::flip(), &[42]).build()?;
        let dims = vec![2; 60];
        let prepared = Simulator::new(Backend::Dense).prepare(&circuit, &dims, &[7])?;
        assert_eq!(prepared.num_active_wires(), 2);
        let mut rng = StdRng::seed_from_u64(2);
        let result = prepared.sample(&[42, 7], 5, &mut rng)?;
        assert_eq!(result.measurements(42), Some(vec![1; 5]));
        assert_eq!(result.measurements(7), Some(vec![0; 5]));
        assert!(prepared.sample(&[3], 1, &mut rng).is_err());
        Ok(())
    }

    #[test]
    fn sparse_backend_prunes_at_post_selection() -> Result<()> {
        let circuit = CircuitBuilder::new(2)
            .apply(Gate::fourier(2), &[0])
            .apply(Gate::fourier(2), &[1])
            .post_select(0, 1)
            .build()?;
        let prepared = Simulator::new(Backend::Sparse).prepare(&circuit, &[2, 2], &[0])?;
        assert_eq!(prepared.support_size(), 2);
        let mut rng = StdRng::seed_from_u64(9);
        assert!(prepared.sample(&[0], 50, &mut rng)?.shots().iter().all(|s| s[0] == 1));
        Ok(())
    }

    #[test]
    fn sparse_backend_rejects_qudit_wires() -> Result<()> {
        let circuit = CircuitBuilder::new(1).apply(Gate::shift(3, 1), &[0]).build()?;
        let err = Simulator::new(Backend::Sparse).prepare(&circuit, &[3], &[0]).unwrap_err();
        assert!(matches!(err, WorldError::Simulation { .. }));
        let mut rng = StdRng::seed_from_u64(4);
        let dense = Simulator::new(Backend::Dense).run(&circuit, &[3], &[0], 3, &mut rng)?;
        assert_eq!(dense.measurements(0), Some(vec![1; 3]));
        Ok(())
    }

    #[test]
    fn backend_names_serialize_in_snake_case() {
        assert_eq!(serde_json::to_string(&Backend::Sparse).ok(), Some("\"sparse\"".to_string()));
        assert_eq!(Backend::default(), Backend::Dense);
    }
}
