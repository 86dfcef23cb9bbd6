// src/operations/mod.rs

//! Gate descriptions and the instructions a circuit is made of.
//!
//! Game rules produce [`Gate`]s; the world rewrites them into
//! [`Operation`]s addressed to circuit labels. Gates are data only: the
//! matrices are built on demand and shared between copies.

use crate::core::{Result, WorldError};
use crate::transform::{embed_unitary, num_cells};
use crate::validation::check_unitary;
use nalgebra::DMatrix;
use num_complex::Complex64;
use num_traits::{One, Zero};
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
enum GateKind {
    /// |k> -> |k + amount mod d>
    Shift(usize),
    Matrix(Arc<DMatrix<Complex64>>),
}

/// A unitary acting on an ordered list of qudits.
///
/// `qid_shape[i]` is the dimension of the i-th operand. The matrix uses the
/// big-endian tensor order: the first operand is the most significant digit.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    name: String,
    qid_shape: Vec<usize>,
    kind: GateKind,
}

impl Gate {
    /// Cyclic increment by `amount` on a single qudit of dimension `dimension`.
    pub fn shift(dimension: usize, amount: usize) -> Self {
        let amount = amount % dimension.max(1);
        let name = if dimension == 2 { "X".to_string() } else { format!("X{}^{}", dimension, amount) };
        Self { name, qid_shape: vec![dimension], kind: GateKind::Shift(amount) }
    }

    /// The binary bit flip.
    pub fn flip() -> Self {
        Self::shift(2, 1)
    }

    /// Discrete Fourier transform on one qudit; the Hadamard gate for `dimension == 2`.
    pub fn fourier(dimension: usize) -> Self {
        let scale = 1.0 / (dimension as f64).sqrt();
        let matrix = DMatrix::from_fn(dimension, dimension, |j, k| {
            Complex64::from_polar(scale, 2.0 * PI * ((j * k) % dimension) as f64 / dimension as f64)
        });
        let name = if dimension == 2 { "H".to_string() } else { format!("F{}", dimension) };
        Self { name, qid_shape: vec![dimension], kind: GateKind::Matrix(Arc::new(matrix)) }
    }

    /// Exchanges the states of two qudits of the same dimension.
    pub fn swap(dimension: usize) -> Self {
        let dim = dimension * dimension;
        let matrix = DMatrix::from_fn(dim, dim, |r, c| {
            let (a, b) = (c / dimension, c % dimension);
            if r == b * dimension + a { Complex64::one() } else { Complex64::zero() }
        });
        Self { name: "SWAP".to_string(), qid_shape: vec![dimension, dimension], kind: GateKind::Matrix(Arc::new(matrix)) }
    }

    /// A custom gate. The matrix must be unitary and sized to the product of `qid_shape`.
    pub fn unitary(name: impl Into<String>, qid_shape: Vec<usize>, matrix: DMatrix<Complex64>) -> Result<Self> {
        let name = name.into();
        if qid_shape.is_empty() || qid_shape.iter().any(|&d| d < 2) {
            return Err(WorldError::InvalidOperation {
                message: format!("Gate '{}' needs at least one operand of dimension >= 2, got {:?}", name, qid_shape),
            });
        }
        let expected: usize = qid_shape.iter().product();
        if matrix.nrows() != expected || matrix.ncols() != expected {
            return Err(WorldError::DimensionMismatch {
                context: format!("matrix of gate '{}'", name),
                expected,
                actual: matrix.nrows().max(matrix.ncols()),
            });
        }
        check_unitary(&matrix, None)?;
        Ok(Self { name, qid_shape, kind: GateKind::Matrix(Arc::new(matrix)) })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dimension of each operand, in order.
    pub fn qid_shape(&self) -> &[usize] {
        &self.qid_shape
    }

    /// Number of qudits the gate acts on.
    pub fn num_objects(&self) -> usize {
        self.qid_shape.len()
    }

    /// The common operand dimension, or `None` for mixed-dimension gates.
    pub fn dimension(&self) -> Option<usize> {
        let first = *self.qid_shape.first()?;
        self.qid_shape.iter().all(|&d| d == first).then_some(first)
    }

    /// The full unitary matrix.
    pub fn matrix(&self) -> DMatrix<Complex64> {
        match &self.kind {
            GateKind::Shift(amount) => {
                let d = self.qid_shape[0];
                DMatrix::from_fn(d, d, |r, c| if r == (c + amount) % d { Complex64::one() } else { Complex64::zero() })
            }
            GateKind::Matrix(m) => m.as_ref().clone(),
        }
    }

    /// Rewrites the gate so it acts on binary cells.
    ///
    /// Each operand becomes `num_cells(d)` cells; the matrix is padded with
    /// [`embed_unitary`]. Gates over operands of different dimensions cannot
    /// be compiled.
    pub fn compile_to_qubits(&self) -> Result<Gate> {
        let d = self.dimension().ok_or_else(|| WorldError::UnsupportedMixedDimensionCompilation {
            gate: self.name.clone(),
            dimensions: self.qid_shape.clone(),
        })?;
        if d == 2 {
            return Ok(self.clone());
        }
        let n = self.num_objects();
        let embedded = embed_unitary(d, n, &self.matrix())?;
        Ok(Gate {
            name: self.name.clone(),
            qid_shape: vec![2; n * num_cells(d)],
            kind: GateKind::Matrix(Arc::new(embedded)),
        })
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A single instruction of a circuit, addressed to circuit labels.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Applies a gate; `labels[i]` carries the gate's i-th operand.
    Apply {
        gate: Gate,
        labels: Vec<usize>,
    },
    /// Discards every branch in which the labelled binary cell differs from `value`.
    /// Only emitted for backends that prune eagerly.
    PostSelect {
        label: usize,
        value: u64,
    },
}

impl Operation {
    /// Returns every label the operation touches.
    pub fn involved_labels(&self) -> Vec<usize> {
        match self {
            Operation::Apply { labels, .. } => labels.clone(),
            Operation::PostSelect { label, .. } => vec![*label],
        }
    }

    /// Same operation with each label passed through `f`.
    pub(crate) fn relabeled(&self, f: impl Fn(usize) -> usize) -> Self {
        match self {
            Operation::Apply { gate, labels } => Operation::Apply {
                gate: gate.clone(),
                labels: labels.iter().map(|&l| f(l)).collect(),
            },
            Operation::PostSelect { label, value } => Operation::PostSelect { label: f(*label), value: *value },
        }
    }
}
