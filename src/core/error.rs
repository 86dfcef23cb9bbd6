// src/core/error.rs

//! Error handling logic

use std::fmt;
use thiserror::Error;

/// Logical handle of a quantum object inside one world.
///
/// Handles are indices into the world's object table. They are never reused,
/// so a handle keeps naming the same object (live or ancilla) for the whole
/// lifetime of its world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuditId(pub usize);

impl fmt::Display for QuditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Qudit({})", self.0)
    }
}

/// Errors raised by the world, its simulators and the dimension transforms.
///
/// Every variant is detected synchronously at the point of violation. Game
/// logic is expected to recover from [`WorldError::PostSelectionUnsatisfiable`]
/// and [`WorldError::DimensionMismatch`]; the rest indicate programming errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    /// An object with this name is already registered in the world.
    #[error("Duplicate object: '{name}' is already part of this world")]
    DuplicateObject {
        /// The clashing name.
        name: String,
    },

    /// Lookup of a name that was never registered.
    #[error("Unknown object: '{name}'")]
    UnknownObject {
        /// The missing name.
        name: String,
    },

    /// An operand (or a vector/matrix) does not have the size the operation requires.
    #[error("Dimension mismatch for {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being checked (object name, vector, matrix).
        context: String,
        /// Required dimension or length.
        expected: usize,
        /// Supplied dimension or length.
        actual: usize,
    },

    /// An operation was given the wrong number of objects.
    #[error("Arity mismatch for '{gate}': expected {expected} objects, got {actual}")]
    ArityMismatch {
        /// Gate or effect name.
        gate: String,
        /// Required object count.
        expected: usize,
        /// Supplied object count.
        actual: usize,
    },

    /// The object is not attached to this world.
    #[error("Object '{name}' is not attached to this world")]
    UnattachedObject {
        /// Name of the detached object.
        name: String,
    },

    /// `undo_last_effect` was called with nothing to undo.
    #[error("No effects to undo")]
    EmptyHistory,

    /// No outcome consistent with the recorded post-selections could be found.
    #[error("Post-selection unsatisfiable: {message}")]
    PostSelectionUnsatisfiable {
        /// Explanation of where the probability mass ran out.
        message: String,
    },

    /// Two worlds cannot be merged.
    #[error("Incompatible worlds: {message}")]
    IncompatibleWorlds {
        /// Reason for the refusal.
        message: String,
    },

    /// A compiled operation spans objects of different dimensions.
    #[error("Cannot compile '{gate}' acting on mixed dimensions {dimensions:?} to qubits")]
    UnsupportedMixedDimensionCompilation {
        /// Gate name.
        gate: String,
        /// Dimensions of the operands, in order.
        dimensions: Vec<usize>,
    },

    /// A value is outside the `0..dimension` range of its object.
    #[error("Value {value} is out of range for '{name}' (dimension {dimension})")]
    InvalidValue {
        /// Object name.
        name: String,
        /// Offending value.
        value: u64,
        /// Object dimension.
        dimension: usize,
    },

    /// A gate, matrix or call is malformed.
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// InvalidOperation failure message
        message: String,
    },

    /// General error encountered during the simulation process itself.
    #[error("Simulation error: {message}")]
    Simulation {
        /// Simulation failure message
        message: String,
    },
}

impl WorldError {
    /// Whether calling game logic should treat this as a rejected move rather than a bug.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WorldError::PostSelectionUnsatisfiable { .. } | WorldError::DimensionMismatch { .. }
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, WorldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_kinds() {
        let rejected = WorldError::PostSelectionUnsatisfiable { message: "no shots".to_string() };
        let mismatch = WorldError::DimensionMismatch { context: "a".to_string(), expected: 2, actual: 3 };
        assert!(rejected.is_recoverable());
        assert!(mismatch.is_recoverable());
        assert!(!WorldError::EmptyHistory.is_recoverable());
    }

    #[test]
    fn messages_carry_context() {
        let err = WorldError::DuplicateObject { name: "rook".to_string() };
        assert_eq!(err.to_string(), "Duplicate object: 'rook' is already part of this world");
        assert_eq!(QuditId(4).to_string(), "Qudit(4)");
    }
}
