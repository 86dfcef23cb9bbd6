// src/world/config.rs

use crate::core::{Result, WorldError};
use crate::simulation::Backend;
use serde::{Deserialize, Serialize};

/// Construction-time options of a [`World`](super::World).
///
/// ```
/// use qworld::{Backend, WorldConfig};
///
/// let config = WorldConfig::from_json(r#"{ "backend": "sparse", "seed": 42 }"#).unwrap();
/// assert_eq!(config.backend, Backend::Sparse);
/// assert!(config.compiles_to_qubits());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Engine used by `peek`/`pop`.
    pub backend: Backend,
    /// Map every qudit onto a group of binary cells.
    pub compile_to_qubits: bool,
    /// Seed for the sampling RNG; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl WorldConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sparse backend, entropy seeded.
    pub fn sparse() -> Self {
        Self::default().with_backend(Backend::Sparse)
    }

    /// Dense backend, entropy seeded.
    pub fn dense() -> Self {
        Self::default().with_backend(Backend::Dense)
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_compile_to_qubits(mut self, compile: bool) -> Self {
        self.compile_to_qubits = compile;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Whether objects are laid out on binary cells.
    ///
    /// The sparse engine only understands binary cells, so it always compiles.
    pub fn compiles_to_qubits(&self) -> bool {
        self.compile_to_qubits || self.backend == Backend::Sparse
    }

    /// Parses a configuration; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| WorldError::InvalidOperation {
            message: format!("Invalid world configuration: {}", e),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| WorldError::InvalidOperation {
            message: format!("Cannot serialize world configuration: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_builders() {
        let config = WorldConfig::default();
        assert_eq!(config.backend, Backend::Dense);
        assert!(!config.compiles_to_qubits());
        assert!(WorldConfig::dense().with_compile_to_qubits(true).compiles_to_qubits());
        assert_eq!(WorldConfig::sparse().with_seed(3).seed, Some(3));
    }

    #[test]
    fn json_round_trip() -> Result<()> {
        let config = WorldConfig::dense().with_compile_to_qubits(true).with_seed(9);
        assert_eq!(WorldConfig::from_json(&config.to_json()?)?, config);
        assert_eq!(WorldConfig::from_json("{}")?, WorldConfig::default());
        assert!(WorldConfig::from_json(r#"{ "backend": "tensor" }"#).is_err());
        Ok(())
    }
}
