// src/world/effect.rs

//! Effects: gates bound to the objects they act on.

use super::World;
use crate::core::{QuantumObject, Result, WorldError};
use crate::operations::Gate;

/// A gate together with its ordered operands.
#[derive(Debug, Clone)]
pub struct Effect {
    gate: Gate,
    objects: Vec<QuantumObject>,
}

impl Effect {
    /// Binds `gate` to `objects`, checking arity, per-operand dimension and attachment.
    pub fn new(gate: Gate, objects: &[&QuantumObject]) -> Result<Self> {
        if gate.num_objects() != objects.len() {
            return Err(WorldError::ArityMismatch {
                gate: gate.name().to_string(),
                expected: gate.num_objects(),
                actual: objects.len(),
            });
        }
        for (obj, &d) in objects.iter().zip(gate.qid_shape()) {
            if obj.dimension() != d {
                return Err(WorldError::DimensionMismatch {
                    context: format!("operand '{}' of '{}'", obj.name(), gate.name()),
                    expected: d,
                    actual: obj.dimension(),
                });
            }
            if !obj.is_attached() {
                return Err(WorldError::UnattachedObject { name: obj.name().to_string() });
            }
        }
        Ok(Self { gate, objects: objects.iter().map(|&o| o.clone()).collect() })
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    pub fn objects(&self) -> &[QuantumObject] {
        &self.objects
    }
}

/// Whether a game move produced any quantum effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectOutcome {
    Applied,
    /// The move was legal to ask for but did nothing; `reason` is for the player.
    NotApplied {
        reason: String,
    },
}

impl EffectOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EffectOutcome::Applied)
    }
}

/// Something game rules can do to a list of objects.
///
/// Implementors describe the gates; [`World::apply`] validates the operands,
/// asks [`QuantumEffect::precondition`] whether the move applies, and records
/// the result as one undoable effect.
pub trait QuantumEffect {
    /// Name used in error messages.
    fn name(&self) -> String;

    /// Required object count, if fixed.
    fn num_objects(&self) -> Option<usize> {
        None
    }

    /// Required dimension of every object, if fixed.
    fn num_dimension(&self) -> Option<usize> {
        None
    }

    /// `Some(reason)` when the move has nothing to act on in the current world.
    fn precondition(&self, _world: &mut World, _objects: &[&QuantumObject]) -> Result<Option<String>> {
        Ok(None)
    }

    /// The effects to append.
    fn effect(&self, objects: &[&QuantumObject]) -> Result<Vec<Effect>>;
}

impl QuantumEffect for Gate {
    fn name(&self) -> String {
        self.name().to_string()
    }

    fn num_objects(&self) -> Option<usize> {
        Some(Gate::num_objects(self))
    }

    fn num_dimension(&self) -> Option<usize> {
        self.dimension()
    }

    fn effect(&self, objects: &[&QuantumObject]) -> Result<Vec<Effect>> {
        Ok(vec![Effect::new(self.clone(), objects)?])
    }
}
