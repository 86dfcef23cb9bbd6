// src/circuits/mod.rs

//! Defines the append-only operation log of a world.
//!
//! Operations are stored against *labels*. Two tables translate labels to
//! physical wires and back, so exchanging the identities of two wires across
//! the whole history is a constant-time swap of table entries: no stored
//! operation is ever rewritten.

use crate::core::{Result, WorldError};
use crate::operations::{Gate, Operation};
use std::fmt;

/// Ordered sequence of operations plus the label/wire relabeling tables.
#[derive(Clone, PartialEq)]
pub struct Circuit {
    /// The ordered log. Append-only between snapshots.
    operations: Vec<Operation>,
    /// `wire_of_label[l]` is the wire label `l` currently executes on.
    wire_of_label: Vec<usize>,
    /// Inverse table of `wire_of_label`.
    label_of_wire: Vec<usize>,
}

/// Exact copy of the mutable parts of a circuit, used for undo.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitSnapshot {
    len: usize,
    wire_of_label: Vec<usize>,
    label_of_wire: Vec<usize>,
}

impl Circuit {
    /// Creates a new, empty circuit with no wires.
    pub fn new() -> Self {
        Self { operations: Vec::new(), wire_of_label: Vec::new(), label_of_wire: Vec::new() }
    }

    /// Registers a fresh wire; its label starts out equal to its index.
    pub fn add_wire(&mut self) -> usize {
        let wire = self.wire_of_label.len();
        self.wire_of_label.push(wire);
        self.label_of_wire.push(wire);
        wire
    }

    pub fn num_wires(&self) -> usize {
        self.wire_of_label.len()
    }

    /// Label under which new operations on `wire` are recorded, or `None` if the wire does not exist.
    pub fn label_of(&self, wire: usize) -> Option<usize> {
        self.label_of_wire.get(wire).copied()
    }

    /// Wire a stored label currently executes on, or `None` if the label does not exist.
    pub fn wire_of(&self, label: usize) -> Option<usize> {
        self.wire_of_label.get(label).copied()
    }

    fn check_wire(&self, wire: usize) -> Result<()> {
        if wire >= self.num_wires() {
            return Err(WorldError::InvalidOperation {
                message: format!("Wire {} does not exist (circuit has {} wires)", wire, self.num_wires()),
            });
        }
        Ok(())
    }

    /// Appends `gate` acting on the given wires.
    pub fn apply(&mut self, gate: Gate, wires: &[usize]) -> Result<()> {
        if gate.num_objects() != wires.len() {
            return Err(WorldError::ArityMismatch {
                gate: gate.name().to_string(),
                expected: gate.num_objects(),
                actual: wires.len(),
            });
        }
        for &w in wires {
            self.check_wire(w)?;
        }
        let labels = wires.iter().map(|&w| self.label_of_wire[w]).collect();
        self.operations.push(Operation::Apply { gate, labels });
        Ok(())
    }

    /// Appends a post-selection of a binary wire.
    pub fn post_select(&mut self, wire: usize, value: u64) -> Result<()> {
        self.check_wire(wire)?;
        self.operations.push(Operation::PostSelect { label: self.label_of_wire[wire], value });
        Ok(())
    }

    /// Exchanges the identities of wires `a` and `b` across the entire history.
    ///
    /// Everything previously recorded on `a` now executes on `b` and vice
    /// versa. Operations added afterwards follow the new assignment.
    pub fn swap_wires(&mut self, a: usize, b: usize) -> Result<()> {
        self.check_wire(a)?;
        self.check_wire(b)?;
        let (la, lb) = (self.label_of_wire[a], self.label_of_wire[b]);
        self.wire_of_label.swap(la, lb);
        self.label_of_wire.swap(a, b);
        Ok(())
    }

    /// Returns a slice containing the stored operations, in labels.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Operations translated to the wires they currently execute on.
    pub fn resolved_operations(&self) -> impl Iterator<Item = Operation> + '_ {
        self.operations.iter().map(|op| op.relabeled(|l| self.wire_of_label[l]))
    }

    /// Returns the total number of operations defined in the circuit.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns `true` if the circuit contains no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        CircuitSnapshot {
            len: self.operations.len(),
            wire_of_label: self.wire_of_label.clone(),
            label_of_wire: self.label_of_wire.clone(),
        }
    }

    /// Rolls back to `snapshot`.
    ///
    /// Wires registered after the snapshot was taken survive with identity
    /// labels; none of the restored operations reference them.
    pub fn restore(&mut self, snapshot: &CircuitSnapshot) {
        let wires = self.num_wires();
        self.operations.truncate(snapshot.len);
        self.wire_of_label.clone_from(&snapshot.wire_of_label);
        self.label_of_wire.clone_from(&snapshot.label_of_wire);
        for wire in snapshot.wire_of_label.len()..wires {
            self.wire_of_label.push(wire);
            self.label_of_wire.push(wire);
        }
    }

    /// Composes `other` in parallel with `self`.
    ///
    /// The wires of `other` are appended after the wires of `self`. The two
    /// logs are interleaved moment by moment: the i-th operation of each side
    /// shares a moment, and disjoint wires make the order within a moment
    /// irrelevant.
    pub fn merge_parallel(&mut self, other: &Circuit) {
        let offset = self.num_wires();
        self.wire_of_label.extend(other.wire_of_label.iter().map(|w| w + offset));
        self.label_of_wire.extend(other.label_of_wire.iter().map(|l| l + offset));

        let ours = std::mem::take(&mut self.operations);
        let theirs: Vec<Operation> = other.operations.iter().map(|op| op.relabeled(|l| l + offset)).collect();
        let mut ours = ours.into_iter();
        let mut theirs = theirs.into_iter();
        loop {
            match (ours.next(), theirs.next()) {
                (None, None) => break,
                (a, b) => self.operations.extend(a.into_iter().chain(b)),
            }
        }
    }
}

// Implement Default for convenient creation of empty circuits.
impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

//-------------------------------------------------------------------------
// Circuit Builder
//-------------------------------------------------------------------------

/// A helper struct for programmatically constructing `Circuit` instances using method chaining.
pub struct CircuitBuilder {
    circuit: Circuit,
    error: Option<WorldError>,
}

impl CircuitBuilder {
    /// Creates a builder over `num_wires` fresh wires.
    pub fn new(num_wires: usize) -> Self {
        let mut circuit = Circuit::new();
        for _ in 0..num_wires {
            circuit.add_wire();
        }
        Self { circuit, error: None }
    }

    /// Adds a gate on the given wires.
    ///
    /// Returns `self` to allow for continued method chaining. The first
    /// failure is reported by [`CircuitBuilder::build`].
    pub fn apply(mut self, gate: Gate, wires: &[usize]) -> Self {
        if self.error.is_none() {
            self.error = self.circuit.apply(gate, wires).err();
        }
        self
    }

    /// Adds a post-selection on a binary wire.
    pub fn post_select(mut self, wire: usize, value: u64) -> Self {
        if self.error.is_none() {
            self.error = self.circuit.post_select(wire, value).err();
        }
        self
    }

    /// Finalizes the construction process and returns the built `Circuit`.
    pub fn build(self) -> Result<Circuit> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.circuit),
        }
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "qworld::Circuit[{} operations on {} wires]", self.len(), self.num_wires())?;
        for (t, op) in self.resolved_operations().enumerate() {
            match op {
                Operation::Apply { gate, labels } => {
                    let wires: Vec<String> = labels.iter().map(|w| format!("w{}", w)).collect();
                    writeln!(f, "  {:>3}: {} @ {}", t, gate, wires.join(", "))?;
                }
                Operation::PostSelect { label, value } => {
                    writeln!(f, "  {:>3}: postselect w{} == {}", t, label, value)?;
                }
            }
        }
        Ok(())
    }
}

// Keep the Debug impl delegating to Display
impl fmt::Debug for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wires_of(circuit: &Circuit) -> Vec<Vec<usize>> {
        circuit.resolved_operations().map(|op| op.involved_labels()).collect()
    }

    #[test]
    fn swap_relabels_history_and_future() -> Result<()> {
        let mut circuit = CircuitBuilder::new(3).apply(Gate::flip(), &[0]).apply(Gate::flip(), &[2]).build()?;
        circuit.swap_wires(0, 1)?;
        assert_eq!(wires_of(&circuit), vec![vec![1], vec![2]]);

        // new work on wire 0 lands on wire 0, not on the history
        circuit.apply(Gate::fourier(2), &[0])?;
        assert_eq!(wires_of(&circuit), vec![vec![1], vec![2], vec![0]]);

        // swapping back restores the original placement of the history
        circuit.swap_wires(0, 1)?;
        assert_eq!(wires_of(&circuit), vec![vec![0], vec![2], vec![1]]);
        Ok(())
    }

    #[test]
    fn restore_is_exact_and_keeps_new_wires() -> Result<()> {
        let mut circuit = CircuitBuilder::new(2).apply(Gate::flip(), &[0]).build()?;
        let snapshot = circuit.snapshot();

        let extra = circuit.add_wire();
        circuit.apply(Gate::flip(), &[extra])?;
        circuit.swap_wires(0, extra)?;
        circuit.post_select(extra, 1)?;

        circuit.restore(&snapshot);
        assert_eq!(circuit.len(), 1);
        assert_eq!(circuit.num_wires(), 3);
        assert_eq!(wires_of(&circuit), vec![vec![0]]);
        assert_eq!(circuit.label_of(extra), Some(extra));
        assert_eq!(circuit.wire_of(0), Some(0));
        Ok(())
    }

    #[test]
    fn parallel_merge_interleaves_and_offsets() -> Result<()> {
        let mut left = CircuitBuilder::new(1)
            .apply(Gate::flip(), &[0])
            .apply(Gate::fourier(2), &[0])
            .apply(Gate::flip(), &[0])
            .build()?;
        let mut right = CircuitBuilder::new(2).apply(Gate::swap(2), &[0, 1]).build()?;
        right.swap_wires(0, 1)?;

        left.merge_parallel(&right);
        assert_eq!(left.num_wires(), 3);
        assert_eq!(wires_of(&left), vec![vec![0], vec![2, 1], vec![0], vec![0]]);
        Ok(())
    }

    #[test]
    fn invalid_targets_are_rejected() {
        let built = CircuitBuilder::new(1).apply(Gate::swap(2), &[0]).build();
        assert!(matches!(built, Err(WorldError::ArityMismatch { expected: 2, actual: 1, .. })));
        let built = CircuitBuilder::new(1).post_select(4, 0).build();
        assert!(matches!(built, Err(WorldError::InvalidOperation { .. })));
    }

    #[test]
    fn lookups_outside_the_tables_are_none() -> Result<()> {
        let mut circuit = CircuitBuilder::new(2).build()?;
        circuit.swap_wires(0, 1)?;
        assert_eq!(circuit.label_of(0), Some(1));
        assert_eq!(circuit.wire_of(1), Some(0));
        assert_eq!(circuit.label_of(2), None);
        assert_eq!(circuit.wire_of(7), None);
        Ok(())
    }
}
