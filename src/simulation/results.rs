// src/simulation/results.rs
use std::collections::BTreeMap;
use std::fmt;

/// Raw shots drawn from a prepared state.
/// Row `i` holds one value per measured wire, in the order of [`SimulationResult::wires`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationResult {
    wires: Vec<usize>,
    shots: Vec<Vec<u64>>,
}

impl SimulationResult {
    pub(crate) fn new(wires: Vec<usize>, shots: Vec<Vec<u64>>) -> Self {
        Self { wires, shots }
    }

    /// The measured wires, in column order.
    pub fn wires(&self) -> &[usize] {
        &self.wires
    }

    /// All shots, one row per repetition.
    pub fn shots(&self) -> &[Vec<u64>] {
        &self.shots
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }

    /// Every value read from `wire`, or `None` if the wire was not measured.
    pub fn measurements(&self, wire: usize) -> Option<Vec<u64>> {
        let col = self.wires.iter().position(|&w| w == wire)?;
        Some(self.shots.iter().map(|row| row[col]).collect())
    }

    /// Outcome counts for one wire.
    pub fn histogram(&self, wire: usize) -> Option<BTreeMap<u64, usize>> {
        let mut counts = BTreeMap::new();
        for v in self.measurements(wire)? {
            *counts.entry(v).or_insert(0) += 1;
        }
        Some(counts)
    }
}

impl fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation Results ({} shots):", self.shots.len())?;
        if self.wires.is_empty() {
            writeln!(f, "  No wires were measured.")?;
            return Ok(());
        }
        for &wire in &self.wires {
            if let Some(counts) = self.histogram(wire) {
                let parts: Vec<String> = counts.iter().map(|(v, n)| format!("{}: {}", v, n)).collect();
                writeln!(f, "  w{}: {{{}}}", wire, parts.join(", "))?;
            }
        }
        Ok(())
    }
}
