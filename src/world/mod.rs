// src/world/mod.rs

//! The quantum state container game logic talks to.
//!
//! A [`World`] owns its quantum objects, the circuit that has been applied to
//! them, the post-selection constraints left behind by measurements and an
//! undo history. It answers two questions: what would we observe if we looked
//! now ([`World::peek`]) and what do we observe, permanently, if we measure
//! ([`World::pop`]).
//!
//! Measuring an object does not cut the circuit. Instead a fresh ancilla is
//! created at the measured value and the two identities are swapped across
//! the whole history: the ancilla inherits everything that happened to the
//! object and is pinned by a post-selection, while the object carries on from
//! a clean classical state.

mod config;
mod effect;

pub use config::WorldConfig;
pub use effect::{Effect, EffectOutcome, QuantumEffect};

use crate::circuits::{Circuit, CircuitSnapshot};
use crate::core::{QuantumObject, QuditId, Result, Value, ValueDomain, WorldError, WorldToken};
use crate::operations::Gate;
use crate::simulation::{Backend, Simulator};
use crate::transform::num_cells;
use log::{debug, info, trace};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Repetition ceiling of the rejection-sampling loop in `peek`.
pub const MAX_REPETITIONS: usize = 1_000_000;
/// Smallest first batch on a dense backend.
const MIN_DENSE_REPETITIONS: usize = 100;

#[derive(Debug, Clone)]
struct ObjectRecord {
    /// Detached description; handed out again with an attachment on lookup.
    object: QuantumObject,
    /// Wires carrying the object: one native wire, or its cells when compiled.
    wires: Vec<usize>,
    ancilla: bool,
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    circuit: CircuitSnapshot,
    post_selection: BTreeMap<QuditId, u64>,
}

/// A set of quantum objects and everything that has been done to them.
///
/// # Examples
///
/// ```
/// use qworld::{Gate, QuantumObject, World, WorldConfig, WorldError};
///
/// # fn main() -> Result<(), WorldError> {
/// let mut world = World::new(WorldConfig::sparse().with_seed(1));
/// let coin = world.add_object(QuantumObject::qubit("coin", 0))?;
/// world.apply(&Gate::fourier(2), &[&coin])?;
///
/// let outcome = world.pop(&[&coin])?;
/// // Once popped, every later look agrees.
/// assert!(world.peek(&[&coin], 20)?.iter().all(|shot| shot == &outcome));
///
/// // Undo brings the superposition back.
/// world.undo_last_effect()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    token: Arc<WorldToken>,
    simulator: Simulator,
    objects: Vec<ObjectRecord>,
    by_name: HashMap<String, QuditId>,
    /// Dimension of every circuit wire.
    wire_dims: Vec<usize>,
    circuit: Circuit,
    /// Ancilla -> value it is pinned to.
    post_selection: BTreeMap<QuditId, u64>,
    history: Vec<HistoryEntry>,
    rng: StdRng,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            token: Arc::new(WorldToken),
            simulator: Simulator::new(config.backend),
            objects: Vec::new(),
            by_name: HashMap::new(),
            wire_dims: Vec::new(),
            circuit: Circuit::new(),
            post_selection: BTreeMap::new(),
            history: Vec::new(),
            rng,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn backend(&self) -> Backend {
        self.config.backend
    }

    /// Whether objects live on binary cells (see [`WorldConfig::compiles_to_qubits`]).
    pub fn is_compiled(&self) -> bool {
        self.config.compiles_to_qubits()
    }

    /// The circuit applied so far.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Number of undoable effects.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn record(&self, id: QuditId) -> &ObjectRecord {
        &self.objects[id.0]
    }

    fn resolve(&self, object: &QuantumObject) -> Result<QuditId> {
        let id = object.id_in(&self.token)?;
        if id.0 >= self.objects.len() {
            return Err(WorldError::UnattachedObject { name: object.name().to_string() });
        }
        Ok(id)
    }

    fn resolve_all(&self, objects: &[&QuantumObject]) -> Result<Vec<QuditId>> {
        objects.iter().map(|o| self.resolve(o)).collect()
    }

    // ------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------

    /// Registers `object` and applies its initial value.
    ///
    /// Returns a copy attached to this world, to be used in effects and lookups.
    pub fn add_object(&mut self, object: QuantumObject) -> Result<QuantumObject> {
        if object.is_attached() {
            return Err(WorldError::InvalidOperation {
                message: format!("Object '{}' already belongs to a world", object.name()),
            });
        }
        let id = self.allocate(object.detached(), false)?;
        debug!("added {} as {} on wires {:?}", object, id, self.record(id).wires);
        Ok(object.attached(&self.token, id))
    }

    fn allocate(&mut self, object: QuantumObject, ancilla: bool) -> Result<QuditId> {
        let d = object.dimension();
        if d < 2 {
            return Err(WorldError::InvalidOperation {
                message: format!("Object '{}' needs at least 2 states, has {}", object.name(), d),
            });
        }
        if object.initial() >= d as u64 {
            return Err(WorldError::InvalidValue { name: object.name().to_string(), value: object.initial(), dimension: d });
        }
        if self.by_name.contains_key(object.name()) {
            return Err(WorldError::DuplicateObject { name: object.name().to_string() });
        }

        let layout: Vec<usize> = if self.is_compiled() { vec![2; num_cells(d)] } else { vec![d] };
        let wires: Vec<usize> = layout
            .into_iter()
            .map(|dim| {
                self.wire_dims.push(dim);
                self.circuit.add_wire()
            })
            .collect();
        self.encode_value(&wires, d, object.initial())?;

        let id = QuditId(self.objects.len());
        self.by_name.insert(object.name().to_string(), id);
        self.objects.push(ObjectRecord { object, wires, ancilla });
        Ok(id)
    }

    /// Appends the operations preparing `value` on freshly allocated wires.
    fn encode_value(&mut self, wires: &[usize], dimension: usize, value: u64) -> Result<()> {
        if value == 0 {
            return Ok(());
        }
        if self.is_compiled() {
            let k = wires.len();
            for (i, &w) in wires.iter().enumerate() {
                if (value >> (k - 1 - i)) & 1 == 1 {
                    self.circuit.apply(Gate::flip(), &[w])?;
                }
            }
            Ok(())
        } else {
            self.circuit.apply(Gate::shift(dimension, value as usize), wires)
        }
    }

    fn decode_value(&self, bits: &[u64]) -> u64 {
        if self.is_compiled() {
            bits.iter().fold(0, |acc, &b| (acc << 1) | b)
        } else {
            bits.first().copied().unwrap_or(0)
        }
    }

    fn add_ancilla(&mut self, base: &str, dimension: usize, value: u64) -> Result<QuditId> {
        let name = (0..)
            .map(|n| format!("ancilla_{}_{}", base, n))
            .find(|candidate| !self.by_name.contains_key(candidate))
            .unwrap_or_default();
        self.allocate(QuantumObject::new(name, ValueDomain::integer(dimension), value), true)
    }

    /// Looks an object up by name, returning an attached copy.
    ///
    /// This is the indexing entry point of a world: `World` has no `Index`
    /// impl, because a missing name is reported as
    /// [`WorldError::UnknownObject`] rather than a panic. Ancillas can be
    /// looked up under the names listed by [`World::ancilla_names`].
    pub fn get_object_by_name(&self, name: &str) -> Result<QuantumObject> {
        self.by_name
            .get(name)
            .map(|&id| self.record(id).object.attached(&self.token, id))
            .ok_or_else(|| WorldError::UnknownObject { name: name.to_string() })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Objects created by game logic, in creation order. Ancillas are excluded.
    pub fn public_objects(&self) -> Vec<QuantumObject> {
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.ancilla)
            .map(|(i, r)| r.object.attached(&self.token, QuditId(i)))
            .collect()
    }

    /// Names of every ancilla created so far.
    pub fn ancilla_names(&self) -> Vec<&str> {
        self.objects.iter().filter(|r| r.ancilla).map(|r| r.object.name()).collect()
    }

    /// Current post-selection constraints as `(ancilla name, required value)`.
    pub fn post_selection(&self) -> Vec<(&str, u64)> {
        self.post_selection.iter().map(|(&id, &v)| (self.record(id).object.name(), v)).collect()
    }

    /// Wires (binary cells when compiled) carrying `object`.
    pub fn cells_of(&self, object: &QuantumObject) -> Result<Vec<usize>> {
        let id = self.resolve(object)?;
        Ok(self.record(id).wires.clone())
    }

    // ------------------------------------------------------------------
    // Effects and history
    // ------------------------------------------------------------------

    fn push_history(&mut self) {
        self.history.push(HistoryEntry { circuit: self.circuit.snapshot(), post_selection: self.post_selection.clone() });
    }

    fn restore(&mut self, entry: HistoryEntry) {
        self.circuit.restore(&entry.circuit);
        self.post_selection = entry.post_selection;
    }

    /// Rewrites an effect into a gate on wires.
    fn lower(&self, effect: &Effect) -> Result<(Gate, Vec<usize>)> {
        let ids = effect.objects().iter().map(|o| self.resolve(o)).collect::<Result<Vec<_>>>()?;
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                return Err(WorldError::InvalidOperation {
                    message: format!("'{}' is used twice by '{}'", self.record(*id).object.name(), effect.gate().name()),
                });
            }
        }
        let gate = if self.is_compiled() { effect.gate().compile_to_qubits()? } else { effect.gate().clone() };
        let wires = ids.iter().flat_map(|&id| self.record(id).wires.iter().copied()).collect();
        Ok((gate, wires))
    }

    /// Appends `effects` to the circuit as a single undoable step.
    ///
    /// Either every effect is applied or the world is left untouched.
    pub fn add_effect(&mut self, effects: Vec<Effect>) -> Result<()> {
        let lowered = effects.iter().map(|e| self.lower(e)).collect::<Result<Vec<_>>>()?;
        self.push_history();
        for (gate, wires) in lowered {
            trace!("appending {} on wires {:?}", gate, wires);
            if let Err(e) = self.circuit.apply(gate, &wires) {
                self.rollback();
                return Err(e);
            }
        }
        debug!("added effect of {} operations; circuit now has {}", effects.len(), self.circuit.len());
        Ok(())
    }

    /// Validates and applies a game-level effect.
    pub fn apply(&mut self, effect: &dyn QuantumEffect, objects: &[&QuantumObject]) -> Result<EffectOutcome> {
        if let Some(expected) = effect.num_objects() {
            if expected != objects.len() {
                return Err(WorldError::ArityMismatch { gate: effect.name(), expected, actual: objects.len() });
            }
        }
        if let Some(expected) = effect.num_dimension() {
            if let Some(obj) = objects.iter().find(|o| o.dimension() != expected) {
                return Err(WorldError::DimensionMismatch {
                    context: format!("operand '{}' of '{}'", obj.name(), effect.name()),
                    expected,
                    actual: obj.dimension(),
                });
            }
        }
        self.resolve_all(objects)?;
        if let Some(reason) = effect.precondition(self, objects)? {
            debug!("{} not applied: {}", effect.name(), reason);
            return Ok(EffectOutcome::NotApplied { reason });
        }
        self.add_effect(effect.effect(objects)?)?;
        Ok(EffectOutcome::Applied)
    }

    fn rollback(&mut self) {
        if let Some(entry) = self.history.pop() {
            self.restore(entry);
        }
    }

    /// Reverts the most recent effect or measurement exactly.
    pub fn undo_last_effect(&mut self) -> Result<()> {
        let entry = self.history.pop().ok_or(WorldError::EmptyHistory)?;
        self.restore(entry);
        debug!("undid last effect; {} remain in history", self.history.len());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sampling
    // ------------------------------------------------------------------

    /// Size of the first batch. Never below `count`; the dense scaling stops at [`MAX_REPETITIONS`].
    fn initial_repetitions(&self, count: usize) -> usize {
        match self.config.backend {
            Backend::Sparse => count,
            Backend::Dense => {
                let shift = self.post_selection.len() + 1;
                let scaled = if shift < usize::BITS as usize && count <= (usize::MAX >> shift) {
                    count << shift
                } else {
                    usize::MAX
                };
                scaled.min(MAX_REPETITIONS).max(MIN_DENSE_REPETITIONS).max(count)
            }
        }
    }

    fn peek_ids(&mut self, ids: &[QuditId], count: usize) -> Result<Vec<Vec<u64>>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut measured: Vec<QuditId> = ids.to_vec();
        measured.extend(self.post_selection.keys().filter(|id| !ids.contains(id)));
        let spans: Vec<(usize, usize)> = measured
            .iter()
            .scan(0, |start, &id| {
                let len = self.record(id).wires.len();
                *start += len;
                Some((*start - len, *start))
            })
            .collect();
        let wires: Vec<usize> = measured.iter().flat_map(|&id| self.record(id).wires.iter().copied()).collect();
        let required: Vec<Option<u64>> = measured.iter().map(|id| self.post_selection.get(id).copied()).collect();

        let prepared = self.simulator.prepare(&self.circuit, &self.wire_dims, &wires)?;
        let mut repetitions = self.initial_repetitions(count);
        let mut accepted: Vec<Vec<u64>> = Vec::with_capacity(count);
        loop {
            let result = prepared.sample(&wires, repetitions, &mut self.rng)?;
            for shot in result.shots() {
                let values: Vec<u64> = spans
                    .iter()
                    .map(|&(start, end)| self.decode_value(&shot[start..end]))
                    .collect();
                let consistent = values.iter().zip(&required).all(|(v, req)| req.is_none_or(|r| r == *v));
                if consistent {
                    accepted.push(values[..ids.len()].to_vec());
                    if accepted.len() == count {
                        return Ok(accepted);
                    }
                }
            }
            // the first batch always runs; only escalation is capped
            let next = repetitions.saturating_mul(10);
            if next > MAX_REPETITIONS {
                return Err(WorldError::PostSelectionUnsatisfiable {
                    message: format!(
                        "only {} of {} samples satisfied {} post-selections; a batch of {} would exceed {} repetitions",
                        accepted.len(),
                        count,
                        self.post_selection.len(),
                        next,
                        MAX_REPETITIONS
                    ),
                });
            }
            debug!("peek accepted {}/{} after {} repetitions; retrying with {}", accepted.len(), count, repetitions, next);
            repetitions = next;
        }
    }

    /// Samples `count` outcomes of `objects` without changing the world.
    ///
    /// Each row holds one integer-encoded value per requested object. Shots
    /// contradicting a recorded measurement are rejected; the batch size grows
    /// tenfold until enough shots survive. Growing past [`MAX_REPETITIONS`]
    /// fails with [`WorldError::PostSelectionUnsatisfiable`].
    pub fn peek(&mut self, objects: &[&QuantumObject], count: usize) -> Result<Vec<Vec<u64>>> {
        let ids = self.resolve_all(objects)?;
        self.peek_ids(&ids, count)
    }

    /// [`World::peek`] over every public object.
    pub fn peek_all(&mut self, count: usize) -> Result<Vec<Vec<u64>>> {
        let ids = self.public_ids();
        self.peek_ids(&ids, count)
    }

    /// [`World::peek`] with outcomes converted to each object's value domain.
    pub fn peek_values(&mut self, objects: &[&QuantumObject], count: usize) -> Result<Vec<Vec<Value>>> {
        let rows = self.peek(objects, count)?;
        rows.iter().map(|row| Self::to_values(objects, row)).collect()
    }

    fn to_values(objects: &[&QuantumObject], row: &[u64]) -> Result<Vec<Value>> {
        objects.iter().zip(row).map(|(o, &v)| o.domain().decode(v)).collect()
    }

    fn public_ids(&self) -> Vec<QuditId> {
        (0..self.objects.len()).filter(|&i| !self.objects[i].ancilla).map(QuditId).collect()
    }

    /// Outcome counts per object over `count` peeks.
    pub fn histogram(&mut self, objects: &[&QuantumObject], count: usize) -> Result<Vec<BTreeMap<u64, usize>>> {
        let rows = self.peek(objects, count)?;
        let mut counts = vec![BTreeMap::new(); objects.len()];
        for row in rows {
            for (slot, v) in counts.iter_mut().zip(row) {
                *slot.entry(v).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    /// Empirical outcome probabilities per object over `count` peeks.
    pub fn probabilities(&mut self, objects: &[&QuantumObject], count: usize) -> Result<Vec<BTreeMap<u64, f64>>> {
        Ok(self
            .histogram(objects, count)?
            .into_iter()
            .map(|h| h.into_iter().map(|(v, n)| (v, n as f64 / count as f64)).collect())
            .collect())
    }

    // ------------------------------------------------------------------
    // Measurement
    // ------------------------------------------------------------------

    fn pop_ids(&mut self, ids: &[QuditId]) -> Result<Vec<u64>> {
        self.push_history();
        let sampled = match self.peek_ids(ids, 1) {
            Ok(mut rows) => rows.pop().unwrap_or_default(),
            Err(e) => {
                self.rollback();
                return Err(e);
            }
        };
        for (&id, &value) in ids.iter().zip(&sampled) {
            if let Err(e) = self.force_id(id, value) {
                self.rollback();
                return Err(e);
            }
        }
        Ok(sampled)
    }

    /// Measures `objects` destructively and returns the observed values.
    ///
    /// Counts as one undoable effect.
    pub fn pop(&mut self, objects: &[&QuantumObject]) -> Result<Vec<u64>> {
        let ids = self.resolve_all(objects)?;
        self.pop_ids(&ids)
    }

    /// [`World::pop`] over every public object.
    pub fn pop_all(&mut self) -> Result<Vec<u64>> {
        let ids = self.public_ids();
        self.pop_ids(&ids)
    }

    /// [`World::pop`] with outcomes converted to each object's value domain.
    pub fn pop_values(&mut self, objects: &[&QuantumObject]) -> Result<Vec<Value>> {
        let row = self.pop(objects)?;
        Self::to_values(objects, &row)
    }

    /// Freezes `object` at `value`.
    ///
    /// The object's history is handed to a new ancilla pinned at `value`, and
    /// the object itself restarts from `value`. Does not push history on its
    /// own; [`World::pop`] does.
    pub fn force_measurement(&mut self, object: &QuantumObject, value: u64) -> Result<()> {
        let id = self.resolve(object)?;
        self.force_id(id, value)
    }

    fn force_id(&mut self, id: QuditId, value: u64) -> Result<()> {
        let (name, dimension) = {
            let object = &self.record(id).object;
            (object.name().to_string(), object.dimension())
        };
        if value >= dimension as u64 {
            return Err(WorldError::InvalidValue { name, value, dimension });
        }
        let checkpoint = HistoryEntry { circuit: self.circuit.snapshot(), post_selection: self.post_selection.clone() };

        let ancilla = self.add_ancilla(&name, dimension, value)?;
        self.swap_identities(id, ancilla)?;
        self.post_selection.insert(ancilla, value);

        if self.config.backend == Backend::Sparse {
            if let Err(e) = self.prune_eagerly(ancilla, value) {
                self.restore(checkpoint);
                return Err(e);
            }
        }
        debug!("forced {} = {} via {}", name, value, self.record(ancilla).object.name());
        Ok(())
    }

    /// Records the post-selection of `ancilla` in the circuit and checks it is satisfiable.
    fn prune_eagerly(&mut self, ancilla: QuditId, value: u64) -> Result<()> {
        let wires = self.record(ancilla).wires.clone();
        let k = wires.len();
        for (i, &w) in wires.iter().enumerate() {
            self.circuit.post_select(w, (value >> (k - 1 - i)) & 1)?;
        }
        self.simulator.prepare(&self.circuit, &self.wire_dims, &[])?;
        Ok(())
    }

    fn swap_identities(&mut self, a: QuditId, b: QuditId) -> Result<()> {
        let pairs: Vec<(usize, usize)> =
            self.record(a).wires.iter().copied().zip(self.record(b).wires.iter().copied()).collect();
        for (wa, wb) in pairs {
            self.circuit.swap_wires(wa, wb)?;
        }
        Ok(())
    }

    /// Detaches `object` from its history without committing to an outcome.
    ///
    /// The history moves to an unconstrained ancilla and the object restarts at 0.
    pub fn unhook(&mut self, object: &QuantumObject) -> Result<()> {
        let id = self.resolve(object)?;
        let ancilla = self.add_ancilla(object.name(), object.dimension(), 0)?;
        self.swap_identities(id, ancilla)?;
        debug!("unhooked {} onto {}", object.name(), self.record(ancilla).object.name());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Merging
    // ------------------------------------------------------------------

    /// Moves every object, ancilla, constraint and operation of `other` into `self`.
    ///
    /// The circuits run side by side. Both histories are cleared and `other`
    /// is left empty; objects previously attached to it must be looked up
    /// again in `self`. On error neither world is modified.
    pub fn combine_with(&mut self, other: &mut World) -> Result<()> {
        if self.config.backend != other.config.backend || self.is_compiled() != other.is_compiled() {
            return Err(WorldError::IncompatibleWorlds {
                message: format!(
                    "backends differ ({:?}, compiled: {} vs {:?}, compiled: {})",
                    self.config.backend,
                    self.is_compiled(),
                    other.config.backend,
                    other.is_compiled()
                ),
            });
        }
        let mut shared: Vec<&str> =
            other.by_name.keys().filter(|n| self.by_name.contains_key(*n)).map(String::as_str).collect();
        if !shared.is_empty() {
            shared.sort_unstable();
            return Err(WorldError::IncompatibleWorlds { message: format!("both worlds contain {:?}", shared) });
        }

        let wire_offset = self.wire_dims.len();
        let id_offset = self.objects.len();
        self.circuit.merge_parallel(&other.circuit);
        self.wire_dims.extend_from_slice(&other.wire_dims);
        for (i, record) in other.objects.drain(..).enumerate() {
            let id = QuditId(id_offset + i);
            self.by_name.insert(record.object.name().to_string(), id);
            self.objects.push(ObjectRecord {
                wires: record.wires.iter().map(|w| w + wire_offset).collect(),
                ..record
            });
        }
        self.post_selection
            .extend(other.post_selection.iter().map(|(id, &v)| (QuditId(id.0 + id_offset), v)));
        self.history.clear();

        let merged = self.objects.len() - id_offset;
        *other = World::new(other.config);
        info!("combined worlds: {} objects merged, {} total", merged, self.objects.len());
        Ok(())
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl Clone for World {
    /// Deep copy with its own identity: objects attached to `self` are not
    /// attached to the copy and must be looked up again by name.
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            token: Arc::new(WorldToken),
            simulator: self.simulator,
            objects: self.objects.clone(),
            by_name: self.by_name.clone(),
            wire_dims: self.wire_dims.clone(),
            circuit: self.circuit.clone(),
            post_selection: self.post_selection.clone(),
            history: self.history.clone(),
            rng: self.rng.clone(),
        }
    }
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ancillas = self.objects.iter().filter(|r| r.ancilla).count();
        writeln!(
            f,
            "World[{:?}{}: {} objects, {} ancillas, {} post-selections]",
            self.config.backend,
            if self.is_compiled() { ", compiled" } else { "" },
            self.objects.len() - ancillas,
            ancillas,
            self.post_selection.len()
        )?;
        for record in self.objects.iter().filter(|r| !r.ancilla) {
            writeln!(f, "  {} on wires {:?}", record.object, record.wires)?;
        }
        write!(f, "{}", self.circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(backend: Backend) -> World {
        World::new(WorldConfig::default().with_backend(backend).with_seed(17))
    }

    #[test]
    fn dense_budget_scales_with_post_selections() {
        let mut world = seeded(Backend::Dense);
        assert_eq!(world.initial_repetitions(1), 100);
        assert_eq!(world.initial_repetitions(60), 120);
        world.post_selection.insert(QuditId(0), 1);
        world.post_selection.insert(QuditId(1), 0);
        assert_eq!(world.initial_repetitions(20), 160);
        assert_eq!(world.initial_repetitions(usize::MAX / 2), usize::MAX / 2);

        for i in 2..19 {
            world.post_selection.insert(QuditId(i), 0);
        }
        assert_eq!(world.post_selection.len(), 19);
        assert_eq!(world.initial_repetitions(1), MAX_REPETITIONS);
        assert_eq!(world.initial_repetitions(3_000_000), 3_000_000);

        assert_eq!(seeded(Backend::Sparse).initial_repetitions(7), 7);
    }

    #[test]
    fn ancilla_names_skip_taken_suffixes() -> Result<()> {
        let mut world = seeded(Backend::Dense);
        let q = world.add_object(QuantumObject::qubit("q", 0))?;
        world.add_object(QuantumObject::qubit("ancilla_q_0", 0))?;
        world.force_measurement(&q, 0)?;
        assert_eq!(world.ancilla_names(), vec!["ancilla_q_1"]);
        assert_eq!(world.post_selection(), vec![("ancilla_q_1", 0)]);
        Ok(())
    }

    #[test]
    fn compiled_layout_uses_big_endian_cells() -> Result<()> {
        let mut world = World::new(WorldConfig::dense().with_compile_to_qubits(true).with_seed(2));
        let q = world.add_object(QuantumObject::new("q", ValueDomain::integer(5), 4))?;
        assert_eq!(world.cells_of(&q)?, vec![0, 1, 2]);
        // 4 = 0b100: only the leading cell is flipped
        let flipped: Vec<Vec<usize>> = world.circuit().resolved_operations().map(|op| op.involved_labels()).collect();
        assert_eq!(flipped, vec![vec![0]]);
        assert_eq!(world.peek(&[&q], 5)?, vec![vec![4]; 5]);
        Ok(())
    }

    #[test]
    fn failed_eager_prune_leaves_world_unchanged() -> Result<()> {
        let mut world = seeded(Backend::Sparse);
        let q = world.add_object(QuantumObject::qubit("q", 0))?;
        let before = world.circuit().clone();
        let err = world.force_measurement(&q, 1).unwrap_err();
        assert!(matches!(err, WorldError::PostSelectionUnsatisfiable { .. }));
        assert_eq!(world.circuit().operations(), before.operations());
        assert!(world.post_selection().is_empty());
        assert_eq!(world.peek(&[&q], 3)?, vec![vec![0]; 3]);
        Ok(())
    }
}
