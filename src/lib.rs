// src/lib.rs

//! `qworld` - A quantum world engine for games with quantum mechanics
//!
//! Game logic creates named quantum objects, applies gates to them and
//! measures them. The engine keeps the whole history as a circuit, so any
//! effect or measurement can be undone, and simulates it on demand with a
//! sparse or a dense amplitude engine.

pub mod core;
pub mod operations;
pub mod circuits;
pub mod simulation;
pub mod transform;
pub mod validation;
pub mod world;

// Re-export the most common types for easier top-level use
pub use core::{QuantumObject, QuditId, Result, Value, ValueDomain, WorldError};
pub use operations::{Gate, Operation};
pub use circuits::{Circuit, CircuitBuilder};
pub use simulation::{Backend, SimulationResult, Simulator};
pub use world::{Effect, EffectOutcome, QuantumEffect, World, WorldConfig};

// Example 1: Splitting a piece across two squares
// A "split" moves a piece from `source` into an equal superposition of two
// targets. Measuring one target decides the other.
/// ```
/// use qworld::{Gate, QuantumObject, World, WorldConfig, WorldError};
/// use nalgebra::DMatrix;
/// use num_complex::Complex64;
///
/// # fn main() -> Result<(), WorldError> {
/// let mut world = World::new(WorldConfig::sparse().with_seed(7));
/// let s = world.add_object(QuantumObject::qubit("s", 1))?;
/// let t1 = world.add_object(QuantumObject::qubit("t1", 0))?;
/// let t2 = world.add_object(QuantumObject::qubit("t2", 0))?;
///
/// // Half of a swap: |01> and |10> mix with equal weight.
/// let r = Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
/// let (o, l) = (Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0));
/// let half_swap = Gate::unitary(
///     "SPLIT",
///     vec![2, 2],
///     DMatrix::from_row_slice(4, 4, &[l, o, o, o, o, r, r, o, o, -r, r, o, o, o, o, l]),
/// )?;
/// world.apply(&half_swap, &[&s, &t1])?;
/// world.apply(&Gate::swap(2), &[&s, &t2])?;
///
/// let a = world.pop(&[&t1])?[0];
/// let rows = world.peek(&[&t2, &s], 50)?;
/// assert!(rows.iter().all(|row| row == &vec![1 - a, 0]));
/// # Ok(())
/// # }
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item

// Example 2: Exploring what-ifs with undo
/// ```
/// use qworld::{Gate, QuantumObject, World, WorldConfig, WorldError};
///
/// # fn main() -> Result<(), WorldError> {
/// let mut world = World::new(WorldConfig::dense().with_seed(3));
/// let q = world.add_object(QuantumObject::qubit("q", 0))?;
/// world.apply(&Gate::flip(), &[&q])?;
/// assert_eq!(world.peek(&[&q], 10)?, vec![vec![1]; 10]);
///
/// world.undo_last_effect()?;
/// assert_eq!(world.peek(&[&q], 10)?, vec![vec![0]; 10]);
/// assert!(matches!(world.undo_last_effect(), Err(WorldError::EmptyHistory)));
/// # Ok(())
/// # }
/// ```
#[doc(hidden)]
const _: () = ();
