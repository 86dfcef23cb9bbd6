// demos/quantum_split.rs
//
// A rook splits across two squares, is observed, and the move is taken back.
// RUST_LOG=debug shows every engine step.

use env_logger::Env;
use log::info;
use nalgebra::DMatrix;
use num_complex::Complex64;
use qworld::{Backend, Gate, QuantumObject, World, WorldConfig, WorldError};
use std::f64::consts::FRAC_1_SQRT_2;

fn half_swap() -> Result<Gate, WorldError> {
    let (o, l, r) = (Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0), Complex64::new(FRAC_1_SQRT_2, 0.0));
    Gate::unitary("HALF_SWAP", vec![2, 2], DMatrix::from_row_slice(4, 4, &[l, o, o, o, o, r, r, o, o, -r, r, o, o, o, o, l]))
}

fn play(backend: Backend) -> Result<(), WorldError> {
    info!("playing on the {:?} backend", backend);
    println!("\n--- {:?} backend ---", backend);
    let mut world = World::new(WorldConfig::default().with_backend(backend).with_seed(2024));
    let a1 = world.add_object(QuantumObject::qubit("a1", 1))?;
    let a2 = world.add_object(QuantumObject::qubit("a2", 0))?;
    let a3 = world.add_object(QuantumObject::qubit("a3", 0))?;

    world.apply(&half_swap()?, &[&a1, &a2])?;
    world.apply(&Gate::swap(2), &[&a1, &a3])?;
    println!("{}", world);
    for (square, counts) in ["a1", "a2", "a3"].iter().zip(world.histogram(&[&a1, &a2, &a3], 1000)?) {
        println!("  {}: {:?}", square, counts);
    }

    let seen = world.pop(&[&a2])?;
    println!("Observed a2 = {}; board is now {:?}", seen[0], world.peek_all(1)?);
    println!("Post-selections: {:?}", world.post_selection());

    world.undo_last_effect()?;
    println!("After undo: {:?}", world.probabilities(&[&a2, &a3], 1000)?);
    Ok(())
}

fn main() -> Result<(), WorldError> {
    let env = Env::default().filter_or("RUST_LOG", "info");
    let _ = env_logger::Builder::from_env(env).format_timestamp_secs().try_init();
    play(Backend::Sparse)?;
    play(Backend::Dense)?;
    Ok(())
}
