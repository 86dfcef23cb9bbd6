// src/core/mod.rs

//! Core data structures and types

pub mod error;
pub mod object;
pub mod value;

// Re-export public types for convenient access via `qworld::core::TypeName`
pub use error::{QuditId, Result, WorldError};
pub use object::QuantumObject;
pub(crate) use object::WorldToken;
pub use value::{Value, ValueDomain};
