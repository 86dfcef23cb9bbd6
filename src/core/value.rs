// src/core/value.rs

use super::error::{Result, WorldError};
use std::fmt;

/// The set of classical values a quantum object can be observed in.
///
/// Resolved once when the object is created. Every engine works on the
/// integer encoding; labels only matter when results are shown to a player.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueDomain {
    /// Plain integers `0..dimension`.
    Integer {
        /// Number of orthogonal basis states, at least 2.
        dimension: usize,
    },
    /// A symbolic enumeration; label `i` is encoded as the integer `i`.
    Symbolic {
        /// Labels in encoding order.
        labels: Vec<String>,
    },
}

impl ValueDomain {
    /// An integer domain of the given dimension.
    pub fn integer(dimension: usize) -> Self {
        ValueDomain::Integer { dimension }
    }

    /// A symbolic domain from an ordered list of labels.
    pub fn symbolic<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValueDomain::Symbolic { labels: labels.into_iter().map(Into::into).collect() }
    }

    /// Number of basis states.
    pub fn dimension(&self) -> usize {
        match self {
            ValueDomain::Integer { dimension } => *dimension,
            ValueDomain::Symbolic { labels } => labels.len(),
        }
    }

    /// Integer encoding of a symbolic label.
    pub fn encode(&self, label: &str) -> Option<u64> {
        match self {
            ValueDomain::Integer { .. } => None,
            ValueDomain::Symbolic { labels } => labels.iter().position(|l| l == label).map(|i| i as u64),
        }
    }

    /// Converts a raw outcome back into the domain's display form.
    pub fn decode(&self, raw: u64) -> Result<Value> {
        match self {
            ValueDomain::Integer { dimension } if (raw as usize) < *dimension => Ok(Value::Integer(raw)),
            ValueDomain::Symbolic { labels } => labels
                .get(raw as usize)
                .map(|l| Value::Symbol(l.clone()))
                .ok_or_else(|| WorldError::Simulation {
                    message: format!("Outcome {} has no label in a domain of {} symbols", raw, labels.len()),
                }),
            ValueDomain::Integer { dimension } => Err(WorldError::Simulation {
                message: format!("Outcome {} is outside an integer domain of dimension {}", raw, dimension),
            }),
        }
    }
}

/// A sampled outcome in display form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Outcome of an integer-domain object.
    Integer(u64),
    /// Outcome of a symbolic-domain object.
    Symbol(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Symbol(s) => write!(f, "{}", s),
        }
    }
}
