// src/core/object.rs

use super::error::{QuditId, Result, WorldError};
use super::value::{Value, ValueDomain};
use std::fmt;
use std::sync::{Arc, Weak};

/// Identity token owned by a world. Objects only ever hold a `Weak` to it.
#[derive(Debug, Default)]
pub(crate) struct WorldToken;

/// Where an object lives once it has been added to a world.
#[derive(Debug, Clone)]
pub(crate) struct Attachment {
    world: Weak<WorldToken>,
    id: QuditId,
}

/// A named, typed quantum variable (a qudit).
///
/// Objects are created detached and become usable in effects once a world has
/// accepted them through `World::add_object`, which hands back an attached
/// copy. The copy refers to its world weakly: the world owns the object, the
/// object only knows where it belongs.
#[derive(Debug, Clone)]
pub struct QuantumObject {
    name: String,
    domain: ValueDomain,
    initial: u64,
    attachment: Option<Attachment>,
}

impl QuantumObject {
    /// Creates a detached object with an integer-encoded initial value.
    pub fn new(name: impl Into<String>, domain: ValueDomain, initial: u64) -> Self {
        Self { name: name.into(), domain, initial, attachment: None }
    }

    /// A two-state object starting at `initial` (0 or 1).
    pub fn qubit(name: impl Into<String>, initial: u64) -> Self {
        Self::new(name, ValueDomain::integer(2), initial)
    }

    /// Creates a detached object over a symbolic enumeration.
    pub fn symbolic<I, S>(name: impl Into<String>, labels: I, initial: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let domain = ValueDomain::symbolic(labels);
        let encoded = domain.encode(initial).ok_or_else(|| WorldError::InvalidOperation {
            message: format!("'{}' is not a label of object '{}'", initial, name),
        })?;
        Ok(Self::new(name, domain, encoded))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> usize {
        self.domain.dimension()
    }

    pub fn domain(&self) -> &ValueDomain {
        &self.domain
    }

    /// Integer encoding of the value the object was created with.
    pub fn initial(&self) -> u64 {
        self.initial
    }

    /// The initial value in display form.
    pub fn initial_value(&self) -> Result<Value> {
        self.domain.decode(self.initial)
    }

    /// Handle inside the owning world, if attached.
    pub fn id(&self) -> Option<QuditId> {
        self.attachment.as_ref().map(|a| a.id)
    }

    /// `true` once a world has accepted this object and is still alive.
    pub fn is_attached(&self) -> bool {
        self.attachment.as_ref().is_some_and(|a| a.world.strong_count() > 0)
    }

    pub(crate) fn attached(&self, world: &Arc<WorldToken>, id: QuditId) -> Self {
        Self { attachment: Some(Attachment { world: Arc::downgrade(world), id }), ..self.clone() }
    }

    pub(crate) fn detached(&self) -> Self {
        Self { attachment: None, ..self.clone() }
    }

    /// Resolves the handle of this object in the world identified by `world`.
    pub(crate) fn id_in(&self, world: &Arc<WorldToken>) -> Result<QuditId> {
        match &self.attachment {
            Some(a) if Weak::ptr_eq(&a.world, &Arc::downgrade(world)) => Ok(a.id),
            _ => Err(WorldError::UnattachedObject { name: self.name.clone() }),
        }
    }
}

impl fmt::Display for QuantumObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[d={}]", self.name, self.dimension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_follows_world_lifetime() {
        let token = Arc::new(WorldToken);
        let obj = QuantumObject::qubit("q", 0);
        assert!(!obj.is_attached());
        assert!(obj.id_in(&token).is_err());

        let attached = obj.attached(&token, QuditId(3));
        assert!(attached.is_attached());
        assert_eq!(attached.id_in(&token), Ok(QuditId(3)));

        let other = Arc::new(WorldToken);
        assert_eq!(
            attached.id_in(&other),
            Err(WorldError::UnattachedObject { name: "q".to_string() })
        );

        drop(token);
        assert!(!attached.is_attached());
    }

    #[test]
    fn symbolic_initial_value_is_encoded() -> Result<()> {
        let obj = QuantumObject::symbolic("square", ["Empty", "Pawn"], "Pawn")?;
        assert_eq!(obj.initial(), 1);
        assert_eq!(obj.dimension(), 2);
        assert_eq!(obj.initial_value()?, Value::Symbol("Pawn".to_string()));
        assert!(QuantumObject::symbolic("square", ["Empty", "Pawn"], "King").is_err());
        Ok(())
    }
}
