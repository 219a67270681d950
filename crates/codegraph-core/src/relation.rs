use crate::RelationSemantics;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named, endpoint-typed, optionally directed category of edge (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationType {
    pub name: String,
    pub source_label: String,
    pub target_label: String,
    pub semantics: RelationSemantics,
    pub directed: bool,
}

impl RelationType {
    pub fn new<N: Into<String>, S: Into<String>, T: Into<String>>(
        name: N,
        source_label: S,
        target_label: T,
        semantics: RelationSemantics,
        directed: bool,
    ) -> Self {
        Self {
            name: name.into(),
            source_label: source_label.into(),
            target_label: target_label.into(),
            semantics,
            directed,
        }
    }
}

/// Process-wide relation-type registry keyed by `name` (G1, spec §4.1).
///
/// Registration is idempotent and advisory: an edge whose `relation_type` is
/// not registered is still accepted by the graph and merely logged — the
/// registry is metadata consumed by planners, not a validation gate, since
/// domain schemas evolve faster than the engine (spec §4.1 rationale).
#[derive(Debug, Default)]
pub struct RelationRegistry {
    types: RwLock<HashMap<String, RelationType>>,
}

impl RelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every relation type in `list`, overwriting any existing
    /// entry with the same name. Idempotent — registering the same list
    /// twice leaves the registry unchanged.
    pub fn register(&self, list: impl IntoIterator<Item = RelationType>) {
        let mut types = self.types.write();
        for rt in list {
            types.insert(rt.name.clone(), rt);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<RelationType> {
        self.types.read().get(name).cloned()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.types.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let registry = RelationRegistry::new();
        let rt = RelationType::new(
            "TREATS",
            "Doctor",
            "Patient",
            RelationSemantics::Association,
            true,
        );
        registry.register(vec![rt.clone()]);
        registry.register(vec![rt]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregistered_relation_type_is_not_registered() {
        let registry = RelationRegistry::new();
        assert!(!registry.is_registered("UNKNOWN"));
        assert!(registry.lookup("UNKNOWN").is_none());
    }
}
