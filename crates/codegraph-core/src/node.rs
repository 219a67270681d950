use crate::{NodeId, PropertyValue, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A typed entity in the property graph (spec §3).
///
/// `id` is immutable once assigned. `label` is a short, non-empty, domain
/// defined identifier (e.g. `"Patient"`, `"Vendor"`). `vectorizable_content`
/// is free text an `Embedder` may turn into a vector for semantic lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    pub properties: HashMap<String, PropertyValue>,
    pub vectorizable_content: Option<String>,
    pub created: Timestamp,
    pub updated: Timestamp,
    pub version: u64,
}

impl Node {
    pub fn new<L: Into<String>>(label: L) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: NodeId::new_v4(),
            label: label.into(),
            properties: HashMap::new(),
            vectorizable_content: None,
            created: now,
            updated: now,
            version: 0,
        }
    }

    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    pub fn with_property<K: Into<String>, V: Into<PropertyValue>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_content<T: Into<String>>(mut self, content: T) -> Self {
        self.vectorizable_content = Some(content.into());
        self
    }

    /// Bumps `updated`/`version`, keeping `id`/`created` stable. Used by the
    /// dual-write coordinator (G4) when an "existing" flag requests
    /// re-indexing rather than fresh creation (spec §3 "Lifecycle").
    pub fn touch(&mut self) {
        self.updated = chrono::Utc::now();
        self.version += 1;
    }
}
