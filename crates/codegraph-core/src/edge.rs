use crate::{EdgeId, NodeId, PropertyValue, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A directed, weighted, typed link between two nodes (spec §3).
///
/// Both endpoints must exist before the edge is queryable (tolerant
/// ingestion in G2 creates stub vertices rather than rejecting the edge —
/// see `codegraph_graph::graph::InMemoryGraph::add_edge`). The graph permits
/// multiple distinct edges between the same ordered endpoint pair, including
/// self-loops.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub relation_type: String,
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub properties: HashMap<String, PropertyValue>,
    pub weight: f64,
    pub created: Timestamp,
}

impl Edge {
    pub fn new<R: Into<String>>(source_id: NodeId, target_id: NodeId, relation_type: R) -> Self {
        Self {
            id: EdgeId::new_v4(),
            relation_type: relation_type.into(),
            source_id,
            target_id,
            properties: HashMap::new(),
            weight: 1.0,
            created: chrono::Utc::now(),
        }
    }

    pub fn with_id(mut self, id: EdgeId) -> Self {
        self.id = id;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
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
}
