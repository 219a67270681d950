use crate::{ChunkId, NodeId, PropertyValue, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A text fragment intended for semantic retrieval (spec §3).
///
/// `embedding`, when present, must have the dimension configured once per
/// deployment (`EngineConfig::embedding.dimension`). `linked_node_id` is a
/// weak reference: lookup only, never ownership — if the node no longer
/// exists the link is ignored, not fatal (spec §3 invariants).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
    pub linked_node_id: Option<NodeId>,
    pub metadata: HashMap<String, PropertyValue>,
    pub created: Timestamp,
}

impl Chunk {
    pub fn new<C: Into<String>>(content: C) -> Self {
        Self {
            id: ChunkId::new_v4(),
            content: content.into(),
            embedding: None,
            linked_node_id: None,
            metadata: HashMap::new(),
            created: chrono::Utc::now(),
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_linked_node(mut self, node_id: NodeId) -> Self {
        self.linked_node_id = Some(node_id);
        self
    }
}

/// A `Chunk` paired with its similarity score against a query vector, as
/// returned by `ChunkStore::find_top_k_similar` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Cosine similarity between two equal-length vectors. Used by the
/// in-memory `ChunkStore` reference implementation and by R3's fallback
/// ranking. Returns 0.0 for mismatched or zero-norm vectors rather than
/// panicking or erroring — callers treat it as "no similarity signal".
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
