use crate::{cosine_similarity, Chunk, ChunkId, Edge, EdgeId, EngineError, Node, NodeId, Result, ScoredChunk};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

/// Durable node store capability (spec §6). An external collaborator; the
/// engine consumes only this thin contract.
#[async_trait]
pub trait NodeStore: Send + Sync {
    async fn save(&self, node: Node) -> Result<Node>;
    async fn save_all(&self, nodes: Vec<Node>) -> Result<Vec<Node>>;
    async fn find_by_id(&self, id: NodeId) -> Result<Option<Node>>;
    async fn find_by_label(&self, label: &str) -> Result<Vec<Node>>;
    async fn delete_by_id(&self, id: NodeId) -> Result<()>;
    async fn delete_all(&self) -> Result<()>;
}

/// Durable edge store capability (spec §6).
#[async_trait]
pub trait EdgeStore: Send + Sync {
    async fn save(&self, edge: Edge) -> Result<Edge>;
    async fn save_all(&self, edges: Vec<Edge>) -> Result<Vec<Edge>>;
    async fn find_by_id(&self, id: EdgeId) -> Result<Option<Edge>>;
    async fn find_by_node_id(&self, id: NodeId) -> Result<Vec<Edge>>;
    async fn find_by_relation_type(&self, name: &str) -> Result<Vec<Edge>>;
    async fn find_by_source_and_target_and_type(
        &self,
        source: NodeId,
        target: NodeId,
        relation_type: &str,
    ) -> Result<bool>;
    async fn delete_by_id(&self, id: EdgeId) -> Result<()>;
    async fn delete_all(&self) -> Result<()>;
}

/// Durable chunk store capability (spec §6). Similarity metric is cosine
/// over normalised vectors.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    async fn save(&self, chunk: Chunk) -> Result<Chunk>;
    async fn find_top_k_similar(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;
    async fn find_top_k_similar_with_label(
        &self,
        query_vector: &[f32],
        label: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>>;
    async fn find_by_linked_node_id(&self, id: NodeId) -> Result<Vec<Chunk>>;
    async fn delete_by_linked_node_id(&self, id: NodeId) -> Result<()>;
    async fn delete_all(&self) -> Result<()>;
}

/// Embedding capability (spec §6). `D` is fixed per deployment and must
/// match the `ChunkStore`'s declared dimension.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }
}

/// Deterministic, lightweight fallback embedder that uses a hash-based
/// projection. Useful for tests and environments without a real model —
/// grounded in the teacher's `HasherEmbeddingService`.
pub struct HasherEmbedder {
    dim: usize,
}

impl HasherEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dim: dimension }
    }
}

#[async_trait]
impl Embedder for HasherEmbedder {
    fn dimension(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut text = text.to_string();
        if text.len() > 4096 {
            text.truncate(4096);
        }

        let mut hash: u32 = 5381;
        for b in text.as_bytes() {
            hash = hash.wrapping_mul(33).wrapping_add(*b as u32);
        }
        let mut state = hash;
        let mut v = vec![0.0f32; self.dim];
        for val in v.iter_mut() {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            *val = ((state as f32 / u32::MAX as f32) - 0.5) * 2.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }
}

/// In-memory `NodeStore` reference implementation. Not a persistence
/// feature — a test double so `Engine` can run without a real database
/// (spec §1 still excludes persistent stores from the core's scope).
#[derive(Debug, Default)]
pub struct InMemoryNodeStore {
    nodes: DashMap<NodeId, Node>,
    by_label: DashMap<String, Arc<RwLock<HashSet<NodeId>>>>,
}

impl InMemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_label(&self, label: &str, id: NodeId) {
        let entry = self
            .by_label
            .entry(label.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(HashSet::new())));
        entry.write().insert(id);
    }

    fn unindex_label(&self, label: &str, id: NodeId) {
        if let Some(set) = self.by_label.get(label) {
            set.write().remove(&id);
        }
    }
}

#[async_trait]
impl NodeStore for InMemoryNodeStore {
    async fn save(&self, node: Node) -> Result<Node> {
        if node.label.is_empty() {
            return Err(EngineError::InvalidInput("node label must not be empty".into()));
        }
        if let Some(old) = self.nodes.get(&node.id) {
            if old.label != node.label {
                self.unindex_label(&old.label, node.id);
            }
        }
        self.index_label(&node.label, node.id);
        self.nodes.insert(node.id, node.clone());
        Ok(node)
    }

    async fn save_all(&self, nodes: Vec<Node>) -> Result<Vec<Node>> {
        let mut out = Vec::with_capacity(nodes.len());
        for n in nodes {
            out.push(self.save(n).await?);
        }
        Ok(out)
    }

    async fn find_by_id(&self, id: NodeId) -> Result<Option<Node>> {
        Ok(self.nodes.get(&id).map(|n| n.clone()))
    }

    async fn find_by_label(&self, label: &str) -> Result<Vec<Node>> {
        let Some(ids) = self.by_label.get(label) else {
            return Ok(Vec::new());
        };
        let ids = ids.read().clone();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.nodes.get(&id).map(|n| n.clone()))
            .collect())
    }

    async fn delete_by_id(&self, id: NodeId) -> Result<()> {
        if let Some((_, node)) = self.nodes.remove(&id) {
            self.unindex_label(&node.label, id);
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.nodes.clear();
        self.by_label.clear();
        Ok(())
    }
}

/// In-memory `EdgeStore` reference implementation, grounded in the
/// teacher's `InMemoryEdgeStore` (copy-on-write index rebuild per write).
#[derive(Debug, Default)]
pub struct InMemoryEdgeStore {
    edges: DashMap<EdgeId, Arc<Edge>>,
    by_node: DashMap<NodeId, Arc<Vec<EdgeId>>>,
    by_relation_type: DashMap<String, Arc<Vec<EdgeId>>>,
    rebuild_lock: RwLock<()>,
}

impl InMemoryEdgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_index<K: Eq + std::hash::Hash + Clone>(
        map: &DashMap<K, Arc<Vec<EdgeId>>>,
        key: K,
        edge_id: EdgeId,
    ) {
        if let Some(mut entry) = map.get_mut(&key) {
            let mut v: Vec<EdgeId> = entry.value().as_ref().clone();
            v.push(edge_id);
            *entry = Arc::new(v);
            return;
        }
        map.insert(key, Arc::new(vec![edge_id]));
    }

    fn remove_index<K: Eq + std::hash::Hash + Clone>(
        map: &DashMap<K, Arc<Vec<EdgeId>>>,
        key: &K,
        edge_id: EdgeId,
    ) {
        if let Some(mut entry) = map.get_mut(key) {
            let mut v = entry.value().as_ref().clone();
            v.retain(|e| *e != edge_id);
            *entry = Arc::new(v);
        }
    }

    fn reindex(&self, old: Option<Arc<Edge>>, new: &Arc<Edge>) {
        let _guard = self.rebuild_lock.write();
        if let Some(old_edge) = old {
            Self::remove_index(&self.by_node, &old_edge.source_id, old_edge.id);
            Self::remove_index(&self.by_node, &old_edge.target_id, old_edge.id);
            Self::remove_index(&self.by_relation_type, &old_edge.relation_type, old_edge.id);
        }
        Self::insert_index(&self.by_node, new.source_id, new.id);
        Self::insert_index(&self.by_node, new.target_id, new.id);
        Self::insert_index(&self.by_relation_type, new.relation_type.clone(), new.id);
    }
}

#[async_trait]
impl EdgeStore for InMemoryEdgeStore {
    async fn save(&self, edge: Edge) -> Result<Edge> {
        let arc = Arc::new(edge.clone());
        let old = self.edges.insert(edge.id, arc.clone());
        self.reindex(old, &arc);
        Ok(edge)
    }

    async fn save_all(&self, edges: Vec<Edge>) -> Result<Vec<Edge>> {
        let mut out = Vec::with_capacity(edges.len());
        for e in edges {
            out.push(self.save(e).await?);
        }
        Ok(out)
    }

    async fn find_by_id(&self, id: EdgeId) -> Result<Option<Edge>> {
        Ok(self.edges.get(&id).map(|e| e.value().as_ref().clone()))
    }

    async fn find_by_node_id(&self, id: NodeId) -> Result<Vec<Edge>> {
        let Some(ids) = self.by_node.get(&id) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| self.edges.get(id).map(|e| e.value().as_ref().clone()))
            .collect())
    }

    async fn find_by_relation_type(&self, name: &str) -> Result<Vec<Edge>> {
        let Some(ids) = self.by_relation_type.get(name) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| self.edges.get(id).map(|e| e.value().as_ref().clone()))
            .collect())
    }

    async fn find_by_source_and_target_and_type(
        &self,
        source: NodeId,
        target: NodeId,
        relation_type: &str,
    ) -> Result<bool> {
        Ok(self.edges.iter().any(|e| {
            e.source_id == source && e.target_id == target && e.relation_type == relation_type
        }))
    }

    async fn delete_by_id(&self, id: EdgeId) -> Result<()> {
        if let Some((_, old)) = self.edges.remove(&id) {
            Self::remove_index(&self.by_node, &old.source_id, id);
            Self::remove_index(&self.by_node, &old.target_id, id);
            Self::remove_index(&self.by_relation_type, &old.relation_type, id);
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.edges.clear();
        self.by_node.clear();
        self.by_relation_type.clear();
        Ok(())
    }
}

/// In-memory `ChunkStore` reference implementation. Brute-force cosine scan
/// — adequate for tests and small demo graphs, not a performance claim.
#[derive(Debug, Default)]
pub struct InMemoryChunkStore {
    chunks: DashMap<ChunkId, Chunk>,
    by_linked_node: DashMap<NodeId, Arc<Vec<ChunkId>>>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn top_k(&self, query: &[f32], k: usize, label: Option<&str>) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .filter(|c| {
                label.map_or(true, |l| {
                    c.metadata.get("label").and_then(|v| v.as_str()) == Some(l)
                })
            })
            .filter_map(|c| {
                c.embedding
                    .as_ref()
                    .map(|e| ScoredChunk { chunk: c.clone(), score: cosine_similarity(query, e) })
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn save(&self, chunk: Chunk) -> Result<Chunk> {
        if let Some(node_id) = chunk.linked_node_id {
            let entry = self
                .by_linked_node
                .entry(node_id)
                .or_insert_with(|| Arc::new(Vec::new()));
            let mut v = entry.value().as_ref().clone();
            v.push(chunk.id);
            *entry = Arc::new(v);
        }
        self.chunks.insert(chunk.id, chunk.clone());
        Ok(chunk)
    }

    async fn find_top_k_similar(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        Ok(self.top_k(query_vector, k, None))
    }

    async fn find_top_k_similar_with_label(
        &self,
        query_vector: &[f32],
        label: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        Ok(self.top_k(query_vector, k, Some(label)))
    }

    async fn find_by_linked_node_id(&self, id: NodeId) -> Result<Vec<Chunk>> {
        let Some(ids) = self.by_linked_node.get(&id) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| self.chunks.get(id).map(|c| c.clone()))
            .collect())
    }

    async fn delete_by_linked_node_id(&self, id: NodeId) -> Result<()> {
        if let Some((_, ids)) = self.by_linked_node.remove(&id) {
            for chunk_id in ids.iter() {
                self.chunks.remove(chunk_id);
            }
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.chunks.clear();
        self.by_linked_node.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn node_store_round_trip() {
        let store = InMemoryNodeStore::new();
        let node = Node::new("Patient").with_property("name", "Alice");
        let id = node.id;
        store.save(node.clone()).await.unwrap();
        let fetched = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched.id, node.id);
        assert_eq!(fetched.label, node.label);
    }

    #[tokio::test]
    async fn node_store_find_by_label() {
        let store = InMemoryNodeStore::new();
        store.save(Node::new("Patient")).await.unwrap();
        store.save(Node::new("Patient")).await.unwrap();
        store.save(Node::new("Doctor")).await.unwrap();
        assert_eq!(store.find_by_label("Patient").await.unwrap().len(), 2);
        assert_eq!(store.find_by_label("Doctor").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn edge_store_incidence_both_directions() {
        let store = InMemoryEdgeStore::new();
        let a = NodeId::new_v4();
        let b = NodeId::new_v4();
        let e = Edge::new(a, b, "TREATS");
        store.save(e.clone()).await.unwrap();
        assert_eq!(store.find_by_node_id(a).await.unwrap().len(), 1);
        assert_eq!(store.find_by_node_id(b).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn chunk_store_top_k_similar() {
        let store = InMemoryChunkStore::new();
        store
            .save(Chunk::new("a").with_embedding(vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .save(Chunk::new("b").with_embedding(vec![0.0, 1.0]))
            .await
            .unwrap();
        let results = store.find_top_k_similar(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.content, "a");
    }

    #[tokio::test]
    async fn hasher_embedder_is_deterministic() {
        let embedder = HasherEmbedder::new(16);
        let a = embedder.embed("hello world").await.unwrap();
        let b = embedder.embed("hello world").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }
}
