use crate::concurrency::GraphGate;
use codegraph_core::{ChunkStore, Edge, EdgeId, EdgeStore, EngineError, Node, NodeId, NodeStore, Result};
use std::sync::Arc;

/// Bridges the durable `NodeStore`/`EdgeStore`/`ChunkStore` triple with G2
/// (G4, spec §4.4). Generic over the capability traits rather than any
/// concrete database — the engine consumes only the thin contract (spec
/// §6), the same genericization the teacher's `CodeGraph` does not need
/// because it is hard-wired to RocksDB; here the store is an external
/// collaborator the caller supplies.
pub struct GraphCoordinator {
    gate: Arc<GraphGate>,
    nodes: Arc<dyn NodeStore>,
    edges: Arc<dyn EdgeStore>,
    chunks: Arc<dyn ChunkStore>,
}

impl GraphCoordinator {
    pub fn new(
        gate: Arc<GraphGate>,
        nodes: Arc<dyn NodeStore>,
        edges: Arc<dyn EdgeStore>,
        chunks: Arc<dyn ChunkStore>,
    ) -> Self {
        Self { gate, nodes, edges, chunks }
    }

    pub fn gate(&self) -> &Arc<GraphGate> {
        &self.gate
    }

    pub fn chunks(&self) -> &Arc<dyn ChunkStore> {
        &self.chunks
    }

    /// Streams the full node corpus, then the full edge corpus, from the
    /// durable stores into G2. Order matters: nodes before edges, or G2's
    /// tolerant-ingestion rule creates stub vertices for edges that arrive
    /// first. Sequential and idempotent — re-running yields the same graph
    /// (spec §4.4 "Startup").
    ///
    /// There is no `find_all` on `NodeStore`/`EdgeStore` (spec §6 keeps the
    /// capability surface minimal); callers that need a full corpus load
    /// pass it in directly, already fetched from their backing store.
    pub async fn load_from_store(&self, nodes: Vec<Node>, edges: Vec<Edge>) -> Result<()> {
        for node in nodes {
            self.gate.write(|graph| graph.add_node(node))?;
        }
        for edge in edges {
            self.gate.write(|graph| graph.add_edge(edge))?;
        }
        Ok(())
    }

    /// Persists `node` durably, then mirrors it into G2. On persistence
    /// failure the in-memory graph is untouched and the error propagates
    /// (spec §4.4 write contract). A failure writing the in-memory mirror
    /// after a successful persist leaves the durable store authoritative;
    /// the caller is expected to retry `load_from_store` for that node as
    /// the "background re-sync" the spec allows to be best-effort.
    pub async fn save_node(&self, node: Node) -> Result<Node> {
        let saved = self.nodes.save(node).await?;
        self.gate.write(|graph| graph.add_node(saved.clone()))?;
        Ok(saved)
    }

    pub async fn save_edge(&self, edge: Edge) -> Result<Edge> {
        let saved = self.edges.save(edge).await?;
        self.gate.write(|graph| graph.add_edge(saved.clone()))?;
        Ok(saved)
    }

    /// Deletes a node and its incident edges from both the durable stores
    /// and G2 (spec §3 "Lifecycle": deletion cascades).
    pub async fn delete_node(&self, id: NodeId) -> Result<()> {
        let incident = self.edges.find_by_node_id(id).await?;
        for edge in &incident {
            self.edges.delete_by_id(edge.id).await?;
        }
        self.nodes.delete_by_id(id).await?;
        self.gate.write(|graph| graph.remove_node(id))?;
        Ok(())
    }

    pub async fn delete_edge(&self, id: EdgeId) -> Result<()> {
        self.edges.delete_by_id(id).await?;
        self.gate.write(|graph| graph.remove_edge(id))?;
        Ok(())
    }

    /// Node lookup reads from G2 (spec §4.4 read contract).
    pub fn find_node(&self, id: NodeId) -> Option<Node> {
        self.gate.read(|graph| graph.find_node(id))
    }

    /// Edge-by-id falls back to `EdgeStore` when G2 doesn't have it
    /// in-memory (spec §4.4 read contract).
    pub async fn find_edge(&self, id: EdgeId) -> Result<Option<Edge>> {
        if let Some(edge) = self.gate.read(|graph| graph.get_edge(id)) {
            return Ok(Some(edge));
        }
        self.edges.find_by_id(id).await
    }

    /// Edge-by-relation-type falls back to `EdgeStore` (spec §4.4 read
    /// contract) since G2 has no relation-type index of its own.
    pub async fn find_edges_by_relation_type(&self, name: &str) -> Result<Vec<Edge>> {
        self.edges.find_by_relation_type(name).await
    }

    pub fn try_find_node_or_not_found(&self, id: NodeId) -> Result<Node> {
        self.find_node(id).ok_or_else(|| EngineError::NotFound(id.to_string()))
    }
}
