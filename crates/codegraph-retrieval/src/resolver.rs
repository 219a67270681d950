use codegraph_core::{Embedder, NodeId, PropertyValue, Result, RetrievalContext};
use codegraph_graph::{GraphCoordinator, GraphGate};
use std::collections::HashMap;

/// One structural or semantic hint for seed resolution (spec §4.5 "targets").
#[derive(Debug, Clone)]
pub struct ResolutionTarget {
    pub description: String,
    pub type_hint: Option<String>,
    pub property_match: Option<HashMap<String, PropertyValue>>,
}

impl ResolutionTarget {
    pub fn new<D: Into<String>>(description: D) -> Self {
        Self { description: description.into(), type_hint: None, property_match: None }
    }

    pub fn with_type_hint<L: Into<String>>(mut self, label: L) -> Self {
        self.type_hint = Some(label.into());
        self
    }

    pub fn with_property_match(mut self, properties: HashMap<String, PropertyValue>) -> Self {
        self.property_match = Some(properties);
        self
    }
}

/// Resolves a query plus optional targets into an ordered, deduplicated set
/// of candidate seed node ids (R1, spec §4.5). Never fabricates ids — an
/// absence of matches at every stage yields the empty set.
///
/// Graph reads go through `gate` in short, synchronous critical sections so
/// the lock is never held across the `Embedder`/`ChunkStore` `.await`
/// points that follow (spec §4.3 "no operation may call back into the gate
/// while holding it").
///
/// `ctx` is checked before each `Embedder` call (spec §5 "cancellation is
/// checked at every suspension point") — the property-match stage is pure
/// and synchronous, so it has no check of its own.
pub async fn resolve_seeds(
    gate: &GraphGate,
    coordinator: &GraphCoordinator,
    embedder: &dyn Embedder,
    query: &str,
    targets: &[ResolutionTarget],
    top_k: usize,
    ctx: &RetrievalContext,
) -> Result<Vec<NodeId>> {
    let mut seeds = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for target in targets {
        let (Some(label), Some(properties)) = (&target.type_hint, &target.property_match) else {
            continue;
        };
        let candidates = gate.read(|graph| graph.nodes_by_label(label));
        for node in candidates {
            let matches = properties.iter().all(|(k, v)| node.properties.get(k) == Some(v));
            if matches && seen.insert(node.id) {
                seeds.push(node.id);
            }
        }
    }

    if !seeds.is_empty() {
        return Ok(seeds);
    }

    let query_text = targets
        .first()
        .map(|t| t.description.as_str())
        .unwrap_or(query);
    ctx.check()?;
    let vector = embedder.embed(query_text).await?;

    let chunks = coordinator.chunks().find_top_k_similar(&vector, top_k).await?;
    for scored in &chunks {
        if let Some(node_id) = scored.chunk.linked_node_id {
            if seen.insert(node_id) {
                seeds.push(node_id);
            }
        }
    }

    if !seeds.is_empty() {
        return Ok(seeds);
    }

    // Fall back to embedding the raw query (spec §4.5 step 3). When
    // `query_text` already equals `query` this degenerates to a no-op retry,
    // which is harmless — the chunk search is deterministic for the same
    // vector and returns the same (empty) result.
    ctx.check()?;
    let vector = embedder.embed(query).await?;
    let chunks = coordinator.chunks().find_top_k_similar(&vector, top_k).await?;
    for scored in &chunks {
        if let Some(node_id) = scored.chunk.linked_node_id {
            if seen.insert(node_id) {
                seeds.push(node_id);
            }
        }
    }

    Ok(seeds)
}

/// Caps `seeds` to `max_graph_nodes`, preserving order (spec §4.5
/// "`max_graph_nodes` ... caps the final seed set").
pub fn cap_seeds(mut seeds: Vec<NodeId>, max_graph_nodes: usize) -> Vec<NodeId> {
    seeds.truncate(max_graph_nodes);
    seeds
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{
        Chunk, ChunkStore, ConcurrencyConfig, HasherEmbedder, InMemoryChunkStore, InMemoryEdgeStore,
        InMemoryNodeStore, Node, RelationRegistry, RetrievalContext,
    };
    use std::sync::Arc;

    async fn setup() -> (Arc<GraphGate>, GraphCoordinator, HasherEmbedder) {
        let registry = Arc::new(RelationRegistry::new());
        let gate = Arc::new(GraphGate::new(registry, &ConcurrencyConfig::default()));
        let chunk_store = Arc::new(InMemoryChunkStore::new());
        let coordinator = GraphCoordinator::new(
            gate.clone(),
            Arc::new(InMemoryNodeStore::new()),
            Arc::new(InMemoryEdgeStore::new()),
            chunk_store,
        );
        (gate, coordinator, HasherEmbedder::new(8))
    }

    #[tokio::test]
    async fn property_match_target_resolves_without_embedding() {
        let (gate, coordinator, embedder) = setup().await;
        let node = Node::new("Patient").with_property("mrn", "123");
        let id = node.id;
        gate.write(|graph| graph.add_node(node.clone())).unwrap();

        let mut props = HashMap::new();
        props.insert("mrn".to_string(), "123".into());
        let targets = vec![ResolutionTarget::new("a patient")
            .with_type_hint("Patient")
            .with_property_match(props)];

        let seeds = resolve_seeds(
            &gate,
            &coordinator,
            &embedder,
            "find patient",
            &targets,
            5,
            &RetrievalContext::none(),
        )
        .await
        .unwrap();
        assert_eq!(seeds, vec![id]);
    }

    #[tokio::test]
    async fn semantic_fallback_resolves_via_linked_chunk() {
        let (gate, coordinator, embedder) = setup().await;
        let node = Node::new("Patient");
        let id = node.id;
        gate.write(|graph| graph.add_node(node.clone())).unwrap();

        let vector = embedder.embed("chronic condition").await.unwrap();
        coordinator
            .chunks()
            .save(Chunk::new("chronic condition").with_embedding(vector).with_linked_node(id))
            .await
            .unwrap();

        let seeds = resolve_seeds(
            &gate,
            &coordinator,
            &embedder,
            "chronic condition",
            &[],
            5,
            &RetrievalContext::none(),
        )
        .await
        .unwrap();
        assert_eq!(seeds, vec![id]);
    }

    #[tokio::test]
    async fn no_match_anywhere_returns_empty_not_fabricated() {
        let (gate, coordinator, embedder) = setup().await;
        let seeds = resolve_seeds(
            &gate,
            &coordinator,
            &embedder,
            "nothing here",
            &[],
            5,
            &RetrievalContext::none(),
        )
        .await
        .unwrap();
        assert!(seeds.is_empty());
    }
}
