use crate::pattern::{self, GraphPattern, MatchedPath, RankingStrategy};
use crate::resolver::{self, ResolutionTarget};
use codegraph_core::{
    Direction, Edge, Embedder, EngineError, Node, NodeId, Result, RetrievalContext, ScoredChunk,
};
use codegraph_graph::{GraphCoordinator, GraphGate, InMemoryGraph};
use std::collections::HashSet;
use std::time::Instant;

/// Structural hints accompanying a `RetrievalRequest` (spec §6 "graph_query
/// ... list of resolution targets, list of patterns, traversal hint").
#[derive(Debug, Clone, Default)]
pub struct GraphQuery {
    pub targets: Vec<ResolutionTarget>,
    pub patterns: Vec<GraphPattern>,
    pub traversal_hint: Option<usize>,
}

/// A single `retrieve` call's input (spec §6 `RetrievalRequest`).
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    pub query: String,
    pub top_k: usize,
    pub traversal_depth: usize,
    pub max_graph_nodes: usize,
    pub graph_query: Option<GraphQuery>,
}

impl RetrievalRequest {
    pub fn new<Q: Into<String>>(query: Q) -> Self {
        Self {
            query: query.into(),
            top_k: 5,
            traversal_depth: 2,
            max_graph_nodes: 50,
            graph_query: None,
        }
    }
}

/// The engine's one response shape (spec §6 `RetrievalResult`).
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub chunks: Vec<ScoredChunk>,
    pub matched_paths: Vec<MatchedPath>,
    pub strategy: String,
    pub retrieval_time_ms: u64,
    pub empty: bool,
}

impl RetrievalResult {
    fn empty(strategy: &str, elapsed_ms: u64) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            chunks: Vec::new(),
            matched_paths: Vec::new(),
            strategy: strategy.to_string(),
            retrieval_time_ms: elapsed_ms,
            empty: true,
        }
    }
}

/// Orchestrates R1 → R2, fuses with a vector-chunk search, deduplicates,
/// and enforces depth/size caps (R3, spec §4.7). One call per retrieval.
///
/// Graph access goes through `gate` in short synchronous closures (see
/// `expand_structurally` and the fusion step below); the lock is never held
/// across an `.await`, per spec §4.3's "no operation may call back into the
/// gate while holding it."
///
/// `ctx` carries the caller's cancellation signal and deadline (spec §5).
/// `Cancelled`/`Timeout` from any stage abort the whole call immediately —
/// a retrieval cancelled mid-flight returns that error, not a degraded
/// partial result (spec §8 scenario S5). Every other stage failure
/// (`StoreUnavailable`, `EmbedderUnavailable`, ...) still degrades.
pub async fn retrieve(
    gate: &GraphGate,
    coordinator: &GraphCoordinator,
    embedder: &dyn Embedder,
    request: &RetrievalRequest,
    ctx: &RetrievalContext,
) -> Result<RetrievalResult> {
    let start = Instant::now();

    // Stage 1: seed resolution (R1).
    let targets = request
        .graph_query
        .as_ref()
        .map(|gq| gq.targets.as_slice())
        .unwrap_or(&[]);
    let seeds = resolver::resolve_seeds(
        gate,
        coordinator,
        embedder,
        &request.query,
        targets,
        request.top_k,
        ctx,
    )
    .await?;
    let seeds = resolver::cap_seeds(seeds, request.max_graph_nodes);

    // Stage 2: structural expansion (R2), degrading to vector-only on failure.
    let (structural_nodes, matched_paths, structural_ok) =
        match gate.read(|graph| expand_structurally(graph, request, &seeds, ctx)) {
            Ok((nodes, paths)) => (nodes, paths, true),
            Err(err) if is_fatal(&err) => return Err(err),
            Err(err) => {
                tracing::warn!(error = %err, "structural expansion failed, degrading to vector-only");
                (Vec::new(), Vec::new(), false)
            }
        };

    // Stage 3: semantic retrieval, independent of stage 2, degrading to graph-only on failure.
    let (semantic_chunks, semantic_ok) =
        match semantic_retrieve(coordinator, embedder, request, ctx).await {
            Ok(chunks) => (chunks, true),
            Err(err) if is_fatal(&err) => return Err(err),
            Err(err) => {
                tracing::warn!(error = %err, "semantic retrieval failed, degrading to graph-only");
                (Vec::new(), false)
            }
        };

    if !structural_ok && !semantic_ok {
        let elapsed = start.elapsed().as_millis() as u64;
        return Ok(RetrievalResult::empty("empty", elapsed));
    }

    // Stage 4: fusion.
    let structural_chunks = chunks_linked_to(coordinator, &structural_nodes).await?;

    let mut node_order: Vec<NodeId> = Vec::new();
    let mut seen_nodes: HashSet<NodeId> = HashSet::new();
    for node in &structural_nodes {
        if seen_nodes.insert(node.id) {
            node_order.push(node.id);
        }
    }
    for scored in &semantic_chunks {
        if let Some(id) = scored.chunk.linked_node_id {
            if seen_nodes.insert(id) {
                node_order.push(id);
            }
        }
    }
    node_order.truncate(request.max_graph_nodes);

    let (nodes, edges) = gate.read(|graph| {
        let nodes: Vec<Node> = node_order.iter().filter_map(|id| graph.find_node(*id)).collect();
        let admitted: HashSet<NodeId> = nodes.iter().map(|n| n.id).collect();

        let mut seen_edges: HashSet<_> = HashSet::new();
        let mut edges = Vec::new();
        for id in &node_order {
            for edge in graph.incident_edges(*id, Direction::Both, None) {
                if admitted.contains(&edge.source_id)
                    && admitted.contains(&edge.target_id)
                    && seen_edges.insert(edge.id)
                {
                    edges.push(edge);
                }
            }
        }
        (nodes, edges)
    });

    // Captured before the merge below: the tag (§4.7 stage 5) is decided by
    // which *stage* produced results, not by the merged chunk set — a
    // structural node linked to an un-embedded chunk would otherwise make an
    // empty semantic stage look like it contributed.
    let semantic_contributed = !semantic_chunks.is_empty();

    let mut seen_chunks: HashSet<_> = HashSet::new();
    let mut chunks = Vec::new();
    for scored in structural_chunks.into_iter().chain(semantic_chunks.into_iter()) {
        if seen_chunks.insert(scored.chunk.id) {
            chunks.push(scored);
        }
    }

    // Stage 5: strategy tag.
    let structural_contributed = !structural_nodes.is_empty();
    let strategy = match (structural_contributed, semantic_contributed) {
        (true, true) => "hybrid",
        (false, true) => "vector-only",
        (true, false) => "graph-only",
        (false, false) => "empty",
    };

    let elapsed = start.elapsed().as_millis() as u64;
    let empty = nodes.is_empty() && chunks.is_empty() && edges.is_empty();

    Ok(RetrievalResult {
        nodes,
        edges,
        chunks,
        matched_paths,
        strategy: strategy.to_string(),
        retrieval_time_ms: elapsed,
        empty,
    })
}

/// Pure, synchronous: one declared-pattern walk per pattern (or the default
/// BOTH-direction k-hop expansion when no patterns are declared), run
/// entirely within a single gate read (spec §4.6/§4.7).
fn expand_structurally(
    graph: &InMemoryGraph,
    request: &RetrievalRequest,
    seeds: &[NodeId],
    ctx: &RetrievalContext,
) -> Result<(Vec<Node>, Vec<MatchedPath>)> {
    match request.graph_query.as_ref().filter(|gq| !gq.patterns.is_empty()) {
        Some(gq) => {
            let mut nodes = Vec::new();
            let mut seen = HashSet::new();
            let mut matched_paths = Vec::new();
            for declared in &gq.patterns {
                let paths =
                    pattern::execute(graph, declared, seeds, RankingStrategy::Hybrid, 100, ctx)?;
                for matched in &paths {
                    if let Some(&last) = matched.node_ids.last() {
                        if seen.insert(last) {
                            if let Some(node) = graph.find_node(last) {
                                nodes.push(node);
                            }
                        }
                    }
                }
                matched_paths.extend(paths);
            }
            Ok((nodes, matched_paths))
        }
        None => {
            ctx.check()?;
            let depth = request
                .graph_query
                .as_ref()
                .and_then(|gq| gq.traversal_hint)
                .unwrap_or(request.traversal_depth);
            let mut nodes = Vec::new();
            let mut seen = HashSet::new();
            for &seed in seeds {
                for node in graph.neighbors(seed, depth) {
                    if seen.insert(node.id) {
                        nodes.push(node);
                    }
                }
            }
            Ok((nodes, Vec::new()))
        }
    }
}

async fn semantic_retrieve(
    coordinator: &GraphCoordinator,
    embedder: &dyn Embedder,
    request: &RetrievalRequest,
    ctx: &RetrievalContext,
) -> Result<Vec<ScoredChunk>> {
    ctx.check()?;
    let vector = embedder.embed(&request.query).await?;
    coordinator.chunks().find_top_k_similar(&vector, request.top_k).await
}

async fn chunks_linked_to(coordinator: &GraphCoordinator, nodes: &[Node]) -> Result<Vec<ScoredChunk>> {
    let mut out = Vec::new();
    for node in nodes {
        let chunks = coordinator.chunks().find_by_linked_node_id(node.id).await?;
        for chunk in chunks {
            out.push(ScoredChunk { chunk, score: 1.0 });
        }
    }
    Ok(out)
}

/// Only `StoreUnavailable` and `EmbedderUnavailable` are degradation
/// candidates (spec §7 "the retrieval orchestrator recovers locally from
/// `StoreUnavailable` and `EmbedderUnavailable` ... all other kinds
/// propagate to the caller"). `Cancelled`/`Timeout` in particular always
/// abort the call outright (spec §8 scenario S5), as does `InvalidInput` or
/// `Internal` surfacing from a stage.
fn is_fatal(err: &EngineError) -> bool {
    !matches!(err, EngineError::StoreUnavailable(_) | EngineError::EmbedderUnavailable(_))
}
