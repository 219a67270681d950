use crate::assembler;
use crate::retriever::{self, RetrievalRequest, RetrievalResult};
use async_trait::async_trait;
use codegraph_core::{
    ChunkStore, Edge, EdgeStore, Embedder, EngineConfig, Node, NodeStore, RelationRegistry, Result,
    RetrievalContext,
};
use codegraph_graph::{GraphCoordinator, GraphGate, LruCache};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Wraps an `Embedder` with the crate's `LruCache`, keyed by the literal
/// query text, so a retrieval that embeds the same string twice (the
/// resolver's fallback and the retriever's semantic stage both embed
/// `request.query` when no targets are declared) does not repeat the work.
/// The cache is request-scoped by the caller's choice of TTL, not a
/// process-wide singleton — the teacher's `EmbeddingCache` in
/// `codegraph-vector` follows the same shape.
pub struct CachingEmbedder {
    inner: Arc<dyn Embedder>,
    cache: LruCache<String, Vec<f32>>,
}

impl CachingEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize, ttl: Duration) -> Self {
        Self { inner, cache: LruCache::new(capacity, ttl) }
    }
}

#[async_trait]
impl Embedder for CachingEmbedder {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.get(&text.to_string()) {
            return Ok(cached);
        }
        let vector = self.inner.embed(text).await?;
        self.cache.insert(text.to_string(), vector.clone());
        Ok(vector)
    }
}

/// Owns every handle G1–A1 and the store capabilities need: the relation
/// registry, the concurrency-gated graph (G2/G3), the dual-write
/// coordinator (G4), and the embedder. Constructed once per process (spec
/// §9 design note: "replace the global mutable state with an explicit
/// Engine value constructed once"); tests construct their own.
pub struct Engine {
    coordinator: GraphCoordinator,
    embedder: Arc<dyn Embedder>,
    config: EngineConfig,
}

/// Default capacity/TTL for the `CachingEmbedder` every `Engine` wraps its
/// embedder in. Generous enough to cover one retrieval's handful of embed
/// calls without becoming a long-lived cross-request cache.
const EMBEDDING_CACHE_CAPACITY: usize = 256;
const EMBEDDING_CACHE_TTL: Duration = Duration::from_secs(60);

impl Engine {
    /// `embedder` is wrapped in a `CachingEmbedder` so the resolver's
    /// fallback embed and the retriever's semantic-stage embed share one
    /// cached vector when they embed the same text within a request's TTL
    /// window.
    pub fn new(
        nodes: Arc<dyn NodeStore>,
        edges: Arc<dyn EdgeStore>,
        chunks: Arc<dyn ChunkStore>,
        embedder: Arc<dyn Embedder>,
        config: EngineConfig,
    ) -> Self {
        let registry = Arc::new(RelationRegistry::new());
        let gate = Arc::new(GraphGate::new(registry, &config.concurrency));
        let coordinator = GraphCoordinator::new(gate, nodes, edges, chunks);
        let embedder: Arc<dyn Embedder> = Arc::new(CachingEmbedder::new(
            embedder,
            EMBEDDING_CACHE_CAPACITY,
            EMBEDDING_CACHE_TTL,
        ));
        Self { coordinator, embedder, config }
    }

    /// Streams `nodes` then `edges` from the durable stores into G2 (spec
    /// §4.4 "Startup"). Idempotent: safe to call again after a reconnect.
    pub async fn load_from_store(&self, nodes: Vec<Node>, edges: Vec<Edge>) -> Result<()> {
        self.coordinator.load_from_store(nodes, edges).await
    }

    fn deadline_context(&self) -> RetrievalContext {
        RetrievalContext::with_timeout(
            CancellationToken::new(),
            self.config.timeouts.retrieval_deadline_ms,
        )
    }

    /// Runs one retrieval bound by the configured per-request deadline
    /// (spec §5 "Timeouts"), with no caller-side cancellation handle.
    pub async fn retrieve(&self, request: &RetrievalRequest) -> Result<RetrievalResult> {
        let ctx = self.deadline_context();
        self.retrieve_with(request, &ctx).await
    }

    /// Runs one retrieval bound by both the configured deadline and an
    /// externally held `CancellationToken` (spec §5 "retrieval accepts a
    /// caller-provided cancellation signal"; spec §8 scenario S5).
    pub async fn retrieve_cancellable(
        &self,
        request: &RetrievalRequest,
        cancellation: CancellationToken,
    ) -> Result<RetrievalResult> {
        let ctx = RetrievalContext::with_timeout(
            cancellation,
            self.config.timeouts.retrieval_deadline_ms,
        );
        self.retrieve_with(request, &ctx).await
    }

    async fn retrieve_with(
        &self,
        request: &RetrievalRequest,
        ctx: &RetrievalContext,
    ) -> Result<RetrievalResult> {
        let span = tracing::info_span!("retrieve", query = %request.query);
        let result = retriever::retrieve(
            self.coordinator.gate(),
            &self.coordinator,
            self.embedder.as_ref(),
            request,
            ctx,
        )
        .instrument(span)
        .await?;
        tracing::info!(strategy = %result.strategy, empty = result.empty, "retrieval complete");
        Ok(result)
    }

    /// Packs a `RetrievalResult` into a token-budgeted payload (A1, spec
    /// §4.8), reusing the same per-request deadline the retrieval ran
    /// under so a caller that already timed out does not also pay for
    /// assembly.
    pub fn assemble(&self, result: &RetrievalResult, max_tokens: usize) -> Result<String> {
        assembler::assemble(result, max_tokens, &self.deadline_context())
    }
}
