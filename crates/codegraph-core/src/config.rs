use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Retrieval-shaped tunables named throughout §4–§6: `top_k` (R1 seed count
/// and R3 semantic pull size), `traversal_depth` (R3's default pattern
/// depth), `max_graph_nodes` (fusion cap in R3), `max_tokens` (A1's packing
/// budget).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub traversal_depth: usize,
    pub max_graph_nodes: usize,
    pub max_tokens: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            traversal_depth: 2,
            max_graph_nodes: 50,
            max_tokens: 2048,
        }
    }
}

/// Toggles for the concurrency gate (G3, spec §4.3).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConcurrencyConfig {
    /// Optional optimistic-read fast path for single-node lookup. Off by
    /// default per spec §4.3.
    pub optimistic_read: bool,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self { optimistic_read: false }
    }
}

/// Per-retrieval deadline (spec §5 "Timeouts").
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TimeoutConfig {
    pub retrieval_deadline_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { retrieval_deadline_ms: 5000 }
    }
}

/// Embedding dimension the `Embedder` and `ChunkStore` must agree on
/// (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EmbeddingConfig {
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dimension: 384 }
    }
}

/// Root configuration for the engine. Configuration *loading* (file
/// formats, environment wiring, secrets, hot reload) is an outer-surface
/// concern the spec places out of scope (§1 Non-goals); this struct and its
/// `load` constructor exist only because the retrieval parameters
/// themselves are configurable per §4–§6, and the crate's ambient stack
/// still follows the teacher's layered `config::Config` idiom for getting
/// values into this struct.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct EngineConfig {
    pub retrieval: RetrievalConfig,
    pub concurrency: ConcurrencyConfig,
    pub timeouts: TimeoutConfig,
    pub embedding: EmbeddingConfig,
}

impl EngineConfig {
    /// Layers defaults, an optional config file, then environment
    /// variables prefixed `CODEGRAPH__` with `__` as the nesting separator
    /// (e.g. `CODEGRAPH__RETRIEVAL__TOP_K=10`) — the same layering order
    /// and separator convention as the teacher's `ConfigManager`.
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let defaults = EngineConfig::default();
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&defaults)?);
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("CODEGRAPH")
                .separator("__")
                .try_parsing(true),
        );
        let settings: EngineConfig = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.retrieval.top_k > 0, "retrieval.top_k must be > 0");
        anyhow::ensure!(
            self.retrieval.max_graph_nodes > 0,
            "retrieval.max_graph_nodes must be > 0"
        );
        anyhow::ensure!(self.retrieval.max_tokens > 0, "retrieval.max_tokens must be > 0");
        anyhow::ensure!(
            self.timeouts.retrieval_deadline_ms > 0,
            "timeouts.retrieval_deadline_ms must be > 0"
        );
        anyhow::ensure!(self.embedding.dimension > 0, "embedding.dimension must be > 0");
        Ok(())
    }
}
