use thiserror::Error;

/// Error taxonomy for the engine (spec §7). Kinds are descriptive, not a
/// wire contract — implementers surface these via whatever transport wraps
/// the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed request, missing required field, or a label/relation-type
    /// that exceeds the registry's advisory limits.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Explicit id lookup with no match. Only surfaced where an id was
    /// supplied by the caller — implicit traversal misses are not errors.
    #[error("not found: {0}")]
    NotFound(String),

    /// A downstream `NodeStore`/`EdgeStore`/`ChunkStore` call failed or
    /// timed out.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The `Embedder` refused or timed out.
    #[error("embedder unavailable: {0}")]
    EmbedderUnavailable(String),

    /// Cooperative cancellation was observed at a suspension point.
    #[error("cancelled")]
    Cancelled,

    /// The request deadline elapsed.
    #[error("timeout")]
    Timeout,

    /// An invariant violation detected at runtime. Should be unreachable;
    /// treat as a programmer error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Internal(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
