pub mod assembler;
pub mod engine;
pub mod pattern;
pub mod resolver;
pub mod retriever;

pub use assembler::{assemble, estimate_tokens};
pub use engine::{CachingEmbedder, Engine};
pub use pattern::{
    execute, Constraint, ConstraintKind, GraphPattern, MatchedPath, RankingStrategy, TraversalStep,
};
pub use resolver::{cap_seeds, resolve_seeds, ResolutionTarget};
pub use retriever::{retrieve, GraphQuery, RetrievalRequest, RetrievalResult};
