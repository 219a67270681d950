//! Lock-free concurrent data structures supporting the retrieval engine.
//!
//! - `graph`: lock-free adjacency operations using atomics (ArcSwap +
//!   SkipMap), kept as the optional fast-path reference for the graph
//!   crate's concurrency gate (G3).

pub mod graph;
