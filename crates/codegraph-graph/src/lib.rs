pub mod cache;
pub mod concurrency;
pub mod coordinator;
pub mod graph;
pub mod traversal;

pub use cache::LruCache;
pub use concurrency::GraphGate;
pub use coordinator::GraphCoordinator;
pub use graph::{InMemoryGraph, STUB_VERTEX_LABEL};
pub use traversal::{all_paths, shortest_path, Path, PathStep};
