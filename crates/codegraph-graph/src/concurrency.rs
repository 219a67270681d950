use crate::graph::InMemoryGraph;
use codegraph_core::{ConcurrencyConfig, RelationRegistry};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Concurrency gate around the in-memory graph (G3, spec §4.3).
///
/// `parking_lot::RwLock` is fair by construction — unlike
/// `std::sync::RwLock`, a waiting writer is not starved by a steady stream
/// of readers, which is the property §4.3 names explicitly. Compound write
/// sequences (e.g. the coordinator's node-then-edge insert) take the write
/// guard once for the whole sequence so no intermediate state is visible to
/// readers.
///
/// When `optimistic_read` is enabled, an additional sequence counter lets
/// callers that only need a point-in-time read skip the write-starvation
/// risk of a long-held read guard, at the cost of re-reading once if a
/// write happened concurrently — the seqlock pattern, generalized from the
/// `ArcSwap`/RCU style used by the lock-free adjacency reference in
/// `codegraph-concurrent`.
pub struct GraphGate {
    inner: RwLock<InMemoryGraph>,
    sequence: AtomicU64,
    optimistic_read: bool,
}

impl GraphGate {
    pub fn new(registry: Arc<RelationRegistry>, config: &ConcurrencyConfig) -> Self {
        Self {
            inner: RwLock::new(InMemoryGraph::new(registry)),
            sequence: AtomicU64::new(0),
            optimistic_read: config.optimistic_read,
        }
    }

    /// Runs `f` with shared (read) access to the graph.
    pub fn read<R>(&self, f: impl FnOnce(&InMemoryGraph) -> R) -> R {
        let guard = self.inner.read();
        f(&guard)
    }

    /// Runs `f` with exclusive (write) access to the graph. The whole
    /// closure executes under one write guard, so a multi-step write (e.g.
    /// "insert node, then its edges") is atomic with respect to readers.
    pub fn write<R>(&self, f: impl FnOnce(&InMemoryGraph) -> R) -> R {
        let guard = self.inner.write();
        let result = f(&guard);
        drop(guard);
        self.sequence.fetch_add(1, Ordering::Release);
        result
    }

    /// The current write-sequence stamp. Only meaningful when
    /// `optimistic_read` is enabled — callers can read without the lock,
    /// then compare `sequence()` before/after to detect a concurrent write
    /// and retry under `read` if it changed.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    pub fn optimistic_read_enabled(&self) -> bool {
        self.optimistic_read
    }
}
