use arc_swap::ArcSwap;
use codegraph_core::{Node, NodeId};
use crossbeam_skiplist::SkipMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NotFound(NodeId),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Lock-free adjacency graph, kept as the optional fast-path reference G3's
/// gate (`codegraph_graph::concurrency::GraphGate`) cites for its optional
/// optimistic-read path — not itself wired into the engine's read/write
/// path, since the gate's fair `RwLock` around `InMemoryGraph` is the
/// default the spec calls for.
///
/// - Nodes stored in `SkipMap` for lock-free gets/inserts.
/// - Adjacency lists per node are stored behind `ArcSwap<Vec<NodeId>>` to
///   allow lock-free reads and atomic updates (copy-on-write on the write
///   path via `rcu`).
#[derive(Debug, Default)]
pub struct LockFreeAdjacencyGraph {
    nodes: SkipMap<NodeId, Arc<Node>>,
    adjacency: SkipMap<NodeId, Arc<ArcSwap<Vec<NodeId>>>>,
}

impl LockFreeAdjacencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self, node: Node) {
        self.nodes.insert(node.id, Arc::new(node));
    }

    pub fn get_node(&self, id: NodeId) -> Option<Node> {
        self.nodes.get(&id).map(|e| e.value().as_ref().clone())
    }

    pub fn remove_node(&self, id: NodeId) {
        self.nodes.remove(&id);
        self.adjacency.remove(&id);
    }

    /// Adds a directed edge `from -> to`. Creates the adjacency entry if
    /// missing. Retries under contention via `rcu`'s copy-on-write loop.
    pub fn add_edge(&self, from: NodeId, to: NodeId) {
        let entry = self
            .adjacency
            .get(&from)
            .map(|e| e.value().clone())
            .unwrap_or_else(|| {
                let swap = Arc::new(ArcSwap::from_pointee(Vec::<NodeId>::new()));
                self.adjacency.insert(from, swap.clone());
                swap
            });

        entry.rcu(|current| {
            let mut next = (**current).clone();
            next.push(to);
            next
        });
    }

    /// Neighbors as a cloned `Vec`. Readers are lock-free.
    pub fn neighbors(&self, from: NodeId) -> Vec<NodeId> {
        self.adjacency
            .get(&from)
            .map(|e| (*e.value().load().as_ref()).clone())
            .unwrap_or_default()
    }

    pub fn find_nodes_by_label(&self, label: &str) -> Vec<Node> {
        self.nodes
            .iter()
            .filter(|e| e.value().label == label)
            .map(|e| e.value().as_ref().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn lockfree_graph_nodes() {
        let g = LockFreeAdjacencyGraph::new();
        let n = Node::new("Patient");
        let id = n.id;
        g.add_node(n);
        assert_eq!(g.get_node(id).unwrap().label, "Patient");
        assert_eq!(g.find_nodes_by_label("Patient").len(), 1);
    }

    #[test]
    fn lockfree_graph_edges() {
        let g = LockFreeAdjacencyGraph::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        g.add_edge(a, b);
        g.add_edge(a, c);
        let mut n = g.neighbors(a);
        n.sort();
        let mut expected = vec![b, c];
        expected.sort();
        assert_eq!(n, expected);
    }

    #[test]
    fn remove_node_clears_adjacency() {
        let g = LockFreeAdjacencyGraph::new();
        let n = Node::new("A");
        let id = n.id;
        g.add_node(n);
        g.add_edge(id, Uuid::new_v4());

        g.remove_node(id);

        assert!(g.get_node(id).is_none());
        assert!(g.neighbors(id).is_empty());
    }
}
