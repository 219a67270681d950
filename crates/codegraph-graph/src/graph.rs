use codegraph_core::{Direction, Edge, EdgeId, EngineError, Node, NodeId, RelationRegistry, Result};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Label given to a tolerant-ingestion stub vertex created when `add_edge`
/// references an unknown endpoint (spec §4.2, open question in DESIGN.md —
/// the spec says "no attributes", which this reads as no *properties*; the
/// `label` invariant (non-empty) still has to hold).
pub const STUB_VERTEX_LABEL: &str = "Unknown";

/// The in-memory property graph (G2, spec §4.2). A directed, weighted
/// pseudograph permitting parallel edges and self-loops.
///
/// Internal indexes mirror the spec's naming: `node_by_id`, `label_index`,
/// `edge_by_id`, plus outgoing/incoming adjacency per node id — grounded in
/// the teacher's `InMemoryEdgeStore` (`codegraph-graph/src/edges.rs`), which
/// uses the same by-id-plus-secondary-index shape for a single collection.
/// Here the shape is generalized across nodes *and* edges together, since
/// the spec's G2 owns both.
pub struct InMemoryGraph {
    registry: Arc<RelationRegistry>,
    node_by_id: DashMap<NodeId, Node>,
    label_index: DashMap<String, RwLock<HashSet<NodeId>>>,
    edge_by_id: DashMap<EdgeId, Edge>,
    outgoing: DashMap<NodeId, RwLock<Vec<EdgeId>>>,
    incoming: DashMap<NodeId, RwLock<Vec<EdgeId>>>,
}

impl InMemoryGraph {
    pub fn new(registry: Arc<RelationRegistry>) -> Self {
        Self {
            registry,
            node_by_id: DashMap::new(),
            label_index: DashMap::new(),
            edge_by_id: DashMap::new(),
            outgoing: DashMap::new(),
            incoming: DashMap::new(),
        }
    }

    fn index_label(&self, label: &str, id: NodeId) {
        self.label_index
            .entry(label.to_string())
            .or_insert_with(|| RwLock::new(HashSet::new()))
            .write()
            .insert(id);
    }

    fn unindex_label(&self, label: &str, id: NodeId) {
        if let Some(set) = self.label_index.get(label) {
            set.write().remove(&id);
        }
    }

    fn ensure_adjacency_slots(&self, id: NodeId) {
        self.outgoing.entry(id).or_insert_with(|| RwLock::new(Vec::new()));
        self.incoming.entry(id).or_insert_with(|| RwLock::new(Vec::new()));
    }

    /// Inserts or replaces a node. Fails with `InvalidInput` if `label` is
    /// empty (spec §4.2).
    pub fn add_node(&self, node: Node) -> Result<()> {
        if node.label.is_empty() {
            return Err(EngineError::InvalidInput("node label must not be empty".into()));
        }
        if let Some(old) = self.node_by_id.get(&node.id) {
            if old.label != node.label {
                self.unindex_label(&old.label, node.id);
            }
        }
        self.ensure_adjacency_slots(node.id);
        self.index_label(&node.label, node.id);
        self.node_by_id.insert(node.id, node);
        Ok(())
    }

    /// Inserts an edge. If either endpoint is absent it is created as a
    /// stub vertex with no properties and a warning is logged (tolerant
    /// ingestion, spec §4.2). Logs a warning, but does not fail, when
    /// `relation_type` is not in the registry (spec §4.1).
    pub fn add_edge(&self, edge: Edge) -> Result<()> {
        for (role, id) in [("source", edge.source_id), ("target", edge.target_id)] {
            if !self.node_by_id.contains_key(&id) {
                tracing::warn!(
                    node_id = %id,
                    role,
                    "tolerant ingestion: creating stub vertex for unknown edge endpoint"
                );
                self.add_node(Node::new(STUB_VERTEX_LABEL).with_id(id))?;
            }
        }
        if !self.registry.is_registered(&edge.relation_type) {
            tracing::warn!(
                relation_type = %edge.relation_type,
                "edge uses an unregistered relation type; accepting anyway"
            );
        }

        self.ensure_adjacency_slots(edge.source_id);
        self.ensure_adjacency_slots(edge.target_id);
        self.outgoing.get(&edge.source_id).unwrap().write().push(edge.id);
        self.incoming.get(&edge.target_id).unwrap().write().push(edge.id);
        self.edge_by_id.insert(edge.id, edge);
        Ok(())
    }

    /// Removes a node and all incident edges atomically from every index
    /// (spec §4.2, testable property #3).
    pub fn remove_node(&self, id: NodeId) -> Result<()> {
        let Some((_, node)) = self.node_by_id.remove(&id) else {
            return Ok(());
        };
        self.unindex_label(&node.label, id);

        let out_ids: Vec<EdgeId> = self
            .outgoing
            .get(&id)
            .map(|v| v.read().clone())
            .unwrap_or_default();
        let in_ids: Vec<EdgeId> = self
            .incoming
            .get(&id)
            .map(|v| v.read().clone())
            .unwrap_or_default();

        for edge_id in out_ids.into_iter().chain(in_ids) {
            self.remove_edge(edge_id)?;
        }

        self.outgoing.remove(&id);
        self.incoming.remove(&id);
        Ok(())
    }

    /// O(1) removal via `edge_by_id`. Unknown ids are a no-op (spec §4.2
    /// edge-case policy).
    pub fn remove_edge(&self, id: EdgeId) -> Result<()> {
        let Some((_, edge)) = self.edge_by_id.remove(&id) else {
            return Ok(());
        };
        if let Some(out) = self.outgoing.get(&edge.source_id) {
            out.write().retain(|e| *e != id);
        }
        if let Some(inc) = self.incoming.get(&edge.target_id) {
            inc.write().retain(|e| *e != id);
        }
        Ok(())
    }

    /// Unknown node id returns `None` rather than erroring (spec §4.2 edge
    /// case policy).
    pub fn find_node(&self, id: NodeId) -> Option<Node> {
        self.node_by_id.get(&id).map(|n| n.clone())
    }

    pub fn nodes_by_label(&self, label: &str) -> Vec<Node> {
        let Some(ids) = self.label_index.get(label) else {
            return Vec::new();
        };
        let ids = ids.read().clone();
        ids.into_iter().filter_map(|id| self.find_node(id)).collect()
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<Edge> {
        self.edge_by_id.get(&id).map(|e| e.clone())
    }

    pub fn node_count(&self) -> usize {
        self.node_by_id.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_by_id.len()
    }

    /// Incident edges of `id` in the requested direction, optionally
    /// filtered by relation type. Self-loops appear in both the outgoing
    /// and incoming lists, so `BOTH` legitimately lists them twice (spec
    /// §4.2 edge-case policy).
    pub fn incident_edges(
        &self,
        id: NodeId,
        direction: Direction,
        relation_type: Option<&str>,
    ) -> Vec<Edge> {
        let mut out = Vec::new();
        let want_out = matches!(direction, Direction::Outgoing | Direction::Both);
        let want_in = matches!(direction, Direction::Incoming | Direction::Both);

        if want_out {
            if let Some(ids) = self.outgoing.get(&id) {
                for edge_id in ids.read().iter() {
                    if let Some(e) = self.get_edge(*edge_id) {
                        if relation_type.is_none_or_matches(&e.relation_type) {
                            out.push(e);
                        }
                    }
                }
            }
        }
        if want_in {
            if let Some(ids) = self.incoming.get(&id) {
                for edge_id in ids.read().iter() {
                    if let Some(e) = self.get_edge(*edge_id) {
                        if relation_type.is_none_or_matches(&e.relation_type) {
                            out.push(e);
                        }
                    }
                }
            }
        }
        out
    }

    /// 1-hop neighbors in the requested direction, optionally filtered by
    /// relation type (spec §4.2 `neighbors_filtered`).
    pub fn neighbors_filtered(
        &self,
        id: NodeId,
        relation_type: Option<&str>,
        direction: Direction,
    ) -> Vec<Node> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for edge in self.incident_edges(id, direction, relation_type) {
            let other = if edge.source_id == id { edge.target_id } else { edge.source_id };
            if seen.insert(other) {
                if let Some(n) = self.find_node(other) {
                    result.push(n);
                }
            }
        }
        result
    }

    /// BFS over `BOTH` directions excluding the origin, up to `depth` hops.
    /// Tie-break among equal-depth nodes is insertion order from BFS
    /// enqueuing (spec §4.2).
    pub fn neighbors(&self, id: NodeId, depth: usize) -> Vec<Node> {
        if depth == 0 || self.find_node(id).is_none() {
            return Vec::new();
        }
        let mut visited = HashSet::new();
        visited.insert(id);
        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();
        queue.push_back((id, 0));
        let mut result = Vec::new();

        while let Some((current, d)) = queue.pop_front() {
            if d >= depth {
                continue;
            }
            for neighbor in self.neighbors_filtered(current, None, Direction::Both) {
                if visited.insert(neighbor.id) {
                    result.push(neighbor.clone());
                    queue.push_back((neighbor.id, d + 1));
                }
            }
        }
        result
    }

    /// The set of nodes reachable within `depth` hops (BOTH directions)
    /// from any seed, plus every edge whose endpoints are both in that set
    /// (spec §4.2 `extract_subgraph`).
    pub fn extract_subgraph(&self, seed_ids: &[NodeId], depth: usize) -> (Vec<Node>, Vec<Edge>) {
        let mut node_set: HashSet<NodeId> = HashSet::new();
        for &seed in seed_ids {
            if self.find_node(seed).is_some() {
                node_set.insert(seed);
            }
            for n in self.neighbors(seed, depth) {
                node_set.insert(n.id);
            }
        }

        let nodes: Vec<Node> = node_set.iter().filter_map(|id| self.find_node(*id)).collect();

        let mut edge_ids: HashSet<EdgeId> = HashSet::new();
        let mut edges = Vec::new();
        for &id in &node_set {
            for edge in self.incident_edges(id, Direction::Both, None) {
                if node_set.contains(&edge.source_id)
                    && node_set.contains(&edge.target_id)
                    && edge_ids.insert(edge.id)
                {
                    edges.push(edge);
                }
            }
        }

        (nodes, edges)
    }
}

trait OptionStrExt {
    fn is_none_or_matches(&self, value: &str) -> bool;
}

impl OptionStrExt for Option<&str> {
    fn is_none_or_matches(&self, value: &str) -> bool {
        match self {
            None => true,
            Some(want) => *want == value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> InMemoryGraph {
        InMemoryGraph::new(Arc::new(RelationRegistry::new()))
    }

    #[test]
    fn node_round_trip_preserves_id_label_properties() {
        let g = graph();
        let node = Node::new("Patient").with_property("name", "Alice");
        let id = node.id;
        g.add_node(node).unwrap();
        let fetched = g.find_node(id).unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.label, "Patient");
        assert_eq!(fetched.properties.get("name").unwrap().as_str(), Some("Alice"));
    }

    #[test]
    fn edge_incidence_both_directions() {
        let g = graph();
        let a = Node::new("Doctor");
        let b = Node::new("Patient");
        let (a_id, b_id) = (a.id, b.id);
        g.add_node(a).unwrap();
        g.add_node(b).unwrap();
        let edge = Edge::new(a_id, b_id, "TREATS");
        g.add_edge(edge.clone()).unwrap();

        let out = g.incident_edges(a_id, Direction::Outgoing, None);
        assert!(out.iter().any(|e| e.id == edge.id));
        let inc = g.incident_edges(b_id, Direction::Incoming, None);
        assert!(inc.iter().any(|e| e.id == edge.id));
    }

    #[test]
    fn remove_node_cascades_incident_edges() {
        let g = graph();
        let a = Node::new("Doctor");
        let b = Node::new("Patient");
        let (a_id, b_id) = (a.id, b.id);
        g.add_node(a).unwrap();
        g.add_node(b).unwrap();
        g.add_edge(Edge::new(a_id, b_id, "TREATS")).unwrap();

        g.remove_node(a_id).unwrap();

        assert!(g.find_node(a_id).is_none());
        assert!(g.incident_edges(b_id, Direction::Both, None).is_empty());
    }

    #[test]
    fn add_edge_creates_stub_vertex_for_unknown_endpoint() {
        let g = graph();
        let known = Node::new("Doctor");
        let known_id = known.id;
        g.add_node(known).unwrap();
        let unknown_id = NodeId::new_v4();

        g.add_edge(Edge::new(known_id, unknown_id, "TREATS")).unwrap();

        let stub = g.find_node(unknown_id).unwrap();
        assert_eq!(stub.label, STUB_VERTEX_LABEL);
    }

    #[test]
    fn neighbors_depth_is_union_of_smaller_depths() {
        let g = graph();
        let a = Node::new("A");
        let b = Node::new("B");
        let c = Node::new("C");
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        g.add_node(a).unwrap();
        g.add_node(b).unwrap();
        g.add_node(c).unwrap();
        g.add_edge(Edge::new(a_id, b_id, "REL")).unwrap();
        g.add_edge(Edge::new(b_id, c_id, "REL")).unwrap();

        let one_hop: HashSet<NodeId> = g.neighbors(a_id, 1).into_iter().map(|n| n.id).collect();
        let two_hop: HashSet<NodeId> = g.neighbors(a_id, 2).into_iter().map(|n| n.id).collect();

        assert_eq!(one_hop, HashSet::from([b_id]));
        assert_eq!(two_hop, HashSet::from([b_id, c_id]));
    }

    #[test]
    fn self_loop_appears_incoming_and_outgoing() {
        let g = graph();
        let a = Node::new("A");
        let a_id = a.id;
        g.add_node(a).unwrap();
        g.add_edge(Edge::new(a_id, a_id, "SELF")).unwrap();

        let both = g.incident_edges(a_id, Direction::Both, None);
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn unknown_node_operations_return_empty_not_error() {
        let g = graph();
        let unknown = NodeId::new_v4();
        assert!(g.find_node(unknown).is_none());
        assert!(g.neighbors(unknown, 2).is_empty());
        assert!(g.incident_edges(unknown, Direction::Both, None).is_empty());
    }

    #[test]
    fn extract_subgraph_includes_only_internal_edges() {
        let g = graph();
        let a = Node::new("A");
        let b = Node::new("B");
        let c = Node::new("C");
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        g.add_node(a).unwrap();
        g.add_node(b).unwrap();
        g.add_node(c).unwrap();
        g.add_edge(Edge::new(a_id, b_id, "REL")).unwrap();
        g.add_edge(Edge::new(b_id, c_id, "REL")).unwrap();

        let (nodes, edges) = g.extract_subgraph(&[a_id], 1);
        let node_ids: HashSet<NodeId> = nodes.iter().map(|n| n.id).collect();
        assert_eq!(node_ids, HashSet::from([a_id, b_id]));
        assert_eq!(edges.len(), 1);
        assert!(!node_ids.contains(&c_id));
    }
}
