use crate::graph::InMemoryGraph;
use codegraph_core::{Direction, NodeId};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// One hop of a resolved path: the edge's relation type and the node it
/// arrives at (spec §4.2 shortest-path/all-paths return shape).
#[derive(Debug, Clone, PartialEq)]
pub struct PathStep {
    pub relation_type: String,
    pub node_id: NodeId,
}

/// A path from `source` (implicit, not repeated in `steps`) to the final
/// node of `steps`, along outgoing edges only.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub source: NodeId,
    pub steps: Vec<PathStep>,
    pub total_weight: f64,
}

impl Path {
    pub fn length(&self) -> usize {
        self.steps.len()
    }

    pub fn target(&self) -> NodeId {
        self.steps.last().map(|s| s.node_id).unwrap_or(self.source)
    }
}

/// Min-heap entry for Dijkstra. `Ord` is reversed so `BinaryHeap` (a max-heap)
/// pops the smallest distance first — the same trick as the teacher's
/// `DijkstraNode` in the original `codegraph-graph/src/traversal.rs`.
#[derive(Debug, Clone, PartialEq)]
struct DijkstraNode {
    node_id: NodeId,
    distance: f64,
}

impl Eq for DijkstraNode {}

impl Ord for DijkstraNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for DijkstraNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Single-source shortest path along outgoing edges only, using
/// non-negative edge weights (spec §4.2). Returns `None` if `source` or
/// `target` is unknown, or no path exists.
pub fn shortest_path(graph: &InMemoryGraph, source: NodeId, target: NodeId) -> Option<Path> {
    if graph.find_node(source).is_none() || graph.find_node(target).is_none() {
        return None;
    }
    if source == target {
        return Some(Path { source, steps: Vec::new(), total_weight: 0.0 });
    }

    let mut distances: HashMap<NodeId, f64> = HashMap::new();
    let mut came_from: HashMap<NodeId, (NodeId, String)> = HashMap::new();
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut heap = BinaryHeap::new();

    distances.insert(source, 0.0);
    heap.push(DijkstraNode { node_id: source, distance: 0.0 });

    while let Some(DijkstraNode { node_id, distance }) = heap.pop() {
        if !visited.insert(node_id) {
            continue;
        }
        if node_id == target {
            break;
        }

        for edge in graph.incident_edges(node_id, Direction::Outgoing, None) {
            let next = edge.target_id;
            if visited.contains(&next) {
                continue;
            }
            let candidate = distance + edge.weight.max(0.0);
            let better = distances.get(&next).map_or(true, |&d| candidate < d);
            if better {
                distances.insert(next, candidate);
                came_from.insert(next, (node_id, edge.relation_type.clone()));
                heap.push(DijkstraNode { node_id: next, distance: candidate });
            }
        }
    }

    if !distances.contains_key(&target) {
        return None;
    }

    let mut steps_rev = Vec::new();
    let mut current = target;
    while let Some((prev, relation_type)) = came_from.get(&current) {
        steps_rev.push(PathStep { relation_type: relation_type.clone(), node_id: current });
        current = *prev;
    }
    steps_rev.reverse();

    Some(Path {
        source,
        steps: steps_rev,
        total_weight: distances[&target],
    })
}

/// Every simple path (no repeated node) from `source` to `target` along
/// outgoing edges, up to `max_depth` hops, via DFS with visited-set
/// backtracking (spec §4.2). Paths are returned in discovery order; no
/// ranking is applied here — that is R2/R3's job.
pub fn all_paths(
    graph: &InMemoryGraph,
    source: NodeId,
    target: NodeId,
    max_depth: usize,
) -> Vec<Path> {
    let mut results = Vec::new();
    if graph.find_node(source).is_none() || graph.find_node(target).is_none() {
        return results;
    }

    let mut visited = HashSet::new();
    visited.insert(source);
    let mut steps = Vec::new();
    let mut weight = 0.0;

    dfs_all_paths(
        graph,
        source,
        source,
        target,
        max_depth,
        &mut visited,
        &mut steps,
        &mut weight,
        &mut results,
    );

    results
}

#[allow(clippy::too_many_arguments)]
fn dfs_all_paths(
    graph: &InMemoryGraph,
    source: NodeId,
    current: NodeId,
    target: NodeId,
    remaining_depth: usize,
    visited: &mut HashSet<NodeId>,
    steps: &mut Vec<PathStep>,
    weight: &mut f64,
    results: &mut Vec<Path>,
) {
    if remaining_depth == 0 {
        return;
    }

    for edge in graph.incident_edges(current, Direction::Outgoing, None) {
        let next = edge.target_id;
        if visited.contains(&next) {
            continue;
        }

        steps.push(PathStep { relation_type: edge.relation_type.clone(), node_id: next });
        *weight += edge.weight;

        if next == target {
            results.push(Path { source, steps: steps.clone(), total_weight: *weight });
        } else {
            visited.insert(next);
            dfs_all_paths(
                graph,
                source,
                next,
                target,
                remaining_depth - 1,
                visited,
                steps,
                weight,
                results,
            );
            visited.remove(&next);
        }

        *weight -= edge.weight;
        steps.pop();
    }
}
