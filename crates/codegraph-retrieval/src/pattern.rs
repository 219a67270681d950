use codegraph_core::{Direction, NodeId, PropertyValue, Result, RetrievalContext};
use codegraph_graph::InMemoryGraph;
use serde::{Deserialize, Serialize};

/// A predicate applied to the node reached at a specific step index (spec
/// §4.6 `Constraint`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ConstraintKind {
    PropertyEquals { key: String, value: PropertyValue },
    PropertyIn { key: String, values: Vec<PropertyValue> },
    PropertyRange { key: String, min: f64, max: f64 },
    LabelMatch { label: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub step_index: usize,
    pub kind: ConstraintKind,
}

impl Constraint {
    fn is_satisfied(&self, node: &codegraph_core::Node) -> bool {
        match &self.kind {
            ConstraintKind::PropertyEquals { key, value } => {
                node.properties.get(key) == Some(value)
            }
            ConstraintKind::PropertyIn { key, values } => {
                node.properties.get(key).is_some_and(|v| values.contains(v))
            }
            ConstraintKind::PropertyRange { key, min, max } => node
                .properties
                .get(key)
                .and_then(|v| v.as_f64())
                .is_some_and(|n| n >= *min && n <= *max),
            ConstraintKind::LabelMatch { label } => &node.label == label,
        }
    }
}

/// One hop of a declared pattern (spec §4.6 `TraversalStep`). `target_label
/// = None` means wildcard; `relation_type = None` means any relation type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalStep {
    pub target_label: Option<String>,
    pub relation_type: Option<String>,
    pub direction: Direction,
}

impl TraversalStep {
    pub fn new(direction: Direction) -> Self {
        Self { target_label: None, relation_type: None, direction }
    }

    pub fn with_target_label<L: Into<String>>(mut self, label: L) -> Self {
        self.target_label = Some(label.into());
        self
    }

    pub fn with_relation_type<R: Into<String>>(mut self, relation_type: R) -> Self {
        self.relation_type = Some(relation_type.into());
        self
    }
}

/// A declared multi-hop traversal (spec §4.6 `GraphPattern`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphPattern {
    pub pattern_id: String,
    pub description: String,
    pub steps: Vec<TraversalStep>,
    pub constraints: Vec<Constraint>,
}

impl GraphPattern {
    pub fn new<I: Into<String>, D: Into<String>>(pattern_id: I, description: D) -> Self {
        Self {
            pattern_id: pattern_id.into(),
            description: description.into(),
            steps: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: TraversalStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// How `execute` scores a completed path (spec §4.6 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankingStrategy {
    PathLength,
    EdgeWeight,
    /// Inert placeholder: every path scores `1.0`. The spec (§9 Open
    /// Questions) leaves degree/betweenness centrality unspecified; rather
    /// than guess a formula, this keeps the strategy documented-inert.
    NodeCentrality,
    /// Inert placeholder here: the real semantic contribution is fused by
    /// R3, not computed per-path by the executor (spec §4.6).
    SemanticScore,
    /// Orders by `PathLength` pending fusion in R3 (spec §4.6).
    Hybrid,
}

/// A completed, scored walk through the graph (spec §4.6 `MatchedPath`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedPath {
    pub pattern_id: String,
    pub node_ids: Vec<NodeId>,
    pub relation_types: Vec<String>,
    pub score: f64,
    pub explanation: String,
}

struct PathState {
    nodes: Vec<NodeId>,
    relations: Vec<String>,
    weight_sum: f64,
}

/// Runs `pattern` from every id in `seeds`, returning the top `max_paths`
/// matches by `ranking` (spec §4.6 execution algorithm).
///
/// The frontier is never deduplicated within a step — paths with distinct
/// histories but the same current node are preserved, and cycles are
/// permitted, since the step count bounds the walk structurally.
///
/// `ctx` is checked before every step (spec §5 "cancellation is checked ...
/// before each pattern step"); the inner per-path/per-edge work within a
/// step stays synchronous and uninterrupted, per §5's note that there are
/// no suspension points inside the executor's inner loop.
pub fn execute(
    graph: &InMemoryGraph,
    pattern: &GraphPattern,
    seeds: &[NodeId],
    ranking: RankingStrategy,
    max_paths: usize,
    ctx: &RetrievalContext,
) -> Result<Vec<MatchedPath>> {
    let mut frontier: Vec<PathState> = seeds
        .iter()
        .filter(|id| graph.find_node(**id).is_some())
        .map(|id| PathState { nodes: vec![*id], relations: Vec::new(), weight_sum: 0.0 })
        .collect();

    for (i, step) in pattern.steps.iter().enumerate() {
        ctx.check()?;
        let mut next_frontier = Vec::new();

        for path in &frontier {
            let u = *path.nodes.last().unwrap();
            let edges = graph.incident_edges(u, step.direction, step.relation_type.as_deref());

            for edge in edges {
                let v = resolve_other_endpoint(u, &edge, step.direction);
                let Some(node) = graph.find_node(v) else { continue };

                if let Some(label) = &step.target_label {
                    if label != "*" && &node.label != label {
                        continue;
                    }
                }

                let step_constraints = pattern.constraints.iter().filter(|c| c.step_index == i);
                if step_constraints.clone().any(|c| !c.is_satisfied(&node)) {
                    continue;
                }

                let mut nodes = path.nodes.clone();
                nodes.push(v);
                let mut relations = path.relations.clone();
                relations.push(edge.relation_type.clone());

                next_frontier.push(PathState {
                    nodes,
                    relations,
                    weight_sum: path.weight_sum + edge.weight,
                });
            }
        }

        frontier = next_frontier;
    }

    let mut scored: Vec<MatchedPath> = frontier
        .into_iter()
        .map(|path| {
            let score = score_path(&path, ranking);
            let explanation = format!(
                "{} hop(s) via [{}]",
                path.relations.len(),
                path.relations.join(", ")
            );
            MatchedPath {
                pattern_id: pattern.pattern_id.clone(),
                node_ids: path.nodes,
                relation_types: path.relations,
                score,
                explanation,
            }
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(max_paths);
    Ok(scored)
}

fn resolve_other_endpoint(
    u: NodeId,
    edge: &codegraph_core::Edge,
    direction: Direction,
) -> NodeId {
    match direction {
        Direction::Outgoing => edge.target_id,
        Direction::Incoming => edge.source_id,
        Direction::Both => {
            if edge.source_id == u {
                edge.target_id
            } else {
                edge.source_id
            }
        }
    }
}

fn score_path(path: &PathState, ranking: RankingStrategy) -> f64 {
    match ranking {
        RankingStrategy::PathLength | RankingStrategy::Hybrid => 1.0 / path.nodes.len() as f64,
        RankingStrategy::EdgeWeight => path.weight_sum,
        RankingStrategy::NodeCentrality | RankingStrategy::SemanticScore => 1.0,
    }
}
