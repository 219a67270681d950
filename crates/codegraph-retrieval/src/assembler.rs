use crate::retriever::RetrievalResult;
use codegraph_core::{NodeId, Result, RetrievalContext};
use std::collections::HashSet;

const NO_CONTEXT_SENTINEL: &str = "no context found";

/// Fixed linear token estimator, `ceil(char_count / 4)` (spec §4.8). An
/// approximation by design — precise tokenisation is a downstream concern.
pub fn estimate_tokens(text: &str) -> usize {
    let chars = text.chars().count();
    (chars + 3) / 4
}

/// Greedily packs a `RetrievalResult` into a UTF-8 payload bounded by
/// `max_tokens` (A1, spec §4.8). Packing order is strict priority: header,
/// then chunks, then nodes, then edges (only edges between two admitted
/// nodes). A chunk is never truncated mid-content — the packer stops the
/// moment the next whole chunk would overrun the budget.
///
/// `ctx` is checked once at entry (spec §5 "the assembler ... honour[s]"
/// the deadline) — assembly itself is synchronous in-memory work with no
/// further suspension points to recheck at.
pub fn assemble(
    result: &RetrievalResult,
    max_tokens: usize,
    ctx: &RetrievalContext,
) -> Result<String> {
    ctx.check()?;

    let header = format!(
        "strategy: {}\nretrieval_time_ms: {}\n",
        result.strategy, result.retrieval_time_ms
    );

    if estimate_tokens(&header) > max_tokens {
        return Ok(header);
    }

    let mut payload = header.clone();
    let mut content_added = false;

    if !result.chunks.is_empty() {
        let mut section = String::from("\n## Chunks\n");
        let mut any = false;
        for scored in &result.chunks {
            let entry = format!(
                "[chunk {}]\n{}\n(score: {:.4})\n\n",
                scored.chunk.id, scored.chunk.content, scored.score
            );
            let candidate = format!("{payload}{section}{entry}");
            if estimate_tokens(&candidate) > max_tokens {
                break;
            }
            section.push_str(&entry);
            any = true;
        }
        if any {
            payload.push_str(&section);
            content_added = true;
        }
    }

    let mut admitted: HashSet<NodeId> = HashSet::new();
    if !result.nodes.is_empty() {
        let mut section = String::from("\n## Nodes\n");
        let mut any = false;
        for node in &result.nodes {
            let entry = format!("- {} ({}): {:?}\n", node.id, node.label, node.properties);
            let candidate = format!("{payload}{section}{entry}");
            if estimate_tokens(&candidate) > max_tokens {
                break;
            }
            section.push_str(&entry);
            admitted.insert(node.id);
            any = true;
        }
        if any {
            payload.push_str(&section);
            content_added = true;
        }
    }

    if !result.edges.is_empty() && !admitted.is_empty() {
        let mut section = String::from("\n## Edges\n");
        let mut any = false;
        for edge in &result.edges {
            if !admitted.contains(&edge.source_id) || !admitted.contains(&edge.target_id) {
                continue;
            }
            let entry = format!(
                "- {} -{}-> {} (weight {})\n",
                edge.source_id, edge.relation_type, edge.target_id, edge.weight
            );
            let candidate = format!("{payload}{section}{entry}");
            if estimate_tokens(&candidate) > max_tokens {
                break;
            }
            section.push_str(&entry);
            any = true;
        }
        if any {
            payload.push_str(&section);
            content_added = true;
        }
    }

    if !content_added {
        payload.push('\n');
        payload.push_str(NO_CONTEXT_SENTINEL);
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retriever::RetrievalResult;
    use codegraph_core::{Chunk, EngineError, Node, ScoredChunk};

    fn empty_result(strategy: &str) -> RetrievalResult {
        RetrievalResult {
            nodes: Vec::new(),
            edges: Vec::new(),
            chunks: Vec::new(),
            matched_paths: Vec::new(),
            strategy: strategy.to_string(),
            retrieval_time_ms: 7,
            empty: true,
        }
    }

    #[test]
    fn empty_result_emits_sentinel_after_header() {
        let result = empty_result("empty");
        let payload = assemble(&result, 1000, &RetrievalContext::none()).unwrap();
        assert!(payload.contains(NO_CONTEXT_SENTINEL));
        assert!(payload.contains("strategy: empty"));
    }

    #[test]
    fn never_exceeds_token_budget_with_oversized_chunk() {
        let mut result = empty_result("vector-only");
        result.chunks = vec![
            ScoredChunk { chunk: Chunk::new("a".repeat(200)), score: 0.9 },
            ScoredChunk { chunk: Chunk::new("b".repeat(200)), score: 0.8 },
            ScoredChunk { chunk: Chunk::new("c".repeat(2000)), score: 0.7 },
        ];

        let payload = assemble(&result, 120, &RetrievalContext::none()).unwrap();
        assert!(estimate_tokens(&payload) <= 120);
        assert!(payload.contains(&"a".repeat(200)));
        assert!(!payload.contains(&"c".repeat(2000)));
    }

    #[test]
    fn header_alone_returned_when_it_overruns_budget() {
        let result = empty_result("hybrid");
        let payload = assemble(&result, 1, &RetrievalContext::none()).unwrap();
        assert_eq!(payload, "strategy: hybrid\nretrieval_time_ms: 7\n");
    }

    #[test]
    fn edges_only_include_both_endpoints_admitted() {
        let mut result = empty_result("graph-only");
        let a = Node::new("A");
        let b = Node::new("B");
        let dangling = codegraph_core::Edge::new(a.id, codegraph_core::NodeId::new_v4(), "REL");
        let internal = codegraph_core::Edge::new(a.id, b.id, "REL");
        result.nodes = vec![a, b];
        result.edges = vec![dangling.clone(), internal.clone()];

        let payload = assemble(&result, 10_000, &RetrievalContext::none()).unwrap();
        assert!(!payload.contains(&dangling.id.to_string()));
        assert!(payload.contains(&internal.relation_type));
    }

    #[test]
    fn cancelled_context_is_reported_instead_of_a_payload() {
        let result = empty_result("empty");
        let ctx = RetrievalContext::none();
        ctx.cancellation_token().cancel();
        let err = assemble(&result, 1000, &ctx).unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
    }
}
