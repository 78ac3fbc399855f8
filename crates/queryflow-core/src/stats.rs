//! Derived statistics over a finished statement graph.
//!
//! The builder counts what it sees (joins, tables, conditions); this module
//! computes what only the whole graph reveals: nesting depth, fan-out, the
//! critical path, the weighted complexity score, and per-node complexity
//! tags.

use std::collections::HashMap;

use crate::types::{
    Complexity, ComplexityBreakdown, ComplexityLevel, FlowEdge, FlowNode, LocalComplexity,
    NodeKind, QueryStats,
};

const JOIN_WEIGHT: u32 = 3;
const SUBQUERY_WEIGHT: u32 = 2;
const CTE_WEIGHT: u32 = 2;
const AGGREGATION_WEIGHT: u32 = 1;
const WINDOW_WEIGHT: u32 = 2;
const MAX_SCORE: u32 = 100;

/// Fills in the graph-derived stats fields and tags nodes with their local
/// complexity. Call once per statement, after the graph is complete.
pub(crate) fn finalize(nodes: &mut [FlowNode], edges: &[FlowEdge], stats: &mut QueryStats) {
    stats.max_cte_depth = max_cte_depth(nodes, 0);
    stats.max_fan_out = max_fan_out(nodes, edges);
    stats.critical_path_length = critical_path_length(nodes, edges);
    stats.complexity = score_complexity(stats);
    tag_local_complexity(nodes, edges);
}

/// Weighted score from the builder's raw counters, clamped to 0..=100.
pub(crate) fn score_complexity(stats: &QueryStats) -> Complexity {
    let breakdown = ComplexityBreakdown {
        joins: stats.joins as u32 * JOIN_WEIGHT,
        subqueries: stats.subqueries as u32 * SUBQUERY_WEIGHT,
        ctes: stats.ctes as u32 * CTE_WEIGHT,
        aggregations: stats.aggregations as u32 * AGGREGATION_WEIGHT,
        window_functions: stats.window_functions as u32 * WINDOW_WEIGHT,
    };
    let score = (breakdown.joins
        + breakdown.subqueries
        + breakdown.ctes
        + breakdown.aggregations
        + breakdown.window_functions)
        .min(MAX_SCORE);
    let level = match score {
        0..=4 => ComplexityLevel::Simple,
        5..=11 => ComplexityLevel::Moderate,
        12..=24 => ComplexityLevel::Complex,
        _ => ComplexityLevel::VeryComplex,
    };
    Complexity {
        score,
        level,
        breakdown,
    }
}

/// Deepest CTE nesting level: a top-level CTE is depth 1, a CTE defined
/// inside another CTE's sub-graph is depth 2, and so on.
fn max_cte_depth(nodes: &[FlowNode], level: usize) -> usize {
    let mut max = 0;
    for node in nodes {
        let here = if node.kind == NodeKind::Cte {
            level + 1
        } else {
            level
        };
        if node.kind == NodeKind::Cte {
            max = max.max(here);
        }
        if let Some(children) = &node.children {
            max = max.max(max_cte_depth(children, here));
        }
    }
    max
}

/// Maximum out-degree over every node, counting container sub-graph edges.
fn max_fan_out(nodes: &[FlowNode], edges: &[FlowEdge]) -> usize {
    let mut degree: HashMap<&str, usize> = HashMap::new();
    count_out_degrees(edges, &mut degree);
    for node in nodes {
        collect_child_degrees(node, &mut degree);
    }
    degree.values().copied().max().unwrap_or(0)
}

fn collect_child_degrees<'a>(node: &'a FlowNode, degree: &mut HashMap<&'a str, usize>) {
    if let Some(child_edges) = &node.child_edges {
        count_out_degrees(child_edges, degree);
    }
    if let Some(children) = &node.children {
        for child in children {
            collect_child_degrees(child, degree);
        }
    }
}

fn count_out_degrees<'a>(edges: &'a [FlowEdge], degree: &mut HashMap<&'a str, usize>) {
    for edge in edges {
        *degree.entry(edge.source.as_str()).or_insert(0) += 1;
    }
}

/// Length in nodes of the longest root-to-sink path over the top-level
/// edges. Cycles (self-referencing CTEs degraded by the builder) terminate
/// the walk instead of recursing.
fn critical_path_length(nodes: &[FlowNode], edges: &[FlowEdge]) -> usize {
    if nodes.is_empty() {
        return 0;
    }
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut has_incoming: HashMap<&str, bool> = HashMap::new();
    for node in nodes {
        has_incoming.entry(node.id.as_str()).or_insert(false);
    }
    for edge in edges {
        successors
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
        has_incoming.insert(edge.target.as_str(), true);
    }

    let mut memo: HashMap<&str, usize> = HashMap::new();
    let mut on_stack: Vec<&str> = Vec::new();
    let mut longest = 0;
    for node in nodes {
        if !has_incoming.get(node.id.as_str()).copied().unwrap_or(true) {
            longest = longest.max(walk(node.id.as_str(), &successors, &mut memo, &mut on_stack));
        }
    }
    // all-cycle graphs have no roots; every node still counts for itself
    longest.max(1)
}

fn walk<'a>(
    id: &'a str,
    successors: &HashMap<&'a str, Vec<&'a str>>,
    memo: &mut HashMap<&'a str, usize>,
    on_stack: &mut Vec<&'a str>,
) -> usize {
    if let Some(&cached) = memo.get(id) {
        return cached;
    }
    if on_stack.contains(&id) {
        return 0;
    }
    on_stack.push(id);
    let mut best = 0;
    if let Some(next) = successors.get(id) {
        for &target in next {
            best = best.max(walk(target, successors, memo, on_stack));
        }
    }
    on_stack.pop();
    memo.insert(id, best + 1);
    best + 1
}

/// Tags every node with a complexity bucket from its total degree at its own
/// graph level.
fn tag_local_complexity(nodes: &mut [FlowNode], edges: &[FlowEdge]) {
    let mut degree: HashMap<String, usize> = HashMap::new();
    for edge in edges {
        *degree.entry(edge.source.clone()).or_insert(0) += 1;
        *degree.entry(edge.target.clone()).or_insert(0) += 1;
    }
    for node in nodes.iter_mut() {
        let total = degree.get(&node.id).copied().unwrap_or(0);
        node.local_complexity = Some(match total {
            0..=2 => LocalComplexity::Low,
            3..=4 => LocalComplexity::Medium,
            _ => LocalComplexity::High,
        });
        if let (Some(children), Some(child_edges)) = (&mut node.children, &node.child_edges) {
            let child_edges = child_edges.clone();
            tag_local_complexity(children, &child_edges);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn node(id: &str, kind: NodeKind) -> FlowNode {
        FlowNode::new(id, kind, id)
    }

    fn edge(source: &str, target: &str) -> FlowEdge {
        FlowEdge::new(format!("edge_{source}_{target}"), source, target)
    }

    #[rstest]
    #[case(0, 0, 0, 0, 0, 0, ComplexityLevel::Simple)]
    #[case(1, 1, 0, 0, 0, 5, ComplexityLevel::Moderate)]
    #[case(2, 1, 1, 2, 0, 12, ComplexityLevel::Complex)]
    #[case(5, 3, 1, 1, 1, 26, ComplexityLevel::VeryComplex)]
    fn test_score_thresholds(
        #[case] joins: usize,
        #[case] subqueries: usize,
        #[case] ctes: usize,
        #[case] aggregations: usize,
        #[case] window_functions: usize,
        #[case] expected_score: u32,
        #[case] expected_level: ComplexityLevel,
    ) {
        let stats = QueryStats {
            joins,
            subqueries,
            ctes,
            aggregations,
            window_functions,
            ..Default::default()
        };
        let complexity = score_complexity(&stats);
        assert_eq!(complexity.score, expected_score);
        assert_eq!(complexity.level, expected_level);
    }

    #[test]
    fn test_score_clamps_at_100() {
        let stats = QueryStats {
            joins: 50,
            ..Default::default()
        };
        assert_eq!(score_complexity(&stats).score, 100);
    }

    #[test]
    fn test_critical_path_over_linear_chain() {
        let nodes = vec![
            node("a", NodeKind::Table),
            node("b", NodeKind::Filter),
            node("c", NodeKind::Select),
            node("d", NodeKind::Result),
        ];
        let edges = vec![edge("a", "b"), edge("b", "c"), edge("c", "d")];
        assert_eq!(critical_path_length(&nodes, &edges), 4);
    }

    #[test]
    fn test_critical_path_picks_longer_branch() {
        let nodes = vec![
            node("a", NodeKind::Table),
            node("b", NodeKind::Table),
            node("j", NodeKind::Join),
            node("f", NodeKind::Filter),
            node("r", NodeKind::Result),
        ];
        // a -> j -> f -> r, b -> j
        let edges = vec![edge("a", "j"), edge("b", "j"), edge("j", "f"), edge("f", "r")];
        assert_eq!(critical_path_length(&nodes, &edges), 4);
    }

    #[test]
    fn test_cycle_does_not_hang() {
        let nodes = vec![node("a", NodeKind::Table), node("b", NodeKind::Filter)];
        let edges = vec![edge("a", "b"), edge("b", "a")];
        assert_eq!(critical_path_length(&nodes, &edges), 1);
    }

    #[test]
    fn test_fan_out_counts_container_edges() {
        let mut container = node("cte", NodeKind::Cte);
        container.child_edges = Some(vec![edge("x", "y"), edge("x", "z"), edge("x", "w")]);
        container.children = Some(vec![]);
        let nodes = vec![container, node("r", NodeKind::Result)];
        let edges = vec![edge("cte", "r")];
        assert_eq!(max_fan_out(&nodes, &edges), 3);
    }

    #[test]
    fn test_nested_cte_depth() {
        let inner = node("inner", NodeKind::Cte);
        let mut outer = node("outer", NodeKind::Cte);
        outer.children = Some(vec![inner]);
        let nodes = vec![outer, node("r", NodeKind::Result)];
        assert_eq!(max_cte_depth(&nodes, 0), 2);
    }

    #[test]
    fn test_local_complexity_buckets() {
        let mut nodes = vec![
            node("hub", NodeKind::Join),
            node("a", NodeKind::Table),
            node("b", NodeKind::Table),
            node("c", NodeKind::Table),
            node("d", NodeKind::Table),
            node("r", NodeKind::Result),
        ];
        let edges = vec![
            edge("a", "hub"),
            edge("b", "hub"),
            edge("c", "hub"),
            edge("d", "hub"),
            edge("hub", "r"),
        ];
        tag_local_complexity(&mut nodes, &edges);
        assert_eq!(nodes[0].local_complexity, Some(LocalComplexity::High));
        assert_eq!(nodes[1].local_complexity, Some(LocalComplexity::Low));
        assert_eq!(nodes[5].local_complexity, Some(LocalComplexity::Low));
    }
}
