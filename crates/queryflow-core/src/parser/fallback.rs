//! Regex fallback extractor for SQL the grammar parser cannot handle.
//!
//! Produces a minimal table → (filter) → select → result chain so the caller
//! always gets a renderable graph. Results built this way are marked partial.

use std::sync::OnceLock;

use regex::Regex;

use crate::builder::context::{GraphBuf, ParserContext};
use crate::types::{ClauseType, FlowNode, NodeKind, TableCategory};

/// Upper bound on extracted table references; garbage input can match a lot.
const MAX_TABLES: usize = 20;

fn table_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:FROM|JOIN|INTO|UPDATE)\s+([A-Za-z_`"\[][\w.`"\]]*)"#)
            .expect("table regex is valid")
    })
}

fn where_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bWHERE\b").expect("where regex is valid"))
}

/// Builds a best-effort partial graph from raw SQL text.
pub(crate) fn extract_partial_graph(sql: &str, ctx: &mut ParserContext, buf: &mut GraphBuf) {
    let mut labels: Vec<String> = Vec::new();
    for captures in table_regex().captures_iter(sql) {
        let raw = &captures[1];
        let label: String = raw
            .chars()
            .filter(|c| !matches!(c, '`' | '"' | '[' | ']'))
            .collect();
        if label.is_empty() || is_keyword(&label) {
            continue;
        }
        if !labels.iter().any(|seen| seen.eq_ignore_ascii_case(&label)) {
            labels.push(label);
        }
        if labels.len() >= MAX_TABLES {
            break;
        }
    }

    let mut table_ids = Vec::new();
    for label in &labels {
        let id = ctx.next_node_id(NodeKind::Table, label);
        ctx.record_table(label, TableCategory::Physical, &id);
        buf.push_node(
            FlowNode::table(id.clone(), label.clone(), TableCategory::Physical)
                .with_description("extracted without a full parse"),
        );
        table_ids.push(id);
    }

    let filter_id = if where_regex().is_match(sql) {
        ctx.stats.conditions += 1;
        let id = ctx.next_node_id(NodeKind::Filter, "WHERE");
        buf.push_node(FlowNode::new(id.clone(), NodeKind::Filter, "WHERE"));
        Some(id)
    } else {
        None
    };

    let select_id = ctx.next_node_id(NodeKind::Select, "SELECT");
    buf.push_node(
        FlowNode::new(select_id.clone(), NodeKind::Select, "SELECT")
            .with_description("partial extraction"),
    );
    let result_id = ctx.next_node_id(NodeKind::Result, "Result");
    buf.push_node(FlowNode::new(result_id.clone(), NodeKind::Result, "Result"));

    let upstream_target = filter_id.as_deref().unwrap_or(&select_id);
    for table_id in &table_ids {
        buf.link_with(ctx, table_id, upstream_target, |edge| {
            edge.with_clause("FROM", ClauseType::From)
        });
    }
    if let Some(filter_id) = &filter_id {
        buf.link_with(ctx, filter_id, &select_id, |edge| {
            edge.with_clause("WHERE", ClauseType::Where)
        });
    }
    buf.link_with(ctx, &select_id, &result_id, |edge| {
        edge.with_clause("RESULT", ClauseType::Result)
    });
}

fn is_keyword(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "select" | "where" | "set" | "values" | "dual" | "lateral" | "unnest"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dialect;

    fn run(sql: &str) -> (ParserContext, GraphBuf) {
        let mut ctx = ParserContext::new(Dialect::Generic, 10);
        let mut buf = GraphBuf::new();
        extract_partial_graph(sql, &mut ctx, &mut buf);
        (ctx, buf)
    }

    #[test]
    fn test_extracts_tables_and_filter() {
        let (ctx, buf) = run("SELEC broken FROM users JOIN orders ON x WHERE id = 1");
        assert_eq!(ctx.stats.tables, 2);
        assert!(buf.nodes.iter().any(|n| n.label == "users"));
        assert!(buf.nodes.iter().any(|n| n.kind == NodeKind::Filter));
        assert!(buf.nodes.iter().any(|n| n.kind == NodeKind::Result));
    }

    #[test]
    fn test_duplicate_tables_deduped_case_insensitive() {
        let (ctx, _) = run("FROM Users JOIN USERS JOIN users");
        assert_eq!(ctx.stats.tables, 1);
    }

    #[test]
    fn test_no_tables_still_yields_renderable_chain() {
        let (_, buf) = run("complete nonsense");
        assert!(buf.nodes.iter().any(|n| n.kind == NodeKind::Select));
        assert!(buf.nodes.iter().any(|n| n.kind == NodeKind::Result));
        assert_eq!(buf.edges.len(), 1);
    }

    #[test]
    fn test_edges_reference_existing_nodes() {
        let (_, buf) = run("FROM a JOIN b WHERE x");
        for edge in &buf.edges {
            assert!(buf.nodes.iter().any(|n| n.id == edge.source));
            assert!(buf.nodes.iter().any(|n| n.id == edge.target));
        }
    }
}
