//! Columns projected inside a CTE or derived table but never used outside it.
//!
//! Heuristic, text based: a container column counts as used when its name
//! appears (word-bounded, case-insensitive) anywhere in the graph text
//! outside the container's own subtree. Wildcard projections disable the
//! check for their container.

use crate::hints::rule::{HintContext, HintRule, RuleOutput};
use crate::types::{hint_codes, FlowEdge, FlowNode, HintCategory, NodeKind, OptimizationHint};

pub(crate) struct DeadColumns;

impl HintRule for DeadColumns {
    fn name(&self) -> &'static str {
        "dead-columns"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        let mut containers = Vec::new();
        for node in ctx.nodes {
            find_containers(node, &mut containers);
        }
        if containers.is_empty() {
            return;
        }

        for container in containers {
            let Some(columns) = projected_columns(container) else {
                continue;
            };

            let mut outer = String::new();
            for node in ctx.nodes {
                append_text_excluding(node, &container.id, &mut outer);
            }
            for edge in ctx.edges {
                append_edge_text(edge, &mut outer);
            }
            let outer = outer.to_lowercase();

            let dead: Vec<String> = columns
                .into_iter()
                .filter(|name| name != "*" && !word_appears(&outer, name))
                .collect();
            if dead.is_empty() {
                continue;
            }

            out.hint(
                OptimizationHint::info(
                    HintCategory::Quality,
                    hint_codes::DEAD_COLUMNS,
                    format!(
                        "'{}' projects columns never used outside it: {}",
                        container.label,
                        dead.join(", ")
                    ),
                )
                .with_node(container.id.clone())
                .with_suggestion("Drop unused columns from the inner SELECT"),
            );
        }
    }
}

fn find_containers<'a>(node: &'a FlowNode, out: &mut Vec<&'a FlowNode>) {
    if matches!(node.kind, NodeKind::Cte | NodeKind::Subquery) && node.children.is_some() {
        out.push(node);
    }
    if let Some(children) = &node.children {
        for child in children {
            find_containers(child, out);
        }
    }
}

/// Output column names of the container's select node; None when the
/// projection has a wildcard or no select node was captured.
fn projected_columns(container: &FlowNode) -> Option<Vec<String>> {
    let children = container.children.as_ref()?;
    let select = children
        .iter()
        .find(|child| child.kind == NodeKind::Select)?;
    let columns = select.columns.as_ref()?;
    if columns.iter().any(|column| column.name == "*" || column.name.ends_with(".*")) {
        return None;
    }
    Some(columns.iter().map(|column| column.name.clone()).collect())
}

/// Accumulates label/description/clause/column text of every node outside
/// the subtree rooted at `excluded_id`.
fn append_text_excluding(node: &FlowNode, excluded_id: &str, out: &mut String) {
    if node.id == excluded_id {
        return;
    }
    out.push_str(&node.label);
    out.push(' ');
    out.push_str(&node.description);
    out.push(' ');
    if let Some(columns) = &node.columns {
        for column in columns {
            out.push_str(&column.name);
            out.push(' ');
            out.push_str(&column.expression);
            out.push(' ');
        }
    }
    if let Some(child_edges) = &node.child_edges {
        for edge in child_edges {
            append_edge_text(edge, out);
        }
    }
    if let Some(children) = &node.children {
        for child in children {
            append_text_excluding(child, excluded_id, out);
        }
    }
}

fn append_edge_text(edge: &FlowEdge, out: &mut String) {
    if let Some(clause) = &edge.clause {
        out.push_str(clause);
        out.push(' ');
    }
}

/// Word-bounded search; `haystack` must already be lowercased. Identifiers
/// are plain words, so a byte scan beats compiling a regex per column.
fn word_appears(haystack: &str, word: &str) -> bool {
    let needle = word.to_lowercase();
    if needle.is_empty() {
        return false;
    }
    let bytes = haystack.as_bytes();
    let mut from = 0;
    while let Some(offset) = haystack[from..].find(&needle) {
        let start = from + offset;
        let end = start + needle.len();
        let open = start == 0 || !is_word_byte(bytes[start - 1]);
        let close = end == bytes.len() || !is_word_byte(bytes[end]);
        if open && close {
            return true;
        }
        from = start + 1;
    }
    false
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hints::testutil::check_rule;

    #[test]
    fn test_dead_column_detected() {
        let out = check_rule(
            &DeadColumns,
            "WITH recent AS (SELECT id, name, extra_blob FROM users) \
             SELECT id, name FROM recent",
        );
        assert_eq!(out.hints.len(), 1);
        assert_eq!(out.hints[0].kind, hint_codes::DEAD_COLUMNS);
        assert!(out.hints[0].message.contains("extra_blob"));
        assert!(!out.hints[0].message.contains("name,"));
    }

    #[test]
    fn test_word_match_requires_boundaries() {
        assert!(word_appears("where user_id = 1", "user_id"));
        assert!(word_appears("(score)>10", "score"));
        assert!(!word_appears("where user_id = 1", "id"));
        assert!(!word_appears("where user_identity = 1", "user_id"));
    }

    #[test]
    fn test_all_columns_used_ok() {
        let out = check_rule(
            &DeadColumns,
            "WITH recent AS (SELECT id, name FROM users) SELECT id, name FROM recent",
        );
        assert!(out.hints.is_empty());
    }

    #[test]
    fn test_wildcard_projection_skipped() {
        let out = check_rule(
            &DeadColumns,
            "WITH recent AS (SELECT * FROM users) SELECT id FROM recent",
        );
        assert!(out.hints.is_empty());
    }

    #[test]
    fn test_column_used_in_where_counts() {
        let out = check_rule(
            &DeadColumns,
            "WITH recent AS (SELECT id, score FROM users) \
             SELECT id FROM recent WHERE score > 10",
        );
        assert!(out.hints.is_empty());
    }
}
