//! Session/utility statements render as a single informational node.
//!
//! An ordered prefix table classifies the statement text; first match wins.
//! EXPLAIN precedes ANALYZE so `EXPLAIN ANALYZE ...` classifies as explain.
//! These nodes have no effect on stats or lineage.

use crate::builder::context::{GraphBuf, ParserContext};
use crate::builder::helpers::truncate_text;
use crate::types::{FlowNode, NodeKind};

const PATTERNS: &[(&str, &str)] = &[
    ("EXPLAIN", "Explain"),
    ("SET", "Set Session Variable"),
    ("USE", "Use Database"),
    ("SHOW", "Show"),
    ("DESCRIBE", "Describe"),
    ("DESC", "Describe"),
    ("START TRANSACTION", "Begin Transaction"),
    ("BEGIN", "Begin Transaction"),
    ("COMMIT", "Commit"),
    ("ROLLBACK", "Rollback"),
    ("SAVEPOINT", "Savepoint"),
    ("GRANT", "Grant"),
    ("REVOKE", "Revoke"),
    ("TRUNCATE", "Truncate Table"),
    ("VACUUM", "Vacuum"),
    ("ANALYZE", "Analyze"),
    ("PRAGMA", "Pragma"),
    ("DROP", "Drop"),
    ("ALTER", "Alter"),
    ("CREATE INDEX", "Create Index"),
    ("CREATE UNIQUE INDEX", "Create Index"),
    ("CREATE", "Create"),
    ("CALL", "Procedure Call"),
    ("EXEC", "Procedure Call"),
];

pub(crate) fn classify(sql: &str) -> &'static str {
    let upper = sql.trim_start().to_uppercase();
    for (prefix, label) in PATTERNS {
        if upper.starts_with(prefix) {
            return label;
        }
    }
    "Statement"
}

/// Emits the single operation node for an unrecognized statement.
pub(crate) fn build_utility(sql: &str, ctx: &mut ParserContext, buf: &mut GraphBuf) -> String {
    let label = classify(sql);
    let first_line = sql.trim().lines().next().unwrap_or_default();
    let id = ctx.next_node_id(NodeKind::Operation, label);
    buf.push_node(
        FlowNode::new(id.clone(), NodeKind::Operation, label)
            .with_description(truncate_text(first_line, 100)),
    );
    id
}
