//! Hint rule trait and shared check context.

use std::collections::BTreeMap;

use sqlparser::ast::Statement;

use crate::types::{FlowEdge, FlowNode, NodeWarning, OptimizationHint, QueryStats, TableUsage};

/// Read-only view of one analyzed statement, handed to every rule.
pub(crate) struct HintContext<'a> {
    /// Statement source text
    pub sql: &'a str,
    /// Parsed AST; absent for fallback results
    pub ast: Option<&'a Statement>,
    pub nodes: &'a [FlowNode],
    pub edges: &'a [FlowEdge],
    /// Keyed by lowercased table label
    pub table_usage: &'a BTreeMap<String, TableUsage>,
    pub stats: &'a QueryStats,
    pub has_select_star: bool,
    pub has_no_limit: bool,
}

/// What a rule produced: statement-level hints and warnings addressed to
/// specific nodes by ID.
#[derive(Default)]
pub(crate) struct RuleOutput {
    pub hints: Vec<OptimizationHint>,
    pub node_warnings: Vec<(String, NodeWarning)>,
}

impl RuleOutput {
    pub(crate) fn hint(&mut self, hint: OptimizationHint) {
        self.hints.push(hint);
    }

    pub(crate) fn warn_node(&mut self, node_id: impl Into<String>, warning: NodeWarning) {
        self.node_warnings.push((node_id.into(), warning));
    }
}

pub(crate) trait HintRule {
    /// Short rule name for diagnostics.
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput);
}
