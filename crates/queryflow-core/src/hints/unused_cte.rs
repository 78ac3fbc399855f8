//! A CTE is defined but nothing in the statement reads from it.

use std::collections::HashSet;

use crate::hints::rule::{HintContext, HintRule, RuleOutput};
use crate::types::{hint_codes, FlowNode, HintCategory, NodeKind, NodeWarning, OptimizationHint, TableCategory};

pub(crate) struct UnusedCte;

impl HintRule for UnusedCte {
    fn name(&self) -> &'static str {
        "unused-cte"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        let mut defined: Vec<(String, String)> = Vec::new();
        let mut referenced: HashSet<String> = HashSet::new();
        for node in ctx.nodes {
            collect(node, &mut defined, &mut referenced);
        }

        for (node_id, label) in defined {
            if referenced.contains(&label.to_lowercase()) {
                continue;
            }
            out.warn_node(
                node_id.clone(),
                NodeWarning::new("unused", format!("CTE '{label}' is never referenced")),
            );
            out.hint(
                OptimizationHint::warning(
                    HintCategory::Quality,
                    hint_codes::UNUSED_CTE,
                    format!("CTE '{label}' is defined but never referenced"),
                )
                .with_node(node_id),
            );
        }
    }
}

/// Walks the node tree collecting CTE definitions and CTE references.
fn collect(
    node: &FlowNode,
    defined: &mut Vec<(String, String)>,
    referenced: &mut HashSet<String>,
) {
    if node.kind == NodeKind::Cte {
        defined.push((node.id.clone(), node.label.clone()));
    }
    if node.kind == NodeKind::Table && node.table_category == Some(TableCategory::CteReference) {
        referenced.insert(node.label.to_lowercase());
    }
    if let Some(children) = &node.children {
        for child in children {
            collect(child, defined, referenced);
        }
    }
}
