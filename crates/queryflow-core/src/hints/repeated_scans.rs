//! The same physical table is scanned more than once in one statement.

use crate::hints::rule::{HintContext, HintRule, RuleOutput};
use crate::types::{hint_codes, HintCategory, NodeWarning, OptimizationHint, TableCategory};

pub(crate) struct RepeatedScans;

impl HintRule for RepeatedScans {
    fn name(&self) -> &'static str {
        "repeated-scans"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        let mut usages: Vec<_> = ctx
            .table_usage
            .values()
            .filter(|usage| usage.category == TableCategory::Physical && usage.count > 1)
            .collect();
        usages.sort_by(|a, b| a.label.cmp(&b.label));

        for usage in usages {
            for node_id in &usage.node_ids {
                out.warn_node(
                    node_id.clone(),
                    NodeWarning::new(
                        "repeated_scan",
                        format!("Table '{}' is scanned {} times", usage.label, usage.count),
                    ),
                );
            }
            out.hint(
                OptimizationHint::info(
                    HintCategory::Performance,
                    hint_codes::REPEATED_SCAN,
                    format!(
                        "Table '{}' is scanned {} times in this statement",
                        usage.label, usage.count
                    ),
                )
                .with_table(usage.label.clone())
                .with_suggestion("Stage the table once in a CTE and reuse it"),
            );
        }
    }
}
