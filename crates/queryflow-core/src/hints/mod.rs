//! Optimization hint rules and registry.
//!
//! Rules inspect the finished graph, the statement AST, and the raw SQL, and
//! emit statement-level hints plus warnings addressed to individual nodes.
//! Overlapping findings are reconciled in a merge pass: a repeated-scan hint
//! for a table supersedes a duplicate-subquery hint for the same table.

pub(crate) mod rule;

mod dead_columns;
mod duplicate_subquery;
mod performance;
mod presence;
mod repeated_scans;
mod unused_cte;

use std::collections::HashSet;

use crate::types::hint_codes;

pub(crate) use rule::{HintContext, RuleOutput};

use rule::HintRule;

fn all_rules() -> Vec<Box<dyn HintRule>> {
    vec![
        Box::new(presence::SelectStar),
        Box::new(presence::MissingLimit),
        Box::new(presence::MissingWhere),
        Box::new(presence::ExcessiveJoins),
        Box::new(presence::ExcessiveSubqueries),
        Box::new(presence::CartesianRisk),
        Box::new(unused_cte::UnusedCte),
        Box::new(repeated_scans::RepeatedScans),
        Box::new(duplicate_subquery::DuplicateSubquery),
        Box::new(dead_columns::DeadColumns),
        Box::new(performance::FilterPushdown),
        Box::new(performance::EarlyCrossJoin),
        Box::new(performance::SubqueryToJoin),
        Box::new(performance::NonSargablePredicate),
        Box::new(performance::LeadingWildcard),
        Box::new(performance::CrossTableOr),
        Box::new(performance::CountDistinct),
        Box::new(performance::UngatedAggregation),
        Box::new(performance::WideGroupBy),
    ]
}

/// Runs every rule and reconciles overlapping findings.
pub(crate) fn run(ctx: &HintContext<'_>) -> RuleOutput {
    let mut out = RuleOutput::default();
    for rule in all_rules() {
        rule.check(ctx, &mut out);
    }
    merge(&mut out);
    out
}

fn merge(out: &mut RuleOutput) {
    let scanned_tables: HashSet<String> = out
        .hints
        .iter()
        .filter(|hint| hint.kind == hint_codes::REPEATED_SCAN)
        .filter_map(|hint| hint.table.clone())
        .collect();

    let mut seen = HashSet::new();
    out.hints.retain(|hint| {
        if hint.kind == hint_codes::DUPLICATE_SUBQUERY {
            if let Some(table) = &hint.table {
                if scanned_tables.contains(table) {
                    return false;
                }
            }
        }
        seen.insert((
            hint.kind.clone(),
            hint.message.clone(),
            hint.node_id.clone(),
            hint.table.clone(),
        ))
    });
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HintCategory, OptimizationHint};

    #[test]
    fn test_repeated_scan_supersedes_duplicate_subquery() {
        let mut out = RuleOutput::default();
        out.hint(
            OptimizationHint::info(
                HintCategory::Performance,
                hint_codes::REPEATED_SCAN,
                "Table 'orders' is scanned 2 times",
            )
            .with_table("orders"),
        );
        out.hint(
            OptimizationHint::info(
                HintCategory::Performance,
                hint_codes::DUPLICATE_SUBQUERY,
                "Similar subqueries over 'orders'",
            )
            .with_table("orders"),
        );
        out.hint(
            OptimizationHint::info(
                HintCategory::Performance,
                hint_codes::DUPLICATE_SUBQUERY,
                "Similar subqueries over 'users'",
            )
            .with_table("users"),
        );

        merge(&mut out);
        let kinds: Vec<(&str, Option<&str>)> = out
            .hints
            .iter()
            .map(|hint| (hint.kind.as_str(), hint.table.as_deref()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (hint_codes::REPEATED_SCAN, Some("orders")),
                (hint_codes::DUPLICATE_SUBQUERY, Some("users")),
            ]
        );
    }

    #[test]
    fn test_exact_duplicates_collapse() {
        let mut out = RuleOutput::default();
        for _ in 0..2 {
            out.hint(OptimizationHint::info(
                HintCategory::Performance,
                hint_codes::SELECT_STAR,
                "SELECT * fetches every column",
            ));
        }
        merge(&mut out);
        assert_eq!(out.hints.len(), 1);
    }

    #[test]
    fn test_full_run_on_simple_select_is_quiet() {
        let analyzed = testutil::analyze("SELECT id FROM users WHERE active = 1 LIMIT 10");
        let out = run(&analyzed.ctx());
        assert!(out.hints.is_empty(), "unexpected hints: {:?}", out.hints);
        assert!(out.node_warnings.is_empty());
    }
}
