//! Predicate-level performance rules over the statement AST.

use sqlparser::ast::{
    BinaryOperator, DuplicateTreatment, Expr, FunctionArguments, GroupByExpr, JoinOperator, Select,
    SelectItem, Value,
};

use crate::builder::expression::{
    collect_function_calls, first_select, function_name, qualifier_prefixes, walk_expr,
};
use crate::hints::rule::{HintContext, HintRule, RuleOutput};
use crate::types::{hint_codes, HintCategory, OptimizationHint};

const GROUP_BY_WIDTH_LIMIT: usize = 4;

/// Functions that defeat index use when wrapped around a column in a
/// comparison.
const NON_SARGABLE_FUNCTIONS: &[&str] = &[
    "lower",
    "upper",
    "trim",
    "ltrim",
    "rtrim",
    "substr",
    "substring",
    "date",
    "year",
    "month",
    "day",
    "date_trunc",
    "date_part",
    "extract",
    "to_char",
    "coalesce",
];

fn top_select<'a>(ctx: &HintContext<'a>) -> Option<&'a Select> {
    ctx.ast.and_then(first_select)
}

fn projection_exprs(select: &Select) -> impl Iterator<Item = &Expr> {
    select.projection.iter().filter_map(|item| match item {
        SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => Some(expr),
        _ => None,
    })
}

pub(crate) struct FilterPushdown;

impl HintRule for FilterPushdown {
    fn name(&self) -> &'static str {
        "filter-pushdown"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        if ctx.stats.joins == 0 {
            return;
        }
        let Some(selection) = top_select(ctx).and_then(|select| select.selection.as_ref()) else {
            return;
        };
        let prefixes = qualifier_prefixes(selection);
        if prefixes.len() == 1 {
            let table = prefixes.into_iter().next().unwrap_or_default();
            out.hint(
                OptimizationHint::info(
                    HintCategory::Performance,
                    hint_codes::FILTER_PUSHDOWN,
                    format!("WHERE references only '{table}'; the filter could run before the join"),
                )
                .with_suggestion("Filter the table in a subquery or CTE before joining"),
            );
        }
    }
}

pub(crate) struct EarlyCrossJoin;

impl HintRule for EarlyCrossJoin {
    fn name(&self) -> &'static str {
        "early-cross-join"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        let Some(select) = top_select(ctx) else {
            return;
        };
        for item in &select.from {
            let cross_first = item
                .joins
                .first()
                .is_some_and(|join| matches!(join.join_operator, JoinOperator::CrossJoin(_)));
            if cross_first && item.joins.len() > 1 {
                out.hint(
                    OptimizationHint::warning(
                        HintCategory::Performance,
                        hint_codes::EARLY_CROSS_JOIN,
                        "CROSS JOIN runs before the other joins and inflates the intermediate result",
                    )
                    .with_suggestion("Move the CROSS JOIN after the selective joins"),
                );
                return;
            }
        }
    }
}

pub(crate) struct SubqueryToJoin;

impl HintRule for SubqueryToJoin {
    fn name(&self) -> &'static str {
        "subquery-to-join"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        let Some(selection) = top_select(ctx).and_then(|select| select.selection.as_ref()) else {
            return;
        };
        let mut found = false;
        walk_expr(selection, &mut |expr| {
            if matches!(expr, Expr::InSubquery { .. } | Expr::Exists { .. }) {
                found = true;
            }
        });
        if found {
            out.hint(
                OptimizationHint::info(
                    HintCategory::Performance,
                    hint_codes::SUBQUERY_TO_JOIN,
                    "IN/EXISTS subquery in WHERE could be rewritten as a join",
                )
                .with_suggestion("A semi-join often lets the planner pick a better order"),
            );
        }
    }
}

pub(crate) struct NonSargablePredicate;

impl HintRule for NonSargablePredicate {
    fn name(&self) -> &'static str {
        "non-sargable-predicate"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        let Some(selection) = top_select(ctx).and_then(|select| select.selection.as_ref()) else {
            return;
        };
        let mut flagged = None;
        walk_expr(selection, &mut |expr| {
            if flagged.is_some() {
                return;
            }
            if let Expr::BinaryOp { left, op, right } = expr {
                if is_comparison(op) {
                    for side in [left.as_ref(), right.as_ref()] {
                        if let Some(name) = wrapping_function_over_column(side) {
                            flagged = Some(name);
                        }
                    }
                }
            }
        });
        if let Some(name) = flagged {
            out.hint(
                OptimizationHint::warning(
                    HintCategory::Performance,
                    hint_codes::NON_SARGABLE,
                    format!("{name}() wrapped around a column in WHERE prevents index use"),
                )
                .with_suggestion("Rewrite the predicate so the bare column is compared"),
            );
        }
    }
}

pub(crate) struct LeadingWildcard;

impl HintRule for LeadingWildcard {
    fn name(&self) -> &'static str {
        "leading-wildcard"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        let Some(selection) = top_select(ctx).and_then(|select| select.selection.as_ref()) else {
            return;
        };
        let mut found = false;
        walk_expr(selection, &mut |expr| {
            if let Expr::Like { pattern, .. } | Expr::ILike { pattern, .. } = expr {
                if let Expr::Value(value) = pattern.as_ref() {
                    if let Value::SingleQuotedString(text) = &value.value {
                        if text.starts_with('%') {
                            found = true;
                        }
                    }
                }
            }
        });
        if found {
            out.hint(
                OptimizationHint::warning(
                    HintCategory::Performance,
                    hint_codes::LEADING_WILDCARD,
                    "LIKE pattern starting with '%' cannot use an index",
                )
                .with_suggestion("Anchor the pattern, or use a full-text/trigram index"),
            );
        }
    }
}

pub(crate) struct CrossTableOr;

impl HintRule for CrossTableOr {
    fn name(&self) -> &'static str {
        "cross-table-or"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        let Some(selection) = top_select(ctx).and_then(|select| select.selection.as_ref()) else {
            return;
        };
        let mut found = false;
        walk_expr(selection, &mut |expr| {
            if let Expr::BinaryOp {
                left,
                op: BinaryOperator::Or,
                right,
            } = expr
            {
                let left_tables = qualifier_prefixes(left);
                let right_tables = qualifier_prefixes(right);
                if !left_tables.is_empty()
                    && !right_tables.is_empty()
                    && left_tables.is_disjoint(&right_tables)
                {
                    found = true;
                }
            }
        });
        if found {
            out.hint(
                OptimizationHint::info(
                    HintCategory::Performance,
                    hint_codes::CROSS_TABLE_OR,
                    "OR across columns of different tables blocks index use on both sides",
                )
                .with_suggestion("Split the query into a UNION of single-table predicates"),
            );
        }
    }
}

pub(crate) struct CountDistinct;

impl HintRule for CountDistinct {
    fn name(&self) -> &'static str {
        "count-distinct"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        let Some(select) = top_select(ctx) else {
            return;
        };
        for expr in projection_exprs(select) {
            let mut calls = Vec::new();
            collect_function_calls(expr, &mut calls);
            for call in calls {
                let distinct = match &call.args {
                    FunctionArguments::List(list) => {
                        list.duplicate_treatment == Some(DuplicateTreatment::Distinct)
                    }
                    _ => false,
                };
                if distinct && function_name(call) == "count" {
                    out.hint(
                        OptimizationHint::info(
                            HintCategory::Performance,
                            hint_codes::COUNT_DISTINCT,
                            "COUNT(DISTINCT ...) holds every distinct value in memory",
                        )
                        .with_suggestion(
                            "approx_count_distinct is much cheaper when exactness is not required",
                        ),
                    );
                    return;
                }
            }
        }
    }
}

pub(crate) struct UngatedAggregation;

impl HintRule for UngatedAggregation {
    fn name(&self) -> &'static str {
        "ungated-aggregation"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        if ctx.stats.aggregations == 0 || ctx.stats.joins == 0 {
            return;
        }
        let Some(select) = top_select(ctx) else {
            return;
        };
        let grouped = match &select.group_by {
            GroupByExpr::Expressions(exprs, _) => !exprs.is_empty(),
            GroupByExpr::All(_) => true,
        };
        if !grouped {
            out.hint(
                OptimizationHint::info(
                    HintCategory::Performance,
                    hint_codes::UNGATED_AGGREGATION,
                    "Aggregate over a join without GROUP BY collapses the whole join result",
                )
                .with_suggestion("Aggregate before joining if the join only adds detail rows"),
            );
        }
    }
}

pub(crate) struct WideGroupBy;

impl HintRule for WideGroupBy {
    fn name(&self) -> &'static str {
        "wide-group-by"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        let Some(select) = top_select(ctx) else {
            return;
        };
        if let GroupByExpr::Expressions(exprs, _) = &select.group_by {
            if exprs.len() > GROUP_BY_WIDTH_LIMIT {
                out.hint(
                    OptimizationHint::info(
                        HintCategory::Performance,
                        hint_codes::WIDE_GROUP_BY,
                        format!("GROUP BY over {} columns", exprs.len()),
                    )
                    .with_suggestion("Group on a key and join the descriptive columns back"),
                );
            }
        }
    }
}

fn is_comparison(op: &BinaryOperator) -> bool {
    matches!(
        op,
        BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::Lt
            | BinaryOperator::LtEq
            | BinaryOperator::Gt
            | BinaryOperator::GtEq
    )
}

/// Name of a known index-defeating function applied directly to a column.
fn wrapping_function_over_column(expr: &Expr) -> Option<String> {
    let Expr::Function(func) = expr else {
        return None;
    };
    let name = function_name(func);
    if !NON_SARGABLE_FUNCTIONS.contains(&name.as_str()) {
        return None;
    }
    let mut has_column = false;
    walk_expr(expr, &mut |e| {
        if matches!(e, Expr::Identifier(_) | Expr::CompoundIdentifier(_)) {
            has_column = true;
        }
    });
    has_column.then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hints::testutil::check_rule;

    #[test]
    fn test_filter_pushdown_single_table_where() {
        let out = check_rule(
            &FilterPushdown,
            "SELECT * FROM orders o JOIN users u ON o.user_id = u.id WHERE o.status = 'open'",
        );
        assert_eq!(out.hints.len(), 1);
        assert!(out.hints[0].message.contains("'o'"));
    }

    #[test]
    fn test_filter_pushdown_quiet_when_both_sides_filtered() {
        let out = check_rule(
            &FilterPushdown,
            "SELECT * FROM orders o JOIN users u ON o.user_id = u.id \
             WHERE o.status = 'open' AND u.active = 1",
        );
        assert!(out.hints.is_empty());
    }

    #[test]
    fn test_early_cross_join() {
        let out = check_rule(
            &EarlyCrossJoin,
            "SELECT * FROM a CROSS JOIN b JOIN c ON a.id = c.id",
        );
        assert_eq!(out.hints.len(), 1);
        assert_eq!(out.hints[0].kind, hint_codes::EARLY_CROSS_JOIN);
    }

    #[test]
    fn test_trailing_cross_join_ok() {
        let out = check_rule(
            &EarlyCrossJoin,
            "SELECT * FROM a JOIN c ON a.id = c.id CROSS JOIN b",
        );
        assert!(out.hints.is_empty());
    }

    #[test]
    fn test_in_subquery_suggests_join() {
        let out = check_rule(
            &SubqueryToJoin,
            "SELECT id FROM orders WHERE user_id IN (SELECT id FROM users WHERE active = 1)",
        );
        assert_eq!(out.hints.len(), 1);
        assert_eq!(out.hints[0].kind, hint_codes::SUBQUERY_TO_JOIN);
    }

    #[test]
    fn test_non_sargable_function() {
        let out = check_rule(
            &NonSargablePredicate,
            "SELECT id FROM users WHERE LOWER(email) = 'a@b.c'",
        );
        assert_eq!(out.hints.len(), 1);
        assert!(out.hints[0].message.contains("lower"));
    }

    #[test]
    fn test_function_over_literal_ok() {
        let out = check_rule(
            &NonSargablePredicate,
            "SELECT id FROM users WHERE email = LOWER('A@B.C')",
        );
        assert!(out.hints.is_empty());
    }

    #[test]
    fn test_leading_wildcard() {
        let out = check_rule(
            &LeadingWildcard,
            "SELECT id FROM users WHERE name LIKE '%smith'",
        );
        assert_eq!(out.hints.len(), 1);

        let out = check_rule(
            &LeadingWildcard,
            "SELECT id FROM users WHERE name LIKE 'smith%'",
        );
        assert!(out.hints.is_empty());
    }

    #[test]
    fn test_cross_table_or() {
        let out = check_rule(
            &CrossTableOr,
            "SELECT * FROM a JOIN b ON a.id = b.a_id WHERE a.x = 1 OR b.y = 2",
        );
        assert_eq!(out.hints.len(), 1);
        assert_eq!(out.hints[0].kind, hint_codes::CROSS_TABLE_OR);
    }

    #[test]
    fn test_same_table_or_ok() {
        let out = check_rule(
            &CrossTableOr,
            "SELECT * FROM a JOIN b ON a.id = b.a_id WHERE a.x = 1 OR a.y = 2",
        );
        assert!(out.hints.is_empty());
    }

    #[test]
    fn test_count_distinct() {
        let out = check_rule(&CountDistinct, "SELECT COUNT(DISTINCT user_id) FROM events");
        assert_eq!(out.hints.len(), 1);
        assert_eq!(out.hints[0].kind, hint_codes::COUNT_DISTINCT);

        let out = check_rule(&CountDistinct, "SELECT COUNT(user_id) FROM events");
        assert!(out.hints.is_empty());
    }

    #[test]
    fn test_ungated_aggregation() {
        let out = check_rule(
            &UngatedAggregation,
            "SELECT SUM(o.amount) FROM orders o JOIN users u ON o.user_id = u.id",
        );
        assert_eq!(out.hints.len(), 1);

        let out = check_rule(
            &UngatedAggregation,
            "SELECT u.id, SUM(o.amount) FROM orders o JOIN users u ON o.user_id = u.id \
             GROUP BY u.id",
        );
        assert!(out.hints.is_empty());
    }

    #[test]
    fn test_wide_group_by() {
        let out = check_rule(
            &WideGroupBy,
            "SELECT a, b, c, d, e, COUNT(*) FROM t GROUP BY a, b, c, d, e",
        );
        assert_eq!(out.hints.len(), 1);

        let out = check_rule(
            &WideGroupBy,
            "SELECT a, b, COUNT(*) FROM t GROUP BY a, b",
        );
        assert!(out.hints.is_empty());
    }
}
