//! Structural presence checks: SELECT *, missing LIMIT, unguarded DML,
//! join/subquery excess, cartesian products.

use sqlparser::ast::{JoinConstraint, JoinOperator, Statement};

use crate::builder::expression::first_select;
use crate::hints::rule::{HintContext, HintRule, RuleOutput};
use crate::types::{hint_codes, HintCategory, OptimizationHint};

const JOIN_LIMIT: usize = 5;
const SUBQUERY_LIMIT: usize = 3;

pub(crate) struct SelectStar;

impl HintRule for SelectStar {
    fn name(&self) -> &'static str {
        "select-star"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        if ctx.has_select_star {
            out.hint(
                OptimizationHint::warning(
                    HintCategory::Performance,
                    hint_codes::SELECT_STAR,
                    "SELECT * fetches every column",
                )
                .with_suggestion("List only the columns the query actually needs"),
            );
        }
    }
}

pub(crate) struct MissingLimit;

impl HintRule for MissingLimit {
    fn name(&self) -> &'static str {
        "missing-limit"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        if !matches!(ctx.ast, Some(Statement::Query(_))) {
            return;
        }
        if ctx.has_no_limit {
            out.hint(
                OptimizationHint::info(
                    HintCategory::Performance,
                    hint_codes::MISSING_LIMIT,
                    "Query has no LIMIT and may return an unbounded result set",
                )
                .with_suggestion("Add a LIMIT clause when the full result is not needed"),
            );
        }
    }
}

pub(crate) struct MissingWhere;

impl HintRule for MissingWhere {
    fn name(&self) -> &'static str {
        "missing-where"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        match ctx.ast {
            Some(Statement::Update { selection: None, .. }) => {
                out.hint(
                    OptimizationHint::error(
                        HintCategory::Safety,
                        hint_codes::MISSING_WHERE,
                        "UPDATE without WHERE clause modifies every row",
                    )
                    .with_suggestion("Add a WHERE clause to scope the update"),
                );
            }
            Some(Statement::Delete(delete)) if delete.selection.is_none() => {
                out.hint(
                    OptimizationHint::error(
                        HintCategory::Safety,
                        hint_codes::MISSING_WHERE,
                        "DELETE without WHERE clause removes every row",
                    )
                    .with_suggestion("Add a WHERE clause, or use TRUNCATE if intentional"),
                );
            }
            _ => {}
        }
    }
}

pub(crate) struct ExcessiveJoins;

impl HintRule for ExcessiveJoins {
    fn name(&self) -> &'static str {
        "excessive-joins"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        if ctx.stats.joins > JOIN_LIMIT {
            out.hint(
                OptimizationHint::warning(
                    HintCategory::Performance,
                    hint_codes::EXCESSIVE_JOINS,
                    format!("Query joins {} tables", ctx.stats.joins + 1),
                )
                .with_suggestion("Consider staging intermediate results in a CTE or temp table"),
            );
        }
    }
}

pub(crate) struct ExcessiveSubqueries;

impl HintRule for ExcessiveSubqueries {
    fn name(&self) -> &'static str {
        "excessive-subqueries"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        if ctx.stats.subqueries > SUBQUERY_LIMIT {
            out.hint(
                OptimizationHint::warning(
                    HintCategory::Performance,
                    hint_codes::EXCESSIVE_SUBQUERIES,
                    format!("Query contains {} subqueries", ctx.stats.subqueries),
                )
                .with_suggestion("Flatten repeated subqueries into CTEs or joins"),
            );
        }
    }
}

pub(crate) struct CartesianRisk;

impl HintRule for CartesianRisk {
    fn name(&self) -> &'static str {
        "cartesian-risk"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        let Some(select) = ctx.ast.and_then(first_select) else {
            return;
        };
        if select.selection.is_some() {
            return;
        }

        let comma_join = select.from.len() > 1;
        let bare_cross = select
            .from
            .iter()
            .flat_map(|item| &item.joins)
            .any(|join| match &join.join_operator {
                JoinOperator::CrossJoin(constraint)
                | JoinOperator::Join(constraint)
                | JoinOperator::Inner(constraint) => matches!(constraint, JoinConstraint::None),
                _ => false,
            });

        if comma_join || bare_cross {
            out.hint(
                OptimizationHint::warning(
                    HintCategory::Safety,
                    hint_codes::CARTESIAN_RISK,
                    "Tables are combined with no join condition or filter",
                )
                .with_suggestion("Add explicit join conditions to avoid a cartesian product"),
            );
        }
    }
}
