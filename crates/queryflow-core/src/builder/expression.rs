//! Expression walking: aggregate/window detection, subquery discovery,
//! predicate counting.
//!
//! `walk_expr` deliberately does not descend into subqueries; nested query
//! bodies are compiled (and counted) by the graph builder itself, so
//! expression-level walks stay scoped to one query level.

use sqlparser::ast::{
    Expr, Function, FunctionArg, FunctionArgExpr, FunctionArguments, Query, Select, SetExpr,
    Statement,
};

/// Function names treated as aggregates when not windowed.
pub(crate) const AGGREGATE_FUNCTIONS: &[&str] = &[
    "count",
    "sum",
    "avg",
    "min",
    "max",
    "array_agg",
    "string_agg",
    "group_concat",
    "listagg",
    "stddev",
    "stddev_pop",
    "stddev_samp",
    "variance",
    "var_pop",
    "var_samp",
    "median",
    "bool_and",
    "bool_or",
    "every",
    "bit_and",
    "bit_or",
    "approx_count_distinct",
    "percentile_cont",
    "percentile_disc",
];

/// Unqualified lowercase function name.
pub(crate) fn function_name(func: &Function) -> String {
    func.name
        .0
        .last()
        .and_then(|part| part.as_ident())
        .map(|ident| ident.value.to_lowercase())
        .unwrap_or_else(|| func.name.to_string().to_lowercase())
}

pub(crate) fn is_aggregate_call(func: &Function) -> bool {
    func.over.is_none() && AGGREGATE_FUNCTIONS.contains(&function_name(func).as_str())
}

pub(crate) fn is_window_call(func: &Function) -> bool {
    func.over.is_some()
}

/// Visits `expr` and all sub-expressions at the same query level.
pub(crate) fn walk_expr<'a, F: FnMut(&'a Expr)>(expr: &'a Expr, visitor: &mut F) {
    visitor(expr);
    match expr {
        Expr::BinaryOp { left, right, .. } => {
            walk_expr(left, visitor);
            walk_expr(right, visitor);
        }
        Expr::UnaryOp { expr: inner, .. } | Expr::Nested(inner) => walk_expr(inner, visitor),
        Expr::Cast { expr: inner, .. } => walk_expr(inner, visitor),
        Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => {
            if let Some(operand) = operand {
                walk_expr(operand, visitor);
            }
            for case_when in conditions {
                walk_expr(&case_when.condition, visitor);
                walk_expr(&case_when.result, visitor);
            }
            if let Some(else_result) = else_result {
                walk_expr(else_result, visitor);
            }
        }
        Expr::Function(func) => {
            if let FunctionArguments::List(arg_list) = &func.args {
                for arg in &arg_list.args {
                    match arg {
                        FunctionArg::Unnamed(FunctionArgExpr::Expr(inner))
                        | FunctionArg::Named {
                            arg: FunctionArgExpr::Expr(inner),
                            ..
                        } => walk_expr(inner, visitor),
                        FunctionArg::ExprNamed { name, arg, .. } => {
                            walk_expr(name, visitor);
                            if let FunctionArgExpr::Expr(inner) = arg {
                                walk_expr(inner, visitor);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        Expr::Between {
            expr: inner,
            low,
            high,
            ..
        } => {
            walk_expr(inner, visitor);
            walk_expr(low, visitor);
            walk_expr(high, visitor);
        }
        Expr::Like { expr: inner, pattern, .. }
        | Expr::ILike { expr: inner, pattern, .. }
        | Expr::SimilarTo { expr: inner, pattern, .. } => {
            walk_expr(inner, visitor);
            walk_expr(pattern, visitor);
        }
        Expr::IsNull(inner)
        | Expr::IsNotNull(inner)
        | Expr::IsTrue(inner)
        | Expr::IsNotTrue(inner)
        | Expr::IsFalse(inner)
        | Expr::IsNotFalse(inner) => walk_expr(inner, visitor),
        Expr::InList { expr: inner, list, .. } => {
            walk_expr(inner, visitor);
            for item in list {
                walk_expr(item, visitor);
            }
        }
        Expr::InSubquery { expr: inner, .. } => walk_expr(inner, visitor),
        Expr::Tuple(items) => {
            for item in items {
                walk_expr(item, visitor);
            }
        }
        _ => {}
    }
}

/// Function calls anywhere in `expr` (current query level only).
pub(crate) fn collect_function_calls<'a>(expr: &'a Expr, out: &mut Vec<&'a Function>) {
    walk_expr(expr, &mut |e| {
        if let Expr::Function(func) = e {
            out.push(func);
        }
    });
}

/// Subqueries directly embedded in `expr`: scalar subqueries, `IN (SELECT …)`,
/// `EXISTS (…)`, and subquery-valued function arguments.
pub(crate) fn collect_subqueries<'a>(expr: &'a Expr, out: &mut Vec<&'a Query>) {
    walk_expr(expr, &mut |e| match e {
        Expr::Subquery(query) | Expr::InSubquery { subquery: query, .. } => out.push(query),
        Expr::Exists { subquery, .. } => out.push(subquery),
        Expr::Function(func) => {
            if let FunctionArguments::Subquery(query) = &func.args {
                out.push(query);
            }
        }
        _ => {}
    });
}

/// Counts CASE expressions and their WHEN branches.
pub(crate) fn count_case_expressions(expr: &Expr) -> (usize, usize) {
    let mut cases = 0;
    let mut branches = 0;
    walk_expr(expr, &mut |e| {
        if let Expr::Case { conditions, .. } = e {
            cases += 1;
            branches += conditions.len();
        }
    });
    (cases, branches)
}

/// Number of top-level AND-separated predicates.
pub(crate) fn count_conjuncts(expr: &Expr) -> usize {
    use sqlparser::ast::BinaryOperator;
    match expr {
        Expr::BinaryOp {
            op: BinaryOperator::And,
            left,
            right,
        } => count_conjuncts(left) + count_conjuncts(right),
        Expr::Nested(inner) => count_conjuncts(inner),
        _ => 1,
    }
}

/// Lowercased table qualifiers of compound column references in `expr`.
pub(crate) fn qualifier_prefixes(expr: &Expr) -> std::collections::HashSet<String> {
    let mut prefixes = std::collections::HashSet::new();
    walk_expr(expr, &mut |e| {
        if let Expr::CompoundIdentifier(parts) = e {
            if parts.len() >= 2 {
                prefixes.insert(parts[0].value.to_lowercase());
            }
        }
    });
    prefixes
}

/// Leftmost SELECT of a statement, drilling through set operations.
pub(crate) fn first_select(statement: &Statement) -> Option<&Select> {
    match statement {
        Statement::Query(query) => first_select_of_query(query),
        _ => None,
    }
}

pub(crate) fn first_select_of_query(query: &Query) -> Option<&Select> {
    first_select_of_set_expr(&query.body)
}

fn first_select_of_set_expr(body: &SetExpr) -> Option<&Select> {
    match body {
        SetExpr::Select(select) => Some(select),
        SetExpr::Query(query) => first_select_of_query(query),
        SetExpr::SetOperation { left, .. } => first_select_of_set_expr(left),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_sql_with_dialect;
    use crate::types::Dialect;

    fn where_expr(sql: &str) -> Expr {
        let statements = parse_sql_with_dialect(sql, Dialect::Generic).expect("parse");
        let select = first_select(&statements[0]).expect("select");
        select.selection.clone().expect("where clause")
    }

    #[test]
    fn test_count_conjuncts() {
        let expr = where_expr("SELECT 1 FROM t WHERE a = 1 AND b = 2 AND (c = 3 OR d = 4)");
        assert_eq!(count_conjuncts(&expr), 3);
    }

    #[test]
    fn test_collect_subqueries_finds_in_and_exists() {
        let expr = where_expr(
            "SELECT 1 FROM t WHERE id IN (SELECT id FROM a) AND EXISTS (SELECT 1 FROM b)",
        );
        let mut subqueries = Vec::new();
        collect_subqueries(&expr, &mut subqueries);
        assert_eq!(subqueries.len(), 2);
    }

    #[test]
    fn test_aggregate_vs_window() {
        let statements = parse_sql_with_dialect(
            "SELECT SUM(x), ROW_NUMBER() OVER (ORDER BY x), SUM(x) OVER () FROM t",
            Dialect::Generic,
        )
        .expect("parse");
        let select = first_select(&statements[0]).expect("select");

        let mut aggregates = 0;
        let mut windows = 0;
        for item in &select.projection {
            if let sqlparser::ast::SelectItem::UnnamedExpr(expr) = item {
                let mut calls = Vec::new();
                collect_function_calls(expr, &mut calls);
                for call in calls {
                    if is_aggregate_call(call) {
                        aggregates += 1;
                    }
                    if is_window_call(call) {
                        windows += 1;
                    }
                }
            }
        }
        assert_eq!(aggregates, 1);
        assert_eq!(windows, 2);
    }

    #[test]
    fn test_qualifier_prefixes() {
        let expr = where_expr("SELECT 1 FROM a, b WHERE a.x = b.y");
        let prefixes = qualifier_prefixes(&expr);
        assert!(prefixes.contains("a"));
        assert!(prefixes.contains("b"));
    }
}
