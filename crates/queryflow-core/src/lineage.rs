//! Column lineage extraction for SELECT statements.
//!
//! Best-effort single attribution: each output column maps to at most one
//! source column/table. One CAST level is unwrapped before attribution so
//! `CAST(t.col AS text)` still points at `t.col`.

use sqlparser::ast::{Expr, SelectItem, SelectItemQualifiedWildcardKind, Statement};

use crate::builder::expression::{
    collect_function_calls, first_select, is_aggregate_call, is_window_call, walk_expr,
};
use crate::builder::helpers::object_name_to_string;
use crate::types::{ColumnLineage, Transformation};

/// Extracts lineage for the leftmost SELECT of a query statement.
/// Non-SELECT statements yield an empty list.
pub(crate) fn extract_lineage(statement: &Statement) -> Vec<ColumnLineage> {
    let Some(select) = first_select(statement) else {
        return Vec::new();
    };

    let mut lineage = Vec::new();
    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(expr) => lineage.push(column_lineage(expr, None)),
            SelectItem::ExprWithAlias { expr, alias } => {
                lineage.push(column_lineage(expr, Some(alias.value.clone())));
            }
            SelectItem::Wildcard(_) => lineage.push(ColumnLineage {
                column: "*".to_string(),
                expression: "*".to_string(),
                source_column: None,
                source_table: None,
                transformation: Transformation::Passthrough,
            }),
            SelectItem::QualifiedWildcard(kind, _) => {
                let prefix = match kind {
                    SelectItemQualifiedWildcardKind::ObjectName(name) => {
                        object_name_to_string(name)
                    }
                    SelectItemQualifiedWildcardKind::Expr(expr) => expr.to_string(),
                };
                lineage.push(ColumnLineage {
                    column: format!("{prefix}.*"),
                    expression: format!("{prefix}.*"),
                    source_column: None,
                    source_table: Some(prefix),
                    transformation: Transformation::Passthrough,
                });
            }
        }
    }
    lineage
}

fn column_lineage(expr: &Expr, alias: Option<String>) -> ColumnLineage {
    let (source_column, source_table) = source_ref(expr);
    ColumnLineage {
        column: alias.clone().unwrap_or_else(|| derive_column_name(expr)),
        expression: render_expr(expr),
        source_column,
        source_table,
        transformation: classify_transformation(expr, alias.is_some()),
    }
}

/// Output name precedence: source column, else function name, else literal,
/// else `expr`. (Alias precedence is applied by the caller.)
pub(crate) fn derive_column_name(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(ident) => ident.value.clone(),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|ident| ident.value.clone())
            .unwrap_or_else(|| "expr".to_string()),
        Expr::Function(func) => func
            .name
            .0
            .last()
            .and_then(|part| part.as_ident())
            .map(|ident| ident.value.clone())
            .unwrap_or_else(|| "expr".to_string()),
        Expr::Cast { expr: inner, .. } | Expr::Nested(inner) => derive_column_name(inner),
        Expr::Value(value) => value.to_string(),
        _ => "expr".to_string(),
    }
}

/// Renders an expression recursively: column refs as `table.col`, calls as
/// `NAME(args)`, binary/unary/cast spelled out.
pub(crate) fn render_expr(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(ident) => ident.value.clone(),
        Expr::CompoundIdentifier(parts) => parts
            .iter()
            .map(|ident| ident.value.clone())
            .collect::<Vec<_>>()
            .join("."),
        Expr::BinaryOp { left, op, right } => {
            format!("{} {} {}", render_expr(left), op, render_expr(right))
        }
        Expr::UnaryOp { op, expr: inner } => format!("{} {}", op, render_expr(inner)),
        Expr::Nested(inner) => format!("({})", render_expr(inner)),
        Expr::Cast {
            expr: inner,
            data_type,
            ..
        } => format!("CAST({} AS {})", render_expr(inner), data_type),
        Expr::Value(value) => value.to_string(),
        Expr::Subquery(_) => "(subquery)".to_string(),
        // CASE, functions with OVER clauses etc. round-trip through Display
        other => other.to_string(),
    }
}

/// Best-effort single source attribution, unwrapping one CAST level.
fn source_ref(expr: &Expr) -> (Option<String>, Option<String>) {
    let unwrapped = match expr {
        Expr::Cast { expr: inner, .. } => inner.as_ref(),
        other => other,
    };

    match unwrapped {
        Expr::Identifier(ident) => (Some(ident.value.clone()), None),
        Expr::CompoundIdentifier(parts) if parts.len() >= 2 => {
            let column = parts.last().map(|ident| ident.value.clone());
            let table = parts[..parts.len() - 1]
                .iter()
                .map(|ident| ident.value.clone())
                .collect::<Vec<_>>()
                .join(".");
            (column, Some(table))
        }
        Expr::Function(_) => first_column_ref(unwrapped),
        Expr::Nested(inner) => source_ref(inner),
        _ => (None, None),
    }
}

/// First column reference anywhere inside the expression.
fn first_column_ref(expr: &Expr) -> (Option<String>, Option<String>) {
    let mut found: Option<(Option<String>, Option<String>)> = None;
    walk_expr(expr, &mut |e| {
        if found.is_some() {
            return;
        }
        match e {
            Expr::Identifier(ident) => found = Some((Some(ident.value.clone()), None)),
            Expr::CompoundIdentifier(parts) if parts.len() >= 2 => {
                let column = parts.last().map(|ident| ident.value.clone());
                let table = parts[..parts.len() - 1]
                    .iter()
                    .map(|ident| ident.value.clone())
                    .collect::<Vec<_>>()
                    .join(".");
                found = Some((column, Some(table)));
            }
            _ => {}
        }
    });
    found.unwrap_or((None, None))
}

/// Fixed precedence: aggregate ⇒ aggregated, window ⇒ calculated, aliased
/// plain column ⇒ renamed, plain column ⇒ direct, else passthrough.
fn classify_transformation(expr: &Expr, has_alias: bool) -> Transformation {
    let mut calls = Vec::new();
    collect_function_calls(expr, &mut calls);
    if calls.iter().any(|call| is_aggregate_call(call)) {
        return Transformation::Aggregated;
    }
    if calls.iter().any(|call| is_window_call(call)) {
        return Transformation::Calculated;
    }

    let plain = matches!(expr, Expr::Identifier(_) | Expr::CompoundIdentifier(_));
    match (plain, has_alias) {
        (true, true) => Transformation::Renamed,
        (true, false) => Transformation::Direct,
        _ => Transformation::Passthrough,
    }
}
