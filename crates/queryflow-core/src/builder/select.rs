//! SELECT compilation: CTEs, FROM/JOIN chains, clause pipeline, set
//! operations.
//!
//! Clause nodes are emitted in a fixed relative order: WHERE → GROUP BY →
//! HAVING → AGGREGATE → CASE → WINDOW → SELECT → ORDER BY → LIMIT. The
//! caller appends the RESULT node for top-level statements.

use sqlparser::ast::{
    Cte, Expr, GroupByExpr, Join, JoinConstraint, JoinOperator, LimitClause, OrderByKind, Query,
    Select, SelectItem, SelectItemQualifiedWildcardKind, SetExpr, SetQuantifier, TableFactor,
    TableWithJoins,
};

use crate::builder::context::{GraphBuf, ParserContext, PendingCteLink};
use crate::builder::expression;
use crate::builder::helpers::{line_of_keyword, object_name_to_string, truncate_text};
use crate::lineage;
use crate::types::{
    AggregateInfo, CaseInfo, ClauseType, ColumnInfo, FlowNode, NodeKind, TableCategory, WindowInfo,
};

/// Compiles one query (body + ORDER BY/LIMIT) into `buf`, returning the
/// terminal node ID.
pub(crate) fn build_query(
    query: &Query,
    sql: &str,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
    depth: usize,
) -> Option<String> {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            build_cte(cte, sql, ctx, buf, depth);
        }
    }

    let mut current = build_set_expr(&query.body, sql, ctx, buf, depth);

    if let Some(order_by) = &query.order_by {
        let description = match &order_by.kind {
            OrderByKind::Expressions(exprs) if !exprs.is_empty() => Some(
                exprs
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            OrderByKind::All(_) => Some("ALL".to_string()),
            _ => None,
        };
        if let Some(description) = description {
            let sort_id = ctx.next_node_id(NodeKind::Sort, "ORDER BY");
            buf.push_node(
                FlowNode::new(sort_id.clone(), NodeKind::Sort, "ORDER BY")
                    .with_description(truncate_text(&description, 120)),
            );
            if let Some(prev) = &current {
                let clause = format!("ORDER BY {description}");
                buf.link_with(ctx, prev, &sort_id, |edge| {
                    edge.with_clause(truncate_text(&clause, 120), ClauseType::OrderBy)
                        .with_source_line(line_of_keyword(sql, "order"))
                });
            }
            current = Some(sort_id);
        }
    }

    if let Some(limit_text) = effective_limit(query) {
        ctx.has_no_limit = false;
        let limit_id = ctx.next_node_id(NodeKind::Limit, "LIMIT");
        buf.push_node(
            FlowNode::new(limit_id.clone(), NodeKind::Limit, "LIMIT")
                .with_description(limit_text.clone()),
        );
        if let Some(prev) = &current {
            buf.link_with(ctx, prev, &limit_id, |edge| {
                edge.with_clause(limit_text, ClauseType::Limit)
                    .with_source_line(line_of_keyword(sql, "limit"))
            });
        }
        current = Some(limit_id);
    }

    current
}

/// LIMIT text when the query carries a genuine limit. Clauses without a
/// limit expression (offset-only forms) are treated as absent.
fn effective_limit(query: &Query) -> Option<String> {
    match &query.limit_clause {
        Some(LimitClause::LimitOffset { limit: Some(limit), .. }) => Some(format!("LIMIT {limit}")),
        Some(LimitClause::LimitOffset { limit: None, .. }) => None,
        Some(LimitClause::OffsetCommaLimit { offset, limit }) => {
            Some(format!("LIMIT {offset}, {limit}"))
        }
        None => query.fetch.as_ref().map(|fetch| fetch.to_string()),
    }
}

fn build_cte(cte: &Cte, sql: &str, ctx: &mut ParserContext, buf: &mut GraphBuf, depth: usize) {
    let name = cte.alias.name.value.clone();
    ctx.stats.ctes += 1;

    let lowered = name.to_lowercase();
    if !ctx.cte_names.contains(&lowered) {
        ctx.cte_names.push(lowered.clone());
    }

    let cte_id = ctx.next_node_id(NodeKind::Cte, &name);
    ctx.cte_nodes.insert(lowered, cte_id.clone());

    let mut node = FlowNode::new(cte_id.clone(), NodeKind::Cte, &name)
        .with_description(format!("WITH {name} AS (...)"));
    node.depth = Some(depth);

    if depth < ctx.max_depth {
        let mut child = GraphBuf::new();
        let mark = ctx.pending_cte_links.len();
        build_query(&cte.query, sql, ctx, &mut child, depth + 1);
        child.stamp_parent(&cte_id, depth + 1);
        node = node.with_children(child.nodes, child.edges);
        close_container_cte_links(mark, &cte_id, ctx, buf);
    } else {
        // nesting bound reached: keep the container, skip its body
        node = node.with_children(Vec::new(), Vec::new());
    }

    buf.push_node(node);
}

fn build_set_expr(
    body: &SetExpr,
    sql: &str,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
    depth: usize,
) -> Option<String> {
    match body {
        SetExpr::Select(select) => build_select(select, sql, ctx, buf, depth),
        SetExpr::Query(query) => build_query(query, sql, ctx, buf, depth),
        SetExpr::SetOperation {
            op,
            set_quantifier,
            left,
            right,
        } => {
            let left_id = build_set_expr(left, sql, ctx, buf, depth);
            let right_id = build_set_expr(right, sql, ctx, buf, depth);
            ctx.stats.unions += 1;

            let mut label = op.to_string().to_uppercase();
            match set_quantifier {
                SetQuantifier::All => label.push_str(" ALL"),
                SetQuantifier::Distinct => label.push_str(" DISTINCT"),
                _ => {}
            }

            let union_id = ctx.next_node_id(NodeKind::Union, &label);
            buf.push_node(FlowNode::new(union_id.clone(), NodeKind::Union, &label));
            for branch in [left_id, right_id].into_iter().flatten() {
                let clause = label.clone();
                buf.link_with(ctx, &branch, &union_id, |edge| {
                    edge.with_clause(clause, ClauseType::Union)
                });
            }
            Some(union_id)
        }
        SetExpr::Values(values) => {
            let label = format!("VALUES ({} rows)", values.rows.len());
            let id = ctx.next_node_id(NodeKind::Operation, &label);
            buf.push_node(FlowNode::new(id.clone(), NodeKind::Operation, label));
            Some(id)
        }
        _ => None,
    }
}

fn build_select(
    select: &Select,
    sql: &str,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
    depth: usize,
) -> Option<String> {
    let mut from_terminals = Vec::new();
    for table_with_joins in &select.from {
        if let Some(id) = build_table_with_joins(table_with_joins, sql, ctx, buf, depth) {
            from_terminals.push(id);
        }
    }
    let mut current = fold_comma_join(from_terminals, ctx, buf);

    if let Some(selection) = &select.selection {
        current = Some(build_filter_node(
            "WHERE", selection, ClauseType::Where, current, sql, ctx, buf, depth,
        ));
    }

    let group_description = match &select.group_by {
        GroupByExpr::Expressions(exprs, _) if !exprs.is_empty() => Some(
            exprs
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        GroupByExpr::All(_) => Some("ALL".to_string()),
        _ => None,
    };
    if let Some(description) = group_description {
        let group_id = ctx.next_node_id(NodeKind::Aggregate, "GROUP BY");
        buf.push_node(
            FlowNode::new(group_id.clone(), NodeKind::Aggregate, "GROUP BY")
                .with_description(truncate_text(&description, 120)),
        );
        if let Some(prev) = &current {
            let clause = format!("GROUP BY {description}");
            buf.link_with(ctx, prev, &group_id, |edge| {
                edge.with_clause(truncate_text(&clause, 120), ClauseType::GroupBy)
                    .with_source_line(line_of_keyword(sql, "group"))
            });
        }
        current = Some(group_id);
    }

    if let Some(having) = &select.having {
        current = Some(build_filter_node(
            "HAVING", having, ClauseType::Having, current, sql, ctx, buf, depth,
        ));
    }

    // one pass over the projection gathers everything the clause nodes need
    let mut aggregate_calls: Vec<String> = Vec::new();
    let mut window_calls: Vec<String> = Vec::new();
    let mut case_count = 0;
    let mut case_branches = 0;
    let mut scalar_subqueries: Vec<&Query> = Vec::new();
    let mut columns: Vec<ColumnInfo> = Vec::new();

    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(expr) => {
                scan_projection_expr(
                    expr,
                    ctx,
                    &mut aggregate_calls,
                    &mut window_calls,
                    &mut case_count,
                    &mut case_branches,
                    &mut scalar_subqueries,
                );
                columns.push(ColumnInfo {
                    name: lineage::derive_column_name(expr),
                    expression: lineage::render_expr(expr),
                    alias: None,
                });
            }
            SelectItem::ExprWithAlias { expr, alias } => {
                scan_projection_expr(
                    expr,
                    ctx,
                    &mut aggregate_calls,
                    &mut window_calls,
                    &mut case_count,
                    &mut case_branches,
                    &mut scalar_subqueries,
                );
                columns.push(ColumnInfo {
                    name: alias.value.clone(),
                    expression: lineage::render_expr(expr),
                    alias: Some(alias.value.clone()),
                });
            }
            SelectItem::Wildcard(_) => {
                ctx.has_select_star = true;
                columns.push(ColumnInfo {
                    name: "*".to_string(),
                    expression: "*".to_string(),
                    alias: None,
                });
            }
            SelectItem::QualifiedWildcard(kind, _) => {
                ctx.has_select_star = true;
                let prefix = match kind {
                    SelectItemQualifiedWildcardKind::ObjectName(name) => {
                        object_name_to_string(name)
                    }
                    SelectItemQualifiedWildcardKind::Expr(expr) => expr.to_string(),
                };
                columns.push(ColumnInfo {
                    name: format!("{prefix}.*"),
                    expression: format!("{prefix}.*"),
                    alias: None,
                });
            }
        }
    }

    if !aggregate_calls.is_empty() {
        ctx.stats.aggregations += aggregate_calls.len();
        let id = ctx.next_node_id(NodeKind::Aggregate, "AGGREGATE");
        buf.push_node(
            FlowNode::new(id.clone(), NodeKind::Aggregate, "AGGREGATE")
                .with_description(truncate_text(&aggregate_calls.join(", "), 120))
                .with_aggregate(AggregateInfo {
                    functions: aggregate_calls,
                }),
        );
        if let Some(prev) = &current {
            buf.link_with(ctx, prev, &id, |edge| {
                edge.with_clause("AGGREGATE", ClauseType::Select)
            });
        }
        current = Some(id);
    }

    if case_count > 0 {
        let id = ctx.next_node_id(NodeKind::Case, "CASE");
        buf.push_node(
            FlowNode::new(id.clone(), NodeKind::Case, "CASE")
                .with_description(format!("{case_count} CASE expression(s)"))
                .with_case(CaseInfo {
                    expressions: case_count,
                    branches: case_branches,
                }),
        );
        if let Some(prev) = &current {
            buf.link_with(ctx, prev, &id, |edge| {
                edge.with_clause("CASE", ClauseType::Select)
            });
        }
        current = Some(id);
    }

    if !window_calls.is_empty() {
        ctx.stats.window_functions += window_calls.len();
        let id = ctx.next_node_id(NodeKind::Window, "WINDOW");
        buf.push_node(
            FlowNode::new(id.clone(), NodeKind::Window, "WINDOW")
                .with_description(truncate_text(&window_calls.join(", "), 120))
                .with_window(WindowInfo {
                    functions: window_calls,
                }),
        );
        if let Some(prev) = &current {
            buf.link_with(ctx, prev, &id, |edge| {
                edge.with_clause("WINDOW", ClauseType::Select)
            });
        }
        current = Some(id);
    }

    if let Some(qualify) = &select.qualify {
        current = Some(build_filter_node(
            "QUALIFY", qualify, ClauseType::Where, current, sql, ctx, buf, depth,
        ));
    }

    let select_label = if select.distinct.is_some() {
        "SELECT DISTINCT"
    } else {
        "SELECT"
    };
    let select_id = ctx.next_node_id(NodeKind::Select, select_label);
    buf.push_node(
        FlowNode::new(select_id.clone(), NodeKind::Select, select_label)
            .with_description(format!("{} column(s)", columns.len()))
            .with_columns(columns),
    );
    if let Some(prev) = &current {
        buf.link_with(ctx, prev, &select_id, |edge| {
            edge.with_clause(select_label, ClauseType::Select)
                .with_source_line(line_of_keyword(sql, "select"))
        });
    }
    // scalar subqueries feed the projection directly
    for subquery in scalar_subqueries {
        let sub_id = build_subquery_container(subquery, "subquery", None, sql, ctx, buf, depth);
        buf.link_with(ctx, &sub_id, &select_id, |edge| {
            edge.with_clause("scalar subquery", ClauseType::Subquery)
        });
    }

    Some(select_id)
}

#[allow(clippy::too_many_arguments)]
fn build_filter_node(
    label: &str,
    predicate: &Expr,
    clause_type: ClauseType,
    current: Option<String>,
    sql: &str,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
    depth: usize,
) -> String {
    ctx.stats.conditions += expression::count_conjuncts(predicate);

    let description = truncate_text(&predicate.to_string(), 120);
    let filter_id = ctx.next_node_id(NodeKind::Filter, label);
    buf.push_node(
        FlowNode::new(filter_id.clone(), NodeKind::Filter, label)
            .with_description(description.clone()),
    );
    if let Some(prev) = &current {
        let clause = format!("{label} {description}");
        buf.link_with(ctx, prev, &filter_id, |edge| {
            edge.with_clause(truncate_text(&clause, 120), clause_type)
                .with_source_line(line_of_keyword(sql, label))
        });
    }

    // predicate subqueries become upstream sources of the filter
    let mut subqueries = Vec::new();
    expression::collect_subqueries(predicate, &mut subqueries);
    for subquery in subqueries {
        let sub_id = build_subquery_container(subquery, "subquery", None, sql, ctx, buf, depth);
        buf.link_with(ctx, &sub_id, &filter_id, |edge| {
            edge.with_clause("subquery", ClauseType::Subquery)
        });
    }

    filter_id
}

fn scan_projection_expr<'a>(
    expr: &'a Expr,
    ctx: &mut ParserContext,
    aggregate_calls: &mut Vec<String>,
    window_calls: &mut Vec<String>,
    case_count: &mut usize,
    case_branches: &mut usize,
    scalar_subqueries: &mut Vec<&'a Query>,
) {
    let mut calls = Vec::new();
    expression::collect_function_calls(expr, &mut calls);
    for call in calls {
        ctx.note_function(&expression::function_name(call));
        if expression::is_aggregate_call(call) {
            aggregate_calls.push(call.to_string());
        }
        if expression::is_window_call(call) {
            window_calls.push(call.to_string());
        }
    }

    let (cases, branches) = expression::count_case_expressions(expr);
    *case_count += cases;
    *case_branches += branches;

    expression::collect_subqueries(expr, scalar_subqueries);
}

pub(crate) fn build_table_with_joins(
    table_with_joins: &TableWithJoins,
    sql: &str,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
    depth: usize,
) -> Option<String> {
    let mut current = build_table_factor(&table_with_joins.relation, sql, ctx, buf, depth)?;

    for join in &table_with_joins.joins {
        current = build_join(join, &current, sql, ctx, buf, depth);
    }
    Some(current)
}

fn build_join(
    join: &Join,
    left: &str,
    sql: &str,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
    depth: usize,
) -> String {
    let right = build_table_factor(&join.relation, sql, ctx, buf, depth);
    let (label, constraint_text) = describe_join_operator(&join.join_operator);

    ctx.stats.joins += 1;
    if let Some(predicate) = join_on_expr(&join.join_operator) {
        ctx.stats.conditions += expression::count_conjuncts(predicate);
    } else if constraint_text.is_some() {
        ctx.stats.conditions += 1;
    }

    let join_id = ctx.next_node_id(NodeKind::Join, &label);
    buf.push_node(
        FlowNode::new(join_id.clone(), NodeKind::Join, &label)
            .with_description(constraint_text.clone().unwrap_or_default()),
    );

    let left_clause = label.clone();
    buf.link_with(ctx, left, &join_id, |edge| {
        edge.with_clause(left_clause, ClauseType::Join)
            .with_source_line(line_of_keyword(sql, "join"))
    });
    if let Some(right_id) = right {
        let right_clause = constraint_text.unwrap_or_else(|| label.clone());
        buf.link_with(ctx, &right_id, &join_id, |edge| {
            edge.with_clause(truncate_text(&right_clause, 120), ClauseType::Join)
        });
    }
    join_id
}

/// Display label + rendered constraint for a join operator.
fn describe_join_operator(op: &JoinOperator) -> (String, Option<String>) {
    let (label, constraint) = match op {
        JoinOperator::Join(c) => ("JOIN", Some(c)),
        JoinOperator::Inner(c) => ("INNER JOIN", Some(c)),
        JoinOperator::Left(c) | JoinOperator::LeftOuter(c) => ("LEFT JOIN", Some(c)),
        JoinOperator::Right(c) | JoinOperator::RightOuter(c) => ("RIGHT JOIN", Some(c)),
        JoinOperator::FullOuter(c) => ("FULL OUTER JOIN", Some(c)),
        JoinOperator::CrossJoin(c) => ("CROSS JOIN", Some(c)),
        JoinOperator::Semi(c) | JoinOperator::LeftSemi(c) => ("LEFT SEMI JOIN", Some(c)),
        JoinOperator::RightSemi(c) => ("RIGHT SEMI JOIN", Some(c)),
        JoinOperator::Anti(c) | JoinOperator::LeftAnti(c) => ("LEFT ANTI JOIN", Some(c)),
        JoinOperator::RightAnti(c) => ("RIGHT ANTI JOIN", Some(c)),
        JoinOperator::StraightJoin(c) => ("STRAIGHT_JOIN", Some(c)),
        JoinOperator::AsOf { constraint, .. } => ("ASOF JOIN", Some(constraint)),
        JoinOperator::CrossApply => ("CROSS APPLY", None),
        JoinOperator::OuterApply => ("OUTER APPLY", None),
    };

    let constraint_text = constraint.and_then(|c| match c {
        JoinConstraint::On(expr) => Some(format!("ON {expr}")),
        JoinConstraint::Using(columns) => Some(format!(
            "USING ({})",
            columns
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        )),
        JoinConstraint::Natural => Some("NATURAL".to_string()),
        JoinConstraint::None => None,
    });
    (label.to_string(), constraint_text)
}

fn join_on_expr(op: &JoinOperator) -> Option<&Expr> {
    let constraint = match op {
        JoinOperator::Join(c)
        | JoinOperator::Inner(c)
        | JoinOperator::Left(c)
        | JoinOperator::LeftOuter(c)
        | JoinOperator::Right(c)
        | JoinOperator::RightOuter(c)
        | JoinOperator::FullOuter(c)
        | JoinOperator::CrossJoin(c)
        | JoinOperator::Semi(c)
        | JoinOperator::LeftSemi(c)
        | JoinOperator::RightSemi(c)
        | JoinOperator::Anti(c)
        | JoinOperator::LeftAnti(c)
        | JoinOperator::RightAnti(c)
        | JoinOperator::StraightJoin(c) => c,
        JoinOperator::AsOf { constraint, .. } => constraint,
        JoinOperator::CrossApply | JoinOperator::OuterApply => return None,
    };
    match constraint {
        JoinConstraint::On(expr) => Some(expr),
        _ => None,
    }
}

/// Comma-separated FROM items without ON conditions become synthesized
/// CROSS JOIN nodes, left-folded.
fn fold_comma_join(
    terminals: Vec<String>,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
) -> Option<String> {
    let mut iter = terminals.into_iter();
    let mut current = iter.next()?;

    for next in iter {
        ctx.stats.joins += 1;
        let cross_id = ctx.next_node_id(NodeKind::Join, "CROSS JOIN");
        buf.push_node(
            FlowNode::new(cross_id.clone(), NodeKind::Join, "CROSS JOIN")
                .with_description("implicit comma join"),
        );
        buf.link_with(ctx, &current, &cross_id, |edge| {
            edge.with_clause("CROSS JOIN", ClauseType::Join)
        });
        buf.link_with(ctx, &next, &cross_id, |edge| {
            edge.with_clause("CROSS JOIN", ClauseType::Join)
        });
        current = cross_id;
    }
    Some(current)
}

pub(crate) fn build_table_factor(
    factor: &TableFactor,
    sql: &str,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
    depth: usize,
) -> Option<String> {
    match factor {
        TableFactor::Table {
            name, alias, args, ..
        } => {
            let label = object_name_to_string(name);
            let category = if args.is_some() {
                TableCategory::TableFunction
            } else if ctx.is_cte_name(&label) {
                TableCategory::CteReference
            } else {
                TableCategory::Physical
            };

            let id = ctx.next_node_id(NodeKind::Table, &label);
            ctx.record_table(&label, category, &id);

            let mut node = FlowNode::table(id.clone(), label.clone(), category);
            if let Some(alias) = alias {
                node = node.with_description(format!("AS {}", alias.name.value));
            }
            buf.push_node(node);

            // wire the defining CTE container into its reference; when the
            // CTE node lives at an enclosing level the link is deferred so
            // every edge stays within the level that owns both endpoints
            if category == TableCategory::CteReference {
                if let Some(cte_id) = ctx.cte_nodes.get(&label.to_lowercase()).cloned() {
                    if buf.nodes.iter().any(|node| node.id == cte_id) {
                        let clause = format!("WITH {label}");
                        buf.link_with(ctx, &cte_id, &id, |edge| {
                            edge.with_clause(clause, ClauseType::With)
                        });
                    } else {
                        ctx.pending_cte_links.push(PendingCteLink {
                            cte_id,
                            target_id: id.clone(),
                            label: label.clone(),
                        });
                    }
                }
            }
            Some(id)
        }
        TableFactor::Derived { subquery, alias, .. } => {
            let label = alias
                .as_ref()
                .map(|a| a.name.value.clone())
                .unwrap_or_else(|| "subquery".to_string());
            Some(build_subquery_container(
                subquery,
                &label,
                Some(TableCategory::Derived),
                sql,
                ctx,
                buf,
                depth,
            ))
        }
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => build_table_with_joins(table_with_joins, sql, ctx, buf, depth),
        TableFactor::Pivot { table, .. }
        | TableFactor::Unpivot { table, .. }
        | TableFactor::MatchRecognize { table, .. } => {
            build_table_factor(table, sql, ctx, buf, depth)
        }
        // exotic factors degrade to "no node" rather than failing the build
        _ => None,
    }
}

/// Compiles a nested query into a collapsed container node.
pub(crate) fn build_subquery_container(
    query: &Query,
    label: &str,
    category: Option<TableCategory>,
    sql: &str,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
    depth: usize,
) -> String {
    ctx.stats.subqueries += 1;

    let id = ctx.next_node_id(NodeKind::Subquery, label);
    let mut node = FlowNode::new(id.clone(), NodeKind::Subquery, label);
    node.table_category = category;
    node.depth = Some(depth);

    if depth < ctx.max_depth {
        let mut child = GraphBuf::new();
        let mark = ctx.pending_cte_links.len();
        build_query(query, sql, ctx, &mut child, depth + 1);
        child.stamp_parent(&id, depth + 1);
        node = node.with_children(child.nodes, child.edges);
        close_container_cte_links(mark, &id, ctx, buf);
    } else {
        node = node.with_children(Vec::new(), Vec::new());
    }

    buf.push_node(node);
    id
}

/// Redirects CTE links discovered inside a just-closed container to the
/// container node itself, then emits everything the current level can close.
/// A CTE referenced inside its own body yields no edge.
fn close_container_cte_links(
    mark: usize,
    container_id: &str,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
) {
    for link in ctx.pending_cte_links.iter_mut().skip(mark) {
        link.target_id = container_id.to_string();
    }
    ctx.pending_cte_links.retain(|link| link.cte_id != link.target_id);
    flush_cte_links(ctx, buf);
}

/// Emits pending CTE links whose defining node lives in `buf`; the rest stay
/// queued for an enclosing level. Duplicate edges between the same pair are
/// collapsed.
pub(crate) fn flush_cte_links(ctx: &mut ParserContext, buf: &mut GraphBuf) {
    let pending = std::mem::take(&mut ctx.pending_cte_links);
    for link in pending {
        if !buf.nodes.iter().any(|node| node.id == link.cte_id) {
            ctx.pending_cte_links.push(link);
            continue;
        }
        if buf
            .edges
            .iter()
            .any(|edge| edge.source == link.cte_id && edge.target == link.target_id)
        {
            continue;
        }
        let clause = format!("WITH {}", link.label);
        buf.link_with(ctx, &link.cte_id, &link.target_id, |edge| {
            edge.with_clause(clause, ClauseType::With)
        });
    }
}
