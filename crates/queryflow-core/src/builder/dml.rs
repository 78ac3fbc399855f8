//! DML and DDL-with-query compilation: INSERT, UPDATE, DELETE, MERGE,
//! CREATE VIEW, CREATE TABLE AS SELECT.
//!
//! These all reduce to "compile the upstream sources, then wire them into a
//! synthesized write node named after the target".

use sqlparser::ast::{
    Delete, Expr, FromTable, Insert, TableFactor, TableWithJoins, UpdateTableFromKind,
};

use crate::builder::context::{GraphBuf, ParserContext};
use crate::builder::expression;
use crate::builder::helpers::{line_of_keyword, object_name_to_string, truncate_text};
use crate::builder::select::{build_query, build_subquery_container, build_table_with_joins};
use crate::types::{ClauseType, FlowNode, NodeKind, TableCategory};

pub(crate) fn build_insert(
    insert: &Insert,
    sql: &str,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
) -> Option<String> {
    let source_terminal = insert
        .source
        .as_ref()
        .and_then(|source| build_query(source, sql, ctx, buf, 0));

    let label = insert.table.to_string();
    let write_id = push_write_node(&label, format!("INSERT INTO {label}"), ctx, buf);

    if let Some(source) = source_terminal {
        let clause = format!("INSERT INTO {label}");
        buf.link_with(ctx, &source, &write_id, |edge| {
            edge.with_clause(clause, ClauseType::Insert)
                .with_source_line(line_of_keyword(sql, "insert"))
        });
    }
    Some(write_id)
}

pub(crate) fn build_update(
    table: &TableWithJoins,
    assignments_text: String,
    from: Option<&UpdateTableFromKind>,
    selection: Option<&Expr>,
    sql: &str,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
) -> Option<String> {
    let mut sources = Vec::new();
    if let Some(from) = from {
        let (UpdateTableFromKind::BeforeSet(tables) | UpdateTableFromKind::AfterSet(tables)) = from;
        for table_with_joins in tables {
            if let Some(id) = build_table_with_joins(table_with_joins, sql, ctx, buf, 0) {
                sources.push(id);
            }
        }
    }

    let label = table_factor_label(&table.relation);
    let write_id = push_write_node(
        &label,
        truncate_text(&format!("UPDATE {label} SET {assignments_text}"), 120),
        ctx,
        buf,
    );

    wire_dml_filter(sources, selection, &write_id, ClauseType::Update, sql, ctx, buf);
    Some(write_id)
}

pub(crate) fn build_delete(
    delete: &Delete,
    sql: &str,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
) -> Option<String> {
    let mut sources = Vec::new();
    if let Some(using) = &delete.using {
        for table_with_joins in using {
            if let Some(id) = build_table_with_joins(table_with_joins, sql, ctx, buf, 0) {
                sources.push(id);
            }
        }
    }

    let mut target_labels: Vec<String> = delete.tables.iter().map(object_name_to_string).collect();
    if target_labels.is_empty() {
        let (FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables)) = &delete.from;
        target_labels = tables
            .iter()
            .map(|table_with_joins| table_factor_label(&table_with_joins.relation))
            .collect();
    }

    let mut write_ids = Vec::new();
    for label in &target_labels {
        write_ids.push(push_write_node(label, format!("DELETE FROM {label}"), ctx, buf));
    }

    let first_write = write_ids.first().cloned();
    if let Some(first_write) = &first_write {
        wire_dml_filter(
            sources,
            delete.selection.as_ref(),
            first_write,
            ClauseType::Delete,
            sql,
            ctx,
            buf,
        );
    }
    first_write
}

pub(crate) fn build_merge(
    table: &TableFactor,
    source: &TableFactor,
    on: &Expr,
    clause_count: usize,
    sql: &str,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
) -> Option<String> {
    let source_id = crate::builder::select::build_table_factor(source, sql, ctx, buf, 0);

    let label = table_factor_label(table);
    let write_id = push_write_node(
        &label,
        format!("MERGE INTO {label} ({clause_count} clauses)"),
        ctx,
        buf,
    );

    ctx.stats.conditions += expression::count_conjuncts(on);
    if let Some(source_id) = source_id {
        let clause = truncate_text(&format!("ON {on}"), 120);
        buf.link_with(ctx, &source_id, &write_id, |edge| {
            edge.with_clause(clause, ClauseType::Merge)
                .with_source_line(line_of_keyword(sql, "merge"))
        });
    }
    Some(write_id)
}

pub(crate) fn build_create_with_query(
    object_label: String,
    description: &str,
    query: &sqlparser::ast::Query,
    sql: &str,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
) -> Option<String> {
    let source_terminal = build_query(query, sql, ctx, buf, 0);

    let write_id = push_write_node(&object_label, format!("{description} {object_label}"), ctx, buf);
    if let Some(source) = source_terminal {
        let clause = format!("{description} {object_label}");
        buf.link_with(ctx, &source, &write_id, |edge| {
            edge.with_clause(clause, ClauseType::Create)
                .with_source_line(line_of_keyword(sql, "create"))
        });
    }
    Some(write_id)
}

/// Sources → optional WHERE filter → write node.
#[allow(clippy::too_many_arguments)]
fn wire_dml_filter(
    sources: Vec<String>,
    selection: Option<&Expr>,
    write_id: &str,
    clause_type: ClauseType,
    sql: &str,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
) {
    match selection {
        Some(predicate) => {
            ctx.stats.conditions += expression::count_conjuncts(predicate);
            let description = truncate_text(&predicate.to_string(), 120);
            let filter_id = ctx.next_node_id(NodeKind::Filter, "WHERE");
            buf.push_node(
                FlowNode::new(filter_id.clone(), NodeKind::Filter, "WHERE")
                    .with_description(description.clone()),
            );

            // WHERE-embedded subqueries are upstream sources too
            let mut subqueries = Vec::new();
            expression::collect_subqueries(predicate, &mut subqueries);
            for subquery in subqueries {
                let sub_id = build_subquery_container(subquery, "subquery", None, sql, ctx, buf, 0);
                buf.link_with(ctx, &sub_id, &filter_id, |edge| {
                    edge.with_clause("subquery", ClauseType::Subquery)
                });
            }

            for source in &sources {
                buf.link_with(ctx, source, &filter_id, |edge| {
                    edge.with_clause("FROM", ClauseType::From)
                });
            }
            let clause = format!("WHERE {description}");
            buf.link_with(ctx, &filter_id, write_id, |edge| {
                edge.with_clause(truncate_text(&clause, 120), clause_type)
                    .with_source_line(line_of_keyword(sql, "where"))
            });
        }
        None => {
            for source in &sources {
                buf.link_with(ctx, source, write_id, |edge| {
                    edge.with_clause("FROM", ClauseType::From)
                });
            }
        }
    }
}

fn push_write_node(
    label: &str,
    description: String,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
) -> String {
    let id = ctx.next_node_id(NodeKind::Table, label);
    ctx.record_table(label, TableCategory::Physical, &id);
    buf.push_node(
        FlowNode::table(id.clone(), label.to_string(), TableCategory::Physical)
            .with_description(description),
    );
    id
}

fn table_factor_label(factor: &TableFactor) -> String {
    match factor {
        TableFactor::Table { name, .. } => object_name_to_string(name),
        other => truncate_text(&other.to_string(), 60),
    }
}
