//! Flow graph construction: one statement AST in, typed nodes/edges out.
//!
//! Dispatches on statement kind; queries get a terminal RESULT node, DML
//! statements end at their write node, and everything else renders as a
//! single informational node. Missing or exotic AST shapes degrade to the
//! minimal valid node set; this stage never fails on a parsed statement.

pub(crate) mod context;
pub(crate) mod dml;
pub(crate) mod expression;
pub(crate) mod helpers;
pub(crate) mod select;
pub(crate) mod utility;

#[cfg(test)]
mod tests;

use sqlparser::ast::Statement;

use crate::builder::context::{GraphBuf, ParserContext};
use crate::builder::helpers::object_name_to_string;
use crate::types::{ClauseType, FlowNode, NodeKind};

/// Compiles one statement into `buf`.
pub(crate) fn build_statement(
    statement: &Statement,
    sql: &str,
    ctx: &mut ParserContext,
    buf: &mut GraphBuf,
) {
    match statement {
        Statement::Query(query) => {
            let terminal = select::build_query(query, sql, ctx, buf, 0);
            let result_id = ctx.next_node_id(NodeKind::Result, "Result");
            buf.push_node(FlowNode::new(result_id.clone(), NodeKind::Result, "Result"));
            if let Some(terminal) = terminal {
                buf.link_with(ctx, &terminal, &result_id, |edge| {
                    edge.with_clause("RESULT", ClauseType::Result)
                });
            }
        }
        Statement::Insert(insert) => {
            dml::build_insert(insert, sql, ctx, buf);
        }
        Statement::Update {
            table,
            assignments,
            from,
            selection,
            ..
        } => {
            let assignments_text = assignments
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            dml::build_update(
                table,
                assignments_text,
                from.as_ref(),
                selection.as_ref(),
                sql,
                ctx,
                buf,
            );
        }
        Statement::Delete(delete) => {
            dml::build_delete(delete, sql, ctx, buf);
        }
        Statement::Merge {
            table,
            source,
            on,
            clauses,
            ..
        } => {
            dml::build_merge(table, source, on, clauses.len(), sql, ctx, buf);
        }
        Statement::CreateTable(create) if create.query.is_some() => {
            if let Some(query) = &create.query {
                dml::build_create_with_query(
                    object_name_to_string(&create.name),
                    "CREATE TABLE AS SELECT:",
                    query,
                    sql,
                    ctx,
                    buf,
                );
            }
        }
        Statement::CreateView { name, query, .. } => {
            dml::build_create_with_query(
                object_name_to_string(name),
                "CREATE VIEW",
                query,
                sql,
                ctx,
                buf,
            );
        }
        _ => {
            utility::build_utility(sql, ctx, buf);
        }
    }

    // any CTE link still pending resolves here or not at all
    select::flush_cte_links(ctx, buf);
    ctx.pending_cte_links.clear();
}
