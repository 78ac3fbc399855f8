//! Batch entry point: validate, split, analyze each statement, aggregate.

use crate::builder::context::{GraphBuf, ParserContext};
use crate::error::ValidationError;
use crate::parser::{fallback, orchestrator};
use crate::splitter::split_statements;
use crate::types::{
    AnalyzeOptions, AnalyzeRequest, BatchResult, Dialect, FlowNode, NodeWarning, ParseResult,
};
use crate::{hints, lineage, stats};

/// Analyzes a batch of SQL statements. Size and count limits degrade the
/// batch (truncate, keep the first violation) instead of failing it.
pub fn analyze(request: &AnalyzeRequest) -> BatchResult {
    let options = &request.options;
    let mut validation_error = None;

    let mut sql = request.sql.as_str();
    if sql.len() > options.max_sql_size_bytes {
        let mut end = options.max_sql_size_bytes;
        while !sql.is_char_boundary(end) {
            end -= 1;
        }
        validation_error = Some(ValidationError::SizeLimitExceeded {
            limit: options.max_sql_size_bytes,
            actual: sql.len(),
        });
        sql = &sql[..end];
    }

    let mut segments = split_statements(sql);
    if segments.len() > options.max_query_count {
        if validation_error.is_none() {
            validation_error = Some(ValidationError::QueryCountExceeded {
                limit: options.max_query_count,
                actual: segments.len(),
            });
        }
        segments.truncate(options.max_query_count);
    }

    let mut queries = Vec::with_capacity(segments.len());
    let mut query_line_ranges = Vec::with_capacity(segments.len());
    for segment in &segments {
        let query = analyze_statement(&segment.sql, request.dialect, options);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            start_line = segment.line_range.start_line,
            partial = query.partial,
            nodes = query.nodes.len(),
            hints = query.hints.len(),
            "statement analyzed"
        );
        queries.push(query);
        query_line_ranges.push(segment.line_range);
    }

    let total_queries = queries.len();
    let success_count = queries.iter().filter(|query| query.is_success()).count();
    BatchResult {
        total_queries,
        success_count,
        error_count: total_queries - success_count,
        queries,
        query_line_ranges,
        validation_error,
    }
}

/// Analyzes one SQL string with default options.
pub fn analyze_sql(sql: &str, dialect: Dialect) -> BatchResult {
    analyze(&AnalyzeRequest::new(sql, dialect))
}

fn analyze_statement(sql: &str, dialect: Dialect, options: &AnalyzeOptions) -> ParseResult {
    let outcome = orchestrator::orchestrate(sql, dialect, options);

    // the retry may have parsed with a detected dialect; attribute the graph
    // to whichever dialect actually succeeded
    let mut ctx = ParserContext::new(outcome.dialect, options.max_nesting_depth);
    let mut buf = GraphBuf::new();
    if outcome.statements.is_empty() {
        if outcome.partial {
            fallback::extract_partial_graph(sql, &mut ctx, &mut buf);
        }
    } else {
        for statement in &outcome.statements {
            crate::builder::build_statement(statement, sql, &mut ctx, &mut buf);
        }
    }

    let column_lineage = outcome
        .statements
        .first()
        .map(lineage::extract_lineage)
        .unwrap_or_default();

    let mut query_stats = ctx.stats;
    stats::finalize(&mut buf.nodes, &buf.edges, &mut query_stats);

    let mut all_hints = outcome.hints;
    all_hints.extend(ctx.hints);
    let rule_output = hints::run(&hints::HintContext {
        sql,
        ast: outcome.statements.first(),
        nodes: &buf.nodes,
        edges: &buf.edges,
        table_usage: &ctx.table_usage,
        stats: &query_stats,
        has_select_star: ctx.has_select_star,
        has_no_limit: ctx.has_no_limit,
    });
    all_hints.extend(rule_output.hints);
    for (node_id, warning) in rule_output.node_warnings {
        attach_warning(&mut buf.nodes, &node_id, warning);
    }

    ParseResult {
        nodes: buf.nodes,
        edges: buf.edges,
        stats: query_stats,
        hints: all_hints,
        column_lineage,
        table_usage: ctx.table_usage,
        sql: sql.to_string(),
        ast: outcome.statements.into_iter().next(),
        partial: outcome.partial,
        error: outcome.error.map(|error| error.to_string()),
    }
}

/// Attaches a warning to the node with the given ID, wherever it sits in the
/// tree.
fn attach_warning(nodes: &mut [FlowNode], node_id: &str, warning: NodeWarning) -> bool {
    for node in nodes.iter_mut() {
        if node.id == node_id {
            node.warnings.push(warning);
            return true;
        }
        if let Some(children) = &mut node.children {
            if attach_warning(children, node_id, warning.clone()) {
                return true;
            }
        }
    }
    false
}
