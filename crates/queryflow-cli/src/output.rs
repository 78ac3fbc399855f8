//! Output formatting: JSON (the full result) and a human-readable summary.

use anyhow::Result;
use queryflow_core::{BatchResult, Severity};
use std::fmt::Write;
use tabled::settings::Style;
use tabled::{Table, Tabled};

pub fn format_json(result: &BatchResult, compact: bool) -> Result<String> {
    let text = if compact {
        serde_json::to_string(result)?
    } else {
        serde_json::to_string_pretty(result)?
    };
    Ok(text)
}

#[derive(Tabled)]
struct QueryRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Lines")]
    lines: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Nodes")]
    nodes: usize,
    #[tabled(rename = "Tables")]
    tables: usize,
    #[tabled(rename = "Joins")]
    joins: usize,
    #[tabled(rename = "Complexity")]
    complexity: String,
    #[tabled(rename = "Hints")]
    hints: usize,
}

pub fn format_table(result: &BatchResult, quiet: bool) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "Analyzed {} statement(s): {} ok, {} with errors",
        result.total_queries, result.success_count, result.error_count
    )
    .unwrap();
    if let Some(validation) = &result.validation_error {
        writeln!(out, "Validation: {validation}").unwrap();
    }
    writeln!(out).unwrap();

    let rows: Vec<QueryRow> = result
        .queries
        .iter()
        .enumerate()
        .map(|(i, query)| {
            let lines = result
                .query_line_ranges
                .get(i)
                .map(|range| format!("{}-{}", range.start_line, range.end_line))
                .unwrap_or_default();
            QueryRow {
                index: i + 1,
                lines,
                status: if query.is_success() { "ok" } else { "error" },
                nodes: query.nodes.len(),
                tables: query.stats.tables,
                joins: query.stats.joins,
                complexity: format!(
                    "{} ({:?})",
                    query.stats.complexity.score, query.stats.complexity.level
                ),
                hints: query.hints.len(),
            }
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    writeln!(out, "{table}").unwrap();

    if !quiet {
        for (i, query) in result.queries.iter().enumerate() {
            if query.hints.is_empty() {
                continue;
            }
            writeln!(out, "\nStatement {}:", i + 1).unwrap();
            for hint in &query.hints {
                let severity = match hint.severity {
                    Severity::Error => "ERROR",
                    Severity::Warning => "WARN",
                    Severity::Info => "INFO",
                };
                writeln!(out, "  [{severity}] {}: {}", hint.kind, hint.message).unwrap();
                if let Some(suggestion) = &hint.suggestion {
                    writeln!(out, "         {suggestion}").unwrap();
                }
            }
        }
    }
    out
}
