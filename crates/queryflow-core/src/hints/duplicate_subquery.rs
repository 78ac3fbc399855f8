//! The same (or structurally equivalent) subquery appears more than once.
//!
//! Works on the raw statement text: every parenthesized `(SELECT ...)` span
//! is extracted with a string-aware paren matcher and normalized. Two
//! subqueries group together when they share a loose shape key (first FROM
//! table, aggregate presence, WHERE presence); identical subqueries match
//! trivially.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::builder::helpers::normalize_ws;
use crate::hints::rule::{HintContext, HintRule, RuleOutput};
use crate::parser::preprocess::find_matching_paren;
use crate::types::{hint_codes, HintCategory, OptimizationHint};

pub(crate) struct DuplicateSubquery;

impl HintRule for DuplicateSubquery {
    fn name(&self) -> &'static str {
        "duplicate-subquery"
    }

    fn check(&self, ctx: &HintContext<'_>, out: &mut RuleOutput) {
        let subqueries = extract_subquery_texts(ctx.sql);
        if subqueries.len() < 2 {
            return;
        }

        let mut groups: HashMap<String, Vec<&str>> = HashMap::new();
        for text in &subqueries {
            groups.entry(shape_key(text)).or_default().push(text);
        }

        let mut flagged: Vec<(String, usize)> = Vec::new();
        for members in groups.values() {
            if members.len() < 2 {
                continue;
            }
            if let Some(table) = from_table(members[0]) {
                flagged.push((table, members.len()));
            }
        }
        flagged.sort();

        for (table, count) in flagged {
            out.hint(
                OptimizationHint::info(
                    HintCategory::Performance,
                    hint_codes::DUPLICATE_SUBQUERY,
                    format!("{count} similar subqueries over '{table}'"),
                )
                .with_table(table)
                .with_suggestion("Extract the repeated subquery into a CTE"),
            );
        }
    }
}

/// Normalized text of every `(SELECT ...)` span in the statement.
fn extract_subquery_texts(sql: &str) -> Vec<String> {
    let bytes = sql.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'(' {
            let rest = sql[i + 1..].trim_start();
            if rest.len() >= 6 && rest[..6].eq_ignore_ascii_case("select") {
                if let Some(close) = find_matching_paren(sql, i) {
                    out.push(normalize_ws(&sql[i + 1..close]));
                }
            }
        }
        i += 1;
    }
    out
}

/// Loose structural key; exact duplicates share it trivially.
fn shape_key(normalized: &str) -> String {
    let table = from_table(normalized).unwrap_or_default();
    let has_aggregate = ["sum(", "count(", "avg(", "min(", "max("]
        .iter()
        .any(|f| normalized.contains(f));
    let has_where = normalized.contains(" where ");
    format!("{table}|{has_aggregate}|{has_where}")
}

/// First table named after FROM in an already-normalized subquery.
fn from_table(normalized: &str) -> Option<String> {
    static FROM_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = FROM_REGEX
        .get_or_init(|| Regex::new(r"\bfrom\s+([a-z_][\w.]*)").expect("from regex is valid"));
    regex
        .captures(normalized)
        .map(|captures| captures[1].to_string())
}
