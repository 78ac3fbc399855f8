//! Dialect preprocessing: pure text rewrites applied before parsing.
//!
//! Each transform returns `Some(rewritten)` or `None` for "no change". They
//! exist to let the grammar parser accept constructs it would otherwise
//! reject; they must never change the meaning of SQL the parser already
//! accepts.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

/// Path-operator chains longer than this are truncated before parsing.
const MAX_PATH_DEPTH: usize = 8;

const TRANSFORMS: &[fn(&str) -> Option<String>] = &[
    rewrite_minus,
    flatten_grouping_sets,
    strip_lock_hints,
    strip_option_clause,
    strip_distribution_clauses,
    hoist_nested_ctes,
    bound_path_chains,
];

/// Applies all transforms in order.
pub(crate) fn apply_all(sql: &str) -> Cow<'_, str> {
    let mut current = Cow::Borrowed(sql);
    for transform in TRANSFORMS {
        if let Some(rewritten) = transform(&current) {
            current = Cow::Owned(rewritten);
        }
    }
    current
}

/// `MINUS` → `EXCEPT` (Oracle/BigQuery set-operator synonym).
fn rewrite_minus(sql: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)\bMINUS\b").expect("minus regex is valid"));
    if !re.is_match(sql) {
        return None;
    }
    Some(re.replace_all(sql, "EXCEPT").into_owned())
}

/// `GROUP BY GROUPING SETS ((a, b), (c))` → `GROUP BY a, b, c`.
fn flatten_grouping_sets(sql: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)\bGROUP\s+BY\s+GROUPING\s+SETS\s*\(")
            .expect("grouping sets regex is valid")
    });

    let mut current = sql.to_string();
    let mut changed = false;

    for _ in 0..4 {
        let Some(found) = re.find(&current) else { break };
        let open = found.end() - 1;
        let Some(close) = find_matching_paren(&current, open) else { break };

        let mut columns: Vec<String> = Vec::new();
        for item in split_top_level_commas(&current[open + 1..close]) {
            let item = item.trim();
            let inner = item
                .strip_prefix('(')
                .and_then(|rest| rest.strip_suffix(')'))
                .unwrap_or(item);
            for column in split_top_level_commas(inner) {
                let column = column.trim();
                if !column.is_empty() && !columns.iter().any(|c| c.eq_ignore_ascii_case(column)) {
                    columns.push(column.to_string());
                }
            }
        }

        let replacement = format!("GROUP BY {}", columns.join(", "));
        current.replace_range(found.start()..=close, &replacement);
        changed = true;
    }

    changed.then_some(current)
}

/// Removes T-SQL `WITH (NOLOCK)` table hints.
fn strip_lock_hints(sql: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)\s*\bWITH\s*\(\s*NOLOCK\s*\)").expect("nolock regex is valid")
    });
    if !re.is_match(sql) {
        return None;
    }
    Some(re.replace_all(sql, "").into_owned())
}

/// Removes a trailing T-SQL `OPTION (...)` query hint.
fn strip_option_clause(sql: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)\s*\bOPTION\s*\([^()]*\)").expect("option regex is valid")
    });
    if !re.is_match(sql) {
        return None;
    }
    Some(re.replace_all(sql, "").into_owned())
}

/// Removes Hive/Spark `DISTRIBUTE BY` / `CLUSTER BY` / `SORT BY` clauses.
fn strip_distribution_clauses(sql: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:DISTRIBUTE|CLUSTER|SORT)\s+BY\b")
            .expect("distribution regex is valid")
    });

    let mut current = sql.to_string();
    let mut changed = false;

    for _ in 0..4 {
        let Some(found) = re.find(&current) else { break };
        let end = clause_end(&current, found.end());
        current.replace_range(found.start()..end, " ");
        changed = true;
    }

    changed.then_some(current)
}

/// Scans forward from `from` to the end of a free-form clause: the next
/// top-level terminator keyword, an unbalanced `)`, a `;`, or end of input.
fn clause_end(sql: &str, from: usize) -> usize {
    const TERMINATORS: &[&str] = &[
        "limit", "order", "union", "except", "intersect", "where", "group", "having", "window",
    ];
    let bytes = sql.as_bytes();
    let mut depth = 0i32;
    let mut i = from;

    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                if depth == 0 {
                    return i;
                }
                depth -= 1;
            }
            b';' if depth == 0 => return i,
            b'a'..=b'z' | b'A'..=b'Z' if depth == 0 => {
                let word_start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                let word = sql[word_start..i].to_ascii_lowercase();
                if TERMINATORS.contains(&word.as_str()) {
                    return word_start;
                }
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    sql.len()
}

/// Hoists `WITH a AS (WITH b AS (...) SELECT ...)` so the inner CTE list
/// joins the outer one; grammar parsers commonly reject the nested form.
fn hoist_nested_ctes(sql: &str) -> Option<String> {
    static INNER_RE: OnceLock<Regex> = OnceLock::new();
    let inner_re = INNER_RE.get_or_init(|| {
        Regex::new(r"(?i)\bAS\s*\(\s*WITH\b").expect("nested cte regex is valid")
    });
    static OUTER_RE: OnceLock<Regex> = OnceLock::new();
    let outer_re = OUTER_RE.get_or_init(|| {
        Regex::new(r"(?i)\bWITH\s+(?:RECURSIVE\s+)?").expect("outer with regex is valid")
    });

    let mut current = sql.to_string();
    let mut changed = false;

    for _ in 0..3 {
        let Some(outer) = outer_re.find(&current) else { break };
        let outer_end = outer.end();
        let Some(inner) = inner_re.find_at(&current, outer_end) else { break };

        // position of the inner WITH keyword
        let with_start = inner.start()
            + current[inner.start()..inner.end()]
                .to_lowercase()
                .rfind("with")
                .unwrap_or(0);
        let defs_start = with_start + "with".len();
        let Some(defs_end) = cte_definitions_end(&current, defs_start) else { break };

        let defs = current[defs_start..defs_end].trim().to_string();
        current.replace_range(with_start..defs_end, "");
        current.insert_str(outer_end, &format!("{defs}, "));
        changed = true;
    }

    changed.then_some(current)
}

/// Parses `name AS ( ... ) [, name AS ( ... )]*` starting at `from`, returning
/// the byte offset just past the last definition.
fn cte_definitions_end(sql: &str, from: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut i = from;

    loop {
        i = skip_whitespace(sql, i);
        // CTE name (plain or quoted)
        let name_start = i;
        while i < bytes.len()
            && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'"' | b'`'))
        {
            i += 1;
        }
        if i == name_start {
            return None;
        }

        i = skip_whitespace(sql, i);
        if !sql[i..].to_lowercase().starts_with("as") {
            return None;
        }
        i += 2;
        i = skip_whitespace(sql, i);
        if bytes.get(i) != Some(&b'(') {
            return None;
        }
        i = find_matching_paren(sql, i)? + 1;

        let after = skip_whitespace(sql, i);
        if bytes.get(after) == Some(&b',') {
            i = after + 1;
            continue;
        }
        return Some(i);
    }
}

/// Truncates `->` / `->>` path chains deeper than [`MAX_PATH_DEPTH`].
fn bound_path_chains(sql: &str) -> Option<String> {
    static CHAIN_RE: OnceLock<Regex> = OnceLock::new();
    let chain_re = CHAIN_RE.get_or_init(|| {
        Regex::new(r"(?:\s*->>?\s*'[^']*'){2,}").expect("path chain regex is valid")
    });
    static HOP_RE: OnceLock<Regex> = OnceLock::new();
    let hop_re =
        HOP_RE.get_or_init(|| Regex::new(r"\s*->>?\s*'[^']*'").expect("path hop regex is valid"));

    let mut changed = false;
    let rewritten = chain_re.replace_all(sql, |captures: &regex::Captures<'_>| {
        let chain = &captures[0];
        let hops: Vec<&str> = hop_re.find_iter(chain).map(|m| m.as_str()).collect();
        if hops.len() <= MAX_PATH_DEPTH {
            return chain.to_string();
        }
        changed = true;
        hops[..MAX_PATH_DEPTH].concat()
    });

    changed.then(|| rewritten.into_owned())
}

fn skip_whitespace(sql: &str, mut i: usize) -> usize {
    let bytes = sql.as_bytes();
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Index of the `)` matching the `(` at `open`, skipping string literals.
pub(crate) fn find_matching_paren(sql: &str, open: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut i = open;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_string = !in_string,
            b'(' if !in_string => depth += 1,
            b')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn split_top_level_commas(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut start = 0;

    for (i, byte) in bytes.iter().enumerate() {
        match byte {
            b'\'' => in_string = !in_string,
            b'(' if !in_string => depth += 1,
            b')' if !in_string => depth -= 1,
            b',' if depth == 0 && !in_string => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minus_becomes_except() {
        let rewritten = rewrite_minus("SELECT a FROM x MINUS SELECT a FROM y").unwrap();
        assert_eq!(rewritten, "SELECT a FROM x EXCEPT SELECT a FROM y");
        assert!(rewrite_minus("SELECT minuscule FROM t").is_none());
    }

    #[test]
    fn test_grouping_sets_flatten() {
        let sql = "SELECT a, b FROM t GROUP BY GROUPING SETS ((a, b), (a), ())";
        let rewritten = flatten_grouping_sets(sql).unwrap();
        assert_eq!(rewritten, "SELECT a, b FROM t GROUP BY a, b");
    }

    #[test]
    fn test_nolock_stripped() {
        let rewritten = strip_lock_hints("SELECT * FROM t WITH (NOLOCK) WHERE x = 1").unwrap();
        assert_eq!(rewritten, "SELECT * FROM t WHERE x = 1");
    }

    #[test]
    fn test_option_clause_stripped() {
        let rewritten = strip_option_clause("SELECT * FROM t OPTION (MAXDOP 1)").unwrap();
        assert_eq!(rewritten, "SELECT * FROM t");
    }

    #[test]
    fn test_distribute_by_stripped_up_to_limit() {
        let rewritten =
            strip_distribution_clauses("SELECT * FROM t DISTRIBUTE BY a, b LIMIT 5").unwrap();
        assert_eq!(rewritten.split_whitespace().collect::<Vec<_>>().join(" "),
            "SELECT * FROM t LIMIT 5");
    }

    #[test]
    fn test_nested_cte_hoisted() {
        let sql = "WITH outer_cte AS (WITH inner_cte AS (SELECT 1 AS x) SELECT x FROM inner_cte) \
                   SELECT * FROM outer_cte";
        let rewritten = hoist_nested_ctes(sql).unwrap();
        assert!(rewritten
            .to_lowercase()
            .starts_with("with inner_cte as (select 1 as x),"));
        assert!(!hoisted_still_nested(&rewritten));
    }

    fn hoisted_still_nested(sql: &str) -> bool {
        Regex::new(r"(?i)\bAS\s*\(\s*WITH\b").unwrap().is_match(sql)
    }

    #[test]
    fn test_two_nested_ctes_hoisted_in_sequence() {
        let sql = "WITH a AS (WITH a1 AS (SELECT 1 AS x) SELECT x FROM a1), \
                   b AS (WITH b1 AS (SELECT 2 AS y) SELECT y FROM b1) \
                   SELECT * FROM a JOIN b ON a.x = b.y";
        let rewritten = hoist_nested_ctes(sql).unwrap();
        assert!(!hoisted_still_nested(&rewritten));
        let lowered = rewritten.to_lowercase();
        assert!(lowered.contains("a1 as (select 1 as x)"));
        assert!(lowered.contains("b1 as (select 2 as y)"));
    }

    #[test]
    fn test_deep_path_chain_bounded() {
        let chain: String = (0..12).map(|i| format!(" -> 'k{i}'")).collect();
        let sql = format!("SELECT payload{chain} FROM t");
        let rewritten = bound_path_chains(&sql).unwrap();
        assert_eq!(rewritten.matches("->").count(), MAX_PATH_DEPTH);
    }

    #[test]
    fn test_shallow_path_chain_untouched() {
        assert!(bound_path_chains("SELECT payload -> 'a' ->> 'b' FROM t").is_none());
    }

    #[test]
    fn test_apply_all_no_change_borrows() {
        let sql = "SELECT * FROM t";
        assert!(matches!(apply_all(sql), Cow::Borrowed(_)));
    }
}
