//! Small shared helpers for graph construction.

use sqlparser::ast::ObjectName;

/// Renders a possibly-qualified object name as `schema.table`.
pub(crate) fn object_name_to_string(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|part| match part.as_ident() {
            Some(ident) => ident.value.clone(),
            None => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// 1-based line of the first word-boundary occurrence of `keyword` in `sql`.
/// Best-effort: quoted occurrences are not excluded.
pub(crate) fn line_of_keyword(sql: &str, keyword: &str) -> Option<usize> {
    let haystack = sql.to_lowercase();
    let needle = keyword.to_lowercase();
    let mut from = 0;

    while let Some(found) = haystack[from..].find(&needle) {
        let start = from + found;
        let end = start + needle.len();
        let boundary_before = start == 0
            || !haystack[..start]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric() || c == '_');
        let boundary_after = end >= haystack.len()
            || !haystack[end..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_');
        if boundary_before && boundary_after {
            return Some(1 + sql.as_bytes()[..start].iter().filter(|b| **b == b'\n').count());
        }
        from = end;
    }
    None
}

/// Truncates display text to `max` characters on a char boundary.
pub(crate) fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}

/// Collapses all whitespace runs to single spaces and lowercases.
pub(crate) fn normalize_ws(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
