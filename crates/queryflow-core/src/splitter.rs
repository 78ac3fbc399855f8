//! Statement splitting for batched SQL input.
//!
//! Splits on top-level semicolons only: semicolons inside string literals,
//! quoted identifiers, comments, or parentheses never terminate a statement.
//! This runs before parsing, so it must work on text the grammar rejects.

use std::ops::Range;

use crate::types::LineRange;

/// One trimmed statement with its location in the batch source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitStatement {
    /// Trimmed statement text
    pub sql: String,
    /// Byte range of the trimmed text within the original input
    pub span: Range<usize>,
    /// 1-based inclusive line range of the trimmed text
    pub line_range: LineRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Plain,
    SingleQuote,
    DoubleQuote,
    Backtick,
    LineComment,
    BlockComment,
}

/// Splits `sql` on top-level semicolons, dropping empty segments.
pub fn split_statements(sql: &str) -> Vec<SplitStatement> {
    let bytes = sql.as_bytes();
    let mut out = Vec::new();
    let mut state = ScanState::Plain;
    let mut block_depth = 0usize;
    let mut paren_depth = 0i32;
    let mut start = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let byte = bytes[i];
        match state {
            ScanState::Plain => match byte {
                b'\'' => state = ScanState::SingleQuote,
                b'"' => state = ScanState::DoubleQuote,
                b'`' => state = ScanState::Backtick,
                b'#' => state = ScanState::LineComment,
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    state = ScanState::LineComment;
                    i += 1;
                }
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    state = ScanState::LineComment;
                    i += 1;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    state = ScanState::BlockComment;
                    block_depth = 1;
                    i += 1;
                }
                b'(' => paren_depth += 1,
                b')' => paren_depth -= 1,
                b';' if paren_depth <= 0 => {
                    push_segment(sql, start..i, &mut out);
                    start = i + 1;
                }
                _ => {}
            },
            ScanState::SingleQuote => match byte {
                // backslash escapes (MySQL-style) must not end the literal
                b'\\' => i += 1,
                b'\'' => state = ScanState::Plain,
                _ => {}
            },
            ScanState::DoubleQuote => match byte {
                b'\\' => i += 1,
                b'"' => state = ScanState::Plain,
                _ => {}
            },
            ScanState::Backtick => {
                if byte == b'`' {
                    state = ScanState::Plain;
                }
            }
            ScanState::LineComment => {
                if byte == b'\n' {
                    state = ScanState::Plain;
                }
            }
            ScanState::BlockComment => {
                if byte == b'/' && bytes.get(i + 1) == Some(&b'*') {
                    block_depth += 1;
                    i += 1;
                } else if byte == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    block_depth -= 1;
                    i += 1;
                    if block_depth == 0 {
                        state = ScanState::Plain;
                    }
                }
            }
        }
        i += 1;
    }

    push_segment(sql, start..sql.len(), &mut out);
    out
}

fn push_segment(sql: &str, range: Range<usize>, out: &mut Vec<SplitStatement>) {
    let raw = &sql[range.clone()];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }

    let leading = raw.len() - raw.trim_start().len();
    let span = (range.start + leading)..(range.start + leading + trimmed.len());
    let start_line = line_at_offset(sql, span.start);
    let end_line = line_at_offset(sql, span.end.saturating_sub(1));

    out.push(SplitStatement {
        sql: trimmed.to_string(),
        span,
        line_range: LineRange::new(start_line, end_line),
    });
}

fn line_at_offset(sql: &str, offset: usize) -> usize {
    1 + sql
        .as_bytes()
        .iter()
        .take(offset.min(sql.len()))
        .filter(|byte| **byte == b'\n')
        .count()
}
