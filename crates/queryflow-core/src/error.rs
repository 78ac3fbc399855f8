//! Error types for the parsing pipeline.
//!
//! A [`ParseError`] never escapes the public API: the orchestrator converts
//! it into an error hint plus a partial result. [`ValidationError`] travels
//! on the batch result as structured data.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Dialect;

/// 1-based source position extracted from a parser message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Coarse classification of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParseErrorKind {
    /// Malformed SQL at a specific token
    Syntax,
    /// Recognized SQL that the grammar does not support
    Unsupported,
    /// Input ended mid-statement
    UnexpectedEof,
    /// Tokenizer-level failure (unterminated string, bad character)
    Tokenizer,
    /// Parse exceeded the configured timeout
    Timeout,
    /// Anything else
    Other,
}

/// A failure reported by the grammar parser, annotated for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParseError {
    /// Raw parser message
    pub message: String,

    /// Position parsed out of the message, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,

    /// Dialect the failing parse attempt used
    pub dialect: Dialect,

    /// Failure classification
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(message: impl Into<String>, dialect: Dialect) -> Self {
        let message = message.into();
        let position = parse_position_from_message(&message);
        let kind = infer_kind_from_message(&message);
        Self {
            message,
            position,
            dialect,
            kind,
        }
    }

    pub fn timeout(elapsed_ms: u64, timeout_ms: u64, dialect: Dialect) -> Self {
        Self {
            message: format!("parse took {elapsed_ms}ms, exceeding the {timeout_ms}ms timeout"),
            position: None,
            dialect,
            kind: ParseErrorKind::Timeout,
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(
                f,
                "{} (line {}, column {}, dialect {})",
                self.message,
                position.line,
                position.column,
                self.dialect.name()
            ),
            None => write!(f, "{} (dialect {})", self.message, self.dialect.name()),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<sqlparser::parser::ParserError> for ParseError {
    fn from(error: sqlparser::parser::ParserError) -> Self {
        use sqlparser::parser::ParserError as Inner;
        let kind_hint = matches!(error, Inner::TokenizerError(_));
        let mut parsed = Self::new(error.to_string(), Dialect::Generic);
        if kind_hint {
            parsed.kind = ParseErrorKind::Tokenizer;
        }
        parsed
    }
}

/// Extracts `Line: N, Column: M` from sqlparser's message format.
fn parse_position_from_message(message: &str) -> Option<Position> {
    static POSITION_RE: OnceLock<Regex> = OnceLock::new();
    let re = POSITION_RE.get_or_init(|| {
        Regex::new(r"Line:\s*(\d+)\s*,\s*Column:\s*(\d+)").expect("position regex is valid")
    });

    let captures = re.captures(message)?;
    let line = captures.get(1)?.as_str().parse().ok()?;
    let column = captures.get(2)?.as_str().parse().ok()?;
    Some(Position { line, column })
}

fn infer_kind_from_message(message: &str) -> ParseErrorKind {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("eof") || lowered.contains("end of statement") {
        ParseErrorKind::UnexpectedEof
    } else if lowered.contains("unterminated") || lowered.contains("tokeniz") {
        ParseErrorKind::Tokenizer
    } else if lowered.contains("not supported") || lowered.contains("unsupported") {
        ParseErrorKind::Unsupported
    } else if lowered.contains("expected") || lowered.contains("found") {
        ParseErrorKind::Syntax
    } else {
        ParseErrorKind::Other
    }
}

/// A batch-level limit violation. Processing continues; the error is
/// attached to the batch result instead of aborting it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ValidationError {
    #[error("input is {actual} bytes, exceeding the {limit} byte limit; analyzed the truncated prefix")]
    SizeLimitExceeded { limit: usize, actual: usize },

    #[error("batch contains {actual} statements, exceeding the limit of {limit}")]
    QueryCountExceeded { limit: usize, actual: usize },
}
