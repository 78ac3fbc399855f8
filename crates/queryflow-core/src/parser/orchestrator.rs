//! Timed, self-healing parse orchestration.
//!
//! The parse call is blocking and cannot be interrupted; timeout handling is
//! emulated after the fact from the elapsed time. A parse failure gets one
//! dialect-guess retry, then the regex extractor takes over. No path here
//! returns an error to the caller.

use std::time::Instant;

use sqlparser::ast::Statement;

use crate::error::ParseError;
use crate::parser::{detect, parse_sql_with_dialect, preprocess};
use crate::types::{hint_codes, AnalyzeOptions, Dialect, HintCategory, OptimizationHint};

/// Elapsed-time classification against the configured timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParseTiming {
    Ok,
    /// Completed, but took more than 70% of the timeout
    NearTimeout,
    /// Took longer than the timeout; the result is discarded
    Exceeded,
}

pub(crate) fn classify_parse_duration(elapsed_ms: u64, timeout_ms: u64) -> ParseTiming {
    if elapsed_ms > timeout_ms {
        ParseTiming::Exceeded
    } else if elapsed_ms * 10 > timeout_ms * 7 {
        ParseTiming::NearTimeout
    } else {
        ParseTiming::Ok
    }
}

/// Outcome of one orchestrated parse attempt.
pub(crate) struct OrchestratedParse {
    pub statements: Vec<Statement>,
    pub hints: Vec<OptimizationHint>,
    /// True when the caller should build a partial graph via the fallback
    pub partial: bool,
    pub error: Option<ParseError>,
    pub elapsed_ms: u64,
    /// Dialect that actually produced the statements; differs from the
    /// requested one after a successful detected-dialect retry
    pub dialect: Dialect,
}

/// Preprocesses, parses with timing, retries once with a detected dialect on
/// failure, and signals fallback when nothing worked in time.
pub(crate) fn orchestrate(
    sql: &str,
    dialect: Dialect,
    options: &AnalyzeOptions,
) -> OrchestratedParse {
    let preprocessed = preprocess::apply_all(sql);
    let mut hints = Vec::new();

    let started = Instant::now();
    let parsed = parse_sql_with_dialect(&preprocessed, dialect);
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match classify_parse_duration(elapsed_ms, options.parse_timeout_ms) {
        ParseTiming::Exceeded => {
            #[cfg(feature = "tracing")]
            tracing::debug!(elapsed_ms, timeout_ms = options.parse_timeout_ms, "parse timed out");
            let error = ParseError::timeout(elapsed_ms, options.parse_timeout_ms, dialect);
            hints.push(
                OptimizationHint::error(
                    HintCategory::Parser,
                    hint_codes::PARSE_TIMEOUT,
                    error.to_string(),
                )
                .with_suggestion("simplify the statement or raise the parse timeout"),
            );
            return OrchestratedParse {
                statements: Vec::new(),
                hints,
                partial: true,
                error: Some(error),
                elapsed_ms,
                dialect,
            };
        }
        ParseTiming::NearTimeout => {
            hints.push(OptimizationHint::warning(
                HintCategory::Parser,
                hint_codes::PARSE_SLOW,
                format!(
                    "parse took {elapsed_ms}ms, over 70% of the {}ms timeout",
                    options.parse_timeout_ms
                ),
            ));
        }
        ParseTiming::Ok => {}
    }

    let first_error = match parsed {
        Ok(statements) => {
            return OrchestratedParse {
                statements,
                hints,
                partial: false,
                error: None,
                elapsed_ms,
                dialect,
            };
        }
        Err(error) => error,
    };

    // one dialect-guess retry, never a loop
    if let Some(detected) = detect::detect_dialect(sql) {
        if detected != dialect {
            #[cfg(feature = "tracing")]
            tracing::debug!(requested = dialect.name(), detected = detected.name(), "dialect retry");
            if let Ok(statements) = parse_sql_with_dialect(&preprocessed, detected) {
                hints.push(OptimizationHint::info(
                    HintCategory::Parser,
                    hint_codes::DIALECT_RETRY,
                    format!(
                        "statement failed to parse as {} but parsed as {}",
                        dialect.name(),
                        detected.name()
                    ),
                ));
                return OrchestratedParse {
                    statements,
                    hints,
                    partial: false,
                    error: None,
                    elapsed_ms,
                    dialect: detected,
                };
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(error = %first_error, "parse failed, engaging fallback");
    hints.push(
        OptimizationHint::error(
            HintCategory::Parser,
            hint_codes::PARSE_ERROR,
            first_error.to_string(),
        )
        .with_suggestion("fix the syntax error; the graph below is a partial extraction"),
    );
    OrchestratedParse {
        statements: Vec::new(),
        hints,
        partial: true,
        error: Some(first_error),
        elapsed_ms,
        dialect,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 5000, ParseTiming::Ok)]
    #[case(3500, 5000, ParseTiming::Ok)]
    #[case(3501, 5000, ParseTiming::NearTimeout)]
    #[case(5000, 5000, ParseTiming::NearTimeout)]
    #[case(5001, 5000, ParseTiming::Exceeded)]
    fn test_timing_thresholds(
        #[case] elapsed: u64,
        #[case] timeout: u64,
        #[case] expected: ParseTiming,
    ) {
        assert_eq!(classify_parse_duration(elapsed, timeout), expected);
    }

    #[test]
    fn test_clean_parse_has_no_hints() {
        let outcome = orchestrate(
            "SELECT 1",
            Dialect::Generic,
            &AnalyzeOptions::default(),
        );
        assert!(!outcome.partial);
        assert!(outcome.hints.is_empty());
        assert_eq!(outcome.statements.len(), 1);
    }

    #[test]
    fn test_unparseable_input_goes_partial_with_error_hint() {
        let outcome = orchestrate(
            "TOTALLY NOT SQL ;;;",
            Dialect::Generic,
            &AnalyzeOptions::default(),
        );
        assert!(outcome.partial);
        assert!(outcome.error.is_some());
        assert!(outcome
            .hints
            .iter()
            .any(|hint| hint.kind == hint_codes::PARSE_ERROR));
    }

    #[test]
    fn test_dialect_retry_recovers_tsql() {
        let outcome = orchestrate(
            "SELECT TOP 10 * FROM [dbo].[Users] WITH (NOLOCK)",
            Dialect::Postgres,
            &AnalyzeOptions::default(),
        );
        assert!(!outcome.partial, "detected dialect retry should succeed");
        assert_eq!(outcome.dialect, Dialect::Mssql, "outcome carries the dialect that parsed");
        assert!(outcome
            .hints
            .iter()
            .any(|hint| hint.kind == hint_codes::DIALECT_RETRY));
    }

    #[test]
    fn test_preprocessing_rescues_minus() {
        let outcome = orchestrate(
            "SELECT a FROM x MINUS SELECT a FROM y",
            Dialect::Generic,
            &AnalyzeOptions::default(),
        );
        assert!(!outcome.partial);
        assert!(outcome.error.is_none());
    }
}
