//! Parsing boundary and the resilience pipeline around it.
//!
//! `parse_sql_with_dialect` is the only call site of the grammar dependency.
//! Everything above it (preprocessing, dialect detection, timing, fallback)
//! lives in the sibling modules and never lets a parse failure escape as an
//! error: the orchestrator downgrades failures to hints and partial results.

pub(crate) mod detect;
pub(crate) mod fallback;
pub(crate) mod orchestrator;
pub(crate) mod preprocess;

use sqlparser::ast::Statement;
use sqlparser::parser::Parser;

use crate::error::ParseError;
use crate::types::Dialect;

/// Expression nesting the grammar will follow before bailing out; deeper
/// input errors instead of exhausting the stack.
const RECURSION_LIMIT: usize = 128;

/// Parses SQL into statements with the given dialect.
pub fn parse_sql_with_dialect(sql: &str, dialect: Dialect) -> Result<Vec<Statement>, ParseError> {
    let parser_dialect = dialect.to_sqlparser_dialect();
    Parser::new(parser_dialect.as_ref())
        .with_recursion_limit(RECURSION_LIMIT)
        .try_with_sql(sql)
        .and_then(|mut parser| parser.parse_statements())
        .map_err(|error| ParseError::from(error).with_dialect(dialect))
}
