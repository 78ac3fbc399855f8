//! SQL statement analysis: flow graphs, stats, lineage, and optimization
//! hints.
//!
//! Feed a batch of SQL to [`analyze`] (or [`analyze_sql`]) and get back one
//! [`ParseResult`] per statement: a directed flow graph of typed nodes and
//! edges, per-query statistics with a weighted complexity score, column
//! lineage for the outer SELECT, and a list of optimization hints. Parsing
//! never fails the batch; broken statements degrade to a regex-extracted
//! partial graph with the error attached.

pub mod error;
pub mod types;

pub(crate) mod builder;
pub(crate) mod hints;
pub(crate) mod lineage;
pub(crate) mod parser;
pub(crate) mod stats;

mod batch;
mod splitter;

pub use batch::{analyze, analyze_sql};
pub use error::{ParseError, ValidationError};
pub use splitter::{split_statements, SplitStatement};

// Re-export types explicitly
pub use types::{
    // Hint codes
    hint_codes,
    // Request types
    AnalyzeOptions,
    AnalyzeRequest,
    // Response types
    AggregateInfo,
    BatchResult,
    CaseInfo,
    ClauseType,
    ColumnInfo,
    ColumnLineage,
    Complexity,
    ComplexityBreakdown,
    ComplexityLevel,
    Dialect,
    FlowEdge,
    FlowNode,
    HintCategory,
    LineRange,
    LocalComplexity,
    NodeKind,
    NodeWarning,
    OptimizationHint,
    ParseResult,
    QueryStats,
    Severity,
    TableCategory,
    TableUsage,
    Transformation,
    WindowInfo,
};
