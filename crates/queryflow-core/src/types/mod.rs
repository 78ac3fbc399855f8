//! Public data model: requests, flow graph, and analysis results.

mod common;
mod request;
mod response;

pub use common::{hint_codes, HintCategory, LineRange, NodeWarning, OptimizationHint, Severity};
pub use request::{AnalyzeOptions, AnalyzeRequest, Dialect};
pub use response::{
    AggregateInfo, BatchResult, CaseInfo, ClauseType, ColumnInfo, ColumnLineage, Complexity,
    ComplexityBreakdown, ComplexityLevel, FlowEdge, FlowNode, LocalComplexity, NodeKind,
    ParseResult, QueryStats, TableCategory, TableUsage, Transformation, WindowInfo,
};
