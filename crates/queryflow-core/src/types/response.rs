//! Flow graph and analysis result types.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::common::{LineRange, NodeWarning, OptimizationHint};

/// Kind of a flow graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Table,
    Join,
    Filter,
    Aggregate,
    Window,
    Case,
    Select,
    Sort,
    Limit,
    Cte,
    Subquery,
    Union,
    Result,
    Operation,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Table => "table",
            NodeKind::Join => "join",
            NodeKind::Filter => "filter",
            NodeKind::Aggregate => "aggregate",
            NodeKind::Window => "window",
            NodeKind::Case => "case",
            NodeKind::Select => "select",
            NodeKind::Sort => "sort",
            NodeKind::Limit => "limit",
            NodeKind::Cte => "cte",
            NodeKind::Subquery => "subquery",
            NodeKind::Union => "union",
            NodeKind::Result => "result",
            NodeKind::Operation => "operation",
        }
    }
}

/// How a table reference resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TableCategory {
    /// A physical table or view in the database
    Physical,
    /// A derived table (subquery in FROM)
    Derived,
    /// A reference to a CTE defined in the same statement
    CteReference,
    /// A table-valued function call
    TableFunction,
}

/// Coarse per-node complexity tag derived from nearby counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LocalComplexity {
    Low,
    Medium,
    High,
}

/// A projected column carried on a select node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Output name (alias when present, derived name otherwise)
    pub name: String,

    /// Rendered source expression
    pub expression: String,

    /// Alias, when the projection used `AS`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Aggregate detail payload for aggregate nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregateInfo {
    /// Aggregate function calls, rendered (e.g. `SUM(amount)`)
    pub functions: Vec<String>,
}

/// Window detail payload for window nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    /// Window function calls, rendered
    pub functions: Vec<String>,
}

/// CASE expression detail payload for case nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaseInfo {
    /// Number of CASE expressions in the projection
    pub expressions: usize,
    /// Total number of WHEN branches
    pub branches: usize,
}

/// A node in the statement flow graph.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    /// Unique node ID within one statement graph
    pub id: String,

    /// Node kind
    #[serde(rename = "type")]
    pub kind: NodeKind,

    /// Short display label
    pub label: String,

    /// Longer description (clause text, table alias, etc.)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Nested sub-graph nodes for container nodes (CTE, subquery)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FlowNode>>,

    /// Edges of the nested sub-graph; present whenever `children` is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_edges: Option<Vec<FlowEdge>>,

    /// Containers start collapsed in the rendering surface
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,

    /// Projected columns (select nodes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<ColumnInfo>>,

    /// Aggregate detail (aggregate nodes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<AggregateInfo>,

    /// Window detail (window nodes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowInfo>,

    /// CASE detail (case nodes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<CaseInfo>,

    /// Warnings attached by the hint engine
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<NodeWarning>,

    /// Breadcrumb: enclosing container node ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Breadcrumb: nesting depth (0 = top level)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,

    /// Table resolution category (table nodes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_category: Option<TableCategory>,

    /// Local complexity tag set by the stats post-pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_complexity: Option<LocalComplexity>,
}

impl FlowNode {
    pub fn new(id: impl Into<String>, kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            description: String::new(),
            children: None,
            child_edges: None,
            collapsed: None,
            columns: None,
            aggregate: None,
            window: None,
            case: None,
            warnings: Vec::new(),
            parent_id: None,
            depth: None,
            table_category: None,
            local_complexity: None,
        }
    }

    pub fn table(id: impl Into<String>, label: impl Into<String>, category: TableCategory) -> Self {
        let mut node = Self::new(id, NodeKind::Table, label);
        node.table_category = Some(category);
        node
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Attaches a nested sub-graph, marking the container collapsed.
    pub fn with_children(mut self, nodes: Vec<FlowNode>, edges: Vec<FlowEdge>) -> Self {
        self.children = Some(nodes);
        self.child_edges = Some(edges);
        self.collapsed = Some(true);
        self
    }

    pub fn with_columns(mut self, columns: Vec<ColumnInfo>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn with_aggregate(mut self, info: AggregateInfo) -> Self {
        self.aggregate = Some(info);
        self
    }

    pub fn with_window(mut self, info: WindowInfo) -> Self {
        self.window = Some(info);
        self
    }

    pub fn with_case(mut self, info: CaseInfo) -> Self {
        self.case = Some(info);
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>, depth: usize) -> Self {
        self.parent_id = Some(parent_id.into());
        self.depth = Some(depth);
        self
    }
}

/// Clause that produced an edge, for click-to-source navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClauseType {
    From,
    Join,
    Where,
    GroupBy,
    Having,
    Select,
    OrderBy,
    Limit,
    Union,
    With,
    Insert,
    Update,
    Delete,
    Merge,
    Create,
    Result,
    Subquery,
}

/// A directed edge in the statement flow graph.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    /// Unique edge ID within one statement graph
    pub id: String,

    /// Source node ID
    pub source: String,

    /// Target node ID
    pub target: String,

    /// Clause text that produced this edge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clause: Option<String>,

    /// Clause type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clause_type: Option<ClauseType>,

    /// 1-based line of the clause in the statement source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_line: Option<usize>,
}

impl FlowEdge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            clause: None,
            clause_type: None,
            source_line: None,
        }
    }

    pub fn with_clause(mut self, clause: impl Into<String>, clause_type: ClauseType) -> Self {
        self.clause = Some(clause.into());
        self.clause_type = Some(clause_type);
        self
    }

    pub fn with_source_line(mut self, line: Option<usize>) -> Self {
        self.source_line = line;
        self
    }
}

/// Complexity level derived from the weighted score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    #[default]
    Simple,
    Moderate,
    Complex,
    #[serde(rename = "very-complex")]
    VeryComplex,
}

/// Per-factor contributions to the complexity score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityBreakdown {
    pub joins: u32,
    pub subqueries: u32,
    pub ctes: u32,
    pub aggregations: u32,
    pub window_functions: u32,
}

/// Weighted complexity score with level and breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Complexity {
    /// Weighted score, clamped to 0..=100
    pub score: u32,
    /// Four-level ordinal mapped from the score
    pub level: ComplexityLevel,
    /// Per-factor contributions
    pub breakdown: ComplexityBreakdown,
}

/// Statistics for one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryStats {
    /// Distinct case-insensitive physical tables
    pub tables: usize,
    pub joins: usize,
    pub subqueries: usize,
    pub ctes: usize,
    pub aggregations: usize,
    pub window_functions: usize,
    pub unions: usize,
    /// WHERE/HAVING/ON predicates
    pub conditions: usize,

    /// Deepest CTE nesting level
    pub max_cte_depth: usize,
    /// Maximum edge out-degree over all nodes
    pub max_fan_out: usize,
    /// Longest path from any root node
    pub critical_path_length: usize,

    pub complexity: Complexity,
}

/// How an output column relates to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Transformation {
    Direct,
    Renamed,
    Aggregated,
    Calculated,
    Passthrough,
}

/// Column-level lineage for one projected column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnLineage {
    /// Output column name
    pub column: String,

    /// Rendered source expression
    pub expression: String,

    /// Best-effort single source column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_column: Option<String>,

    /// Best-effort source table/alias
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_table: Option<String>,

    /// Transformation kind
    pub transformation: Transformation,
}

/// Usage record for one table label.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableUsage {
    /// Display label (original casing of the first occurrence)
    pub label: String,
    /// Resolution category
    pub category: TableCategory,
    /// Number of table nodes referencing this label
    pub count: usize,
    /// IDs of those nodes
    pub node_ids: Vec<String>,
}

/// Analysis result for one statement.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
    pub stats: QueryStats,
    pub hints: Vec<OptimizationHint>,
    pub column_lineage: Vec<ColumnLineage>,
    /// Keyed by lowercased table label; ordered for deterministic output
    pub table_usage: BTreeMap<String, TableUsage>,
    /// Statement source text
    pub sql: String,

    /// Parsed AST, kept for downstream rule engines; not serialized
    #[serde(skip)]
    #[schemars(skip)]
    pub ast: Option<sqlparser::ast::Statement>,

    /// True when the regex fallback produced this result
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,

    /// Parse error message, when parsing failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParseResult {
    pub fn empty(sql: impl Into<String>) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            stats: QueryStats::default(),
            hints: Vec::new(),
            column_lineage: Vec::new(),
            table_usage: BTreeMap::new(),
            sql: sql.into(),
            ast: None,
            partial: false,
            error: None,
        }
    }

    /// True when this statement compiled without fallback or parse error.
    pub fn is_success(&self) -> bool {
        !self.partial && self.error.is_none()
    }
}

/// Aggregated result for a multi-statement batch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// Per-statement results, in source order
    pub queries: Vec<ParseResult>,
    pub total_queries: usize,
    pub success_count: usize,
    pub error_count: usize,
    /// 1-based line range of each statement in the batch source
    pub query_line_ranges: Vec<LineRange>,
    /// Size/count limit violation, when one occurred
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<ValidationError>,
}
