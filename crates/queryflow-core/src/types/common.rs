//! Common types shared between requests and results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Category a hint belongs to, used by consumers to group the hints panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HintCategory {
    Performance,
    Quality,
    Safety,
    Parser,
}

/// An optimization or quality hint produced by the rule engine or the
/// parse orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationHint {
    /// Severity level
    pub severity: Severity,

    /// Hint category
    pub category: HintCategory,

    /// Machine-readable hint code
    #[serde(rename = "type")]
    pub kind: String,

    /// Human-readable message
    pub message: String,

    /// Suggested rewrite or mitigation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Optional: node this hint is anchored to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,

    /// Optional: table label this hint concerns (used for hint merging)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

impl OptimizationHint {
    pub fn error(
        category: HintCategory,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Error, category, kind, message)
    }

    pub fn warning(
        category: HintCategory,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Warning, category, kind, message)
    }

    pub fn info(
        category: HintCategory,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Info, category, kind, message)
    }

    fn new(
        severity: Severity,
        category: HintCategory,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            kind: kind.into(),
            message: message.into(),
            suggestion: None,
            node_id: None,
            table: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }
}

/// A warning attached directly to a flow node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeWarning {
    /// Machine-readable warning kind (e.g. `unused`, `repeated_scan`)
    pub kind: String,
    /// Human-readable message
    pub message: String,
}

impl NodeWarning {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// 1-based inclusive line range of a statement within the batch source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineRange {
    pub start_line: usize,
    pub end_line: usize,
}

impl LineRange {
    pub fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
        }
    }
}

/// Machine-readable hint codes.
pub mod hint_codes {
    // Orchestrator
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const PARSE_TIMEOUT: &str = "PARSE_TIMEOUT";
    pub const PARSE_SLOW: &str = "PARSE_SLOW";
    pub const DIALECT_RETRY: &str = "DIALECT_RETRY";

    // Presence checks
    pub const SELECT_STAR: &str = "SELECT_STAR";
    pub const MISSING_LIMIT: &str = "MISSING_LIMIT";
    pub const MISSING_WHERE: &str = "MISSING_WHERE";
    pub const EXCESSIVE_JOINS: &str = "EXCESSIVE_JOINS";
    pub const EXCESSIVE_SUBQUERIES: &str = "EXCESSIVE_SUBQUERIES";
    pub const CARTESIAN_RISK: &str = "CARTESIAN_RISK";

    // Structure
    pub const UNUSED_CTE: &str = "UNUSED_CTE";
    pub const DUPLICATE_SUBQUERY: &str = "DUPLICATE_SUBQUERY";
    pub const DEAD_COLUMNS: &str = "DEAD_COLUMNS";
    pub const REPEATED_SCAN: &str = "REPEATED_SCAN";

    // Performance
    pub const FILTER_PUSHDOWN: &str = "FILTER_PUSHDOWN";
    pub const EARLY_CROSS_JOIN: &str = "EARLY_CROSS_JOIN";
    pub const SUBQUERY_TO_JOIN: &str = "SUBQUERY_TO_JOIN";
    pub const NON_SARGABLE: &str = "NON_SARGABLE";
    pub const LEADING_WILDCARD: &str = "LEADING_WILDCARD";
    pub const CROSS_TABLE_OR: &str = "CROSS_TABLE_OR";
    pub const COUNT_DISTINCT: &str = "COUNT_DISTINCT";
    pub const UNGATED_AGGREGATION: &str = "UNGATED_AGGREGATION";
    pub const WIDE_GROUP_BY: &str = "WIDE_GROUP_BY";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_builders() {
        let hint = OptimizationHint::warning(
            HintCategory::Performance,
            hint_codes::REPEATED_SCAN,
            "table scanned twice",
        )
        .with_table("users")
        .with_node("table_0000000000000001");

        assert_eq!(hint.severity, Severity::Warning);
        assert_eq!(hint.kind, "REPEATED_SCAN");
        assert_eq!(hint.table.as_deref(), Some("users"));
        assert!(hint.node_id.is_some());
    }

    #[test]
    fn test_hint_serializes_kind_as_type() {
        let hint = OptimizationHint::info(HintCategory::Parser, hint_codes::DIALECT_RETRY, "x");
        let json = serde_json::to_value(&hint).unwrap();
        assert_eq!(json["type"], "DIALECT_RETRY");
        assert_eq!(json["category"], "parser");
    }
}
