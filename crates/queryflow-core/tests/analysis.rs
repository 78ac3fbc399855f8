//! End-to-end tests through the public API.

use queryflow_core::{
    analyze, analyze_sql, hint_codes, AnalyzeOptions, AnalyzeRequest, ComplexityLevel, Dialect,
    NodeKind, Severity, Transformation,
};

#[test]
fn test_mysql_example_graph() {
    let result = analyze_sql(
        "SELECT id, name FROM users WHERE active = 1 LIMIT 10",
        Dialect::Mysql,
    );
    assert_eq!(result.total_queries, 1);
    let query = &result.queries[0];
    assert!(query.is_success());

    let kinds: Vec<NodeKind> = query.nodes.iter().map(|node| node.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::Table,
            NodeKind::Filter,
            NodeKind::Select,
            NodeKind::Limit,
            NodeKind::Result,
        ]
    );
    assert_eq!(query.nodes[0].label, "users");
    assert_eq!(query.edges.len(), 4);
    assert_eq!(query.stats.tables, 1);
    assert_eq!(query.stats.conditions, 1);
    assert_eq!(query.stats.complexity.level, ComplexityLevel::Simple);
    assert!(query.hints.is_empty());
}

#[test]
fn test_three_statement_batch_with_one_error() {
    let sql = "SELECT id FROM users LIMIT 1;\nNOT EVEN CLOSE TO SQL;\nSELECT name FROM products LIMIT 1";
    let result = analyze_sql(sql, Dialect::Generic);

    assert_eq!(result.total_queries, 3);
    assert_eq!(result.success_count, 2);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.query_line_ranges.len(), 3);
    assert_eq!(result.query_line_ranges[0].start_line, 1);
    assert_eq!(result.query_line_ranges[2].start_line, 3);

    let broken = &result.queries[1];
    assert!(broken.partial);
    assert!(broken.error.is_some());
    assert!(broken
        .hints
        .iter()
        .any(|hint| hint.kind == hint_codes::PARSE_ERROR && hint.severity == Severity::Error));
}

#[test]
fn test_identical_input_identical_output() {
    let sql = "WITH base AS (SELECT id, amount FROM orders) \
               SELECT b.id, SUM(b.amount) FROM base b GROUP BY b.id";
    let first = analyze_sql(sql, Dialect::Generic);
    let second = analyze_sql(sql, Dialect::Generic);

    let first_json = serde_json::to_string(&first).unwrap();
    let second_json = serde_json::to_string(&second).unwrap();
    assert_eq!(first_json, second_json);
}

#[test]
fn test_unused_cte_warning_and_hint() {
    let result = analyze_sql(
        "WITH dead AS (SELECT 1), live AS (SELECT id FROM t) SELECT id FROM live",
        Dialect::Generic,
    );
    let query = &result.queries[0];

    let hint = query
        .hints
        .iter()
        .find(|hint| hint.kind == hint_codes::UNUSED_CTE)
        .expect("unused cte hint");
    assert!(hint.message.contains("'dead'"));

    let cte = query
        .nodes
        .iter()
        .find(|node| node.kind == NodeKind::Cte && node.label == "dead")
        .expect("dead cte node");
    assert!(cte.warnings.iter().any(|warning| warning.kind == "unused"));
}

#[test]
fn test_update_without_where_error_hint() {
    let result = analyze_sql("UPDATE accounts SET balance = 0", Dialect::Generic);
    let hint = result.queries[0]
        .hints
        .iter()
        .find(|hint| hint.kind == hint_codes::MISSING_WHERE)
        .expect("missing where hint");
    assert_eq!(hint.severity, Severity::Error);
    assert!(hint.message.contains("UPDATE without WHERE clause"));
}

#[test]
fn test_column_lineage_via_public_api() {
    let result = analyze_sql(
        "SELECT o.id AS order_id, SUM(o.amount) AS total FROM orders o GROUP BY o.id",
        Dialect::Generic,
    );
    let lineage = &result.queries[0].column_lineage;
    assert_eq!(lineage.len(), 2);
    assert_eq!(lineage[0].column, "order_id");
    assert_eq!(lineage[0].transformation, Transformation::Renamed);
    assert_eq!(lineage[1].column, "total");
    assert_eq!(lineage[1].transformation, Transformation::Aggregated);
    assert_eq!(lineage[1].source_table.as_deref(), Some("o"));
}

#[test]
fn test_table_usage_serializes_in_key_order() {
    let result = analyze_sql(
        "SELECT z.id FROM zeta z JOIN alpha a ON z.id = a.id",
        Dialect::Generic,
    );
    let text = serde_json::to_string(&result).unwrap();
    let usage = &text[text.find("\"tableUsage\"").expect("tableUsage field")..];
    let alpha = usage.find("\"alpha\"").expect("alpha key");
    let zeta = usage.find("\"zeta\"").expect("zeta key");
    assert!(alpha < zeta, "tableUsage keys must serialize sorted");
}

#[test]
fn test_complexity_grows_with_structure() {
    let simple = analyze_sql("SELECT id FROM t LIMIT 1", Dialect::Generic);
    let complex = analyze_sql(
        "WITH a AS (SELECT x FROM t1), b AS (SELECT y FROM t2) \
         SELECT a.x, SUM(b.y) OVER (PARTITION BY a.x) \
         FROM a JOIN b ON a.x = b.y \
         JOIN t3 ON t3.x = a.x \
         WHERE a.x IN (SELECT x FROM t4)",
        Dialect::Generic,
    );

    let simple_score = simple.queries[0].stats.complexity.score;
    let complex_score = complex.queries[0].stats.complexity.score;
    assert!(complex_score > simple_score);
    assert!(complex.queries[0].stats.complexity.level > ComplexityLevel::Simple);
}

#[test]
fn test_serialized_shape_is_camel_case() {
    let result = analyze_sql("SELECT id FROM users LIMIT 1", Dialect::Generic);
    let value = serde_json::to_value(&result).unwrap();

    assert!(value["totalQueries"].is_number());
    assert!(value["queryLineRanges"].is_array());
    let node = &value["queries"][0]["nodes"][0];
    assert!(node["type"].is_string(), "kind serializes as 'type'");
    assert!(node.get("children").is_none(), "empty optionals are omitted");
    let query = &value["queries"][0];
    assert!(query.get("partial").is_none(), "false partial is omitted");
    assert!(query["stats"]["maxFanOut"].is_number());
}

#[test]
fn test_options_respected() {
    let request = AnalyzeRequest::new("SELECT 1; SELECT 2; SELECT 3; SELECT 4", Dialect::Generic)
        .with_options(AnalyzeOptions {
            max_query_count: 2,
            ..Default::default()
        });
    let result = analyze(&request);
    assert_eq!(result.total_queries, 2);
    assert!(result.validation_error.is_some());
}
