//! Whole-statement graph construction tests.

use crate::builder::context::{GraphBuf, ParserContext};
use crate::parser::parse_sql_with_dialect;
use crate::types::{ClauseType, Dialect, FlowNode, NodeKind, TableCategory};

fn build(sql: &str) -> (ParserContext, GraphBuf) {
    build_with(sql, Dialect::Generic, 10)
}

fn build_with(sql: &str, dialect: Dialect, max_depth: usize) -> (ParserContext, GraphBuf) {
    let statements = parse_sql_with_dialect(sql, dialect).expect("parse");
    let mut ctx = ParserContext::new(dialect, max_depth);
    let mut buf = GraphBuf::new();
    for statement in &statements {
        super::build_statement(statement, sql, &mut ctx, &mut buf);
    }
    (ctx, buf)
}

fn find<'a>(buf: &'a GraphBuf, kind: NodeKind) -> &'a FlowNode {
    buf.nodes
        .iter()
        .find(|node| node.kind == kind)
        .unwrap_or_else(|| panic!("no {kind:?} node in {:?}", kinds(buf)))
}

fn kinds(buf: &GraphBuf) -> Vec<NodeKind> {
    buf.nodes.iter().map(|node| node.kind).collect()
}

/// Follows the single outgoing edge from `id`.
fn successor<'a>(buf: &'a GraphBuf, id: &str) -> &'a FlowNode {
    let targets: Vec<&str> = buf
        .edges
        .iter()
        .filter(|edge| edge.source == id)
        .map(|edge| edge.target.as_str())
        .collect();
    assert_eq!(targets.len(), 1, "expected one outgoing edge from {id}");
    buf.nodes
        .iter()
        .find(|node| node.id == targets[0])
        .expect("edge target exists")
}

#[test]
fn test_simple_select_graph_shape() {
    let (ctx, buf) = build_with(
        "SELECT id, name FROM users WHERE active = 1 LIMIT 10",
        Dialect::Mysql,
        10,
    );

    assert_eq!(ctx.stats.tables, 1);
    assert!(!ctx.has_no_limit);
    assert!(!ctx.has_select_star);

    let table = find(&buf, NodeKind::Table);
    assert_eq!(table.label, "users");
    assert_eq!(table.table_category, Some(TableCategory::Physical));

    let filter = successor(&buf, &table.id);
    assert_eq!(filter.kind, NodeKind::Filter);
    assert_eq!(filter.label, "WHERE");

    let select = successor(&buf, &filter.id);
    assert_eq!(select.kind, NodeKind::Select);
    let columns = select.columns.as_ref().expect("columns");
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].name, "id");
    assert_eq!(columns[1].name, "name");

    let limit = successor(&buf, &select.id);
    assert_eq!(limit.kind, NodeKind::Limit);

    let result = successor(&buf, &limit.id);
    assert_eq!(result.kind, NodeKind::Result);

    assert_eq!(buf.nodes.len(), 5);
    assert_eq!(buf.edges.len(), 4);
}

#[test]
fn test_clause_pipeline_order() {
    let sql = "SELECT dept, COUNT(*) AS n, ROW_NUMBER() OVER (ORDER BY dept) AS rn \
               FROM employees \
               WHERE active = 1 \
               GROUP BY dept \
               HAVING COUNT(*) > 3 \
               ORDER BY n DESC \
               LIMIT 20";
    let (ctx, buf) = build(sql);

    let table = find(&buf, NodeKind::Table);
    let mut chain = vec![table.kind];
    let mut node = table;
    while let Some(edge) = buf.edges.iter().find(|edge| edge.source == node.id) {
        node = buf
            .nodes
            .iter()
            .find(|candidate| candidate.id == edge.target)
            .expect("target");
        chain.push(node.kind);
    }

    assert_eq!(
        chain,
        vec![
            NodeKind::Table,
            NodeKind::Filter,    // WHERE
            NodeKind::Aggregate, // GROUP BY
            NodeKind::Filter,    // HAVING
            NodeKind::Aggregate, // AGGREGATE
            NodeKind::Window,
            NodeKind::Select,
            NodeKind::Sort,
            NodeKind::Limit,
            NodeKind::Result,
        ]
    );
    assert_eq!(ctx.stats.aggregations, 1);
    assert_eq!(ctx.stats.window_functions, 1);
    assert_eq!(ctx.stats.conditions, 2);
}

#[test]
fn test_join_wiring_and_condition_count() {
    let (ctx, buf) = build(
        "SELECT o.id FROM orders o \
         JOIN users u ON o.user_id = u.id AND u.active = 1 \
         LEFT JOIN addresses a ON u.id = a.user_id",
    );

    assert_eq!(ctx.stats.joins, 2);
    assert_eq!(ctx.stats.conditions, 3);
    assert_eq!(ctx.stats.tables, 3);

    let join_labels: Vec<&str> = buf
        .nodes
        .iter()
        .filter(|node| node.kind == NodeKind::Join)
        .map(|node| node.label.as_str())
        .collect();
    assert_eq!(join_labels, vec!["JOIN", "LEFT JOIN"]);
}

#[test]
fn test_distinct_physical_tables_counted_once() {
    let (ctx, _) = build(
        "SELECT a.id FROM employees a \
         JOIN employees b ON a.manager_id = b.id \
         JOIN Employees c ON b.manager_id = c.id",
    );
    assert_eq!(ctx.stats.tables, 1);
    assert_eq!(ctx.table_usage["employees"].count, 3);
}

#[test]
fn test_tables_in_subqueries_counted() {
    let (ctx, _) = build(
        "SELECT id FROM orders WHERE amount > (SELECT AVG(amount) FROM payments)",
    );
    assert_eq!(ctx.stats.tables, 2);
    assert_eq!(ctx.stats.subqueries, 1);
}

#[test]
fn test_union_all_node() {
    let (ctx, buf) = build("SELECT a FROM x UNION ALL SELECT a FROM y");

    assert_eq!(ctx.stats.unions, 1);
    let union = find(&buf, NodeKind::Union);
    assert_eq!(union.label, "UNION ALL");

    let incoming = buf
        .edges
        .iter()
        .filter(|edge| edge.target == union.id)
        .count();
    assert_eq!(incoming, 2);

    let result = successor(&buf, &union.id);
    assert_eq!(result.kind, NodeKind::Result);
}

#[test]
fn test_cte_container_and_reference() {
    let (ctx, buf) = build("WITH recent AS (SELECT id FROM orders) SELECT id FROM recent");

    assert_eq!(ctx.stats.ctes, 1);
    let cte = find(&buf, NodeKind::Cte);
    assert_eq!(cte.label, "recent");
    assert_eq!(cte.collapsed, Some(true));
    let children = cte.children.as_ref().expect("cte body");
    assert!(children.iter().any(|node| node.label == "orders"));
    assert!(children
        .iter()
        .all(|node| node.parent_id.as_deref() == Some(cte.id.as_str())));

    let reference = buf
        .nodes
        .iter()
        .find(|node| node.table_category == Some(TableCategory::CteReference))
        .expect("reference node");
    assert_eq!(reference.label.to_lowercase(), "recent");
    assert!(buf
        .edges
        .iter()
        .any(|edge| edge.source == cte.id && edge.target == reference.id));

    // only the physical table inside the body counts; the reference does not
    assert_eq!(ctx.stats.tables, 1);
}

#[test]
fn test_recursive_cte_does_not_loop() {
    let (ctx, buf) = build(
        "WITH RECURSIVE walk AS (\
             SELECT id, parent FROM nodes WHERE parent IS NULL \
             UNION ALL \
             SELECT n.id, n.parent FROM nodes n JOIN walk w ON n.parent = w.id) \
         SELECT id FROM walk",
    );
    assert_eq!(ctx.stats.ctes, 1);
    let cte = find(&buf, NodeKind::Cte);
    let children = cte.children.as_ref().expect("body");
    // the self-reference inside the body resolves to a CTE reference node
    assert!(children
        .iter()
        .any(|node| node.table_category == Some(TableCategory::CteReference)
            && node.label.to_lowercase() == "walk"));
}

/// Every edge's source and target must exist at the level carrying the edge,
/// recursively through container sub-graphs.
fn assert_edges_closed(nodes: &[FlowNode], edges: &[crate::types::FlowEdge], scope: &str) {
    let ids: std::collections::HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
    for edge in edges {
        assert!(
            ids.contains(edge.source.as_str()),
            "{scope}: edge {} has dangling source {}",
            edge.id,
            edge.source
        );
        assert!(
            ids.contains(edge.target.as_str()),
            "{scope}: edge {} has dangling target {}",
            edge.id,
            edge.target
        );
    }
    for node in nodes {
        if let (Some(children), Some(child_edges)) = (&node.children, &node.child_edges) {
            assert_edges_closed(children, child_edges, &node.label);
        }
    }
}

#[test]
fn test_cte_reference_in_derived_table_keeps_edges_closed() {
    let (_, buf) = build("WITH r AS (SELECT 1 AS x) SELECT * FROM (SELECT x FROM r) sub");
    assert_edges_closed(&buf.nodes, &buf.edges, "top");

    // the cross-level link lands between the CTE and the derived table
    let cte = find(&buf, NodeKind::Cte);
    let container = find(&buf, NodeKind::Subquery);
    assert!(buf
        .edges
        .iter()
        .any(|edge| edge.source == cte.id && edge.target == container.id));
}

#[test]
fn test_recursive_cte_self_reference_emits_no_edge() {
    let (_, buf) = build(
        "WITH RECURSIVE walk AS (\
             SELECT 1 AS n UNION ALL SELECT n + 1 FROM walk WHERE n < 5) \
         SELECT * FROM walk",
    );
    assert_edges_closed(&buf.nodes, &buf.edges, "top");

    let cte = find(&buf, NodeKind::Cte);
    assert!(
        !buf.edges.iter().any(|edge| edge.source == cte.id && edge.target == cte.id),
        "self reference must not produce a loop edge"
    );
}

#[test]
fn test_cte_chained_into_later_cte_links_containers() {
    let (_, buf) = build(
        "WITH a AS (SELECT 1 AS x), b AS (SELECT x FROM a) SELECT x FROM b",
    );
    assert_edges_closed(&buf.nodes, &buf.edges, "top");

    let ids: Vec<(&str, &str)> = buf
        .nodes
        .iter()
        .filter(|node| node.kind == NodeKind::Cte)
        .map(|node| (node.label.as_str(), node.id.as_str()))
        .collect();
    let a = ids.iter().find(|(label, _)| *label == "a").expect("cte a").1;
    let b = ids.iter().find(|(label, _)| *label == "b").expect("cte b").1;
    assert!(buf.edges.iter().any(|edge| edge.source == a && edge.target == b));
}

#[test]
fn test_depth_bound_truncates_nesting() {
    let (_, buf) = build_with(
        "SELECT * FROM (SELECT * FROM (SELECT id FROM t) inner1) outer1",
        Dialect::Generic,
        1,
    );
    let container = find(&buf, NodeKind::Subquery);
    let children = container.children.as_ref().expect("first level built");
    let nested = children
        .iter()
        .find(|node| node.kind == NodeKind::Subquery)
        .expect("nested container kept");
    assert_eq!(nested.children.as_ref().map(Vec::len), Some(0));
}

#[test]
fn test_insert_select_wiring() {
    let (ctx, buf) = build("INSERT INTO archive SELECT * FROM events WHERE ts < 100");

    let write = buf
        .nodes
        .iter()
        .find(|node| node.kind == NodeKind::Table && node.label == "archive")
        .expect("write node");
    assert!(buf
        .edges
        .iter()
        .any(|edge| edge.target == write.id && edge.clause_type == Some(ClauseType::Insert)));
    assert_eq!(ctx.stats.tables, 2);
}

#[test]
fn test_update_with_where_wiring() {
    let (_, buf) = build("UPDATE users SET active = 0 WHERE last_login < 100");

    let filter = find(&buf, NodeKind::Filter);
    let write = find(&buf, NodeKind::Table);
    assert_eq!(write.label, "users");
    assert!(buf
        .edges
        .iter()
        .any(|edge| edge.source == filter.id
            && edge.target == write.id
            && edge.clause_type == Some(ClauseType::Update)));
}

#[test]
fn test_delete_using_wiring() {
    let (ctx, buf) = build(
        "DELETE FROM sessions USING users WHERE sessions.user_id = users.id AND users.banned",
    );
    assert_eq!(ctx.stats.tables, 2);
    let filter = find(&buf, NodeKind::Filter);
    let write = buf
        .nodes
        .iter()
        .find(|node| node.label == "sessions")
        .expect("target");
    assert!(buf
        .edges
        .iter()
        .any(|edge| edge.source == filter.id && edge.target == write.id));
}

#[test]
fn test_create_table_as_select() {
    let (_, buf) = build("CREATE TABLE daily AS SELECT day, SUM(v) FROM raw GROUP BY day");
    let write = buf
        .nodes
        .iter()
        .find(|node| node.label == "daily")
        .expect("created table node");
    assert!(write.description.starts_with("CREATE TABLE AS SELECT:"));
    assert!(buf
        .edges
        .iter()
        .any(|edge| edge.target == write.id && edge.clause_type == Some(ClauseType::Create)));
}

#[test]
fn test_utility_statement_single_node() {
    let (ctx, buf) = build("SET search_path TO analytics");
    assert_eq!(buf.nodes.len(), 1);
    assert!(buf.edges.is_empty());
    assert_eq!(buf.nodes[0].kind, NodeKind::Operation);
    assert_eq!(buf.nodes[0].label, "Set Session Variable");
    assert_eq!(ctx.stats.tables, 0);
}

#[test]
fn test_select_star_sets_flag() {
    let (ctx, _) = build("SELECT * FROM t LIMIT 1");
    assert!(ctx.has_select_star);
}

#[test]
fn test_scalar_subquery_feeds_select() {
    let (ctx, buf) = build("SELECT id, (SELECT MAX(v) FROM m) AS peak FROM t");
    assert_eq!(ctx.stats.subqueries, 1);
    let select = find(&buf, NodeKind::Select);
    let container = find(&buf, NodeKind::Subquery);
    assert!(buf
        .edges
        .iter()
        .any(|edge| edge.source == container.id
            && edge.target == select.id
            && edge.clause_type == Some(ClauseType::Subquery)));
}
