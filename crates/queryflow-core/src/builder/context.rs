//! Per-statement compilation context.
//!
//! Owned exclusively by the statement being compiled and discarded once its
//! ParseResult is assembled. Nothing here crosses statement boundaries.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::{Hash, Hasher};

use crate::types::{
    Dialect, FlowEdge, FlowNode, NodeKind, OptimizationHint, QueryStats, TableCategory, TableUsage,
};

/// CTE reference discovered at a graph level that does not own the defining
/// CTE node. Resolved by the first enclosing level that owns both endpoints.
pub(crate) struct PendingCteLink {
    pub cte_id: String,
    pub target_id: String,
    pub label: String,
}

/// Accumulator threaded through one statement's compilation.
pub(crate) struct ParserContext {
    pub dialect: Dialect,
    pub stats: QueryStats,
    pub hints: Vec<OptimizationHint>,
    pub has_select_star: bool,
    /// Stays true until a genuine LIMIT value is seen
    pub has_no_limit: bool,
    /// Keyed by lowercased table label; ordered so serialization and hint
    /// iteration are deterministic
    pub table_usage: BTreeMap<String, TableUsage>,
    /// Lowercased function names seen anywhere in the statement
    pub function_usage: HashSet<String>,
    /// Lowercased CTE names in scope, in definition order
    pub cte_names: Vec<String>,
    /// Lowercased CTE name -> container node ID
    pub cte_nodes: HashMap<String, String>,
    /// CTE links waiting for a graph level that owns both endpoints
    pub pending_cte_links: Vec<PendingCteLink>,
    /// Nesting bound for CTE/subquery sub-graph compilation
    pub max_depth: usize,
    id_counter: u64,
}

impl ParserContext {
    pub(crate) fn new(dialect: Dialect, max_depth: usize) -> Self {
        Self {
            dialect,
            stats: QueryStats::default(),
            hints: Vec::new(),
            has_select_star: false,
            has_no_limit: true,
            table_usage: BTreeMap::new(),
            function_usage: HashSet::new(),
            cte_names: Vec::new(),
            cte_nodes: HashMap::new(),
            pending_cte_links: Vec::new(),
            max_depth,
            id_counter: 0,
        }
    }

    /// Deterministic node ID: same statement compiles to the same IDs.
    pub(crate) fn next_node_id(&mut self, kind: NodeKind, label: &str) -> String {
        let mut hasher = DefaultHasher::new();
        kind.as_str().hash(&mut hasher);
        label.hash(&mut hasher);
        self.id_counter.hash(&mut hasher);
        self.id_counter += 1;
        format!("{}_{:016x}", kind.as_str(), hasher.finish())
    }

    pub(crate) fn next_edge_id(&mut self, source: &str, target: &str) -> String {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        target.hash(&mut hasher);
        self.id_counter.hash(&mut hasher);
        self.id_counter += 1;
        format!("edge_{:016x}", hasher.finish())
    }

    /// Records a table node in the usage map. `stats.tables` increments only
    /// on the first occurrence of a distinct case-insensitive physical label.
    pub(crate) fn record_table(&mut self, label: &str, category: TableCategory, node_id: &str) {
        let key = label.to_lowercase();
        match self.table_usage.get_mut(&key) {
            Some(usage) => {
                usage.count += 1;
                usage.node_ids.push(node_id.to_string());
            }
            None => {
                if category == TableCategory::Physical {
                    self.stats.tables += 1;
                }
                self.table_usage.insert(
                    key,
                    TableUsage {
                        label: label.to_string(),
                        category,
                        count: 1,
                        node_ids: vec![node_id.to_string()],
                    },
                );
            }
        }
    }

    pub(crate) fn note_function(&mut self, name: &str) {
        self.function_usage.insert(name.to_lowercase());
    }

    pub(crate) fn is_cte_name(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.cte_names.iter().any(|cte| *cte == lowered)
    }
}

/// Node/edge sink for the graph level currently being built. Top-level
/// compilation and each container sub-graph get their own buffer while
/// sharing one context.
#[derive(Default)]
pub(crate) struct GraphBuf {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

impl GraphBuf {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Pushes a node and returns its ID.
    pub(crate) fn push_node(&mut self, node: FlowNode) -> String {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    pub(crate) fn link(&mut self, ctx: &mut ParserContext, source: &str, target: &str) {
        let id = ctx.next_edge_id(source, target);
        self.edges.push(FlowEdge::new(id, source, target));
    }

    pub(crate) fn link_with(
        &mut self,
        ctx: &mut ParserContext,
        source: &str,
        target: &str,
        edge: impl FnOnce(FlowEdge) -> FlowEdge,
    ) {
        let id = ctx.next_edge_id(source, target);
        self.edges.push(edge(FlowEdge::new(id, source, target)));
    }

    /// Stamps parent/depth breadcrumbs on nodes that do not already carry
    /// one (nested containers keep their own).
    pub(crate) fn stamp_parent(&mut self, parent_id: &str, depth: usize) {
        for node in &mut self.nodes {
            if node.parent_id.is_none() {
                node.parent_id = Some(parent_id.to_string());
                node.depth = Some(depth);
            }
        }
    }
}
