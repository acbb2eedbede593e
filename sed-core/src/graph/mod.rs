//! Containment dependency graph
//!
//! A child depends on its parent and a parent is a dependent of each child,
//! so every containment link becomes a pair of directed edges. The graph is
//! rebuilt for every propagation run from the trees being compared.

use crate::diff::TreeDiff;
use crate::merkle::MerkleTree;
use petgraph::graph::NodeIndex;
use petgraph::{Directed, Graph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod propagation;

pub use propagation::{PropagationConfig, PropagationPath, PropagationResult, PropagationTracker};

/// Direction of a containment edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Edge from a child to its parent
    ContainedBy,
    /// Edge from a parent to a child
    Contains,
}

/// Node identifier type, the semantic node id
pub type GraphNodeId = String;

/// Directed graph of node ids linked by containment
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: Graph<GraphNodeId, DependencyKind, Directed>,
    index: HashMap<GraphNodeId, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph of one tree, keyed by node id
    pub fn from_tree(tree: &MerkleTree) -> Self {
        let mut graph = Self::new();
        graph.add_tree(tree, move |index| tree.nodes()[index].semantic.id.as_str());
        graph
    }

    /// Build the graph over both sides of a diff. A before node is keyed as
    /// the differ keyed it, so matched nodes share one vertex with their
    /// after counterpart and removed nodes get vertices of their own.
    pub fn from_diff(before: &MerkleTree, after: &MerkleTree, diff: &TreeDiff) -> Self {
        let mut graph = Self::new();
        graph.add_tree(after, move |index| after.nodes()[index].semantic.id.as_str());
        graph.add_tree(before, move |index| diff.before_keys[index].as_str());
        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built dependency graph"
        );
        graph
    }

    fn add_tree<'t>(&mut self, tree: &MerkleTree, key: impl Fn(usize) -> &'t str) {
        for (index, node) in tree.nodes().iter().enumerate() {
            match node.semantic.parent {
                Some(parent) => self.add_containment(key(parent), key(index)),
                None => {
                    self.add_node(key(index));
                }
            }
        }
    }

    /// Add a node if absent and return its index
    pub fn add_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&index) = self.index.get(id) {
            return index;
        }
        let index = self.graph.add_node(id.to_string());
        self.index.insert(id.to_string(), index);
        index
    }

    /// Link `child` to `parent` in both directions
    pub fn add_containment(&mut self, parent: &str, child: &str) {
        let (p, c) = (self.add_node(parent), self.add_node(child));
        if self.graph.find_edge(c, p).is_none() {
            self.graph.add_edge(c, p, DependencyKind::ContainedBy);
        }
        if self.graph.find_edge(p, c).is_none() {
            self.graph.add_edge(p, c, DependencyKind::Contains);
        }
    }

    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn node_id(&self, index: NodeIndex) -> Option<&str> {
        self.graph.node_weight(index).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Nodes whose meaning may shift when `index` changes
    pub fn dependents(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(index)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Language;
    use crate::models::semantic_nodes::{NodeType, SemanticNode, SemanticTree, SourceRange};

    #[test]
    fn test_containment_is_bidirectional() {
        let mut graph = DependencyGraph::new();
        graph.add_containment("module", "module/class:A");
        graph.add_containment("module", "module/class:A");

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 2);

        let class = graph.node_index("module/class:A").unwrap();
        let dependents: Vec<&str> =
            graph.dependents(class).filter_map(|i| graph.node_id(i)).collect();
        assert_eq!(dependents, vec!["module"]);
    }

    #[test]
    fn test_diff_graph_merges_matched_nodes_only() {
        let range = SourceRange::new(1, 1, 0, 10);
        // (text, line) statements under one module
        let build = |statements: &[(&str, usize)]| {
            let source: String = statements.iter().map(|s| s.0).collect();
            let root = SemanticNode::new(NodeType::Module, "", source, range);
            let mut tree = SemanticTree::new(Language::JavaScript, root);
            for &(text, line) in statements {
                let stmt_range = SourceRange::new(line, line, 0, text.len());
                let statement = SemanticNode::new(NodeType::Statement, "", text, stmt_range);
                tree.add_child(SemanticTree::ROOT, statement);
            }
            MerkleTree::build(&tree)
        };
        let before = build(&[("a();", 1), ("b();", 5)]);
        let after = build(&[("b();", 5)]);
        let diff = crate::diff::diff_trees(&before, &after);
        let graph = DependencyGraph::from_diff(&before, &after, &diff);

        // module, the surviving statement, and the removed one on its own
        assert_eq!(graph.node_count(), 3);
        assert!(graph.contains("module/statement"));
        assert!(graph.contains("before:module/statement"));
        assert_eq!(graph.edge_count(), 4);

        let removed = graph.node_index("before:module/statement").unwrap();
        let dependents: Vec<&str> =
            graph.dependents(removed).filter_map(|i| graph.node_id(i)).collect();
        assert_eq!(dependents, vec!["module"]);
    }

    #[test]
    fn test_single_tree_graph() {
        let range = SourceRange::new(1, 1, 0, 10);
        let mut tree =
            SemanticTree::new(Language::Rust, SemanticNode::new(NodeType::Module, "", "", range));
        let class =
            tree.add_child(SemanticTree::ROOT, SemanticNode::new(NodeType::Class, "S", "", range));
        tree.add_child(class, SemanticNode::new(NodeType::Method, "new", "", range));
        let graph = DependencyGraph::from_tree(&MerkleTree::build(&tree));

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 4);
        let class = graph.node_index("module/class:S").unwrap();
        assert_eq!(graph.dependents(class).count(), 2);
    }
}
