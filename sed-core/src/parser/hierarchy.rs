//! Hierarchy reconstruction from range containment
//!
//! Recognized constructs arrive as a flat list. They are sorted by start
//! offset (longest first on ties) and swept with a stack: each node is
//! attached to the most recently pushed open node whose range contains it.

use crate::grammar::Language;
use crate::models::semantic_nodes::{NodeType, SemanticNode, SemanticTree};
use std::cmp::Reverse;

/// A recognized construct waiting to be placed in the tree
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Position in the depth-first walk, breaks ties between equal ranges
    pub order: usize,
    pub node: SemanticNode,
}

/// Build the semantic tree under `root` from unordered candidates
pub fn assemble(
    language: Language,
    root: SemanticNode,
    mut candidates: Vec<Candidate>,
) -> SemanticTree {
    candidates.sort_by_key(|c| (c.node.range.start_byte, Reverse(c.node.range.end_byte), c.order));

    let mut tree = SemanticTree::new(language, root);
    let mut open = vec![SemanticTree::ROOT];

    for Candidate { mut node, .. } in candidates {
        while open.len() > 1 {
            let top = open[open.len() - 1];
            if tree.nodes()[top].range.contains(&node.range) {
                break;
            }
            open.pop();
        }
        let parent = open[open.len() - 1];

        if node.node_type == NodeType::Function && owner_type(&tree, parent).is_container() {
            node.node_type = NodeType::Method;
        }

        let index = tree.add_child(parent, node);
        open.push(index);
    }

    tree
}

/// Type of the nearest ancestor that is not a plain block
fn owner_type(tree: &SemanticTree, mut index: usize) -> NodeType {
    loop {
        let node = &tree.nodes()[index];
        match (node.node_type, node.parent) {
            (NodeType::Block, Some(parent)) => index = parent,
            (node_type, _) => return node_type,
        }
    }
}
