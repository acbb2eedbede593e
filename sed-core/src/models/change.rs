//! Change records produced by the tree differ

use super::semantic_nodes::NodeType;
use crate::merkle::{MerkleNode, NodeHash};
use serde::{Deserialize, Serialize};

/// How a node differs between the before and after trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
    Unchanged,
}

impl ChangeType {
    pub const ALL: [Self; 4] = [Self::Added, Self::Removed, Self::Modified, Self::Unchanged];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
            Self::Unchanged => "unchanged",
        }
    }

    /// Whether this change seeds impact propagation
    pub fn is_change(self) -> bool {
        self != Self::Unchanged
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of a change: what the node looked like in one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    /// Whitespace-normalized content
    pub content: String,
    /// Content hash of the node
    pub hash: NodeHash,
    pub structural_hash: NodeHash,
    pub merkle_hash: NodeHash,
    /// Structural hashes of the immediate children, in order
    pub child_shapes: Vec<NodeHash>,
    pub start_line: usize,
    pub end_line: usize,
}

impl NodeSnapshot {
    pub fn from_node(node: &MerkleNode, child_shapes: Vec<NodeHash>) -> Self {
        Self {
            content: node.content.clone(),
            hash: node.content_hash,
            structural_hash: node.structural_hash,
            merkle_hash: node.merkle_hash,
            child_shapes,
            start_line: node.semantic.range.start_line,
            end_line: node.semantic.range.end_line,
        }
    }
}

/// One diffed unit between a before tree and an after tree.
///
/// `added` changes have no `before`, `removed` changes have no `after`, and
/// `modified`/`unchanged` carry both, differing in content hash iff modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub node_id: String,
    pub node_type: NodeType,
    pub node_name: String,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    pub before: Option<NodeSnapshot>,
    pub after: Option<NodeSnapshot>,
    pub depth: usize,
}

impl Change {
    pub fn added(node: &MerkleNode, after: NodeSnapshot) -> Self {
        Self::from_parts(node, ChangeType::Added, None, Some(after))
    }

    pub fn removed(node: &MerkleNode, before: NodeSnapshot) -> Self {
        Self::from_parts(node, ChangeType::Removed, Some(before), None)
    }

    /// A matched pair; modified iff the content hashes differ
    pub fn matched(after_node: &MerkleNode, before: NodeSnapshot, after: NodeSnapshot) -> Self {
        let change_type = if before.hash == after.hash {
            ChangeType::Unchanged
        } else {
            ChangeType::Modified
        };
        Self::from_parts(after_node, change_type, Some(before), Some(after))
    }

    fn from_parts(
        node: &MerkleNode,
        change_type: ChangeType,
        before: Option<NodeSnapshot>,
        after: Option<NodeSnapshot>,
    ) -> Self {
        Self {
            node_id: node.semantic.id.clone(),
            node_type: node.semantic.node_type,
            node_name: node.semantic.name.clone(),
            change_type,
            before,
            after,
            depth: node.semantic.depth,
        }
    }

    /// Line where the change starts in the most recent snapshot it exists in
    pub fn line(&self) -> usize {
        self.after
            .as_ref()
            .or(self.before.as_ref())
            .map_or(0, |s| s.start_line)
    }
}
