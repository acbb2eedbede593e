//! Content-addressed trees over semantic structure
//!
//! Every semantic node is decorated with three SHA-256 digests:
//! - `content_hash`: the node's text with whitespace runs collapsed
//! - `structural_hash`: `(type, ordered child types, depth)`, blind to content
//! - `merkle_hash`: content hash, structural hash and every child's merkle
//!   hash, in order
//!
//! The arena keeps parents before children, so one reverse scan computes the
//! merkle hashes bottom-up in O(n).

use crate::grammar::Language;
use crate::models::semantic_nodes::{SemanticNode, SemanticTree};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// A SHA-256 digest, rendered as lowercase hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeHash([u8; 32]);

impl NodeHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex characters, for logs
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Number of differing bits between two digests
    pub fn hamming_distance(&self, other: &Self) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    fn finish(hasher: Sha256) -> Self {
        Self(hasher.finalize().into())
    }
}

impl std::fmt::Display for NodeHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for NodeHash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for NodeHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for NodeHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Hash of whitespace-normalized content
pub fn content_hash(normalized: &str) -> NodeHash {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    NodeHash::finish(hasher)
}

/// Hash of node shape: type, ordered immediate child types and depth
pub fn structural_hash<'a>(
    node_type: &str,
    child_types: impl IntoIterator<Item = &'a str>,
    depth: usize,
) -> NodeHash {
    let mut hasher = Sha256::new();
    hasher.update(node_type.as_bytes());
    hasher.update(b"(");
    for (i, child) in child_types.into_iter().enumerate() {
        if i > 0 {
            hasher.update(b",");
        }
        hasher.update(child.as_bytes());
    }
    hasher.update(b")@");
    hasher.update(depth.to_le_bytes());
    NodeHash::finish(hasher)
}

/// Combine a node's own hashes with its children's merkle hashes
pub fn combine_hashes<'a>(
    content: &NodeHash,
    structural: &NodeHash,
    children: impl IntoIterator<Item = &'a NodeHash>,
) -> NodeHash {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.update(structural.as_bytes());
    for child in children {
        hasher.update(child.as_bytes());
    }
    NodeHash::finish(hasher)
}

/// A semantic node decorated with its hashes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleNode {
    pub semantic: SemanticNode,
    /// Whitespace-normalized text the content hash was taken over
    pub content: String,
    pub content_hash: NodeHash,
    pub structural_hash: NodeHash,
    pub merkle_hash: NodeHash,
}

/// Content-addressed tree, indexed like the semantic tree it was built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerkleTree {
    pub language: Language,
    nodes: Vec<MerkleNode>,
}

impl MerkleTree {
    pub const ROOT: usize = SemanticTree::ROOT;

    /// Build the merkle tree of `tree` in a single post-order pass
    pub fn build(tree: &SemanticTree) -> Self {
        let semantic = tree.nodes();

        let mut nodes: Vec<MerkleNode> = semantic
            .iter()
            .map(|node| {
                let content = sed_utils::normalize_whitespace(&node.text);
                let content_hash = content_hash(&content);
                let structural_hash = structural_hash(
                    node.node_type.as_str(),
                    node.children.iter().map(|&c| semantic[c].node_type.as_str()),
                    node.depth,
                );
                MerkleNode {
                    semantic: node.clone(),
                    content,
                    content_hash,
                    structural_hash,
                    merkle_hash: NodeHash::default(),
                }
            })
            .collect();

        // Children always sit after their parent, so reverse order is post-order
        for index in (0..nodes.len()).rev() {
            let node = &nodes[index];
            let merkle = combine_hashes(
                &node.content_hash,
                &node.structural_hash,
                node.semantic.children.iter().map(|&c| &nodes[c].merkle_hash),
            );
            nodes[index].merkle_hash = merkle;
        }

        let built = Self {
            language: tree.language,
            nodes,
        };
        tracing::debug!(
            language = %built.language,
            nodes = built.len(),
            root = %built.root_hash().short(),
            "built merkle tree"
        );
        built
    }

    pub fn root(&self) -> &MerkleNode {
        &self.nodes[Self::ROOT]
    }

    pub fn root_hash(&self) -> NodeHash {
        self.root().merkle_hash
    }

    pub fn get(&self, index: usize) -> Option<&MerkleNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[MerkleNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a node by id
    pub fn find(&self, id: &str) -> Option<&MerkleNode> {
        self.nodes.iter().find(|n| n.semantic.id == id)
    }

    /// Child indices of `index`, in source order
    pub fn children(&self, index: usize) -> &[usize] {
        self.nodes
            .get(index)
            .map(|n| n.semantic.children.as_slice())
            .unwrap_or_default()
    }

    /// Structural hashes of the immediate children of `index`
    pub fn child_shapes(&self, index: usize) -> Vec<NodeHash> {
        self.children(index)
            .iter()
            .map(|&c| self.nodes[c].structural_hash)
            .collect()
    }

    /// Indices of `index` and every node below it, pre-order
    pub fn subtree(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::semantic_nodes::{NodeType, SourceRange};

    fn tree_with(body: &str) -> SemanticTree {
        let source = format!("function f() {{ {body} }}");
        let range = SourceRange::new(1, 1, 0, source.len());
        let root = SemanticNode::new(NodeType::Module, "", source.clone(), range);
        let mut tree = SemanticTree::new(Language::JavaScript, root);
        let function = SemanticNode::new(NodeType::Function, "f", source, range);
        let func = tree.add_child(SemanticTree::ROOT, function);
        tree.add_child(func, SemanticNode::new(NodeType::Statement, "", body, range));
        tree
    }

    #[test]
    fn test_build_is_deterministic() {
        let tree = tree_with("return 1;");
        let first = MerkleTree::build(&tree);
        let second = MerkleTree::build(&tree);
        assert_eq!(first, second);
    }

    #[test]
    fn test_deep_change_reaches_root() {
        let before = MerkleTree::build(&tree_with("return 1;"));
        let after = MerkleTree::build(&tree_with("return 2;"));

        for index in 0..before.len() {
            let (b, a) = (&before.nodes()[index], &after.nodes()[index]);
            assert_ne!(b.merkle_hash, a.merkle_hash);
            assert_ne!(b.content_hash, a.content_hash);
            assert_eq!(b.structural_hash, a.structural_hash);
        }
    }

    #[test]
    fn test_whitespace_does_not_change_hashes() {
        let before = MerkleTree::build(&tree_with("return 1;"));
        let after = MerkleTree::build(&tree_with("return   1;\n"));
        assert_eq!(before.root_hash(), after.root_hash());
    }

    #[test]
    fn test_structural_hash_depends_on_shape_only() {
        let a = structural_hash("function", ["statement", "statement"], 1);
        let b = structural_hash("function", ["statement", "statement"], 1);
        let c = structural_hash("function", ["statement"], 1);
        let d = structural_hash("function", ["statement", "statement"], 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        // Separators keep concatenations apart
        assert_ne!(structural_hash("a", ["bc"], 0), structural_hash("a", ["b", "c"], 0));
    }

    #[test]
    fn test_hash_hex_roundtrip_and_hamming() {
        let hash = content_hash("return 1;");
        let parsed: NodeHash = hash.to_hex().parse().unwrap();
        assert_eq!(hash, parsed);
        assert_eq!(hash.hamming_distance(&parsed), 0);
        let (zeros, ones) = (NodeHash::from_bytes([0; 32]), NodeHash::from_bytes([0xff; 32]));
        assert_eq!(zeros.hamming_distance(&ones), 256);

        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{hash}\""));
    }

    #[test]
    fn test_subtree_and_shapes() {
        let merkle = MerkleTree::build(&tree_with("return 1;"));
        assert_eq!(merkle.subtree(MerkleTree::ROOT), vec![0, 1, 2]);
        assert_eq!(merkle.child_shapes(1), vec![merkle.nodes()[2].structural_hash]);
        assert!(merkle.child_shapes(2).is_empty());
    }
}
