//! Semantic node models for structural code analysis.
//!
//! A parse produces a [`SemanticTree`]: an arena of [`SemanticNode`]s linked by
//! index. Parents are always stored before their children, so a reverse scan
//! of the arena is a valid post-order for bottom-up computations.

use crate::grammar::Language;
use serde::{Deserialize, Serialize};

/// Kind of code construct a semantic node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Function,
    Class,
    Method,
    Variable,
    Import,
    Export,
    Type,
    Interface,
    Enum,
    Block,
    Statement,
    Expression,
    Comment,
    Module,
    Other,
    Unknown,
}

impl NodeType {
    /// Get the lowercase name used in ids and reports
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Method => "method",
            Self::Variable => "variable",
            Self::Import => "import",
            Self::Export => "export",
            Self::Type => "type",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Block => "block",
            Self::Statement => "statement",
            Self::Expression => "expression",
            Self::Comment => "comment",
            Self::Module => "module",
            Self::Other => "other",
            Self::Unknown => "unknown",
        }
    }

    /// Whether nodes of this type can own methods
    pub fn is_container(self) -> bool {
        matches!(self, Self::Class | Self::Interface)
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source location of a node. Lines are 1-based, byte offsets 0-based and
/// end-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRange {
    pub start_line: usize,
    pub end_line: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl SourceRange {
    pub fn new(start_line: usize, end_line: usize, start_byte: usize, end_byte: usize) -> Self {
        Self {
            start_line,
            end_line,
            start_byte,
            end_byte,
        }
    }

    /// Check whether `other` lies within this range
    pub fn contains(&self, other: &Self) -> bool {
        self.start_byte <= other.start_byte && other.end_byte <= self.end_byte
    }

    /// Number of source lines covered
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// Language-specific facts about a node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    pub visibility: Option<String>,
    pub is_async: bool,
    pub is_static: bool,
    pub parameters: Vec<String>,
    pub return_type: Option<String>,
    pub doc_comment: Option<String>,
    /// 1 + number of decision points in the subtree, for callables
    pub complexity: Option<u32>,
}

/// Universal semantic code node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticNode {
    /// Path-shaped id, unique within one tree (e.g. `module/class:Foo/method:bar`)
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Empty for anonymous constructs
    pub name: String,
    pub range: SourceRange,
    /// Source text covered by the node
    pub text: String,
    pub depth: usize,
    pub parent: Option<usize>,
    /// Indices of the children, in source order
    pub children: Vec<usize>,
    pub metadata: NodeMetadata,
}

impl SemanticNode {
    /// Create a detached node. Id, depth and links are assigned when the node
    /// is attached to a [`SemanticTree`].
    pub fn new(
        node_type: NodeType,
        name: impl Into<String>,
        text: impl Into<String>,
        range: SourceRange,
    ) -> Self {
        Self {
            id: String::new(),
            node_type,
            name: name.into(),
            range,
            text: text.into(),
            depth: 0,
            parent: None,
            children: Vec::new(),
            metadata: NodeMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: NodeMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The id segment contributed by this node, without sibling ordinal
    fn id_segment(&self) -> String {
        if self.name.is_empty() {
            self.node_type.as_str().to_string()
        } else {
            format!("{}:{}", self.node_type, self.name)
        }
    }
}

/// Arena-backed tree of semantic nodes for one parsed source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticTree {
    pub language: Language,
    nodes: Vec<SemanticNode>,
}

impl SemanticTree {
    /// Index of the root node
    pub const ROOT: usize = 0;

    /// Create a tree holding only its root. The root is always a module.
    pub fn new(language: Language, mut root: SemanticNode) -> Self {
        root.node_type = NodeType::Module;
        root.id = root.id_segment();
        root.depth = 0;
        root.parent = None;
        root.children.clear();
        Self {
            language,
            nodes: vec![root],
        }
    }

    /// Attach `node` as the last child of `parent` and return its index.
    ///
    /// # Panics
    /// Panics if `parent` is not an index of this tree.
    pub fn add_child(&mut self, parent: usize, mut node: SemanticNode) -> usize {
        let segment = node.id_segment();
        let ordinal = self.nodes[parent]
            .children
            .iter()
            .filter(|&&c| self.nodes[c].id_segment() == segment)
            .count();

        node.id = if ordinal == 0 {
            format!("{}/{}", self.nodes[parent].id, segment)
        } else {
            format!("{}/{}#{}", self.nodes[parent].id, segment, ordinal)
        };
        node.depth = self.nodes[parent].depth + 1;
        node.parent = Some(parent);
        node.children.clear();

        let index = self.nodes.len();
        self.nodes.push(node);
        self.nodes[parent].children.push(index);
        index
    }

    pub fn root(&self) -> &SemanticNode {
        &self.nodes[Self::ROOT]
    }

    pub fn get(&self, index: usize) -> Option<&SemanticNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[SemanticNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a node by id
    pub fn find(&self, id: &str) -> Option<&SemanticNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// All nodes with the given name, in source order
    pub fn find_by_name<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a SemanticNode> + 'a {
        self.nodes.iter().filter(move |n| n.name == name)
    }
}
