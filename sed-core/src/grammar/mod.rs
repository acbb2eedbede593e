//! Language grammar capability
//!
//! The semantic parser never talks to a grammar library directly. It asks a
//! [`GrammarRegistry`] for the [`GrammarProvider`] of a language and receives
//! a [`RawTree`]: a plain index arena describing the concrete syntax tree.
//! The registry is an immutable value built once and shared by reference.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub mod treesitter;

pub use treesitter::TreeSitterGrammar;

/// Languages with a built-in grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    TypeScript,
    Tsx,
    Python,
    Rust,
    Java,
}

impl Language {
    /// Get all supported languages
    pub fn all_languages() -> &'static [Self] {
        &[
            Self::JavaScript,
            Self::TypeScript,
            Self::Tsx,
            Self::Python,
            Self::Rust,
            Self::Java,
        ]
    }

    /// File extensions conventionally used for this language
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::JavaScript => &["js", "mjs", "cjs", "jsx"],
            Self::TypeScript => &["ts", "mts", "cts"],
            Self::Tsx => &["tsx"],
            Self::Python => &["py", "pyw", "pyi"],
            Self::Rust => &["rs"],
            Self::Java => &["java"],
        }
    }

    /// Detect language from a file path. Callers resolve the language once,
    /// before handing content to the core.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        Self::all_languages()
            .iter()
            .copied()
            .find(|lang| lang.extensions().contains(&extension.as_str()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::Python => "python",
            Self::Rust => "rust",
            Self::Java => "java",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "javascript" | "js" | "jsx" => Ok(Self::JavaScript),
            "typescript" | "ts" => Ok(Self::TypeScript),
            "tsx" => Ok(Self::Tsx),
            "python" | "py" => Ok(Self::Python),
            "rust" | "rs" => Ok(Self::Rust),
            "java" => Ok(Self::Java),
            _ => Err(crate::Error::UnsupportedLanguage {
                language: s.to_string(),
            }),
        }
    }
}

/// Zero-based row/column position in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawPoint {
    pub row: usize,
    pub column: usize,
}

/// One node of a concrete syntax tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNode {
    /// Grammar node type (e.g. `function_declaration`)
    pub kind: String,
    /// Field name under which the parent holds this node, if any
    pub field: Option<String>,
    /// Anonymous nodes are literal tokens such as `{` or `async`
    pub is_named: bool,
    pub start_byte: usize,
    pub end_byte: usize,
    pub start: RawPoint,
    pub end: RawPoint,
    /// Whether this node or any descendant contains a syntax error
    pub has_error: bool,
    /// Inserted by error recovery, absent from the source
    pub is_missing: bool,
    /// The node is itself an error node
    pub is_error: bool,
    /// Set when the node is attached to a [`RawTree`]
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl RawNode {
    pub fn new(
        kind: impl Into<String>,
        start_byte: usize,
        end_byte: usize,
        start: RawPoint,
        end: RawPoint,
    ) -> Self {
        Self {
            kind: kind.into(),
            field: None,
            is_named: true,
            start_byte,
            end_byte,
            start,
            end,
            has_error: false,
            is_missing: false,
            is_error: false,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Source text covered by this node
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start_byte..self.end_byte).unwrap_or_default()
    }
}

/// Index arena of raw nodes; index 0 is the root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTree {
    nodes: Vec<RawNode>,
}

impl RawTree {
    pub const ROOT: usize = 0;

    pub fn new(root: RawNode) -> Self {
        Self { nodes: vec![root] }
    }

    /// Append `node` as the last child of `parent`
    ///
    /// # Panics
    /// Panics if `parent` is not an index of this tree.
    pub fn push_child(&mut self, parent: usize, mut node: RawNode) -> usize {
        let index = self.nodes.len();
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent].children.push(index);
        index
    }

    pub fn root(&self) -> &RawNode {
        &self.nodes[Self::ROOT]
    }

    pub fn get(&self, index: usize) -> Option<&RawNode> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Sibling immediately before `index`, named or not
    pub fn previous_sibling(&self, index: usize) -> Option<&RawNode> {
        let parent = self.nodes.get(index)?.parent?;
        let siblings = &self.nodes[parent].children;
        let position = siblings.iter().position(|&s| s == index)?;
        Some(&self.nodes[siblings[position.checked_sub(1)?]])
    }

    /// First child of `index` held under the given field name
    pub fn child_by_field(&self, index: usize, field: &str) -> Option<&RawNode> {
        self.nodes.get(index)?.children.iter().find_map(|&c| {
            let child = &self.nodes[c];
            (child.field.as_deref() == Some(field)).then_some(child)
        })
    }

    /// Index of the first child of `index` held under the given field name
    pub fn child_index_by_field(&self, index: usize, field: &str) -> Option<usize> {
        self.nodes
            .get(index)?
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].field.as_deref() == Some(field))
    }

    /// Named children of `index`, in order
    pub fn named_children(&self, index: usize) -> impl Iterator<Item = (usize, &RawNode)> {
        self.nodes
            .get(index)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .map(move |&c| (c, &self.nodes[c]))
            .filter(|(_, n)| n.is_named)
    }

    /// Indices of every node below `index` (excluding it), depth-first
    pub fn descendants(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self
            .nodes
            .get(index)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.nodes[current].children.iter().rev().copied());
        }
        out
    }
}

impl std::ops::Index<usize> for RawTree {
    type Output = RawNode;

    fn index(&self, index: usize) -> &RawNode {
        &self.nodes[index]
    }
}

/// Failure of a grammar parse
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    /// No tree could be produced within the time budget
    #[error("grammar parse exceeded {0:?}")]
    Timeout(Duration),

    /// The grammar rejected the input outright; recoverable
    #[error("grammar parse failed: {0}")]
    Failed(String),
}

/// Turns source text into a raw syntax tree for one language
pub trait GrammarProvider: Send + Sync {
    /// Parse `source`, giving up after `timeout` when one is set
    fn parse(&self, source: &str, timeout: Option<Duration>) -> Result<RawTree, GrammarError>;
}

/// Immutable table of grammar providers keyed by language
#[derive(Clone, Default)]
pub struct GrammarRegistry {
    providers: HashMap<Language, Arc<dyn GrammarProvider>>,
}

impl GrammarRegistry {
    pub fn builder() -> GrammarRegistryBuilder {
        GrammarRegistryBuilder::default()
    }

    /// Registry with the tree-sitter grammar of every built-in language
    pub fn with_default_grammars() -> Self {
        Language::all_languages()
            .iter()
            .fold(Self::builder(), |builder, &lang| {
                builder.register(lang, TreeSitterGrammar::new(lang))
            })
            .build()
    }

    pub fn has(&self, language: Language) -> bool {
        self.providers.contains_key(&language)
    }

    pub fn get(&self, language: Language) -> Option<&dyn GrammarProvider> {
        self.providers.get(&language).map(AsRef::as_ref)
    }

    /// Registered languages, sorted
    pub fn languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.providers.keys().copied().collect();
        languages.sort();
        languages
    }
}

impl std::fmt::Debug for GrammarRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrammarRegistry")
            .field("languages", &self.languages())
            .finish()
    }
}

/// Builder for [`GrammarRegistry`]
#[derive(Default)]
pub struct GrammarRegistryBuilder {
    providers: HashMap<Language, Arc<dyn GrammarProvider>>,
}

impl GrammarRegistryBuilder {
    /// Register (or replace) the provider for `language`
    pub fn register(
        mut self,
        language: Language,
        provider: impl GrammarProvider + 'static,
    ) -> Self {
        self.providers.insert(language, Arc::new(provider));
        self
    }

    pub fn build(self) -> GrammarRegistry {
        GrammarRegistry {
            providers: self.providers,
        }
    }
}
