//! Semantic parser
//!
//! Turns source text into a [`SemanticTree`]. The grammar provider produces
//! the concrete syntax tree; this module walks it depth-first with an
//! explicit stack, keeps the constructs the node kind tables recognize at
//! the requested [`Granularity`], and rebuilds their hierarchy from range
//! containment.
//!
//! Syntax errors never fail a parse. They are reported as
//! `"line L, column C: ..."` strings next to a best-effort tree.

pub mod hierarchy;
pub mod metadata;
pub mod node_kinds;

use crate::constants::ParserDefaults;
use crate::grammar::{GrammarError, GrammarRegistry, Language, RawNode, RawTree};
use crate::models::semantic_nodes::{NodeType, SemanticNode, SemanticTree, SourceRange};
use crate::{Error, Result};
use hierarchy::Candidate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest source excerpt quoted in a syntax error message
const MAX_ERROR_EXCERPT: usize = 40;

/// Which constructs the parser emits. Each level includes the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Functions, classes, variables, imports and other declarations
    #[default]
    Declarations,
    /// Plus blocks and statements
    Statements,
    /// Plus call-like expressions
    Expressions,
}

/// Parser options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub include_comments: bool,
    /// Raw syntax tree depth beyond which nodes are omitted
    pub max_depth: usize,
    /// Bound on the grammar parse step; 0 disables it
    pub timeout_ms: u64,
    pub granularity: Granularity,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            include_comments: ParserDefaults::INCLUDE_COMMENTS,
            max_depth: ParserDefaults::MAX_DEPTH,
            timeout_ms: ParserDefaults::TIMEOUT_MS,
            granularity: Granularity::default(),
        }
    }
}

impl ParseOptions {
    fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Output of one parse call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticParseResult {
    pub tree: SemanticTree,
    /// Syntax errors with line and column, in source order
    pub errors: Vec<String>,
    /// Number of raw syntax nodes the grammar produced
    pub raw_node_count: usize,
}

impl SemanticParseResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Semantic parser over an injected grammar registry
#[derive(Debug, Clone)]
pub struct SemanticParser {
    registry: Arc<GrammarRegistry>,
}

impl SemanticParser {
    pub fn new(registry: Arc<GrammarRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &GrammarRegistry {
        &self.registry
    }

    /// Parse `source` into a semantic tree
    pub fn parse(
        &self,
        source: &str,
        language: Language,
        options: &ParseOptions,
    ) -> Result<SemanticParseResult> {
        let provider = self.registry.get(language).ok_or_else(|| Error::UnsupportedLanguage {
            language: language.to_string(),
        })?;

        let started = Instant::now();
        let result = match provider.parse(source, options.timeout()) {
            Ok(raw) => extract(&raw, source, language, options),
            Err(GrammarError::Timeout(_)) => {
                tracing::warn!(
                    %language,
                    timeout_ms = options.timeout_ms,
                    "grammar parse timed out"
                );
                return Err(Error::ParseTimeout {
                    language: language.to_string(),
                    timeout_ms: options.timeout_ms,
                });
            }
            Err(GrammarError::Failed(message)) => {
                tracing::warn!(%language, %message, "grammar rejected source, keeping root only");
                SemanticParseResult {
                    tree: SemanticTree::new(language, root_node(source)),
                    errors: vec![message],
                    raw_node_count: 0,
                }
            }
        };

        tracing::debug!(
            %language,
            nodes = result.tree.len(),
            raw_nodes = result.raw_node_count,
            errors = result.errors.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "parsed source"
        );
        Ok(result)
    }
}

/// Extract the semantic tree from an already parsed raw tree
pub fn extract(
    raw: &RawTree,
    source: &str,
    language: Language,
    options: &ParseOptions,
) -> SemanticParseResult {
    let mut candidates = Vec::new();
    let mut errors = Vec::new();
    let mut order = 0usize;
    let mut stack = vec![(RawTree::ROOT, 0usize)];

    while let Some((index, depth)) = stack.pop() {
        let node = &raw[index];

        if node.is_missing {
            errors.push(format!("{}: missing {}", position(node), node.kind));
        } else if node.is_error {
            let text = sed_utils::normalize_whitespace(node.text(source));
            let excerpt = sed_utils::safe_truncate(&text, MAX_ERROR_EXCERPT);
            errors.push(format!("{}: unexpected `{excerpt}`", position(node)));
        }

        if index != RawTree::ROOT && node.is_named {
            if let Some(semantic) = recognize(raw, index, source, language, options) {
                candidates.push(Candidate { order, node: semantic });
            }
        }
        order += 1;

        if depth < options.max_depth {
            stack.extend(node.children.iter().rev().map(|&c| (c, depth + 1)));
        }
    }

    if errors.is_empty() && raw.root().has_error {
        errors.push("line 1, column 1: syntax error beyond depth limit".to_string());
    }

    SemanticParseResult {
        tree: hierarchy::assemble(language, root_node(source), candidates),
        errors,
        raw_node_count: raw.len(),
    }
}

fn position(node: &RawNode) -> String {
    format!("line {}, column {}", node.start.row + 1, node.start.column + 1)
}

/// The module root always spans the whole source
fn root_node(source: &str) -> SemanticNode {
    let end_line = source.matches('\n').count() + 1;
    SemanticNode::new(NodeType::Module, "", source, SourceRange::new(1, end_line, 0, source.len()))
}

fn recognize(
    raw: &RawTree,
    index: usize,
    source: &str,
    language: Language,
    options: &ParseOptions,
) -> Option<SemanticNode> {
    let node = &raw[index];
    let node_type = if node_kinds::is_comment(language, &node.kind) {
        if !options.include_comments {
            return None;
        }
        NodeType::Comment
    } else {
        let class = node_kinds::classify(language, &node.kind)?;
        if class.granularity > options.granularity {
            return None;
        }
        class.node_type
    };

    let name = metadata::node_name(raw, index, node_type, source, language);
    let meta = metadata::extract_metadata(raw, index, node_type, &name, source, language);
    let range =
        SourceRange::new(node.start.row + 1, node.end.row + 1, node.start_byte, node.end_byte);

    Some(SemanticNode::new(node_type, name, node.text(source), range).with_metadata(meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarProvider, RawPoint};
    use pretty_assertions::assert_eq;

    struct SlowGrammar;

    impl GrammarProvider for SlowGrammar {
        fn parse(
            &self,
            _source: &str,
            timeout: Option<Duration>,
        ) -> std::result::Result<RawTree, GrammarError> {
            Err(GrammarError::Timeout(timeout.unwrap_or_default()))
        }
    }

    struct RejectingGrammar;

    impl GrammarProvider for RejectingGrammar {
        fn parse(
            &self,
            _source: &str,
            _timeout: Option<Duration>,
        ) -> std::result::Result<RawTree, GrammarError> {
            Err(GrammarError::Failed("line 1, column 1: unreadable".to_string()))
        }
    }

    fn parser() -> SemanticParser {
        SemanticParser::new(Arc::new(GrammarRegistry::with_default_grammars()))
    }

    fn parse_with_defaults(source: &str, language: Language) -> SemanticParseResult {
        parser().parse(source, language, &ParseOptions::default()).unwrap()
    }

    fn ids(result: &SemanticParseResult) -> Vec<String> {
        result.tree.nodes().iter().map(|n| n.id.clone()).collect()
    }

    #[test]
    fn test_javascript_declarations() {
        let source = "class Foo {\n  bar() { return 1; }\n}\nfunction f() { return 2; }\n";
        let result = parse_with_defaults(source, Language::JavaScript);

        assert!(!result.has_errors());
        assert_eq!(
            ids(&result),
            vec!["module", "module/class:Foo", "module/class:Foo/method:bar", "module/function:f"]
        );
        assert_eq!(result.tree.root().range.end_byte, source.len());
    }

    #[test]
    fn test_python_methods_and_granularity() {
        let source = "class A:\n    def run(self):\n        print('hi')\n        return 1\n";
        let options = ParseOptions {
            granularity: Granularity::Expressions,
            ..Default::default()
        };
        let result = parser().parse(source, Language::Python, &options).unwrap();

        let run = result.tree.find_by_name("run").next().unwrap();
        assert_eq!(run.node_type, NodeType::Method);
        assert!(result
            .tree
            .nodes()
            .iter()
            .any(|n| n.node_type == NodeType::Expression && n.name == "print"));
        assert!(result.tree.nodes().iter().any(|n| n.node_type == NodeType::Statement));

        let declarations = parse_with_defaults(source, Language::Python);
        assert_eq!(
            ids(&declarations),
            vec!["module", "module/class:A", "module/class:A/method:run"]
        );
    }

    #[test]
    fn test_rust_impl_methods() {
        let source = "struct S;\nimpl S {\n    pub fn new() -> Self { S }\n}\n";
        let result = parse_with_defaults(source, Language::Rust);
        assert_eq!(
            ids(&result),
            vec![
                "module",
                "module/class:S",
                "module/class:impl S",
                "module/class:impl S/method:new"
            ]
        );
    }

    #[test]
    fn test_comments_only_when_requested() {
        let source = "// note\nfunction f() {}\n";
        let without = parse_with_defaults(source, Language::JavaScript);
        assert!(without.tree.nodes().iter().all(|n| n.node_type != NodeType::Comment));

        let options = ParseOptions {
            include_comments: true,
            ..Default::default()
        };
        let with = parser().parse(source, Language::JavaScript, &options).unwrap();
        assert_eq!(with.tree.nodes()[1].node_type, NodeType::Comment);
    }

    #[test]
    fn test_syntax_errors_are_collected() {
        let source = "function ok() { return 1; }\nfunction broken( {\n";
        let result = parse_with_defaults(source, Language::JavaScript);

        assert!(result.has_errors());
        assert!(result.errors.iter().all(|e| e.starts_with("line ")));
        assert!(result.tree.find("module/function:ok").is_some());
    }

    #[test]
    fn test_max_depth_omits_deep_nodes() {
        let source = "class A {\n  m() { return 1; }\n}\n";
        let options = ParseOptions {
            max_depth: 1,
            ..Default::default()
        };
        let result = parser().parse(source, Language::JavaScript, &options).unwrap();
        assert_eq!(ids(&result), vec!["module", "module/class:A"]);
    }

    #[test]
    fn test_unsupported_language() {
        let parser = SemanticParser::new(Arc::new(GrammarRegistry::builder().build()));
        assert!(matches!(
            parser.parse("x", Language::Java, &ParseOptions::default()),
            Err(Error::UnsupportedLanguage { .. })
        ));
    }

    #[test]
    fn test_timeout_and_rejection() {
        let registry = GrammarRegistry::builder()
            .register(Language::Python, SlowGrammar)
            .register(Language::Java, RejectingGrammar)
            .build();
        let parser = SemanticParser::new(Arc::new(registry));

        assert!(matches!(
            parser.parse("x = 1", Language::Python, &ParseOptions::default()),
            Err(Error::ParseTimeout { timeout_ms: 5000, .. })
        ));

        let partial = parser.parse("class {", Language::Java, &ParseOptions::default()).unwrap();
        assert_eq!(partial.tree.len(), 1);
        assert_eq!(partial.errors, vec!["line 1, column 1: unreadable".to_string()]);
    }

    #[test]
    fn test_extract_from_hand_built_tree() {
        let source = "function f(){}";
        let end = RawPoint { row: 0, column: 14 };
        let mut raw = RawTree::new(RawNode::new("program", 0, 14, RawPoint::default(), end));
        let declaration = RawNode::new("function_declaration", 0, 14, RawPoint::default(), end);
        let func = raw.push_child(RawTree::ROOT, declaration);
        let name_start = RawPoint { row: 0, column: 9 };
        let name_end = RawPoint { row: 0, column: 10 };
        let mut name = RawNode::new("identifier", 9, 10, name_start, name_end);
        name.field = Some("name".to_string());
        raw.push_child(func, name);

        let result = extract(&raw, source, Language::JavaScript, &ParseOptions::default());
        assert_eq!(ids(&result), vec!["module", "module/function:f"]);
        assert_eq!(result.raw_node_count, 3);
    }
}
