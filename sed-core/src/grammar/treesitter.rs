//! Tree-sitter grammar provider
//!
//! Wraps the community tree-sitter grammars behind [`GrammarProvider`]. A
//! fresh `Parser` is created for every call, so one provider can serve any
//! number of threads. The concrete tree is copied into a [`RawTree`] with an
//! explicit cursor walk, which keeps deeply nested input off the call stack.

use super::{GrammarError, GrammarProvider, Language, RawNode, RawPoint, RawTree};
use std::time::Duration;
use tree_sitter::{Node, Parser, Point};

/// Grammar provider backed by a tree-sitter language
#[derive(Debug, Clone, Copy)]
pub struct TreeSitterGrammar {
    language: Language,
    grammar: fn() -> tree_sitter::Language,
}

impl TreeSitterGrammar {
    pub fn new(language: Language) -> Self {
        let grammar: fn() -> tree_sitter::Language = match language {
            Language::JavaScript => tree_sitter_javascript::language,
            Language::TypeScript => tree_sitter_typescript::language_typescript,
            Language::Tsx => tree_sitter_typescript::language_tsx,
            Language::Python => tree_sitter_python::language,
            Language::Rust => tree_sitter_rust::language,
            Language::Java => tree_sitter_java::language,
        };
        Self { language, grammar }
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

impl GrammarProvider for TreeSitterGrammar {
    fn parse(&self, source: &str, timeout: Option<Duration>) -> Result<RawTree, GrammarError> {
        let mut parser = Parser::new();
        parser
            .set_language((self.grammar)())
            .map_err(|e| {
                GrammarError::Failed(format!("Failed to set {} grammar: {e}", self.language))
            })?;

        if let Some(limit) = timeout {
            // tree-sitter reads a zero timeout as "no limit"
            let micros = u64::try_from(limit.as_micros()).unwrap_or(u64::MAX).max(1);
            parser.set_timeout_micros(micros);
        }

        let tree = parser.parse(source, None).ok_or_else(|| match timeout {
            Some(limit) => GrammarError::Timeout(limit),
            None => GrammarError::Failed("parser produced no tree".to_string()),
        })?;

        let raw = convert_tree(tree.root_node());
        tracing::trace!(language = %self.language, nodes = raw.len(), "converted syntax tree");
        Ok(raw)
    }
}

fn convert_point(point: Point) -> RawPoint {
    RawPoint {
        row: point.row,
        column: point.column,
    }
}

fn convert_node(node: Node<'_>, field: Option<&str>) -> RawNode {
    RawNode {
        kind: node.kind().to_string(),
        field: field.map(str::to_string),
        is_named: node.is_named(),
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        start: convert_point(node.start_position()),
        end: convert_point(node.end_position()),
        has_error: node.has_error(),
        is_missing: node.is_missing(),
        is_error: node.is_error(),
        parent: None,
        children: Vec::new(),
    }
}

/// Copy a tree-sitter tree into the arena, pre-order, without recursion
fn convert_tree(root: Node<'_>) -> RawTree {
    let mut raw = RawTree::new(convert_node(root, None));
    let mut cursor = root.walk();
    // Arena index of the parent of the cursor's current node
    let mut parents = vec![RawTree::ROOT];

    if !cursor.goto_first_child() {
        return raw;
    }

    'walk: loop {
        let Some(&parent) = parents.last() else {
            break;
        };
        let index = raw.push_child(parent, convert_node(cursor.node(), cursor.field_name()));

        if cursor.goto_first_child() {
            parents.push(index);
            continue;
        }

        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                break 'walk;
            }
            parents.pop();
            if parents.is_empty() {
                break 'walk;
            }
        }
    }

    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_javascript_function() {
        let grammar = TreeSitterGrammar::new(Language::JavaScript);
        let source = "function f(){return 1;}";
        let tree = grammar.parse(source, None).unwrap();

        assert_eq!(tree.root().kind, "program");
        let (func_idx, func) = tree.named_children(RawTree::ROOT).next().unwrap();
        assert_eq!(func.kind, "function_declaration");
        assert_eq!(tree.child_by_field(func_idx, "name").unwrap().text(source), "f");
        assert!(!tree.root().has_error);
    }

    #[test]
    fn test_every_node_is_reachable_once() {
        let grammar = TreeSitterGrammar::new(Language::Python);
        let source = "class A:\n    def f(self):\n        return [x for x in range(3)]\n";
        let tree = grammar.parse(source, None).unwrap();

        assert_eq!(tree.descendants(RawTree::ROOT).len() + 1, tree.len());
    }

    #[test]
    fn test_syntax_errors_are_flagged() {
        let grammar = TreeSitterGrammar::new(Language::JavaScript);
        let tree = grammar.parse("function f( { return 1;", None).unwrap();
        assert!(tree.root().has_error);
    }

    #[test]
    fn test_all_grammars_load() {
        for &lang in Language::all_languages() {
            let grammar = TreeSitterGrammar::new(lang);
            assert!(grammar.parse("", Some(Duration::from_secs(1))).is_ok(), "{lang} failed");
        }
    }
}
