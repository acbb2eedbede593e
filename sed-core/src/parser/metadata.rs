//! Names and language-specific metadata of recognized constructs

use super::node_kinds;
use crate::grammar::{Language, RawTree};
use crate::models::semantic_nodes::{NodeMetadata, NodeType};
use sed_utils::{normalize_whitespace, safe_truncate};

/// Longest name kept for constructs named after their own text
const MAX_TEXT_NAME: usize = 80;

/// Extract the display name of a construct. Empty for anonymous constructs.
pub fn node_name(
    raw: &RawTree,
    index: usize,
    node_type: NodeType,
    source: &str,
    language: Language,
) -> String {
    let Some(node) = raw.get(index) else {
        return String::new();
    };
    let field_text = |field: &str| {
        raw.child_by_field(index, field)
            .map(|n| normalize_whitespace(n.text(source)))
    };

    let name = match (language, node.kind.as_str()) {
        (Language::Rust, "impl_item") => {
            let target = field_text("type").unwrap_or_default();
            match field_text("trait") {
                Some(tr) => format!("impl {tr} for {target}"),
                None => format!("impl {target}"),
            }
        }
        (Language::Rust, "let_declaration") => field_text("pattern").unwrap_or_default(),
        (Language::Rust, "use_declaration") => field_text("argument").unwrap_or_default(),
        (Language::Rust, "macro_invocation") => field_text("macro").unwrap_or_default(),
        (Language::Python, "assignment") => field_text("left").unwrap_or_default(),
        (Language::Python, "import_from_statement") => {
            field_text("module_name").unwrap_or_default()
        }
        (Language::Java, "method_invocation") => field_text("name").unwrap_or_default(),
        (Language::Java, "object_creation_expression") => field_text("type").unwrap_or_default(),
        (_, "export_statement") => export_name(raw, index, source),
        (_, "call_expression" | "call") => field_text("function").unwrap_or_default(),
        (_, "new_expression") => field_text("constructor").unwrap_or_default(),
        (_, "method_call_expression") => field_text("method").unwrap_or_default(),
        _ => match node_type {
            NodeType::Import => import_name(raw, index, source),
            NodeType::Other => {
                field_text("name").unwrap_or_else(|| first_named_text(raw, index, source))
            }
            NodeType::Block | NodeType::Statement | NodeType::Comment => String::new(),
            _ => field_text("name").unwrap_or_default(),
        },
    };

    safe_truncate(&name, MAX_TEXT_NAME)
}

fn first_named_text(raw: &RawTree, index: usize, source: &str) -> String {
    raw.named_children(index)
        .next()
        .map(|(_, n)| normalize_whitespace(n.text(source)))
        .unwrap_or_default()
}

fn import_name(raw: &RawTree, index: usize, source: &str) -> String {
    if let Some(module) = raw.child_by_field(index, "source") {
        return module
            .text(source)
            .trim_matches(|c| matches!(c, '"' | '\'' | '`'))
            .to_string();
    }
    if let Some(name) = raw.child_by_field(index, "name") {
        return normalize_whitespace(name.text(source));
    }
    first_named_text(raw, index, source)
}

fn export_name(raw: &RawTree, index: usize, source: &str) -> String {
    if let Some(decl) = raw.child_index_by_field(index, "declaration") {
        if let Some(name) = raw.child_by_field(decl, "name") {
            return normalize_whitespace(name.text(source));
        }
        // `export const a = 1` names the first declarator
        if let Some((declarator, _)) = raw.named_children(decl).next() {
            if let Some(name) = raw.child_by_field(declarator, "name") {
                return normalize_whitespace(name.text(source));
            }
        }
    }
    if let Some(value) = raw.child_by_field(index, "value") {
        return normalize_whitespace(value.text(source));
    }
    String::new()
}

/// Collect metadata for a construct
pub fn extract_metadata(
    raw: &RawTree,
    index: usize,
    node_type: NodeType,
    name: &str,
    source: &str,
    language: Language,
) -> NodeMetadata {
    let Some(node) = raw.get(index) else {
        return NodeMetadata::default();
    };
    let callable = matches!(node_type, NodeType::Function | NodeType::Method);

    let mut metadata = NodeMetadata {
        visibility: visibility(raw, index, name, source, language),
        is_async: has_modifier(raw, index, "async"),
        is_static: has_modifier(raw, index, "static") || node.kind == "static_item",
        doc_comment: doc_comment(raw, index, source, language),
        ..NodeMetadata::default()
    };

    if callable {
        metadata.parameters = parameters(raw, index, source);
        metadata.return_type = return_type(raw, index, source, language);
        metadata.complexity = Some(complexity(raw, index));
    }

    metadata
}

/// Anonymous modifier token directly on the node or inside a modifier list
fn has_modifier(raw: &RawTree, index: usize, token: &str) -> bool {
    let Some(node) = raw.get(index) else {
        return false;
    };
    node.children.iter().any(|&c| {
        let child = &raw[c];
        (!child.is_named && child.kind == token)
            || (matches!(child.kind.as_str(), "modifiers" | "function_modifiers")
                && child.children.iter().any(|&m| raw[m].kind == token))
    })
}

fn visibility(
    raw: &RawTree,
    index: usize,
    name: &str,
    source: &str,
    language: Language,
) -> Option<String> {
    let node = raw.get(index)?;
    for &c in &node.children {
        let child = &raw[c];
        match child.kind.as_str() {
            "visibility_modifier" | "accessibility_modifier" => {
                return Some(normalize_whitespace(child.text(source)));
            }
            "modifiers" => {
                let found = child.children.iter().find_map(|&m| {
                    let kind = raw[m].kind.as_str();
                    matches!(kind, "public" | "private" | "protected").then(|| kind.to_string())
                });
                if found.is_some() {
                    return found;
                }
            }
            "private_property_identifier" => return Some("private".to_string()),
            _ => {}
        }
    }

    match language {
        Language::Python if name.starts_with("__") && !name.ends_with("__") => {
            Some("private".to_string())
        }
        Language::Python if name.starts_with('_') && !name.starts_with("__") => {
            Some("protected".to_string())
        }
        Language::Python if !name.is_empty() => Some("public".to_string()),
        _ => None,
    }
}

fn parameters(raw: &RawTree, index: usize, source: &str) -> Vec<String> {
    if let Some(list) = raw.child_index_by_field(index, "parameters") {
        return raw
            .named_children(list)
            .filter(|(_, n)| !n.kind.ends_with("comment"))
            .map(|(_, n)| normalize_whitespace(n.text(source)))
            .collect();
    }
    // Single unparenthesized arrow function parameter
    raw.child_by_field(index, "parameter")
        .map(|p| vec![normalize_whitespace(p.text(source))])
        .unwrap_or_default()
}

fn return_type(raw: &RawTree, index: usize, source: &str, language: Language) -> Option<String> {
    let field = if language == Language::Java { "type" } else { "return_type" };
    let text = raw.child_by_field(index, field)?.text(source);
    let text = text.trim_start_matches(':').trim();
    (!text.is_empty()).then(|| normalize_whitespace(text))
}

/// Comment immediately preceding the node, or a Python docstring
fn doc_comment(raw: &RawTree, index: usize, source: &str, language: Language) -> Option<String> {
    if language == Language::Python {
        if let Some(doc) = python_docstring(raw, index, source) {
            return Some(doc);
        }
    }

    let node = raw.get(index)?;
    let previous = raw.previous_sibling(index)?;

    let adjacent = previous.end.row + 1 >= node.start.row;
    (node_kinds::is_comment(language, &previous.kind) && adjacent)
        .then(|| normalize_whitespace(previous.text(source)))
}

fn python_docstring(raw: &RawTree, index: usize, source: &str) -> Option<String> {
    let body = raw.child_index_by_field(index, "body")?;
    let (first, _) = raw.named_children(body).next()?;
    let (_, string) = raw.named_children(first).next()?;
    if raw[first].kind != "expression_statement" || string.kind != "string" {
        return None;
    }
    let text = string.text(source).trim_matches(|c| matches!(c, '"' | '\''));
    Some(normalize_whitespace(text))
}

/// 1 + decision points anywhere in the subtree
fn complexity(raw: &RawTree, index: usize) -> u32 {
    let branches = raw
        .descendants(index)
        .into_iter()
        .filter(|&d| node_kinds::is_decision_point(&raw[d].kind))
        .count();
    1 + u32::try_from(branches).unwrap_or(u32::MAX - 1)
}
