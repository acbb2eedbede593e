//! Grammar node kind tables
//!
//! Maps each language's concrete node kinds onto [`NodeType`], together with
//! the coarsest [`Granularity`] at which the construct is emitted.

use super::Granularity;
use crate::grammar::Language;
use crate::models::semantic_nodes::NodeType;

/// How a recognized grammar node is represented semantically
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeClass {
    pub node_type: NodeType,
    /// Coarsest granularity at which the construct is emitted
    pub granularity: Granularity,
}

impl NodeClass {
    const fn declaration(node_type: NodeType) -> Self {
        Self {
            node_type,
            granularity: Granularity::Declarations,
        }
    }

    const fn statement(node_type: NodeType) -> Self {
        Self {
            node_type,
            granularity: Granularity::Statements,
        }
    }

    const fn expression() -> Self {
        Self {
            node_type: NodeType::Expression,
            granularity: Granularity::Expressions,
        }
    }
}

/// Classify a grammar node kind, or `None` if it has no semantic counterpart.
/// Comments are classified separately by [`is_comment`].
pub fn classify(language: Language, kind: &str) -> Option<NodeClass> {
    match language {
        Language::JavaScript | Language::TypeScript | Language::Tsx => classify_ecmascript(kind),
        Language::Python => classify_python(kind),
        Language::Rust => classify_rust(kind),
        Language::Java => classify_java(kind),
    }
}

fn classify_ecmascript(kind: &str) -> Option<NodeClass> {
    use NodeType as T;
    let class = match kind {
        "function_declaration" | "function" | "function_expression" | "arrow_function"
        | "generator_function_declaration" | "generator_function" | "function_signature" => {
            NodeClass::declaration(T::Function)
        }
        "method_definition" | "method_signature" | "abstract_method_signature" => {
            NodeClass::declaration(T::Method)
        }
        "class_declaration" | "class" | "abstract_class_declaration" => {
            NodeClass::declaration(T::Class)
        }
        "variable_declarator"
        | "public_field_definition"
        | "field_definition"
        | "property_signature" => NodeClass::declaration(T::Variable),
        "import_statement" => NodeClass::declaration(T::Import),
        "export_statement" => NodeClass::declaration(T::Export),
        "type_alias_declaration" => NodeClass::declaration(T::Type),
        "interface_declaration" => NodeClass::declaration(T::Interface),
        "enum_declaration" => NodeClass::declaration(T::Enum),
        "statement_block" | "class_body" => NodeClass::statement(T::Block),
        "call_expression" | "new_expression" => NodeClass::expression(),
        other if other.ends_with("_statement") => NodeClass::statement(T::Statement),
        _ => return None,
    };
    Some(class)
}

fn classify_python(kind: &str) -> Option<NodeClass> {
    use NodeType as T;
    let class = match kind {
        "function_definition" => NodeClass::declaration(T::Function),
        "class_definition" => NodeClass::declaration(T::Class),
        "import_statement" | "import_from_statement" | "future_import_statement" => {
            NodeClass::declaration(T::Import)
        }
        "assignment" => NodeClass::declaration(T::Variable),
        "block" => NodeClass::statement(T::Block),
        "call" => NodeClass::expression(),
        other if other.ends_with("_statement") => NodeClass::statement(T::Statement),
        _ => return None,
    };
    Some(class)
}

fn classify_rust(kind: &str) -> Option<NodeClass> {
    use NodeType as T;
    let class = match kind {
        "function_item" | "function_signature_item" => NodeClass::declaration(T::Function),
        "struct_item" | "union_item" | "impl_item" => NodeClass::declaration(T::Class),
        "enum_item" => NodeClass::declaration(T::Enum),
        "trait_item" => NodeClass::declaration(T::Interface),
        "mod_item" => NodeClass::declaration(T::Module),
        "use_declaration" | "extern_crate_declaration" => NodeClass::declaration(T::Import),
        "const_item" | "static_item" | "let_declaration" => NodeClass::declaration(T::Variable),
        "type_item" => NodeClass::declaration(T::Type),
        "macro_definition" => NodeClass::declaration(T::Other),
        "block" | "declaration_list" => NodeClass::statement(T::Block),
        "expression_statement" | "return_expression" => NodeClass::statement(T::Statement),
        "call_expression" | "macro_invocation" | "method_call_expression" => {
            NodeClass::expression()
        }
        _ => return None,
    };
    Some(class)
}

fn classify_java(kind: &str) -> Option<NodeClass> {
    use NodeType as T;
    let class = match kind {
        "class_declaration" | "record_declaration" => NodeClass::declaration(T::Class),
        "interface_declaration" | "annotation_type_declaration" => {
            NodeClass::declaration(T::Interface)
        }
        "enum_declaration" => NodeClass::declaration(T::Enum),
        "method_declaration" | "constructor_declaration" => NodeClass::declaration(T::Method),
        "variable_declarator" => NodeClass::declaration(T::Variable),
        "import_declaration" => NodeClass::declaration(T::Import),
        "package_declaration" => NodeClass::declaration(T::Other),
        "block" | "class_body" | "constructor_body" => NodeClass::statement(T::Block),
        "method_invocation" | "object_creation_expression" => NodeClass::expression(),
        other if other.ends_with("_statement") => NodeClass::statement(T::Statement),
        _ => return None,
    };
    Some(class)
}

/// Whether the kind is a comment in the given language
pub fn is_comment(language: Language, kind: &str) -> bool {
    match language {
        Language::Rust | Language::Java => matches!(kind, "line_comment" | "block_comment"),
        Language::JavaScript | Language::TypeScript | Language::Tsx | Language::Python => {
            kind == "comment"
        }
    }
}

/// Whether the kind adds a branch to the cyclomatic complexity estimate.
/// Covers named branching constructs and the anonymous short-circuit tokens.
pub fn is_decision_point(kind: &str) -> bool {
    matches!(
        kind,
        "if_statement"
            | "if_expression"
            | "elif_clause"
            | "else_if_clause"
            | "for_statement"
            | "for_in_statement"
            | "enhanced_for_statement"
            | "for_expression"
            | "while_statement"
            | "while_expression"
            | "loop_expression"
            | "do_statement"
            | "switch_case"
            | "switch_label"
            | "case_clause"
            | "match_arm"
            | "catch_clause"
            | "except_clause"
            | "conditional_expression"
            | "ternary_expression"
            | "list_comprehension"
            | "&&"
            | "||"
            | "and"
            | "or"
    )
}
