//! String processing utilities for source text
//!
//! Normalization is what makes content hashes whitespace-insensitive, and the
//! tokenizer feeds the token-level distributions of the entropy engine.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref TOKEN: Regex = Regex::new(concat!(
        r#""(?:\\.|[^"\\])*"|'(?:\\.|[^'\\])*'|`(?:\\.|[^`\\])*`"#,
        r"|[0-9][0-9A-Za-z_]*(?:\.[0-9]+)?",
        r"|[A-Za-z_$][A-Za-z0-9_$]*",
        r"|===|!==|==|!=|<=|>=|=>|->|&&|\|\||::|\+\+|--|\+=|-=|\*=|/=|\*\*|<<|>>|\?\?|\?\.",
        r"|[+\-*/%=<>!&|^~?:]",
        r"|\S",
    ))
    .unwrap();
}

/// Keywords shared by the supported languages. Membership only affects the
/// token kind, so a superset is fine.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "break", "case", "catch", "class", "const",
    "continue", "def", "default", "del", "do", "elif", "else", "enum", "except",
    "export", "extends", "false", "final", "finally", "fn", "for", "from", "function",
    "if", "impl", "implements", "import", "in", "instanceof", "interface", "lambda",
    "let", "loop", "match", "mod", "mut", "new", "None", "null", "package", "pass",
    "private", "protected", "pub", "public", "raise", "return", "self", "static",
    "struct", "super", "switch", "this", "throw", "throws", "trait", "True", "False",
    "true", "try", "type", "typeof", "undefined", "use", "var", "void", "where",
    "while", "with", "yield",
];

/// Lexical category of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Keyword,
    Identifier,
    Number,
    String,
    Operator,
    Punctuation,
}

impl TokenKind {
    /// All kinds, in a fixed order
    pub const ALL: [Self; 6] = [
        Self::Keyword,
        Self::Identifier,
        Self::Number,
        Self::String,
        Self::Operator,
        Self::Punctuation,
    ];

    fn classify(text: &str) -> Self {
        let Some(first) = text.chars().next() else {
            return Self::Punctuation;
        };
        if text.len() >= 2 && matches!(first, '"' | '\'' | '`') {
            Self::String
        } else if first.is_ascii_digit() {
            Self::Number
        } else if first.is_alphabetic() || first == '_' || first == '$' {
            if KEYWORDS.contains(&text) {
                Self::Keyword
            } else {
                Self::Identifier
            }
        } else if "+-*/%=<>!&|^~?:".contains(first) {
            Self::Operator
        } else {
            Self::Punctuation
        }
    }
}

/// A lexical token borrowed from the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token<'a> {
    pub text: &'a str,
    pub kind: TokenKind,
}

/// Split source text into coarse, language-agnostic tokens.
///
/// This is not a lexer for any particular language; it only needs to be
/// stable so that before/after token multisets are comparable.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    TOKEN
        .find_iter(text)
        .map(|m| Token {
            text: m.as_str(),
            kind: TokenKind::classify(m.as_str()),
        })
        .collect()
}

/// Collapse every whitespace run to one space and trim. Nothing else is
/// rewritten, so any non-whitespace byte difference survives.
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Safely truncate text to maximum length on a grapheme boundary
pub fn safe_truncate(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }

    let budget = max_len.saturating_sub(3);
    let mut truncated = String::new();
    for grapheme in text.graphemes(true) {
        if truncated.len() + grapheme.len() > budget {
            break;
        }
        truncated.push_str(grapheme);
    }
    if max_len >= 3 {
        truncated.push_str("...");
    }
    truncated
}
