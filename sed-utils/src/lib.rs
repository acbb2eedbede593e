//! SED Utilities - Shared helpers for the semantic entropy pipeline
//!
//! This crate provides the small, analysis-agnostic building blocks the core
//! relies on: whitespace normalization and tokenization of source text,
//! configuration file loading, and logging initialization.

//#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod string;
pub mod config;
pub mod logging;

/// Re-export commonly used utilities
pub use string::{
    normalize_whitespace, safe_truncate, tokenize, Token, TokenKind,
};
pub use config::load_config;
pub use logging::{init_logging, LogLevel, LoggerConfig};

/// Result type used throughout SED utilities
pub type Result<T> = std::result::Result<T, UtilError>;

/// Error types for utility operations
#[derive(Debug, thiserror::Error)]
pub enum UtilError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}
