//! SED Core - Semantic Entropy Diff Engine
//!
//! This crate turns two snapshots of a source file into a scored change set:
//! - Semantic parsing of raw syntax trees into typed node trees
//! - Content-addressed (Merkle) trees over that structure
//! - Structural diffing between two snapshots
//! - Information-theoretic entropy scoring per change
//! - Impact propagation through the containment graph
//!
//! Every analysis is a pure function of (language, before, after, config).
//! Nothing is persisted and no state is shared between calls.

//#![deny(missing_docs)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo
)]
#![allow(
    clippy::multiple_crate_versions,  // Common in large dependency trees
    clippy::module_name_repetitions,  // Often necessary for clarity
    clippy::cast_precision_loss,      // Counts are far below 2^52
)]

pub mod constants;
pub mod models;
pub mod grammar;
pub mod parser;
pub mod merkle;
pub mod diff;
pub mod entropy;
pub mod graph;
pub mod analysis;

// Re-export commonly used types for convenience
pub use analysis::{AnalysisStage, AnalysisSummary, Analyzer, FileImpact};
pub use entropy::{EntropyConfig, EntropyLevel, LabelSet, ThresholdTable};
pub use grammar::{GrammarProvider, GrammarRegistry, Language};
pub use graph::propagation::PropagationConfig;
pub use models::{
    analysis_result::{AnalysisResult, FileChange, FileOutcome},
    change::{Change, ChangeType},
    semantic_nodes::{NodeType, SemanticNode, SemanticTree},
};
pub use parser::{Granularity, ParseOptions, SemanticParser};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Result type used throughout SED core
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for SED core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No grammar provider is registered for the language
    #[error("Unsupported language: {language}")]
    UnsupportedLanguage { language: String },

    /// The grammar parse step exceeded its wall-clock bound
    #[error("Parsing {language} source timed out after {timeout_ms} ms")]
    ParseTimeout { language: String, timeout_ms: u64 },

    /// Two distributions that must be aligned have different lengths
    #[error("Distribution length mismatch: {left} vs {right}")]
    DistributionLengthMismatch { left: usize, right: usize },

    /// A threshold table is not strictly ascending or not finite
    #[error("Invalid threshold table: {0}")]
    InvalidThresholdTable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker pool could not be created
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Utility error
    #[error("Utility error: {0}")]
    Util(#[from] sed_utils::UtilError),
}

/// Configuration for one analysis call, passed by value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub parser: ParseOptions,
    pub entropy: EntropyConfig,
    pub propagation: PropagationConfig,
}

impl AnalysisConfig {
    /// Load a TOML, JSON or YAML config file and validate it
    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Self = sed_utils::load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.parser.max_depth == 0 {
            return Err(Error::Config("parser.max_depth must be greater than 0".to_string()));
        }

        self.entropy.validate()?;
        self.propagation.validate()?;

        Ok(())
    }
}
