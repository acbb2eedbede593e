//! Data models module for SED core
//!
//! Semantic trees produced by the parser, change records produced by the
//! differ and the analysis results handed to callers.

pub mod semantic_nodes;
pub mod change;
pub mod analysis_result;

pub use semantic_nodes::{NodeMetadata, NodeType, SemanticNode, SemanticTree, SourceRange};
pub use change::{Change, ChangeType, NodeSnapshot};
pub use analysis_result::{
    AnalysisResult, ChangeMetrics, Classification, FileChange, FileOutcome, ParseErrors,
    ScoredChange,
};
