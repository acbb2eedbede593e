//! SED Analysis Orchestrator
//!
//! Composes the stages for one file:
//! `ParsingBefore → ParsingAfter → Building → Diffing → Scoring → Propagating → Done`.
//! Only the parsing stages can fail; everything after them is total.

use crate::diff::diff_trees;
use crate::entropy::EntropyEngine;
use crate::grammar::{GrammarRegistry, Language};
use crate::graph::{DependencyGraph, PropagationTracker};
use crate::merkle::MerkleTree;
use crate::models::analysis_result::{
    AnalysisResult, ChangeMetrics, Classification, ParseErrors, ScoredChange,
};
use crate::models::semantic_nodes::SemanticTree;
use crate::parser::SemanticParser;
use crate::{AnalysisConfig, Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

pub mod batch;
pub mod summary;

pub use summary::{AnalysisSummary, FileImpact};

/// Stage of one analysis call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    ParsingBefore,
    ParsingAfter,
    Building,
    Diffing,
    Scoring,
    Propagating,
    Done,
    /// Terminal state, reachable from the parsing stages only
    Failed,
}

impl AnalysisStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ParsingBefore => "parsing_before",
            Self::ParsingAfter => "parsing_after",
            Self::Building => "building",
            Self::Diffing => "diffing",
            Self::Scoring => "scoring",
            Self::Propagating => "propagating",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Whether a failure in this stage aborts the call
    pub fn can_fail(self) -> bool {
        matches!(self, Self::ParsingBefore | Self::ParsingAfter)
    }
}

impl std::fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logs stage transitions of one call
struct StageLog {
    language: Language,
    stage: AnalysisStage,
    started: Instant,
}

impl StageLog {
    fn start(language: Language) -> Self {
        tracing::debug!(%language, stage = %AnalysisStage::ParsingBefore, "analysis started");
        Self {
            language,
            stage: AnalysisStage::ParsingBefore,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, next: AnalysisStage) {
        tracing::debug!(
            language = %self.language,
            from = %self.stage,
            stage = %next,
            elapsed_ms = self.started.elapsed().as_millis(),
            "analysis stage"
        );
        self.stage = next;
    }

    fn fail(&mut self, error: &Error) {
        tracing::warn!(
            language = %self.language,
            stage = %self.stage,
            %error,
            "analysis failed"
        );
        self.stage = AnalysisStage::Failed;
    }
}

/// Runs the full pipeline with one configuration
#[derive(Debug, Clone)]
pub struct Analyzer {
    parser: SemanticParser,
    entropy: EntropyEngine,
    propagation: PropagationTracker,
    config: AnalysisConfig,
}

impl Analyzer {
    /// Create an analyzer over an injected grammar registry
    pub fn new(registry: Arc<GrammarRegistry>, config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            parser: SemanticParser::new(registry),
            entropy: EntropyEngine::new(config.entropy.clone()),
            propagation: PropagationTracker::new(config.propagation.clone()),
            config,
        })
    }

    /// Analyzer over the built-in tree-sitter grammars
    pub fn with_default_grammars(config: AnalysisConfig) -> Result<Self> {
        Self::new(Arc::new(GrammarRegistry::with_default_grammars()), config)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn parser(&self) -> &SemanticParser {
        &self.parser
    }

    /// Analyze one file given its two snapshots
    pub fn analyze(&self, language: Language, before: &str, after: &str) -> Result<AnalysisResult> {
        let mut log = StageLog::start(language);

        let before_parse = self
            .parser
            .parse(before, language, &self.config.parser)
            .inspect_err(|e| log.fail(e))?;

        log.advance(AnalysisStage::ParsingAfter);
        let after_parse = self
            .parser
            .parse(after, language, &self.config.parser)
            .inspect_err(|e| log.fail(e))?;

        let errors = ParseErrors {
            before: before_parse.errors,
            after: after_parse.errors,
        };
        Ok(self.run_stages(&before_parse.tree, &after_parse.tree, errors, &mut log))
    }

    /// Analyze two already parsed trees. Never fails.
    pub fn analyze_trees(&self, before: &SemanticTree, after: &SemanticTree) -> AnalysisResult {
        let mut log = StageLog::start(after.language);
        self.run_stages(before, after, ParseErrors::default(), &mut log)
    }

    fn run_stages(
        &self,
        before: &SemanticTree,
        after: &SemanticTree,
        errors: ParseErrors,
        log: &mut StageLog,
    ) -> AnalysisResult {
        log.advance(AnalysisStage::Building);
        let before_tree = MerkleTree::build(before);
        let after_tree = MerkleTree::build(after);

        log.advance(AnalysisStage::Diffing);
        let tree_diff = diff_trees(&before_tree, &after_tree);

        log.advance(AnalysisStage::Scoring);
        let entropies = self.entropy.score(&tree_diff.changes);
        let entropy = self.entropy.aggregate(&entropies);

        log.advance(AnalysisStage::Propagating);
        let propagation = self.config.propagation.enabled.then(|| {
            let graph = DependencyGraph::from_diff(&before_tree, &after_tree, &tree_diff);
            self.propagation.track(&graph, &entropies)
        });

        let changes: Vec<ScoredChange> = tree_diff
            .changes
            .into_iter()
            .zip(entropies)
            .map(|(change, entropy)| ScoredChange { change, entropy })
            .collect();

        let thresholds = &self.config.entropy;
        let score = entropy.max_entropy;
        let classification = Classification::new(
            score,
            thresholds.thresholds.classify(score),
            thresholds.report_thresholds.classify(score),
            thresholds.labels,
        );

        let result = AnalysisResult {
            language: after.language,
            classification,
            metrics: ChangeMetrics::from_changes(&changes, &entropy),
            changes,
            entropy,
            propagation,
            errors,
        };

        log.advance(AnalysisStage::Done);
        tracing::info!(
            language = %result.language,
            changes = result.changes.len(),
            level = %result.classification.label,
            total_entropy = result.metrics.total_entropy,
            "analysis complete"
        );
        result
    }
}
