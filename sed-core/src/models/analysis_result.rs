//! Analysis Result Model
//!
//! The structured value one `analyze` call produces, plus the per-file
//! inputs and outcomes of batch analysis. Field names are stable and
//! camelCase so renderers can project them directly.

use super::change::{Change, ChangeType};
use crate::entropy::{EntropyAnalysis, EntropyLevel, LabelSet, NodeEntropy};
use crate::grammar::Language;
use crate::graph::PropagationResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Complete analysis result for one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub language: Language,
    /// File-level classification
    pub classification: Classification,
    /// Rolled-up change counts and entropy totals
    pub metrics: ChangeMetrics,
    /// Every change with its entropy, in diff order
    pub changes: Vec<ScoredChange>,
    /// Aggregate entropy statistics
    pub entropy: EntropyAnalysis,
    /// Absent when propagation is disabled
    pub propagation: Option<PropagationResult>,
    /// Syntax errors collected while parsing each snapshot
    pub errors: ParseErrors,
}

impl AnalysisResult {
    /// Impact used to rank files: propagated total impact when available,
    /// otherwise the file score
    pub fn impact(&self) -> f64 {
        self.propagation
            .as_ref()
            .map_or(self.classification.score, |p| p.total_impact)
    }

    /// Whether anything beyond whitespace changed
    pub fn has_changes(&self) -> bool {
        self.changes.iter().any(|c| c.change.change_type.is_change())
    }
}

/// File-level classification, scored as the maximum normalized entropy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub score: f64,
    /// Level under the engine threshold table
    pub level: EntropyLevel,
    /// Level under the report threshold table
    pub report_level: EntropyLevel,
    /// `level` or `report_level` spelled in the configured label set
    pub label: String,
}

impl Classification {
    pub fn new(
        score: f64,
        level: EntropyLevel,
        report_level: EntropyLevel,
        labels: LabelSet,
    ) -> Self {
        let label = match labels {
            LabelSet::Engine => level.label(labels),
            LabelSet::Report => report_level.label(labels),
        };
        Self {
            score,
            level,
            report_level,
            label: label.to_string(),
        }
    }
}

/// Change counts and entropy totals
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMetrics {
    pub total_entropy: f64,
    pub average_entropy: f64,
    pub max_entropy: f64,
    pub additions: usize,
    pub deletions: usize,
    pub modifications: usize,
    pub unchanged: usize,
    /// Actual changes per engine level
    pub level_counts: BTreeMap<EntropyLevel, usize>,
}

impl ChangeMetrics {
    pub fn from_changes(changes: &[ScoredChange], entropy: &EntropyAnalysis) -> Self {
        let count = |kind: ChangeType| {
            changes.iter().filter(|c| c.change.change_type == kind).count()
        };
        Self {
            total_entropy: entropy.total_entropy,
            average_entropy: entropy.average_entropy,
            max_entropy: entropy.max_entropy,
            additions: count(ChangeType::Added),
            deletions: count(ChangeType::Removed),
            modifications: count(ChangeType::Modified),
            unchanged: count(ChangeType::Unchanged),
            level_counts: entropy.level_counts.clone(),
        }
    }
}

/// A change together with its entropy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredChange {
    #[serde(flatten)]
    pub change: Change,
    pub entropy: NodeEntropy,
}

/// Syntax errors of both snapshots
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParseErrors {
    pub before: Vec<String>,
    pub after: Vec<String>,
}

impl ParseErrors {
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

/// One file of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: PathBuf,
    pub language: Language,
    pub before: String,
    pub after: String,
}

/// Success or failure of one file in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn success(path: PathBuf, result: AnalysisResult) -> Self {
        Self {
            path,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(path: PathBuf, error: impl Into<String>) -> Self {
        Self {
            path,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_label_follows_label_set() {
        let engine =
            Classification::new(0.35, EntropyLevel::Moderate, EntropyLevel::Low, LabelSet::Engine);
        assert_eq!(engine.label, "moderate");
        let report = Classification::new(
            0.35,
            EntropyLevel::Moderate,
            EntropyLevel::Moderate,
            LabelSet::Report,
        );
        assert_eq!(report.label, "medium");
    }

    #[test]
    fn test_file_outcome_constructors() {
        let failed = FileOutcome::failure(
            PathBuf::from("a.py"),
            "Parsing python source timed out after 5 ms",
        );
        assert!(!failed.is_success());
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["path"], "a.py");
        assert!(json["result"].is_null());
    }
}
