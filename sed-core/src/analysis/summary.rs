//! Roll-up of many per-file results

use crate::constants::PropagationDefaults;
use crate::entropy::EntropyLevel;
use crate::models::analysis_result::FileOutcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One entry of the top-impact ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileImpact {
    pub path: PathBuf,
    pub level: EntropyLevel,
    pub impact: f64,
    pub total_entropy: f64,
}

/// Counts and totals across a batch
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub files_analyzed: usize,
    pub files_failed: usize,
    /// Files per file-level classification
    pub level_counts: BTreeMap<EntropyLevel, usize>,
    pub total_entropy: f64,
    /// Mean of the per-file total entropy
    pub average_entropy: f64,
    pub additions: usize,
    pub deletions: usize,
    pub modifications: usize,
    /// Highest impact first
    pub top_files: Vec<FileImpact>,
}

impl AnalysisSummary {
    /// Summarize outcomes with the default ranking size
    pub fn from_outcomes(outcomes: &[FileOutcome]) -> Self {
        Self::with_top(outcomes, PropagationDefaults::TOP_IMPACT_FILES)
    }

    /// Summarize outcomes, keeping the `top` highest-impact files
    pub fn with_top(outcomes: &[FileOutcome], top: usize) -> Self {
        let mut summary = Self::default();
        let mut ranking = Vec::new();

        for outcome in outcomes {
            let Some(result) = &outcome.result else {
                summary.files_failed += 1;
                continue;
            };

            summary.files_analyzed += 1;
            *summary.level_counts.entry(result.classification.level).or_insert(0) += 1;
            summary.total_entropy += result.metrics.total_entropy;
            summary.additions += result.metrics.additions;
            summary.deletions += result.metrics.deletions;
            summary.modifications += result.metrics.modifications;

            ranking.push(FileImpact {
                path: outcome.path.clone(),
                level: result.classification.level,
                impact: result.impact(),
                total_entropy: result.metrics.total_entropy,
            });
        }

        if summary.files_analyzed > 0 {
            summary.average_entropy = summary.total_entropy / summary.files_analyzed as f64;
        }

        ranking.sort_by(|a, b| b.impact.total_cmp(&a.impact).then_with(|| a.path.cmp(&b.path)));
        ranking.truncate(top);
        summary.top_files = ranking;

        summary
    }
}
