//! Per-change entropy scoring
//!
//! Each change yields three distributions:
//! - structural: per child structural hash, the absolute change in its count
//! - semantic: per token, the absolute change in its count
//! - syntactic: the changed tokens bucketed by token kind
//!
//! Each entropy is normalized by `log₂` of its category count. The combined
//! score weights the structural and semantic components; the syntactic
//! component is reported in the breakdown only.
//!
//! Entropy measures how spread out a change is, not how large it is. A
//! modification whose whole delta falls on one token and leaves the child
//! shapes alone (`f(a)` → `f(a,)`) scores exactly 0 and classifies at the
//! lowest level, like an unchanged node. Such a change is still reported as
//! `modified`, and its token [`Divergence`] is infinite whenever the token is
//! new, so callers that must not miss it can key on either.

use super::classification::{EntropyLevel, LabelSet, ThresholdTable};
use super::{
    conditional_entropy, distribution_from_counts, kl_divergence, normalize_entropy,
    shannon_entropy, Divergence,
};
use crate::constants::EntropyWeights;
use crate::merkle::NodeHash;
use crate::models::change::{Change, ChangeType, NodeSnapshot};
use crate::models::semantic_nodes::NodeType;
use crate::{Error, Result};
use sed_utils::TokenKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Weights, thresholds and labels of the entropy engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntropyConfig {
    pub structural_weight: f64,
    pub semantic_weight: f64,
    /// Table behind [`NodeEntropy::level`]
    pub thresholds: ThresholdTable,
    /// Table behind [`NodeEntropy::report_level`]
    pub report_thresholds: ThresholdTable,
    /// Spelling used when a single label is rendered
    pub labels: LabelSet,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            structural_weight: EntropyWeights::STRUCTURAL,
            semantic_weight: EntropyWeights::SEMANTIC,
            thresholds: ThresholdTable::default(),
            report_thresholds: ThresholdTable::report(),
            labels: LabelSet::default(),
        }
    }
}

impl EntropyConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("structural_weight", self.structural_weight),
            ("semantic_weight", self.semantic_weight),
        ];
        for (name, weight) in weights {
            if !(0.0..=1.0).contains(&weight) {
                return Err(Error::Config(format!(
                    "entropy.{name} must be within [0, 1], got {weight}"
                )));
            }
        }
        if self.structural_weight + self.semantic_weight > 1.0 + 1e-9 {
            return Err(Error::Config(format!(
                "entropy weights must sum to at most 1, got {}",
                self.structural_weight + self.semantic_weight
            )));
        }
        self.thresholds.validate()?;
        self.report_thresholds.validate()?;
        Ok(())
    }
}

/// Normalized entropy of each component, in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentBreakdown {
    pub structural: f64,
    pub semantic: f64,
    pub syntactic: f64,
}

/// Entropy measurement attached to one change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeEntropy {
    pub node_id: String,
    pub node_type: NodeType,
    pub change_type: ChangeType,
    /// Weighted Shannon entropy in bits, before normalization
    pub raw: f64,
    /// Weighted normalized entropy in [0, 1]
    pub normalized: f64,
    pub level: EntropyLevel,
    pub report_level: EntropyLevel,
    pub components: ComponentBreakdown,
    /// Divergence of the after token distribution from the before one, for
    /// nodes present on both sides
    pub divergence: Option<Divergence>,
}

impl NodeEntropy {
    /// Render the level in the given label set. The report set reads the
    /// report table's level.
    pub fn label(&self, labels: LabelSet) -> &'static str {
        match labels {
            LabelSet::Engine => self.level.label(labels),
            LabelSet::Report => self.report_level.label(labels),
        }
    }
}

/// Aggregate over the entropies of one change set
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntropyAnalysis {
    /// Sum of normalized entropies
    pub total_entropy: f64,
    /// Mean normalized entropy over actual changes, 0 when there are none
    pub average_entropy: f64,
    pub max_entropy: f64,
    /// Sum of raw entropies, in bits
    pub raw_total: f64,
    /// Actual changes per engine level
    pub level_counts: BTreeMap<EntropyLevel, usize>,
    /// Entropy of the change type distribution
    pub change_type_entropy: f64,
    /// Uncertainty of the change type once the node type is known
    pub conditional_change_entropy: f64,
}

/// Scores changes with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct EntropyEngine {
    config: EntropyConfig,
}

impl EntropyEngine {
    pub fn new(config: EntropyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EntropyConfig {
        &self.config
    }

    /// Score every change, in order
    pub fn score(&self, changes: &[Change]) -> Vec<NodeEntropy> {
        changes.iter().map(|change| self.score_change(change)).collect()
    }

    /// Score one change. Unchanged nodes carry zero entropy.
    pub fn score_change(&self, change: &Change) -> NodeEntropy {
        if change.change_type == ChangeType::Unchanged {
            return self.entropy_for(change, 0.0, 0.0, ComponentBreakdown::default(), None);
        }

        let structural = structural_component(change);
        let tokens = TokenDeltas::new(change.before.as_ref(), change.after.as_ref());
        let semantic = tokens.semantic_entropy();
        let syntactic = tokens.syntactic_entropy();

        let (ws, wsem) = (self.config.structural_weight, self.config.semantic_weight);
        let raw = ws * structural.0 + wsem * semantic.0;
        let normalized = (ws * structural.1 + wsem * semantic.1).clamp(0.0, 1.0);

        let components = ComponentBreakdown {
            structural: structural.1,
            semantic: semantic.1,
            syntactic,
        };
        let divergence = if change.change_type == ChangeType::Modified {
            tokens.divergence()
        } else {
            None
        };

        self.entropy_for(change, raw, normalized, components, divergence)
    }

    fn entropy_for(
        &self,
        change: &Change,
        raw: f64,
        normalized: f64,
        components: ComponentBreakdown,
        divergence: Option<Divergence>,
    ) -> NodeEntropy {
        NodeEntropy {
            node_id: change.node_id.clone(),
            node_type: change.node_type,
            change_type: change.change_type,
            raw,
            normalized,
            level: self.config.thresholds.classify(normalized),
            report_level: self.config.report_thresholds.classify(normalized),
            components,
            divergence,
        }
    }

    /// Fold scored changes into an aggregate
    pub fn aggregate(&self, entropies: &[NodeEntropy]) -> EntropyAnalysis {
        let changed: Vec<&NodeEntropy> =
            entropies.iter().filter(|e| e.change_type.is_change()).collect();

        let mut analysis = EntropyAnalysis {
            total_entropy: entropies.iter().map(|e| e.normalized).sum(),
            max_entropy: entropies.iter().map(|e| e.normalized).fold(0.0, f64::max),
            raw_total: entropies.iter().map(|e| e.raw).sum(),
            ..EntropyAnalysis::default()
        };
        if !changed.is_empty() {
            analysis.average_entropy =
                changed.iter().map(|e| e.normalized).sum::<f64>() / changed.len() as f64;
        }
        for entry in &changed {
            *analysis.level_counts.entry(entry.level).or_insert(0) += 1;
        }

        let mut joint: BTreeMap<NodeType, [f64; 4]> = BTreeMap::new();
        for entry in entropies {
            let column = ChangeType::ALL.iter().position(|&t| t == entry.change_type).unwrap_or(0);
            joint.entry(entry.node_type).or_default()[column] += 1.0;
        }
        let marginal: Vec<f64> = (0..ChangeType::ALL.len())
            .map(|column| joint.values().map(|row| row[column]).sum())
            .collect();
        let rows: Vec<Vec<f64>> = joint.values().map(|row| row.to_vec()).collect();

        analysis.change_type_entropy = shannon_entropy(&distribution_from_counts(&marginal));
        analysis.conditional_change_entropy = conditional_entropy(&rows);

        analysis
    }
}

/// Raw and normalized structural entropy
fn structural_component(change: &Change) -> (f64, f64) {
    let mut counts: HashMap<NodeHash, (f64, f64)> = HashMap::new();

    if let Some(before) = &change.before {
        for shape in &before.child_shapes {
            counts.entry(*shape).or_default().0 += 1.0;
        }
    }
    if let Some(after) = &change.after {
        for shape in &after.child_shapes {
            counts.entry(*shape).or_default().1 += 1.0;
        }
    }
    // A node that appears or disappears also changes its own shape count
    match (&change.before, &change.after) {
        (None, Some(after)) => counts.entry(after.structural_hash).or_default().1 += 1.0,
        (Some(before), None) => counts.entry(before.structural_hash).or_default().0 += 1.0,
        _ => {}
    }

    let deltas: Vec<f64> = counts.values().map(|(b, a)| (a - b).abs()).collect();
    let entropy = shannon_entropy(&distribution_from_counts(&deltas));
    (entropy, normalize_entropy(entropy, deltas.len()))
}

/// Token counts of both sides over their union vocabulary
struct TokenDeltas<'a> {
    vocabulary: BTreeMap<&'a str, (f64, f64, TokenKind)>,
}

impl<'a> TokenDeltas<'a> {
    fn new(before: Option<&'a NodeSnapshot>, after: Option<&'a NodeSnapshot>) -> Self {
        let mut vocabulary: BTreeMap<&'a str, (f64, f64, TokenKind)> = BTreeMap::new();
        if let Some(before) = before {
            for token in sed_utils::tokenize(&before.content) {
                vocabulary.entry(token.text).or_insert((0.0, 0.0, token.kind)).0 += 1.0;
            }
        }
        if let Some(after) = after {
            for token in sed_utils::tokenize(&after.content) {
                vocabulary.entry(token.text).or_insert((0.0, 0.0, token.kind)).1 += 1.0;
            }
        }
        Self { vocabulary }
    }

    fn deltas(&self) -> impl Iterator<Item = (f64, TokenKind)> + '_ {
        self.vocabulary.values().map(|&(b, a, kind)| ((a - b).abs(), kind))
    }

    /// Raw and normalized semantic entropy
    fn semantic_entropy(&self) -> (f64, f64) {
        let deltas: Vec<f64> = self.deltas().map(|(d, _)| d).collect();
        let entropy = shannon_entropy(&distribution_from_counts(&deltas));
        (entropy, normalize_entropy(entropy, deltas.len()))
    }

    /// Normalized entropy of the changed tokens over token kinds
    fn syntactic_entropy(&self) -> f64 {
        let mut buckets = [0.0; TokenKind::ALL.len()];
        for (delta, kind) in self.deltas() {
            if let Some(slot) = TokenKind::ALL.iter().position(|&k| k == kind) {
                buckets[slot] += delta;
            }
        }
        normalize_entropy(shannon_entropy(&distribution_from_counts(&buckets)), buckets.len())
    }

    /// Divergence of the after token distribution from the before one
    fn divergence(&self) -> Option<Divergence> {
        let before: Vec<f64> = self.vocabulary.values().map(|v| v.0).collect();
        let after: Vec<f64> = self.vocabulary.values().map(|v| v.1).collect();
        kl_divergence(&distribution_from_counts(&after), &distribution_from_counts(&before)).ok()
    }
}
