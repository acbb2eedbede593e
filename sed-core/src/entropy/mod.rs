//! Information-theoretic measures
//!
//! All logarithms are base 2. Probabilities at or below zero contribute
//! nothing to a sum, by the usual `0 · log 0 = 0` convention.

pub mod classification;
pub mod engine;

pub use classification::{EntropyLevel, LabelSet, ThresholdTable};
pub use engine::{ComponentBreakdown, EntropyAnalysis, EntropyConfig, EntropyEngine, NodeEntropy};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// KL divergence value. Infinite divergence is a valid result meaning the
/// two distributions are maximally distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Divergence {
    Finite(f64),
    Infinite,
}

impl Divergence {
    pub fn value(self) -> f64 {
        match self {
            Self::Finite(value) => value,
            Self::Infinite => f64::INFINITY,
        }
    }

    pub fn is_infinite(self) -> bool {
        matches!(self, Self::Infinite)
    }

    /// Project onto the level scale: infinite divergence is critical, finite
    /// divergence `d` is classified as `1 - 2^-d`
    pub fn level(self, table: &ThresholdTable) -> EntropyLevel {
        match self {
            Self::Infinite => EntropyLevel::Critical,
            Self::Finite(value) => table.classify(1.0 - (-value).exp2()),
        }
    }
}

/// Shannon entropy `H(p) = -Σ pᵢ·log₂(pᵢ)`
pub fn shannon_entropy(distribution: &[f64]) -> f64 {
    let entropy: f64 = distribution
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.log2())
        .sum();
    entropy.max(0.0)
}

/// Normalize counts into a probability distribution. All-zero counts give
/// an all-zero distribution.
pub fn distribution_from_counts(counts: &[f64]) -> Vec<f64> {
    let total: f64 = counts.iter().filter(|&&c| c > 0.0).sum();
    if total <= 0.0 {
        return vec![0.0; counts.len()];
    }
    counts.iter().map(|&c| c.max(0.0) / total).collect()
}

/// Divide by `log₂(categories)` and clamp to [0, 1]. Zero or one category
/// carries no uncertainty.
pub fn normalize_entropy(entropy: f64, categories: usize) -> f64 {
    if categories <= 1 {
        return 0.0;
    }
    (entropy / (categories as f64).log2()).clamp(0.0, 1.0)
}

/// KL divergence `D(P‖Q) = Σ Pᵢ·log₂(Pᵢ/Qᵢ)`.
///
/// # Errors
/// Returns [`Error::DistributionLengthMismatch`] when `p` and `q` are not
/// aligned; this is a caller bug, not a property of the data.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> Result<Divergence> {
    if p.len() != q.len() {
        return Err(Error::DistributionLengthMismatch {
            left: p.len(),
            right: q.len(),
        });
    }

    let mut divergence = 0.0;
    for (&pi, &qi) in p.iter().zip(q) {
        if pi <= 0.0 {
            continue;
        }
        if qi <= 0.0 {
            return Ok(Divergence::Infinite);
        }
        divergence += pi * (pi / qi).log2();
    }
    Ok(Divergence::Finite(divergence.max(0.0)))
}

/// Conditional entropy `H(Y|X)` from a joint count table with one row per
/// value of `X` and one column per value of `Y`
pub fn conditional_entropy(joint: &[Vec<f64>]) -> f64 {
    let total: f64 = joint.iter().flatten().filter(|&&c| c > 0.0).sum();
    if total <= 0.0 {
        return 0.0;
    }

    joint
        .iter()
        .map(|row| {
            let row_total: f64 = row.iter().filter(|&&c| c > 0.0).sum();
            if row_total <= 0.0 {
                0.0
            } else {
                (row_total / total) * shannon_entropy(&distribution_from_counts(row))
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_shannon_entropy_known_values() {
        assert!(shannon_entropy(&[]).abs() < EPS);
        assert!(shannon_entropy(&[1.0]).abs() < EPS);
        assert!((shannon_entropy(&[0.5, 0.5]) - 1.0).abs() < EPS);
        assert!((shannon_entropy(&[0.25; 4]) - 2.0).abs() < EPS);
        // Zero and negative entries contribute nothing
        assert!((shannon_entropy(&[0.5, 0.0, 0.5, -1.0]) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_normalization() {
        assert!(normalize_entropy(3.0, 1).abs() < EPS);
        assert!((normalize_entropy(1.0, 2) - 1.0).abs() < EPS);
        assert!((normalize_entropy(1.0, 4) - 0.5).abs() < EPS);
        assert!((normalize_entropy(10.0, 4) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_distribution_from_counts() {
        assert_eq!(distribution_from_counts(&[1.0, 3.0]), vec![0.25, 0.75]);
        assert_eq!(distribution_from_counts(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_kl_divergence() {
        let p = [0.5, 0.5];
        assert_eq!(kl_divergence(&p, &p).unwrap(), Divergence::Finite(0.0));

        let d = kl_divergence(&[0.5, 0.5], &[0.25, 0.75]).unwrap();
        let expected = 0.5 * 2.0_f64.log2() + 0.5 * (0.5_f64 / 0.75).log2();
        assert!((d.value() - expected).abs() < EPS);

        assert_eq!(kl_divergence(&[0.5, 0.5], &[1.0, 0.0]).unwrap(), Divergence::Infinite);
        // Q may be zero where P is zero
        assert_eq!(kl_divergence(&[1.0, 0.0], &[1.0, 0.0]).unwrap(), Divergence::Finite(0.0));
    }

    #[test]
    fn test_kl_divergence_length_mismatch() {
        assert!(matches!(
            kl_divergence(&[1.0], &[0.5, 0.5]),
            Err(Error::DistributionLengthMismatch { left: 1, right: 2 })
        ));
    }

    #[test]
    fn test_divergence_levels() {
        let table = ThresholdTable::default();
        assert_eq!(Divergence::Infinite.level(&table), EntropyLevel::Critical);
        assert_eq!(Divergence::Finite(0.0).level(&table), EntropyLevel::Minimal);
        assert!(Divergence::Infinite.value().is_infinite());
    }

    #[test]
    fn test_conditional_entropy() {
        // Y fully determined by X
        assert!(conditional_entropy(&[vec![2.0, 0.0], vec![0.0, 3.0]]).abs() < EPS);
        // Y independent and uniform given X
        assert!((conditional_entropy(&[vec![1.0, 1.0], vec![2.0, 2.0]]) - 1.0).abs() < EPS);
        assert!(conditional_entropy(&[]).abs() < EPS);
    }

    proptest! {
        #[test]
        fn prop_entropy_bounded_by_log_categories(
            counts in prop::collection::vec(0.0f64..100.0, 1..20)
        ) {
            let h = shannon_entropy(&distribution_from_counts(&counts));
            prop_assert!(h >= 0.0);
            prop_assert!(h <= (counts.len() as f64).log2() + EPS);
        }

        #[test]
        fn prop_conditioning_never_increases_entropy(
            rows in prop::collection::vec(prop::collection::vec(0.0f64..50.0, 3), 1..6)
        ) {
            let marginal: Vec<f64> = (0..3).map(|y| rows.iter().map(|r| r[y]).sum()).collect();
            let h_y = shannon_entropy(&distribution_from_counts(&marginal));
            prop_assert!(conditional_entropy(&rows) <= h_y + 1e-6);
        }
    }
}
