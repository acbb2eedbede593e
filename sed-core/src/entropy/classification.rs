//! Classification levels and threshold tables
//!
//! There is one canonical five-level scale. A [`ThresholdTable`] projects a
//! normalized entropy onto it, and a [`LabelSet`] decides how the levels are
//! spelled. Engine and report tables are configured independently.

use crate::constants::EntropyThresholds;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Canonical classification level, ordered from least to most surprising
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntropyLevel {
    Minimal,
    Low,
    Moderate,
    High,
    Critical,
}

impl EntropyLevel {
    pub const ALL: [Self; 5] = [
        Self::Minimal,
        Self::Low,
        Self::Moderate,
        Self::High,
        Self::Critical,
    ];

    /// Position on the scale, 0 for the lowest level
    pub fn rank(self) -> usize {
        self as usize
    }

    pub fn label(self, labels: LabelSet) -> &'static str {
        match labels {
            LabelSet::Engine => match self {
                Self::Minimal => "minimal",
                Self::Low => "low",
                Self::Moderate => "moderate",
                Self::High => "high",
                Self::Critical => "critical",
            },
            LabelSet::Report => match self {
                Self::Minimal => "trivial",
                Self::Low => "low",
                Self::Moderate => "medium",
                Self::High => "high",
                Self::Critical => "critical",
            },
        }
    }
}

impl std::fmt::Display for EntropyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label(LabelSet::Engine))
    }
}

impl std::str::FromStr for EntropyLevel {
    type Err = Error;

    /// Accepts the spellings of both label sets
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minimal" | "trivial" => Ok(Self::Minimal),
            "low" => Ok(Self::Low),
            "moderate" | "medium" => Ok(Self::Moderate),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(Error::Config(format!(
                "Invalid entropy level: '{s}'. \
                 Valid options: minimal/trivial, low, moderate/medium, high, critical"
            ))),
        }
    }
}

/// Spelling of the five levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSet {
    /// minimal, low, moderate, high, critical
    #[default]
    Engine,
    /// trivial, low, medium, high, critical
    Report,
}

/// Lower bound of each level over normalized entropy, strictly ascending
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdTable([f64; 5]);

impl ThresholdTable {
    /// Create a validated table
    pub fn new(bounds: [f64; 5]) -> Result<Self> {
        let table = Self(bounds);
        table.validate()?;
        Ok(table)
    }

    /// Default report-facing table
    pub fn report() -> Self {
        Self(EntropyThresholds::DEFAULT_REPORT_TABLE)
    }

    pub fn bounds(&self) -> &[f64; 5] {
        &self.0
    }

    /// Check the bounds are finite and strictly ascending
    pub fn validate(&self) -> Result<()> {
        if let Some(bad) = self.0.iter().find(|b| !b.is_finite()) {
            return Err(Error::InvalidThresholdTable(format!("bound {bad} is not finite")));
        }
        if let Some(pair) = self.0.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Error::InvalidThresholdTable(format!(
                "bounds must be strictly ascending, found {} before {}",
                pair[0], pair[1]
            )));
        }
        Ok(())
    }

    /// Highest level whose lower bound is at most `value`. Values below the
    /// first bound, and NaN, fall into the lowest level.
    pub fn classify(&self, value: f64) -> EntropyLevel {
        EntropyLevel::ALL
            .iter()
            .zip(self.0.iter())
            .rev()
            .find(|(_, &bound)| value >= bound)
            .map_or(EntropyLevel::Minimal, |(&level, _)| level)
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self(EntropyThresholds::DEFAULT_TABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_classification_steps() {
        let table = ThresholdTable::default();
        assert_eq!(table.classify(0.0), EntropyLevel::Minimal);
        assert_eq!(table.classify(0.099), EntropyLevel::Minimal);
        assert_eq!(table.classify(0.1), EntropyLevel::Low);
        assert_eq!(table.classify(0.3), EntropyLevel::Moderate);
        assert_eq!(table.classify(0.59), EntropyLevel::Moderate);
        assert_eq!(table.classify(0.6), EntropyLevel::High);
        assert_eq!(table.classify(0.8), EntropyLevel::Critical);
        assert_eq!(table.classify(1.0), EntropyLevel::Critical);
        assert_eq!(table.classify(-1.0), EntropyLevel::Minimal);
        assert_eq!(table.classify(f64::NAN), EntropyLevel::Minimal);
    }

    #[test]
    fn test_invalid_tables() {
        assert!(ThresholdTable::new([0.0, 0.2, 0.2, 0.6, 0.8]).is_err());
        assert!(ThresholdTable::new([0.0, 0.5, 0.3, 0.6, 0.8]).is_err());
        assert!(ThresholdTable::new([0.0, 0.1, 0.3, 0.6, f64::INFINITY]).is_err());
        assert!(ThresholdTable::new([0.0, 0.2, 0.4, 0.6, 0.9]).is_ok());
    }

    #[test]
    fn test_label_sets_share_levels() {
        let labels: Vec<&str> =
            EntropyLevel::ALL.iter().map(|l| l.label(LabelSet::Report)).collect();
        assert_eq!(labels, vec!["trivial", "low", "medium", "high", "critical"]);
        assert_eq!(EntropyLevel::Moderate.label(LabelSet::Engine), "moderate");
        assert_eq!("medium".parse::<EntropyLevel>().unwrap(), EntropyLevel::Moderate);
        assert_eq!("trivial".parse::<EntropyLevel>().unwrap(), EntropyLevel::Minimal);
        assert!("huge".parse::<EntropyLevel>().is_err());
    }

    #[test]
    fn test_independent_tables_disagree() {
        let engine = ThresholdTable::default();
        let report = ThresholdTable::new([0.0, 0.2, 0.5, 0.7, 0.9]).unwrap();
        assert_eq!(engine.classify(0.15), EntropyLevel::Low);
        assert_eq!(report.classify(0.15), EntropyLevel::Minimal);
    }

    #[test]
    fn test_table_serializes_as_array() {
        let json = serde_json::to_string(&ThresholdTable::default()).unwrap();
        assert_eq!(json, "[0.0,0.1,0.3,0.6,0.8]");
    }
}
