//! Entropy Thresholds and Weights
//!
//! Boundaries between classification levels and the default weighting of the
//! structural and semantic entropy components.

/// Lower bounds of the five classification levels over normalized entropy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntropyThresholds;

impl EntropyThresholds {
    pub const MINIMAL: f64 = 0.0;
    pub const LOW: f64 = 0.1;
    pub const MODERATE: f64 = 0.3;
    pub const HIGH: f64 = 0.6;
    pub const CRITICAL: f64 = 0.8;

    /// Default engine table, one lower bound per level
    pub const DEFAULT_TABLE: [f64; 5] = [
        Self::MINIMAL,
        Self::LOW,
        Self::MODERATE,
        Self::HIGH,
        Self::CRITICAL,
    ];

    /// Default report table (trivial/low/medium/high/critical). Kept separate
    /// from the engine table so the two can be tuned independently.
    pub const DEFAULT_REPORT_TABLE: [f64; 5] = [0.0, 0.1, 0.3, 0.6, 0.8];
}

/// Default weights of the combined entropy score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntropyWeights;

impl EntropyWeights {
    pub const STRUCTURAL: f64 = 0.4;
    pub const SEMANTIC: f64 = 0.6;
}
