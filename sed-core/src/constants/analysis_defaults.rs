//! Parser and Propagation Defaults
//!
//! Limits for the semantic parser and the impact propagation tracker.

/// Defaults for the semantic parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserDefaults;

impl ParserDefaults {
    /// Raw syntax tree depth beyond which nodes are omitted
    pub const MAX_DEPTH: usize = 50;
    /// Wall-clock bound on the grammar parse step, in milliseconds
    pub const TIMEOUT_MS: u64 = 5000;
    pub const INCLUDE_COMMENTS: bool = false;
}

/// Defaults for impact propagation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationDefaults;

impl PropagationDefaults {
    /// Maximum number of hops from a changed node
    pub const MAX_DEPTH: usize = 5;
    /// Multiplier applied to the impact at every hop
    pub const IMPACT_DECAY: f64 = 0.5;
    /// Impacts below this value are dropped and not expanded further
    pub const MIN_IMPACT: f64 = 0.01;
    /// Number of files listed in a summary's top-impact ranking
    pub const TOP_IMPACT_FILES: usize = 10;
}
