//! Constants module for SED core
//!
//! Default thresholds, weights and limits used by the analysis stages when
//! the caller does not override them.

pub mod analysis_defaults;
pub mod entropy_thresholds;

pub use analysis_defaults::{ParserDefaults, PropagationDefaults};
pub use entropy_thresholds::{EntropyThresholds, EntropyWeights};
