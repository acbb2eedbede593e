//! Impact propagation
//!
//! Every changed node seeds a breadth-first search over the dependency
//! graph. Impact starts at the node's normalized entropy and is multiplied
//! by the decay factor at each hop. A branch stops once its impact falls
//! below the cutoff or the hop limit is reached. A node reached by several
//! seeds or paths keeps its maximum impact.

use super::DependencyGraph;
use crate::constants::PropagationDefaults;
use crate::entropy::NodeEntropy;
use crate::{Error, Result};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Propagation limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    pub enabled: bool,
    /// Maximum number of hops from a seed
    pub max_depth: usize,
    /// Impact multiplier per hop, in (0, 1)
    pub impact_decay: f64,
    /// Impacts below this are dropped and not expanded
    pub min_impact: f64,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: PropagationDefaults::MAX_DEPTH,
            impact_decay: PropagationDefaults::IMPACT_DECAY,
            min_impact: PropagationDefaults::MIN_IMPACT,
        }
    }
}

impl PropagationConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(Error::Config("propagation.max_depth must be greater than 0".to_string()));
        }
        if !(self.impact_decay > 0.0 && self.impact_decay < 1.0) {
            return Err(Error::Config(format!(
                "propagation.impact_decay must be within (0, 1), got {}",
                self.impact_decay
            )));
        }
        if !(self.min_impact > 0.0 && self.min_impact < 1.0) {
            return Err(Error::Config(format!(
                "propagation.min_impact must be within (0, 1), got {}",
                self.min_impact
            )));
        }
        Ok(())
    }
}

/// One discovered route from a changed node to an affected node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagationPath {
    pub source: String,
    pub target: String,
    /// Node ids from source to target, both included
    pub path: Vec<String>,
    pub distance: usize,
    pub impact: f64,
}

/// Output of one propagation run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagationResult {
    /// Affected node id to its maximum impact
    pub affected_nodes: BTreeMap<String, f64>,
    pub paths: Vec<PropagationPath>,
    pub max_distance: usize,
    /// Seed entropies plus affected node impacts
    pub total_impact: f64,
}

/// Runs decayed breadth-first propagation with fixed limits
#[derive(Debug, Clone, Default)]
pub struct PropagationTracker {
    config: PropagationConfig,
}

impl PropagationTracker {
    pub fn new(config: PropagationConfig) -> Self {
        Self { config }
    }

    /// Propagate every entry whose change type is not `unchanged`
    pub fn track(&self, graph: &DependencyGraph, entropies: &[NodeEntropy]) -> PropagationResult {
        let mut result = PropagationResult::default();

        for seed in entropies.iter().filter(|e| e.change_type.is_change()) {
            result.total_impact += seed.normalized;
            // Nodes missing from the graph have no dependents
            if let Some(start) = graph.node_index(&seed.node_id) {
                self.propagate(graph, start, seed, &mut result);
            }
        }

        result.total_impact += result.affected_nodes.values().sum::<f64>();
        result.max_distance = result.paths.iter().map(|p| p.distance).max().unwrap_or(0);

        tracing::debug!(
            affected = result.affected_nodes.len(),
            paths = result.paths.len(),
            max_distance = result.max_distance,
            total_impact = result.total_impact,
            "propagated impact"
        );
        result
    }

    fn propagate(
        &self,
        graph: &DependencyGraph,
        start: NodeIndex,
        seed: &NodeEntropy,
        result: &mut PropagationResult,
    ) {
        // Visited set and predecessors belong to this seed only
        let mut previous: HashMap<NodeIndex, Option<NodeIndex>> = HashMap::from([(start, None)]);
        let mut queue = VecDeque::from([(start, 0usize)]);

        while let Some((node, distance)) = queue.pop_front() {
            if distance >= self.config.max_depth {
                continue;
            }
            let next = distance + 1;
            let impact = self.impact_at(seed.normalized, next);
            if impact < self.config.min_impact {
                continue;
            }

            for dependent in graph.dependents(node) {
                if previous.contains_key(&dependent) {
                    continue;
                }
                previous.insert(dependent, Some(node));

                let Some(target) = graph.node_id(dependent) else {
                    continue;
                };
                let best = result.affected_nodes.entry(target.to_string()).or_insert(impact);
                *best = best.max(impact);

                result.paths.push(PropagationPath {
                    source: seed.node_id.clone(),
                    target: target.to_string(),
                    path: trace_path(graph, &previous, dependent),
                    distance: next,
                    impact,
                });
                queue.push_back((dependent, next));
            }
        }
    }

    /// Seed impact after `distance` hops
    pub fn impact_at(&self, seed: f64, distance: usize) -> f64 {
        let hops = i32::try_from(distance).unwrap_or(i32::MAX);
        seed * self.config.impact_decay.powi(hops)
    }
}

fn trace_path(
    graph: &DependencyGraph,
    previous: &HashMap<NodeIndex, Option<NodeIndex>>,
    end: NodeIndex,
) -> Vec<String> {
    let mut path = Vec::new();
    let mut current = Some(end);
    while let Some(node) = current {
        if let Some(id) = graph.node_id(node) {
            path.push(id.to_string());
        }
        current = previous.get(&node).copied().flatten();
    }
    path.reverse();
    path
}
