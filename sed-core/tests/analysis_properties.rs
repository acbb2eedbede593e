//! End-to-end behaviour of the analysis pipeline

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sed_core::diff::diff_trees;
use sed_core::entropy::{normalize_entropy, shannon_entropy};
use sed_core::graph::{DependencyGraph, PropagationTracker};
use sed_core::merkle::MerkleTree;
use sed_core::{
    AnalysisConfig, AnalysisSummary, Analyzer, ChangeType, EntropyLevel, FileChange,
    GrammarRegistry, Language, ParseOptions, PropagationConfig, SemanticParser,
};
use std::path::PathBuf;
use std::sync::Arc;

fn analyzer() -> Analyzer {
    Analyzer::with_default_grammars(AnalysisConfig::default()).expect("default config is valid")
}

fn parser() -> SemanticParser {
    SemanticParser::new(Arc::new(GrammarRegistry::with_default_grammars()))
}

#[test]
fn identical_snapshots_produce_nothing() {
    let source = "class A:\n    def run(self):\n        return 1\n";
    let result = analyzer().analyze(Language::Python, source, source).unwrap();

    assert!(result.changes.is_empty());
    assert_eq!(result.classification.level, EntropyLevel::Minimal);
    assert!(result.errors.is_empty());
}

#[test]
fn whitespace_only_edits_are_not_changes() {
    let before = "def f():\n    return 1\n";
    let after = "def f():\n    return 1\n\n";
    let result = analyzer().analyze(Language::Python, before, after).unwrap();

    assert!(!result.has_changes());
    let metrics = &result.metrics;
    assert_eq!(metrics.additions + metrics.deletions + metrics.modifications, 0);
}

#[test]
fn trailing_blank_line_in_javascript_is_not_a_change() {
    let result = analyzer()
        .analyze(Language::JavaScript, "function f(){return 1;}", "function f(){return 1;}\n\n")
        .unwrap();
    assert!(!result.has_changes());
    assert!(result.metrics.total_entropy.abs() < f64::EPSILON);
}

#[test]
fn composed_and_decomposed_accents_differ() {
    let result = analyzer()
        .analyze(
            Language::JavaScript,
            "function f(){return \"\u{e9}\";}",
            "function f(){return \"e\u{301}\";}",
        )
        .unwrap();
    assert!(result.has_changes());
}

#[test]
fn change_ids_are_unique_within_one_result() {
    let before = "def a():\n    pass\n\ndef a():\n    return 1\n\nx = 1\nx = 2\n";
    let after = "def a():\n    return 2\n\nx = 3\n";
    let result = analyzer().analyze(Language::Python, before, after).unwrap();

    let mut ids: Vec<&str> = result.changes.iter().map(|c| c.change.node_id.as_str()).collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total);
}

#[test]
fn literal_edit_is_one_low_entropy_modification() {
    let result = analyzer()
        .analyze(Language::JavaScript, "function f(){return 1;}", "function f(){return 2;}")
        .unwrap();

    let changed: Vec<_> =
        result.changes.iter().filter(|c| c.change.change_type.is_change()).collect();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].change.node_name, "f");
    assert_eq!(changed[0].change.change_type, ChangeType::Modified);
    assert!(changed[0].entropy.normalized > 0.0);
    assert!(changed[0].entropy.level > EntropyLevel::Minimal);
    assert!(changed[0].entropy.level < EntropyLevel::Critical);
}

#[test]
fn new_function_in_empty_file_is_an_addition() {
    let result = analyzer().analyze(Language::Rust, "", "fn answer() -> u32 { 42 }").unwrap();

    assert_eq!(result.changes.len(), 1);
    let added = &result.changes[0].change;
    assert_eq!(added.change_type, ChangeType::Added);
    assert_eq!(added.node_id, "module/function:answer");
    assert!(added.before.is_none());
    assert!(added.after.is_some());
}

#[test]
fn rename_is_a_removal_and_an_addition() {
    let result = analyzer()
        .analyze(Language::Python, "def old():\n    pass\n", "def new():\n    pass\n")
        .unwrap();

    assert_eq!(result.metrics.additions, 1);
    assert_eq!(result.metrics.deletions, 1);
    assert_eq!(result.metrics.modifications, 0);
}

#[test]
fn syntax_errors_are_reported_not_fatal() {
    let result = analyzer()
        .analyze(Language::JavaScript, "function ok() {}", "function ok() {\n  let = ;\n")
        .unwrap();

    assert!(result.errors.before.is_empty());
    assert!(!result.errors.after.is_empty());
    assert!(result.errors.after[0].starts_with("line "));
}

#[test]
fn batch_keeps_input_order_and_summarizes() {
    let files: Vec<FileChange> = (0..8)
        .map(|i| FileChange {
            path: PathBuf::from(format!("src/file_{i}.py")),
            language: Language::Python,
            before: format!("def f{i}():\n    return {i}\n"),
            after: format!("def f{i}():\n    return {}\n", i + 1),
        })
        .collect();
    let expected: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();

    let outcomes = analyzer().analyze_batch(files, Some(3)).unwrap();
    let paths: Vec<PathBuf> = outcomes.iter().map(|o| o.path.clone()).collect();
    assert_eq!(paths, expected);

    let summary = AnalysisSummary::from_outcomes(&outcomes);
    assert_eq!(summary.files_analyzed, 8);
    assert_eq!(summary.files_failed, 0);
    assert_eq!(summary.modifications, 8);
    assert!(summary.top_files.len() <= 10);
}

#[test]
fn propagation_decays_geometrically_along_containment() {
    let source = "class Outer:\n    class Inner:\n        def deep(self):\n            return 1\n";
    let changed = source.replace("return 1", "return 2");
    let result = analyzer().analyze(Language::Python, source, &changed).unwrap();

    let seed = result
        .changes
        .iter()
        .find(|c| c.change.node_name == "deep" && c.change.change_type.is_change())
        .expect("the method changed");
    let propagation = result.propagation.as_ref().unwrap();

    // Enclosing nodes are seeds themselves, so compare paths from `deep` only
    for path in propagation.paths.iter().filter(|p| p.source == seed.change.node_id) {
        let distance = i32::try_from(path.distance).unwrap();
        let expected = seed.entropy.normalized * 0.5_f64.powi(distance);
        assert!((path.impact - expected).abs() < 1e-12);
        assert_eq!(path.path.len(), path.distance + 1);
    }
}

fn python_function(name: &str, body: &[u8]) -> String {
    let mut source = format!("def {name}():\n");
    for value in body {
        source.push_str(&format!("    x = {value}\n"));
    }
    source.push_str("    return x\n");
    source
}

proptest! {
    #[test]
    fn merkle_hashes_are_deterministic(
        name in "[a-z]{1,8}",
        body in prop::collection::vec(any::<u8>(), 1..6)
    ) {
        let parser = parser();
        let source = python_function(&name, &body);
        let first = parser.parse(&source, Language::Python, &ParseOptions::default()).unwrap();
        let second = parser.parse(&source, Language::Python, &ParseOptions::default()).unwrap();

        prop_assert_eq!(
            MerkleTree::build(&first.tree).root_hash(),
            MerkleTree::build(&second.tree).root_hash()
        );
    }

    #[test]
    fn normalized_entropy_stays_in_unit_interval(
        counts in prop::collection::vec(0.0f64..100.0, 1..20)
    ) {
        let total: f64 = counts.iter().sum();
        prop_assume!(total > 0.0);
        let distribution: Vec<f64> = counts.iter().map(|c| c / total).collect();
        let normalized = normalize_entropy(shannon_entropy(&distribution), distribution.len());
        prop_assert!((0.0..=1.0 + 1e-9).contains(&normalized));
    }

    #[test]
    fn flatter_distributions_have_more_entropy(
        weights in prop::collection::vec(1.0f64..10.0, 2..12)
    ) {
        let total: f64 = weights.iter().sum();
        let skewed: Vec<f64> = weights.iter().map(|w| w / total).collect();
        let uniform = vec![1.0 / weights.len() as f64; weights.len()];
        prop_assume!(skewed.iter().any(|p| (p - uniform[0]).abs() > 1e-6));
        prop_assert!(shannon_entropy(&uniform) > shannon_entropy(&skewed));
    }

    #[test]
    fn propagated_impact_never_exceeds_seed(decay in 0.05f64..1.0, edits in 1u8..4) {
        let before = python_function("f", &[0]);
        let after = python_function("f", &(0..edits).collect::<Vec<_>>());
        let config = AnalysisConfig {
            propagation: PropagationConfig { impact_decay: decay, ..PropagationConfig::default() },
            ..AnalysisConfig::default()
        };
        let analyzer = Analyzer::with_default_grammars(config).unwrap();
        let result = analyzer.analyze(Language::Python, &before, &after).unwrap();

        let max_seed = result.changes.iter().map(|c| c.entropy.normalized).fold(0.0, f64::max);
        for impact in result.propagation.unwrap().affected_nodes.values() {
            prop_assert!(*impact <= max_seed * decay + 1e-12);
        }
    }
}

#[test]
fn dependency_graph_links_both_snapshots() {
    let parser = parser();
    let options = ParseOptions::default();
    let before = parser.parse("def a():\n    pass\n", Language::Python, &options).unwrap();
    let after = parser.parse("def b():\n    pass\n", Language::Python, &options).unwrap();
    let (before, after) = (MerkleTree::build(&before.tree), MerkleTree::build(&after.tree));
    let graph = DependencyGraph::from_diff(&before, &after, &diff_trees(&before, &after));

    assert!(graph.contains("module/function:a"));
    assert!(graph.contains("module/function:b"));
    assert_eq!(graph.node_count(), 3);

    let tracker = PropagationTracker::new(PropagationConfig::default());
    assert!((tracker.impact_at(0.8, 2) - 0.2).abs() < 1e-12);
}
