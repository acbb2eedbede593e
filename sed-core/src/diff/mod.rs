//! Tree differ
//!
//! Compares two merkle trees top-down. Children of matched parents are
//! paired by `(type, name)`; when a key has several candidates on either
//! side they are ranked by structural-hash Hamming distance, then line
//! distance, then ordinal distance within the key. Exact ties on a shared
//! endpoint are never guessed: every node involved is reported as removed
//! or added.
//!
//! Equal merkle hashes prove a subtree unchanged, so it is reported once and
//! not descended. The module root stands for the file itself and is never
//! reported.
//!
//! Ids are paths within one snapshot, so the same id can name unrelated
//! nodes on the two sides. The differ therefore keys every before node: a
//! matched node takes the id of its after counterpart, and a removed node
//! keeps its own id unless the after tree uses it, in which case it is
//! qualified with [`BEFORE_PREFIX`]. Keys are unique across both trees.

use crate::merkle::MerkleTree;
use crate::models::change::{Change, NodeSnapshot};
use crate::models::semantic_nodes::NodeType;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Qualifier for removed nodes whose path is reused by the after tree
pub const BEFORE_PREFIX: &str = "before:";

/// Ranking of a candidate pair; lower is better
type MatchScore = (u32, usize, usize);

/// Changes between two trees plus the key of every before node
#[derive(Debug, Clone, PartialEq)]
pub struct TreeDiff {
    pub changes: Vec<Change>,
    /// Key of each before-tree node, by arena index
    pub before_keys: Vec<String>,
}

/// Diff two merkle trees into a flat change list
pub fn diff(before: &MerkleTree, after: &MerkleTree) -> Vec<Change> {
    diff_trees(before, after).changes
}

/// Diff two merkle trees, keeping the before-node keys
pub fn diff_trees(before: &MerkleTree, after: &MerkleTree) -> TreeDiff {
    let mut differ = TreeDiffer {
        before,
        after,
        after_ids: after.nodes().iter().map(|n| n.semantic.id.as_str()).collect(),
        before_keys: vec![None; before.len()],
        changes: Vec::new(),
    };

    if before.root_hash() == after.root_hash() {
        tracing::debug!(root = %after.root_hash().short(), "merkle roots match, skipping diff");
        differ.key_identical(MerkleTree::ROOT, MerkleTree::ROOT);
    } else {
        differ.run();
        tracing::debug!(changes = differ.changes.len(), "diffed trees");
    }
    differ.finish()
}

struct TreeDiffer<'a> {
    before: &'a MerkleTree,
    after: &'a MerkleTree,
    after_ids: HashSet<&'a str>,
    before_keys: Vec<Option<String>>,
    changes: Vec<Change>,
}

impl TreeDiffer<'_> {
    fn run(&mut self) {
        self.before_keys[MerkleTree::ROOT] = Some(self.after.root().semantic.id.clone());
        let mut pending = VecDeque::from([(MerkleTree::ROOT, MerkleTree::ROOT)]);

        while let Some((b, a)) = pending.pop_front() {
            let (pairs, removed, added) = self.match_children(b, a);

            for (bc, ac) in pairs {
                let (before_node, after_node) = (&self.before.nodes()[bc], &self.after.nodes()[ac]);
                self.changes.push(Change::matched(
                    after_node,
                    NodeSnapshot::from_node(before_node, self.before.child_shapes(bc)),
                    NodeSnapshot::from_node(after_node, self.after.child_shapes(ac)),
                ));
                if before_node.merkle_hash == after_node.merkle_hash {
                    self.key_identical(bc, ac);
                } else {
                    self.before_keys[bc] = Some(after_node.semantic.id.clone());
                    pending.push_back((bc, ac));
                }
            }

            for index in removed {
                for node in self.before.subtree(index) {
                    let merkle = &self.before.nodes()[node];
                    let key = self.removed_key(&merkle.semantic.id);
                    let snapshot = NodeSnapshot::from_node(merkle, self.before.child_shapes(node));
                    let mut change = Change::removed(merkle, snapshot);
                    change.node_id.clone_from(&key);
                    self.before_keys[node] = Some(key);
                    self.changes.push(change);
                }
            }

            for index in added {
                for node in self.after.subtree(index) {
                    let merkle = &self.after.nodes()[node];
                    let snapshot = NodeSnapshot::from_node(merkle, self.after.child_shapes(node));
                    self.changes.push(Change::added(merkle, snapshot));
                }
            }
        }
    }

    /// Key two subtrees with equal merkle hashes node by node
    fn key_identical(&mut self, b: usize, a: usize) {
        for (bn, an) in self.before.subtree(b).into_iter().zip(self.after.subtree(a)) {
            self.before_keys[bn] = Some(self.after.nodes()[an].semantic.id.clone());
        }
    }

    fn removed_key(&self, id: &str) -> String {
        if self.after_ids.contains(id) {
            format!("{BEFORE_PREFIX}{id}")
        } else {
            id.to_string()
        }
    }

    fn finish(self) -> TreeDiff {
        let before_keys = self
            .before_keys
            .into_iter()
            .zip(self.before.nodes())
            .map(|(key, node)| {
                key.unwrap_or_else(|| format!("{BEFORE_PREFIX}{}", node.semantic.id))
            })
            .collect();
        TreeDiff {
            changes: self.changes,
            before_keys,
        }
    }

    /// Pair the children of two matched nodes. Returns matched pairs in
    /// after-tree order, then unmatched before and after children.
    fn match_children(&self, b: usize, a: usize) -> (Vec<(usize, usize)>, Vec<usize>, Vec<usize>) {
        let mut groups: BTreeMap<(NodeType, &str), (Vec<usize>, Vec<usize>)> = BTreeMap::new();
        for &child in self.before.children(b) {
            let node = &self.before.nodes()[child].semantic;
            groups.entry((node.node_type, node.name.as_str())).or_default().0.push(child);
        }
        for &child in self.after.children(a) {
            let node = &self.after.nodes()[child].semantic;
            groups.entry((node.node_type, node.name.as_str())).or_default().1.push(child);
        }

        let mut pairs = Vec::new();
        for (candidates_before, candidates_after) in groups.values() {
            pairs.extend(self.assign(candidates_before, candidates_after));
        }
        pairs.sort_by_key(|&(_, ac)| ac);

        let removed = self
            .before
            .children(b)
            .iter()
            .copied()
            .filter(|c| !pairs.iter().any(|&(bc, _)| bc == *c))
            .collect();
        let added = self
            .after
            .children(a)
            .iter()
            .copied()
            .filter(|c| !pairs.iter().any(|&(_, ac)| ac == *c))
            .collect();

        (pairs, removed, added)
    }

    /// Resolve candidates sharing one key
    fn assign(&self, before: &[usize], after: &[usize]) -> Vec<(usize, usize)> {
        if let ([b], [a]) = (before, after) {
            return vec![(*b, *a)];
        }

        let mut scored: Vec<(MatchScore, usize, usize)> =
            Vec::with_capacity(before.len() * after.len());
        for (bo, &b) in before.iter().enumerate() {
            for (ao, &a) in after.iter().enumerate() {
                scored.push((self.score(b, a, bo.abs_diff(ao)), b, a));
            }
        }
        scored.sort_unstable();

        // Endpoints that are matched or blocked by a tie
        let mut taken_before = HashSet::new();
        let mut taken_after = HashSet::new();
        let mut pairs = Vec::new();

        for run in scored.chunk_by(|x, y| x.0 == y.0) {
            let open: Vec<(usize, usize)> = run
                .iter()
                .filter(|(_, b, a)| !taken_before.contains(b) && !taken_after.contains(a))
                .map(|&(_, b, a)| (b, a))
                .collect();

            for &(b, a) in &open {
                let tied = open.iter().filter(|(ob, oa)| *ob == b || *oa == a).count() > 1;
                taken_before.insert(b);
                taken_after.insert(a);
                if !tied {
                    pairs.push((b, a));
                }
            }
        }

        if pairs.len() < before.len().min(after.len()) {
            tracing::trace!(
                candidates = before.len() + after.len(),
                matched = pairs.len(),
                "ambiguous candidates left unmatched"
            );
        }
        pairs
    }

    fn score(&self, b: usize, a: usize, ordinal_distance: usize) -> MatchScore {
        let (before, after) = (&self.before.nodes()[b], &self.after.nodes()[a]);
        (
            before.structural_hash.hamming_distance(&after.structural_hash),
            before.semantic.range.start_line.abs_diff(after.semantic.range.start_line),
            ordinal_distance,
        )
    }
}
