use super::Tree;
use crate::model::Node;
use std::collections::BTreeSet;

/// One source/destination pair judged equivalent by identical relative path.
#[derive(Debug, Clone)]
pub struct MatchedPair {
    pub source: Node,
    pub dest: Node,
}

/// Outcome of joining two trees on relative path.
///
/// Every list is sorted by path, so the same two snapshots always produce
/// byte-identical results.
#[derive(Debug, Default)]
pub struct MatchResult {
    pub matched: Vec<MatchedPair>,
    /// Source nodes with no node at their path on the destination.
    pub missing: Vec<Node>,
    /// Destination nodes with no node at their path on the source;
    /// informational, never blocks anything.
    pub unexpected: Vec<Node>,
    /// Source nodes sharing their path with a sibling in the source tree.
    pub duplicates_source: Vec<Node>,
    /// Destination nodes sharing their path with a sibling there.
    pub duplicates_dest: Vec<Node>,
}

impl MatchResult {
    pub fn has_anomalies(&self) -> bool {
        !self.missing.is_empty()
            || !self.duplicates_source.is_empty()
            || !self.duplicates_dest.is_empty()
    }
}

/// Join source tree S and destination tree D on relative path.
///
/// Per path: a unique node on both sides is a match; a path only in S is
/// missing; a path with multiple nodes on either side puts all candidates on
/// that side's duplicates list and matches nothing — ambiguous pairs are
/// never auto-applied, all candidates are reported for manual resolution.
/// A destination-side duplicate excludes the path from matching but does not
/// count the source node as missing (counterparts exist, they are just
/// ambiguous). Pure function; no side effects, deterministic output.
pub fn match_trees(source: &Tree, dest: &Tree) -> MatchResult {
    let mut result = MatchResult::default();

    let source_paths: BTreeSet<_> = source.paths().collect();
    for path in &source_paths {
        let s_nodes = source.nodes_at(path);
        let d_nodes = dest.nodes_at(path);

        if s_nodes.len() > 1 {
            result
                .duplicates_source
                .extend(s_nodes.iter().map(|n| (*n).clone()));
        }
        if d_nodes.len() > 1 {
            result
                .duplicates_dest
                .extend(d_nodes.iter().map(|n| (*n).clone()));
        }
        if s_nodes.len() > 1 || d_nodes.len() > 1 {
            continue;
        }

        match d_nodes.first() {
            Some(dest_node) => result.matched.push(MatchedPair {
                source: s_nodes[0].clone(),
                dest: (*dest_node).clone(),
            }),
            None => result.missing.push(s_nodes[0].clone()),
        }
    }

    let dest_only: BTreeSet<_> = dest
        .paths()
        .filter(|path| !source_paths.contains(path))
        .collect();
    for path in dest_only {
        let d_nodes = dest.nodes_at(path);
        if d_nodes.len() > 1 {
            result
                .duplicates_dest
                .extend(d_nodes.iter().map(|n| (*n).clone()));
        } else {
            result.unexpected.push(d_nodes[0].clone());
        }
    }

    result.matched.sort_by(|a, b| a.source.path.cmp(&b.source.path));
    result.missing.sort_by(|a, b| a.path.cmp(&b.path));
    result.unexpected.sort_by(|a, b| a.path.cmp(&b.path));
    result.duplicates_source.sort_by(|a, b| a.path.cmp(&b.path));
    result.duplicates_dest.sort_by(|a, b| a.path.cmp(&b.path));
    result
}
