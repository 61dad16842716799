//! Version consolidation across the resolved graph.
//!
//! A raw graph may carry several versions of one `group:artifact`. This
//! pass partitions nodes by consolidation key, picks one winning version
//! per key (explicitly requested versions first, otherwise the highest),
//! and rebuilds the graph with every loser rewritten to the winner.

use crate::coords::Coordinates;
use crate::graph::DependencyGraph;
use crate::version;
use std::collections::{BTreeMap, BTreeSet};

/// A version rewrite applied during consolidation: `requested` was asked
/// for somewhere in the graph, `resolved` is what the final graph carries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Conflict {
    pub resolved: Coordinates,
    pub requested: Coordinates,
}

/// Consolidate `raw` to one version per key.
///
/// `requested` lists the explicitly requested coordinates; when a key has
/// an explicit request whose version is present in the partition, that
/// version wins regardless of ordering (first declaration wins if several
/// explicit requests share a key).
#[must_use]
pub fn reconcile(
    raw: &DependencyGraph,
    requested: &[Coordinates],
) -> (DependencyGraph, BTreeSet<Conflict>) {
    let mut partitions: BTreeMap<String, Vec<&Coordinates>> = BTreeMap::new();
    for node in raw.nodes() {
        partitions.entry(node.as_key()).or_default().push(node);
    }

    let mut winners: BTreeMap<String, String> = BTreeMap::new();
    for (key, nodes) in &partitions {
        let explicit = requested
            .iter()
            .find(|r| &r.as_key() == key && nodes.iter().any(|n| n.version() == r.version()));
        let version = match explicit {
            Some(r) => r.version().to_string(),
            None => nodes
                .iter()
                .map(|n| n.version())
                .max_by(|a, b| version::compare(a, b))
                .unwrap_or_default()
                .to_string(),
        };
        winners.insert(key.clone(), version);
    }

    let mut replacements: BTreeMap<Coordinates, Coordinates> = BTreeMap::new();
    let mut conflicts: BTreeSet<Conflict> = BTreeSet::new();
    for node in raw.nodes() {
        let Some(winner) = winners.get(&node.as_key()) else {
            continue;
        };
        if node.version() != winner {
            let replacement = node.with_version(winner.clone());
            conflicts.insert(Conflict {
                resolved: replacement.clone(),
                requested: node.clone(),
            });
            replacements.insert(node.clone(), replacement);
        }
    }

    let mut rebuilt = DependencyGraph::new();
    for node in raw.nodes() {
        rebuilt.add_node(replacements.get(node).unwrap_or(node).clone());
    }
    for from in raw.nodes() {
        let mapped_from = replacements.get(from).unwrap_or(from);
        for to in raw.successors(from) {
            let mapped_to = replacements.get(to).unwrap_or(to);
            // An edge collapsed onto itself by the rewrite disappears;
            // a self-edge present in the raw graph survives.
            if mapped_from == mapped_to && from != to {
                continue;
            }
            rebuilt.add_edge(mapped_from.clone(), mapped_to.clone());
        }
    }

    (rebuilt, conflicts)
}
