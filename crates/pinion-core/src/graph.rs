//! Dependency graph keyed by coordinate value.
//!
//! Adjacency is stored in ordered maps so that iteration, and everything
//! derived from it (lock output, error messages), is deterministic.

use crate::coords::Coordinates;
use crate::error::ResolveError;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<Coordinates, BTreeSet<Coordinates>>,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_edges(edges: impl IntoIterator<Item = (Coordinates, Coordinates)>) -> Self {
        let mut graph = Self::new();
        for (from, to) in edges {
            graph.add_edge(from, to);
        }
        graph
    }

    /// Insert a node with no edges. Inserting an existing node is a no-op.
    pub fn add_node(&mut self, node: Coordinates) {
        self.edges.entry(node).or_default();
    }

    /// Insert an edge, creating both endpoints as needed.
    pub fn add_edge(&mut self, from: Coordinates, to: Coordinates) {
        self.edges.entry(to.clone()).or_default();
        self.edges.entry(from).or_default().insert(to);
    }

    #[must_use]
    pub fn contains(&self, node: &Coordinates) -> bool {
        self.edges.contains_key(node)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// All nodes in sorted order.
    pub fn nodes(&self) -> impl Iterator<Item = &Coordinates> {
        self.edges.keys()
    }

    /// Direct dependencies of a node, in sorted order.
    pub fn successors<'a>(&'a self, node: &Coordinates) -> impl Iterator<Item = &'a Coordinates> {
        self.edges.get(node).into_iter().flatten()
    }

    /// Nodes that depend directly on `node`, in sorted order.
    ///
    /// The iterator owns its key, so it outlives the `node` borrow.
    pub fn predecessors<'a>(
        &'a self,
        node: &Coordinates,
    ) -> impl Iterator<Item = &'a Coordinates> {
        let node = node.clone();
        self.edges
            .iter()
            .filter_map(move |(from, to)| to.contains(&node).then_some(from))
    }

    /// Walk predecessors up to a root, for "who requested this" reporting.
    /// Returns the chain root-first, ending at the direct parent of
    /// `target`. An empty chain means `target` is itself a root.
    #[must_use]
    pub fn request_chain(&self, target: &Coordinates) -> Vec<Coordinates> {
        let mut chain = Vec::new();
        let mut seen = BTreeSet::new();
        let mut current = target.clone();
        while let Some(parent) = self.predecessors(&current).next().cloned() {
            if !seen.insert(parent.clone()) {
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Reject cycles that span more than one `group:artifact`.
    ///
    /// Cycles confined to a single artifact (version or classifier variants
    /// of the same `group:artifact` referring to each other) are tolerated;
    /// anything wider is a descriptor bug and aborts the run.
    pub fn check_cycles(&self) -> Result<(), ResolveError> {
        let mut visited = BTreeSet::new();
        let mut stack = Vec::new();
        let mut on_stack = BTreeSet::new();
        for node in self.edges.keys() {
            if !visited.contains(node) {
                self.visit(node, &mut visited, &mut stack, &mut on_stack)?;
            }
        }
        Ok(())
    }

    fn visit(
        &self,
        node: &Coordinates,
        visited: &mut BTreeSet<Coordinates>,
        stack: &mut Vec<Coordinates>,
        on_stack: &mut BTreeSet<Coordinates>,
    ) -> Result<(), ResolveError> {
        visited.insert(node.clone());
        on_stack.insert(node.clone());
        stack.push(node.clone());
        for next in self.successors(node) {
            if on_stack.contains(next) {
                let start = stack.iter().position(|c| c == next).unwrap_or(0);
                let mut cycle: Vec<Coordinates> = stack[start..].to_vec();
                cycle.push(next.clone());
                if !cycle_within_single_artifact(&cycle) {
                    return Err(ResolveError::IllegalCycle { path: cycle });
                }
            } else if !visited.contains(next) {
                self.visit(next, visited, stack, on_stack)?;
            }
        }
        stack.pop();
        on_stack.remove(node);
        Ok(())
    }
}

fn cycle_within_single_artifact(cycle: &[Coordinates]) -> bool {
    let Some(first) = cycle.first() else {
        return true;
    };
    cycle.iter().all(|c| c.same_artifact(first))
}
