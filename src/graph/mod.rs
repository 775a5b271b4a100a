//! Cycle detection across document references.
//!
//! Every time resolution follows a reference from one computation to another (a
//! child's effective model to its parent's lineage, a lineage to the grandparent's
//! lineage, an importer to the imported bundle's effective model) the edge is
//! recorded here. An edge that would let its target reach its own source again is
//! refused and reported with the full offending path, so a cyclic hierarchy is
//! detected the moment it closes instead of being walked forever.
//!
//! Nodes name the computation, not just the document: [`effective_node`] and
//! [`parent_node`] of the same location are different nodes. A root that imports a
//! bundle whose parent is the root itself is therefore not a cycle, since the
//! bundle only needs the root's lineage and never its effective model.
//!
//! The graph lives for a whole session and is shared by every task. Edges are
//! never removed; revisiting a document through a different path only re-adds an
//! edge that is already present, which is a no-op.

use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::core::PomrError;

const EFFECTIVE_PREFIX: &str = "effective:";
const PARENT_PREFIX: &str = "parent:";

/// Node of the effective-model computation of the document at `location`.
pub fn effective_node(location: &str) -> String {
    format!("{EFFECTIVE_PREFIX}{location}")
}

/// Node of the as-parent lineage computation of the document at `location`.
pub fn parent_node(location: &str) -> String {
    format!("{PARENT_PREFIX}{location}")
}

/// The document location of a node, for messages.
fn label(node: &str) -> &str {
    node.strip_prefix(EFFECTIVE_PREFIX)
        .or_else(|| node.strip_prefix(PARENT_PREFIX))
        .unwrap_or(node)
}

/// Render the ring `nodes` (without the closing repeat) starting at its smallest
/// node, so the same cycle always reads the same way.
fn canonical_chain(nodes: &[String]) -> String {
    let start = nodes
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map_or(0, |(index, _)| index);
    nodes[start..]
        .iter()
        .chain(&nodes[..start])
        .chain(nodes.get(start))
        .map(|node| label(node))
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[derive(Default)]
struct Inner {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl Inner {
    fn ensure_node(&mut self, node: &str) -> NodeIndex {
        if let Some(&index) = self.node_map.get(node) {
            index
        } else {
            let index = self.graph.add_node(node.to_string());
            self.node_map.insert(node.to_string(), index);
            index
        }
    }

    /// Shortest path `start ..= goal`, if `goal` is reachable.
    fn path(&self, start: NodeIndex, goal: NodeIndex) -> Option<Vec<NodeIndex>> {
        astar(&self.graph, start, |node| node == goal, |_| 1usize, |_| 0).map(|(_, path)| path)
    }
}

/// Directed edge ledger that refuses edges closing a cycle.
///
/// Node identities are plain strings, usually built with [`effective_node`] and
/// [`parent_node`]. The reachability check and the insertion happen under one lock, so two tasks adding
/// `a -> b` and `b -> a` concurrently cannot both succeed.
#[derive(Default)]
pub struct CycleGraph {
    inner: Mutex<Inner>,
}

impl CycleGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `from` references `to`.
    ///
    /// # Errors
    ///
    /// Returns [`PomrError::CycleDetected`] when `to` can already reach `from`
    /// (including `from == to`). The chain lists the document locations of the ring,
    /// starting and ending at its smallest node. A refused edge is not inserted.
    pub fn add_edge(&self, from: &str, to: &str) -> Result<(), PomrError> {
        if from == to {
            return Err(PomrError::CycleDetected {
                chain: canonical_chain(&[from.to_string()]),
            });
        }

        let mut inner = self.inner.lock().map_err(|_| PomrError::Other {
            message: "cycle graph lock poisoned".to_string(),
        })?;
        let from_idx = inner.ensure_node(from);
        let to_idx = inner.ensure_node(to);

        if inner.graph.contains_edge(from_idx, to_idx) {
            return Ok(());
        }

        if let Some(path) = inner.path(to_idx, from_idx) {
            // `to ..= from`; the refused edge closes the ring
            let ring: Vec<String> = path.into_iter().map(|index| inner.graph[index].clone()).collect();
            return Err(PomrError::CycleDetected {
                chain: canonical_chain(&ring),
            });
        }

        inner.graph.add_edge(from_idx, to_idx, ());
        Ok(())
    }

    /// Whether the edge has been recorded.
    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        let Ok(inner) = self.inner.lock() else {
            return false;
        };
        match (inner.node_map.get(from), inner.node_map.get(to)) {
            (Some(&a), Some(&b)) => inner.graph.contains_edge(a, b),
            _ => false,
        }
    }

    /// Number of recorded edges.
    pub fn edge_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.graph.edge_count()).unwrap_or_default()
    }
}
