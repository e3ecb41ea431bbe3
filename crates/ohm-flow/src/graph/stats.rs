//! Summary statistics for a [`FlowGraph`].
//!
//! # Statistics Provided
//!
//! - **node_count** / **edge_count**: sizes of the node and edge sets.
//! - **density**: `2m / (n(n-1))` for an undirected simple graph. Zero for
//!   graphs with fewer than two nodes.
//! - **total_weight**: sum of all conductances.
//! - **max_degree**: the largest number of edges incident to one node.
//! - **most_connected_node**: the node with that degree, ties broken toward
//!   the smallest id.
//! - **connected**: whether every node is reachable from every other.

use std::collections::BTreeMap;

use ohm_core::NodeId;
use serde::Serialize;

use crate::graph::build::FlowGraph;

/// Summary statistics for a weighted undirected graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub total_weight: f64,
    pub max_degree: usize,
    pub most_connected_node: Option<NodeId>,
    pub connected: bool,
    pub content_hash: String,
}

impl GraphStats {
    /// Compute statistics for `graph`.
    #[must_use]
    pub fn from_graph(graph: &FlowGraph) -> Self {
        let node_count = graph.node_count();
        let edge_count = graph.edge_count();

        #[allow(clippy::cast_precision_loss)]
        let density = if node_count < 2 {
            0.0
        } else {
            let n = node_count as f64;
            2.0 * edge_count as f64 / (n * (n - 1.0))
        };

        let total_weight = graph.weighted_edges().map(|(_, w)| w).sum();
        let degrees = degrees(graph);
        let max_degree = degrees.values().copied().max().unwrap_or(0);

        Self {
            node_count,
            edge_count,
            density,
            total_weight,
            max_degree,
            most_connected_node: most_connected_in(&degrees),
            connected: graph.is_connected(),
            content_hash: graph.content_hash().to_string(),
        }
    }
}

/// Degree (number of incident edges) of every node, keyed by id.
#[must_use]
pub fn degrees(graph: &FlowGraph) -> BTreeMap<NodeId, usize> {
    let mut out: BTreeMap<NodeId, usize> = graph.node_ids().map(|id| (id, 0)).collect();
    for (edge, _) in graph.weighted_edges() {
        *out.entry(edge.u()).or_default() += 1;
        *out.entry(edge.v()).or_default() += 1;
    }
    out
}

/// The node with the greatest number of incident edges; ties go to the
/// smallest id. `None` only for a graph without nodes.
#[must_use]
pub fn most_connected_node(graph: &FlowGraph) -> Option<NodeId> {
    most_connected_in(&degrees(graph))
}

fn most_connected_in(degrees: &BTreeMap<NodeId, usize>) -> Option<NodeId> {
    // BTreeMap iterates ascending, so a strict `>` keeps the smallest id on ties.
    let mut best: Option<(NodeId, usize)> = None;
    for (&node, &degree) in degrees {
        if best.is_none_or(|(_, d)| degree > d) {
            best = Some((node, degree));
        }
    }
    best.map(|(node, _)| node)
}
