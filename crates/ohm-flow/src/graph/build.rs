//! Weighted undirected graph construction from raw edge triples.
//!
//! # Overview
//!
//! [`FlowGraph::build`] turns a sequence of [`EdgeRecord`]s into a simple
//! undirected petgraph graph whose edge weights are conductances. Nodes are
//! created implicitly from the ids the edges reference.
//!
//! ## Rules
//!
//! - The sequence must be non-empty.
//! - `source == target` is rejected (no self-loops).
//! - Weights must be finite and strictly positive.
//! - `(u, v)` and `(v, u)` name the same edge; a later row overwrites the
//!   weight of an earlier one but keeps its position in edge order.
//!
//! Construction is all-or-nothing: any invalid row fails the whole build and
//! nothing is returned.
//!
//! ## Cache Invalidation
//!
//! [`FlowGraph::content_hash`] is a BLAKE3 hash of the canonical, sorted
//! edge set including weights. Two builds describing the same network hash
//! equal regardless of row order or duplicate rows.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use ohm_core::error::ValidationError;
use ohm_core::{EdgeRecord, NodeId};
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::{Bfs, EdgeRef};
use serde::{Serialize, Serializer};
use tracing::{debug, instrument};

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// An unordered pair of distinct nodes, stored with `u < v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    u: NodeId,
    v: NodeId,
}

impl Edge {
    /// Canonicalize `(a, b)` so the smaller id comes first.
    #[must_use]
    pub const fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b {
            Self { u: a, v: b }
        } else {
            Self { u: b, v: a }
        }
    }

    #[must_use]
    pub const fn u(self) -> NodeId {
        self.u
    }

    #[must_use]
    pub const fn v(self) -> NodeId {
        self.v
    }

    /// Returns `true` if `node` is one of the endpoints.
    #[must_use]
    pub const fn touches(self, node: NodeId) -> bool {
        self.u == node || self.v == node
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.u, self.v)
    }
}

impl Serialize for Edge {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// FlowGraph
// ---------------------------------------------------------------------------

/// A validated, immutable, weighted undirected graph.
///
/// Node order (petgraph index order) is first-appearance order in the input;
/// edge order is first-insertion order of each unordered pair.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    graph: UnGraph<NodeId, f64>,
    node_map: HashMap<NodeId, NodeIndex>,
    content_hash: String,
}

impl FlowGraph {
    /// Build a [`FlowGraph`] from raw edge rows.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptyEdgeList`] for an empty sequence.
    /// - [`ValidationError::SelfLoop`] for a row with `source == target`.
    /// - [`ValidationError::InvalidWeight`] for a non-finite or non-positive
    ///   weight.
    #[instrument(skip(edges), fields(rows = edges.len()))]
    pub fn build(edges: &[EdgeRecord]) -> Result<Self, ValidationError> {
        if edges.is_empty() {
            return Err(ValidationError::EmptyEdgeList);
        }

        let mut graph = UnGraph::<NodeId, f64>::with_capacity(edges.len() + 1, edges.len());
        let mut node_map: HashMap<NodeId, NodeIndex> = HashMap::new();
        let mut overwritten = 0usize;

        for rec in edges {
            if rec.source == rec.target {
                return Err(ValidationError::SelfLoop(rec.source));
            }
            if !rec.weight.is_finite() || rec.weight <= 0.0 {
                return Err(ValidationError::InvalidWeight {
                    u: rec.source,
                    v: rec.target,
                    weight: rec.weight,
                });
            }

            let a = *node_map
                .entry(rec.source)
                .or_insert_with(|| graph.add_node(rec.source));
            let b = *node_map
                .entry(rec.target)
                .or_insert_with(|| graph.add_node(rec.target));

            // find_edge on an undirected graph matches either orientation.
            if let Some(existing) = graph.find_edge(a, b) {
                graph[existing] = rec.weight;
                overwritten += 1;
            } else {
                graph.add_edge(a, b, rec.weight);
            }
        }

        let content_hash = compute_edge_hash(&graph);
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            overwritten,
            "graph built"
        );

        Ok(Self {
            graph,
            node_map,
            content_hash,
        })
    }

    /// Return the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Return the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// The node set.
    #[must_use]
    pub fn nodes(&self) -> BTreeSet<NodeId> {
        self.graph.node_weights().copied().collect()
    }

    /// Node ids in petgraph index order (index `i` ↔ position `i`).
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_weights().copied()
    }

    /// All edges as `(u, v, weight)` with `u < v`, in edge order.
    #[must_use]
    pub fn edges(&self) -> Vec<(NodeId, NodeId, f64)> {
        self.weighted_edges()
            .map(|(edge, w)| (edge.u(), edge.v(), w))
            .collect()
    }

    /// Iterate `(Edge, weight)` in edge order.
    pub fn weighted_edges(&self) -> impl Iterator<Item = (Edge, f64)> + '_ {
        self.graph.edge_references().map(|e| {
            (
                Edge::new(self.graph[e.source()], self.graph[e.target()]),
                *e.weight(),
            )
        })
    }

    /// The edge list as ingestion records, suitable for persisting and
    /// rebuilding an identical graph.
    #[must_use]
    pub fn to_records(&self) -> Vec<EdgeRecord> {
        self.weighted_edges()
            .map(|(edge, w)| EdgeRecord::new(edge.u(), edge.v(), w))
            .collect()
    }

    #[must_use]
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.node_map.contains_key(&node)
    }

    /// Look up the `NodeIndex` for a node id.
    #[must_use]
    pub fn node_index(&self, node: NodeId) -> Option<NodeIndex> {
        self.node_map.get(&node).copied()
    }

    /// Conductance of the edge between `a` and `b`, in either order.
    #[must_use]
    pub fn weight(&self, a: NodeId, b: NodeId) -> Option<f64> {
        let edge = self.find_edge(a, b)?;
        self.graph.edge_weight(edge).copied()
    }

    /// Number of edges incident to `node`, or `None` if the node is absent.
    #[must_use]
    pub fn degree(&self, node: NodeId) -> Option<usize> {
        let idx = self.node_index(node)?;
        Some(self.graph.edges(idx).count())
    }

    /// Returns `true` when a breadth-first traversal from the first node
    /// reaches every node. An empty graph is not connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        let Some(start) = self.graph.node_indices().next() else {
            return false;
        };

        let mut bfs = Bfs::new(&self.graph, start);
        let mut reached = 0usize;
        while bfs.next(&self.graph).is_some() {
            reached += 1;
        }
        reached == self.graph.node_count()
    }

    /// BLAKE3 content hash of the canonical edge set.
    #[must_use]
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Borrow the underlying petgraph graph (node weights are ids, edge
    /// weights are conductances).
    #[must_use]
    pub const fn graph(&self) -> &UnGraph<NodeId, f64> {
        &self.graph
    }

    fn find_edge(&self, a: NodeId, b: NodeId) -> Option<EdgeIndex> {
        let ia = self.node_index(a)?;
        let ib = self.node_index(b)?;
        self.graph.find_edge(ia, ib)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn compute_edge_hash(graph: &UnGraph<NodeId, f64>) -> String {
    let mut canonical: Vec<(Edge, u64)> = graph
        .edge_references()
        .map(|e| {
            (
                Edge::new(graph[e.source()], graph[e.target()]),
                e.weight().to_bits(),
            )
        })
        .collect();
    canonical.sort_unstable();

    let mut hasher = blake3::Hasher::new();
    for (edge, bits) in canonical {
        hasher.update(&edge.u().to_le_bytes());
        hasher.update(&edge.v().to_le_bytes());
        hasher.update(&bits.to_le_bytes());
    }
    format!("blake3:{}", hasher.finalize().to_hex())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
