//! Weighted undirected graph for current-flow analysis.
//!
//! # Overview
//!
//! This module owns the validated network every analysis runs on. Edge
//! weights are conductances: higher weight means current passes more freely.
//!
//! ## Pipeline
//!
//! ```text
//! CSV rows (ohm_core::ingest)
//!        ↓  build::FlowGraph::build()
//! FlowGraph (simple, undirected, weights > 0)
//!        ↓  stats::GraphStats::from_graph()
//! GraphStats (density, total weight, most connected node, …)
//! ```
//!
//! ## Typical Usage
//!
//! ```rust,ignore
//! use ohm_core::ingest::read_edges_from_path;
//! use ohm_flow::graph::{FlowGraph, GraphStats};
//!
//! let rows = read_edges_from_path("edges.csv".as_ref())?;
//! let graph = FlowGraph::build(&rows)?;
//! let stats = GraphStats::from_graph(&graph);
//! println!("nodes={} edges={} connected={}",
//!     stats.node_count, stats.edge_count, stats.connected);
//! ```

pub mod build;
pub mod stats;

pub use build::{Edge, FlowGraph};
pub use stats::{GraphStats, most_connected_node};
