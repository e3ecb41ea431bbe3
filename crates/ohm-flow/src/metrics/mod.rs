//! Current-flow centrality over a [`FlowGraph`](crate::graph::FlowGraph).
//!
//! - **Laplacian** (`laplacian`): weighted Laplacian plus the grounded
//!   solves the other modules share.
//! - **Current-flow betweenness** (`current_flow`): how much unit current
//!   each edge carries, summed over every node pair.
//! - **Selection** (`filter`): the edges of a result that directly connect a
//!   source to one of its sinks.
//!
//! ```rust,ignore
//! use ohm_flow::metrics::{CancelToken, CurrentFlowConfig, edge_current_flow_betweenness, select};
//!
//! let result = edge_current_flow_betweenness(&graph, &CurrentFlowConfig::default(), &CancelToken::new())?;
//! let picked = select(&result, 1, &[3, 4].into_iter().collect())?;
//! ```

pub mod current_flow;
pub mod filter;
pub mod laplacian;

pub use current_flow::{
    BetweennessResult, CancelToken, CurrentFlowConfig, EdgeScore, edge_current_flow_betweenness,
    max_score,
};
pub use filter::{FilteredResult, select};
