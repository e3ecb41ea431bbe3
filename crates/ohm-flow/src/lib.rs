#![forbid(unsafe_code)]
//! ohm-flow library.
//!
//! # Conventions
//!
//! - **Errors**: domain failures are the `ohm_core::error` enums; nothing here
//!   panics on bad input.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod graph;
pub mod metrics;
pub mod report;
pub mod session;

pub use graph::{Edge, FlowGraph, GraphStats};
pub use metrics::{
    BetweennessResult, CancelToken, CurrentFlowConfig, EdgeScore, FilteredResult,
    edge_current_flow_betweenness, max_score, select,
};
pub use session::AnalysisSession;
