#![forbid(unsafe_code)]
//! ohm-core library.
//!
//! # Conventions
//!
//! - **Errors**: every failure is a `thiserror` enum with a `code()` that
//!   maps onto [`error::ErrorCode`].
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod ingest;
pub mod lock;
pub mod store;
pub mod timing;

/// Integer node identifier. Nodes carry no other attributes.
pub type NodeId = i64;

pub use ingest::EdgeRecord;
