//! Source/sink selection over a [`BetweennessResult`].
//!
//! # Selection rule
//!
//! An edge `(u, v)` is selected if and only if (`u == source` or
//! `v == source`) AND (`u` is in `sinks` or `v` is in `sinks`).
//!
//! This is a direct-adjacency filter, not a path filter. Only edges directly
//! incident to `source` are ever returned; multi-hop paths toward sinks are
//! not traced. It also matches edges where both endpoints are in `sinks` and
//! one happens to equal `source`, and it excludes edges that touch a sink but
//! not the source. This is a deliberate (if narrow) design choice, not a bug
//! to "fix".

use std::collections::BTreeSet;

use ohm_core::NodeId;
use ohm_core::error::ValidationError;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::metrics::current_flow::{BetweennessResult, EdgeScore};

/// Edges selected for one `(source, sinks)` query, in the result's edge order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredResult {
    pub source: NodeId,
    pub sinks: BTreeSet<NodeId>,
    pub edges: Vec<EdgeScore>,
}

impl FilteredResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// The `{edge: "u-v", score}` records handed to callers.
    #[must_use]
    pub fn records(&self) -> &[EdgeScore] {
        &self.edges
    }
}

/// Select the edges of `result` that touch `source` and a sink.
///
/// # Errors
///
/// - [`ValidationError::NoSinks`] if `sinks` is empty.
/// - [`ValidationError::UnknownNode`] if `source` or a sink is not a node of
///   the graph that produced `result`.
#[instrument(skip(result, sinks), fields(sinks = sinks.len()))]
pub fn select(
    result: &BetweennessResult,
    source: NodeId,
    sinks: &BTreeSet<NodeId>,
) -> Result<FilteredResult, ValidationError> {
    if sinks.is_empty() {
        return Err(ValidationError::NoSinks);
    }
    if let Some(&unknown) = std::iter::once(&source)
        .chain(sinks)
        .find(|n| !result.contains_node(**n))
    {
        return Err(ValidationError::UnknownNode(unknown));
    }

    let edges: Vec<EdgeScore> = result
        .iter()
        .filter(|s| {
            s.edge.touches(source) && (sinks.contains(&s.edge.u()) || sinks.contains(&s.edge.v()))
        })
        .copied()
        .collect();
    debug!(selected = edges.len(), "edges selected");

    Ok(FilteredResult {
        source,
        sinks: sinks.clone(),
        edges,
    })
}
