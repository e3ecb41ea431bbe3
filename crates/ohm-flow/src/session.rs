//! Analysis session: the one graph every caller works against.
//!
//! The session owns a replaceable slot holding an immutable [`FlowGraph`]
//! snapshot. Replacing the graph takes the write lock; every computation
//! clones the current `Arc` under the read lock and releases it before any
//! numerical work, so a computation never observes a half-replaced graph and
//! a slow solve never blocks a replacement.
//!
//! Scores are cached per graph content hash. A replacement with identical
//! content keeps the cache warm; any other graph misses and recomputes.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use ohm_core::error::{AnalysisError, ValidationError};
use ohm_core::{EdgeRecord, NodeId};
use tracing::{debug, info, instrument};

use crate::graph::{FlowGraph, most_connected_node};
use crate::metrics::{
    BetweennessResult, CancelToken, CurrentFlowConfig, FilteredResult,
    edge_current_flow_betweenness, max_score, select,
};
use crate::report::ReportSummary;

#[derive(Debug)]
struct CachedScores {
    content_hash: String,
    config: CurrentFlowConfig,
    result: Arc<BetweennessResult>,
}

/// Coordinates build, compute and select over a shared graph slot.
#[derive(Debug, Default)]
pub struct AnalysisSession {
    slot: RwLock<Option<Arc<FlowGraph>>>,
    cache: Mutex<Option<CachedScores>>,
    config: CurrentFlowConfig,
    cancel: CancelToken,
}

impl AnalysisSession {
    #[must_use]
    pub fn new(config: CurrentFlowConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn config(&self) -> &CurrentFlowConfig {
        &self.config
    }

    /// A handle that cancels in-flight and future computations of this
    /// session until [`CancelToken::reset`] is called.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Validate `edges` and, only on success, make the result the current
    /// graph. A failed build leaves the previous graph in place.
    ///
    /// # Errors
    ///
    /// Any [`ValidationError`] raised by [`FlowGraph::build`].
    #[instrument(skip(self, edges), fields(rows = edges.len()))]
    pub fn build(&self, edges: &[EdgeRecord]) -> Result<Arc<FlowGraph>, ValidationError> {
        let graph = FlowGraph::build(edges)?;
        Ok(self.replace(graph))
    }

    /// Install an already-built graph as the current snapshot.
    pub fn replace(&self, graph: FlowGraph) -> Arc<FlowGraph> {
        let graph = Arc::new(graph);
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::clone(&graph));
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            hash = graph.content_hash(),
            "session graph replaced"
        );
        graph
    }

    /// The current graph, if one has been built.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<FlowGraph>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The current graph.
    ///
    /// # Errors
    ///
    /// [`ValidationError::NoGraphLoaded`] before the first successful build.
    pub fn require_snapshot(&self) -> Result<Arc<FlowGraph>, ValidationError> {
        self.snapshot().ok_or(ValidationError::NoGraphLoaded)
    }

    /// Edge betweenness for the current graph, served from the cache when
    /// the graph content and configuration are unchanged.
    ///
    /// # Errors
    ///
    /// [`ValidationError::NoGraphLoaded`] without a graph, otherwise any
    /// [`ComputationError`](ohm_core::error::ComputationError).
    pub fn compute(&self) -> Result<Arc<BetweennessResult>, AnalysisError> {
        let graph = self.require_snapshot()?;
        self.compute_for(&graph)
    }

    fn compute_for(&self, graph: &FlowGraph) -> Result<Arc<BetweennessResult>, AnalysisError> {
        if let Some(hit) = self.cached(graph.content_hash()) {
            debug!("betweenness cache hit");
            return Ok(hit);
        }

        let result = Arc::new(edge_current_flow_betweenness(
            graph,
            &self.config,
            &self.cancel,
        )?);

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        *cache = Some(CachedScores {
            content_hash: graph.content_hash().to_string(),
            config: self.config,
            result: Arc::clone(&result),
        });
        Ok(result)
    }

    fn cached(&self, content_hash: &str) -> Option<Arc<BetweennessResult>> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .as_ref()
            .filter(|c| c.content_hash == content_hash && c.config == self.config)
            .map(|c| Arc::clone(&c.result))
    }

    /// Compute, then select the edges touching `source` and a sink.
    ///
    /// # Errors
    ///
    /// See [`compute`](Self::compute) and [`select`].
    #[instrument(skip(self, sinks))]
    pub fn calculate(
        &self,
        source: NodeId,
        sinks: &BTreeSet<NodeId>,
    ) -> Result<FilteredResult, AnalysisError> {
        if sinks.is_empty() {
            return Err(ValidationError::NoSinks.into());
        }
        let graph = self.require_snapshot()?;
        // Reject unknown nodes before the solve.
        if let Some(&unknown) = std::iter::once(&source)
            .chain(sinks)
            .find(|n| !graph.contains_node(**n))
        {
            return Err(ValidationError::UnknownNode(unknown).into());
        }

        let result = self.compute_for(&graph)?;
        Ok(select(&result, source, sinks)?)
    }

    /// Headline figures for a report on the current graph.
    ///
    /// # Errors
    ///
    /// See [`compute`](Self::compute).
    pub fn summary(&self) -> Result<ReportSummary, AnalysisError> {
        let graph = self.require_snapshot()?;
        let result = self.compute_for(&graph)?;
        Ok(ReportSummary {
            highest_score: max_score(&result),
            most_connected_node: most_connected_node(&graph),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ohm_core::error::ComputationError;

    fn records(edges: &[(NodeId, NodeId, f64)]) -> Vec<EdgeRecord> {
        edges.iter().copied().map(EdgeRecord::from).collect()
    }

    #[test]
    fn compute_without_graph_is_a_validation_error() {
        let session = AnalysisSession::default();
        let err = session.compute().expect_err("no graph");
        assert!(matches!(
            err,
            AnalysisError::Validation(ValidationError::NoGraphLoaded)
        ));
    }

    #[test]
    fn failed_build_keeps_previous_graph() {
        let session = AnalysisSession::default();
        let first = session.build(&records(&[(1, 2, 1.0), (2, 3, 1.0)])).expect("valid");

        let err = session.build(&records(&[(1, 1, 2.0)])).expect_err("self-loop");
        assert_eq!(err, ValidationError::SelfLoop(1));

        let current = session.snapshot().expect("still loaded");
        assert!(Arc::ptr_eq(&first, &current));
    }

    #[test]
    fn repeated_compute_hits_cache() {
        let session = AnalysisSession::default();
        session.build(&records(&[(1, 2, 1.0), (2, 3, 1.0)])).expect("valid");

        let a = session.compute().expect("computes");
        let b = session.compute().expect("computes");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn replacement_invalidates_cache() {
        let session = AnalysisSession::default();
        session.build(&records(&[(1, 2, 1.0), (2, 3, 1.0)])).expect("valid");
        let before = session.compute().expect("computes");

        session
            .build(&records(&[(1, 2, 1.0), (2, 3, 1.0), (1, 3, 1.0)]))
            .expect("valid");
        let after = session.compute().expect("computes");
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.len(), 3);
    }

    #[test]
    fn calculate_reports_unknown_node_before_solving() {
        let session = AnalysisSession::default();
        session.build(&records(&[(1, 2, 1.0), (3, 4, 1.0)])).expect("valid");

        // Disconnected, but the unknown sink is reported first.
        let err = session
            .calculate(1, &[99].into_iter().collect())
            .expect_err("unknown");
        assert!(matches!(
            err,
            AnalysisError::Validation(ValidationError::UnknownNode(99))
        ));

        let err = session
            .calculate(1, &[2].into_iter().collect())
            .expect_err("disconnected");
        assert!(matches!(
            err,
            AnalysisError::Computation(ComputationError::Disconnected)
        ));
    }

    #[test]
    fn cancelled_session_refuses_to_compute() {
        let session = AnalysisSession::default();
        session.build(&records(&[(1, 2, 1.0), (2, 3, 1.0)])).expect("valid");
        session.cancel_token().cancel();

        assert!(matches!(
            session.compute(),
            Err(AnalysisError::Computation(ComputationError::Cancelled))
        ));

        session.cancel_token().reset();
        assert!(session.compute().is_ok());
    }

    #[test]
    fn summary_reports_max_score_and_hub() {
        let session = AnalysisSession::default();
        session
            .build(&records(&[(1, 2, 1.0), (2, 3, 1.0), (2, 4, 1.0)]))
            .expect("valid");
        let summary = session.summary().expect("summary");
        assert_eq!(summary.most_connected_node, Some(2));
        assert!((summary.highest_score.expect("edges") - 0.5).abs() < 1e-10);
    }
}
