#![no_main]

use libfuzzer_sys::fuzz_target;
use ohm_core::EdgeRecord;
use ohm_flow::{CancelToken, CurrentFlowConfig, FlowGraph, edge_current_flow_betweenness};

fuzz_target!(|data: &[u8]| {
    let records: Vec<EdgeRecord> = data
        .chunks_exact(3)
        .map(|c| EdgeRecord::new(i64::from(c[0] % 16), i64::from(c[1] % 16), f64::from(c[2])))
        .collect();

    let Ok(graph) = FlowGraph::build(&records) else {
        return;
    };
    let config = CurrentFlowConfig::default();
    if let Ok(result) = edge_current_flow_betweenness(&graph, &config, &CancelToken::new()) {
        assert_eq!(result.len(), graph.edge_count());
        for score in result.iter() {
            assert!(score.score.is_finite() && score.score >= -1e-9);
        }
    }
});
