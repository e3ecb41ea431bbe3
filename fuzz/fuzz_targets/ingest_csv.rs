#![no_main]

use libfuzzer_sys::fuzz_target;
use ohm_flow::FlowGraph;

fuzz_target!(|data: &[u8]| {
    let Ok(rows) = ohm_core::ingest::read_edges(data) else {
        return;
    };
    assert!(!rows.is_empty());
    if let Ok(graph) = FlowGraph::build(&rows) {
        for (edge, weight) in graph.weighted_edges() {
            assert!(weight.is_finite() && weight > 0.0);
            assert_ne!(edge.u(), edge.v());
        }
    }
});
