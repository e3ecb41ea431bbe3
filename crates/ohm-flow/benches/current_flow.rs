use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ohm_core::EdgeRecord;
use ohm_core::config::{Scale, Solver};
use ohm_flow::graph::FlowGraph;
use ohm_flow::metrics::{CancelToken, CurrentFlowConfig, edge_current_flow_betweenness};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random spanning tree plus `extra` chords per node, weights in `[0.5, 5)`.
fn synthetic_graph(nodes: i64, extra: usize, seed: u64) -> FlowGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::new();
    for i in 1..nodes {
        let parent = rng.gen_range(0..i);
        rows.push(EdgeRecord::new(i, parent, rng.gen_range(0.5..5.0)));
    }
    for _ in 0..(extra * usize::try_from(nodes).unwrap_or(0)) {
        let a = rng.gen_range(0..nodes);
        let b = rng.gen_range(0..nodes);
        if a != b {
            rows.push(EdgeRecord::new(a, b, rng.gen_range(0.5..5.0)));
        }
    }
    FlowGraph::build(&rows).expect("synthetic graph is valid")
}

fn bench_solvers(c: &mut Criterion) {
    let mut group = c.benchmark_group("current_flow");
    group.sample_size(10);

    for nodes in [16i64, 48, 96] {
        let graph = synthetic_graph(nodes, 2, 0xC0FFEE ^ nodes.unsigned_abs());

        for solver in [Solver::Pseudoinverse, Solver::PerPair] {
            // Per-pair is quartic; keep it to the small tiers.
            if solver == Solver::PerPair && nodes > 48 {
                continue;
            }
            let config = CurrentFlowConfig {
                scale: Scale::Normalized,
                solver,
                ..CurrentFlowConfig::default()
            };
            group.bench_with_input(
                BenchmarkId::new(solver.as_str(), nodes),
                &graph,
                |b, graph| {
                    b.iter(|| {
                        let result =
                            edge_current_flow_betweenness(graph, &config, &CancelToken::new())
                                .expect("connected");
                        black_box(result)
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_solvers);
criterion_main!(benches);
