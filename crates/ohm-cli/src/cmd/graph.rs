//! `ohm graph`: summary statistics for the uploaded graph.

use std::io::Write;

use clap::Args;
use ohm_flow::GraphStats;

use crate::output::{OutputMode, fail, pretty_kv, pretty_section, render};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct GraphArgs {}

pub fn run_graph(_args: &GraphArgs, ws: &Workspace, output: OutputMode) -> anyhow::Result<()> {
    let session = ws
        .load_session(ws.flow_config(None, None))
        .map_err(|e| fail(output, &e))?;
    let graph = session.require_snapshot().map_err(|e| fail(output, &e))?;
    let stats = GraphStats::from_graph(&graph);

    render(output, &stats, |s, w| {
        if output.is_pretty() {
            render_stats_pretty(s, w)
        } else {
            render_stats_text(s, w)
        }
    })
}

fn most_connected(stats: &GraphStats) -> String {
    stats
        .most_connected_node
        .map_or_else(|| "n/a".to_string(), |n| n.to_string())
}

fn render_stats_pretty(stats: &GraphStats, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Network")?;
    pretty_kv(w, "nodes", stats.node_count.to_string())?;
    pretty_kv(w, "edges", stats.edge_count.to_string())?;
    pretty_kv(w, "density", format!("{:.4}", stats.density))?;
    pretty_kv(w, "total weight", format!("{:.4}", stats.total_weight))?;
    pretty_kv(w, "max degree", stats.max_degree.to_string())?;
    pretty_kv(w, "most connected", most_connected(stats))?;
    pretty_kv(w, "connected", if stats.connected { "yes" } else { "no" })?;
    pretty_kv(w, "hash", &stats.content_hash)
}

fn render_stats_text(stats: &GraphStats, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "nodes {}", stats.node_count)?;
    writeln!(w, "edges {}", stats.edge_count)?;
    writeln!(w, "density {:.4}", stats.density)?;
    writeln!(w, "total_weight {:.4}", stats.total_weight)?;
    writeln!(w, "max_degree {}", stats.max_degree)?;
    writeln!(w, "most_connected_node {}", most_connected(stats))?;
    writeln!(w, "connected {}", stats.connected)?;
    writeln!(w, "content_hash {}", stats.content_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ohm_core::EdgeRecord;
    use ohm_flow::FlowGraph;

    fn stats() -> GraphStats {
        let graph = FlowGraph::build(&[
            EdgeRecord::new(1, 2, 1.0),
            EdgeRecord::new(2, 3, 2.0),
            EdgeRecord::new(5, 6, 1.0),
        ])
        .expect("valid");
        GraphStats::from_graph(&graph)
    }

    #[test]
    fn text_output_is_key_value_lines() {
        let mut out = Vec::new();
        render_stats_text(&stats(), &mut out).expect("render");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("nodes 5\n"));
        assert!(text.contains("edges 3\n"));
        assert!(text.contains("most_connected_node 2\n"));
        assert!(text.contains("connected false\n"));
    }

    #[test]
    fn pretty_output_has_heading() {
        let mut out = Vec::new();
        render_stats_pretty(&stats(), &mut out).expect("render");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("Network\n"));
        assert!(text.contains("connected:     no"));
    }
}
