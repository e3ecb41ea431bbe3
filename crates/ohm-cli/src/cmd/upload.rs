//! `ohm upload <csv>`: ingest an edge table and make it the session graph.
//!
//! The table needs columns named `source`, `target` and `weight`. On
//! success the validated graph replaces `.ohm/graph.json` and the node and
//! edge lists are printed. On any failure the stored graph is untouched.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use ohm_core::ingest::read_edges_from_path;
use ohm_core::{EdgeRecord, NodeId};
use ohm_flow::AnalysisSession;
use serde::Serialize;
use tracing::info;

use crate::output::{OutputMode, fail, pretty_kv, pretty_section, render};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// CSV file with `source`, `target` and `weight` columns.
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct UploadOutput {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeRecord>,
    pub content_hash: String,
}

pub fn run_upload(
    args: &UploadArgs,
    ws: &Workspace,
    output: OutputMode,
) -> anyhow::Result<()> {
    let rows = read_edges_from_path(&args.file).map_err(|e| fail(output, &e))?;

    let session = AnalysisSession::default();
    let graph = session.build(&rows).map_err(|e| fail(output, &e))?;

    ws.ensure_dir()?;
    ws.save_graph(&graph).map_err(|e| fail(output, &e))?;
    info!(
        file = %args.file.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "graph uploaded"
    );

    let payload = UploadOutput {
        nodes: graph.nodes().into_iter().collect(),
        edges: graph.to_records(),
        content_hash: graph.content_hash().to_string(),
    };
    render(output, &payload, |p, w| {
        if output.is_pretty() {
            render_upload_pretty(p, &args.file, w)
        } else {
            render_upload_text(p, w)
        }
    })
}

fn render_upload_pretty(
    payload: &UploadOutput,
    file: &Path,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    pretty_section(w, &format!("Uploaded {}", file.display()))?;
    pretty_kv(w, "nodes", payload.nodes.len().to_string())?;
    pretty_kv(w, "edges", payload.edges.len().to_string())?;
    pretty_kv(w, "hash", &payload.content_hash)?;
    writeln!(w)?;
    let ids: Vec<String> = payload.nodes.iter().map(ToString::to_string).collect();
    pretty_kv(w, "node ids", ids.join(", "))?;
    for edge in &payload.edges {
        writeln!(w, "  {}-{}  weight {}", edge.source, edge.target, edge.weight)?;
    }
    Ok(())
}

fn render_upload_text(payload: &UploadOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "nodes {}", payload.nodes.len())?;
    writeln!(w, "edges {}", payload.edges.len())?;
    for edge in &payload.edges {
        writeln!(w, "{}\t{}\t{}", edge.source, edge.target, edge.weight)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> UploadOutput {
        UploadOutput {
            nodes: vec![1, 2, 3],
            edges: vec![EdgeRecord::new(1, 2, 1.0), EdgeRecord::new(2, 3, 0.5)],
            content_hash: "blake3:abc".to_string(),
        }
    }

    #[test]
    fn upload_args_parse() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: UploadArgs,
        }

        let parsed = Wrapper::parse_from(["test", "edges.csv"]);
        assert_eq!(parsed.args.file, PathBuf::from("edges.csv"));
    }

    #[test]
    fn text_lists_edges_as_rows() {
        let mut out = Vec::new();
        render_upload_text(&payload(), &mut out).expect("render");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text, "nodes 3\nedges 2\n1\t2\t1\n2\t3\t0.5\n");
    }

    #[test]
    fn pretty_shows_counts_and_ids() {
        let mut out = Vec::new();
        render_upload_pretty(&payload(), Path::new("net.csv"), &mut out).expect("render");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("Uploaded net.csv\n"));
        assert!(text.contains("node ids:      1, 2, 3"));
        assert!(text.contains("  2-3  weight 0.5"));
    }

    #[test]
    fn json_shape_matches_node_and_edge_lists() {
        let json = serde_json::to_value(payload()).expect("serialize");
        assert_eq!(json["nodes"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["edges"][1]["source"], 2);
        assert_eq!(json["edges"][1]["target"], 3);
        assert!((json["edges"][1]["weight"].as_f64().expect("f64") - 0.5).abs() < 1e-12);
    }
}
