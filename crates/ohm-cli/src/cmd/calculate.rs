//! `ohm calculate --source N --sink M [--sink ...]`
//!
//! Computes current-flow edge betweenness for the uploaded graph and prints
//! the edges directly incident to the source that touch one of the sinks.
//! Multi-hop routes toward a sink are not traced.

use std::collections::BTreeSet;
use std::io::Write;

use clap::Args;
use ohm_core::NodeId;
use ohm_core::config::{Scale, Solver};
use ohm_flow::EdgeScore;
use serde::Serialize;

use crate::output::{OutputMode, fail, pretty_section, render};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct CalculateArgs {
    /// Node the current enters at.
    #[arg(long)]
    pub source: NodeId,

    /// Node the current leaves at. Repeat for several sinks.
    #[arg(long = "sink", required = true, num_args = 1..)]
    pub sinks: Vec<NodeId>,

    /// Override the configured scaling of the scores.
    #[arg(long)]
    pub scale: Option<Scale>,

    /// Override the configured linear solver.
    #[arg(long)]
    pub solver: Option<Solver>,
}

#[derive(Debug, Serialize)]
pub struct CalculateOutput {
    pub results: Vec<EdgeScore>,
}

pub fn run_calculate(
    args: &CalculateArgs,
    ws: &Workspace,
    output: OutputMode,
) -> anyhow::Result<()> {
    let session = ws
        .load_session(ws.flow_config(args.scale, args.solver))
        .map_err(|e| fail(output, &e))?;
    let sinks: BTreeSet<NodeId> = args.sinks.iter().copied().collect();

    let filtered = session
        .calculate(args.source, &sinks)
        .map_err(|e| fail(output, &e))?;

    let payload = CalculateOutput {
        results: filtered.edges,
    };
    render(output, &payload, |p, w| {
        if output.is_pretty() {
            pretty_section(
                w,
                &format!("Edges from {} toward {}", args.source, join_ids(&sinks)),
            )?;
        }
        render_calculate_text(p, w)
    })
}

fn join_ids(ids: &BTreeSet<NodeId>) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn render_calculate_text(payload: &CalculateOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if payload.results.is_empty() {
        writeln!(w, "No edges connect the source directly to a sink.")?;
        return Ok(());
    }
    for s in &payload.results {
        writeln!(w, "{}\t{:.4}", s.edge, s.score)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use ohm_flow::Edge;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: CalculateArgs,
    }

    #[test]
    fn parses_repeated_sinks_and_overrides() {
        let parsed = Wrapper::parse_from([
            "test", "--source", "1", "--sink", "3", "--sink", "4", "--scale", "raw", "--solver",
            "per-pair",
        ]);
        assert_eq!(parsed.args.source, 1);
        assert_eq!(parsed.args.sinks, vec![3, 4]);
        assert_eq!(parsed.args.scale, Some(Scale::Raw));
        assert_eq!(parsed.args.solver, Some(Solver::PerPair));
    }

    #[test]
    fn sink_is_required() {
        assert!(Wrapper::try_parse_from(["test", "--source", "1"]).is_err());
    }

    #[test]
    fn text_rows_are_edge_and_score() {
        let payload = CalculateOutput {
            results: vec![EdgeScore {
                edge: Edge::new(2, 1),
                score: 2.0,
            }],
        };
        let mut out = Vec::new();
        render_calculate_text(&payload, &mut out).expect("render");
        assert_eq!(String::from_utf8(out).expect("utf8"), "1-2\t2.0000\n");
    }

    #[test]
    fn empty_selection_says_so() {
        let mut out = Vec::new();
        render_calculate_text(&CalculateOutput { results: Vec::new() }, &mut out).expect("render");
        assert!(String::from_utf8(out).expect("utf8").starts_with("No edges"));
    }

    #[test]
    fn json_results_are_edge_score_records() {
        let payload = CalculateOutput {
            results: vec![EdgeScore {
                edge: Edge::new(1, 2),
                score: 0.5,
            }],
        };
        let json = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(json, serde_json::json!({"results": [{"edge": "1-2", "score": 0.5}]}));
    }
}
