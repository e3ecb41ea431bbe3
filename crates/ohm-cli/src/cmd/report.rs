//! `ohm report`: render the network report for the saved selection.
//!
//! The report needs both the selection record (the persisted one, or
//! `--selection PATH`) and the uploaded graph, whose full betweenness result
//! supplies the highest score and whose degrees pick the most connected
//! node.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::Args;
use ohm_flow::report::{Report, sections_from_record};
use serde_json::Value;
use tracing::info;

use crate::output::{OutputMode, fail, render};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Selection record to report on instead of the saved one.
    #[arg(long)]
    pub selection: Option<PathBuf>,

    /// Write the text report to this file instead of stdout.
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

pub fn run_report(args: &ReportArgs, ws: &Workspace, output: OutputMode) -> anyhow::Result<()> {
    let record: Value = match &args.selection {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("{} is not valid JSON", path.display()))?
        }
        None => ws.selection_store().read().map_err(|e| fail(output, &e))?,
    };
    let sections = sections_from_record(&record).map_err(|e| fail(output, &e))?;

    let session = ws
        .load_session(ws.flow_config(None, None))
        .map_err(|e| fail(output, &e))?;
    let summary = session.summary().map_err(|e| fail(output, &e))?;

    let report = Report::new(sections, summary, Utc::now());

    if let Some(path) = &args.out {
        let mut file =
            fs::File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        report.render(&mut file)?;
        info!(path = %path.display(), "report written");
        let written = serde_json::json!({ "ok": true, "path": path.display().to_string() });
        return render(output, &written, |_, w| {
            writeln!(w, "report written to {}", path.display())
        });
    }

    render(output, &report, |r, w| r.render(w))
}
