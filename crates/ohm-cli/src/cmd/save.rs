//! `ohm save [--file PATH]`: persist the caller's selection record.
//!
//! The record is any JSON value; it is stored as-is and never interpreted.
//! Without `--file` the record is read from stdin.

use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use serde_json::Value;

use crate::output::{CliError, OutputMode, fail, render};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct SaveArgs {
    /// JSON file holding the record. Reads stdin when omitted.
    #[arg(long, short)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct SaveOutput {
    pub ok: bool,
    pub path: String,
}

pub fn run_save(args: &SaveArgs, ws: &Workspace, output: OutputMode) -> anyhow::Result<()> {
    let raw = match &args.file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read record from stdin")?;
            buf
        }
    };

    let record = parse_record(&raw).map_err(|e| fail(output, e))?;

    let store = ws.selection_store();
    store.write(&record).map_err(|e| fail(output, &e))?;

    let payload = SaveOutput {
        ok: true,
        path: store.path().display().to_string(),
    };
    render(output, &payload, |p, w| writeln!(w, "saved selection to {}", p.path))
}

fn parse_record(raw: &str) -> Result<Value, CliError> {
    serde_json::from_str(raw).map_err(|e| {
        CliError::with_details(
            format!("record is not valid JSON: {e}"),
            "Pass a JSON document via --file or stdin.",
            "E2002",
        )
    })
}
