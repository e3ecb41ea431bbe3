//! `ohm load`: print the saved selection record exactly as stored.

use std::io::Write;

use clap::Args;
use serde_json::Value;

use crate::output::{OutputMode, fail, render};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct LoadArgs {}

pub fn run_load(_args: &LoadArgs, ws: &Workspace, output: OutputMode) -> anyhow::Result<()> {
    let record: Value = ws.selection_store().read().map_err(|e| fail(output, &e))?;
    // The record is JSON in every mode; pretty and text only differ in layout.
    render(output, &record, |r, w| {
        let text = if output.is_pretty() {
            serde_json::to_string_pretty(r)
        } else {
            serde_json::to_string(r)
        }
        .map_err(std::io::Error::other)?;
        writeln!(w, "{text}")
    })
}
