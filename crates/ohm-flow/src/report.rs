//! Plain-text network report.
//!
//! The report lists the caller's saved selection (per source node, the
//! selected edges and their scores) followed by two headline figures for the
//! whole graph: the highest edge betweenness and the most connected node.
//!
//! The selection arrives as the persisted record, which is otherwise opaque
//! to the core. Only its `selectedNodes` field is read:
//!
//! ```json
//! { "selectedNodes": { "1": [ { "edge": "1-2", "score": 2.0 } ] } }
//! ```

use std::collections::BTreeMap;
use std::io::{self, Write};

use chrono::{DateTime, Utc};
use ohm_core::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const REPORT_TITLE: &str = "Network Report";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("selection record has an unexpected shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Whole-graph figures quoted at the end of a report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReportSummary {
    pub highest_score: Option<f64>,
    pub most_connected_node: Option<NodeId>,
}

/// One selected edge as stored in the selection record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub edge: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub source: String,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Default, Deserialize)]
struct SelectionRecord {
    #[serde(default, rename = "selectedNodes")]
    selected_nodes: BTreeMap<String, Vec<ReportRow>>,
}

/// Extract the per-source sections from a selection record. A record
/// without `selectedNodes` yields no sections. Numeric source keys sort
/// numerically, the rest lexicographically after them.
///
/// # Errors
///
/// [`ReportError::Shape`] if `selectedNodes` is present but not a map of
/// `{edge, score}` lists.
pub fn sections_from_record(record: &Value) -> Result<Vec<ReportSection>, ReportError> {
    let parsed: SelectionRecord = if record.is_object() {
        SelectionRecord::deserialize(record)?
    } else {
        SelectionRecord::default()
    };

    let mut sections: Vec<ReportSection> = parsed
        .selected_nodes
        .into_iter()
        .map(|(source, rows)| ReportSection { source, rows })
        .collect();
    sections.sort_by_cached_key(|s| {
        let numeric = s.source.parse::<NodeId>().ok();
        (numeric.is_none(), numeric, s.source.clone())
    });
    Ok(sections)
}

/// A rendered-on-demand network report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<ReportSection>,
    pub summary: ReportSummary,
}

impl Report {
    #[must_use]
    pub fn new(sections: Vec<ReportSection>, summary: ReportSummary, generated_at: DateTime<Utc>) -> Self {
        Self {
            title: REPORT_TITLE.to_string(),
            generated_at,
            sections,
            summary,
        }
    }

    /// Write the report as plain text.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from `w`.
    pub fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}", self.title)?;
        writeln!(w, "{}", "=".repeat(self.title.len()))?;
        writeln!(w, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(w)?;

        writeln!(w, "Selected Nodes and Betweenness Scores")?;
        if self.sections.is_empty() {
            writeln!(w, "  (none)")?;
        }
        for section in &self.sections {
            writeln!(w, "Source Node: {}", section.source)?;
            for row in &section.rows {
                writeln!(w, "  Edge: {}, Betweenness: {:.4}", row.edge, row.score)?;
            }
        }
        writeln!(w)?;

        match self.summary.highest_score {
            Some(score) => writeln!(w, "Highest Betweenness Score: {score:.4}")?,
            None => writeln!(w, "Highest Betweenness Score: n/a")?,
        }
        match self.summary.most_connected_node {
            Some(node) => writeln!(w, "Most Connected Node: {node}")?,
            None => writeln!(w, "Most Connected Node: n/a")?,
        }
        Ok(())
    }

    #[must_use]
    pub fn to_text(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.render(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}
