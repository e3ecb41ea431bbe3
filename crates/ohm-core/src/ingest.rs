//! CSV edge-table ingestion.
//!
//! # Format
//!
//! The first row is a header naming the columns. Three columns are required,
//! matched literally and case-sensitively:
//!
//! ```text
//! source,target,weight
//! 1,2,0.5
//! 2,3,1.25
//! ```
//!
//! Column order does not matter and extra columns are ignored. Cells are
//! trimmed. `source` and `target` must parse as `i64`; `weight` must parse
//! as `f64`. Range checks on the weight (finite, strictly positive) and the
//! self-loop rule belong to the graph builder, so a table that parses here
//! can still be rejected when the graph is built.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::NodeId;
use crate::error::ValidationError;

pub const SOURCE_COLUMN: &str = "source";
pub const TARGET_COLUMN: &str = "target";
pub const WEIGHT_COLUMN: &str = "weight";

/// One raw `(source, target, weight)` row as supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f64,
}

impl EdgeRecord {
    #[must_use]
    pub const fn new(source: NodeId, target: NodeId, weight: f64) -> Self {
        Self {
            source,
            target,
            weight,
        }
    }
}

impl From<(NodeId, NodeId, f64)> for EdgeRecord {
    fn from((source, target, weight): (NodeId, NodeId, f64)) -> Self {
        Self::new(source, target, weight)
    }
}

/// Failure to ingest an edge table from disk.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Parse an edge table from any reader.
///
/// # Errors
///
/// - [`ValidationError::EmptyTable`] if there is no header or no data row.
/// - [`ValidationError::MissingColumn`] if a required column is absent.
/// - [`ValidationError::NotAnInteger`] for a node cell that is not an `i64`.
/// - [`ValidationError::UnparsableWeight`] for a weight cell that is not a number.
/// - [`ValidationError::MalformedTable`] for CSV syntax errors (ragged rows,
///   invalid UTF-8).
#[instrument(skip(reader))]
pub fn read_edges<R: Read>(reader: R) -> Result<Vec<EdgeRecord>, ValidationError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(malformed)?.clone();
    if headers.iter().all(str::is_empty) {
        return Err(ValidationError::EmptyTable);
    }

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ValidationError::MissingColumn(name.to_string()))
    };
    let source_idx = column(SOURCE_COLUMN)?;
    let target_idx = column(TARGET_COLUMN)?;
    let weight_idx = column(WEIGHT_COLUMN)?;

    let mut edges = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(malformed)?;
        let row = i + 1;

        let source = parse_node(&record, source_idx, SOURCE_COLUMN, row)?;
        let target = parse_node(&record, target_idx, TARGET_COLUMN, row)?;
        let raw_weight = record.get(weight_idx).unwrap_or_default();
        let weight =
            raw_weight
                .parse::<f64>()
                .map_err(|_| ValidationError::UnparsableWeight {
                    row,
                    value: raw_weight.to_string(),
                })?;

        edges.push(EdgeRecord::new(source, target, weight));
    }

    if edges.is_empty() {
        return Err(ValidationError::EmptyTable);
    }

    debug!(rows = edges.len(), "parsed edge table");
    Ok(edges)
}

/// Open `path` and parse it with [`read_edges`].
///
/// # Errors
///
/// Returns [`IngestError::Io`] if the file cannot be opened, or
/// [`IngestError::Invalid`] for any parse failure.
pub fn read_edges_from_path(path: &Path) -> Result<Vec<EdgeRecord>, IngestError> {
    let file = std::fs::File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(read_edges(std::io::BufReader::new(file))?)
}

fn parse_node(
    record: &csv::StringRecord,
    idx: usize,
    column: &str,
    row: usize,
) -> Result<NodeId, ValidationError> {
    let raw = record.get(idx).unwrap_or_default();
    raw.parse::<NodeId>()
        .map_err(|_| ValidationError::NotAnInteger {
            row,
            column: column.to_string(),
            value: raw.to_string(),
        })
}

fn malformed(err: csv::Error) -> ValidationError {
    ValidationError::MalformedTable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Vec<EdgeRecord>, ValidationError> {
        read_edges(text.as_bytes())
    }

    #[test]
    fn parses_basic_table() {
        let edges = parse("source,target,weight\n1,2,1.0\n2,3,2.5\n").expect("valid table");
        assert_eq!(
            edges,
            vec![EdgeRecord::new(1, 2, 1.0), EdgeRecord::new(2, 3, 2.5)]
        );
    }

    #[test]
    fn column_order_and_extra_columns_do_not_matter() {
        let edges = parse("label,weight,target,source\nroad,3,20,10\n").expect("valid table");
        assert_eq!(edges, vec![EdgeRecord::new(10, 20, 3.0)]);
    }

    #[test]
    fn cells_are_trimmed() {
        let edges = parse("source , target , weight\n 4 , 5 , 0.25 \n").expect("valid table");
        assert_eq!(edges, vec![EdgeRecord::new(4, 5, 0.25)]);
    }

    #[test]
    fn missing_column_is_rejected() {
        let err = parse("source,target\n1,2\n").expect_err("weight column missing");
        assert_eq!(err, ValidationError::MissingColumn("weight".to_string()));
    }

    #[test]
    fn column_names_are_case_sensitive() {
        let err = parse("Source,target,weight\n1,2,1\n").expect_err("case matters");
        assert_eq!(err, ValidationError::MissingColumn("source".to_string()));
    }

    #[test]
    fn header_only_table_is_empty() {
        assert_eq!(
            parse("source,target,weight\n").expect_err("no rows"),
            ValidationError::EmptyTable
        );
        assert_eq!(parse("").expect_err("no header"), ValidationError::EmptyTable);
    }

    #[test]
    fn non_integer_node_is_rejected() {
        let err = parse("source,target,weight\n1,2,1\n1.5,3,1\n").expect_err("float node");
        assert_eq!(
            err,
            ValidationError::NotAnInteger {
                row: 2,
                column: "source".to_string(),
                value: "1.5".to_string(),
            }
        );
    }

    #[test]
    fn non_numeric_weight_is_rejected() {
        let err = parse("source,target,weight\n1,2,heavy\n").expect_err("text weight");
        assert!(matches!(err, ValidationError::UnparsableWeight { row: 1, .. }));
        assert!(err.to_string().starts_with("invalid weight"));
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let err = parse("source,target,weight\n1,2\n").expect_err("short row");
        assert!(matches!(err, ValidationError::MalformedTable(_)));
    }

    #[test]
    fn non_positive_weight_still_parses() {
        let edges = parse("source,target,weight\n1,2,-3\n").expect("range is checked later");
        assert!(edges[0].weight < 0.0);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = read_edges_from_path(&dir.path().join("nope.csv")).expect_err("missing file");
        assert!(matches!(err, IngestError::Io { .. }));
    }
}
