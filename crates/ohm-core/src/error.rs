//! Error taxonomy shared by every ohm crate.
//!
//! Two kinds of failure exist in the analysis core:
//!
//! - [`ValidationError`]: malformed input (bad table, bad weight, self-loop,
//!   unknown node in a filter). The caller can fix the input and retry.
//! - [`ComputationError`]: the graph itself cannot be analyzed
//!   (disconnected, empty, singular system) or the computation was stopped.
//!
//! [`AnalysisError`] joins the two so `?` composes across build, compute and
//! filter. Every variant maps to a stable [`ErrorCode`] for machine parsing.

use std::fmt;

use crate::NodeId;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    EmptyInput,
    MalformedTable,
    InvalidWeight,
    SelfLoop,
    UnknownNode,
    NoSinks,
    NoGraphLoaded,
    EmptyGraph,
    Disconnected,
    SingularSystem,
    GraphTooLarge,
    Cancelled,
    RecordMissing,
    RecordWriteFailed,
    CorruptRecord,
    LockContention,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::EmptyInput => "E2001",
            Self::MalformedTable => "E2002",
            Self::InvalidWeight => "E2003",
            Self::SelfLoop => "E2004",
            Self::UnknownNode => "E2005",
            Self::NoSinks => "E2006",
            Self::NoGraphLoaded => "E2007",
            Self::EmptyGraph => "E3001",
            Self::Disconnected => "E3002",
            Self::SingularSystem => "E3003",
            Self::GraphTooLarge => "E3004",
            Self::Cancelled => "E3005",
            Self::RecordMissing => "E5001",
            Self::RecordWriteFailed => "E5002",
            Self::CorruptRecord => "E5003",
            Self::LockContention => "E5004",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::EmptyInput => "Empty input",
            Self::MalformedTable => "Malformed edge table",
            Self::InvalidWeight => "Invalid weight",
            Self::SelfLoop => "Self-loop not permitted",
            Self::UnknownNode => "Unknown node",
            Self::NoSinks => "No sink nodes given",
            Self::NoGraphLoaded => "No graph loaded",
            Self::EmptyGraph => "Graph has no edges",
            Self::Disconnected => "Graph must be connected",
            Self::SingularSystem => "Singular system",
            Self::GraphTooLarge => "Graph exceeds node limit",
            Self::Cancelled => "Computation cancelled",
            Self::RecordMissing => "Saved record not found",
            Self::RecordWriteFailed => "Record write failed",
            Self::CorruptRecord => "Stored record is not valid JSON",
            Self::LockContention => "Lock contention",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .ohm/config.toml and retry."),
            Self::EmptyInput => Some("Provide at least one edge row."),
            Self::MalformedTable => {
                Some("The table needs a header row with `source`, `target` and `weight` columns.")
            }
            Self::InvalidWeight => Some("Weights must be finite numbers greater than zero."),
            Self::SelfLoop => Some("Remove rows whose source equals their target."),
            Self::UnknownNode => Some("Run `ohm upload` and pick nodes from the listed set."),
            Self::NoSinks => Some("Pass at least one `--sink`."),
            Self::NoGraphLoaded => Some("Run `ohm upload <file.csv>` first."),
            Self::EmptyGraph => None,
            Self::Disconnected => {
                Some("Current flow is undefined across components; upload a connected network.")
            }
            Self::SingularSystem => Some("Check for near-zero or wildly mismatched weights."),
            Self::GraphTooLarge => Some("Raise `analysis.max_nodes` in .ohm/config.toml."),
            Self::Cancelled => None,
            Self::RecordMissing => Some("Run `ohm save` before loading."),
            Self::RecordWriteFailed => Some("Check disk space and write permissions."),
            Self::CorruptRecord => Some("Overwrite the record with `ohm save` or `ohm upload`."),
            Self::LockContention => Some("Retry after the other `ohm` process releases its lock."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Malformed input rejected before or during graph construction or filtering.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The edge sequence handed to the graph builder was empty.
    #[error("edge list is empty")]
    EmptyEdgeList,

    /// A weight was non-numeric, non-finite, zero or negative.
    #[error("invalid weight {weight} on edge {u}-{v}")]
    InvalidWeight { u: NodeId, v: NodeId, weight: f64 },

    /// A weight cell could not be read as a number at all.
    #[error("invalid weight {value:?} in row {row}")]
    UnparsableWeight { row: usize, value: String },

    #[error("self-loop not permitted on node {0}")]
    SelfLoop(NodeId),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("at least one sink node is required")]
    NoSinks,

    #[error("missing required column {0:?}")]
    MissingColumn(String),

    /// The table had a header but no data rows.
    #[error("the edge table is empty")]
    EmptyTable,

    #[error("row {row}: column {column:?} value {value:?} is not an integer")]
    NotAnInteger {
        row: usize,
        column: String,
        value: String,
    },

    #[error("malformed edge table: {0}")]
    MalformedTable(String),

    #[error("no graph loaded")]
    NoGraphLoaded,
}

impl ValidationError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyEdgeList | Self::EmptyTable => ErrorCode::EmptyInput,
            Self::InvalidWeight { .. } | Self::UnparsableWeight { .. } => ErrorCode::InvalidWeight,
            Self::SelfLoop(_) => ErrorCode::SelfLoop,
            Self::UnknownNode(_) => ErrorCode::UnknownNode,
            Self::NoSinks => ErrorCode::NoSinks,
            Self::MissingColumn(_) | Self::NotAnInteger { .. } | Self::MalformedTable(_) => {
                ErrorCode::MalformedTable
            }
            Self::NoGraphLoaded => ErrorCode::NoGraphLoaded,
        }
    }
}

// ---------------------------------------------------------------------------
// ComputationError
// ---------------------------------------------------------------------------

/// Structural failures of the current-flow computation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComputationError {
    #[error("graph has no edges")]
    NoEdges,

    #[error("graph must be connected")]
    Disconnected,

    /// The grounded Laplacian could not be factored within tolerance.
    #[error("singular system")]
    Singular,

    #[error("graph has {nodes} nodes, above the configured limit of {limit}")]
    TooLarge { nodes: usize, limit: usize },

    #[error("computation cancelled")]
    Cancelled,
}

impl ComputationError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NoEdges => ErrorCode::EmptyGraph,
            Self::Disconnected => ErrorCode::Disconnected,
            Self::Singular => ErrorCode::SingularSystem,
            Self::TooLarge { .. } => ErrorCode::GraphTooLarge,
            Self::Cancelled => ErrorCode::Cancelled,
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisError
// ---------------------------------------------------------------------------

/// Either kind of analysis failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Computation(#[from] ComputationError),
}

impl AnalysisError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(err) => err.code(),
            Self::Computation(err) => err.code(),
        }
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    /// Returns `true` when the caller can fix the input and retry.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::EmptyInput,
            ErrorCode::MalformedTable,
            ErrorCode::InvalidWeight,
            ErrorCode::SelfLoop,
            ErrorCode::UnknownNode,
            ErrorCode::NoSinks,
            ErrorCode::NoGraphLoaded,
            ErrorCode::EmptyGraph,
            ErrorCode::Disconnected,
            ErrorCode::SingularSystem,
            ErrorCode::GraphTooLarge,
            ErrorCode::Cancelled,
            ErrorCode::RecordMissing,
            ErrorCode::RecordWriteFailed,
            ErrorCode::CorruptRecord,
            ErrorCode::LockContention,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::SingularSystem.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn messages_match_documented_wording() {
        assert_eq!(
            ValidationError::SelfLoop(1).to_string(),
            "self-loop not permitted on node 1"
        );
        assert_eq!(
            ComputationError::Disconnected.to_string(),
            "graph must be connected"
        );
        assert_eq!(ComputationError::NoEdges.to_string(), "graph has no edges");
        assert_eq!(ComputationError::Singular.to_string(), "singular system");
        assert!(
            ValidationError::InvalidWeight {
                u: 1,
                v: 2,
                weight: -1.0
            }
            .to_string()
            .starts_with("invalid weight")
        );
    }

    #[test]
    fn analysis_error_keeps_kind() {
        let validation: AnalysisError = ValidationError::UnknownNode(9).into();
        assert!(validation.is_validation());
        assert_eq!(validation.code(), ErrorCode::UnknownNode);

        let computation: AnalysisError = ComputationError::Singular.into();
        assert!(!computation.is_validation());
        assert_eq!(computation.code(), ErrorCode::SingularSystem);
        assert!(computation.hint().is_some());
    }
}
