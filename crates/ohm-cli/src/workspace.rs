//! The `.ohm/` directory in the current project.
//!
//! Each `ohm` invocation is a short-lived process, so the analysis session
//! graph is persisted between calls as `.ohm/graph.json` (the validated edge
//! list) and rebuilt into a fresh [`AnalysisSession`] on load. The caller's
//! selection record lives beside it under the configured file name.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use ohm_core::EdgeRecord;
use ohm_core::config::{ConfigError, EffectiveConfig, OHM_DIR, Scale, Solver, resolve_config};
use ohm_core::error::{ErrorCode, ValidationError};
use ohm_core::store::{RecordStore, StoreError};
use ohm_flow::{AnalysisSession, CurrentFlowConfig, FlowGraph};
use serde::{Deserialize, Serialize};
use tracing::debug;

const GRAPH_FILE: &str = "graph.json";

/// On-disk form of the session graph.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredGraph {
    pub content_hash: String,
    pub edges: Vec<EdgeRecord>,
}

impl From<&FlowGraph> for StoredGraph {
    fn from(graph: &FlowGraph) -> Self {
        Self {
            content_hash: graph.content_hash().to_string(),
            edges: graph.to_records(),
        }
    }
}

/// Failure to rebuild the session from `.ohm/graph.json`.
#[derive(Debug, thiserror::Error)]
pub enum SessionLoadError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("stored graph {} is invalid: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
}

impl SessionLoadError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Store(err) => err.code(),
            Self::Invalid { .. } => ErrorCode::CorruptRecord,
        }
    }
}

pub struct Workspace {
    root: PathBuf,
    config: EffectiveConfig,
}

impl Workspace {
    /// Load configuration for the project rooted at `root`.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if a config file exists but cannot be read or parsed.
    pub fn open(root: &Path, cli_json: bool) -> Result<Self, ConfigError> {
        let config = resolve_config(root, cli_json)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
        })
    }

    pub const fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    pub fn ohm_dir(&self) -> PathBuf {
        self.root.join(OHM_DIR)
    }

    /// Create `.ohm/` if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn ensure_dir(&self) -> Result<PathBuf> {
        let dir = self.ohm_dir();
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(dir)
    }

    fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.config.project.storage.lock_timeout_ms)
    }

    pub fn graph_store(&self) -> RecordStore {
        RecordStore::new(self.ohm_dir().join(GRAPH_FILE), self.lock_timeout())
    }

    pub fn selection_store(&self) -> RecordStore {
        let file = &self.config.project.storage.selection_file;
        RecordStore::new(self.ohm_dir().join(file), self.lock_timeout())
    }

    /// Analysis settings from the project config, with per-call overrides.
    pub fn flow_config(&self, scale: Option<Scale>, solver: Option<Solver>) -> CurrentFlowConfig {
        let mut config = CurrentFlowConfig::from(&self.config.project.analysis);
        if let Some(scale) = scale {
            config.scale = scale;
        }
        if let Some(solver) = solver {
            config.solver = solver;
        }
        config
    }

    /// Persist `graph` as the session graph.
    ///
    /// # Errors
    ///
    /// Lock or I/O failures; the previous graph file is left in place.
    pub fn save_graph(&self, graph: &FlowGraph) -> Result<(), StoreError> {
        self.graph_store().write(&StoredGraph::from(graph))
    }

    /// A session holding the persisted graph, or an empty session when
    /// nothing has been uploaded yet.
    ///
    /// # Errors
    ///
    /// [`SessionLoadError`] on store failures or a stored edge list that no
    /// longer validates.
    pub fn load_session(
        &self,
        config: CurrentFlowConfig,
    ) -> Result<AnalysisSession, SessionLoadError> {
        let session = AnalysisSession::new(config);
        let store = self.graph_store();
        if let Some(stored) = store.read_optional::<StoredGraph>()? {
            let graph = session
                .build(&stored.edges)
                .map_err(|source| SessionLoadError::Invalid {
                    path: store.path().to_path_buf(),
                    source,
                })?;
            if graph.content_hash() != stored.content_hash {
                debug!(
                    stored = %stored.content_hash,
                    rebuilt = graph.content_hash(),
                    "stored hash differs from rebuilt graph"
                );
            }
        }
        Ok(session)
    }
}
