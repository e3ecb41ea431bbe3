use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ErrorCode;

/// Directory (relative to the project root) holding config and session files.
pub const OHM_DIR: &str = ".ohm";

/// A config file exists but cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } | Self::Parse { .. } => ErrorCode::ConfigParseError,
        }
    }

    /// Path of the offending file.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// How accumulated per-edge current is scaled before it is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scale {
    /// Divide by `(n-1)(n-2)`, the networkx normalized edge betweenness.
    #[default]
    Normalized,
    /// Divide by the number of node pairs `n(n-1)/2`.
    PairAverage,
    /// Sum of absolute currents over all node pairs.
    Raw,
}

impl Scale {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normalized => "normalized",
            Self::PairAverage => "pair-average",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normalized" => Ok(Self::Normalized),
            "pair-average" | "average" => Ok(Self::PairAverage),
            "raw" => Ok(Self::Raw),
            other => Err(format!(
                "unknown scale {other:?} (expected normalized, pair-average or raw)"
            )),
        }
    }
}

/// Linear-system strategy for the potentials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Solver {
    /// Invert the grounded Laplacian once and reuse it for every pair.
    #[default]
    Pseudoinverse,
    /// Solve one right-hand side per node pair.
    PerPair,
}

impl Solver {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pseudoinverse => "pseudoinverse",
            Self::PerPair => "per-pair",
        }
    }
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Solver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pseudoinverse" | "pinv" => Ok(Self::Pseudoinverse),
            "per-pair" | "pair" => Ok(Self::PerPair),
            other => Err(format!(
                "unknown solver {other:?} (expected pseudoinverse or per-pair)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub scale: Scale,
    #[serde(default)]
    pub solver: Solver,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Upper bound on node count for a single computation. `0` disables it.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            scale: Scale::default(),
            solver: Solver::default(),
            tolerance: default_tolerance(),
            max_nodes: default_max_nodes(),
        }
    }
}

impl AnalysisConfig {
    /// The node bound as an option, `None` when disabled.
    #[must_use]
    pub const fn node_limit(&self) -> Option<usize> {
        if self.max_nodes == 0 {
            None
        } else {
            Some(self.max_nodes)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_selection_file")]
    pub selection_file: String,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            selection_file: default_selection_file(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// Read a TOML config file, or the type's defaults if it does not exist.
fn load_toml<T: Default + serde::de::DeserializeOwned>(path: PathBuf) -> Result<T, ConfigError> {
    if !path.exists() {
        return Ok(T::default());
    }

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(source) => return Err(ConfigError::Read { path, source }),
    };

    toml::from_str::<T>(&content).map_err(|source| ConfigError::Parse { path, source })
}

/// Load `.ohm/config.toml` under `project_root`.
///
/// # Errors
///
/// [`ConfigError`] if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig, ConfigError> {
    load_toml(project_root.join(OHM_DIR).join("config.toml"))
}

/// Load `ohm/config.toml` from the platform config directory.
///
/// # Errors
///
/// [`ConfigError`] if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig, ConfigError> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    load_toml(config_dir.join("ohm/config.toml"))
}

/// Merge project config, user config, `FORMAT` and the `--json` flag.
///
/// # Errors
///
/// [`ConfigError`] from either config file.
pub fn resolve_config(
    project_root: &Path,
    cli_json: bool,
) -> Result<EffectiveConfig, ConfigError> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.clone(), env_format);

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_format: Option<String>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

const fn default_tolerance() -> f64 {
    1e-9
}

const fn default_max_nodes() -> usize {
    2000
}

fn default_selection_file() -> String {
    "saved_configuration.json".to_string()
}

const fn default_lock_timeout_ms() -> u64 {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir must be created");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.analysis.scale, Scale::Normalized);
        assert_eq!(cfg.analysis.solver, Solver::Pseudoinverse);
        assert!((cfg.analysis.tolerance - 1e-9).abs() < f64::EPSILON);
        assert_eq!(cfg.analysis.node_limit(), Some(2000));
        assert_eq!(cfg.storage.selection_file, "saved_configuration.json");
    }

    #[test]
    fn partial_project_config_fills_defaults() {
        let root = tempfile::tempdir().expect("temp dir must be created");
        let dir = root.path().join(OHM_DIR);
        std::fs::create_dir_all(&dir).expect("create .ohm");
        std::fs::write(
            dir.join("config.toml"),
            "[analysis]\nscale = \"raw\"\nsolver = \"per-pair\"\nmax_nodes = 0\n",
        )
        .expect("write config");

        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.analysis.scale, Scale::Raw);
        assert_eq!(cfg.analysis.solver, Solver::PerPair);
        assert_eq!(cfg.analysis.node_limit(), None);
        assert_eq!(cfg.storage.lock_timeout_ms, 2000);
    }

    #[test]
    fn malformed_project_config_is_an_error() {
        let root = tempfile::tempdir().expect("temp dir must be created");
        let dir = root.path().join(OHM_DIR);
        std::fs::create_dir_all(&dir).expect("create .ohm");
        std::fs::write(dir.join("config.toml"), "[analysis\nscale = ").expect("write config");

        let err = load_project_config(root.path()).expect_err("parse must fail");
        assert!(err.to_string().contains("Failed to parse"));
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.code(), ErrorCode::ConfigParseError);
        assert_eq!(err.path(), dir.join("config.toml"));
    }

    #[test]
    fn unknown_scale_in_config_is_a_parse_error() {
        let root = tempfile::tempdir().expect("temp dir must be created");
        let dir = root.path().join(OHM_DIR);
        std::fs::create_dir_all(&dir).expect("create .ohm");
        std::fs::write(dir.join("config.toml"), "[analysis]\nscale = \"cubic\"\n")
            .expect("write config");

        let err = resolve_config(root.path(), true).expect_err("bad scale must fail");
        assert_eq!(err.code().code(), "E1001");
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        let output = resolve_output(true, Some("pretty".to_string()), Some("text".to_string()));
        assert_eq!(output, "json");
    }

    #[test]
    fn env_wins_over_user_config() {
        let output = resolve_output(false, Some("json".to_string()), Some("human".to_string()));
        assert_eq!(output, "pretty");

        let text = resolve_output(false, Some("human".to_string()), Some("table".to_string()));
        assert_eq!(text, "text");
    }

    #[test]
    fn scale_and_solver_parse_aliases() {
        assert_eq!("Normalized".parse::<Scale>(), Ok(Scale::Normalized));
        assert_eq!("average".parse::<Scale>(), Ok(Scale::PairAverage));
        assert_eq!("pinv".parse::<Solver>(), Ok(Solver::Pseudoinverse));
        assert_eq!("per-pair".parse::<Solver>(), Ok(Solver::PerPair));
        assert!("cubic".parse::<Scale>().is_err());
        assert_eq!(Scale::PairAverage.to_string(), "pair-average");
    }
}
