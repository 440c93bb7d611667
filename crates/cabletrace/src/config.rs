//! Configuration and workspace initialisation.
//!
//! A cabletrace workspace is a directory containing `.cabletrace/`:
//!
//! ```text
//! .cabletrace/
//! ├── config.yaml       # this module
//! ├── topology.jsonl    # terminations and cables
//! └── paths.jsonl       # cached paths
//! ```
//!
//! Keys are kebab-case:
//!
//! ```yaml
//! trace:
//!   max-hops: 256
//!   budget-ms: 1000
//! storage:
//!   topology-file: .cabletrace/topology.jsonl
//!   paths-file: .cabletrace/paths.jsonl
//! ```

use crate::error::{Error, Result};
use crate::storage::JsonlStore;
use crate::trace::{DEFAULT_MAX_HOPS, TraceOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Workspace directory name
pub const CABLETRACE_DIR_NAME: &str = ".cabletrace";

/// Config file name inside the workspace directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Default topology snapshot file name
pub const TOPOLOGY_FILE_NAME: &str = "topology.jsonl";

/// Default cached paths file name
pub const PATHS_FILE_NAME: &str = "paths.jsonl";

/// Parent directories searched for a workspace before giving up.
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Default per-rebuild budget in milliseconds.
pub const DEFAULT_BUDGET_MS: u64 = 1000;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CabletraceConfig {
    /// Tracing limits
    #[serde(default)]
    pub trace: TraceConfig,
    /// Snapshot locations
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Tracing limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TraceConfig {
    /// Maximum segments per path
    pub max_hops: usize,
    /// Wall-clock budget per rebuild; `0` disables the check
    pub budget_ms: u64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_hops: DEFAULT_MAX_HOPS,
            budget_ms: DEFAULT_BUDGET_MS,
        }
    }
}

/// Snapshot file locations, relative to the workspace root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Topology snapshot
    pub topology_file: String,
    /// Cached paths
    pub paths_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            topology_file: format!("{CABLETRACE_DIR_NAME}/{TOPOLOGY_FILE_NAME}"),
            paths_file: format!("{CABLETRACE_DIR_NAME}/{PATHS_FILE_NAME}"),
        }
    }
}

impl StorageConfig {
    /// A JSONL store for these files, resolved against `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a path escapes `root`.
    pub fn to_store(&self, root: &Path) -> Result<JsonlStore> {
        Ok(JsonlStore::new(
            resolve(root, &self.topology_file)?,
            resolve(root, &self.paths_file)?,
        ))
    }
}

fn resolve(root: &Path, relative: &str) -> Result<PathBuf> {
    let path = Path::new(relative);
    if path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(Error::Config(format!(
            "storage path must stay inside the workspace: {relative}"
        )));
    }
    Ok(root.join(path))
}

impl CabletraceConfig {
    /// Read and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// fails [`CabletraceConfig::validate`].
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Check limits are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `max-hops` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.trace.max_hops == 0 {
            return Err(Error::Config("trace.max-hops must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Tracing limits as [`TraceOptions`].
    #[must_use]
    pub fn trace_options(&self) -> TraceOptions {
        TraceOptions {
            max_hops: self.trace.max_hops,
            budget: (self.trace.budget_ms > 0).then(|| Duration::from_millis(self.trace.budget_ms)),
        }
    }
}

/// Files created by [`init`].
#[derive(Debug)]
pub struct InitResult {
    /// The `.cabletrace` directory
    pub cabletrace_dir: PathBuf,
    /// The config file
    pub config_file: PathBuf,
    /// The empty topology snapshot
    pub topology_file: PathBuf,
    /// The empty paths file
    pub paths_file: PathBuf,
}

/// Create a workspace in `base_dir` with default configuration.
///
/// # Errors
///
/// Returns [`Error::Config`] if `base_dir` already has a workspace, or an
/// I/O error if the files cannot be created.
pub async fn init(base_dir: &Path) -> Result<InitResult> {
    let cabletrace_dir = base_dir.join(CABLETRACE_DIR_NAME);
    if cabletrace_dir.exists() {
        return Err(Error::Config(format!(
            "already initialized: found existing '{CABLETRACE_DIR_NAME}'"
        )));
    }
    fs::create_dir_all(&cabletrace_dir).await?;

    let config = CabletraceConfig::default();
    let config_file = cabletrace_dir.join(CONFIG_FILE_NAME);
    config.save(&config_file).await?;

    let topology_file = resolve(base_dir, &config.storage.topology_file)?;
    let paths_file = resolve(base_dir, &config.storage.paths_file)?;
    fs::write(&topology_file, "").await?;
    fs::write(&paths_file, "").await?;

    Ok(InitResult {
        cabletrace_dir,
        config_file,
        topology_file,
        paths_file,
    })
}

/// Walk up from `start_dir` to the nearest directory containing `.cabletrace/`.
#[must_use]
pub fn find_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(CABLETRACE_DIR_NAME).is_dir() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_documented_values() {
        let config = CabletraceConfig::default();

        assert_eq!(config.trace.max_hops, 256);
        assert_eq!(config.trace.budget_ms, 1000);
        assert_eq!(config.storage.topology_file, ".cabletrace/topology.jsonl");
        assert_eq!(config.trace_options(), TraceOptions::default());
    }

    #[test]
    fn zero_budget_disables_the_check() {
        let mut config = CabletraceConfig::default();
        config.trace.budget_ms = 0;

        assert_eq!(config.trace_options().budget, None);
    }

    #[tokio::test]
    async fn save_then_load_preserves_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        let mut original = CabletraceConfig::default();
        original.trace.max_hops = 32;

        original.save(&path).await.unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let loaded = CabletraceConfig::load(&path).await.unwrap();

        assert!(content.contains("max-hops: 32"));
        assert!(content.contains("paths-file: .cabletrace/paths.jsonl"));
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn partial_config_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        tokio::fs::write(&path, "trace:\n  max-hops: 8\n  budget-ms: 50\n")
            .await
            .unwrap();

        let loaded = CabletraceConfig::load(&path).await.unwrap();

        assert_eq!(loaded.trace.max_hops, 8);
        assert_eq!(loaded.storage, StorageConfig::default());
    }

    #[tokio::test]
    async fn zero_hops_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        tokio::fs::write(&path, "trace:\n  max-hops: 0\n  budget-ms: 50\n")
            .await
            .unwrap();

        let err = CabletraceConfig::load(&path).await.unwrap_err();

        assert!(matches!(err, Error::Config(msg) if msg.contains("max-hops")));
    }

    #[rstest]
    #[case("/etc/topology.jsonl")]
    #[case("../outside.jsonl")]
    fn storage_paths_stay_inside_the_workspace(#[case] file: &str) {
        let storage = StorageConfig {
            topology_file: file.to_string(),
            ..StorageConfig::default()
        };

        assert!(storage.to_store(Path::new("/work")).is_err());
    }

    #[tokio::test]
    async fn init_creates_workspace_once() {
        let temp_dir = TempDir::new().unwrap();

        let result = init(temp_dir.path()).await.unwrap();

        assert!(result.config_file.exists());
        assert!(result.topology_file.exists());
        assert!(result.paths_file.exists());
        assert!(init(temp_dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn find_root_walks_up() {
        let temp_dir = TempDir::new().unwrap();
        init(temp_dir.path()).await.unwrap();
        let nested = temp_dir.path().join("a/b/c");
        tokio::fs::create_dir_all(&nested).await.unwrap();

        assert_eq!(find_root(&nested), Some(temp_dir.path().to_path_buf()));
    }

    #[test]
    fn find_root_gives_up_without_workspace() {
        let temp_dir = TempDir::new().unwrap();

        assert_eq!(find_root(temp_dir.path()), None);
    }
}
