//! JSON Lines backend.

use super::SnapshotStore;
use crate::domain::CablePath;
use crate::error::Result;
use crate::topology::{LoadWarning, TopologyRecord};
use async_trait::async_trait;
use cabletrace_jsonl::{read_jsonl_resilient, write_jsonl_atomic};
use serde::de::DeserializeOwned;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Topology and paths kept in two JSONL files.
///
/// A missing file loads as empty, so a freshly initialised directory needs
/// no seeding.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    topology_file: PathBuf,
    paths_file: PathBuf,
}

impl JsonlStore {
    /// Store backed by the given files.
    pub fn new(topology_file: impl Into<PathBuf>, paths_file: impl Into<PathBuf>) -> Self {
        Self {
            topology_file: topology_file.into(),
            paths_file: paths_file.into(),
        }
    }

    /// Topology snapshot file
    #[must_use]
    pub fn topology_file(&self) -> &Path {
        &self.topology_file
    }

    /// Cached paths file
    #[must_use]
    pub fn paths_file(&self) -> &Path {
        &self.paths_file
    }
}

async fn read_lenient<T: DeserializeOwned>(path: &Path) -> Result<(Vec<T>, Vec<LoadWarning>)> {
    match read_jsonl_resilient::<T, _>(path).await {
        Ok((values, warnings)) => {
            debug!(path = %path.display(), lines = values.len(), "Read JSONL file");
            Ok((values, warnings.into_iter().map(LoadWarning::from).collect()))
        }
        Err(cabletrace_jsonl::Error::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "JSONL file missing; treating as empty");
            Ok((Vec::new(), Vec::new()))
        }
        Err(err) => Err(err.into()),
    }
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

#[async_trait]
impl SnapshotStore for JsonlStore {
    async fn load_topology(&self) -> Result<(Vec<TopologyRecord>, Vec<LoadWarning>)> {
        read_lenient(&self.topology_file).await
    }

    async fn save_topology(&self, records: Vec<TopologyRecord>) -> Result<()> {
        ensure_parent(&self.topology_file).await?;
        write_jsonl_atomic(&self.topology_file, &records).await?;
        Ok(())
    }

    async fn load_paths(&self) -> Result<(Vec<CablePath>, Vec<LoadWarning>)> {
        read_lenient(&self.paths_file).await
    }

    async fn save_paths(&self, mut paths: Vec<CablePath>) -> Result<()> {
        paths.sort_by(|a, b| a.origins.cmp(&b.origins));
        ensure_parent(&self.paths_file).await?;
        write_jsonl_atomic(&self.paths_file, &paths).await?;
        Ok(())
    }
}
