//! In-memory backend.

use super::SnapshotStore;
use crate::domain::CablePath;
use crate::error::Result;
use crate::topology::{LoadWarning, TopologyRecord};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    records: Vec<TopologyRecord>,
    paths: Vec<CablePath>,
}

/// Snapshot store that lives only as long as the process.
///
/// Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// An empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load_topology(&self) -> Result<(Vec<TopologyRecord>, Vec<LoadWarning>)> {
        Ok((self.inner.lock().await.records.clone(), Vec::new()))
    }

    async fn save_topology(&self, records: Vec<TopologyRecord>) -> Result<()> {
        self.inner.lock().await.records = records;
        Ok(())
    }

    async fn load_paths(&self) -> Result<(Vec<CablePath>, Vec<LoadWarning>)> {
        Ok((self.inner.lock().await.paths.clone(), Vec::new()))
    }

    async fn save_paths(&self, mut paths: Vec<CablePath>) -> Result<()> {
        paths.sort_by(|a, b| a.origins.cmp(&b.origins));
        self.inner.lock().await.paths = paths;
        Ok(())
    }
}
