//! Application context for CLI command execution.
//!
//! [`App`] finds the workspace, loads its configuration and network, and
//! saves the network back after an edit.

use crate::config::{CABLETRACE_DIR_NAME, CONFIG_FILE_NAME, CabletraceConfig, find_root};
use crate::error::{Error, Result};
use crate::network::Network;
use crate::storage::{JsonlStore, open_network, save_network};
use crate::topology::LoadWarning;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A loaded workspace.
#[derive(Debug)]
pub struct App {
    root: PathBuf,
    config: CabletraceConfig,
    store: JsonlStore,
    network: Network,
    warnings: Vec<LoadWarning>,
}

impl App {
    /// Load the workspace containing `working_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if no workspace is found above `working_dir`, the
    /// configuration is invalid, or the snapshot files cannot be read.
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root = find_root(working_dir).ok_or_else(|| {
            Error::Config(format!(
                "no {CABLETRACE_DIR_NAME} directory found; run `cabletrace init` first"
            ))
        })?;
        let config = CabletraceConfig::load(&root.join(CABLETRACE_DIR_NAME).join(CONFIG_FILE_NAME)).await?;
        let store = config.storage.to_store(&root)?;
        let (network, warnings) = open_network(&store, config.trace_options()).await?;
        for warning in &warnings {
            warn!(%warning, "Snapshot load warning");
        }

        Ok(Self {
            root,
            config,
            store,
            network,
            warnings,
        })
    }

    /// Workspace root (the directory containing `.cabletrace/`)
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loaded configuration
    #[must_use]
    pub fn config(&self) -> &CabletraceConfig {
        &self.config
    }

    /// The loaded network
    #[must_use]
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// The loaded network, for editing
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    /// Anomalies found while loading
    #[must_use]
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    /// Write the network back to the workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot files cannot be written.
    pub async fn save(&self) -> Result<()> {
        save_network(&self.store, &self.network).await
    }
}
