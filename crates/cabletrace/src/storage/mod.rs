//! Persistence of topology snapshots and cached paths.
//!
//! Two backends implement [`SnapshotStore`]:
//!
//! - [`JsonlStore`]: two JSON Lines files, one for the topology and one for
//!   the cached paths, replaced atomically on save
//! - [`MemoryStore`]: ephemeral, for tests and embedding
//!
//! Both files are written in sorted order so an unchanged network saves to
//! byte-identical files.
//!
//! # Example
//!
//! ```no_run
//! use cabletrace::storage::{JsonlStore, open_network, save_network};
//! use cabletrace::trace::TraceOptions;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let store = JsonlStore::new(".cabletrace/topology.jsonl", ".cabletrace/paths.jsonl");
//!     let (mut network, warnings) = open_network(&store, TraceOptions::default()).await?;
//!     for warning in &warnings {
//!         eprintln!("warning: {warning}");
//!     }
//!
//!     network.rebuild_all();
//!     save_network(&store, &network).await?;
//!     Ok(())
//! }
//! ```

mod jsonl;
mod memory;

pub use jsonl::JsonlStore;
pub use memory::MemoryStore;

use crate::cache::PathCache;
use crate::domain::CablePath;
use crate::error::Result;
use crate::network::Network;
use crate::topology::{LoadWarning, Topology, TopologyRecord};
use crate::trace::TraceOptions;
use async_trait::async_trait;
use tracing::info;

/// A place topology snapshots and cached paths are kept.
///
/// Loads are lenient: records that cannot be parsed come back as
/// [`LoadWarning`]s next to whatever did parse.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read every topology record.
    async fn load_topology(&self) -> Result<(Vec<TopologyRecord>, Vec<LoadWarning>)>;

    /// Replace the stored topology.
    async fn save_topology(&self, records: Vec<TopologyRecord>) -> Result<()>;

    /// Read every cached path.
    async fn load_paths(&self) -> Result<(Vec<CablePath>, Vec<LoadWarning>)>;

    /// Replace the stored paths.
    async fn save_paths(&self, paths: Vec<CablePath>) -> Result<()>;
}

/// Load a network from `store`.
///
/// Stored paths that no longer fit the loaded topology are dropped with a
/// [`LoadWarning::StalePath`]; they are not retraced here.
///
/// # Errors
///
/// Returns an error if the store cannot be read at all.
pub async fn open_network<S: SnapshotStore + ?Sized>(
    store: &S,
    options: TraceOptions,
) -> Result<(Network, Vec<LoadWarning>)> {
    let (records, mut warnings) = store.load_topology().await?;
    let (topology, topology_warnings) = Topology::from_records(records);
    warnings.extend(topology_warnings);

    let (paths, path_warnings) = store.load_paths().await?;
    warnings.extend(path_warnings);
    let mut cache = PathCache::new(options);
    warnings.extend(cache.restore(paths, &topology));

    info!(
        terminations = topology.termination_count(),
        cables = topology.cable_count(),
        paths = cache.len(),
        warnings = warnings.len(),
        "Loaded network"
    );
    Ok((Network::from_parts(topology, cache), warnings))
}

/// Save `network` to `store`.
///
/// # Errors
///
/// Returns an error if either write fails. The topology is written first.
pub async fn save_network<S: SnapshotStore + ?Sized>(store: &S, network: &Network) -> Result<()> {
    store.save_topology(network.topology().records()).await?;
    store.save_paths(network.cache().export()).await?;
    info!(
        terminations = network.topology().termination_count(),
        paths = network.cache().len(),
        "Saved network"
    );
    Ok(())
}
