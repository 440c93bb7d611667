//! A topology and its path cache, edited together.
//!
//! [`Network`] is the only way to edit a topology that has a cache: every
//! edit runs in a [`Transaction`] against a private copy, and the cache is
//! invalidated once per transaction with the merged change set. A failing
//! edit discards the copy, so neither the topology nor the cache ever see
//! half of a transaction.
//!
//! ```
//! use cabletrace::domain::{Cable, CableId, CableStatus, Parent, Termination, TerminationId};
//! use cabletrace::network::Network;
//!
//! let mut network = Network::default();
//! let a: TerminationId = "interface:1".parse().unwrap();
//! let b: TerminationId = "interface:2".parse().unwrap();
//!
//! let report = network.transaction(|tx| {
//!     tx.add_termination(Termination::interface(1, "eth0", Parent::Device(1)))?;
//!     tx.add_termination(Termination::interface(2, "eth0", Parent::Device(2)))?;
//!     tx.add_cable(Cable::new(CableId(1), CableStatus::Connected, vec![a], vec![b]))
//! })?;
//!
//! assert_eq!(report.created, vec![a, b]);
//! # Ok::<(), cabletrace::Error>(())
//! ```

use crate::cache::{PathCache, RebuildOutcome, RebuildReport};
use crate::domain::{Cable, CableId, CablePath, CableStatus, Termination, TerminationId};
use crate::error::Result;
use crate::events::{ChangeSet, TopologySubscriber};
use crate::topology::Topology;
use crate::trace::{TraceOptions, trace};
use tracing::debug;

/// A topology plus the paths cached for it.
#[derive(Debug, Clone, Default)]
pub struct Network {
    topology: Topology,
    cache: PathCache,
}

/// Edits staged inside [`Network::transaction`].
///
/// Each edit is validated immediately against the staged topology, so later
/// edits in the same transaction see earlier ones.
#[derive(Debug)]
pub struct Transaction<'a> {
    topology: &'a mut Topology,
    changes: ChangeSet,
}

impl Transaction<'_> {
    /// The staged topology
    #[must_use]
    pub fn topology(&self) -> &Topology {
        self.topology
    }

    /// Stage [`Topology::add_termination`].
    ///
    /// # Errors
    ///
    /// Returns the validation error; the transaction is then aborted by `?`.
    pub fn add_termination(&mut self, termination: Termination) -> Result<()> {
        let event = self.topology.add_termination(termination)?;
        self.changes.merge(event);
        Ok(())
    }

    /// Stage [`Topology::remove_termination`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TerminationNotFound`] if `id` does not exist.
    pub fn remove_termination(&mut self, id: TerminationId) -> Result<()> {
        let event = self.topology.remove_termination(id)?;
        self.changes.merge(event);
        Ok(())
    }

    /// Stage [`Topology::add_cable`].
    ///
    /// # Errors
    ///
    /// Returns the validation error.
    pub fn add_cable(&mut self, cable: Cable) -> Result<()> {
        let event = self.topology.add_cable(cable)?;
        self.changes.merge(event);
        Ok(())
    }

    /// Stage [`Topology::remove_cable`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CableNotFound`] if `id` does not exist.
    pub fn remove_cable(&mut self, id: CableId) -> Result<()> {
        let event = self.topology.remove_cable(id)?;
        self.changes.merge(event);
        Ok(())
    }

    /// Stage [`Topology::set_cable_status`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CableNotFound`] if `id` does not exist.
    pub fn set_cable_status(&mut self, id: CableId, status: CableStatus) -> Result<()> {
        let event = self.topology.set_cable_status(id, status)?;
        self.changes.merge(event);
        Ok(())
    }

    /// Stage [`Topology::remap_front_port`].
    ///
    /// # Errors
    ///
    /// Returns the validation error.
    pub fn remap_front_port(
        &mut self,
        front: TerminationId,
        rear_port: u64,
        position: u16,
    ) -> Result<()> {
        let event = self.topology.remap_front_port(front, rear_port, position)?;
        self.changes.merge(event);
        Ok(())
    }
}

impl Network {
    /// An empty network tracing with `options`.
    #[must_use]
    pub fn new(options: TraceOptions) -> Self {
        Self {
            topology: Topology::new(),
            cache: PathCache::new(options),
        }
    }

    /// Assemble a network from a loaded topology and cache.
    ///
    /// The cache is trusted as-is; call [`Network::rebuild_all`] if it may be stale.
    #[must_use]
    pub fn from_parts(topology: Topology, cache: PathCache) -> Self {
        Self { topology, cache }
    }

    /// The current topology
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// The path cache
    #[must_use]
    pub fn cache(&self) -> &PathCache {
        &self.cache
    }

    /// Run `edit` as one unit and invalidate the cache once for all of it.
    ///
    /// # Errors
    ///
    /// Returns the first error `edit` returns. Nothing is applied in that case.
    pub fn transaction<F>(&mut self, edit: F) -> Result<RebuildReport>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<()>,
    {
        let mut draft = self.topology.clone();
        let mut tx = Transaction {
            topology: &mut draft,
            changes: ChangeSet::default(),
        };
        edit(&mut tx)?;
        let changes = tx.changes;

        self.topology = draft;
        if changes.is_empty() {
            return Ok(RebuildReport::default());
        }
        debug!(edits = changes.causes.len(), "Committed topology transaction");
        Ok(self.cache.on_change(&self.topology, &changes))
    }

    /// Add one termination.
    ///
    /// # Errors
    ///
    /// See [`Topology::add_termination`].
    pub fn add_termination(&mut self, termination: Termination) -> Result<RebuildReport> {
        self.transaction(|tx| tx.add_termination(termination))
    }

    /// Remove one termination (and, for a rear port, its front ports).
    ///
    /// # Errors
    ///
    /// See [`Topology::remove_termination`].
    pub fn remove_termination(&mut self, id: TerminationId) -> Result<RebuildReport> {
        self.transaction(|tx| tx.remove_termination(id))
    }

    /// Add one cable.
    ///
    /// # Errors
    ///
    /// See [`Topology::add_cable`].
    pub fn add_cable(&mut self, cable: Cable) -> Result<RebuildReport> {
        self.transaction(|tx| tx.add_cable(cable))
    }

    /// Remove one cable.
    ///
    /// # Errors
    ///
    /// See [`Topology::remove_cable`].
    pub fn remove_cable(&mut self, id: CableId) -> Result<RebuildReport> {
        self.transaction(|tx| tx.remove_cable(id))
    }

    /// Change one cable's status.
    ///
    /// # Errors
    ///
    /// See [`Topology::set_cable_status`].
    pub fn set_cable_status(&mut self, id: CableId, status: CableStatus) -> Result<RebuildReport> {
        self.transaction(|tx| tx.set_cable_status(id, status))
    }

    /// Move a front port to another rear port position.
    ///
    /// # Errors
    ///
    /// See [`Topology::remap_front_port`].
    pub fn remap_front_port(
        &mut self,
        front: TerminationId,
        rear_port: u64,
        position: u16,
    ) -> Result<RebuildReport> {
        self.transaction(|tx| tx.remap_front_port(front, rear_port, position))
    }

    /// Trace from `origin` without touching the cache.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TerminationNotFound`] if `origin` does not exist.
    pub fn trace(&self, origin: TerminationId) -> Result<CablePath> {
        Ok(trace(&self.topology, origin, self.cache.options())?)
    }

    /// Retrace one origin and store the result.
    ///
    /// # Errors
    ///
    /// See [`PathCache::rebuild`].
    pub fn rebuild(&mut self, origin: TerminationId) -> Result<RebuildOutcome> {
        self.cache.rebuild(&self.topology, origin)
    }

    /// Discard every stored path and trace every cabled endpoint again.
    pub fn rebuild_all(&mut self) -> RebuildReport {
        self.cache.rebuild_all(&self.topology)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Parent, TerminationKind};
    use crate::error::Error;

    fn iface(id: u64) -> TerminationId {
        TerminationId::new(TerminationKind::Interface, id)
    }

    fn two_interfaces() -> Network {
        let mut network = Network::default();
        network
            .transaction(|tx| {
                tx.add_termination(Termination::interface(1, "eth0", Parent::Device(1)))?;
                tx.add_termination(Termination::interface(2, "eth0", Parent::Device(2)))
            })
            .unwrap();
        network
    }

    #[test]
    fn cabling_creates_paths_in_both_directions() {
        let mut network = two_interfaces();

        let report = network
            .add_cable(Cable::new(CableId(1), CableStatus::Connected, vec![iface(1)], vec![iface(2)]))
            .unwrap();

        assert_eq!(report.created, vec![iface(1), iface(2)]);
        assert_eq!(network.cache().connected_endpoints(iface(1)), vec![iface(2)]);
        assert_eq!(network.cache().connected_endpoints(iface(2)), vec![iface(1)]);
    }

    #[test]
    fn failed_transactions_change_nothing() {
        let mut network = two_interfaces();
        let generation = network.topology().generation();

        let err = network
            .transaction(|tx| {
                tx.add_cable(Cable::new(CableId(1), CableStatus::Connected, vec![iface(1)], vec![iface(2)]))?;
                tx.remove_cable(CableId(7))
            })
            .unwrap_err();

        assert!(matches!(err, Error::CableNotFound(CableId(7))));
        assert_eq!(network.topology().generation(), generation);
        assert!(network.topology().cable(CableId(1)).is_none());
        assert!(network.cache().is_empty());
    }

    #[test]
    fn transactions_invalidate_once() {
        let mut network = two_interfaces();

        let report = network
            .transaction(|tx| {
                tx.add_cable(Cable::new(CableId(1), CableStatus::Planned, vec![iface(1)], vec![iface(2)]))?;
                tx.set_cable_status(CableId(1), CableStatus::Connected)
            })
            .unwrap();

        assert_eq!(report.rebuilt(), 2);
        assert!(network.cache().get(iface(1)).unwrap().is_active);
    }

    #[test]
    fn trace_does_not_touch_the_cache() {
        let mut network = two_interfaces();
        network
            .add_cable(Cable::new(CableId(1), CableStatus::Connected, vec![iface(1)], vec![iface(2)]))
            .unwrap();
        let stored = network.cache().get(iface(1)).cloned();

        let traced = network.trace(iface(1)).unwrap();

        assert_eq!(Some(traced), stored);
        assert!(matches!(
            network.trace(iface(9)),
            Err(Error::TerminationNotFound(_))
        ));
    }
}
