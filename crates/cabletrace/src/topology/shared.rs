//! Snapshot access for readers that may race writers.

use super::Topology;
use crate::error::Result;
use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock};

/// Something a path rebuild can take a consistent topology snapshot from.
///
/// A rebuild records [`TopologySource::generation`] before tracing and
/// compares it afterwards; a mismatch means a writer got in between and the
/// trace is retried against a fresh snapshot.
pub trait TopologySource {
    /// A read-only view that stays consistent while held.
    type Snapshot<'a>: Deref<Target = Topology>
    where
        Self: 'a;

    /// Take a snapshot.
    fn snapshot(&self) -> Self::Snapshot<'_>;

    /// The current generation, read without taking a snapshot.
    fn generation(&self) -> u64;
}

impl TopologySource for Topology {
    type Snapshot<'a> = &'a Topology;

    fn snapshot(&self) -> &Topology {
        self
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

/// A topology shared between threads with copy-on-write updates.
///
/// Readers clone an `Arc` and never block writers for longer than the
/// pointer swap. Writers edit a private copy and publish it atomically, so
/// no reader ever sees a half-applied edit.
#[derive(Debug, Clone, Default)]
pub struct SharedTopology {
    inner: Arc<RwLock<Arc<Topology>>>,
}

impl SharedTopology {
    /// Share `topology`.
    #[must_use]
    pub fn new(topology: Topology) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(topology))),
        }
    }

    /// Apply `edit` to a copy of the topology and publish it if `edit` succeeds.
    ///
    /// On error the published topology is left untouched.
    ///
    /// # Errors
    ///
    /// Returns whatever `edit` returns.
    pub fn update<T>(&self, edit: impl FnOnce(&mut Topology) -> Result<T>) -> Result<T> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut draft = Topology::clone(&guard);
        let value = edit(&mut draft)?;
        *guard = Arc::new(draft);
        Ok(value)
    }
}

impl TopologySource for SharedTopology {
    type Snapshot<'a> = Arc<Topology>;

    fn snapshot(&self) -> Arc<Topology> {
        Arc::clone(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn generation(&self) -> u64 {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Parent, Termination, TerminationId, TerminationKind};
    use crate::error::Error;

    #[test]
    fn snapshots_survive_later_updates() {
        let shared = SharedTopology::new(Topology::new());
        let before = shared.snapshot();

        shared
            .update(|t| t.add_termination(Termination::interface(1, "eth0", Parent::Device(1))))
            .unwrap();

        assert_eq!(before.termination_count(), 0);
        assert_eq!(shared.snapshot().termination_count(), 1);
        assert!(shared.generation() > before.generation());
    }

    #[test]
    fn failed_updates_publish_nothing() {
        let shared = SharedTopology::new(Topology::new());
        let generation = shared.generation();

        let err = shared
            .update(|t| {
                t.add_termination(Termination::interface(1, "eth0", Parent::Device(1)))?;
                t.remove_termination(TerminationId::new(TerminationKind::Interface, 2))
            })
            .unwrap_err();

        assert!(matches!(err, Error::TerminationNotFound(_)));
        assert_eq!(shared.generation(), generation);
        assert_eq!(shared.snapshot().termination_count(), 0);
    }
}
