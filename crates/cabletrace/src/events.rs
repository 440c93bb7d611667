//! Typed topology change events.
//!
//! Every validated edit returns a [`TopologyChanged`] describing the nodes it
//! touched. The [`Network`](crate::network::Network) collects them into a
//! [`ChangeSet`] and hands the merged set to its subscriber (the path cache)
//! once per transaction, so a path touched by several edits in one
//! transaction is rebuilt once.

use crate::cache::RebuildReport;
use crate::domain::{CableId, NodeRef, TerminationId};
use crate::topology::Topology;
use std::collections::BTreeSet;
use std::fmt;

/// What kind of edit produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeCause {
    /// A cable was created
    CableCreated,
    /// A cable was deleted
    CableDeleted,
    /// A cable's status changed
    CableStatusChanged,
    /// A termination was created
    TerminationCreated,
    /// A termination was deleted
    TerminationDeleted,
    /// A front port was mapped to a different rear port position
    MappingChanged,
}

impl fmt::Display for ChangeCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::CableCreated => "cable created",
            Self::CableDeleted => "cable deleted",
            Self::CableStatusChanged => "cable status changed",
            Self::TerminationCreated => "termination created",
            Self::TerminationDeleted => "termination deleted",
            Self::MappingChanged => "mapping changed",
        };
        f.write_str(text)
    }
}

/// One topology edit and the nodes it touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyChanged {
    /// What happened
    pub cause: ChangeCause,
    /// Terminations whose cabling or mapping changed
    pub terminations: BTreeSet<TerminationId>,
    /// Cables created, deleted or modified
    pub cables: BTreeSet<CableId>,
    /// Terminations that no longer exist
    pub removed: BTreeSet<TerminationId>,
}

impl TopologyChanged {
    /// An event with no touched nodes yet.
    #[must_use]
    pub fn new(cause: ChangeCause) -> Self {
        Self {
            cause,
            terminations: BTreeSet::new(),
            cables: BTreeSet::new(),
            removed: BTreeSet::new(),
        }
    }

    /// Add touched terminations.
    #[must_use]
    pub fn with_terminations(mut self, ids: impl IntoIterator<Item = TerminationId>) -> Self {
        self.terminations.extend(ids);
        self
    }

    /// Add a touched cable.
    #[must_use]
    pub fn with_cable(mut self, id: CableId) -> Self {
        self.cables.insert(id);
        self
    }

    /// Add removed terminations (also counted as touched).
    #[must_use]
    pub fn with_removed(mut self, ids: impl IntoIterator<Item = TerminationId>) -> Self {
        for id in ids {
            self.terminations.insert(id);
            self.removed.insert(id);
        }
        self
    }
}

/// The merged effect of every edit in one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Causes, in the order the edits were applied
    pub causes: Vec<ChangeCause>,
    /// Every touched termination
    pub terminations: BTreeSet<TerminationId>,
    /// Every touched cable
    pub cables: BTreeSet<CableId>,
    /// Every removed termination
    pub removed: BTreeSet<TerminationId>,
}

impl ChangeSet {
    /// Fold one event into the set.
    pub fn merge(&mut self, event: TopologyChanged) {
        self.causes.push(event.cause);
        self.terminations.extend(event.terminations);
        self.cables.extend(event.cables);
        self.removed.extend(event.removed);
    }

    /// Returns `true` when no edit was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.causes.is_empty()
    }

    /// Every touched node.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.terminations
            .iter()
            .copied()
            .map(NodeRef::from)
            .chain(self.cables.iter().copied().map(NodeRef::from))
    }
}

impl From<TopologyChanged> for ChangeSet {
    fn from(event: TopologyChanged) -> Self {
        let mut set = Self::default();
        set.merge(event);
        set
    }
}

impl FromIterator<TopologyChanged> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = TopologyChanged>>(iter: I) -> Self {
        let mut set = Self::default();
        for event in iter {
            set.merge(event);
        }
        set
    }
}

/// Receives merged topology changes after a transaction commits.
pub trait TopologySubscriber {
    /// React to `changes`, already applied to `topology`.
    fn on_change(&mut self, topology: &Topology, changes: &ChangeSet) -> RebuildReport;
}
