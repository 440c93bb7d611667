//! The path cache: one stored path per origin group, kept consistent with
//! topology edits.
//!
//! ## Indexing
//!
//! Every stored path is indexed under each node it touches, plus the
//! internal peers of its pass-through ports and the terminations named by
//! its stop reason. The extra entries make invalidation conservative: a
//! path that stopped *next to* a changed node (say, at a rear port whose
//! front port just got cabled) is rebuilt too.
//!
//! ## Batching
//!
//! [`PathCache::invalidate_affected`] takes the merged [`ChangeSet`] of a
//! whole transaction and rebuilds each affected origin group exactly once.
//! A failure for one origin is recorded in the [`RebuildReport`] and does
//! not stop the rest of the batch.

use crate::domain::{CablePath, NodeRef, StopReason, TerminationId};
use crate::error::{Error, RebuildFailure, Result};
use crate::events::{ChangeSet, TopologySubscriber};
use crate::topology::{LoadWarning, Topology, TopologySource};
use crate::trace::{TraceOptions, trace};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Attempts made before a rebuild gives up on a topology that keeps changing.
const MAX_REBUILD_ATTEMPTS: u32 = 2;

/// What a single rebuild did to the stored path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// A path was stored where none existed
    Created,
    /// The stored path was replaced by a different one
    Updated,
    /// The new trace matched the stored path
    Unchanged,
    /// The origin is no longer cabled; its stored path was deleted
    Removed,
}

/// Summary of a batch rebuild.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebuildReport {
    /// Origins whose path was created
    pub created: Vec<TerminationId>,
    /// Origins whose path changed
    pub updated: Vec<TerminationId>,
    /// Origins whose path was retraced without change
    pub unchanged: Vec<TerminationId>,
    /// Origins whose path was deleted
    pub removed: Vec<TerminationId>,
    /// Origins whose rebuild failed
    pub failures: Vec<RebuildFailure>,
    /// Rebuilt paths that stopped on a data-integrity condition
    pub conditions: Vec<(TerminationId, StopReason)>,
}

impl RebuildReport {
    /// File `origin` under the list matching `outcome`.
    pub fn record(&mut self, origin: TerminationId, outcome: RebuildOutcome) {
        match outcome {
            RebuildOutcome::Created => self.created.push(origin),
            RebuildOutcome::Updated => self.updated.push(origin),
            RebuildOutcome::Unchanged => self.unchanged.push(origin),
            RebuildOutcome::Removed => self.removed.push(origin),
        }
    }

    /// Number of origins retraced (successfully or not).
    #[must_use]
    pub fn rebuilt(&self) -> usize {
        self.created.len()
            + self.updated.len()
            + self.unchanged.len()
            + self.removed.len()
            + self.failures.len()
    }

    /// Returns `true` if nothing failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Total cable length of a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathLength {
    /// Sum of known cable lengths, in meters
    pub meters: f64,
    /// `false` if any cable on the path has no recorded length
    pub is_definitive: bool,
}

/// Stored paths and the indexes used to find them.
#[derive(Debug, Clone, Default)]
pub struct PathCache {
    options: TraceOptions,

    /// Paths keyed by primary (lowest) origin
    paths: BTreeMap<TerminationId, CablePath>,

    /// Every origin group member to its path key
    origin_index: HashMap<TerminationId, TerminationId>,

    /// Every indexed node to the keys of paths touching it
    node_index: HashMap<NodeRef, BTreeSet<TerminationId>>,
}

impl PathCache {
    /// An empty cache tracing with `options`.
    #[must_use]
    pub fn new(options: TraceOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Trace options used by rebuilds
    #[must_use]
    pub fn options(&self) -> &TraceOptions {
        &self.options
    }

    /// Number of stored paths
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if no path is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The stored path originating at `origin` (or at its origin group).
    #[must_use]
    pub fn get(&self, origin: TerminationId) -> Option<&CablePath> {
        self.origin_index
            .get(&origin)
            .and_then(|key| self.paths.get(key))
    }

    /// Every stored path, in origin order.
    pub fn paths(&self) -> impl Iterator<Item = &CablePath> {
        self.paths.values()
    }

    /// Stored paths that pass through `node`.
    #[must_use]
    pub fn paths_through(&self, node: NodeRef) -> Vec<&CablePath> {
        self.node_index
            .get(&node)
            .into_iter()
            .flatten()
            .filter_map(|key| self.paths.get(key))
            .filter(|path| path.contains(node))
            .collect()
    }

    /// Destinations of the path stored for `termination`; empty if none.
    #[must_use]
    pub fn connected_endpoints(&self, termination: TerminationId) -> Vec<TerminationId> {
        self.get(termination)
            .map(|path| path.destinations.clone())
            .unwrap_or_default()
    }

    /// Retrace from `origin` and replace the stored path.
    ///
    /// Idempotent: with no topology change in between, a second call
    /// returns [`RebuildOutcome::Unchanged`] and stores an identical path.
    ///
    /// # Errors
    ///
    /// - [`Error::TerminationNotFound`] if `origin` does not exist
    /// - [`Error::InvalidOrigin`] if `origin` is a pass-through port or circuit termination
    /// - [`Error::ConcurrentTopologyChange`] if the topology kept changing mid-trace
    pub fn rebuild<S: TopologySource>(
        &mut self,
        source: &S,
        origin: TerminationId,
    ) -> Result<RebuildOutcome> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let snapshot = source.snapshot();
            let generation = snapshot.generation();

            let termination = snapshot
                .termination(origin)
                .ok_or(Error::TerminationNotFound(origin))?;
            if !termination.kind().is_path_endpoint() {
                return Err(Error::InvalidOrigin(origin));
            }

            match trace(&snapshot, origin, &self.options) {
                Ok(path) if source.generation() == generation => {
                    return Ok(self.store(origin, path, &snapshot));
                }
                Ok(_) => debug!(%origin, attempts, "Topology changed during trace"),
                Err(err) => debug!(%origin, attempts, %err, "Trace hit inconsistent topology"),
            }

            if attempts >= MAX_REBUILD_ATTEMPTS {
                warn!(%origin, attempts, "Giving up on rebuild");
                return Err(Error::ConcurrentTopologyChange { origin, attempts });
            }
        }
    }

    /// Rebuild every stored path touched by `changes`, each exactly once.
    ///
    /// Paths whose origin was removed are deleted first; the remaining
    /// members of their origin groups are retraced.
    pub fn invalidate_affected<S: TopologySource>(
        &mut self,
        source: &S,
        changes: &ChangeSet,
    ) -> RebuildReport {
        let mut report = RebuildReport::default();
        let mut origins = BTreeSet::new();

        for &gone in &changes.removed {
            if let Some(path) = self.delete_for(gone) {
                report.removed.push(gone);
                origins.extend(path.origins.into_iter().filter(|o| *o != gone));
            }
        }

        {
            let snapshot = source.snapshot();
            let mut nodes: BTreeSet<NodeRef> = changes.nodes().collect();
            for &termination in &changes.terminations {
                nodes.extend(snapshot.internal_peers(termination).into_iter().map(NodeRef::from));
            }

            for node in &nodes {
                for key in self.node_index.get(node).into_iter().flatten() {
                    if let Some(path) = self.paths.get(key) {
                        origins.extend(path.origins.iter().copied());
                    }
                }
            }

            for &termination in &changes.terminations {
                let is_endpoint = snapshot
                    .termination(termination)
                    .is_some_and(|t| t.kind().is_path_endpoint());
                if is_endpoint {
                    origins.insert(termination);
                }
            }

            origins.retain(|origin| snapshot.termination(*origin).is_some());
        }

        let mut covered = BTreeSet::new();
        for origin in origins {
            if covered.contains(&origin) {
                continue;
            }
            match self.rebuild(source, origin) {
                Ok(outcome) => {
                    report.record(origin, outcome);
                    match self.get(origin) {
                        Some(path) => {
                            if path.stop.is_integrity_condition() {
                                report.conditions.push((origin, path.stop.clone()));
                            }
                            covered.extend(path.origins.iter().copied());
                        }
                        None => {
                            covered.insert(origin);
                        }
                    }
                }
                Err(err) => {
                    warn!(%origin, %err, "Path rebuild failed");
                    report.failures.push(RebuildFailure::from_error(origin, &err));
                    covered.insert(origin);
                }
            }
        }

        info!(
            causes = changes.causes.len(),
            rebuilt = report.rebuilt(),
            created = report.created.len(),
            updated = report.updated.len(),
            removed = report.removed.len(),
            failures = report.failures.len(),
            "Invalidated affected paths"
        );
        report
    }

    /// Delete the path whose origin group contains `termination`.
    ///
    /// Returns the deleted path, if there was one.
    pub fn delete_for(&mut self, termination: TerminationId) -> Option<CablePath> {
        let key = *self.origin_index.get(&termination)?;
        let path = self.unstore(key)?;
        debug!(origin = %termination, "Deleted stored path");
        Some(path)
    }

    /// Drop every stored path and trace every cabled endpoint again.
    pub fn rebuild_all<S: TopologySource>(&mut self, source: &S) -> RebuildReport {
        self.paths.clear();
        self.origin_index.clear();
        self.node_index.clear();

        let origins: Vec<TerminationId> = {
            let snapshot = source.snapshot();
            snapshot
                .terminations()
                .map(crate::domain::Termination::id)
                .filter(|id| id.kind.is_path_endpoint() && !snapshot.links(*id).is_empty())
                .collect()
        };

        let changes = ChangeSet {
            terminations: origins.into_iter().collect(),
            ..ChangeSet::default()
        };
        self.invalidate_affected(source, &changes)
    }

    /// Load previously stored paths, dropping any that no longer fit `topology`.
    pub fn restore(
        &mut self,
        paths: impl IntoIterator<Item = CablePath>,
        topology: &Topology,
    ) -> Vec<LoadWarning> {
        let mut warnings = Vec::new();
        for path in paths {
            let Some(origin) = path.primary_origin() else {
                continue;
            };
            let stale = |reason: &str| LoadWarning::StalePath {
                origin,
                reason: reason.to_string(),
            };
            match topology.termination(origin) {
                None => warnings.push(stale("origin no longer exists")),
                Some(t) if !t.kind().is_path_endpoint() => {
                    warnings.push(stale("origin cannot originate a path"));
                }
                Some(_) if path.origins.iter().any(|o| self.origin_index.contains_key(o)) => {
                    warnings.push(stale("origin already has a stored path"));
                }
                Some(_) if path.is_uncabled() => warnings.push(stale("origin has no cable")),
                Some(_) => {
                    self.insert(path, topology);
                }
            }
        }
        for warning in &warnings {
            warn!(%warning, "Dropped stored path");
        }
        warnings
    }

    /// Stored paths in origin order, ready for persisting.
    #[must_use]
    pub fn export(&self) -> Vec<CablePath> {
        self.paths.values().cloned().collect()
    }

    /// Store a fresh trace, replacing whatever its origin group had.
    fn store(&mut self, origin: TerminationId, path: CablePath, topology: &Topology) -> RebuildOutcome {
        let keys: BTreeSet<TerminationId> = path
            .origins
            .iter()
            .chain(std::iter::once(&origin))
            .filter_map(|member| self.origin_index.get(member).copied())
            .collect();

        if path.is_uncabled() {
            let mut removed = false;
            for key in keys {
                removed |= self.unstore(key).is_some();
            }
            return if removed {
                RebuildOutcome::Removed
            } else {
                RebuildOutcome::Unchanged
            };
        }

        let key = path.primary_origin().unwrap_or(origin);
        let previous_digest = self.paths.get(&key).map(CablePath::digest);
        if keys.len() == 1 && keys.contains(&key) && previous_digest == Some(path.digest()) {
            return RebuildOutcome::Unchanged;
        }

        let had_previous = !keys.is_empty();
        for key in keys {
            self.unstore(key);
        }
        self.insert(path, topology);
        if had_previous {
            RebuildOutcome::Updated
        } else {
            RebuildOutcome::Created
        }
    }

    fn insert(&mut self, path: CablePath, topology: &Topology) {
        let Some(key) = path.primary_origin() else {
            return;
        };
        for node in Self::index_nodes(&path, topology) {
            self.node_index.entry(node).or_default().insert(key);
        }
        for &member in &path.origins {
            self.origin_index.insert(member, key);
        }
        self.paths.insert(key, path);
    }

    fn unstore(&mut self, key: TerminationId) -> Option<CablePath> {
        let path = self.paths.remove(&key)?;
        self.origin_index.retain(|_, k| *k != key);
        self.node_index.retain(|_, keys| {
            keys.remove(&key);
            !keys.is_empty()
        });
        Some(path)
    }

    /// Nodes a path is indexed under.
    fn index_nodes(path: &CablePath, topology: &Topology) -> BTreeSet<NodeRef> {
        let mut nodes: BTreeSet<NodeRef> = path.nodes().collect();
        nodes.extend(path.origins.iter().copied().map(NodeRef::from));
        nodes.extend(path.stop.terminations().iter().copied().map(NodeRef::from));
        let peers: Vec<TerminationId> = path
            .terminations()
            .chain(path.stop.terminations().iter().copied())
            .flat_map(|t| topology.internal_peers(t))
            .collect();
        nodes.extend(peers.into_iter().map(NodeRef::from));
        nodes
    }
}

impl TopologySubscriber for PathCache {
    fn on_change(&mut self, topology: &Topology, changes: &ChangeSet) -> RebuildReport {
        self.invalidate_affected(topology, changes)
    }
}

/// Total length of the cables on `path`, normalised to meters.
#[must_use]
pub fn path_length(path: &CablePath, topology: &Topology) -> PathLength {
    let mut meters = 0.0;
    let mut is_definitive = true;
    for id in path.cables() {
        match topology.cable(id).and_then(|cable| cable.length) {
            Some(length) => meters += length.meters(),
            None => is_definitive = false,
        }
    }
    PathLength {
        meters,
        is_definitive,
    }
}

/// Front ports that could continue a path split at a multi-position rear port.
///
/// Empty unless the path stopped with no position to follow.
#[must_use]
pub fn split_candidates(path: &CablePath, topology: &Topology) -> Vec<TerminationId> {
    match &path.stop {
        StopReason::Split {
            at,
            reason: crate::domain::SplitReason::NoPosition,
        } => at
            .iter()
            .flat_map(|rear| topology.front_ports_of(*rear))
            .map(|(_, front)| front)
            .collect(),
        _ => Vec::new(),
    }
}

/// The stored path from `origin`, continued through bridged interfaces.
///
/// When a path ends at a single interface that is bridged to another
/// interface, the bridged interface's stored path is appended, and so on.
/// A bridge chain that loops back stops at the first repeat.
#[must_use]
pub fn full_trace(
    cache: &PathCache,
    topology: &Topology,
    origin: TerminationId,
) -> Vec<crate::domain::PathSegment> {
    use crate::domain::{Termination, TerminationKind};

    let mut segments = Vec::new();
    let mut seen = BTreeSet::new();
    let mut next = Some(origin);

    while let Some(current) = next.take() {
        if !seen.insert(current) {
            debug!(%current, "Bridge chain loops; stopping");
            break;
        }
        let Some(path) = cache.get(current) else {
            break;
        };
        segments.extend(path.segments.iter().cloned());

        if let [destination] = path.destinations.as_slice() {
            if let Some(Termination::Interface(iface)) = topology.termination(*destination) {
                next = iface
                    .bridge
                    .map(|bridge| TerminationId::new(TerminationKind::Interface, bridge));
            }
        }
    }
    segments
}
