//! In-memory topology and the graph accessor the tracer walks.
//!
//! # Graph Representation
//!
//! Terminations and cables are both nodes of an undirected petgraph
//! `StableGraph`. Three kinds of edge connect them:
//!
//! - `Attached(end)`: termination to cable, tagged with the cable end
//! - `Internal { position }`: front port to its rear port
//! - `Circuit`: A-side circuit termination to the Z side of the same circuit
//!
//! `StableGraph` keeps node indices valid across removals, so `node_map`
//! never needs rebuilding after an edit.
//!
//! # Mutation
//!
//! Two paths exist. The validated API in `mutation.rs` rejects anything a
//! careful operator would never enter (double-cabled terminations,
//! incompatible kinds, impossible port mappings) and returns a typed
//! [`TopologyChanged`](crate::events::TopologyChanged) event. The lenient
//! loader in `load.rs` accepts whatever a snapshot file contains and reports
//! anomalies as [`LoadWarning`]s, so the tracer can surface bad data as
//! split or incomplete paths instead of refusing to start.

mod graph;
mod load;
mod mutation;
mod shared;

pub use load::{LoadWarning, TopologyRecord};
pub use shared::{SharedTopology, TopologySource};

use crate::domain::{
    Cable, CableId, CableTermination, NodeRef, Termination, TerminationId, TerminationKind,
};
use graph::Link;
use petgraph::stable_graph::{NodeIndex, StableUnGraph};
use std::collections::{BTreeMap, HashMap};

/// Which cables [`Topology::get_link`] may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkScope {
    /// Any cable, whatever its status
    #[default]
    All,
    /// Only cables with status `connected`
    ActiveOnly,
}

/// The cabling topology: terminations, cables and the graph joining them.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// Terminations by id
    terminations: BTreeMap<TerminationId, Termination>,

    /// Cables by id
    cables: BTreeMap<CableId, Cable>,

    /// Undirected graph over terminations and cables.
    graph: StableUnGraph<NodeRef, Link>,

    /// Mapping from node to graph index.
    ///
    /// Every termination in `terminations` and every cable in `cables` has
    /// an entry.
    node_map: HashMap<NodeRef, NodeIndex>,

    /// Bumped by every mutation
    generation: u64,
}

impl Topology {
    /// An empty topology
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic edit counter; equal generations mean an identical topology.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Look up a termination
    #[must_use]
    pub fn termination(&self, id: TerminationId) -> Option<&Termination> {
        self.terminations.get(&id)
    }

    /// Look up a cable
    #[must_use]
    pub fn cable(&self, id: CableId) -> Option<&Cable> {
        self.cables.get(&id)
    }

    /// All terminations, sorted by id
    pub fn terminations(&self) -> impl Iterator<Item = &Termination> {
        self.terminations.values()
    }

    /// All cables, sorted by id
    pub fn cables(&self) -> impl Iterator<Item = &Cable> {
        self.cables.values()
    }

    /// Number of terminations
    #[must_use]
    pub fn termination_count(&self) -> usize {
        self.terminations.len()
    }

    /// Number of cables
    #[must_use]
    pub fn cable_count(&self) -> usize {
        self.cables.len()
    }

    /// Every cable end `termination` sits on, sorted.
    ///
    /// The validated API keeps this to at most one entry. Snapshots loaded
    /// leniently may contain more, which the tracer reports as a split.
    #[must_use]
    pub fn links(&self, termination: TerminationId) -> Vec<CableTermination> {
        let mut links: Vec<CableTermination> = self
            .neighbors(NodeRef::Termination(termination))
            .filter_map(|(node, link)| match (node, link) {
                (NodeRef::Cable(cable), Link::Attached(end)) => Some(CableTermination {
                    cable,
                    end,
                    termination,
                }),
                _ => None,
            })
            .collect();
        links.sort();
        links
    }

    /// The cable end `termination` sits on, if any.
    #[must_use]
    pub fn cable_termination(&self, termination: TerminationId) -> Option<CableTermination> {
        self.links(termination).into_iter().next()
    }

    /// The cable attached to `termination`.
    ///
    /// Returns `None` when unconnected, or when `scope` is
    /// [`LinkScope::ActiveOnly`] and the cable is not connected. The tracer
    /// uses [`LinkScope::All`] so inactive cables still appear on paths.
    #[must_use]
    pub fn get_link(&self, termination: TerminationId, scope: LinkScope) -> Option<&Cable> {
        let link = self.cable_termination(termination)?;
        let cable = self.cables.get(&link.cable)?;
        match scope {
            LinkScope::All => Some(cable),
            LinkScope::ActiveOnly => cable.status.is_connected().then_some(cable),
        }
    }

    /// Terminations on the opposite end of the cable(s) attached to `termination`.
    ///
    /// Empty if unconnected.
    #[must_use]
    pub fn get_cable_peers(&self, termination: TerminationId) -> Vec<TerminationId> {
        let mut peers: Vec<TerminationId> = self
            .links(termination)
            .into_iter()
            .filter_map(|link| {
                self.cables
                    .get(&link.cable)
                    .map(|cable| cable.end(link.end.opposite()).to_vec())
            })
            .flatten()
            .collect();
        peers.sort();
        peers.dedup();
        peers
    }

    /// The fixed internal peer of a front or rear port.
    ///
    /// A front port maps to its rear port. A rear port maps to the front
    /// port at position 1, and only when it has a single position; with
    /// several positions the peer depends on how the trace arrived and
    /// is resolved by [`Topology::front_port_at`]. Other kinds have no peer.
    #[must_use]
    pub fn get_internal_peer(&self, termination: TerminationId) -> Option<TerminationId> {
        match self.terminations.get(&termination)? {
            Termination::FrontPort(_) => self.rear_port_of(termination).map(|(rear, _)| rear),
            Termination::RearPort(rear) if rear.positions == 1 => {
                self.front_port_at(termination, 1)
            }
            _ => None,
        }
    }

    /// The rear port (and position on it) a front port relays to.
    #[must_use]
    pub fn rear_port_of(&self, front: TerminationId) -> Option<(TerminationId, u16)> {
        if front.kind != TerminationKind::FrontPort {
            return None;
        }
        self.neighbors(NodeRef::Termination(front))
            .find_map(|(node, link)| match (node, link) {
                (NodeRef::Termination(rear), Link::Internal { position }) => Some((rear, position)),
                _ => None,
            })
    }

    /// The front port mapped to `position` on `rear`.
    #[must_use]
    pub fn front_port_at(&self, rear: TerminationId, position: u16) -> Option<TerminationId> {
        self.front_ports_of(rear)
            .into_iter()
            .find_map(|(p, front)| (p == position).then_some(front))
    }

    /// Every front port mapped to `rear`, as `(position, front)` sorted by position.
    #[must_use]
    pub fn front_ports_of(&self, rear: TerminationId) -> Vec<(u16, TerminationId)> {
        if rear.kind != TerminationKind::RearPort {
            return Vec::new();
        }
        let mut fronts: Vec<(u16, TerminationId)> = self
            .neighbors(NodeRef::Termination(rear))
            .filter_map(|(node, link)| match (node, link) {
                (NodeRef::Termination(front), Link::Internal { position }) => {
                    Some((position, front))
                }
                _ => None,
            })
            .collect();
        fronts.sort();
        fronts
    }

    /// Terminations on the other side of the circuit `termination` belongs to.
    #[must_use]
    pub fn circuit_peers(&self, termination: TerminationId) -> Vec<TerminationId> {
        let mut peers: Vec<TerminationId> = self
            .neighbors(NodeRef::Termination(termination))
            .filter_map(|(node, link)| match (node, link) {
                (NodeRef::Termination(peer), Link::Circuit) => Some(peer),
                _ => None,
            })
            .collect();
        peers.sort();
        peers
    }

    /// Every termination reachable from `termination` without crossing a
    /// cable: all front ports of a rear port, the rear port of a front port,
    /// the far side of a circuit.
    #[must_use]
    pub fn internal_peers(&self, termination: TerminationId) -> Vec<TerminationId> {
        let mut peers: Vec<TerminationId> = self
            .neighbors(NodeRef::Termination(termination))
            .filter_map(|(node, link)| match (node, link) {
                (NodeRef::Termination(peer), Link::Internal { .. } | Link::Circuit) => Some(peer),
                _ => None,
            })
            .collect();
        peers.sort();
        peers
    }

    /// The origin group of `termination`: every termination on the same
    /// cable end with the same kind and parent, sorted.
    ///
    /// An unconnected termination is a group of one.
    #[must_use]
    pub fn origin_group(&self, termination: TerminationId) -> Vec<TerminationId> {
        let Some(origin) = self.terminations.get(&termination) else {
            return vec![termination];
        };
        let Some(link) = self.cable_termination(termination) else {
            return vec![termination];
        };
        let Some(cable) = self.cables.get(&link.cable) else {
            return vec![termination];
        };

        let mut group: Vec<TerminationId> = cable
            .end(link.end)
            .iter()
            .copied()
            .filter(|id| {
                self.terminations.get(id).is_some_and(|member| {
                    member.kind() == origin.kind() && member.parent() == origin.parent()
                })
            })
            .collect();
        if !group.contains(&termination) {
            group.push(termination);
        }
        group.sort();
        group.dedup();
        group
    }
}
