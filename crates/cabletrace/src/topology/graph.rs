//! Low-level graph maintenance for [`Topology`].
//!
//! Edges are derived data: `relink` recomputes the internal (non-cable)
//! edges of a termination from the termination records, and cable edges are
//! added when a cable is attached. Nothing outside this module touches
//! `graph` or `node_map` directly.

use super::Topology;
use crate::domain::{
    Cable, CableEnd, CableId, CircuitSide, NodeRef, Termination, TerminationId, TerminationKind,
};
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::EdgeRef;

/// Edge weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Link {
    /// Termination sits on this end of the cable
    Attached(CableEnd),
    /// Front port to rear port at a position
    Internal { position: u16 },
    /// Opposite sides of one circuit
    Circuit,
}

impl Link {
    fn is_internal(self) -> bool {
        matches!(self, Self::Internal { .. } | Self::Circuit)
    }
}

impl Topology {
    /// Neighbours of `node` with the edge joining them.
    pub(super) fn neighbors(&self, node: NodeRef) -> impl Iterator<Item = (NodeRef, Link)> + '_ {
        let index = self.node_map.get(&node).copied();
        index.into_iter().flat_map(move |index| {
            self.graph.edges(index).map(move |edge| {
                let other = if edge.source() == index {
                    edge.target()
                } else {
                    edge.source()
                };
                (self.graph[other], *edge.weight())
            })
        })
    }

    pub(super) fn ensure_node(&mut self, node: NodeRef) -> NodeIndex {
        if let Some(&index) = self.node_map.get(&node) {
            return index;
        }
        let index = self.graph.add_node(node);
        self.node_map.insert(node, index);
        index
    }

    pub(super) fn remove_node(&mut self, node: NodeRef) {
        if let Some(index) = self.node_map.remove(&node) {
            self.graph.remove_node(index);
        }
    }

    /// Add the `Attached` edges for every termination on `cable`.
    ///
    /// Terminations missing from the topology are skipped; the lenient
    /// loader strips them before calling this.
    pub(super) fn attach_cable(&mut self, cable: &Cable) {
        let cable_index = self.ensure_node(NodeRef::Cable(cable.id));
        for end in [CableEnd::A, CableEnd::B] {
            for &termination in cable.end(end) {
                if let Some(&index) = self.node_map.get(&NodeRef::Termination(termination)) {
                    self.graph.add_edge(index, cable_index, Link::Attached(end));
                }
            }
        }
    }

    /// Remove the `Attached` edge between `termination` and `cable`.
    pub(super) fn detach(&mut self, termination: TerminationId, cable: CableId) {
        let (Some(&t), Some(&c)) = (
            self.node_map.get(&NodeRef::Termination(termination)),
            self.node_map.get(&NodeRef::Cable(cable)),
        ) else {
            return;
        };
        while let Some(edge) = self.graph.find_edge(t, c) {
            self.graph.remove_edge(edge);
        }
    }

    /// Recompute the internal edges of `id` from the termination records.
    pub(super) fn relink(&mut self, id: TerminationId) {
        let Some(&index) = self.node_map.get(&NodeRef::Termination(id)) else {
            return;
        };

        let stale: Vec<_> = self
            .graph
            .edges(index)
            .filter(|edge| edge.weight().is_internal())
            .map(|edge| edge.id())
            .collect();
        for edge in stale {
            self.graph.remove_edge(edge);
        }

        for (peer, link) in self.internal_links_of(id) {
            if let Some(&peer_index) = self.node_map.get(&NodeRef::Termination(peer)) {
                self.graph.add_edge(index, peer_index, link);
            }
        }
    }

    /// Internal edges `id` should have, according to the records.
    fn internal_links_of(&self, id: TerminationId) -> Vec<(TerminationId, Link)> {
        match self.terminations.get(&id) {
            Some(Termination::FrontPort(front)) => {
                let rear = TerminationId::new(TerminationKind::RearPort, front.rear_port);
                if self.terminations.contains_key(&rear) {
                    vec![(
                        rear,
                        Link::Internal {
                            position: front.rear_port_position,
                        },
                    )]
                } else {
                    Vec::new()
                }
            }
            Some(Termination::RearPort(rear)) => self
                .terminations
                .values()
                .filter_map(|t| match t {
                    Termination::FrontPort(front) if front.rear_port == rear.id => Some((
                        t.id(),
                        Link::Internal {
                            position: front.rear_port_position,
                        },
                    )),
                    _ => None,
                })
                .collect(),
            Some(Termination::CircuitTermination(ct)) => {
                let side: CircuitSide = ct.term_side.opposite();
                self.terminations
                    .values()
                    .filter_map(|t| match t {
                        Termination::CircuitTermination(peer)
                            if peer.circuit == ct.circuit && peer.term_side == side =>
                        {
                            Some((t.id(), Link::Circuit))
                        }
                        _ => None,
                    })
                    .collect()
            }
            _ => Vec::new(),
        }
    }
}
