//! Validated topology edits.
//!
//! Each edit checks its preconditions before touching anything, so a
//! rejected edit leaves the topology unchanged. Successful edits bump the
//! generation and describe what they touched as a [`TopologyChanged`].

use super::Topology;
use crate::domain::{
    Cable, CableEnd, CableId, CableStatus, NodeRef, REARPORT_POSITIONS_MAX,
    REARPORT_POSITIONS_MIN, Termination, TerminationId, TerminationKind,
};
use crate::error::{Error, Result};
use crate::events::{ChangeCause, TopologyChanged};
use std::collections::BTreeSet;
use tracing::debug;

impl Topology {
    /// Add a termination.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateId`] if the id (or circuit side) is taken
    /// - [`Error::InvalidMapping`] if a port mapping is out of range or collides
    pub fn add_termination(&mut self, termination: Termination) -> Result<TopologyChanged> {
        let id = termination.id();
        if self.terminations.contains_key(&id) {
            return Err(Error::DuplicateId(id.to_string()));
        }
        self.validate_termination(&termination)?;

        self.insert_termination(termination);
        self.touch();
        debug!(termination = %id, "Added termination");

        let peers = self.internal_peers(id);
        Ok(TopologyChanged::new(ChangeCause::TerminationCreated)
            .with_terminations(std::iter::once(id).chain(peers)))
    }

    /// Remove a termination and everything that cannot exist without it.
    ///
    /// Removing a rear port also removes the front ports mapped to it. The
    /// termination is stripped from any cable it was on; the cable itself
    /// stays.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TerminationNotFound`] if `id` does not exist.
    pub fn remove_termination(&mut self, id: TerminationId) -> Result<TopologyChanged> {
        if !self.terminations.contains_key(&id) {
            return Err(Error::TerminationNotFound(id));
        }

        let mut removed = vec![id];
        if id.kind == TerminationKind::RearPort {
            removed.extend(self.front_ports_of(id).into_iter().map(|(_, front)| front));
        }

        let mut event = TopologyChanged::new(ChangeCause::TerminationDeleted);
        for &gone in &removed {
            event = event.with_terminations(self.internal_peers(gone));
            for link in self.links(gone) {
                if let Some(cable) = self.cables.get_mut(&link.cable) {
                    cable.end_mut(link.end).retain(|t| *t != gone);
                    event = event
                        .with_cable(link.cable)
                        .with_terminations(cable.terminations());
                }
            }
        }

        for &gone in &removed {
            self.terminations.remove(&gone);
            self.remove_node(NodeRef::Termination(gone));
        }
        // Peers across a circuit lose their edge with the node; nothing to relink.
        self.touch();
        debug!(termination = %id, cascaded = removed.len() - 1, "Removed termination");

        Ok(event.with_removed(removed))
    }

    /// Add a cable.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateId`] if the cable id is taken
    /// - [`Error::TerminationNotFound`] if an end references a missing termination
    /// - [`Error::TerminationOccupied`] if a termination is already cabled or marked connected
    /// - [`Error::InvalidCable`] for an empty end, mixed kinds on one end, a
    ///   termination on both ends, or a front port cabled to its own rear port
    /// - [`Error::IncompatibleTerminations`] if the two end kinds cannot be joined
    pub fn add_cable(&mut self, cable: Cable) -> Result<TopologyChanged> {
        if self.cables.contains_key(&cable.id) {
            return Err(Error::DuplicateId(format!("cable {}", cable.id)));
        }
        self.validate_cable(&cable)?;

        let event = TopologyChanged::new(ChangeCause::CableCreated)
            .with_cable(cable.id)
            .with_terminations(cable.terminations());
        debug!(cable = %cable.id, status = %cable.status, "Added cable");
        self.insert_cable(cable);
        self.touch();
        Ok(event)
    }

    /// Remove a cable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CableNotFound`] if `id` does not exist.
    pub fn remove_cable(&mut self, id: CableId) -> Result<TopologyChanged> {
        let cable = self.cables.remove(&id).ok_or(Error::CableNotFound(id))?;
        self.remove_node(NodeRef::Cable(id));
        self.touch();
        debug!(cable = %id, "Removed cable");

        Ok(TopologyChanged::new(ChangeCause::CableDeleted)
            .with_cable(id)
            .with_terminations(cable.terminations()))
    }

    /// Change a cable's status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CableNotFound`] if `id` does not exist.
    pub fn set_cable_status(&mut self, id: CableId, status: CableStatus) -> Result<TopologyChanged> {
        let cable = self.cables.get_mut(&id).ok_or(Error::CableNotFound(id))?;
        let previous = std::mem::replace(&mut cable.status, status);
        let event = TopologyChanged::new(ChangeCause::CableStatusChanged)
            .with_cable(id)
            .with_terminations(cable.terminations());
        self.touch();
        debug!(cable = %id, from = %previous, to = %status, "Changed cable status");
        Ok(event)
    }

    /// Map a front port to a different rear port position.
    ///
    /// # Errors
    ///
    /// - [`Error::TerminationNotFound`] if `front` does not exist
    /// - [`Error::InvalidMapping`] if `front` is not a front port or the new
    ///   mapping is invalid
    pub fn remap_front_port(
        &mut self,
        front: TerminationId,
        rear_port: u64,
        position: u16,
    ) -> Result<TopologyChanged> {
        let Some(Termination::FrontPort(current)) = self.terminations.get(&front) else {
            return match self.terminations.get(&front) {
                None => Err(Error::TerminationNotFound(front)),
                Some(_) => Err(Error::InvalidMapping {
                    port: front,
                    reason: "only front ports can be remapped".to_string(),
                }),
            };
        };

        let mut updated = current.clone();
        let old_rear = TerminationId::new(TerminationKind::RearPort, updated.rear_port);
        updated.rear_port = rear_port;
        updated.rear_port_position = position;
        let updated = Termination::FrontPort(updated);
        self.validate_termination(&updated)?;

        let new_rear = TerminationId::new(TerminationKind::RearPort, rear_port);
        let cabled_to_new_rear = self.cable_termination(front).is_some_and(|link| {
            self.cables
                .get(&link.cable)
                .is_some_and(|cable| cable.end(link.end.opposite()).contains(&new_rear))
        });
        if cabled_to_new_rear {
            return Err(Error::InvalidMapping {
                port: front,
                reason: format!("{new_rear} is cabled to this front port"),
            });
        }

        self.terminations.insert(front, updated);
        self.relink(front);
        self.touch();
        debug!(port = %front, rear = %new_rear, position, "Remapped front port");

        Ok(TopologyChanged::new(ChangeCause::MappingChanged)
            .with_terminations([front, old_rear, new_rear]))
    }

    pub(super) fn touch(&mut self) {
        self.generation += 1;
    }

    /// Store a termination and link it, without validation.
    pub(super) fn insert_termination(&mut self, termination: Termination) {
        let id = termination.id();
        self.terminations.insert(id, termination);
        self.ensure_node(NodeRef::Termination(id));
        self.relink(id);
    }

    /// Store a cable and attach it, without validation.
    pub(super) fn insert_cable(&mut self, cable: Cable) {
        self.attach_cable(&cable);
        self.cables.insert(cable.id, cable);
    }

    fn validate_termination(&self, termination: &Termination) -> Result<()> {
        let id = termination.id();
        match termination {
            Termination::FrontPort(front) => {
                let invalid = |reason: String| Error::InvalidMapping { port: id, reason };
                if !(REARPORT_POSITIONS_MIN..=REARPORT_POSITIONS_MAX)
                    .contains(&front.rear_port_position)
                {
                    return Err(invalid(format!(
                        "position {} outside {REARPORT_POSITIONS_MIN}..={REARPORT_POSITIONS_MAX}",
                        front.rear_port_position
                    )));
                }
                let rear_id = TerminationId::new(TerminationKind::RearPort, front.rear_port);
                let Some(Termination::RearPort(rear)) = self.terminations.get(&rear_id) else {
                    return Err(invalid(format!("{rear_id} does not exist")));
                };
                if rear.parent != front.parent {
                    return Err(invalid(format!("{rear_id} belongs to a different parent")));
                }
                if front.rear_port_position > rear.positions {
                    return Err(invalid(format!(
                        "position {} exceeds the {} positions of {rear_id}",
                        front.rear_port_position, rear.positions
                    )));
                }
                let taken = self
                    .front_port_at(rear_id, front.rear_port_position)
                    .filter(|taken| *taken != id);
                if let Some(taken) = taken {
                    return Err(invalid(format!(
                        "position {} of {rear_id} is already mapped to {taken}",
                        front.rear_port_position
                    )));
                }
            }
            Termination::RearPort(rear) => {
                if !(REARPORT_POSITIONS_MIN..=REARPORT_POSITIONS_MAX).contains(&rear.positions) {
                    return Err(Error::InvalidMapping {
                        port: id,
                        reason: format!(
                            "{} positions outside {REARPORT_POSITIONS_MIN}..={REARPORT_POSITIONS_MAX}",
                            rear.positions
                        ),
                    });
                }
            }
            Termination::CircuitTermination(ct) => {
                let taken = self.terminations.values().any(|t| {
                    matches!(t, Termination::CircuitTermination(other)
                        if other.circuit == ct.circuit && other.term_side == ct.term_side && other.id != ct.id)
                });
                if taken {
                    return Err(Error::DuplicateId(format!(
                        "circuit {} side {:?}",
                        ct.circuit, ct.term_side
                    )));
                }
            }
            Termination::Interface(iface) => {
                if iface.bridge == Some(iface.id) {
                    return Err(Error::InvalidMapping {
                        port: id,
                        reason: "an interface cannot be bridged to itself".to_string(),
                    });
                }
            }
            Termination::ConsolePort(_)
            | Termination::ConsoleServerPort(_)
            | Termination::PowerPort(_)
            | Termination::PowerOutlet(_)
            | Termination::PowerFeed(_) => {}
        }
        Ok(())
    }

    fn validate_cable(&self, cable: &Cable) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidCable {
            cable: cable.id,
            reason: reason.to_string(),
        };

        let mut seen = BTreeSet::new();
        let mut end_kinds = [None, None];
        for (slot, end) in [CableEnd::A, CableEnd::B].into_iter().enumerate() {
            let terminations = cable.end(end);
            if terminations.is_empty() {
                return Err(invalid(&format!("the {end} end has no terminations")));
            }
            for &id in terminations {
                if !seen.insert(id) {
                    return Err(invalid(&format!("{id} appears more than once")));
                }
                let termination = self
                    .terminations
                    .get(&id)
                    .ok_or(Error::TerminationNotFound(id))?;
                if termination.mark_connected() {
                    return Err(Error::TerminationOccupied {
                        termination: id,
                        reason: "marked connected".to_string(),
                    });
                }
                if let Some(link) = self.cable_termination(id) {
                    return Err(Error::TerminationOccupied {
                        termination: id,
                        reason: format!("already on cable {}", link.cable),
                    });
                }
                let kind = *end_kinds[slot].get_or_insert(id.kind);
                if kind != id.kind {
                    return Err(invalid(&format!("the {end} end mixes {kind} and {}", id.kind)));
                }
            }
        }

        if let [Some(a), Some(b)] = end_kinds {
            if !a.compatible_with(b) {
                return Err(Error::IncompatibleTerminations { a, b });
            }
        }

        for (near, far) in [(CableEnd::A, CableEnd::B), (CableEnd::B, CableEnd::A)] {
            for &id in cable.end(near) {
                let own_rear = self
                    .rear_port_of(id)
                    .is_some_and(|(rear, _)| cable.end(far).contains(&rear));
                if own_rear {
                    return Err(invalid(&format!("{id} cannot be cabled to its own rear port")));
                }
            }
        }
        Ok(())
    }
}
