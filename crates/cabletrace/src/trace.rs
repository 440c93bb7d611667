//! The path tracer.
//!
//! Starting from an origin group, the tracer alternates two kinds of step:
//!
//! 1. **Cable hop**: the current terminations must share exactly one cable;
//!    the far end of that cable is recorded as a segment.
//! 2. **Internal hop**: the far terminations are followed through their
//!    fixed mapping (front to rear, rear to front, one circuit side to the
//!    other) to the terminations that continue the path.
//!
//! Tracing stops at true endpoints, at a dead end, at an ambiguity (split),
//! before revisiting a termination (cycle), or when the hop or time budget
//! runs out. None of these is an error; the reason is recorded on the path.
//!
//! # Position stack
//!
//! Rear ports with several positions multiplex front ports. Entering such a
//! rear port from a front port pushes that front port's position; leaving a
//! multi-position rear port through its front side pops one and continues
//! at the front port mapped there. A multi-position rear port reached with
//! nothing to pop has no determinate continuation and splits the path.

use crate::classify::classify;
use crate::domain::{
    CableHop, CableId, CablePath, PathSegment, SplitReason, StopReason, Termination,
    TerminationId, TerminationKind,
};
use crate::topology::Topology;
use std::collections::{BTreeSet, HashSet};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Default hop cap.
pub const DEFAULT_MAX_HOPS: usize = 256;

/// Default wall-clock budget per trace.
pub const DEFAULT_BUDGET: Duration = Duration::from_secs(1);

/// Limits applied to every trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceOptions {
    /// Maximum number of segments
    pub max_hops: usize,
    /// Wall-clock budget; `None` disables the check
    pub budget: Option<Duration>,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            max_hops: DEFAULT_MAX_HOPS,
            budget: Some(DEFAULT_BUDGET),
        }
    }
}

/// The topology changed under the tracer.
///
/// Traces run against an immutable snapshot, so these only occur when the
/// snapshot itself is inconsistent. Callers retry against a fresh snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    /// A termination referenced by the graph is missing
    #[error("termination {0} vanished during the trace")]
    MissingTermination(TerminationId),

    /// A cable referenced by the graph is missing
    #[error("cable {0} vanished during the trace")]
    MissingCable(CableId),
}

/// Trace the path starting at `origin`.
///
/// `origin` is expanded to its origin group, so every termination on the
/// same cable end with the same kind and parent shares the result.
///
/// # Errors
///
/// Returns a [`TraceError`] if the topology references data it does not hold.
pub fn trace(
    topology: &Topology,
    origin: TerminationId,
    options: &TraceOptions,
) -> Result<CablePath, TraceError> {
    if topology.termination(origin).is_none() {
        return Err(TraceError::MissingTermination(origin));
    }
    let origins = topology.origin_group(origin);
    Tracer::new(topology, options).run(origins)
}

/// Near terminations, far terminations and the cable between them.
type Hop = (Vec<TerminationId>, Vec<TerminationId>, CableHop);

/// What the internal hop produced.
enum Next {
    Continue(Vec<TerminationId>),
    Stop(StopReason),
}

struct Tracer<'a> {
    topology: &'a Topology,
    options: &'a TraceOptions,
    visited: HashSet<TerminationId>,
    segments: Vec<PathSegment>,
    positions: Vec<Vec<u16>>,
    started: Instant,
}

impl<'a> Tracer<'a> {
    fn new(topology: &'a Topology, options: &'a TraceOptions) -> Self {
        Self {
            topology,
            options,
            visited: HashSet::new(),
            segments: Vec::new(),
            positions: Vec::new(),
            started: Instant::now(),
        }
    }

    fn run(mut self, origins: Vec<TerminationId>) -> Result<CablePath, TraceError> {
        self.visited.extend(origins.iter().copied());
        let mut current = origins.clone();

        let stop = loop {
            let (near, far, hop) = match self.cable_hop(&current)? {
                Ok(hop) => hop,
                Err(stop) => break stop,
            };
            // Limits only bite when there is another cable to cross.
            if let Some(stop) = self.check_limits(&origins) {
                break stop;
            }

            let revisited = self.revisits(&far);
            if !revisited.is_empty() {
                warn!(origin = %origins[0], ?revisited, "Cable path loops back on itself");
                break StopReason::CycleDetected { revisited };
            }

            debug!(cable = %hop.id, near = near.len(), far = far.len(), "Recorded segment");
            self.visited.extend(far.iter().copied());
            self.segments.push(PathSegment {
                near,
                cable: hop,
                far: far.clone(),
            });

            if far.is_empty() {
                break StopReason::DeadEnd;
            }

            let next = match self.internal_hop(&far)? {
                Next::Continue(next) => next,
                Next::Stop(stop) => break stop,
            };

            let revisited = self.revisits(&next);
            if !revisited.is_empty() {
                warn!(origin = %origins[0], ?revisited, "Cable path loops back on itself");
                break StopReason::CycleDetected { revisited };
            }
            self.visited.extend(next.iter().copied());
            current = next;
        };

        let flags = classify(&self.segments, &stop);
        let destinations = match (&stop, self.segments.last()) {
            (StopReason::Endpoint, Some(last)) => last.far.clone(),
            _ => Vec::new(),
        };
        debug!(
            origin = %origins[0],
            segments = self.segments.len(),
            stop = stop.as_str(),
            "Traced cable path"
        );

        Ok(CablePath {
            origins,
            segments: self.segments,
            destinations,
            stop,
            is_complete: flags.is_complete,
            is_active: flags.is_active,
            is_split: flags.is_split,
        })
    }

    fn check_limits(&self, origins: &[TerminationId]) -> Option<StopReason> {
        if self.segments.len() >= self.options.max_hops {
            warn!(origin = %origins[0], limit = self.options.max_hops, "Hop limit exceeded");
            return Some(StopReason::HopLimitExceeded {
                limit: self.options.max_hops,
            });
        }
        if let Some(budget) = self.options.budget {
            if self.started.elapsed() >= budget {
                let budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
                warn!(origin = %origins[0], budget_ms, "Trace budget exceeded");
                return Some(StopReason::BudgetExceeded { budget_ms });
            }
        }
        None
    }

    /// Terminations in `set` already on the path.
    fn revisits(&self, set: &[TerminationId]) -> Vec<TerminationId> {
        set.iter()
            .copied()
            .filter(|t| self.visited.contains(t))
            .collect()
    }

    /// Cross the single cable shared by `current`.
    ///
    /// Members of `current` without a cable are dropped from the near end.
    /// The outer `Result` carries topology errors, the inner one a stop.
    fn cable_hop(&self, current: &[TerminationId]) -> Result<Result<Hop, StopReason>, TraceError> {
        let mut near = BTreeSet::new();
        let mut links = BTreeSet::new();
        for &termination in current {
            for link in self.topology.links(termination) {
                near.insert(termination);
                links.insert((link.cable, link.end));
            }
        }

        let cables: BTreeSet<_> = links.iter().map(|(cable, _)| *cable).collect();
        let mut ends = links.iter().map(|(_, end)| *end);
        let (Some(&cable_id), Some(end)) = (cables.first(), ends.next()) else {
            return Ok(Err(if self.segments.is_empty() {
                StopReason::DeadEnd
            } else {
                StopReason::UnterminatedPassThrough {
                    ports: current.to_vec(),
                }
            }));
        };
        if cables.len() > 1 || ends.next().is_some() {
            return Ok(Err(StopReason::Split {
                at: near.into_iter().collect(),
                reason: SplitReason::MultipleCables,
            }));
        }

        let cable = self
            .topology
            .cable(cable_id)
            .ok_or(TraceError::MissingCable(cable_id))?;
        let mut far = cable.end(end.opposite()).to_vec();
        far.sort();
        for &termination in &far {
            if self.topology.termination(termination).is_none() {
                return Err(TraceError::MissingTermination(termination));
            }
        }

        let hop = CableHop {
            id: cable.id,
            status: cable.status,
        };
        Ok(Ok((near.into_iter().collect(), far, hop)))
    }

    /// Follow the far end through its internal mapping.
    fn internal_hop(&mut self, far: &[TerminationId]) -> Result<Next, TraceError> {
        let kinds: BTreeSet<TerminationKind> = far.iter().map(|t| t.kind).collect();
        if kinds.len() > 1 {
            return Ok(Next::Stop(StopReason::Split {
                at: far.to_vec(),
                reason: SplitReason::MixedKinds,
            }));
        }

        match far[0].kind {
            TerminationKind::FrontPort => self.front_to_rear(far),
            TerminationKind::RearPort => self.rear_to_front(far),
            TerminationKind::CircuitTermination => Ok(self.across_circuit(far)),
            TerminationKind::ConsolePort
            | TerminationKind::ConsoleServerPort
            | TerminationKind::PowerPort
            | TerminationKind::PowerOutlet
            | TerminationKind::Interface
            | TerminationKind::PowerFeed => Ok(Next::Stop(StopReason::Endpoint)),
        }
    }

    fn front_to_rear(&mut self, fronts: &[TerminationId]) -> Result<Next, TraceError> {
        let mut rears = BTreeSet::new();
        let mut positions = Vec::new();
        for &front in fronts {
            let Some((rear, position)) = self.topology.rear_port_of(front) else {
                return Ok(Next::Stop(StopReason::NoInternalPeer {
                    port: front,
                    position: None,
                }));
            };
            rears.insert(rear);
            positions.push(position);
        }

        let mut multi_position = Vec::new();
        for &rear in &rears {
            match self.topology.termination(rear) {
                Some(Termination::RearPort(port)) if port.positions > 1 => {
                    multi_position.push(rear);
                }
                Some(_) => {}
                None => return Err(TraceError::MissingTermination(rear)),
            }
        }

        if !multi_position.is_empty() {
            if rears.len() > 1 {
                // Positions from different rear ports cannot share one stack level.
                return Ok(Next::Stop(StopReason::Split {
                    at: rears.into_iter().collect(),
                    reason: SplitReason::NoPosition,
                }));
            }
            positions.sort_unstable();
            positions.dedup();
            self.positions.push(positions);
        }
        Ok(Next::Continue(rears.into_iter().collect()))
    }

    fn rear_to_front(&mut self, rears: &[TerminationId]) -> Result<Next, TraceError> {
        let mut single_position = true;
        for &rear in rears {
            match self.topology.termination(rear) {
                Some(Termination::RearPort(port)) => single_position &= port.positions == 1,
                Some(_) => {}
                None => return Err(TraceError::MissingTermination(rear)),
            }
        }

        let positions = if single_position {
            vec![1]
        } else if let Some(positions) = self.positions.pop() {
            positions
        } else {
            return Ok(Next::Stop(StopReason::Split {
                at: rears.to_vec(),
                reason: SplitReason::NoPosition,
            }));
        };

        let topology = self.topology;
        let mut fronts: Vec<TerminationId> = rears
            .iter()
            .flat_map(|&rear| {
                positions
                    .iter()
                    .filter_map(move |&position| topology.front_port_at(rear, position))
            })
            .collect();
        fronts.sort();
        fronts.dedup();

        if fronts.is_empty() {
            return Ok(Next::Stop(StopReason::NoInternalPeer {
                port: rears[0],
                position: positions.first().copied(),
            }));
        }
        Ok(Next::Continue(fronts))
    }

    fn across_circuit(&self, terminations: &[TerminationId]) -> Next {
        let mut peers = BTreeSet::new();
        for &termination in terminations {
            let found = self.topology.circuit_peers(termination);
            match found.len() {
                0 => {
                    return Next::Stop(StopReason::NoInternalPeer {
                        port: termination,
                        position: None,
                    });
                }
                1 => peers.extend(found),
                _ => {
                    return Next::Stop(StopReason::Split {
                        at: vec![termination],
                        reason: SplitReason::MultipleCircuitPeers,
                    });
                }
            }
        }
        Next::Continue(peers.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cable, CableStatus, CircuitSide, Parent};
    use crate::topology::TopologyRecord;

    fn t(kind: TerminationKind, id: u64) -> TerminationId {
        TerminationId::new(kind, id)
    }

    fn iface(id: u64) -> TerminationId {
        t(TerminationKind::Interface, id)
    }

    fn front(id: u64) -> TerminationId {
        t(TerminationKind::FrontPort, id)
    }

    fn rear(id: u64) -> TerminationId {
        t(TerminationKind::RearPort, id)
    }

    fn cable(topology: &mut Topology, id: u64, a: Vec<TerminationId>, b: Vec<TerminationId>) {
        topology
            .add_cable(Cable::new(CableId(id), CableStatus::Connected, a, b))
            .unwrap();
    }

    /// Two patch panels joined by a 4-position trunk:
    ///
    /// ```text
    /// eth1 -- FP1(pos 1) \                    / FP11(pos 1) -- eth11
    ///                     RP1 ===trunk=== RP2
    /// eth2 -- FP2(pos 2) /                    \ FP12(pos 2) -- eth12
    /// ```
    fn trunked_panels() -> Topology {
        let mut topology = Topology::new();
        for (rp, device) in [(1, 10), (2, 20)] {
            topology
                .add_termination(Termination::rear_port(rp, format!("RP{rp}"), Parent::Device(device), 4))
                .unwrap();
        }
        for (fp, rp, device, position) in [(1, 1, 10, 1), (2, 1, 10, 2), (11, 2, 20, 1), (12, 2, 20, 2)] {
            topology
                .add_termination(Termination::front_port(
                    fp,
                    format!("FP{fp}"),
                    Parent::Device(device),
                    rp,
                    position,
                ))
                .unwrap();
        }
        for id in [1, 2, 11, 12] {
            topology
                .add_termination(Termination::interface(id, format!("eth{id}"), Parent::Device(id)))
                .unwrap();
        }
        cable(&mut topology, 1, vec![iface(1)], vec![front(1)]);
        cable(&mut topology, 2, vec![iface(2)], vec![front(2)]);
        cable(&mut topology, 3, vec![rear(1)], vec![rear(2)]);
        cable(&mut topology, 4, vec![front(11)], vec![iface(11)]);
        cable(&mut topology, 5, vec![front(12)], vec![iface(12)]);
        topology
    }

    #[test]
    fn positions_select_the_matching_front_port() {
        let topology = trunked_panels();

        let path = trace(&topology, iface(2), &TraceOptions::default()).unwrap();

        assert_eq!(path.stop, StopReason::Endpoint);
        assert_eq!(path.destinations, vec![iface(12)]);
        assert_eq!(path.segment_count(), 3);
        assert!(path.is_complete);
    }

    #[test]
    fn multi_position_rear_without_position_splits() {
        let mut topology = trunked_panels();
        topology
            .add_termination(Termination::interface(99, "probe", Parent::Device(99)))
            .unwrap();
        topology.remove_cable(CableId(3)).unwrap();
        cable(&mut topology, 6, vec![iface(99)], vec![rear(2)]);

        let path = trace(&topology, iface(99), &TraceOptions::default()).unwrap();

        assert!(path.is_split);
        assert_eq!(
            path.stop,
            StopReason::Split {
                at: vec![rear(2)],
                reason: SplitReason::NoPosition
            }
        );
        assert_eq!(path.segment_count(), 1);
    }

    #[test]
    fn unmapped_position_has_no_internal_peer() {
        let mut topology = trunked_panels();
        topology.remove_termination(front(12)).unwrap();

        let path = trace(&topology, iface(2), &TraceOptions::default()).unwrap();

        assert_eq!(
            path.stop,
            StopReason::NoInternalPeer {
                port: rear(2),
                position: Some(2)
            }
        );
        assert!(!path.is_complete);
        assert!(path.destinations.is_empty());
    }

    #[test]
    fn circuits_carry_the_path_to_the_far_side() {
        let mut topology = Topology::new();
        let a = t(TerminationKind::CircuitTermination, 1);
        let z = t(TerminationKind::CircuitTermination, 2);
        topology
            .add_termination(Termination::circuit_termination(1, "A", 7, CircuitSide::A))
            .unwrap();
        topology
            .add_termination(Termination::circuit_termination(2, "Z", 7, CircuitSide::Z))
            .unwrap();
        for id in [1, 2] {
            topology
                .add_termination(Termination::interface(id, format!("eth{id}"), Parent::Device(id)))
                .unwrap();
        }
        cable(&mut topology, 1, vec![iface(1)], vec![a]);
        cable(&mut topology, 2, vec![z], vec![iface(2)]);

        let path = trace(&topology, iface(1), &TraceOptions::default()).unwrap();

        assert!(path.is_complete);
        assert_eq!(path.destinations, vec![iface(2)]);
        assert_eq!(path.cables().collect::<Vec<_>>(), vec![CableId(1), CableId(2)]);
    }

    #[test]
    fn breakout_cable_reaches_every_far_termination() {
        let mut topology = Topology::new();
        for id in 1..=3 {
            topology
                .add_termination(Termination::interface(id, format!("eth{id}"), Parent::Device(id)))
                .unwrap();
        }
        cable(&mut topology, 1, vec![iface(1)], vec![iface(2), iface(3)]);

        let path = trace(&topology, iface(1), &TraceOptions::default()).unwrap();

        assert!(path.is_complete);
        assert!(!path.is_split);
        assert_eq!(path.destinations, vec![iface(2), iface(3)]);
    }

    #[test]
    fn mixed_far_kinds_split() {
        let (topology, _) = Topology::from_records([
            TopologyRecord::Termination(Termination::interface(1, "eth1", Parent::Device(1))),
            TopologyRecord::Termination(Termination::interface(2, "eth2", Parent::Device(2))),
            TopologyRecord::Termination(Termination::rear_port(1, "RP1", Parent::Device(3), 1)),
            TopologyRecord::Cable(Cable::new(
                CableId(1),
                CableStatus::Connected,
                vec![iface(1)],
                vec![iface(2), rear(1)],
            )),
        ]);

        let path = trace(&topology, iface(1), &TraceOptions::default()).unwrap();

        assert!(path.is_split);
        assert_eq!(path.segment_count(), 1);
        assert!(matches!(
            path.stop,
            StopReason::Split {
                reason: SplitReason::MixedKinds,
                ..
            }
        ));
    }

    #[test]
    fn hop_limit_stops_long_paths() {
        let topology = trunked_panels();
        let options = TraceOptions {
            max_hops: 2,
            budget: None,
        };

        let path = trace(&topology, iface(1), &options).unwrap();

        assert_eq!(path.stop, StopReason::HopLimitExceeded { limit: 2 });
        assert_eq!(path.segment_count(), 2);
        assert!(!path.is_complete);
    }

    #[test]
    fn zero_hop_limit_stops_before_the_first_cable() {
        let topology = trunked_panels();
        let options = TraceOptions {
            max_hops: 0,
            budget: None,
        };

        let path = trace(&topology, iface(1), &options).unwrap();

        assert_eq!(path.stop, StopReason::HopLimitExceeded { limit: 0 });
        assert_eq!(path.segment_count(), 0);
        assert!(!path.is_complete);
        assert!(!path.is_uncabled());
    }

    #[test]
    fn uncabled_origin_is_a_dead_end_whatever_the_limits() {
        let mut topology = Topology::new();
        topology
            .add_termination(Termination::interface(1, "eth1", Parent::Device(1)))
            .unwrap();
        let options = TraceOptions {
            max_hops: 0,
            budget: Some(Duration::ZERO),
        };

        let path = trace(&topology, iface(1), &options).unwrap();

        assert_eq!(path.stop, StopReason::DeadEnd);
        assert!(path.is_uncabled());
    }

    #[test]
    fn exhausted_budget_stops_the_trace() {
        let topology = trunked_panels();
        let options = TraceOptions {
            max_hops: DEFAULT_MAX_HOPS,
            budget: Some(Duration::ZERO),
        };

        let path = trace(&topology, iface(1), &options).unwrap();

        assert_eq!(path.stop, StopReason::BudgetExceeded { budget_ms: 0 });
        assert!(path.stop.is_integrity_condition());
        assert!(!path.is_complete);
        assert!(path.destinations.is_empty());
    }

    #[test]
    fn circuit_with_two_far_sides_splits() {
        let circuit = |id| t(TerminationKind::CircuitTermination, id);
        let (topology, warnings) = Topology::from_records([
            TopologyRecord::Termination(Termination::interface(1, "eth1", Parent::Device(1))),
            TopologyRecord::Termination(Termination::interface(2, "eth2", Parent::Device(2))),
            TopologyRecord::Termination(Termination::interface(3, "eth3", Parent::Device(3))),
            TopologyRecord::Termination(Termination::circuit_termination(1, "A", 7, CircuitSide::A)),
            TopologyRecord::Termination(Termination::circuit_termination(2, "Z1", 7, CircuitSide::Z)),
            TopologyRecord::Termination(Termination::circuit_termination(3, "Z2", 7, CircuitSide::Z)),
            TopologyRecord::Cable(Cable::new(CableId(1), CableStatus::Connected, vec![iface(1)], vec![circuit(1)])),
            TopologyRecord::Cable(Cable::new(CableId(2), CableStatus::Connected, vec![circuit(2)], vec![iface(2)])),
            TopologyRecord::Cable(Cable::new(CableId(3), CableStatus::Connected, vec![circuit(3)], vec![iface(3)])),
        ]);
        assert!(warnings.is_empty(), "{warnings:?}");

        let path = trace(&topology, iface(1), &TraceOptions::default()).unwrap();

        assert!(path.is_split);
        assert!(!path.is_complete);
        assert_eq!(
            path.stop,
            StopReason::Split {
                at: vec![circuit(1)],
                reason: SplitReason::MultipleCircuitPeers
            }
        );
        assert_eq!(path.segment_count(), 1);
    }

    #[test]
    fn unknown_origin_is_an_error() {
        let topology = Topology::new();

        let err = trace(&topology, iface(1), &TraceOptions::default()).unwrap_err();

        assert_eq!(err, TraceError::MissingTermination(iface(1)));
    }
}
