//! Lenient topology loading.
//!
//! Snapshot files are written by this crate but may be edited by hand or
//! produced by other tools. Loading never fails on bad records: each
//! anomaly becomes a [`LoadWarning`] and the record is skipped, trimmed or
//! (for double-cabled terminations) kept as-is so the tracer reports it.

use super::Topology;
use crate::domain::{Cable, CableEnd, CableId, Termination, TerminationId, TerminationKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::warn;

/// One line of a topology snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum TopologyRecord {
    /// A termination
    Termination(Termination),
    /// A cable
    Cable(Cable),
}

/// An anomaly found while loading a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadWarning {
    /// A line could not be parsed
    Malformed(cabletrace_jsonl::Warning),

    /// A termination or cable id appeared twice; the later record was skipped
    DuplicateId {
        /// The repeated id
        id: String,
    },

    /// A cable references a termination that does not exist; the reference was dropped
    DanglingTermination {
        /// The cable
        cable: CableId,
        /// The missing termination
        termination: TerminationId,
    },

    /// A termination is claimed by more than one cable; all claims were kept
    DuplicateTermination {
        /// The termination
        termination: TerminationId,
        /// Every cable claiming it
        cables: Vec<CableId>,
    },

    /// A front port references a rear port that does not exist
    OrphanedFrontPort {
        /// The front port
        port: TerminationId,
        /// The missing rear port
        rear_port: TerminationId,
    },

    /// A stored path no longer fits the topology and was dropped
    StalePath {
        /// Origin of the dropped path
        origin: TerminationId,
        /// Why it was dropped
        reason: String,
    },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(warning) => write!(f, "{warning}"),
            Self::DuplicateId { id } => write!(f, "duplicate id {id}; later record skipped"),
            Self::DanglingTermination { cable, termination } => {
                write!(f, "cable {cable} references missing {termination}")
            }
            Self::DuplicateTermination { termination, cables } => {
                let cables: Vec<String> = cables.iter().map(ToString::to_string).collect();
                write!(f, "{termination} is on cables {}", cables.join(", "))
            }
            Self::OrphanedFrontPort { port, rear_port } => {
                write!(f, "{port} maps to missing {rear_port}")
            }
            Self::StalePath { origin, reason } => write!(f, "stale path from {origin}: {reason}"),
        }
    }
}

impl From<cabletrace_jsonl::Warning> for LoadWarning {
    fn from(warning: cabletrace_jsonl::Warning) -> Self {
        Self::Malformed(warning)
    }
}

impl Topology {
    /// Build a topology from snapshot records, reporting anomalies instead of failing.
    ///
    /// Records may appear in any order; terminations are placed before
    /// cables are attached.
    #[must_use]
    pub fn from_records(
        records: impl IntoIterator<Item = TopologyRecord>,
    ) -> (Self, Vec<LoadWarning>) {
        let mut topology = Self::new();
        let mut warnings = Vec::new();
        let mut cables = Vec::new();

        for record in records {
            match record {
                TopologyRecord::Termination(termination) => {
                    let id = termination.id();
                    if topology.terminations.contains_key(&id) {
                        warnings.push(LoadWarning::DuplicateId { id: id.to_string() });
                        continue;
                    }
                    topology.terminations.insert(id, termination);
                    topology.ensure_node(id.into());
                }
                TopologyRecord::Cable(cable) => cables.push(cable),
            }
        }

        let ids: Vec<TerminationId> = topology.terminations.keys().copied().collect();
        for id in ids {
            topology.relink(id);
            if let Some(Termination::FrontPort(front)) = topology.terminations.get(&id) {
                let rear_port = TerminationId::new(TerminationKind::RearPort, front.rear_port);
                if !topology.terminations.contains_key(&rear_port) {
                    warnings.push(LoadWarning::OrphanedFrontPort { port: id, rear_port });
                }
            }
        }

        let mut claims: BTreeMap<TerminationId, BTreeSet<CableId>> = BTreeMap::new();
        for mut cable in cables {
            if topology.cables.contains_key(&cable.id) {
                warnings.push(LoadWarning::DuplicateId {
                    id: format!("cable {}", cable.id),
                });
                continue;
            }
            let cable_id = cable.id;
            for end in [CableEnd::A, CableEnd::B] {
                let known = &topology.terminations;
                cable.end_mut(end).retain(|termination| {
                    let exists = known.contains_key(termination);
                    if !exists {
                        warnings.push(LoadWarning::DanglingTermination {
                            cable: cable_id,
                            termination: *termination,
                        });
                    }
                    exists
                });
            }
            for termination in cable.terminations() {
                claims.entry(termination).or_default().insert(cable.id);
            }
            topology.insert_cable(cable);
        }

        for (termination, cables) in claims {
            if cables.len() > 1 {
                warnings.push(LoadWarning::DuplicateTermination {
                    termination,
                    cables: cables.into_iter().collect(),
                });
            }
        }

        for warning in &warnings {
            warn!(%warning, "Topology snapshot anomaly");
        }
        topology.touch();
        (topology, warnings)
    }

    /// Snapshot records: terminations sorted by id, then cables sorted by id.
    #[must_use]
    pub fn records(&self) -> Vec<TopologyRecord> {
        self.terminations
            .values()
            .cloned()
            .map(TopologyRecord::Termination)
            .chain(self.cables.values().cloned().map(TopologyRecord::Cable))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CableStatus, Parent};

    fn iface(id: u64) -> TerminationId {
        TerminationId::new(TerminationKind::Interface, id)
    }

    fn iface_record(id: u64) -> TopologyRecord {
        TopologyRecord::Termination(Termination::interface(id, format!("eth{id}"), Parent::Device(id)))
    }

    fn cable_record(id: u64, a: TerminationId, b: TerminationId) -> TopologyRecord {
        TopologyRecord::Cable(Cable::new(CableId(id), CableStatus::Connected, vec![a], vec![b]))
    }

    #[test]
    fn records_load_in_any_order() {
        let (topology, warnings) = Topology::from_records([
            cable_record(1, iface(1), iface(2)),
            iface_record(2),
            iface_record(1),
        ]);

        assert!(warnings.is_empty());
        assert_eq!(topology.get_cable_peers(iface(1)), vec![iface(2)]);
    }

    #[test]
    fn dangling_references_are_dropped() {
        let (topology, warnings) =
            Topology::from_records([iface_record(1), cable_record(1, iface(1), iface(9))]);

        assert_eq!(
            warnings,
            vec![LoadWarning::DanglingTermination {
                cable: CableId(1),
                termination: iface(9)
            }]
        );
        assert!(topology.cable(CableId(1)).unwrap().b_terminations.is_empty());
    }

    #[test]
    fn double_cabled_terminations_are_kept() {
        let (topology, warnings) = Topology::from_records([
            iface_record(1),
            iface_record(2),
            iface_record(3),
            cable_record(1, iface(1), iface(2)),
            cable_record(2, iface(1), iface(3)),
        ]);

        assert_eq!(topology.links(iface(1)).len(), 2);
        assert!(matches!(
            &warnings[..],
            [LoadWarning::DuplicateTermination { termination, cables }]
                if *termination == iface(1) && cables.len() == 2
        ));
    }

    #[test]
    fn duplicate_ids_keep_the_first_record() {
        let first = Termination::interface(1, "first", Parent::Device(1));
        let (topology, warnings) = Topology::from_records([
            TopologyRecord::Termination(first.clone()),
            TopologyRecord::Termination(Termination::interface(1, "second", Parent::Device(1))),
        ]);

        assert_eq!(topology.termination(iface(1)), Some(&first));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn orphaned_front_ports_are_reported() {
        let (topology, warnings) = Topology::from_records([TopologyRecord::Termination(
            Termination::front_port(1, "FP1", Parent::Device(1), 5, 1),
        )]);

        let port = TerminationId::new(TerminationKind::FrontPort, 1);
        assert_eq!(topology.rear_port_of(port), None);
        assert!(matches!(&warnings[..], [LoadWarning::OrphanedFrontPort { .. }]));
    }

    #[test]
    fn records_round_trip_through_json() {
        let (topology, _) = Topology::from_records([
            iface_record(1),
            iface_record(2),
            cable_record(1, iface(1), iface(2)),
        ]);

        let lines: Vec<String> = topology
            .records()
            .iter()
            .map(|r| serde_json::to_string(r).unwrap())
            .collect();
        assert!(lines[0].starts_with(r#"{"record":"termination","kind":"interface""#));
        assert!(lines[2].starts_with(r#"{"record":"cable""#));

        let parsed: Vec<TopologyRecord> = lines
            .iter()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let (reloaded, warnings) = Topology::from_records(parsed);
        assert!(warnings.is_empty());
        assert_eq!(reloaded.records(), topology.records());
    }
}
