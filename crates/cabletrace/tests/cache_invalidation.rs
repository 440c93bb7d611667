//! Path cache consistency under topology edits.

mod common;

use cabletrace::cache::{PathCache, RebuildOutcome};
use cabletrace::domain::{
    Cable, CableId, CableStatus, NodeRef, Parent, StopReason, Termination, TerminationId,
};
use cabletrace::events::ChangeSet;
use cabletrace::network::Network;
use cabletrace::topology::{SharedTopology, Topology, TopologySource};
use cabletrace::trace::TraceOptions;
use common::{front, iface, rear};

fn connected(id: u64, a: TerminationId, b: TerminationId) -> Cable {
    Cable::new(CableId(id), CableStatus::Connected, vec![a], vec![b])
}

/// eth1 -- c1 -- RP1 => FP1 -- c2 -- eth2, plus an unrelated eth3 -- c3 -- eth4
fn campus() -> Network {
    let mut network = Network::default();
    network
        .transaction(|tx| {
            for id in 1..=4 {
                tx.add_termination(Termination::interface(id, format!("eth{id}"), Parent::Device(id)))?;
            }
            tx.add_termination(Termination::rear_port(1, "RP1", Parent::Device(10), 1))?;
            tx.add_termination(Termination::front_port(1, "FP1", Parent::Device(10), 1, 1))?;
            tx.add_cable(connected(1, iface(1), rear(1)))?;
            tx.add_cable(connected(2, front(1), iface(2)))?;
            tx.add_cable(connected(3, iface(3), iface(4)))
        })
        .unwrap();
    network
}

#[test]
fn one_transaction_rebuilds_each_origin_once() {
    let mut network = Network::default();

    let report = network
        .transaction(|tx| {
            tx.add_termination(Termination::interface(1, "eth1", Parent::Device(1)))?;
            tx.add_termination(Termination::interface(2, "eth2", Parent::Device(2)))?;
            tx.add_termination(Termination::rear_port(1, "RP1", Parent::Device(10), 1))?;
            tx.add_termination(Termination::front_port(1, "FP1", Parent::Device(10), 1, 1))?;
            tx.add_cable(connected(1, iface(1), rear(1)))?;
            tx.add_cable(connected(2, front(1), iface(2)))
        })
        .unwrap();

    assert_eq!(report.created, vec![iface(1), iface(2)]);
    assert_eq!(report.rebuilt(), 2);
    assert!(report.is_clean());
}

#[test]
fn unrelated_paths_are_left_alone() {
    let mut network = campus();
    let before = network.cache().get(iface(1)).unwrap().clone();

    let report = network
        .set_cable_status(CableId(3), CableStatus::Planned)
        .unwrap();

    assert!(!report.updated.contains(&iface(1)));
    assert!(!report.unchanged.contains(&iface(1)));
    assert!(report.updated.contains(&iface(3)));
    assert_eq!(network.cache().get(iface(1)), Some(&before));
    assert!(!network.cache().get(iface(3)).unwrap().is_active);
}

#[test]
fn removing_a_middle_cable_shortens_both_ends() {
    let mut network = campus();

    let report = network.remove_cable(CableId(2)).unwrap();

    let near = network.cache().get(iface(1)).unwrap();
    assert_eq!(near.segment_count(), 1);
    assert_eq!(
        near.stop,
        StopReason::UnterminatedPassThrough {
            ports: vec![front(1)]
        }
    );
    // eth2 lost its only cable, so it no longer has a path.
    assert!(network.cache().get(iface(2)).is_none());
    assert!(report.updated.contains(&iface(1)));
    assert!(report.removed.contains(&iface(2)));
    assert!(network.cache().paths_through(NodeRef::Cable(CableId(2))).is_empty());
}

#[test]
fn removing_an_origin_deletes_its_path() {
    let mut network = campus();

    let report = network.remove_termination(iface(4)).unwrap();

    assert!(report.removed.contains(&iface(4)));
    assert!(network.cache().get(iface(4)).is_none());
    let survivor = network.cache().get(iface(3)).unwrap();
    assert!(!survivor.is_complete);
    assert!(survivor.destinations.is_empty());
}

#[test]
fn failed_transaction_changes_nothing() {
    let mut network = campus();
    let paths_before = network.cache().export();
    let generation = network.topology().generation();

    let result = network.transaction(|tx| {
        tx.remove_cable(CableId(3))?;
        tx.add_cable(connected(9, iface(1), iface(99)))
    });

    assert!(result.is_err());
    assert!(network.topology().cable(CableId(3)).is_some());
    assert_eq!(network.topology().generation(), generation);
    assert_eq!(network.cache().export(), paths_before);
}

#[test]
fn rebuild_all_matches_incremental_maintenance() {
    let mut network = campus();
    network
        .add_termination(Termination::rear_port(2, "RP2", Parent::Device(10), 2))
        .unwrap();
    network.remap_front_port(front(1), 2, 2).unwrap();
    // RP1 lost its only front port.
    assert!(matches!(
        network.cache().get(iface(1)).unwrap().stop,
        StopReason::NoInternalPeer { port, .. } if port == rear(1)
    ));
    network.remove_cable(CableId(3)).unwrap();
    let incremental = network.cache().export();

    let report = network.rebuild_all();

    assert!(report.is_clean());
    assert_eq!(network.cache().export(), incremental);
}

#[test]
fn shared_topology_feeds_the_cache() {
    let shared = SharedTopology::new(Topology::new());
    shared
        .update(|t| {
            t.add_termination(Termination::interface(1, "eth1", Parent::Device(1)))?;
            t.add_termination(Termination::interface(2, "eth2", Parent::Device(2)))
        })
        .unwrap();
    let mut cache = PathCache::new(TraceOptions::default());
    let before = shared.snapshot();

    let event = shared.update(|t| t.add_cable(connected(1, iface(1), iface(2)))).unwrap();
    let report = cache.invalidate_affected(&shared, &ChangeSet::from(event));

    assert_eq!(report.created, vec![iface(1), iface(2)]);
    assert!(cache.get(iface(1)).unwrap().is_complete);
    // Snapshots taken earlier never see later edits.
    assert_eq!(before.cable_count(), 0);
    assert_eq!(
        cache.rebuild(&shared, iface(1)).unwrap(),
        RebuildOutcome::Unchanged
    );
}
