//! # Cabletrace: physical cable path tracing
//!
//! Cabletrace models the physical cabling of network infrastructure
//! (interfaces, console and power ports, patch-panel front/rear ports and
//! circuit terminations joined by cables) and answers one question well:
//! where does the signal leaving this port end up?
//!
//! ## Components
//!
//! - [`topology`]: read-only graph queries over terminations and cables,
//!   plus validated mutation that reports what changed.
//! - [`trace`]: walks from an origin through pass-through ports and
//!   produces an ordered list of path segments.
//! - [`classify`]: derives completeness, activeness and split status.
//! - [`cache`]: stores one path per origin and rebuilds exactly the paths
//!   a topology change can affect.
//! - [`network`]: applies edits and their invalidation as one unit.
//! - [`storage`]: JSON Lines snapshots of the topology and stored paths.
//!
//! ## Quick Start
//!
//! ```
//! use cabletrace::domain::{Cable, CableId, CableStatus, Parent, Termination, TerminationId};
//! use cabletrace::network::Network;
//!
//! let a: TerminationId = "interface:1".parse().unwrap();
//! let b: TerminationId = "interface:2".parse().unwrap();
//!
//! let mut network = Network::default();
//! network.add_termination(Termination::interface(1, "eth0", Parent::Device(1)))?;
//! network.add_termination(Termination::interface(2, "eth0", Parent::Device(2)))?;
//! network.add_cable(Cable::new(CableId(1), CableStatus::Connected, vec![a], vec![b]))?;
//!
//! let path = network.cache().get(a).unwrap();
//! assert!(path.is_complete);
//! assert_eq!(path.destinations, vec![b]);
//! # Ok::<(), cabletrace::Error>(())
//! ```

#![forbid(unsafe_code)]

pub mod app;
pub mod cache;
pub mod classify;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod network;
pub mod output;
pub mod storage;
pub mod topology;
pub mod trace;

pub use error::{Error, Result};
