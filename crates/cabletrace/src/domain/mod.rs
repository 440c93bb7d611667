//! Domain types for cable path tracing.
//!
//! - **Entities**: [`Termination`], [`Cable`] (topology, stored in snapshots)
//! - **Join**: [`CableTermination`] (which end of which cable a termination sits on)
//! - **Derived**: [`CablePath`] (traced and cached, never edited by hand)
//!
//! ## Identity
//!
//! A termination is identified by its kind and a numeric id, so an
//! interface and a front port may share the number `7` without colliding.
//! The textual form is `<kind>:<id>`, e.g. `interface:7` or `rear_port:3`.

mod cable;
mod path;
mod termination;

pub use cable::{Cable, CableEnd, CableId, CableLength, CableStatus, CableTermination, LengthUnit};
pub use path::{CableHop, CablePath, PathSegment, SplitReason, StopReason};
pub use termination::{
    CircuitSide, CircuitTermination, Endpoint, FrontPort, Interface, Parent, PassThrough,
    PortMapping, RearPort, Termination,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest valid rear port position.
pub const REARPORT_POSITIONS_MIN: u16 = 1;

/// Largest valid rear port position.
pub const REARPORT_POSITIONS_MAX: u16 = 1024;

/// The kinds of object a cable can terminate on.
///
/// The declaration order is the sort order used for deterministic output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationKind {
    /// Console port on a device
    ConsolePort,

    /// Console server port on a device
    ConsoleServerPort,

    /// Power inlet on a device
    PowerPort,

    /// Power outlet on a device or PDU
    PowerOutlet,

    /// Network interface
    Interface,

    /// Power feed from a power panel
    PowerFeed,

    /// Front port of a pass-through pair
    FrontPort,

    /// Rear port of a pass-through pair
    RearPort,

    /// One side (A or Z) of a provider circuit
    CircuitTermination,
}

impl TerminationKind {
    /// Every kind, in sort order.
    pub const ALL: [Self; 9] = [
        Self::ConsolePort,
        Self::ConsoleServerPort,
        Self::PowerPort,
        Self::PowerOutlet,
        Self::Interface,
        Self::PowerFeed,
        Self::FrontPort,
        Self::RearPort,
        Self::CircuitTermination,
    ];

    /// The snake_case name used in identifiers and files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConsolePort => "console_port",
            Self::ConsoleServerPort => "console_server_port",
            Self::PowerPort => "power_port",
            Self::PowerOutlet => "power_outlet",
            Self::Interface => "interface",
            Self::PowerFeed => "power_feed",
            Self::FrontPort => "front_port",
            Self::RearPort => "rear_port",
            Self::CircuitTermination => "circuit_termination",
        }
    }

    /// Returns `true` for kinds that can originate a stored path.
    ///
    /// Pass-through ports and circuit terminations only relay a signal;
    /// paths are traced *through* them, never *from* them.
    #[must_use]
    pub fn is_path_endpoint(self) -> bool {
        matches!(
            self,
            Self::ConsolePort
                | Self::ConsoleServerPort
                | Self::PowerPort
                | Self::PowerOutlet
                | Self::Interface
                | Self::PowerFeed
        )
    }

    /// Whether a cable may join this kind to `other`.
    #[must_use]
    pub fn compatible_with(self, other: Self) -> bool {
        use TerminationKind::{
            CircuitTermination, ConsolePort, ConsoleServerPort, FrontPort, Interface, PowerFeed,
            PowerOutlet, PowerPort, RearPort,
        };

        match self {
            CircuitTermination => matches!(
                other,
                Interface | FrontPort | RearPort | CircuitTermination
            ),
            ConsolePort => matches!(other, ConsoleServerPort | FrontPort | RearPort),
            ConsoleServerPort => matches!(other, ConsolePort | FrontPort | RearPort),
            Interface => matches!(
                other,
                Interface | CircuitTermination | FrontPort | RearPort
            ),
            FrontPort | RearPort => matches!(
                other,
                ConsolePort
                    | ConsoleServerPort
                    | Interface
                    | FrontPort
                    | RearPort
                    | CircuitTermination
            ),
            PowerFeed | PowerOutlet => other == PowerPort,
            PowerPort => matches!(other, PowerOutlet | PowerFeed),
        }
    }
}

impl fmt::Display for TerminationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TerminationKind {
    type Err = String;

    /// Accepts `front_port`, `front-port` and `frontport` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().replace('_', "") == normalized)
            .ok_or_else(|| format!("unknown termination kind: {s}"))
    }
}

/// Identity of a termination: its kind plus a numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TerminationId {
    /// What sort of connector this is
    pub kind: TerminationKind,
    /// Numeric id, unique within the kind
    pub id: u64,
}

impl TerminationId {
    /// Create a termination id
    #[must_use]
    pub fn new(kind: TerminationKind, id: u64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for TerminationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for TerminationId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <kind>:<id>, got '{s}'"))?;
        let kind = kind.trim().parse()?;
        let id = id
            .trim()
            .parse()
            .map_err(|_| format!("invalid termination id in '{s}'"))?;
        Ok(Self { kind, id })
    }
}

/// A node of the topology graph: either a termination or a cable.
///
/// Cached paths are indexed by every node they touch, so invalidation can
/// go from "this changed" to "these paths are stale" in one lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRef {
    /// A termination node
    Termination(TerminationId),
    /// A cable node
    Cable(CableId),
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Termination(t) => write!(f, "{t}"),
            Self::Cable(c) => write!(f, "cable {c}"),
        }
    }
}

impl From<TerminationId> for NodeRef {
    fn from(id: TerminationId) -> Self {
        Self::Termination(id)
    }
}

impl From<CableId> for NodeRef {
    fn from(id: CableId) -> Self {
        Self::Cable(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("interface:12", TerminationKind::Interface, 12)]
    #[case("front_port:3", TerminationKind::FrontPort, 3)]
    #[case("rear-port:4", TerminationKind::RearPort, 4)]
    #[case("PowerFeed:9", TerminationKind::PowerFeed, 9)]
    #[case(" circuittermination : 1 ", TerminationKind::CircuitTermination, 1)]
    fn parses_termination_ids(#[case] input: &str, #[case] kind: TerminationKind, #[case] id: u64) {
        assert_eq!(input.parse::<TerminationId>(), Ok(TerminationId::new(kind, id)));
    }

    #[rstest]
    #[case("interface")]
    #[case("interface:x")]
    #[case("socket:1")]
    fn rejects_bad_termination_ids(#[case] input: &str) {
        assert!(input.parse::<TerminationId>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for kind in TerminationKind::ALL {
            let id = TerminationId::new(kind, 42);
            assert_eq!(id.to_string().parse::<TerminationId>(), Ok(id));
        }
    }

    #[test]
    fn compatibility_is_symmetric() {
        for a in TerminationKind::ALL {
            for b in TerminationKind::ALL {
                assert_eq!(
                    a.compatible_with(b),
                    b.compatible_with(a),
                    "{a} <-> {b} should agree in both directions"
                );
            }
        }
    }

    #[test]
    fn power_only_connects_to_power() {
        assert!(TerminationKind::PowerFeed.compatible_with(TerminationKind::PowerPort));
        assert!(!TerminationKind::PowerFeed.compatible_with(TerminationKind::FrontPort));
        assert!(!TerminationKind::Interface.compatible_with(TerminationKind::PowerOutlet));
    }

    #[test]
    fn only_device_components_originate_paths() {
        assert!(TerminationKind::Interface.is_path_endpoint());
        assert!(TerminationKind::PowerFeed.is_path_endpoint());
        assert!(!TerminationKind::FrontPort.is_path_endpoint());
        assert!(!TerminationKind::CircuitTermination.is_path_endpoint());
    }
}
