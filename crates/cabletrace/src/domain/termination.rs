//! Terminations: the physical connection points a cable can land on.

use super::{TerminationId, TerminationKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a termination belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parent {
    /// A device (switch, server, patch panel, PDU)
    Device(u64),
    /// A location without a device (e.g. a power panel in a room)
    Location(u64),
}

impl fmt::Display for Parent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(id) => write!(f, "device {id}"),
            Self::Location(id) => write!(f, "location {id}"),
        }
    }
}

/// Fields shared by every plain endpoint (console, power and power feed ports).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Numeric id, unique within the kind
    pub id: u64,
    /// Display name
    pub name: String,
    /// Owning device or location
    pub parent: Option<Parent>,
    /// Treat as connected even though no cable is attached
    #[serde(default)]
    pub mark_connected: bool,
}

impl Endpoint {
    /// Create an endpoint that is not marked connected
    pub fn new(id: u64, name: impl Into<String>, parent: Parent) -> Self {
        Self {
            id,
            name: name.into(),
            parent: Some(parent),
            mark_connected: false,
        }
    }
}

/// A network interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    /// Numeric id, unique among interfaces
    pub id: u64,
    /// Display name
    pub name: String,
    /// Owning device
    pub parent: Option<Parent>,
    /// Treat as connected even though no cable is attached
    #[serde(default)]
    pub mark_connected: bool,
    /// Interface this one is bridged to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge: Option<u64>,
}

impl From<Endpoint> for Interface {
    fn from(endpoint: Endpoint) -> Self {
        Self {
            id: endpoint.id,
            name: endpoint.name,
            parent: endpoint.parent,
            mark_connected: endpoint.mark_connected,
            bridge: None,
        }
    }
}

/// Front port of a pass-through pair, mapped to one position of a rear port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontPort {
    /// Numeric id, unique among front ports
    pub id: u64,
    /// Display name
    pub name: String,
    /// Owning device; must match the rear port's
    pub parent: Option<Parent>,
    /// Treat as connected even though no cable is attached
    #[serde(default)]
    pub mark_connected: bool,
    /// Id of the rear port this front port relays to
    pub rear_port: u64,
    /// Position on the rear port (1-based)
    #[serde(default = "default_position")]
    pub rear_port_position: u16,
}

/// Rear port of a pass-through pair, multiplexing one or more front ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RearPort {
    /// Numeric id, unique among rear ports
    pub id: u64,
    /// Display name
    pub name: String,
    /// Owning device
    pub parent: Option<Parent>,
    /// Treat as connected even though no cable is attached
    #[serde(default)]
    pub mark_connected: bool,
    /// Number of front port positions carried
    #[serde(default = "default_position")]
    pub positions: u16,
}

fn default_position() -> u16 {
    1
}

/// Which end of a circuit a termination sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitSide {
    /// The A side
    A,
    /// The Z side
    Z,
}

impl CircuitSide {
    /// The other side of the circuit
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::A => Self::Z,
            Self::Z => Self::A,
        }
    }
}

/// One end of a provider circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitTermination {
    /// Numeric id, unique among circuit terminations
    pub id: u64,
    /// Display name
    pub name: String,
    /// Circuit this termination belongs to
    pub circuit: u64,
    /// Side of the circuit
    pub term_side: CircuitSide,
    /// Treat as connected even though no cable is attached
    #[serde(default)]
    pub mark_connected: bool,
}

/// How a pass-through port relays a signal to its paired port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortMapping {
    /// Front port: always relays to one position of one rear port.
    ToRear {
        /// Rear port id
        rear_port: u64,
        /// Position on that rear port
        position: u16,
    },
    /// Rear port: relays to whichever front port holds the active position.
    ToFront {
        /// Number of positions multiplexed
        positions: u16,
    },
}

/// Capability of relaying a signal to a fixed internal peer without a cable hop.
///
/// Only front and rear ports implement this; every other termination kind
/// is a true endpoint (or, for circuit terminations, crosses a provider
/// circuit rather than a device).
pub trait PassThrough {
    /// The fixed mapping to the paired port.
    fn mapping(&self) -> PortMapping;
}

impl PassThrough for FrontPort {
    fn mapping(&self) -> PortMapping {
        PortMapping::ToRear {
            rear_port: self.rear_port,
            position: self.rear_port_position,
        }
    }
}

impl PassThrough for RearPort {
    fn mapping(&self) -> PortMapping {
        PortMapping::ToFront {
            positions: self.positions,
        }
    }
}

/// A physical connection point.
///
/// Exhaustive matching over this enum replaces dynamic type dispatch: adding
/// a termination kind forces every consumer to decide how to handle it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// Console port
    ConsolePort(Endpoint),
    /// Console server port
    ConsoleServerPort(Endpoint),
    /// Power port
    PowerPort(Endpoint),
    /// Power outlet
    PowerOutlet(Endpoint),
    /// Network interface
    Interface(Interface),
    /// Power feed
    PowerFeed(Endpoint),
    /// Front port
    FrontPort(FrontPort),
    /// Rear port
    RearPort(RearPort),
    /// Circuit termination
    CircuitTermination(CircuitTermination),
}

impl Termination {
    /// Shorthand for an interface with no bridge.
    pub fn interface(id: u64, name: impl Into<String>, parent: Parent) -> Self {
        Self::Interface(Endpoint::new(id, name, parent).into())
    }

    /// Shorthand for a front port mapped to `rear_port` at `position`.
    pub fn front_port(
        id: u64,
        name: impl Into<String>,
        parent: Parent,
        rear_port: u64,
        position: u16,
    ) -> Self {
        Self::FrontPort(FrontPort {
            id,
            name: name.into(),
            parent: Some(parent),
            mark_connected: false,
            rear_port,
            rear_port_position: position,
        })
    }

    /// Shorthand for a rear port carrying `positions` front ports.
    pub fn rear_port(id: u64, name: impl Into<String>, parent: Parent, positions: u16) -> Self {
        Self::RearPort(RearPort {
            id,
            name: name.into(),
            parent: Some(parent),
            mark_connected: false,
            positions,
        })
    }

    /// Shorthand for one side of a circuit.
    pub fn circuit_termination(
        id: u64,
        name: impl Into<String>,
        circuit: u64,
        term_side: CircuitSide,
    ) -> Self {
        Self::CircuitTermination(CircuitTermination {
            id,
            name: name.into(),
            circuit,
            term_side,
            mark_connected: false,
        })
    }

    /// The kind tag of this termination
    #[must_use]
    pub fn kind(&self) -> TerminationKind {
        match self {
            Self::ConsolePort(_) => TerminationKind::ConsolePort,
            Self::ConsoleServerPort(_) => TerminationKind::ConsoleServerPort,
            Self::PowerPort(_) => TerminationKind::PowerPort,
            Self::PowerOutlet(_) => TerminationKind::PowerOutlet,
            Self::Interface(_) => TerminationKind::Interface,
            Self::PowerFeed(_) => TerminationKind::PowerFeed,
            Self::FrontPort(_) => TerminationKind::FrontPort,
            Self::RearPort(_) => TerminationKind::RearPort,
            Self::CircuitTermination(_) => TerminationKind::CircuitTermination,
        }
    }

    /// Full identity (kind + id)
    #[must_use]
    pub fn id(&self) -> TerminationId {
        let raw = match self {
            Self::ConsolePort(e)
            | Self::ConsoleServerPort(e)
            | Self::PowerPort(e)
            | Self::PowerOutlet(e)
            | Self::PowerFeed(e) => e.id,
            Self::Interface(i) => i.id,
            Self::FrontPort(p) => p.id,
            Self::RearPort(p) => p.id,
            Self::CircuitTermination(c) => c.id,
        };
        TerminationId::new(self.kind(), raw)
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::ConsolePort(e)
            | Self::ConsoleServerPort(e)
            | Self::PowerPort(e)
            | Self::PowerOutlet(e)
            | Self::PowerFeed(e) => &e.name,
            Self::Interface(i) => &i.name,
            Self::FrontPort(p) => &p.name,
            Self::RearPort(p) => &p.name,
            Self::CircuitTermination(c) => &c.name,
        }
    }

    /// Owning device or location; circuit terminations have none.
    #[must_use]
    pub fn parent(&self) -> Option<Parent> {
        match self {
            Self::ConsolePort(e)
            | Self::ConsoleServerPort(e)
            | Self::PowerPort(e)
            | Self::PowerOutlet(e)
            | Self::PowerFeed(e) => e.parent,
            Self::Interface(i) => i.parent,
            Self::FrontPort(p) => p.parent,
            Self::RearPort(p) => p.parent,
            Self::CircuitTermination(_) => None,
        }
    }

    /// Whether the termination is flagged as connected without a cable.
    #[must_use]
    pub fn mark_connected(&self) -> bool {
        match self {
            Self::ConsolePort(e)
            | Self::ConsoleServerPort(e)
            | Self::PowerPort(e)
            | Self::PowerOutlet(e)
            | Self::PowerFeed(e) => e.mark_connected,
            Self::Interface(i) => i.mark_connected,
            Self::FrontPort(p) => p.mark_connected,
            Self::RearPort(p) => p.mark_connected,
            Self::CircuitTermination(c) => c.mark_connected,
        }
    }

    /// The pass-through capability, for front and rear ports only.
    #[must_use]
    pub fn as_pass_through(&self) -> Option<&dyn PassThrough> {
        match self {
            Self::FrontPort(p) => Some(p),
            Self::RearPort(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id(), self.name())
    }
}
