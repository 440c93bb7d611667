//! CLI argument structs for all commands.

use clap::Parser;

use super::types::{CableStatusArg, CircuitSideArg, LengthUnitArg};
use crate::domain::{
    CableId, REARPORT_POSITIONS_MAX, REARPORT_POSITIONS_MIN, TerminationId, TerminationKind,
};

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `add` command
#[derive(Parser, Debug, Clone)]
pub struct AddArgs {
    /// Termination kind (e.g. interface, front_port, power_feed)
    pub kind: TerminationKind,

    /// Numeric id, unique within the kind
    pub id: u64,

    /// Display name
    #[arg(short, long)]
    pub name: String,

    /// Owning device id
    #[arg(short, long, conflicts_with = "location")]
    pub device: Option<u64>,

    /// Owning location id (for device-less terminations such as power feeds)
    #[arg(long)]
    pub location: Option<u64>,

    /// Rear port a front port relays to
    #[arg(long)]
    pub rear_port: Option<u64>,

    /// Position on the rear port (front ports)
    #[arg(long, default_value = "1", value_parser = position_parser())]
    pub position: u16,

    /// Number of positions (rear ports)
    #[arg(long, default_value = "1", value_parser = position_parser())]
    pub positions: u16,

    /// Circuit id (circuit terminations)
    #[arg(long)]
    pub circuit: Option<u64>,

    /// Circuit side (circuit terminations)
    #[arg(long, value_enum, default_value = "a")]
    pub side: CircuitSideArg,

    /// Interface this interface is bridged to
    #[arg(long)]
    pub bridge: Option<u64>,

    /// Treat as connected without a cable
    #[arg(long)]
    pub mark_connected: bool,
}

fn position_parser() -> clap::builder::RangedI64ValueParser<u16> {
    clap::value_parser!(u16).range(i64::from(REARPORT_POSITIONS_MIN)..=i64::from(REARPORT_POSITIONS_MAX))
}

/// Arguments for the `remove` command
#[derive(Parser, Debug, Clone)]
pub struct RemoveArgs {
    /// Termination to remove (`<kind>:<id>`)
    pub termination: TerminationId,
}

/// Arguments for the `connect` command
#[derive(Parser, Debug, Clone)]
pub struct ConnectArgs {
    /// Terminations on the A end (comma-separated `<kind>:<id>`)
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub a: Vec<TerminationId>,

    /// Terminations on the B end (comma-separated `<kind>:<id>`)
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub b: Vec<TerminationId>,

    /// Cable id; defaults to one past the highest existing id
    #[arg(long)]
    pub id: Option<CableId>,

    /// Cable status
    #[arg(short, long, value_enum, default_value = "connected")]
    pub status: CableStatusArg,

    /// Cable length
    #[arg(long, requires = "unit")]
    pub length: Option<f64>,

    /// Unit of `--length`
    #[arg(long, value_enum)]
    pub unit: Option<LengthUnitArg>,

    /// Free-form label
    #[arg(long)]
    pub label: Option<String>,
}

/// Arguments for the `disconnect` command
#[derive(Parser, Debug, Clone)]
pub struct DisconnectArgs {
    /// Cable to remove (`12` or `#12`)
    pub cable: CableId,
}

/// Arguments for the `status` command
#[derive(Parser, Debug, Clone)]
pub struct StatusArgs {
    /// Cable to change
    pub cable: CableId,

    /// New status
    #[arg(value_enum)]
    pub status: CableStatusArg,
}

/// Arguments for the `map` command
#[derive(Parser, Debug, Clone)]
pub struct MapArgs {
    /// Front port to move (`front_port:<id>`)
    pub front_port: TerminationId,

    /// Rear port id to relay to
    pub rear_port: u64,

    /// Position on the rear port
    #[arg(default_value = "1", value_parser = position_parser())]
    pub position: u16,
}

/// Arguments for the `trace` command
#[derive(Parser, Debug, Clone)]
pub struct TraceArgs {
    /// Origin termination (`<kind>:<id>`)
    pub origin: TerminationId,
}

/// Arguments for the `show` command
#[derive(Parser, Debug, Clone)]
pub struct ShowArgs {
    /// Origin termination (`<kind>:<id>`)
    pub origin: TerminationId,

    /// Continue through bridged interfaces
    #[arg(long)]
    pub full: bool,
}

/// Arguments for the `rebuild` command
#[derive(Parser, Debug, Clone)]
pub struct RebuildArgs {
    /// Rebuild only this origin; every path when omitted
    pub origin: Option<TerminationId>,
}

/// Arguments for the `check` command
#[derive(Parser, Debug, Clone)]
pub struct CheckArgs {}
