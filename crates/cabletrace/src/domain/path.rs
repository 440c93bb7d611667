//! Traced cable paths.

use super::{CableId, CableStatus, NodeRef, TerminationId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// The cable crossed by a segment, with the status it had when traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CableHop {
    /// Cable identifier
    pub id: CableId,
    /// Status at trace time
    pub status: CableStatus,
}

/// One cable crossing: the near terminations, the cable, and the far terminations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    /// Terminations the signal entered the cable from (sorted)
    pub near: Vec<TerminationId>,
    /// The cable crossed
    pub cable: CableHop,
    /// Terminations on the other end (sorted)
    pub far: Vec<TerminationId>,
}

/// Why a trace produced a split path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitReason {
    /// The far end mixes termination kinds
    MixedKinds,
    /// The current terminations lead onto more than one cable
    MultipleCables,
    /// A rear port with several positions was reached with no position to follow
    NoPosition,
    /// A circuit termination has more than one peer on the other side
    MultipleCircuitPeers,
}

impl fmt::Display for SplitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MixedKinds => "far end mixes termination kinds",
            Self::MultipleCables => "terminations lead onto more than one cable",
            Self::NoPosition => "multi-position rear port reached without a position",
            Self::MultipleCircuitPeers => "circuit has more than one peer termination",
        };
        f.write_str(text)
    }
}

/// Why tracing stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stop", rename_all = "snake_case")]
pub enum StopReason {
    /// Reached terminal endpoints
    Endpoint,
    /// The origin has no cable, or the last cable has nothing on its far end
    DeadEnd,
    /// Reached pass-through ports whose internal peer has no cable
    UnterminatedPassThrough {
        /// Ports the signal stopped at
        ports: Vec<TerminationId>,
    },
    /// A pass-through port or circuit termination has no internal peer
    NoInternalPeer {
        /// The port with no peer
        port: TerminationId,
        /// Position that was looked up, for rear ports
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<u16>,
    },
    /// The path cannot continue unambiguously
    Split {
        /// Terminations where the ambiguity arose
        at: Vec<TerminationId>,
        /// What made it ambiguous
        reason: SplitReason,
    },
    /// The next hop would revisit a termination already on the path
    CycleDetected {
        /// Terminations that were about to be revisited
        revisited: Vec<TerminationId>,
    },
    /// The path reached the hop limit
    HopLimitExceeded {
        /// Limit that was hit
        limit: usize,
    },
    /// The trace ran past its time budget
    BudgetExceeded {
        /// Budget that was exceeded, in milliseconds
        budget_ms: u64,
    },
}

impl StopReason {
    /// Returns `true` for [`StopReason::Split`].
    #[must_use]
    pub fn is_split(&self) -> bool {
        matches!(self, Self::Split { .. })
    }

    /// Terminations named by the stop reason, which may lie just past the
    /// recorded segments.
    #[must_use]
    pub fn terminations(&self) -> &[TerminationId] {
        match self {
            Self::UnterminatedPassThrough { ports } => ports,
            Self::NoInternalPeer { port, .. } => std::slice::from_ref(port),
            Self::Split { at, .. } => at,
            Self::CycleDetected { revisited } => revisited,
            Self::Endpoint
            | Self::DeadEnd
            | Self::HopLimitExceeded { .. }
            | Self::BudgetExceeded { .. } => &[],
        }
    }

    /// Conditions worth surfacing as data-integrity warnings.
    #[must_use]
    pub fn is_integrity_condition(&self) -> bool {
        matches!(
            self,
            Self::Split { .. }
                | Self::CycleDetected { .. }
                | Self::HopLimitExceeded { .. }
                | Self::BudgetExceeded { .. }
        )
    }

    /// Short machine-friendly name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Endpoint => "endpoint",
            Self::DeadEnd => "dead_end",
            Self::UnterminatedPassThrough { .. } => "unterminated_pass_through",
            Self::NoInternalPeer { .. } => "no_internal_peer",
            Self::Split { .. } => "split",
            Self::CycleDetected { .. } => "cycle_detected",
            Self::HopLimitExceeded { .. } => "hop_limit_exceeded",
            Self::BudgetExceeded { .. } => "budget_exceeded",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Endpoint => f.write_str("reached endpoint"),
            Self::DeadEnd => f.write_str("dead end"),
            Self::UnterminatedPassThrough { ports } => {
                write!(f, "pass-through not cabled beyond {}", join(ports))
            }
            Self::NoInternalPeer { port, position: Some(p) } => {
                write!(f, "{port} has no front port at position {p}")
            }
            Self::NoInternalPeer { port, position: None } => write!(f, "{port} has no internal peer"),
            Self::Split { at, reason } => write!(f, "split at {}: {reason}", join(at)),
            Self::CycleDetected { revisited } => write!(f, "cycle back to {}", join(revisited)),
            Self::HopLimitExceeded { limit } => write!(f, "exceeded {limit} hops"),
            Self::BudgetExceeded { budget_ms } => write!(f, "exceeded {budget_ms}ms budget"),
        }
    }
}

fn join(ids: &[TerminationId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A traced path from one or more origin terminations.
///
/// Paths are derived data: they are produced by the tracer and owned by the
/// path cache. The three flags are always consistent with the segments and
/// stop reason (see [`crate::classify`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CablePath {
    /// Terminations the path was traced from (sorted, same cable end)
    pub origins: Vec<TerminationId>,
    /// Cable crossings in order
    pub segments: Vec<PathSegment>,
    /// Terminal endpoints reached; empty unless the path is complete
    pub destinations: Vec<TerminationId>,
    /// Why tracing stopped
    pub stop: StopReason,
    /// Ends at real endpoints with no ambiguity
    pub is_complete: bool,
    /// Every cable is connected
    pub is_active: bool,
    /// The path could not continue unambiguously
    pub is_split: bool,
}

impl CablePath {
    /// Number of cable crossings
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// The origin had no cable to follow.
    ///
    /// A trace cut short by a limit before its first crossing has no
    /// segments either, but it still counts as a path.
    #[must_use]
    pub fn is_uncabled(&self) -> bool {
        self.segments.is_empty() && self.stop == StopReason::DeadEnd
    }

    /// First origin; the cache keys paths by it.
    #[must_use]
    pub fn primary_origin(&self) -> Option<TerminationId> {
        self.origins.first().copied()
    }

    /// Every termination on the path, in path order.
    ///
    /// A path with no segments consists of its origins alone.
    pub fn terminations(&self) -> impl Iterator<Item = TerminationId> + '_ {
        let origins = if self.segments.is_empty() {
            self.origins.as_slice()
        } else {
            &[]
        };
        origins.iter().copied().chain(
            self.segments
                .iter()
                .flat_map(|segment| segment.near.iter().chain(segment.far.iter()).copied()),
        )
    }

    /// Every cable on the path, in order.
    pub fn cables(&self) -> impl Iterator<Item = CableId> + '_ {
        self.segments.iter().map(|segment| segment.cable.id)
    }

    /// Every node (termination or cable) the path touches.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.terminations()
            .map(NodeRef::from)
            .chain(self.cables().map(NodeRef::from))
    }

    /// Whether the path touches `node`.
    #[must_use]
    pub fn contains(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Termination(t) => self.terminations().any(|seen| seen == t),
            NodeRef::Cable(c) => self.cables().any(|seen| seen == c),
        }
    }

    /// Hex SHA-256 of the canonical JSON form.
    ///
    /// Two paths with equal digests are structurally identical, which lets a
    /// rebuild report `Unchanged` without comparing field by field.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        // Serializing plain structs and enums into a Vec cannot fail.
        if let Ok(bytes) = serde_json::to_vec(self) {
            hasher.update(&bytes);
        }
        format!("{:x}", hasher.finalize())
    }
}
