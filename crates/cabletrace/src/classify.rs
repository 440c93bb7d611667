//! Path classification: the three flags derived from a traced path.

use crate::domain::{PathSegment, StopReason};

/// Flags derived from a path's segments and stop reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PathFlags {
    /// Ends at true endpoints
    pub is_complete: bool,
    /// Every cable is connected
    pub is_active: bool,
    /// Continuation was ambiguous
    pub is_split: bool,
}

/// Derive the flags for a path.
///
/// Rules, first match wins:
///
/// 1. A split clears every other flag.
/// 2. Complete iff tracing stopped at endpoints and the last far end is non-empty.
/// 3. Active iff every cable is connected (vacuously true with no segments).
#[must_use]
pub fn classify(segments: &[PathSegment], stop: &StopReason) -> PathFlags {
    if stop.is_split() {
        return PathFlags {
            is_complete: false,
            is_active: false,
            is_split: true,
        };
    }

    let is_complete = *stop == StopReason::Endpoint
        && segments.last().is_some_and(|segment| !segment.far.is_empty());
    let is_active = segments
        .iter()
        .all(|segment| segment.cable.status.is_connected());

    PathFlags {
        is_complete,
        is_active,
        is_split: false,
    }
}
