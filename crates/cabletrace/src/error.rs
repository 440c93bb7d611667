//! Error types for cabletrace operations.
//!
//! Errors fall into three groups:
//!
//! - **`Error`**: failures that abort the operation in hand (I/O, a rejected
//!   topology edit, a trace that kept racing concurrent edits)
//! - **`RebuildFailure`**: per-origin failures collected during a batch
//!   invalidation; one broken path never stops the rest of the batch
//! - Trace conditions (cycles, hop limits, dead ends) are not errors at all.
//!   They are recorded on the path as its [`StopReason`](crate::domain::StopReason).

use crate::domain::{CableId, TerminationId, TerminationKind};
use std::io;
use thiserror::Error;

/// Result type for cabletrace operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSONL snapshot I/O failed
    #[error("snapshot error: {0}")]
    Jsonl(#[from] cabletrace_jsonl::Error),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Termination does not exist
    #[error("termination not found: {0}")]
    TerminationNotFound(TerminationId),

    /// Cable does not exist
    #[error("cable not found: {0}")]
    CableNotFound(CableId),

    /// Id already taken
    #[error("duplicate id: {0}")]
    DuplicateId(String),

    /// Termination already has a cable or is marked connected
    #[error("termination {termination} is occupied: {reason}")]
    TerminationOccupied {
        /// The termination
        termination: TerminationId,
        /// What occupies it
        reason: String,
    },

    /// Cable would join kinds that cannot be joined
    #[error("cannot cable {a} to {b}")]
    IncompatibleTerminations {
        /// Kind on the A end
        a: TerminationKind,
        /// Kind on the B end
        b: TerminationKind,
    },

    /// Cable is malformed in some other way (empty end, mixed kinds)
    #[error("invalid cable {cable}: {reason}")]
    InvalidCable {
        /// The cable
        cable: CableId,
        /// What is wrong with it
        reason: String,
    },

    /// Front/rear port mapping is invalid
    #[error("invalid port mapping for {port}: {reason}")]
    InvalidMapping {
        /// The front or rear port
        port: TerminationId,
        /// What is wrong with the mapping
        reason: String,
    },

    /// Paths can only be stored for endpoint kinds
    #[error("{0} cannot originate a path (pass-through ports and circuit terminations relay only)")]
    InvalidOrigin(TerminationId),

    /// The topology kept changing under a rebuild
    #[error("topology changed while tracing from {origin} ({attempts} attempts); retry the edit")]
    ConcurrentTopologyChange {
        /// Origin whose rebuild gave up
        origin: TerminationId,
        /// Attempts made
        attempts: u32,
    },
}

impl Error {
    /// Returns `true` when retrying the same operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentTopologyChange { .. })
    }
}

impl From<crate::trace::TraceError> for Error {
    fn from(err: crate::trace::TraceError) -> Self {
        use crate::trace::TraceError;

        match err {
            TraceError::MissingTermination(id) => Self::TerminationNotFound(id),
            TraceError::MissingCable(id) => Self::CableNotFound(id),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// A single origin whose rebuild failed during batch invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildFailure {
    /// Origin whose path could not be rebuilt
    pub origin: TerminationId,
    /// Category of the failure
    pub kind: RebuildFailureKind,
    /// Human-readable message
    pub message: String,
}

impl RebuildFailure {
    /// Create a rebuild failure.
    #[must_use]
    pub fn new(origin: TerminationId, kind: RebuildFailureKind, message: impl Into<String>) -> Self {
        Self {
            origin,
            kind,
            message: message.into(),
        }
    }

    /// Classify a rebuild error for `origin`.
    #[must_use]
    pub fn from_error(origin: TerminationId, err: &Error) -> Self {
        let kind = match err {
            Error::ConcurrentTopologyChange { .. } => RebuildFailureKind::ConcurrentChange,
            Error::InvalidOrigin(_) => RebuildFailureKind::InvalidOrigin,
            _ => RebuildFailureKind::DataIntegrity,
        };
        Self::new(origin, kind, err.to_string())
    }
}

impl std::fmt::Display for RebuildFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.origin, self.message, self.kind)
    }
}

impl std::error::Error for RebuildFailure {}

/// Categories of rebuild failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildFailureKind {
    // === Retryable ===
    /// The topology kept changing mid-trace
    ConcurrentChange,

    // === Data integrity ===
    /// The stored origin is no longer a path endpoint
    InvalidOrigin,

    /// The topology is inconsistent around this origin
    DataIntegrity,
}

impl RebuildFailureKind {
    /// Returns `true` if the failure may go away on retry.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::ConcurrentChange)
    }

    /// Returns `true` if the failure reflects bad topology data.
    #[must_use]
    pub fn is_data_integrity(self) -> bool {
        !self.is_retryable()
    }
}

impl std::fmt::Display for RebuildFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConcurrentChange => write!(f, "concurrent change"),
            Self::InvalidOrigin => write!(f, "invalid origin"),
            Self::DataIntegrity => write!(f, "data integrity"),
        }
    }
}
