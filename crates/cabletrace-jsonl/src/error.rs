//! Errors raised while reading or replacing snapshot files.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a JSONL read or write.
///
/// Malformed lines are not errors; readers report them as
/// [`Warning`](crate::Warning)s and carry on.
#[derive(Debug, Error)]
pub enum Error {
    /// The file could not be opened, read or written.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A value could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The finished temporary file could not be renamed over the target.
    #[error("cannot replace {}: {source}", path.display())]
    Replace {
        /// The file that was to be replaced
        path: PathBuf,
        /// The rename failure
        source: io::Error,
    },
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
