//! Resilient JSON Lines I/O for cabletrace.
//!
//! Snapshot files are written once per save and read once per process, so
//! this crate keeps to two operations:
//!
//! - [`read_jsonl_resilient`] parses every well-formed line and reports the
//!   rest as [`Warning`]s instead of failing the whole load.
//! - [`write_jsonl_atomic`] writes a complete file next to the target and
//!   renames it into place.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod atomic;
pub mod error;
pub mod reader;
pub mod warning;
pub mod writer;

pub use atomic::write_jsonl_atomic;
pub use error::{Error, Result};
pub use reader::{JsonlReader, read_jsonl_resilient};
pub use warning::Warning;
pub use writer::JsonlWriter;
