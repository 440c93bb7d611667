//! Color helpers for CLI output.
//!
//! Theme: green for complete/connected, yellow for planned or incomplete,
//! red for splits and integrity conditions, cyan for identifiers.

use crate::domain::{CablePath, CableStatus};
use colored::Colorize;

use super::OutputConfig;

/// Green text.
pub fn success(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.green().to_string()
}

/// Red text.
pub fn error(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.red().to_string()
}

/// Yellow text.
pub fn warning(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.yellow().to_string()
}

/// Cyan text.
pub fn info(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.cyan().to_string()
}

/// Dimmed text.
pub fn muted(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.dimmed().to_string()
}

pub(crate) fn colorize_status(status: CableStatus, config: &OutputConfig) -> String {
    let text = status.as_str();
    match status {
        CableStatus::Connected => success(text, config),
        CableStatus::Planned => warning(text, config),
        CableStatus::Decommissioning => error(text, config),
    }
}

/// One-word verdict for a path: `split`, `complete` or `incomplete`, with
/// `(inactive)` appended when a cable is not connected.
pub(crate) fn colorize_verdict(path: &CablePath, config: &OutputConfig) -> String {
    let verdict = if path.is_split {
        error("split", config)
    } else if path.is_complete {
        success("complete", config)
    } else {
        warning("incomplete", config)
    };
    if path.is_active || path.is_split {
        verdict
    } else {
        format!("{verdict} {}", warning("(inactive)", config))
    }
}
