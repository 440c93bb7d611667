//! Output formatting for CLI commands.
//!
//! Every printer has a text form (colored unless `NO_COLOR` is set) and a
//! JSON form selected by the global `--json` flag.

pub mod color;

use crate::cache::{PathLength, RebuildReport};
use crate::domain::{CablePath, PathSegment, TerminationId};
use crate::topology::Topology;
use serde::Serialize;
use std::env;
use std::io::{self, Write};

/// Formatting settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to emit ANSI colors
    pub use_colors: bool,
}

impl OutputConfig {
    /// Read settings from the environment.
    ///
    /// - `NO_COLOR`: any value disables colors
    /// - `CABLETRACE_COLOR`: `0` or `false` disables colors
    #[must_use]
    pub fn from_env() -> Self {
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("CABLETRACE_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);
        Self { use_colors }
    }

    /// Plain text, for tests and pipes.
    #[must_use]
    pub fn plain() -> Self {
        Self { use_colors: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { use_colors: true }
    }
}

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text
    Text,
    /// JSON for programmatic use
    Json,
}

/// Print a path, with its length when known.
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn print_path(
    path: &CablePath,
    topology: &Topology,
    length: PathLength,
    mode: OutputMode,
) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => write_path(&mut handle, path, topology, length, &OutputConfig::from_env()),
        OutputMode::Json => write_json(
            &mut handle,
            &serde_json::json!({
                "path": path,
                "segment_count": path.segment_count(),
                "length_m": length.meters,
                "length_is_definitive": length.is_definitive,
            }),
        ),
    }
}

/// Print a rebuild report.
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn print_report(report: &RebuildReport, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => write_report(&mut handle, report, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, &report_json(report)),
    }
}

/// Print a simple message
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn print_message(msg: &str) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{msg}")
}

/// Print any serializable value as pretty JSON
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, value)
}

fn write_json<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(w, "{json}")
}

fn describe(id: TerminationId, topology: &Topology, config: &OutputConfig) -> String {
    let label = color::info(&id.to_string(), config);
    match topology.termination(id) {
        Some(termination) => match termination.parent() {
            Some(parent) => format!("{label} {} on {parent}", termination.name()),
            None => format!("{label} {}", termination.name()),
        },
        None => format!("{label} {}", color::error("(missing)", config)),
    }
}

fn describe_all(ids: &[TerminationId], topology: &Topology, config: &OutputConfig) -> String {
    if ids.is_empty() {
        return color::muted("(nothing)", config);
    }
    ids.iter()
        .map(|id| describe(*id, topology, config))
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_segment<W: Write>(
    w: &mut W,
    index: usize,
    segment: &PathSegment,
    topology: &Topology,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "  {:>2}. {}",
        index + 1,
        describe_all(&segment.near, topology, config)
    )?;
    writeln!(
        w,
        "      {} cable {} [{}]",
        color::muted("└─", config),
        segment.cable.id,
        color::colorize_status(segment.cable.status, config)
    )?;
    writeln!(
        w,
        "      {} {}",
        color::muted("  →", config),
        describe_all(&segment.far, topology, config)
    )
}

pub(crate) fn write_path<W: Write>(
    w: &mut W,
    path: &CablePath,
    topology: &Topology,
    length: PathLength,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "Path from {} [{}]",
        describe_all(&path.origins, topology, config),
        color::colorize_verdict(path, config)
    )?;
    for (index, segment) in path.segments.iter().enumerate() {
        write_segment(w, index, segment, topology, config)?;
    }
    if !path.destinations.is_empty() {
        writeln!(
            w,
            "Destinations: {}",
            describe_all(&path.destinations, topology, config)
        )?;
    }

    let stop = path.stop.to_string();
    let stop = if path.stop.is_integrity_condition() {
        color::error(&stop, config)
    } else {
        stop
    };
    writeln!(w, "Stopped: {stop}")?;

    if path.segment_count() > 0 {
        let approx = if length.is_definitive { "" } else { "≥ " };
        writeln!(w, "Length: {approx}{:.2} m", length.meters)?;
    }
    Ok(())
}

fn report_json(report: &RebuildReport) -> serde_json::Value {
    let ids = |ids: &[TerminationId]| ids.iter().map(ToString::to_string).collect::<Vec<_>>();
    serde_json::json!({
        "created": ids(&report.created),
        "updated": ids(&report.updated),
        "unchanged": ids(&report.unchanged),
        "removed": ids(&report.removed),
        "failures": report.failures.iter().map(|f| serde_json::json!({
            "origin": f.origin.to_string(),
            "kind": f.kind.to_string(),
            "message": f.message,
        })).collect::<Vec<_>>(),
        "conditions": report.conditions.iter().map(|(origin, stop)| serde_json::json!({
            "origin": origin.to_string(),
            "stop": stop,
        })).collect::<Vec<_>>(),
    })
}

pub(crate) fn write_report<W: Write>(
    w: &mut W,
    report: &RebuildReport,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "Rebuilt {} path(s): {} created, {} updated, {} unchanged, {} removed",
        report.rebuilt(),
        report.created.len(),
        report.updated.len(),
        report.unchanged.len(),
        report.removed.len()
    )?;
    for (origin, stop) in &report.conditions {
        writeln!(w, "  {} {origin}: {stop}", color::warning("warning:", config))?;
    }
    for failure in &report.failures {
        writeln!(w, "  {} {failure}", color::error("failed:", config))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{PathCache, path_length};
    use crate::domain::{Cable, CableId, CableStatus, Parent, Termination};

    fn iface(id: u64) -> TerminationId {
        format!("interface:{id}").parse().unwrap()
    }

    fn render(status: CableStatus) -> String {
        let mut topology = Topology::new();
        topology
            .add_termination(Termination::interface(1, "eth0", Parent::Device(10)))
            .unwrap();
        topology
            .add_termination(Termination::interface(2, "eth1", Parent::Device(20)))
            .unwrap();
        topology
            .add_cable(Cable::new(CableId(5), status, vec![iface(1)], vec![iface(2)]))
            .unwrap();
        let mut cache = PathCache::default();
        cache.rebuild(&topology, iface(1)).unwrap();
        let path = cache.get(iface(1)).unwrap();

        let mut out = Vec::new();
        write_path(&mut out, path, &topology, path_length(path, &topology), &OutputConfig::plain())
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn text_path_names_every_hop() {
        let text = render(CableStatus::Connected);

        assert!(text.starts_with("Path from interface:1 eth0 on device 10 [complete]"));
        assert!(text.contains("cable #5 [connected]"));
        assert!(text.contains("Destinations: interface:2 eth1 on device 20"));
        assert!(text.contains("Stopped: reached endpoint"));
        assert!(text.contains("Length: ≥ 0.00 m"));
    }

    #[test]
    fn inactive_paths_are_flagged() {
        let text = render(CableStatus::Planned);

        assert!(text.contains("[complete (inactive)]"));
        assert!(text.contains("[planned]"));
    }

    #[test]
    fn report_lists_failures() {
        let report = RebuildReport {
            created: vec![iface(1)],
            failures: vec![crate::error::RebuildFailure::from_error(
                iface(2),
                &crate::error::Error::InvalidOrigin(iface(2)),
            )],
            ..RebuildReport::default()
        };

        let mut out = Vec::new();
        write_report(&mut out, &report, &OutputConfig::plain()).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Rebuilt 2 path(s): 1 created"));
        assert!(text.contains("failed: interface:2"));
    }
}
