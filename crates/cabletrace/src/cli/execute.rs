//! Command execution logic.

use anyhow::{Result, bail};
use std::collections::BTreeMap;

use super::args::{
    AddArgs, CheckArgs, ConnectArgs, DisconnectArgs, InitArgs, MapArgs, RebuildArgs, RemoveArgs,
    ShowArgs, StatusArgs, TraceArgs,
};
use crate::app::App;
use crate::cache::{RebuildReport, full_trace, path_length, split_candidates};
use crate::domain::{
    Cable, CableId, CablePath, CircuitTermination, Endpoint, FrontPort, Interface, Parent,
    RearPort, Termination, TerminationId, TerminationKind,
};
use crate::output::{self, OutputMode};

/// Execute the init command
pub async fn execute_init(args: &InitArgs) -> Result<()> {
    let current_dir = std::env::current_dir()?;
    let result = crate::config::init(&current_dir).await?;

    if !args.quiet {
        println!("Initialized cabletrace in {}", result.cabletrace_dir.display());
        println!("  Config:   {}", result.config_file.display());
        println!("  Topology: {}", result.topology_file.display());
        println!("  Paths:    {}", result.paths_file.display());
    }
    Ok(())
}

async fn commit(app: &App, report: &RebuildReport, mode: OutputMode) -> Result<()> {
    app.save().await?;
    output::print_report(report, mode)?;
    Ok(())
}

/// Build a termination from `add` arguments.
pub(crate) fn build_termination(args: &AddArgs) -> Result<Termination> {
    if args.bridge.is_some() && args.kind != TerminationKind::Interface {
        bail!("--bridge only applies to interfaces");
    }
    let parent = args
        .device
        .map(Parent::Device)
        .or(args.location.map(Parent::Location));
    let endpoint = Endpoint {
        id: args.id,
        name: args.name.clone(),
        parent,
        mark_connected: args.mark_connected,
    };

    let termination = match args.kind {
        TerminationKind::ConsolePort => Termination::ConsolePort(endpoint),
        TerminationKind::ConsoleServerPort => Termination::ConsoleServerPort(endpoint),
        TerminationKind::PowerPort => Termination::PowerPort(endpoint),
        TerminationKind::PowerOutlet => Termination::PowerOutlet(endpoint),
        TerminationKind::PowerFeed => Termination::PowerFeed(endpoint),
        TerminationKind::Interface => Termination::Interface(Interface {
            bridge: args.bridge,
            ..Interface::from(endpoint)
        }),
        TerminationKind::FrontPort => {
            let Some(rear_port) = args.rear_port else {
                bail!("front ports need --rear-port");
            };
            Termination::FrontPort(FrontPort {
                id: args.id,
                name: args.name.clone(),
                parent,
                mark_connected: args.mark_connected,
                rear_port,
                rear_port_position: args.position,
            })
        }
        TerminationKind::RearPort => Termination::RearPort(RearPort {
            id: args.id,
            name: args.name.clone(),
            parent,
            mark_connected: args.mark_connected,
            positions: args.positions,
        }),
        TerminationKind::CircuitTermination => {
            let Some(circuit) = args.circuit else {
                bail!("circuit terminations need --circuit");
            };
            Termination::CircuitTermination(CircuitTermination {
                id: args.id,
                name: args.name.clone(),
                circuit,
                term_side: args.side.into(),
                mark_connected: args.mark_connected,
            })
        }
    };
    Ok(termination)
}

/// Execute the add command
pub async fn execute_add(app: &mut App, args: &AddArgs, mode: OutputMode) -> Result<()> {
    let termination = build_termination(args)?;
    let report = app.network_mut().add_termination(termination)?;
    commit(app, &report, mode).await
}

/// Execute the remove command
pub async fn execute_remove(app: &mut App, args: &RemoveArgs, mode: OutputMode) -> Result<()> {
    let report = app.network_mut().remove_termination(args.termination)?;
    commit(app, &report, mode).await
}

/// Execute the connect command
pub async fn execute_connect(app: &mut App, args: &ConnectArgs, mode: OutputMode) -> Result<()> {
    let id = match args.id {
        Some(id) => id,
        None => next_cable_id(app.network().topology().cables().map(|c| c.id))?,
    };

    let mut cable = Cable::new(id, args.status.into(), args.a.clone(), args.b.clone());
    if let (Some(value), Some(unit)) = (args.length, args.unit) {
        cable = cable.with_length(value, unit.into());
    }
    cable.label.clone_from(&args.label);

    let report = app.network_mut().add_cable(cable)?;
    if mode == OutputMode::Text {
        output::print_message(&format!("Created cable {id}"))?;
    }
    commit(app, &report, mode).await
}

/// One past the highest id in use, or 1 for an empty topology.
fn next_cable_id(existing: impl Iterator<Item = CableId>) -> Result<CableId> {
    match existing.max() {
        None => Ok(CableId(1)),
        Some(highest) => match highest.0.checked_add(1) {
            Some(next) => Ok(CableId(next)),
            None => bail!("cable {highest} has the highest possible id; pass --id explicitly"),
        },
    }
}

/// Execute the disconnect command
pub async fn execute_disconnect(
    app: &mut App,
    args: &DisconnectArgs,
    mode: OutputMode,
) -> Result<()> {
    let report = app.network_mut().remove_cable(args.cable)?;
    commit(app, &report, mode).await
}

/// Execute the status command
pub async fn execute_status(app: &mut App, args: &StatusArgs, mode: OutputMode) -> Result<()> {
    let report = app
        .network_mut()
        .set_cable_status(args.cable, args.status.into())?;
    commit(app, &report, mode).await
}

/// Execute the map command
pub async fn execute_map(app: &mut App, args: &MapArgs, mode: OutputMode) -> Result<()> {
    let report = app
        .network_mut()
        .remap_front_port(args.front_port, args.rear_port, args.position)?;
    commit(app, &report, mode).await
}

fn print_path_with_hints(app: &App, path: &CablePath, mode: OutputMode) -> Result<()> {
    let topology = app.network().topology();
    output::print_path(path, topology, path_length(path, topology), mode)?;

    let candidates = split_candidates(path, topology);
    if mode == OutputMode::Text && !candidates.is_empty() {
        let names: Vec<String> = candidates.iter().map(ToString::to_string).collect();
        output::print_message(&format!("Could continue via: {}", names.join(", ")))?;
    }
    Ok(())
}

/// Execute the trace command: trace afresh without touching stored paths
pub fn execute_trace(app: &App, args: &TraceArgs, mode: OutputMode) -> Result<()> {
    let path = app.network().trace(args.origin)?;
    print_path_with_hints(app, &path, mode)
}

/// Execute the show command: print the stored path
pub fn execute_show(app: &App, args: &ShowArgs, mode: OutputMode) -> Result<()> {
    let cache = app.network().cache();
    let Some(path) = cache.get(args.origin) else {
        if app.network().topology().termination(args.origin).is_none() {
            bail!("termination not found: {}", args.origin);
        }
        match mode {
            OutputMode::Json => output::print_json(&serde_json::Value::Null)?,
            OutputMode::Text => output::print_message(&format!("No stored path for {}", args.origin))?,
        }
        return Ok(());
    };

    if !args.full {
        return print_path_with_hints(app, path, mode);
    }

    let segments = full_trace(cache, app.network().topology(), args.origin);
    let extended = CablePath {
        segments,
        ..path.clone()
    };
    print_path_with_hints(app, &extended, mode)
}

/// Execute the rebuild command
pub async fn execute_rebuild(app: &mut App, args: &RebuildArgs, mode: OutputMode) -> Result<()> {
    let report = match args.origin {
        Some(origin) => {
            let outcome = app.network_mut().rebuild(origin)?;
            if mode == OutputMode::Text {
                output::print_message(&format!("{origin}: {outcome:?}"))?;
            }
            let mut report = RebuildReport::default();
            report.record(origin, outcome);
            report
        }
        None => app.network_mut().rebuild_all(),
    };
    commit(app, &report, mode).await
}

/// Origins whose stored path differs from a fresh rebuild.
pub(crate) fn stale_origins(stored: &[CablePath], fresh: &[CablePath]) -> Vec<TerminationId> {
    let index = |paths: &[CablePath]| -> BTreeMap<TerminationId, String> {
        paths
            .iter()
            .filter_map(|p| p.primary_origin().map(|o| (o, p.digest())))
            .collect()
    };
    let stored = index(stored);
    let fresh = index(fresh);

    let mut stale: Vec<TerminationId> = stored
        .iter()
        .filter(|(origin, digest)| fresh.get(origin) != Some(digest))
        .map(|(origin, _)| *origin)
        .chain(fresh.keys().filter(|o| !stored.contains_key(o)).copied())
        .collect();
    stale.sort();
    stale
}

/// Execute the check command: compare stored paths with a fresh rebuild
pub fn execute_check(app: &App, _args: &CheckArgs, mode: OutputMode) -> Result<()> {
    let mut fresh = app.network().clone();
    let report = fresh.rebuild_all();
    let stale = stale_origins(&app.network().cache().export(), &fresh.cache().export());

    match mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "stale": stale.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "load_warnings": app.warnings().iter().map(ToString::to_string).collect::<Vec<_>>(),
            "conditions": report.conditions.iter().map(|(origin, stop)| serde_json::json!({
                "origin": origin.to_string(),
                "stop": stop,
            })).collect::<Vec<_>>(),
        }))?,
        OutputMode::Text => {
            for warning in app.warnings() {
                output::print_message(&format!("load warning: {warning}"))?;
            }
            for (origin, stop) in &report.conditions {
                output::print_message(&format!("{origin}: {stop}"))?;
            }
            for origin in &stale {
                output::print_message(&format!("stale: {origin}"))?;
            }
        }
    }

    if !stale.is_empty() {
        bail!("{} stale path(s); run `cabletrace rebuild`", stale.len());
    }
    if mode == OutputMode::Text {
        output::print_message("All stored paths are current")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};

    fn add_args(argv: &[&str]) -> AddArgs {
        let mut full = vec!["cabletrace", "add"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Some(Commands::Add(args)) => args,
            other => panic!("expected add, got {other:?}"),
        }
    }

    #[test]
    fn cable_ids_continue_after_the_highest() {
        assert_eq!(next_cable_id(std::iter::empty()).unwrap(), CableId(1));
        assert_eq!(
            next_cable_id([CableId(4), CableId(9), CableId(2)].into_iter()).unwrap(),
            CableId(10)
        );
    }

    #[test]
    fn cable_ids_do_not_wrap() {
        let err = next_cable_id([CableId(3), CableId(u64::MAX)].into_iter()).unwrap_err();

        assert!(err.to_string().contains("--id"), "{err}");
    }

    #[test]
    fn builds_front_ports() {
        let args = add_args(&["front-port", "3", "-n", "FP3", "-d", "7", "--rear-port", "1", "--position", "2"]);

        let termination = build_termination(&args).unwrap();

        assert_eq!(termination, Termination::front_port(3, "FP3", Parent::Device(7), 1, 2));
    }

    #[test]
    fn front_ports_need_a_rear_port() {
        let args = add_args(&["front_port", "3", "-n", "FP3", "-d", "7"]);

        assert!(build_termination(&args).is_err());
    }

    #[test]
    fn builds_bridged_interfaces() {
        let args = add_args(&["interface", "1", "-n", "eth0", "-d", "1", "--bridge", "2"]);

        match build_termination(&args).unwrap() {
            Termination::Interface(iface) => assert_eq!(iface.bridge, Some(2)),
            other => panic!("expected interface, got {other:?}"),
        }
    }

    #[test]
    fn power_feeds_can_live_in_locations() {
        let args = add_args(&["power_feed", "4", "-n", "PF4", "--location", "9"]);

        let termination = build_termination(&args).unwrap();

        assert_eq!(termination.parent(), Some(Parent::Location(9)));
    }

    #[test]
    fn stale_origins_finds_changed_missing_and_new_paths() {
        use crate::domain::StopReason;

        let path = |origin: u64, stop: StopReason| CablePath {
            origins: vec![format!("interface:{origin}").parse().unwrap()],
            segments: Vec::new(),
            destinations: Vec::new(),
            stop,
            is_complete: false,
            is_active: true,
            is_split: false,
        };
        let stored = vec![path(1, StopReason::DeadEnd), path(2, StopReason::DeadEnd)];
        let fresh = vec![path(2, StopReason::Endpoint), path(3, StopReason::DeadEnd)];

        let stale = stale_origins(&stored, &fresh);

        let names: Vec<String> = stale.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["interface:1", "interface:2", "interface:3"]);
    }
}
