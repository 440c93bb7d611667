//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `init`: create `.cabletrace/` in the current directory
//! - `add` / `remove`: create or delete terminations
//! - `connect` / `disconnect` / `status`: manage cables
//! - `map`: move a front port to another rear port position
//! - `trace`: trace afresh from an origin
//! - `show`: print the stored path of an origin
//! - `rebuild`: retrace one origin or every cabled endpoint
//! - `check`: report stored paths that a rebuild would change
//!
//! Terminations are written `<kind>:<id>`, e.g. `interface:12` or
//! `rear_port:3`; cables as `12` or `#12`.
//!
//! # Example
//!
//! ```bash
//! cabletrace add interface 1 -n eth0 -d 1
//! cabletrace add rear_port 1 -n RP1 -d 9 --positions 2
//! cabletrace add front_port 1 -n FP1 -d 9 --rear-port 1 --position 1
//! cabletrace connect -a interface:1 -b front_port:1 --length 3 --unit m
//! cabletrace show interface:1
//! ```

mod args;
mod execute;
mod types;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

pub use args::{
    AddArgs, CheckArgs, ConnectArgs, DisconnectArgs, InitArgs, MapArgs, RebuildArgs, RemoveArgs,
    ShowArgs, StatusArgs, TraceArgs,
};
pub use types::{CableStatusArg, CircuitSideArg, LengthUnitArg};

/// Cabletrace: trace physical cable paths through patch panels and circuits
///
/// Topology and cached paths live in `.cabletrace/` as JSON Lines files.
#[derive(Parser, Debug)]
#[command(name = "cabletrace")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a cabletrace workspace
    Init(InitArgs),

    /// Add a termination
    ///
    /// Front ports need `--rear-port`; circuit terminations need `--circuit`.
    Add(AddArgs),

    /// Remove a termination
    ///
    /// Removing a rear port also removes its front ports. Cables keep their
    /// other terminations.
    Remove(RemoveArgs),

    /// Create a cable between two sets of terminations
    Connect(ConnectArgs),

    /// Delete a cable
    Disconnect(DisconnectArgs),

    /// Change a cable's status
    Status(StatusArgs),

    /// Map a front port to a rear port position
    Map(MapArgs),

    /// Trace from an origin without updating stored paths
    Trace(TraceArgs),

    /// Show the stored path of an origin
    Show(ShowArgs),

    /// Retrace stored paths and save them
    Rebuild(RebuildArgs),

    /// Check that every stored path matches a fresh trace
    Check(CheckArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    #[must_use]
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    ///
    /// # Errors
    ///
    /// Returns clap's error for invalid arguments.
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Default log filter for the `-v` count.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "cabletrace=warn,cabletrace_jsonl=warn",
            1 => "cabletrace=info,cabletrace_jsonl=info",
            2 => "cabletrace=debug,cabletrace_jsonl=debug",
            _ => "cabletrace=trace,cabletrace_jsonl=trace",
        }
    }

    /// Execute the CLI command
    ///
    /// # Errors
    ///
    /// Returns any error from loading the workspace or running the command.
    pub async fn execute(&self) -> Result<()> {
        use crate::app::App;
        use crate::output::OutputMode;

        let mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        let Some(command) = &self.command else {
            println!("Cabletrace cable path tracer");
            println!("Use --help for more information");
            return Ok(());
        };

        if let Commands::Init(args) = command {
            return execute::execute_init(args).await;
        }

        let mut app = App::from_directory(&std::env::current_dir()?).await?;
        match command {
            Commands::Init(_) => Ok(()),
            Commands::Add(args) => execute::execute_add(&mut app, args, mode).await,
            Commands::Remove(args) => execute::execute_remove(&mut app, args, mode).await,
            Commands::Connect(args) => execute::execute_connect(&mut app, args, mode).await,
            Commands::Disconnect(args) => execute::execute_disconnect(&mut app, args, mode).await,
            Commands::Status(args) => execute::execute_status(&mut app, args, mode).await,
            Commands::Map(args) => execute::execute_map(&mut app, args, mode).await,
            Commands::Trace(args) => execute::execute_trace(&app, args, mode),
            Commands::Show(args) => execute::execute_show(&app, args, mode),
            Commands::Rebuild(args) => execute::execute_rebuild(&mut app, args, mode).await,
            Commands::Check(args) => execute::execute_check(&app, args, mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CableId, TerminationId, TerminationKind};

    #[test]
    fn no_command_parses() {
        let cli = Cli::try_parse_from(["cabletrace"]).unwrap();

        assert!(cli.command.is_none());
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::try_parse_from(["cabletrace", "-vv", "check"]).unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_filter(), "cabletrace=debug,cabletrace_jsonl=debug");
    }

    #[test]
    fn connect_takes_comma_separated_ends() {
        let cli = Cli::try_parse_from([
            "cabletrace",
            "connect",
            "-a",
            "interface:1,interface:2",
            "-b",
            "front_port:3",
            "--id",
            "#7",
            "--status",
            "planned",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Connect(args)) => {
                assert_eq!(args.a.len(), 2);
                assert_eq!(
                    args.b,
                    vec![TerminationId::new(TerminationKind::FrontPort, 3)]
                );
                assert_eq!(args.id, Some(CableId(7)));
                assert_eq!(args.status, CableStatusArg::Planned);
            }
            other => panic!("expected connect, got {other:?}"),
        }
    }

    #[test]
    fn length_requires_unit() {
        let result = Cli::try_parse_from([
            "cabletrace",
            "connect",
            "-a",
            "interface:1",
            "-b",
            "interface:2",
            "--length",
            "3",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn rejects_malformed_termination_ids() {
        assert!(Cli::try_parse_from(["cabletrace", "trace", "eth0"]).is_err());
        assert!(Cli::try_parse_from(["cabletrace", "trace", "socket:1"]).is_err());
    }

    #[test]
    fn rejects_out_of_range_positions() {
        assert!(Cli::try_parse_from(["cabletrace", "map", "front_port:1", "2", "0"]).is_err());
        assert!(Cli::try_parse_from(["cabletrace", "map", "front_port:1", "2", "1025"]).is_err());
    }

    #[test]
    fn json_flag_is_global() {
        let cli = Cli::try_parse_from(["cabletrace", "show", "interface:1", "--json"]).unwrap();

        assert!(cli.json);
        assert!(matches!(cli.command, Some(Commands::Show(_))));
    }
}
