//! Common test utilities shared across integration tests.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use cabletrace::domain::{TerminationId, TerminationKind};
use std::path::Path;
use std::process::{Command, Output};

pub fn iface(id: u64) -> TerminationId {
    TerminationId::new(TerminationKind::Interface, id)
}

pub fn front(id: u64) -> TerminationId {
    TerminationId::new(TerminationKind::FrontPort, id)
}

pub fn rear(id: u64) -> TerminationId {
    TerminationId::new(TerminationKind::RearPort, id)
}

pub fn circuit(id: u64) -> TerminationId {
    TerminationId::new(TerminationKind::CircuitTermination, id)
}

/// Run the cabletrace binary in `dir`, with colors and env logging off
pub fn run_cabletrace_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cabletrace"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("CABLETRACE_COLOR")
        .output()
        .expect("Failed to execute cabletrace binary")
}

/// Run a command and assert it succeeded, returning stdout
pub fn run_ok(dir: &Path, args: &[&str]) -> String {
    let output = run_cabletrace_in_dir(dir, args);
    assert!(
        output.status.success(),
        "cabletrace {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}
