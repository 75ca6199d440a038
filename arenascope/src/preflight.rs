//! Pre-flight checks for arenascope
//!
//! Validates that a snapshot can actually be taken before any worker is
//! spawned. Provides clear, actionable error messages when it cannot.

use anyhow::{bail, Context, Result};
use std::io::ErrorKind;
use std::process::Command;

/// Run all pre-flight checks
///
/// `snapshot_tool` is `None` when replaying a saved capture, in which case
/// the external tool is not needed.
///
/// # Errors
/// Returns an error describing the first failed check
pub fn run_preflight_checks(snapshot_tool: Option<&str>) -> Result<()> {
    check_proc_access()?;
    if let Some(program) = snapshot_tool {
        check_snapshot_tool(program)?;
    }
    Ok(())
}

/// Check that the memory map tool can be started
///
/// # Errors
/// Returns an error if the program is missing or cannot be executed
pub fn check_snapshot_tool(program: &str) -> Result<()> {
    match Command::new(program).arg("--version").output() {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => bail!(
            "Memory map tool not found: {program}\n\n\
             Install procps (provides pmap), pass --pmap <PROGRAM>,\n\
             or classify a saved capture with --snapshot-file <FILE>."
        ),
        Err(e) => Err(e).with_context(|| format!("Cannot run memory map tool {program}")),
    }
}

/// Check that this process can read its own memory maps
///
/// # Errors
/// Returns an error if `/proc/self/maps` is not readable
pub fn check_proc_access() -> Result<()> {
    std::fs::read_to_string("/proc/self/maps").context(
        "Cannot read /proc/self/maps\n\n\
         This usually means /proc is not mounted.",
    )?;
    Ok(())
}
