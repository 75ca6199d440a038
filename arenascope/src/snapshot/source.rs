//! Where snapshot text comes from
//!
//! The live source shells out to `pmap -x <pid>`. A saved capture can be
//! replayed from a file instead, which keeps classification testable
//! without a running target.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use log::info;

use super::parser::parse_snapshot;
use super::region::MappedRegion;
use crate::domain::{Pid, SnapshotError};

/// Default external tool producing the region table
pub const DEFAULT_PMAP_PROGRAM: &str = "pmap";

/// Produces raw `pmap -x` style text
pub trait SnapshotSource {
    /// Human-readable description for log and error messages
    fn describe(&self) -> String;

    /// Fetch the raw table
    ///
    /// # Errors
    /// Returns a [`SnapshotError`] if the text cannot be obtained
    fn capture(&self) -> Result<String, SnapshotError>;
}

/// Runs the external map tool against a process
#[derive(Debug, Clone)]
pub struct PmapCommand {
    pub program: String,
    pub pid: Pid,
}

impl PmapCommand {
    /// `pmap -x` against the running harness
    #[must_use]
    pub fn for_current_process() -> Self {
        Self { program: DEFAULT_PMAP_PROGRAM.to_string(), pid: Pid::current() }
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl SnapshotSource for PmapCommand {
    fn describe(&self) -> String {
        format!("{} -x {}", self.program, self.pid)
    }

    fn capture(&self) -> Result<String, SnapshotError> {
        let output = Command::new(&self.program)
            .arg("-x")
            .arg(self.pid.to_string())
            .output()
            .map_err(|source| SnapshotError::Unavailable { program: self.program.clone(), source })?;

        if !output.status.success() {
            return Err(SnapshotError::ToolFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Replays a previously saved `pmap -x` capture
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    pub path: PathBuf,
}

impl SnapshotFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotSource for SnapshotFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn capture(&self) -> Result<String, SnapshotError> {
        Ok(fs::read_to_string(&self.path)?)
    }
}

/// Capture and parse a snapshot in one step
///
/// # Errors
/// Returns an error if the source fails or yields no region rows
pub fn take_snapshot(source: &dyn SnapshotSource) -> Result<Vec<MappedRegion>, SnapshotError> {
    let text = source.capture()?;
    let regions = parse_snapshot(&text)?;
    info!("Captured {} mapped regions from {}", regions.len(), source.describe());
    Ok(regions)
}
