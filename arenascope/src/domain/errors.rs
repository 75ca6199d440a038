//! Structured error types for arenascope
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::WorkerId;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Worker {worker} failed during setup: {reason}")]
    SetupFailure { worker: WorkerId, reason: String },

    #[error("Only {ready} of {expected} workers became ready within {timeout:?}")]
    SetupTimeout { ready: usize, expected: usize, timeout: Duration },

    #[error("Interrupted before every worker became ready")]
    Interrupted,

    #[error("Worker {0} panicked")]
    WorkerPanicked(WorkerId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to run memory map tool `{program}`: {source}")]
    Unavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Memory map tool `{program}` exited with {status}: {stderr}")]
    ToolFailed { program: String, status: String, stderr: String },

    #[error("Memory map snapshot has no regions after the header")]
    Empty,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_failure_display() {
        let err = HarnessError::SetupFailure {
            worker: WorkerId(3),
            reason: "pthread_getattr_np returned 12".to_string(),
        };
        assert_eq!(err.to_string(), "Worker 3 failed during setup: pthread_getattr_np returned 12");
    }

    #[test]
    fn test_setup_timeout_display() {
        let err = HarnessError::SetupTimeout {
            ready: 1,
            expected: 4,
            timeout: Duration::from_secs(2),
        };
        assert!(err.to_string().contains("1 of 4"));
    }

    #[test]
    fn test_tool_failed_display() {
        let err = SnapshotError::ToolFailed {
            program: "pmap".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "no such process".to_string(),
        };
        assert!(err.to_string().contains("pmap"));
        assert!(err.to_string().contains("no such process"));
    }
}
