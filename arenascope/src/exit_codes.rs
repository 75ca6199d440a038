//! Process exit codes and the mapping from errors to them

use crate::domain::{HarnessError, SnapshotError};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
/// Invalid command-line configuration
pub const EXIT_USAGE: i32 = 2;
/// The memory map could not be captured or was empty
pub const EXIT_SNAPSHOT: i32 = 3;

/// Pick the exit code for a failed run
///
/// Looks through any `.context(...)` layers to the underlying domain error.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<SnapshotError>().is_some() {
        EXIT_SNAPSHOT
    } else if matches!(err.downcast_ref::<HarnessError>(), Some(HarnessError::InvalidConfig(_))) {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}
