//! Per-worker records published to the orchestrator
//!
//! Records only carry integer bounds. The memory they describe stays owned by
//! the worker thread that allocated it.

use crate::domain::{Interval, Tid, WorkerId};

/// One requested allocation inside a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationRecord {
    /// `[ptr, ptr + requested_size)`, or [`Interval::EMPTY`] on failure
    pub interval: Interval,
    pub requested_size: usize,
    pub succeeded: bool,
}

impl AllocationRecord {
    #[must_use]
    pub fn failed(requested_size: usize) -> Self {
        Self { interval: Interval::EMPTY, requested_size, succeeded: false }
    }
}

/// Everything one worker learned about its own memory during setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRecord {
    pub id: WorkerId,
    pub native_id: Tid,
    pub stack: Interval,
    /// In allocation order
    pub allocations: Vec<AllocationRecord>,
    /// Set once, right before the record is published
    pub ready: bool,
}

impl WorkerRecord {
    /// Successful allocations with their 0-based index in `allocations`
    pub fn successful_allocations(&self) -> impl Iterator<Item = (usize, &AllocationRecord)> {
        self.allocations.iter().enumerate().filter(|(_, alloc)| alloc.succeeded)
    }

    /// Number of allocations that could not be satisfied
    #[must_use]
    pub fn failed_allocation_count(&self) -> usize {
        self.allocations.iter().filter(|alloc| !alloc.succeeded).count()
    }
}

/// A worker that exited during setup without publishing a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    pub worker: WorkerId,
    pub reason: String,
}
