//! Worker state collection
//!
//! Each worker thread records its own stack bounds and performs its own
//! allocations, then publishes a [`WorkerRecord`] over a channel. Sending the
//! record is the readiness barrier: the orchestrator only ever sees a record
//! after the worker has finished writing it, so no locks are involved.
//!
//! - `stack`: pthread stack and TID queries
//! - `allocations`: malloc batch owned by one worker
//! - `worker`: the per-thread lifecycle
//! - `pool`: spawning, bounded readiness wait, shutdown and join
//! - `shutdown`: the shared cooperative shutdown token

pub mod allocations;
pub mod pool;
pub mod record;
pub mod shutdown;
pub mod stack;
pub mod worker;

pub use pool::{SetupOutcome, WorkerPool};
pub use record::{AllocationRecord, WorkerFailure, WorkerRecord};
pub use shutdown::ShutdownToken;
