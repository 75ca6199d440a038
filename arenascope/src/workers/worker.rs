//! Body of a single worker thread
//!
//! Setup runs once: record the stack, perform the allocations, publish the
//! record. The worker then idles until shutdown and frees its memory on the
//! way out.

use crossbeam_channel::Sender;
use log::{debug, warn};

use super::allocations::AllocationBatch;
use super::record::{WorkerFailure, WorkerRecord};
use super::shutdown::ShutdownToken;
use super::stack::{current_thread_stack, current_tid};
use crate::config::HarnessConfig;
use crate::domain::WorkerId;

/// What a worker reports back to the orchestrator, exactly once
#[derive(Debug)]
pub enum WorkerEvent {
    Ready(WorkerRecord),
    Failed(WorkerFailure),
}

/// Run the worker lifecycle on the calling thread
pub fn run_worker(
    id: WorkerId,
    config: &HarnessConfig,
    shutdown: &ShutdownToken,
    events: &Sender<WorkerEvent>,
) {
    let native_id = current_tid();

    let stack = match current_thread_stack() {
        Ok(stack) => stack,
        Err(e) => {
            warn!("Thread {id} (TID: {native_id}) could not read its stack attributes: {e}");
            // Receiver gone means the orchestrator already gave up on us
            let _ = events.send(WorkerEvent::Failed(WorkerFailure {
                worker: id,
                reason: format!("pthread_getattr_np: {e}"),
            }));
            return;
        }
    };

    let count = config.effective_allocation_count();
    let batch = match AllocationBatch::allocate(config.allocation, count) {
        Ok(batch) => batch,
        Err(e) => {
            warn!("Thread {id} failed to allocate memory for malloc pointers: {e}");
            let _ = events.send(WorkerEvent::Failed(WorkerFailure {
                worker: id,
                reason: format!("allocation bookkeeping: {e}"),
            }));
            return;
        }
    };

    let record = WorkerRecord {
        id,
        native_id,
        stack,
        allocations: batch.records().to_vec(),
        ready: true,
    };

    debug!(
        "Thread {id} started. TID: {native_id}, stack {} ({} bytes), {} allocations",
        record.stack,
        record.stack.len(),
        record.allocations.len()
    );

    if events.send(WorkerEvent::Ready(record)).is_ok() {
        shutdown.wait(config.poll_interval);
    }

    drop(batch);
    debug!("Thread {id} released its allocations");
}
