//! One inspection pass: wait for workers, snapshot, classify
//!
//! The snapshot is only taken once every worker has reported, because stack
//! and allocation bounds are meaningless before setup completes.

use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::classification::{classify_regions, ClassifiedRegion};
use crate::config::LayoutHeuristics;
use crate::snapshot::{take_snapshot, SnapshotSource};
use crate::workers::{SetupOutcome, WorkerPool};

/// Everything the report needs from one pass
#[derive(Debug)]
pub struct Inspection {
    pub setup: SetupOutcome,
    pub regions: Vec<ClassifiedRegion>,
}

/// Wait for `pool` to finish setup, then snapshot and classify
///
/// # Errors
/// Returns the [`crate::domain::HarnessError`] from the readiness wait or the
/// [`crate::domain::SnapshotError`] from the snapshot, wrapped with context
pub fn inspect(
    pool: &WorkerPool,
    setup_timeout: Duration,
    source: &dyn SnapshotSource,
    heuristics: &LayoutHeuristics,
) -> Result<Inspection> {
    let setup = pool.wait_ready(setup_timeout).context("Workers did not finish setup")?;

    if !setup.failures.is_empty() {
        warn!("{} of {} workers failed setup", setup.failures.len(), pool.len());
    }
    let failed_allocations: usize = setup.records.iter().map(|r| r.failed_allocation_count()).sum();
    if failed_allocations > 0 {
        warn!("{failed_allocations} allocations could not be satisfied");
    }

    let snapshot = take_snapshot(source)
        .with_context(|| format!("Failed to capture memory map via {}", source.describe()))?;

    let regions = classify_regions(&snapshot, &setup.records, heuristics);
    info!("Inspection complete: {} workers ready, {} regions", setup.records.len(), regions.len());

    Ok(Inspection { setup, regions })
}
