//! Plain-text rendering of workers and classified regions
//!
//! Purely presentational: every decision (category, separators,
//! attributions) was made by the classifier.

use std::io::{self, Write};

use crate::classification::{Attribution, AttributionKind, ClassifiedRegion};
use crate::workers::{WorkerFailure, WorkerRecord};

/// Drawn around heap, arena and stack regions
pub const SEPARATOR: &str = "#################################";

/// Write one block per worker: its stack, then every allocation in order
///
/// # Errors
/// Returns any error from the underlying writer
pub fn write_worker_summary<W: Write>(
    mut out: W,
    records: &[WorkerRecord],
    failures: &[WorkerFailure],
) -> io::Result<()> {
    for record in records {
        let prefix = format!("Thread {} (TID: {})", record.id, record.native_id);
        writeln!(out, "{prefix} - Stack: {} (size: {} bytes)", record.stack, record.stack.len())?;

        for (index, alloc) in record.allocations.iter().enumerate() {
            let number = index + 1;
            if alloc.succeeded {
                writeln!(
                    out,
                    "{prefix} - Malloc #{number}: {} (size: {} bytes)",
                    alloc.interval, alloc.requested_size
                )?;
            } else {
                writeln!(
                    out,
                    "{prefix} - Malloc #{number}: failed (requested: {} bytes)",
                    alloc.requested_size
                )?;
            }
        }
    }

    for failure in failures {
        writeln!(out, "Thread {} - setup failed: {}", failure.worker, failure.reason)?;
    }

    Ok(())
}

/// Write the region table with attribution lines and section separators
///
/// # Errors
/// Returns any error from the underlying writer
pub fn write_regions<W: Write>(mut out: W, regions: &[ClassifiedRegion]) -> io::Result<()> {
    writeln!(
        out,
        "{:<16} {:>8} {:>8} {:>8} {} {} {} {}",
        "Address", "Kbytes", "RSS", "Dirty", "R", "W", "X", "Mapping"
    )?;

    let mut last_was_separator = false;

    for classified in regions {
        if classified.section_break.before() && !last_was_separator {
            writeln!(out, "{SEPARATOR}")?;
        }

        writeln!(out, "{}", format_region_row(classified))?;
        for attribution in &classified.overlapping_workers {
            writeln!(out, "\t{}", format_attribution(attribution))?;
        }
        last_was_separator = false;

        if classified.section_break.after() {
            writeln!(out, "{SEPARATOR}")?;
            last_was_separator = true;
        }
    }

    Ok(())
}

/// Render the whole table into a string
#[must_use]
pub fn render_regions(regions: &[ClassifiedRegion]) -> String {
    let mut buffer = Vec::new();
    // Writing to a Vec cannot fail
    let _ = write_regions(&mut buffer, regions);
    String::from_utf8_lossy(&buffer).into_owned()
}

/// One aligned table row
#[must_use]
pub fn format_region_row(classified: &ClassifiedRegion) -> String {
    let region = &classified.region;
    let [r, w, x] = region.perms.letters();
    format!(
        "{:016x} {:>8} {:>8} {:>8} {r} {w} {x} {}",
        region.start(),
        region.size_kb,
        region.resident_kb,
        region.dirty_kb,
        region.path.as_deref().unwrap_or("")
    )
    .trim_end()
    .to_string()
}

/// `Thread <id> (TID: <tid>) - Stack: [...]` or `... - Malloc #<n>: [...]`
#[must_use]
pub fn format_attribution(attribution: &Attribution) -> String {
    let what = match attribution.kind {
        AttributionKind::Stack => "Stack".to_string(),
        AttributionKind::Allocation { index } => format!("Malloc #{}", index + 1),
    };
    format!(
        "Thread {} (TID: {}) - {what}: {} (size: {} bytes)",
        attribution.worker,
        attribution.native_id,
        attribution.interval,
        attribution.interval.len()
    )
}
