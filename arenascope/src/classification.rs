//! Region classification: correlating worker records with the memory map.
//!
//! Every mapped region gets one structural category and a list of the worker
//! stacks and allocations that intersect it. The structural categories come
//! from allocator layout heuristics, so they are signatures rather than
//! guarantees; the attributions are exact interval arithmetic.
//!
//! # Classification Order
//!
//! Evaluated per region, looking at its immediate neighbours in snapshot order:
//!
//! 1. **Main heap** - the next region starts more than
//!    [`LayoutHeuristics::heap_gap`] bytes above this one
//! 2. **Thread arena** - this region and its successor add up to
//!    [`LayoutHeuristics::arena_size_kb`] and this one is readable (the data
//!    segment), or this region and its predecessor add up to it and this one
//!    is not readable (the guard segment)
//! 3. **Thread stack** - the first worker whose stack overlaps the region
//! 4. **Plain** - none of the above
//!
//! The first structural match decides the category. Allocation attribution
//! runs for every region regardless of category: a stack region may still
//! hold allocations of a different worker, and all of them are listed.

use log::info;

use crate::config::LayoutHeuristics;
use crate::domain::{Interval, Tid, WorkerId};
use crate::snapshot::MappedRegion;
use crate::workers::WorkerRecord;

/// Structural role of a mapped region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionCategory {
    MainHeap,
    ThreadArena,
    ThreadStack,
    Plain,
}

impl RegionCategory {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            RegionCategory::MainHeap => "main heap",
            RegionCategory::ThreadArena => "thread arena",
            RegionCategory::ThreadStack => "thread stack",
            RegionCategory::Plain => "plain",
        }
    }
}

/// Where the report should draw a separator relative to a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectionBreak {
    #[default]
    None,
    Before,
    After,
    Around,
}

impl SectionBreak {
    #[must_use]
    pub fn before(self) -> bool {
        matches!(self, SectionBreak::Before | SectionBreak::Around)
    }

    #[must_use]
    pub fn after(self) -> bool {
        matches!(self, SectionBreak::After | SectionBreak::Around)
    }
}

/// What part of a worker intersects a region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributionKind {
    Stack,
    /// 0-based index into the worker's allocation list
    Allocation { index: usize },
}

/// A worker stack or allocation overlapping a region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribution {
    pub worker: WorkerId,
    pub native_id: Tid,
    pub kind: AttributionKind,
    /// The worker's own range, not clipped to the region
    pub interval: Interval,
}

/// A mapped region with its category and intersecting worker data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRegion {
    pub region: MappedRegion,
    pub category: RegionCategory,
    pub section_break: SectionBreak,
    /// Stack attribution first (if any), then allocations in worker order
    pub overlapping_workers: Vec<Attribution>,
}

/// Classify every region, keeping snapshot order
#[must_use]
pub fn classify_regions(
    regions: &[MappedRegion],
    workers: &[WorkerRecord],
    heuristics: &LayoutHeuristics,
) -> Vec<ClassifiedRegion> {
    let classified: Vec<ClassifiedRegion> = regions
        .iter()
        .enumerate()
        .map(|(idx, region)| {
            let prev = idx.checked_sub(1).and_then(|i| regions.get(i));
            let next = regions.get(idx + 1);
            classify_region(prev, region, next, workers, heuristics)
        })
        .collect();

    info!("Classified {} regions against {} workers", classified.len(), workers.len());
    classified
}

/// Classify a single region given its neighbours
#[must_use]
pub fn classify_region(
    prev: Option<&MappedRegion>,
    current: &MappedRegion,
    next: Option<&MappedRegion>,
    workers: &[WorkerRecord],
    heuristics: &LayoutHeuristics,
) -> ClassifiedRegion {
    let mut overlapping_workers = Vec::new();

    let (category, section_break) = if is_main_heap(current, next, heuristics.heap_gap) {
        (RegionCategory::MainHeap, SectionBreak::Around)
    } else if let Some(section_break) = arena_boundary(prev, current, next, heuristics.arena_size_kb)
    {
        (RegionCategory::ThreadArena, section_break)
    } else if let Some(owner) = stack_owner(current, workers) {
        overlapping_workers.push(Attribution {
            worker: owner.id,
            native_id: owner.native_id,
            kind: AttributionKind::Stack,
            interval: owner.stack,
        });
        (RegionCategory::ThreadStack, SectionBreak::Around)
    } else {
        (RegionCategory::Plain, SectionBreak::None)
    };

    overlapping_workers.extend(allocation_attributions(current, workers));

    ClassifiedRegion { region: current.clone(), category, section_break, overlapping_workers }
}

/// A huge jump to the next region marks the brk heap below the mmap area
fn is_main_heap(current: &MappedRegion, next: Option<&MappedRegion>, heap_gap: u64) -> bool {
    next.and_then(|next| next.start().0.checked_sub(current.start().0))
        .is_some_and(|gap| gap > heap_gap)
}

/// Arena data segment (readable, sized with its successor) or guard segment
/// (unreadable, sized with its predecessor)
fn arena_boundary(
    prev: Option<&MappedRegion>,
    current: &MappedRegion,
    next: Option<&MappedRegion>,
    arena_size_kb: u64,
) -> Option<SectionBreak> {
    let sums_to_arena = |other: &MappedRegion| {
        current.size_kb.checked_add(other.size_kb) == Some(arena_size_kb)
    };

    if current.perms.read && next.is_some_and(sums_to_arena) {
        return Some(SectionBreak::Before);
    }
    if !current.perms.read && prev.is_some_and(sums_to_arena) {
        return Some(SectionBreak::After);
    }
    None
}

/// First worker, in iteration order, whose stack overlaps the region
fn stack_owner<'a>(current: &MappedRegion, workers: &'a [WorkerRecord]) -> Option<&'a WorkerRecord> {
    workers.iter().find(|worker| worker.stack.overlaps(&current.interval))
}

fn allocation_attributions<'a>(
    current: &'a MappedRegion,
    workers: &'a [WorkerRecord],
) -> impl Iterator<Item = Attribution> + 'a {
    workers.iter().flat_map(move |worker| {
        worker
            .successful_allocations()
            .filter(move |(_, alloc)| alloc.interval.overlaps(&current.interval))
            .map(move |(index, alloc)| Attribution {
                worker: worker.id,
                native_id: worker.native_id,
                kind: AttributionKind::Allocation { index },
                interval: alloc.interval,
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Permissions;
    use crate::workers::AllocationRecord;

    const KB: u64 = 1024;

    fn region(start: u64, size_kb: u64, mode: &str) -> MappedRegion {
        let mut region = MappedRegion::new(start, size_kb);
        region.perms = Permissions::from_mode(mode);
        region
    }

    fn worker(id: u32, stack: Interval, allocations: &[Interval]) -> WorkerRecord {
        WorkerRecord {
            id: WorkerId(id),
            native_id: Tid(1000 + i32::try_from(id).unwrap()),
            stack,
            allocations: allocations
                .iter()
                .map(|&interval| AllocationRecord {
                    interval,
                    requested_size: usize::try_from(interval.len()).unwrap(),
                    succeeded: true,
                })
                .collect(),
            ready: true,
        }
    }

    fn heuristics() -> LayoutHeuristics {
        LayoutHeuristics { heap_gap: 0x2000_0000_0000, arena_size_kb: 512 }
    }

    #[test]
    fn test_region_equal_to_stack_is_thread_stack() {
        let stack = Interval::new(0x7f00_0000_0000, 0x7f00_0000_0000 + 8192 * KB);
        let workers = vec![worker(0, Interval::new(0x1000, 0x2000), &[]), worker(1, stack, &[])];
        let regions = vec![region(0x7f00_0000_0000, 8192, "rw---")];

        let classified = classify_regions(&regions, &workers, &heuristics());

        assert_eq!(classified[0].category, RegionCategory::ThreadStack);
        assert_eq!(classified[0].section_break, SectionBreak::Around);
        assert_eq!(classified[0].overlapping_workers.len(), 1);
        let attribution = classified[0].overlapping_workers[0];
        assert_eq!(attribution.worker, WorkerId(1));
        assert_eq!(attribution.kind, AttributionKind::Stack);
        assert_eq!(attribution.interval, stack);
    }

    #[test]
    fn test_first_stack_match_wins() {
        let stack = Interval::new(0x10_000, 0x20_000);
        let workers = vec![worker(3, stack, &[]), worker(4, stack, &[])];
        let regions = vec![region(0x10_000, 64, "rw---")];

        let classified = classify_regions(&regions, &workers, &heuristics());
        let stacks: Vec<_> = classified[0]
            .overlapping_workers
            .iter()
            .filter(|a| a.kind == AttributionKind::Stack)
            .collect();
        assert_eq!(stacks.len(), 1);
        assert_eq!(stacks[0].worker, WorkerId(3));
    }

    #[test]
    fn test_arena_pair_is_detected() {
        let regions = vec![
            region(0x7f00_0000_0000, 132, "rw---"),
            region(0x7f00_0000_0000 + 132 * KB, 380, "-----"),
        ];

        let classified = classify_regions(&regions, &[], &heuristics());

        assert_eq!(classified[0].category, RegionCategory::ThreadArena);
        assert_eq!(classified[0].section_break, SectionBreak::Before);
        // The unreadable tail sized with its predecessor is the guard segment
        assert_eq!(classified[1].category, RegionCategory::ThreadArena);
        assert_eq!(classified[1].section_break, SectionBreak::After);
    }

    #[test]
    fn test_unreadable_first_half_is_not_arena_start() {
        let regions = vec![region(0x1000, 100, "-----"), region(0x1000 + 100 * KB, 412, "rw---")];

        let classified = classify_regions(&regions, &[], &heuristics());

        assert_eq!(classified[0].category, RegionCategory::Plain);
        // Readable region does not qualify as a guard segment either
        assert_eq!(classified[1].category, RegionCategory::Plain);
    }

    #[test]
    fn test_sizes_not_summing_to_arena_are_plain() {
        let regions = vec![region(0x1000, 132, "rw---"), region(0x1000 + 132 * KB, 100, "-----")];
        let classified = classify_regions(&regions, &[], &heuristics());
        assert!(classified.iter().all(|c| c.category == RegionCategory::Plain));
    }

    #[test]
    fn test_main_heap_before_large_gap() {
        let regions = vec![
            region(0x5555_5555_9000, 132, "rw---"),
            region(0x7f00_0000_0000, 4, "r----"),
        ];

        let classified = classify_regions(&regions, &[], &heuristics());

        assert_eq!(classified[0].category, RegionCategory::MainHeap);
        assert_eq!(classified[0].section_break, SectionBreak::Around);
        assert_eq!(classified[1].category, RegionCategory::Plain);
    }

    #[test]
    fn test_gap_equal_to_threshold_is_not_heap() {
        let regions = vec![region(0x1000, 4, "rw---"), region(0x1000 + 0x2000_0000_0000, 4, "rw---")];
        let classified = classify_regions(&regions, &[], &heuristics());
        assert_eq!(classified[0].category, RegionCategory::Plain);
    }

    #[test]
    fn test_heap_takes_precedence_over_arena_and_stack() {
        let stack = Interval::new(0x1000, 0x2000);
        let workers = vec![worker(0, stack, &[])];
        let regions = vec![region(0x1000, 256, "rw---"), region(0x3000_0000_0000, 256, "-----")];

        let classified = classify_regions(&regions, &workers, &heuristics());

        assert_eq!(classified[0].category, RegionCategory::MainHeap);
        // Stack attribution is only recorded for stack-classified regions
        assert!(classified[0].overlapping_workers.is_empty());
    }

    #[test]
    fn test_allocations_attributed_regardless_of_category() {
        let stack = Interval::new(0x10_0000, 0x20_0000);
        let alloc = Interval::new(0x18_0000, 0x18_1000);
        let workers = vec![worker(0, stack, &[]), worker(1, Interval::new(0x90_0000, 0x91_0000), &[alloc])];
        let regions = vec![region(0x10_0000, 1024, "rw---")];

        let classified = classify_regions(&regions, &workers, &heuristics());
        let attributions = &classified[0].overlapping_workers;

        assert_eq!(classified[0].category, RegionCategory::ThreadStack);
        assert_eq!(attributions.len(), 2);
        assert_eq!(attributions[0].kind, AttributionKind::Stack);
        assert_eq!(attributions[0].worker, WorkerId(0));
        assert_eq!(attributions[1].kind, AttributionKind::Allocation { index: 0 });
        assert_eq!(attributions[1].worker, WorkerId(1));
    }

    #[test]
    fn test_every_overlapping_allocation_is_listed() {
        let allocs = [Interval::new(0x1000, 0x1400), Interval::new(0x1400, 0x1800)];
        let workers = vec![
            worker(0, Interval::new(0x90_0000, 0x91_0000), &allocs),
            worker(1, Interval::new(0xa0_0000, 0xa1_0000), &[Interval::new(0x1800, 0x1c00)]),
        ];
        let regions = vec![region(0x1000, 4, "rw---")];

        let classified = classify_regions(&regions, &workers, &heuristics());
        let kinds: Vec<_> = classified[0]
            .overlapping_workers
            .iter()
            .map(|a| (a.worker.0, a.kind))
            .collect();

        assert_eq!(
            kinds,
            vec![
                (0, AttributionKind::Allocation { index: 0 }),
                (0, AttributionKind::Allocation { index: 1 }),
                (1, AttributionKind::Allocation { index: 0 }),
            ]
        );
    }

    #[test]
    fn test_allocation_touching_region_end_is_not_attributed() {
        let workers = vec![worker(0, Interval::new(0x90_0000, 0x91_0000), &[Interval::new(0x2000, 0x3000)])];
        let regions = vec![region(0x1000, 4, "rw---")];

        let classified = classify_regions(&regions, &workers, &heuristics());
        assert!(classified[0].overlapping_workers.is_empty());
    }

    #[test]
    fn test_failed_allocation_keeps_index_of_later_ones() {
        let mut record = worker(0, Interval::new(0x90_0000, 0x91_0000), &[]);
        record.allocations.push(AllocationRecord::failed(4096));
        record.allocations.push(AllocationRecord {
            interval: Interval::new(0x1000, 0x2000),
            requested_size: 4096,
            succeeded: true,
        });
        let regions = vec![region(0x1000, 4, "rw---")];

        let classified = classify_regions(&regions, &[record], &heuristics());
        assert_eq!(
            classified[0].overlapping_workers[0].kind,
            AttributionKind::Allocation { index: 1 }
        );
    }

    #[test]
    fn test_order_is_preserved() {
        let regions = vec![region(0x3000, 4, "rw---"), region(0x1000, 4, "r----"), region(0x2000, 4, "r-x--")];
        let classified = classify_regions(&regions, &[], &heuristics());
        let starts: Vec<u64> = classified.iter().map(|c| c.region.start().0).collect();
        assert_eq!(starts, vec![0x3000, 0x1000, 0x2000]);
    }

    #[test]
    fn test_section_break_helpers() {
        assert!(SectionBreak::Around.before() && SectionBreak::Around.after());
        assert!(SectionBreak::Before.before() && !SectionBreak::Before.after());
        assert!(!SectionBreak::None.before() && !SectionBreak::None.after());
    }
}
