//! Immutable harness configuration
//!
//! Everything a worker needs is decided before the first thread is spawned
//! and handed to each worker by value. Nothing here changes afterwards.

use std::time::Duration;

use crate::domain::HarnessError;

/// Number of worker threads when none is requested
pub const DEFAULT_NUM_THREADS: usize = 20;

/// Allocations per worker when allocation mode is enabled
pub const DEFAULT_ALLOCATION_COUNT: usize = 1;

/// Upper bound on how long the orchestrator waits for workers to publish
pub const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_secs(10);

/// How often idle workers look at the shutdown token
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Byte written over every filled allocation
pub const FILL_BYTE: u8 = 0xAA;

/// Gap between the main heap and the next mapping on 64-bit Linux.
///
/// Heuristic: brk-based heaps sit just above the executable, far below the
/// mmap area where thread arenas, stacks and libraries live.
pub const DEFAULT_HEAP_GAP: u64 = 0x2000_0000_0000;

/// Combined size in KB of a thread arena's data segment and guard segment.
///
/// Heuristic, tuned for glibc's default layout. Other allocators or glibc
/// builds may need `--arena-size-kb`.
///
/// Scales with the pointer width: 512 on 64-bit targets, 256 on 32-bit.
pub const DEFAULT_ARENA_SIZE_KB: u64 = 64 * std::mem::size_of::<*const u8>() as u64;

/// What each worker does with the heap during setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllocationMode {
    /// No allocations, only stacks are recorded
    #[default]
    None,
    /// `malloc` without touching the memory
    Sparse { size: usize },
    /// `malloc` and overwrite every byte with [`FILL_BYTE`]
    Filled { size: usize },
}

impl AllocationMode {
    /// Requested bytes per allocation, if allocation is enabled
    #[must_use]
    pub fn size(self) -> Option<usize> {
        match self {
            AllocationMode::None => None,
            AllocationMode::Sparse { size } | AllocationMode::Filled { size } => Some(size),
        }
    }

    #[must_use]
    pub fn fills(self) -> bool {
        matches!(self, AllocationMode::Filled { .. })
    }
}

/// Validated configuration shared read-only by every worker
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub num_threads: usize,
    /// Explicit stack size in bytes, `None` for the platform default
    pub stack_size: Option<usize>,
    pub allocation: AllocationMode,
    pub allocations_per_thread: usize,
    pub setup_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            num_threads: DEFAULT_NUM_THREADS,
            stack_size: None,
            allocation: AllocationMode::None,
            allocations_per_thread: DEFAULT_ALLOCATION_COUNT,
            setup_timeout: DEFAULT_SETUP_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl HarnessConfig {
    /// Reject values the harness cannot run with
    ///
    /// # Errors
    /// Returns [`HarnessError::InvalidConfig`] describing the first violated limit
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.num_threads == 0 {
            return Err(HarnessError::InvalidConfig(
                "number of threads must be a positive integer".to_string(),
            ));
        }
        if let Some(stack_size) = self.stack_size {
            let min = min_stack_size();
            if stack_size < min {
                return Err(HarnessError::InvalidConfig(format!(
                    "stack size {stack_size} is below the platform minimum of {min} bytes"
                )));
            }
        }
        if self.allocation.size() == Some(0) {
            return Err(HarnessError::InvalidConfig(
                "allocation size must be a positive integer".to_string(),
            ));
        }
        if self.allocations_per_thread == 0 {
            return Err(HarnessError::InvalidConfig(
                "count of allocations must be a positive integer".to_string(),
            ));
        }
        if self.setup_timeout.is_zero() {
            return Err(HarnessError::InvalidConfig("setup timeout must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Allocations each worker performs (zero when allocation is off)
    #[must_use]
    pub fn effective_allocation_count(&self) -> usize {
        if self.allocation.size().is_some() {
            self.allocations_per_thread
        } else {
            0
        }
    }
}

/// Smallest stack size pthreads accepts
#[must_use]
pub fn min_stack_size() -> usize {
    libc::PTHREAD_STACK_MIN
}

/// Allocator layout heuristics used by the region classifier
///
/// Both values describe one allocator's conventions on one platform. They
/// are signatures, not guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutHeuristics {
    /// Minimum distance between a region's start and the next region's start
    /// for the region to be taken as the main heap
    pub heap_gap: u64,
    /// Sum of two adjacent region sizes (KB) that marks a thread arena
    pub arena_size_kb: u64,
}

impl Default for LayoutHeuristics {
    fn default() -> Self {
        Self { heap_gap: DEFAULT_HEAP_GAP, arena_size_kb: DEFAULT_ARENA_SIZE_KB }
    }
}
