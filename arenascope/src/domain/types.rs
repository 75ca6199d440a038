//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep raw addresses, worker IDs and kernel thread IDs
//! apart, so a TID can never end up where a logical worker ID is expected and
//! an address is never mistaken for an owning pointer.

use std::fmt;

/// Virtual address inside this process
///
/// Only ever used for interval arithmetic. The classifier never turns an
/// `Address` back into a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub u64);

impl Address {
    /// Record the numeric value of a pointer
    #[must_use]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Address(ptr as usize as u64)
    }

    /// Offset this address, saturating at the top of the address space
    #[must_use]
    pub fn saturating_add(self, bytes: u64) -> Self {
        Address(self.0.saturating_add(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Half-open address range `[start, end)`
///
/// Stacks, allocations and mapped regions are all described by an
/// `Interval`. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Interval {
    pub start: Address,
    pub end: Address,
}

impl Interval {
    /// The zero interval recorded for failed allocations. Overlaps nothing.
    pub const EMPTY: Interval = Interval { start: Address(0), end: Address(0) };

    /// Create an interval from explicit bounds (panics if `start > end`)
    #[must_use]
    pub fn new(start: u64, end: u64) -> Self {
        assert!(start <= end, "Interval start 0x{start:x} is past its end 0x{end:x}");
        Self { start: Address(start), end: Address(end) }
    }

    /// Create an interval covering `len` bytes from `start`
    #[must_use]
    pub fn from_start_len(start: Address, len: u64) -> Self {
        Self { start, end: start.saturating_add(len) }
    }

    /// Number of bytes covered
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end.0 - self.start.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Half-open overlap test: `[0, 10)` and `[10, 20)` do not overlap.
    ///
    /// Every adjacency decision in the crate goes through this predicate.
    #[must_use]
    pub fn overlaps(&self, other: &Interval) -> bool {
        overlaps(*self, *other)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} - {}]", self.start, self.end)
    }
}

/// `a.start < b.end && b.start < a.end`
#[must_use]
pub fn overlaps(a: Interval, b: Interval) -> bool {
    a.start < b.end && b.start < a.end
}

/// Worker ID (0-indexed)
///
/// The harness's logical ID for a spawned thread (0, 1, 2, ...).
/// This is NOT the same as the kernel thread ID (TID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u32);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kernel thread ID, as returned by `gettid()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tid(pub i32);

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(pub u32);

impl Pid {
    /// PID of the running harness
    #[must_use]
    pub fn current() -> Self {
        Pid(std::process::id())
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
