//! Controlled heap allocations made by a worker
//!
//! Memory comes straight from the C allocator so that the harness observes
//! the same arenas any native program would get. The batch owns every
//! pointer and frees them when dropped.

#![allow(unsafe_code)] // malloc/free and filling raw memory require unsafe

use std::collections::TryReserveError;
use std::ptr::{self, NonNull};

use log::warn;

use super::record::AllocationRecord;
use crate::config::{AllocationMode, FILL_BYTE};
use crate::domain::{Address, Interval};

/// Allocations owned by one worker thread
///
/// Not `Send`: the batch is created, held and freed on the worker's own
/// thread, so each allocation is released through the arena that served it.
#[derive(Debug)]
pub struct AllocationBatch {
    blocks: Vec<Option<NonNull<u8>>>,
    records: Vec<AllocationRecord>,
}

impl AllocationBatch {
    /// Perform `count` allocations as described by `mode`
    ///
    /// Individual allocation failures are recorded, not returned.
    ///
    /// # Errors
    /// Returns an error if the bookkeeping for `count` allocations cannot be
    /// reserved
    pub fn allocate(mode: AllocationMode, count: usize) -> Result<Self, TryReserveError> {
        let Some(size) = mode.size() else {
            return Ok(Self::empty());
        };

        let mut blocks = Vec::new();
        blocks.try_reserve_exact(count)?;
        let mut records = Vec::new();
        records.try_reserve_exact(count)?;

        for index in 0..count {
            // SAFETY: malloc accepts any size; a null return is handled below.
            let block = NonNull::new(unsafe { libc::malloc(size) }.cast::<u8>());

            let record = match block {
                Some(ptr) => {
                    if mode.fills() {
                        // SAFETY: `ptr` was just returned by malloc for `size` bytes.
                        unsafe { ptr::write_bytes(ptr.as_ptr(), FILL_BYTE, size) };
                    }
                    AllocationRecord {
                        interval: Interval::from_start_len(
                            Address::from_ptr(ptr.as_ptr().cast_const()),
                            size as u64,
                        ),
                        requested_size: size,
                        succeeded: true,
                    }
                }
                None => {
                    warn!("Failed to allocate {size} bytes on malloc {}", index + 1);
                    AllocationRecord::failed(size)
                }
            };

            blocks.push(block);
            records.push(record);
        }

        Ok(Self { blocks, records })
    }

    /// A batch with no allocations
    #[must_use]
    pub fn empty() -> Self {
        Self { blocks: Vec::new(), records: Vec::new() }
    }

    /// One record per requested allocation, in request order
    #[must_use]
    pub fn records(&self) -> &[AllocationRecord] {
        &self.records
    }
}

impl Drop for AllocationBatch {
    fn drop(&mut self) {
        for block in self.blocks.drain(..).flatten() {
            // SAFETY: every non-null block came from malloc and is freed once.
            unsafe { libc::free(block.as_ptr().cast()) };
        }
    }
}
