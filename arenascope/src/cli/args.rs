//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    AllocationMode, HarnessConfig, LayoutHeuristics, DEFAULT_ALLOCATION_COUNT, DEFAULT_NUM_THREADS,
};
use crate::domain::{HarnessError, Pid};
use crate::snapshot::{PmapCommand, SnapshotFile, SnapshotSource, DEFAULT_PMAP_PROGRAM};

#[derive(Parser, Debug)]
#[command(
    name = "arenascope",
    about = "Show where thread stacks, malloc arenas and allocations land in the address space",
    after_help = "\
EXAMPLES:
    arenascope -n 4                          Stacks of 4 threads
    arenascope -n 4 -f 4096 -c 2             Two filled 4 KiB allocations per thread
    arenascope -n 8 -m 1048576 --hold        Keep running for inspection with other tools"
)]
pub struct Args {
    /// Number of worker threads
    #[arg(short = 'n', long, default_value_t = DEFAULT_NUM_THREADS)]
    pub num_threads: usize,

    /// Stack size for each thread in bytes (default: system default)
    #[arg(short = 's', long, value_name = "BYTES")]
    pub thread_stack_size: Option<usize>,

    /// Allocate memory inside each thread without touching it
    #[arg(
        short = 'm',
        long = "malloc-sparse-inside-thread",
        value_name = "BYTES",
        conflicts_with = "malloc_filled"
    )]
    pub malloc_sparse: Option<usize>,

    /// Allocate memory inside each thread and fill it with 0xAA
    #[arg(short = 'f', long = "malloc-filled-inside-thread", value_name = "BYTES")]
    pub malloc_filled: Option<usize>,

    /// Number of allocations inside each thread
    #[arg(short = 'c', long = "count-of-mallocs", default_value_t = DEFAULT_ALLOCATION_COUNT)]
    pub count: usize,

    /// Give up if workers are not ready after this many seconds
    #[arg(long, value_name = "SECS", default_value = "10")]
    pub setup_timeout: u64,

    /// Classify a saved `pmap -x` capture instead of the live process
    #[arg(long, value_name = "FILE")]
    pub snapshot_file: Option<PathBuf>,

    /// Memory map tool to run
    #[arg(long, value_name = "PROGRAM", default_value = DEFAULT_PMAP_PROGRAM)]
    pub pmap: String,

    /// Gap (bytes, decimal or 0x-hex) after the main heap
    #[arg(long, value_name = "BYTES", value_parser = parse_size)]
    pub heap_gap: Option<u64>,

    /// Combined size in KB of an arena's data and guard segments
    #[arg(long, value_name = "KB")]
    pub arena_size_kb: Option<u64>,

    /// Keep threads alive after the report until Ctrl+C
    #[arg(long)]
    pub hold: bool,

    /// Only print the region table
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Build the validated, immutable worker configuration
    ///
    /// # Errors
    /// Returns [`HarnessError::InvalidConfig`] if any limit is violated
    pub fn harness_config(&self) -> Result<HarnessConfig, HarnessError> {
        let allocation = match (self.malloc_sparse, self.malloc_filled) {
            (Some(size), None) => AllocationMode::Sparse { size },
            (None, Some(size)) => AllocationMode::Filled { size },
            (None, None) => AllocationMode::None,
            (Some(_), Some(_)) => {
                return Err(HarnessError::InvalidConfig(
                    "sparse and filled allocation modes are mutually exclusive".to_string(),
                ))
            }
        };

        let config = HarnessConfig {
            num_threads: self.num_threads,
            stack_size: self.thread_stack_size,
            allocation,
            allocations_per_thread: self.count,
            setup_timeout: Duration::from_secs(self.setup_timeout),
            ..HarnessConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Platform defaults with any command-line overrides applied
    #[must_use]
    pub fn heuristics(&self) -> LayoutHeuristics {
        let defaults = LayoutHeuristics::default();
        LayoutHeuristics {
            heap_gap: self.heap_gap.unwrap_or(defaults.heap_gap),
            arena_size_kb: self.arena_size_kb.unwrap_or(defaults.arena_size_kb),
        }
    }

    /// Saved capture if one was given, otherwise the live tool on this process
    #[must_use]
    pub fn snapshot_source(&self) -> Box<dyn SnapshotSource> {
        match &self.snapshot_file {
            Some(path) => Box::new(SnapshotFile::new(path.clone())),
            None => Box::new(PmapCommand { program: self.pmap.clone(), pid: Pid::current() }),
        }
    }
}

/// Accept `0x`-prefixed hex or plain decimal
fn parse_size(value: &str) -> Result<u64, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid size `{value}`: {e}"))
}
