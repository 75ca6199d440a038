//! # arenascope - Allocator Layout Inspector
//!
//! arenascope shows how a native memory allocator lays out its heaps inside
//! a process. It spawns a configurable number of worker threads, lets each
//! one record its stack and make controlled `malloc` calls, then reads the
//! live memory map of the process and attributes every mapped region to the
//! main heap, a per-thread arena, a thread stack, or nothing in particular,
//! listing which allocations fall inside which region.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐  WorkerRecord   ┌──────────────┐
//! │   Workers    │────(channel)───▶│   Session    │
//! │ stack+malloc │                 │ wait_ready() │
//! └──────────────┘                 └──────┬───────┘
//!                                         │ all ready
//!                                         ▼
//!                  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!  pmap -x <pid> ─▶│   Snapshot   │──▶│ Classifier   │──▶│    Report    │
//!                  │   parser     │   │ (heuristics) │   │  (stdout)    │
//!                  └──────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`domain`]: [`domain::Address`], [`domain::Interval`] and the overlap
//!   predicate every other module relies on, plus error types
//! - [`workers`]: worker threads, their records, readiness and shutdown
//! - [`snapshot`]: `pmap -x` table parsing and snapshot sources
//! - [`classification`]: heap / arena / stack heuristics and attribution
//! - [`report`]: table rendering
//! - [`session`]: one inspection pass tying the above together
//! - [`config`], [`cli`], [`preflight`]: configuration and startup checks
//! - [`exit_codes`]: process exit status for each kind of failure
//!
//! ## Typical Usage
//!
//! ```bash
//! # Four threads, one filled 4 KiB allocation each
//! arenascope -n 4 -f 4096
//!
//! # Keep the threads alive afterwards to look around with other tools
//! arenascope -n 4 -m 1048576 --hold
//! ```
//!
//! ## Heuristics
//!
//! The main-heap and arena checks encode glibc's conventional layout on
//! 64-bit Linux. Both thresholds live in [`config::LayoutHeuristics`] and can
//! be overridden from the command line when they misfire.

pub mod classification;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exit_codes;
pub mod preflight;
pub mod report;
pub mod session;
pub mod snapshot;
pub mod workers;
