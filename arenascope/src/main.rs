//! # arenascope - Main Entry Point
//!
//! Spawns the workers, waits for them, snapshots and classifies the address
//! space, prints the report, and optionally holds until Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::io::{self, BufWriter, Write};

use arenascope::cli::Args;
use arenascope::domain::{HarnessError, Pid};
use arenascope::exit_codes::{exit_code_for, EXIT_SUCCESS};
use arenascope::preflight::run_preflight_checks;
use arenascope::report::{write_regions, write_worker_summary, SEPARATOR};
use arenascope::session::inspect;
use arenascope::workers::WorkerPool;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_code_for(&e)
        }
    });
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    let config = args.harness_config()?;
    let heuristics = args.heuristics();
    let source = args.snapshot_source();

    let live_tool = args.snapshot_file.is_none().then_some(args.pmap.as_str());
    run_preflight_checks(live_tool)?;

    if !quiet {
        println!("arenascope v{}", env!("CARGO_PKG_VERSION"));
        println!("pid: {}", Pid::current());
        println!("threads: {}", config.num_threads);
        println!("snapshot: {}", source.describe());
    }

    // Dropping the pool on any early return joins every worker and frees
    // their allocations.
    let pool = WorkerPool::spawn(&config)?;

    // Ctrl+C at any point raises the shutdown token; the pool is joined on
    // every exit path below
    let shutdown = pool.shutdown_token();
    let interrupt = tokio::spawn(async move {
        let signal = tokio::signal::ctrl_c().await;
        if signal.is_ok() {
            info!("Ctrl+C received, shutting down workers");
            shutdown.trigger();
        }
        signal
    });

    let inspection = inspect(&pool, config.setup_timeout, source.as_ref(), &heuristics)?;
    if pool.shutdown_token().is_triggered() {
        return Err(HarnessError::Interrupted.into());
    }

    {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        if !quiet {
            write_worker_summary(&mut out, &inspection.setup.records, &inspection.setup.failures)?;
            writeln!(out)?;
        }
        write_regions(&mut out, &inspection.regions)?;
        out.flush()?;
    }

    if args.hold {
        println!("{SEPARATOR}");
        println!("Program PID: {}", Pid::current());
        println!("Program running. Press Ctrl+C to exit.");
        println!("{SEPARATOR}");

        interrupt
            .await
            .context("Ctrl+C listener stopped")?
            .context("Failed to listen for Ctrl+C")?;
    } else {
        interrupt.abort();
    }

    pool.shutdown()?;
    if !quiet {
        println!("All threads have exited. Program terminating.");
    }

    // Worker setup failures do not stop the report, but they fail the run
    match inspection.setup.first_failure() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
