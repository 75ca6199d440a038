//! Spawning, readiness and shutdown for the full set of workers

use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{info, warn};

use super::record::{WorkerFailure, WorkerRecord};
use super::shutdown::ShutdownToken;
use super::worker::{run_worker, WorkerEvent};
use crate::config::HarnessConfig;
use crate::domain::{HarnessError, WorkerId};

/// Result of waiting for every worker to finish setup
#[derive(Debug, Clone, Default)]
pub struct SetupOutcome {
    /// Published records, ordered by worker ID
    pub records: Vec<WorkerRecord>,
    /// Workers that exited during setup
    pub failures: Vec<WorkerFailure>,
}

impl SetupOutcome {
    /// The first setup failure as an error, if any worker failed
    #[must_use]
    pub fn first_failure(&self) -> Option<HarnessError> {
        self.failures.first().map(|failure| HarnessError::SetupFailure {
            worker: failure.worker,
            reason: failure.reason.clone(),
        })
    }
}

/// Events collected so far; `settled` once every worker has been accounted for
#[derive(Debug, Default)]
struct Readiness {
    outcome: SetupOutcome,
    settled: bool,
}

/// A running set of worker threads
///
/// Dropping the pool triggers shutdown and joins every thread.
#[derive(Debug)]
pub struct WorkerPool {
    handles: Vec<(WorkerId, JoinHandle<()>)>,
    events: Receiver<WorkerEvent>,
    shutdown: ShutdownToken,
    poll_interval: Duration,
    readiness: Mutex<Readiness>,
}

impl WorkerPool {
    /// Start `config.num_threads` workers
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or a thread cannot be
    /// spawned. Threads started before the failure are shut down.
    pub fn spawn(config: &HarnessConfig) -> Result<Self, HarnessError> {
        config.validate()?;

        let (tx, events) = crossbeam_channel::bounded(config.num_threads);
        let mut pool = Self::from_parts(
            Vec::with_capacity(config.num_threads),
            events,
            ShutdownToken::new(),
            config.poll_interval,
        );

        for index in 0..config.num_threads {
            let id = WorkerId(u32::try_from(index).map_err(|_| {
                HarnessError::InvalidConfig(format!("too many threads: {}", config.num_threads))
            })?);

            let mut builder = thread::Builder::new().name(format!("arena-worker-{id}"));
            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let worker_config = config.clone();
            let worker_shutdown = pool.shutdown.clone();
            let worker_tx = tx.clone();
            let handle = builder.spawn(move || {
                run_worker(id, &worker_config, &worker_shutdown, &worker_tx);
            })?;

            pool.handles.push((id, handle));
        }

        info!("Spawned {} worker threads", pool.handles.len());
        Ok(pool)
    }

    fn from_parts(
        handles: Vec<(WorkerId, JoinHandle<()>)>,
        events: Receiver<WorkerEvent>,
        shutdown: ShutdownToken,
        poll_interval: Duration,
    ) -> Self {
        Self { handles, events, shutdown, poll_interval, readiness: Mutex::default() }
    }

    /// Number of workers started
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Token that stops every worker in this pool when triggered
    #[must_use]
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    /// Block until every worker has either published its record or failed
    ///
    /// Once every worker has been accounted for, later calls return the same
    /// outcome without waiting. Events received before a timeout are kept, so
    /// a retry picks up where the last call stopped.
    ///
    /// # Errors
    /// Returns [`HarnessError::SetupTimeout`] if some worker has not reported
    /// within `timeout`, or [`HarnessError::Interrupted`] if the shutdown
    /// token is raised while waiting
    pub fn wait_ready(&self, timeout: Duration) -> Result<SetupOutcome, HarnessError> {
        let mut readiness = self.readiness.lock().unwrap_or_else(PoisonError::into_inner);
        if readiness.settled {
            return Ok(readiness.outcome.clone());
        }

        let deadline = Instant::now() + timeout;
        let expected = self.handles.len();
        let outcome = &mut readiness.outcome;

        while outcome.records.len() + outcome.failures.len() < expected {
            if self.shutdown.is_triggered() {
                return Err(HarnessError::Interrupted);
            }

            // Wake up at least every poll interval to notice shutdown
            let slice_end = deadline.min(Instant::now() + self.poll_interval);
            match self.events.recv_deadline(slice_end) {
                Ok(WorkerEvent::Ready(record)) => {
                    info!("Thread {} (TID: {}) ready", record.id, record.native_id);
                    outcome.records.push(record);
                }
                Ok(WorkerEvent::Failed(failure)) => {
                    warn!("Thread {} failed setup: {}", failure.worker, failure.reason);
                    outcome.failures.push(failure);
                }
                Err(RecvTimeoutError::Timeout) if Instant::now() < deadline => {}
                Err(RecvTimeoutError::Timeout) => {
                    return Err(HarnessError::SetupTimeout {
                        ready: outcome.records.len(),
                        expected,
                        timeout,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        // Workers that dropped their sender without reporting died mid-setup
        for (id, _) in &self.handles {
            let reported = outcome.records.iter().any(|r| r.id == *id)
                || outcome.failures.iter().any(|f| f.worker == *id);
            if !reported {
                outcome.failures.push(WorkerFailure {
                    worker: *id,
                    reason: "exited before publishing its record".to_string(),
                });
            }
        }

        outcome.records.sort_by_key(|r| r.id);
        outcome.failures.sort_by_key(|f| f.worker);
        readiness.settled = true;
        Ok(readiness.outcome.clone())
    }

    /// Raise the shutdown token and join every worker
    ///
    /// # Errors
    /// Returns [`HarnessError::WorkerPanicked`] for the first worker that panicked
    pub fn shutdown(mut self) -> Result<(), HarnessError> {
        self.join_all()
    }

    fn join_all(&mut self) -> Result<(), HarnessError> {
        self.shutdown.trigger();

        let mut first_panic = None;
        for (id, handle) in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("Thread {id} panicked");
                if first_panic.is_none() {
                    first_panic = Some(HarnessError::WorkerPanicked(id));
                }
            }
        }

        match first_panic {
            Some(err) => Err(err),
            None => {
                info!("All threads have exited");
                Ok(())
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            let _ = self.join_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AllocationMode;

    fn fast_config(num_threads: usize) -> HarnessConfig {
        HarnessConfig {
            num_threads,
            poll_interval: Duration::from_millis(5),
            ..HarnessConfig::default()
        }
    }

    #[test]
    fn test_spawn_rejects_invalid_config() {
        let result = WorkerPool::spawn(&fast_config(0));
        assert!(matches!(result, Err(HarnessError::InvalidConfig(_))));
    }

    #[test]
    fn test_all_workers_become_ready() {
        let pool = WorkerPool::spawn(&fast_config(4)).unwrap();
        let outcome = pool.wait_ready(Duration::from_secs(10)).unwrap();

        assert!(outcome.failures.is_empty());
        let ids: Vec<u32> = outcome.records.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert!(outcome.records.iter().all(|r| r.ready && r.allocations.is_empty()));

        pool.shutdown().unwrap();
    }

    #[test]
    fn test_worker_stacks_are_disjoint() {
        let pool = WorkerPool::spawn(&fast_config(3)).unwrap();
        let outcome = pool.wait_ready(Duration::from_secs(10)).unwrap();

        for (i, a) in outcome.records.iter().enumerate() {
            for b in &outcome.records[i + 1..] {
                assert!(!a.stack.overlaps(&b.stack), "{} overlaps {}", a.stack, b.stack);
            }
        }
    }

    #[test]
    fn test_requested_stack_size_is_honoured() {
        // Larger than the default, so a cached stack from an earlier thread
        // cannot satisfy the request
        let requested = 3 * 1024 * 1024;
        let config = HarnessConfig { stack_size: Some(requested), ..fast_config(1) };
        let pool = WorkerPool::spawn(&config).unwrap();
        let outcome = pool.wait_ready(Duration::from_secs(10)).unwrap();

        let len = outcome.records[0].stack.len();
        assert!(len >= requested as u64, "stack is {len} bytes");
    }

    #[test]
    fn test_allocations_are_recorded_per_worker() {
        let config = HarnessConfig {
            allocation: AllocationMode::Filled { size: 4096 },
            allocations_per_thread: 2,
            ..fast_config(2)
        };
        let pool = WorkerPool::spawn(&config).unwrap();
        let outcome = pool.wait_ready(Duration::from_secs(10)).unwrap();

        for record in &outcome.records {
            assert_eq!(record.allocations.len(), 2);
            assert!(record.allocations.iter().all(|a| a.succeeded && a.requested_size == 4096));
        }
        pool.shutdown().unwrap();
    }

    #[test]
    fn test_silent_worker_times_out() {
        let (tx, events) = crossbeam_channel::bounded::<WorkerEvent>(1);
        let shutdown = ShutdownToken::new();
        let silent = shutdown.clone();
        // Holds its sender but never reports, like a worker stuck in setup
        let handle = thread::spawn(move || {
            let _tx = tx;
            silent.wait(Duration::from_millis(5));
        });
        let pool =
            WorkerPool::from_parts(vec![(WorkerId(0), handle)], events, shutdown, Duration::from_millis(5));

        let err = pool.wait_ready(Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, HarnessError::SetupTimeout { ready: 0, expected: 1, .. }));

        pool.shutdown().unwrap();
    }

    #[test]
    fn test_shutdown_interrupts_readiness_wait() {
        let (tx, events) = crossbeam_channel::bounded::<WorkerEvent>(1);
        let shutdown = ShutdownToken::new();
        let silent = shutdown.clone();
        let handle = thread::spawn(move || {
            let _tx = tx;
            silent.wait(Duration::from_millis(5));
        });
        let pool =
            WorkerPool::from_parts(vec![(WorkerId(0), handle)], events, shutdown, Duration::from_millis(5));

        let trigger = pool.shutdown_token();
        let signaller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            trigger.trigger();
        });

        let started = Instant::now();
        let err = pool.wait_ready(Duration::from_secs(30)).unwrap_err();
        assert!(matches!(err, HarnessError::Interrupted));
        assert!(started.elapsed() < Duration::from_secs(10));

        signaller.join().unwrap();
        pool.shutdown().unwrap();
    }

    #[test]
    fn test_readiness_is_remembered_across_calls() {
        let pool = WorkerPool::spawn(&fast_config(2)).unwrap();
        let first = pool.wait_ready(Duration::from_secs(10)).unwrap();

        let started = Instant::now();
        let second = pool.wait_ready(Duration::from_millis(50)).unwrap();
        assert!(started.elapsed() < Duration::from_millis(50));
        assert_eq!(first.records, second.records);
        assert!(second.failures.is_empty());

        pool.shutdown().unwrap();
    }

    #[test]
    fn test_worker_exiting_without_report_is_a_failure() {
        let (tx, events) = crossbeam_channel::bounded::<WorkerEvent>(1);
        let handle = thread::spawn(move || drop(tx));
        let pool = WorkerPool::from_parts(
            vec![(WorkerId(5), handle)],
            events,
            ShutdownToken::new(),
            Duration::from_millis(5),
        );

        let outcome = pool.wait_ready(Duration::from_secs(5)).unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].worker, WorkerId(5));
    }

    #[test]
    fn test_first_failure_maps_to_setup_failure() {
        let outcome = SetupOutcome {
            records: Vec::new(),
            failures: vec![WorkerFailure { worker: WorkerId(2), reason: "boom".to_string() }],
        };
        assert!(matches!(
            outcome.first_failure(),
            Some(HarnessError::SetupFailure { worker: WorkerId(2), .. })
        ));
        assert!(SetupOutcome::default().first_failure().is_none());
    }
}
