//! Cooperative shutdown token shared by the orchestrator and all workers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// One-way flag: once triggered it stays triggered
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    triggered: Arc<AtomicBool>,
}

impl ShutdownToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this token to stop
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Sleep in `poll_interval` steps until the token is triggered
    pub fn wait(&self, poll_interval: Duration) {
        while !self.is_triggered() {
            thread::sleep(poll_interval);
        }
    }
}
