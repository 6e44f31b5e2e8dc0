use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-stage counters, shared between a stage worker and the running pipeline
#[derive(Debug, Clone)]
pub struct StageMetrics {
    /// Values read from the input stream
    received: Arc<AtomicU64>,
    /// Values handed to the output stream
    passed: Arc<AtomicU64>,
    /// Values rejected by the stage's predicate
    discarded: Arc<AtomicU64>,
    /// Values lost to ring store overflow
    overflowed: Arc<AtomicU64>,
    /// Completed flush cycles
    flushes: Arc<AtomicU64>,
    start_time: Instant,
}

impl StageMetrics {
    pub fn new() -> Self {
        Self {
            received: Arc::new(AtomicU64::new(0)),
            passed: Arc::new(AtomicU64::new(0)),
            discarded: Arc::new(AtomicU64::new(0)),
            overflowed: Arc::new(AtomicU64::new(0)),
            flushes: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_passed(&self) {
        self.passed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overflowed(&self) {
        self.overflowed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn total_passed(&self) -> u64 {
        self.passed.load(Ordering::Relaxed)
    }

    pub fn total_discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    pub fn total_overflowed(&self) -> u64 {
        self.overflowed.load(Ordering::Relaxed)
    }

    pub fn total_flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.total_received(),
            passed: self.total_passed(),
            discarded: self.total_discarded(),
            overflowed: self.total_overflowed(),
            flushes: self.total_flushes(),
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for StageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub passed: u64,
    pub discarded: u64,
    pub overflowed: u64,
    pub flushes: u64,
    pub elapsed: Duration,
}

impl MetricsSnapshot {
    /// Format metrics as a human-readable string
    pub fn format(&self) -> String {
        format!(
            "Received: {}, Passed: {}, Discarded: {}, Overflowed: {}, Flushes: {}, Elapsed: {:.2}s",
            self.received,
            self.passed,
            self.discarded,
            self.overflowed,
            self.flushes,
            self.elapsed.as_secs_f64()
        )
    }
}
