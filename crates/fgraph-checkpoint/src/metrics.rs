//! Process-wide checkpoint metrics.
//!
//! Global `AtomicU64` counters recorded by the coordinator on every
//! completed or failed checkpoint. Thread-safe, lock-free, suitable for
//! scraping from any thread.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::tracing_events::duration_millis_saturating;

/// Global checkpoint metrics singleton.
pub static CHECKPOINT_METRICS: CheckpointMetrics = CheckpointMetrics::new();

/// Atomic counters tracking checkpoint activity.
pub struct CheckpointMetrics {
    /// Total checkpoints completed (monotonic counter).
    pub checkpoints_total: AtomicU64,
    /// Cumulative checkpoint wall-clock time in milliseconds.
    pub checkpoint_millis_total: AtomicU64,
    /// Total pages flushed by checkpoints.
    pub pages_flushed_total: AtomicU64,
    /// Total log pruning passes run after checkpoints.
    pub log_prunes_total: AtomicU64,
    /// Checkpoint attempts that failed.
    pub failures_total: AtomicU64,
}

impl CheckpointMetrics {
    /// Create a zeroed metrics instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            checkpoints_total: AtomicU64::new(0),
            checkpoint_millis_total: AtomicU64::new(0),
            pages_flushed_total: AtomicU64::new(0),
            log_prunes_total: AtomicU64::new(0),
            failures_total: AtomicU64::new(0),
        }
    }

    /// Record a completed checkpoint.
    pub fn record_checkpoint(&self, duration: Duration, pages_flushed: u64) {
        self.checkpoints_total.fetch_add(1, Ordering::Relaxed);
        self.checkpoint_millis_total
            .fetch_add(duration_millis_saturating(duration), Ordering::Relaxed);
        self.pages_flushed_total
            .fetch_add(pages_flushed, Ordering::Relaxed);
    }

    /// Record a log pruning pass.
    pub fn record_log_prune(&self) {
        self.log_prunes_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed checkpoint attempt.
    pub fn record_failure(&self) {
        self.failures_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> CheckpointMetricsSnapshot {
        CheckpointMetricsSnapshot {
            checkpoints_total: self.checkpoints_total.load(Ordering::Relaxed),
            checkpoint_millis_total: self.checkpoint_millis_total.load(Ordering::Relaxed),
            pages_flushed_total: self.pages_flushed_total.load(Ordering::Relaxed),
            log_prunes_total: self.log_prunes_total.load(Ordering::Relaxed),
            failures_total: self.failures_total.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.checkpoints_total.store(0, Ordering::Relaxed);
        self.checkpoint_millis_total.store(0, Ordering::Relaxed);
        self.pages_flushed_total.store(0, Ordering::Relaxed);
        self.log_prunes_total.store(0, Ordering::Relaxed);
        self.failures_total.store(0, Ordering::Relaxed);
    }
}

impl Default for CheckpointMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of checkpoint metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointMetricsSnapshot {
    pub checkpoints_total: u64,
    pub checkpoint_millis_total: u64,
    pub pages_flushed_total: u64,
    pub log_prunes_total: u64,
    pub failures_total: u64,
}

impl CheckpointMetricsSnapshot {
    /// Average checkpoint duration in milliseconds, or 0 if none completed.
    #[must_use]
    pub fn avg_checkpoint_millis(&self) -> u64 {
        self.checkpoint_millis_total
            .checked_div(self.checkpoints_total)
            .unwrap_or(0)
    }
}

impl fmt::Display for CheckpointMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checkpoints={} checkpoint_millis={} pages_flushed={} log_prunes={} failures={}",
            self.checkpoints_total,
            self.checkpoint_millis_total,
            self.pages_flushed_total,
            self.log_prunes_total,
            self.failures_total,
        )
    }
}

// ===========================================================================
// Tests
// ===========================================================================
