//! Checkpoint tracing scopes.
//!
//! A [`CheckpointTracer`] hands out one [`CheckpointEvent`] per checkpoint
//! attempt and accumulates lifetime totals. The flush primitive fills in the
//! nested [`DatabaseFlushEvent`]; the coordinator reads the counters back
//! when it formats the completion line.
//!
//! An event that is dropped without `checkpoint_completed` counts as a
//! failed attempt, so failure accounting holds on every exit path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Per-database tracer accumulating checkpoint activity totals.
#[derive(Debug, Default)]
pub struct CheckpointTracer {
    checkpoints_completed: AtomicU64,
    checkpoint_millis_total: AtomicU64,
    pages_flushed_total: AtomicU64,
    failures_total: AtomicU64,
}

impl CheckpointTracer {
    /// Create a zeroed tracer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            checkpoints_completed: AtomicU64::new(0),
            checkpoint_millis_total: AtomicU64::new(0),
            pages_flushed_total: AtomicU64::new(0),
            failures_total: AtomicU64::new(0),
        }
    }

    /// Open the tracing scope for one checkpoint attempt.
    pub fn begin_checkpoint(&self) -> CheckpointEvent<'_> {
        CheckpointEvent {
            tracer: self,
            flush: DatabaseFlushEvent::new(),
            completed: false,
        }
    }

    /// Completed checkpoints so far.
    pub fn checkpoints_completed(&self) -> u64 {
        self.checkpoints_completed.load(Ordering::Relaxed)
    }

    /// Cumulative wall-clock of completed checkpoints, in milliseconds.
    pub fn checkpoint_millis_total(&self) -> u64 {
        self.checkpoint_millis_total.load(Ordering::Relaxed)
    }

    /// Pages flushed across all completed checkpoints.
    pub fn pages_flushed_total(&self) -> u64 {
        self.pages_flushed_total.load(Ordering::Relaxed)
    }

    /// Checkpoint attempts that ended without completing.
    pub fn failures_total(&self) -> u64 {
        self.failures_total.load(Ordering::Relaxed)
    }
}

/// Tracing scope of a single checkpoint attempt.
#[derive(Debug)]
pub struct CheckpointEvent<'a> {
    tracer: &'a CheckpointTracer,
    flush: DatabaseFlushEvent,
    completed: bool,
}

impl CheckpointEvent<'_> {
    /// Open the nested flush scope, handed to the flush primitive.
    pub fn begin_database_flush(&mut self) -> &mut DatabaseFlushEvent {
        &mut self.flush
    }

    /// Mark the checkpoint complete and fold its counters into the tracer.
    pub fn checkpoint_completed(&mut self, duration: Duration) {
        self.completed = true;
        self.tracer
            .checkpoints_completed
            .fetch_add(1, Ordering::Relaxed);
        self.tracer
            .checkpoint_millis_total
            .fetch_add(duration_millis_saturating(duration), Ordering::Relaxed);
        self.tracer
            .pages_flushed_total
            .fetch_add(self.flush.pages_flushed, Ordering::Relaxed);
    }

    /// Pages written out by the flush.
    #[must_use]
    pub fn pages_flushed(&self) -> u64 {
        self.flush.pages_flushed
    }

    /// I/O operations the flush performed.
    #[must_use]
    pub fn ios_performed(&self) -> u64 {
        self.flush.ios_performed
    }

    /// Fraction of the page cache the flush had to write, in `[0, 1]`.
    #[must_use]
    pub fn flush_ratio(&self) -> f64 {
        self.flush.flush_ratio
    }

    /// How many times the I/O controller paused the flush.
    #[must_use]
    pub fn times_paused(&self) -> u64 {
        self.flush.times_paused
    }

    /// Total milliseconds the flush spent paused.
    #[must_use]
    pub fn millis_paused(&self) -> u64 {
        self.flush.millis_paused
    }

    /// I/O limit the controller was configured with, negative if none.
    #[must_use]
    pub fn configured_io_limit(&self) -> i64 {
        self.flush.io_limit
    }
}

impl Drop for CheckpointEvent<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.tracer.failures_total.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Flush counters recorded by the flush-and-force primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseFlushEvent {
    pages_flushed: u64,
    ios_performed: u64,
    flush_ratio: f64,
    times_paused: u64,
    millis_paused: u64,
    io_limit: i64,
}

impl DatabaseFlushEvent {
    /// Fresh counters; the I/O limit starts unset (negative).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pages_flushed: 0,
            ios_performed: 0,
            flush_ratio: 0.0,
            times_paused: 0,
            millis_paused: 0,
            io_limit: -1,
        }
    }

    /// Count pages written out.
    pub fn record_pages_flushed(&mut self, pages: u64) {
        self.pages_flushed += pages;
    }

    /// Count I/O operations performed.
    pub fn record_io(&mut self, ios: u64) {
        self.ios_performed += ios;
    }

    /// Record the fraction of the page cache that was dirty, in `[0, 1]`.
    pub fn record_flush_ratio(&mut self, ratio: f64) {
        self.flush_ratio = ratio;
    }

    /// Count one I/O-controller pause of `millis` milliseconds.
    pub fn record_pause(&mut self, millis: u64) {
        self.times_paused += 1;
        self.millis_paused += millis;
    }

    /// Record the I/O controller's configured limit for the trace.
    pub fn io_controller_limit(&mut self, limit: i64) {
        self.io_limit = limit;
    }
}

impl Default for DatabaseFlushEvent {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a `Duration` to milliseconds, saturating at `u64::MAX`.
pub(crate) fn duration_millis_saturating(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ===========================================================================
// Tests
// ===========================================================================
