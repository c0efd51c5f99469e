//! The checkpoint coordinator.
//!
//! Composes the serialization mutex, the threshold policy and the storage
//! engine collaborators into the flush-then-record protocol:
//!
//! 1. snapshot the last closed transaction
//! 2. flush-and-force all dirty pages
//! 3. append the checkpoint record (the commit point)
//! 4. move the threshold baseline forward
//! 5. prune log segments older than the checkpointed position
//! 6. publish the new latest-checkpoint snapshot
//!
//! Flush strictly precedes append, append strictly precedes prune, and
//! publication happens last. A crash or failure anywhere in between leaves
//! recovery with either the previous checkpoint (nothing new recorded) or
//! the new record and a longer-than-needed log — both replayable.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use fgraph_error::Result;
use fgraph_types::{LatestCheckpointInfo, LogPosition, TransactionId};
use tracing::{error, info, warn};

use crate::context::{CursorContext, CursorContextFactory};
use crate::metrics::CHECKPOINT_METRICS;
use crate::mutex::CheckpointMutex;
use crate::panic::PanicSignal;
use crate::threshold::CheckPointThreshold;
use crate::tracing_events::{CheckpointEvent, CheckpointTracer};
use crate::traits::{
    CheckpointAppender, Clock, FlushOperation, IoController, KernelVersionProvider, LogPruner,
    TransactionIdStore,
};
use crate::trigger::TriggerInfo;

/// Returned by trigger operations when no checkpoint was performed.
pub const NO_TRANSACTION_ID: i64 = -1;

/// Cursor context tag for checkpoint page traffic.
const CHECKPOINT_TAG: &str = "checkpoint";

/// Rendering of "no I/O limit" in the completion line.
const UNLIMITED_IO_LIMIT: &str = "unlimited";

/// Collaborators handed to [`CheckPointer::new`]. All of them are
/// constructed by the surrounding engine before the coordinator exists.
pub struct CheckPointerInit {
    pub transaction_id_store: Arc<dyn TransactionIdStore>,
    pub threshold: Arc<dyn CheckPointThreshold>,
    pub flush_operation: Arc<dyn FlushOperation>,
    pub checkpoint_appender: Arc<dyn CheckpointAppender>,
    pub log_pruner: Arc<dyn LogPruner>,
    pub database_panic: Arc<dyn PanicSignal>,
    pub tracer: Arc<CheckpointTracer>,
    pub context_factory: CursorContextFactory,
    pub clock: Arc<dyn Clock>,
    pub io_controller: Arc<dyn IoController>,
    pub kernel_version_provider: Arc<dyn KernelVersionProvider>,
}

/// Per-database checkpoint coordinator.
pub struct CheckPointer {
    transaction_id_store: Arc<dyn TransactionIdStore>,
    threshold: Arc<dyn CheckPointThreshold>,
    flush_operation: Arc<dyn FlushOperation>,
    checkpoint_appender: Arc<dyn CheckpointAppender>,
    log_pruner: Arc<dyn LogPruner>,
    database_panic: Arc<dyn PanicSignal>,
    tracer: Arc<CheckpointTracer>,
    context_factory: CursorContextFactory,
    clock: Arc<dyn Clock>,
    io_controller: Arc<dyn IoController>,
    kernel_version_provider: Arc<dyn KernelVersionProvider>,
    mutex: CheckpointMutex,
    shutdown: AtomicBool,
    latest_info: ArcSwap<LatestCheckpointInfo>,
}

impl CheckPointer {
    /// Build a coordinator over already-constructed collaborators.
    #[must_use]
    pub fn new(init: CheckPointerInit) -> Self {
        Self {
            transaction_id_store: init.transaction_id_store,
            threshold: init.threshold,
            flush_operation: init.flush_operation,
            checkpoint_appender: init.checkpoint_appender,
            log_pruner: init.log_pruner,
            database_panic: init.database_panic,
            tracer: init.tracer,
            context_factory: init.context_factory,
            clock: init.clock,
            io_controller: init.io_controller,
            kernel_version_provider: init.kernel_version_provider,
            mutex: CheckpointMutex::new(),
            shutdown: AtomicBool::new(false),
            latest_info: ArcSwap::from_pointee(LatestCheckpointInfo::UNKNOWN),
        }
    }

    /// Initialize the threshold baseline from the commit clock. Call once
    /// before the first trigger.
    pub fn start(&self) {
        let last_closed = self.transaction_id_store.last_closed_transaction();
        self.threshold
            .initialize(last_closed.transaction.id, last_closed.log_position);
    }

    /// Latch shutdown. Waits for an inflight checkpoint to finish; every
    /// trigger arriving afterwards is a warned no-op.
    pub fn shutdown(&self) {
        let _guard = self.mutex.lock();
        self.shutdown.store(true, Ordering::Release);
    }

    /// Run a checkpoint now, waiting for a concurrent one to finish first.
    pub fn force_check_point(&self, trigger: TriggerInfo) -> Result<i64> {
        let _guard = self.mutex.lock();
        self.checkpoint_by_trigger(trigger)
    }

    /// Run a checkpoint for an externally chosen transaction and position
    /// (backup and replication callers), waiting like `force_check_point`.
    pub fn force_check_point_with(
        &self,
        transaction: TransactionId,
        position: LogPosition,
        trigger: TriggerInfo,
    ) -> Result<i64> {
        let _guard = self.mutex.lock();
        self.checkpoint_by_external_params(transaction, position, trigger)
    }

    /// Run a checkpoint unless one is already running; in that case wait
    /// for it and return its transaction id instead.
    pub fn try_check_point(&self, trigger: TriggerInfo) -> Result<i64> {
        self.try_check_point_until(trigger, || false)
    }

    /// Run a checkpoint only if nothing else is; return
    /// [`NO_TRANSACTION_ID`] immediately when contended.
    pub fn try_check_point_no_wait(&self, trigger: TriggerInfo) -> Result<i64> {
        self.try_check_point_until(trigger, || true)
    }

    /// Like [`try_check_point`](Self::try_check_point), but the wait for a
    /// concurrent checkpoint is bounded by `timed_out`.
    ///
    /// When the lock is contended this is a barrier, not a queue: once the
    /// running checkpoint finishes, its freshly published transaction id is
    /// returned and no second checkpoint is started.
    pub fn try_check_point_until(
        &self,
        trigger: TriggerInfo,
        timed_out: impl Fn() -> bool,
    ) -> Result<i64> {
        if let Some(_guard) = self.mutex.try_lock() {
            return self.checkpoint_by_trigger(trigger);
        }
        match self.mutex.try_lock_until(timed_out) {
            Some(_guard) => {
                let last_info = self.latest_checkpoint_info();
                info!(
                    "{} Checkpoint was already running, completed now",
                    trigger.describe(last_info)
                );
                Ok(signed_tx_id(last_info.committed_tx.id))
            }
            None => Ok(NO_TRANSACTION_ID),
        }
    }

    /// Consult the threshold and checkpoint only when it says so. The mutex
    /// is not touched when no checkpoint is needed.
    pub fn check_point_if_needed(&self, trigger: TriggerInfo) -> Result<i64> {
        let last_closed = self.transaction_id_store.last_closed_transaction();
        if self.threshold.is_needed(
            last_closed.transaction.id,
            last_closed.log_position,
            &trigger,
        ) {
            let _guard = self.mutex.lock();
            return self.checkpoint_by_trigger(trigger);
        }
        Ok(NO_TRANSACTION_ID)
    }

    /// Snapshot of the most recent successful checkpoint. Lock-free.
    pub fn latest_checkpoint_info(&self) -> LatestCheckpointInfo {
        **self.latest_info.load()
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn checkpoint_by_trigger(&self, trigger: TriggerInfo) -> Result<i64> {
        if self.is_shutdown() {
            self.log_shutdown_message(trigger);
            return Ok(NO_TRANSACTION_ID);
        }
        let last_closed = self.transaction_id_store.last_closed_transaction();
        self.do_checkpoint(last_closed.transaction, last_closed.log_position, trigger)
    }

    fn checkpoint_by_external_params(
        &self,
        transaction: TransactionId,
        position: LogPosition,
        trigger: TriggerInfo,
    ) -> Result<i64> {
        if self.is_shutdown() {
            self.log_shutdown_message(trigger);
            return Ok(NO_TRANSACTION_ID);
        }
        self.do_checkpoint(transaction, position, trigger)
    }

    fn do_checkpoint(
        &self,
        transaction: TransactionId,
        position: LogPosition,
        trigger: TriggerInfo,
    ) -> Result<i64> {
        let context = self.context_factory.create(CHECKPOINT_TAG);
        let mut event = self.tracer.begin_checkpoint();
        match self.run_checkpoint(&mut event, &context, transaction, position, trigger) {
            Ok(tx_id) => Ok(tx_id),
            Err(cause) => {
                // Checkpoints run from several callers (background scheduler,
                // shutdown, operators); each decides for itself whether to
                // retry, so the coordinator only reports.
                error!(cause = %cause, "Checkpoint failed");
                CHECKPOINT_METRICS.record_failure();
                Err(cause)
            }
        }
    }

    fn run_checkpoint(
        &self,
        event: &mut CheckpointEvent<'_>,
        context: &CursorContext,
        transaction: TransactionId,
        position: LogPosition,
        trigger: TriggerInfo,
    ) -> Result<i64> {
        let tx_id = transaction.id;
        context.version_context().init_write(tx_id);
        let kernel_version = self.kernel_version_provider.kernel_version();
        let ongoing = LatestCheckpointInfo::new(transaction, kernel_version);
        let reason = trigger.describe(ongoing);

        // Check the panic latch before waiting on subsystems that may never
        // answer once the database has panicked.
        self.database_panic.assert_no_panic()?;

        info!("{reason} checkpoint started...");
        let started = Instant::now();

        {
            let flush = event.begin_database_flush();
            self.flush_operation.flush_and_force(flush, context)?;
            flush.io_controller_limit(self.io_controller.configured_limit());
        }

        // A panic between flush and append aborts the checkpoint. The flush
        // is harmless without a checkpoint record: the next recovery replays
        // from the previous checkpoint.
        self.database_panic.assert_no_panic()?;

        self.checkpoint_appender.checkpoint(
            transaction,
            kernel_version,
            position,
            self.clock.now(),
            &reason,
        )?;
        self.threshold.checkpoint_happened(tx_id, position);

        let duration = started.elapsed();
        event.checkpoint_completed(duration);
        info!("{}", checkpoint_message(event, self.io_controller.is_enabled(), &reason, duration));

        // The checkpointed position may sit in an older segment than the
        // current log head; prune up to its version only.
        self.log_pruner.prune_logs(position.log_version)?;
        CHECKPOINT_METRICS.record_log_prune();

        self.latest_info.store(Arc::new(ongoing));
        CHECKPOINT_METRICS.record_checkpoint(duration, event.pages_flushed());
        Ok(signed_tx_id(tx_id))
    }

    fn log_shutdown_message(&self, trigger: TriggerInfo) {
        warn!(
            requester = %trigger.describe(LatestCheckpointInfo::UNKNOWN),
            "Checkpoint was requested on an already shut down check pointer"
        );
    }
}

/// The completion line, the sole user-visible telemetry format.
fn checkpoint_message(
    event: &CheckpointEvent<'_>,
    io_controller_enabled: bool,
    reason: &str,
    duration: Duration,
) -> String {
    let flush_ratio_percent = (event.flush_ratio() * 100.0) as u64;
    format!(
        "{reason} checkpoint completed in {}. Checkpoint flushed {} pages ({}% of total available \
         pages), in {} IOs. Checkpoint performed with IO limit: {}, paused in total {} times( {} \
         millis).",
        format_duration(duration),
        event.pages_flushed(),
        flush_ratio_percent,
        event.ios_performed(),
        io_limit_description(io_controller_enabled, event.configured_io_limit()),
        event.times_paused(),
        event.millis_paused(),
    )
}

fn io_limit_description(io_controller_enabled: bool, limit: i64) -> String {
    if io_controller_enabled && limit >= 0 {
        limit.to_string()
    } else {
        UNLIMITED_IO_LIMIT.to_owned()
    }
}

/// Render a wall-clock duration as its nonzero units, largest first.
fn format_duration(duration: Duration) -> String {
    let total_millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    if total_millis == 0 {
        return "0ms".to_owned();
    }

    let mut rest = total_millis;
    let mut parts = Vec::new();
    for (unit_millis, suffix) in [
        (86_400_000, "d"),
        (3_600_000, "h"),
        (60_000, "m"),
        (1_000, "s"),
        (1, "ms"),
    ] {
        let value = rest / unit_millis;
        rest %= unit_millis;
        if value > 0 {
            parts.push(format!("{value}{suffix}"));
        }
    }
    parts.join(" ")
}

fn signed_tx_id(id: u64) -> i64 {
    i64::try_from(id).unwrap_or(i64::MAX)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(Duration::ZERO), "0ms");
        assert_eq!(format_duration(Duration::from_millis(45)), "45ms");
        assert_eq!(format_duration(Duration::from_millis(1_000)), "1s");
        assert_eq!(format_duration(Duration::from_millis(1_234)), "1s 234ms");
        assert_eq!(format_duration(Duration::from_millis(61_000)), "1m 1s");
        assert_eq!(
            format_duration(Duration::from_millis(90_061_001)),
            "1d 1h 1m 1s 1ms"
        );
    }

    #[test]
    fn io_limit_rendering() {
        assert_eq!(io_limit_description(true, 600), "600");
        assert_eq!(io_limit_description(true, 0), "0");
        assert_eq!(io_limit_description(true, -1), "unlimited");
        assert_eq!(io_limit_description(false, 600), "unlimited");
    }

    #[test]
    fn completion_message_template() {
        let tracer = CheckpointTracer::new();
        let mut event = tracer.begin_checkpoint();
        {
            let flush = event.begin_database_flush();
            flush.record_pages_flushed(340);
            flush.record_io(42);
            flush.record_flush_ratio(0.279);
            flush.record_pause(15);
            flush.record_pause(25);
            flush.io_controller_limit(600);
        }
        let message = checkpoint_message(
            &event,
            true,
            "Checkpoint triggered by \"scheduler\" @ txId: 42",
            Duration::from_millis(1_234),
        );
        assert_eq!(
            message,
            "Checkpoint triggered by \"scheduler\" @ txId: 42 checkpoint completed in 1s 234ms. \
             Checkpoint flushed 340 pages (27% of total available pages), in 42 IOs. Checkpoint \
             performed with IO limit: 600, paused in total 2 times( 40 millis)."
        );
        event.checkpoint_completed(Duration::from_millis(1_234));
    }

    #[test]
    fn signed_tx_id_saturation() {
        assert_eq!(signed_tx_id(42), 42);
        assert_eq!(signed_tx_id(u64::MAX), i64::MAX);
    }
}
