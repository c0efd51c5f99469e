//! Storage-engine collaborator contracts.
//!
//! The coordinator composes these; it never implements them. The concrete
//! page cache, transaction log and id store live elsewhere in the engine and
//! bring their own thread-safety guarantees.

use std::time::SystemTime;

use fgraph_error::Result;
use fgraph_types::{ClosedTransactionSnapshot, KernelVersion, LogPosition, TransactionId};

use crate::context::CursorContext;
use crate::tracing_events::DatabaseFlushEvent;

/// Monotonic commit clock of the database.
pub trait TransactionIdStore: Send + Sync {
    /// Lock-free snapshot of the last closed transaction and the log
    /// position its commit entry ends at.
    fn last_closed_transaction(&self) -> ClosedTransactionSnapshot;
}

/// The page-cache flush primitive.
pub trait FlushOperation: Send + Sync {
    /// Write all dirty pages to their backing files and fsync them, pacing
    /// writes through the I/O controller. Fills `flush` with page/IO/pause
    /// counters as it goes.
    fn flush_and_force(&self, flush: &mut DatabaseFlushEvent, context: &CursorContext)
    -> Result<()>;
}

/// Append side of the transaction log, for checkpoint records.
pub trait CheckpointAppender: Send + Sync {
    /// Append one checkpoint record and fsync the log tail. This is the
    /// commit point of a checkpoint.
    fn checkpoint(
        &self,
        transaction: TransactionId,
        kernel_version: KernelVersion,
        position: LogPosition,
        checkpoint_time: SystemTime,
        reason: &str,
    ) -> Result<()>;
}

/// Drops old transaction log segments.
pub trait LogPruner: Send + Sync {
    /// Drop segments strictly earlier than `up_to_log_version`, retaining
    /// the segment containing it. Idempotent.
    fn prune_logs(&self, up_to_log_version: u64) -> Result<()>;
}

/// Read-only view of the I/O rate limiter pacing the flush.
pub trait IoController: Send + Sync {
    /// Whether rate limiting is active at all.
    fn is_enabled(&self) -> bool;

    /// Configured IOPS limit; negative means no limit is set.
    fn configured_limit(&self) -> i64;
}

/// Supplies the engine format tag recorded in checkpoint entries.
pub trait KernelVersionProvider: Send + Sync {
    fn kernel_version(&self) -> KernelVersion;
}

/// Wall clock, injected so tests can pin checkpoint timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// The process wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}
