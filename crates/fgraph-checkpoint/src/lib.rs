//! Checkpoint coordination for the FerroGraph storage engine.
//!
//! A checkpoint is a durable log position such that every mutation with a
//! commit id at or below it has been flushed to the page store; recovery
//! replays the transaction log from the last checkpoint only. This crate
//! owns the coordination: when to checkpoint, the single-writer discipline,
//! the flush-then-record ordering, log pruning and the published
//! latest-checkpoint snapshot.
//!
//! The page cache, transaction log and commit clock are collaborators
//! behind the traits in [`traits`]; this crate never touches their files.

pub mod context;
pub mod coordinator;
pub mod metrics;
pub mod mutex;
pub mod panic;
pub mod threshold;
pub mod tracing_events;
pub mod traits;
pub mod trigger;

pub use context::{CursorContext, CursorContextFactory, VersionContext};
pub use coordinator::{CheckPointer, CheckPointerInit, NO_TRANSACTION_ID};
pub use metrics::{CHECKPOINT_METRICS, CheckpointMetrics, CheckpointMetricsSnapshot};
pub use mutex::{CheckpointGuard, CheckpointMutex};
pub use panic::{PanicLatch, PanicSignal};
pub use threshold::{
    CheckPointThreshold, CompositeThreshold, TxCountThreshold, VolumeThreshold, default_threshold,
};
pub use tracing_events::{CheckpointEvent, CheckpointTracer, DatabaseFlushEvent};
pub use traits::{
    CheckpointAppender, Clock, FlushOperation, IoController, KernelVersionProvider, LogPruner,
    SystemClock, TransactionIdStore,
};
pub use trigger::TriggerInfo;
