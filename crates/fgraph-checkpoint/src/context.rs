//! Tagged cursor contexts for page-cache operations.
//!
//! Every long-running page-cache operation carries a context naming who it
//! is ("checkpoint", "backup", ...) and, for writers, the transaction id the
//! operation is flushing up to. The page cache reads that barrier to keep
//! read consistency during the flush; the coordinator only establishes it.

use std::sync::atomic::{AtomicU64, Ordering};

/// Barrier value meaning "no write in progress".
const NO_WRITE: u64 = 0;

/// Hands out tagged contexts for a single database.
#[derive(Debug, Default)]
pub struct CursorContextFactory;

impl CursorContextFactory {
    /// Create a factory for this database.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Create a context tagged with the operation name.
    #[must_use]
    pub fn create(&self, tag: &'static str) -> CursorContext {
        CursorContext {
            tag,
            version_context: VersionContext::new(),
        }
    }
}

/// One operation's page-cache context.
#[derive(Debug)]
pub struct CursorContext {
    tag: &'static str,
    version_context: VersionContext,
}

impl CursorContext {
    /// Operation name this context was created for.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        self.tag
    }

    /// The read-consistency barrier of this operation.
    #[must_use]
    pub const fn version_context(&self) -> &VersionContext {
        &self.version_context
    }
}

/// Read-consistency barrier between a flushing writer and page readers.
#[derive(Debug, Default)]
pub struct VersionContext {
    committing_tx_id: AtomicU64,
}

impl VersionContext {
    #[must_use]
    const fn new() -> Self {
        Self {
            committing_tx_id: AtomicU64::new(NO_WRITE),
        }
    }

    /// Establish the write barrier: everything up to `tx_id` is being made
    /// durable by the operation holding this context.
    pub fn init_write(&self, tx_id: u64) {
        self.committing_tx_id.store(tx_id, Ordering::Release);
    }

    /// Transaction id the current write barrier covers, 0 if none.
    pub fn committing_transaction_id(&self) -> u64 {
        self.committing_tx_id.load(Ordering::Acquire)
    }
}
