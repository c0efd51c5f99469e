//! Error type for FerroGraph storage engine operations.
//!
//! Structured variants for the failure modes the engine distinguishes, with
//! convenience constructors for the common ones. Callers propagate with `?`;
//! nothing in the engine retries internally.

use thiserror::Error;

/// Primary error type for FerroGraph storage operations.
#[derive(Error, Debug)]
pub enum FerroError {
    // === I/O ===
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Short read (fewer bytes than expected).
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    // === Durability ===
    /// The database panic latch is set; no further work may touch the store.
    #[error("database has panicked: {cause}")]
    DatabasePanicked { cause: String },

    /// A checkpoint attempt failed.
    #[error("checkpoint failed: {detail}")]
    CheckpointFailed { detail: String },

    /// Appending a record to the transaction log failed.
    #[error("transaction log append failed: {detail}")]
    LogAppendFailed { detail: String },

    /// Dropping old transaction log segments failed.
    #[error("log pruning failed up to version {up_to_version}: {detail}")]
    LogPruneFailed { up_to_version: u64, detail: String },

    // === Internal ===
    /// Internal logic error (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl FerroError {
    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a panic-latch error.
    pub fn panicked(cause: impl Into<String>) -> Self {
        Self::DatabasePanicked {
            cause: cause.into(),
        }
    }

    /// Create a checkpoint failure.
    pub fn checkpoint_failed(detail: impl Into<String>) -> Self {
        Self::CheckpointFailed {
            detail: detail.into(),
        }
    }

    /// Whether this error belongs to the I/O class: the store may be in an
    /// inconsistent on-disk state and recovery is the way out.
    #[must_use]
    pub const fn is_io_class(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::ShortRead { .. }
                | Self::DatabasePanicked { .. }
                | Self::CheckpointFailed { .. }
                | Self::LogAppendFailed { .. }
                | Self::LogPruneFailed { .. }
        )
    }

    /// Whether this error was raised because the panic latch is set.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::DatabasePanicked { .. })
    }

    /// Whether a later attempt of the same operation may succeed.
    ///
    /// A failed checkpoint stage leaves the store replayable and the next
    /// trigger simply tries again; a latched panic or a short read does not
    /// heal on retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::CheckpointFailed { .. }
                | Self::LogAppendFailed { .. }
                | Self::LogPruneFailed { .. }
        )
    }
}

/// Result type alias using `FerroError`.
pub type Result<T> = std::result::Result<T, FerroError>;
