//! Database panic latch.
//!
//! Any subsystem that detects fatal corruption or I/O loss sets the latch;
//! from then on, work that would touch the store aborts instead of risking
//! further damage. The latch is one-way for the life of the process.

use std::sync::atomic::{AtomicBool, Ordering};

use fgraph_error::{FerroError, Result};
use parking_lot::Mutex;
use tracing::error;

/// Read side of the panic latch.
pub trait PanicSignal: Send + Sync {
    /// Fail with [`FerroError::DatabasePanicked`] if the latch is set.
    fn assert_no_panic(&self) -> Result<()>;
}

/// The concrete one-way latch shared across a database's subsystems.
#[derive(Debug, Default)]
pub struct PanicLatch {
    panicked: AtomicBool,
    cause: Mutex<Option<String>>,
}

impl PanicLatch {
    /// Create an unlatched signal.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            panicked: AtomicBool::new(false),
            cause: Mutex::new(None),
        }
    }

    /// Latch the panic. The first cause wins; later calls are no-ops.
    pub fn panic(&self, cause: impl Into<String>) {
        let cause = cause.into();
        let mut slot = self.cause.lock();
        if slot.is_none() {
            error!(cause = %cause, "database panic latched");
            *slot = Some(cause);
            self.panicked.store(true, Ordering::Release);
        }
    }

    /// Whether the latch has been set.
    pub fn is_panicked(&self) -> bool {
        self.panicked.load(Ordering::Acquire)
    }
}

impl PanicSignal for PanicLatch {
    fn assert_no_panic(&self) -> Result<()> {
        if self.is_panicked() {
            let cause = self
                .cause
                .lock()
                .clone()
                .unwrap_or_else(|| "unknown".to_owned());
            return Err(FerroError::DatabasePanicked { cause });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlatched_passes() {
        let latch = PanicLatch::new();
        assert!(!latch.is_panicked());
        assert!(latch.assert_no_panic().is_ok());
    }

    #[test]
    fn latched_fails_with_cause() {
        let latch = PanicLatch::new();
        latch.panic("log device disappeared");
        assert!(latch.is_panicked());

        let err = latch.assert_no_panic().expect_err("latched");
        assert!(matches!(
            err,
            FerroError::DatabasePanicked { cause } if cause == "log device disappeared"
        ));
    }

    #[test]
    fn first_cause_wins() {
        let latch = PanicLatch::new();
        latch.panic("first");
        latch.panic("second");

        let err = latch.assert_no_panic().expect_err("latched");
        assert!(matches!(
            err,
            FerroError::DatabasePanicked { cause } if cause == "first"
        ));
    }
}
