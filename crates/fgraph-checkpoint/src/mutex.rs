//! Single-writer serialization of checkpoint execution.
//!
//! One underlying mutex, three acquisition modes. Whichever acquirer wins,
//! the returned [`CheckpointGuard`] is the only guard alive; dropping it on
//! any exit path (normal return, `?` propagation, panic unwind) releases the
//! lock.
//!
//! The three modes exist because the callers differ: a forced checkpoint
//! must wait its turn, an opportunistic threshold check must never queue
//! behind a running checkpoint, and shutdown needs a bounded wait.

use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

/// How long one blocking attempt inside [`CheckpointMutex::try_lock_until`]
/// waits before the timeout predicate is consulted again.
const TRY_LOCK_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Mutual exclusion for checkpoint execution.
#[derive(Debug, Default)]
pub struct CheckpointMutex {
    inner: Mutex<()>,
}

/// Exclusive permission to run a checkpoint. Lock is released on drop.
#[must_use = "dropping the guard immediately releases the checkpoint lock"]
#[derive(Debug)]
pub struct CheckpointGuard<'a> {
    _permit: MutexGuard<'a, ()>,
}

impl CheckpointMutex {
    /// Create an unlocked mutex.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(()),
        }
    }

    /// Block until the lock is acquired.
    pub fn lock(&self) -> CheckpointGuard<'_> {
        CheckpointGuard {
            _permit: self.inner.lock(),
        }
    }

    /// Acquire the lock if it is free right now, `None` otherwise.
    pub fn try_lock(&self) -> Option<CheckpointGuard<'_>> {
        self.inner
            .try_lock()
            .map(|permit| CheckpointGuard { _permit: permit })
    }

    /// Wait for the lock until `timed_out` reports true.
    ///
    /// The predicate is polled between bounded acquisition attempts; it
    /// cancels only the wait, never an acquired lock. Returns `Some` as soon
    /// as the lock is acquired, `None` once the predicate fires first.
    pub fn try_lock_until(&self, timed_out: impl Fn() -> bool) -> Option<CheckpointGuard<'_>> {
        loop {
            if let Some(guard) = self.try_lock() {
                return Some(guard);
            }
            if timed_out() {
                return None;
            }
            if let Some(permit) = self.inner.try_lock_for(TRY_LOCK_POLL_INTERVAL) {
                return Some(CheckpointGuard { _permit: permit });
            }
        }
    }

    /// Whether some guard is currently alive.
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::thread;
    use std::time::Instant;

    use super::*;

    #[test]
    fn lock_and_release() {
        let mutex = CheckpointMutex::new();
        {
            let _guard = mutex.lock();
            assert!(mutex.is_locked());
        }
        assert!(!mutex.is_locked());
    }

    #[test]
    fn try_lock_fails_while_held() {
        let mutex = CheckpointMutex::new();
        let guard = mutex.lock();
        assert!(mutex.try_lock().is_none());
        drop(guard);
        assert!(mutex.try_lock().is_some());
    }

    #[test]
    fn try_lock_until_times_out_while_held() {
        let mutex = CheckpointMutex::new();
        let _guard = mutex.lock();

        let polls = AtomicU64::new(0);
        let acquired = mutex.try_lock_until(|| polls.fetch_add(1, Ordering::Relaxed) >= 2);
        assert!(acquired.is_none());
        assert!(polls.load(Ordering::Relaxed) >= 3);
    }

    #[test]
    fn try_lock_until_acquires_once_released() {
        let mutex = Arc::new(CheckpointMutex::new());
        let release = Arc::new(AtomicBool::new(false));

        let holder = {
            let mutex = Arc::clone(&mutex);
            let release = Arc::clone(&release);
            let held = Arc::new(AtomicBool::new(false));
            let held_flag = Arc::clone(&held);
            let handle = thread::spawn(move || {
                let _guard = mutex.lock();
                held_flag.store(true, Ordering::Release);
                while !release.load(Ordering::Acquire) {
                    thread::yield_now();
                }
            });
            while !held.load(Ordering::Acquire) {
                thread::yield_now();
            }
            handle
        };

        let waiter = {
            let mutex = Arc::clone(&mutex);
            thread::spawn(move || mutex.try_lock_until(|| false).is_some())
        };

        release.store(true, Ordering::Release);
        holder.join().expect("holder thread");
        assert!(waiter.join().expect("waiter thread"));
    }

    #[test]
    fn single_holder_across_all_acquirers() {
        let mutex = Arc::new(CheckpointMutex::new());
        let concurrent = Arc::new(AtomicU64::new(0));
        let peak = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::new();
        for worker in 0..8 {
            let mutex = Arc::clone(&mutex);
            let concurrent = Arc::clone(&concurrent);
            let peak = Arc::clone(&peak);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    let guard = match worker % 3 {
                        0 => Some(mutex.lock()),
                        1 => mutex.try_lock(),
                        _ => {
                            let deadline = Instant::now() + Duration::from_millis(50);
                            mutex.try_lock_until(|| Instant::now() >= deadline)
                        }
                    };
                    if let Some(_guard) = guard {
                        let inside = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(inside, Ordering::SeqCst);
                        concurrent.fetch_sub(1, Ordering::SeqCst);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().expect("worker thread");
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
