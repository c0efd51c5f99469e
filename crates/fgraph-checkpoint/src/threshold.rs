//! Checkpoint-needed policies.
//!
//! A threshold answers one question for the opportunistic path: given where
//! the commit clock and the log head are now, is a checkpoint warranted?
//! Forced triggers never consult it.
//!
//! `is_needed` is called without the checkpoint mutex, so every policy keeps
//! its baseline behind its own small lock. `checkpoint_happened` is called
//! with the checkpoint mutex held, after a successful log append.

use fgraph_types::LogPosition;
use parking_lot::Mutex;

use crate::trigger::TriggerInfo;

/// Default transaction-count criterion: checkpoint every 100k commits.
pub const DEFAULT_TX_COUNT: u64 = 100_000;

/// Default log-volume criterion: checkpoint every 256 MiB of log.
pub const DEFAULT_VOLUME_BYTES: u64 = 256 * 1024 * 1024;

/// Default log segment size used to estimate byte distance between
/// positions in different segments.
pub const DEFAULT_SEGMENT_SIZE: u64 = 128 * 1024 * 1024;

/// Policy deciding when an opportunistic checkpoint is warranted.
pub trait CheckPointThreshold: Send + Sync {
    /// Set the baseline. Called exactly once before any `is_needed` call,
    /// with the last closed transaction at startup.
    fn initialize(&self, tx_id: u64, position: LogPosition);

    /// Whether a checkpoint is warranted now. Cheap; safe to call without
    /// the checkpoint mutex.
    fn is_needed(&self, tx_id: u64, position: LogPosition, trigger: &TriggerInfo) -> bool;

    /// Move the baseline forward. Called with the checkpoint mutex held,
    /// after a successful checkpoint append.
    fn checkpoint_happened(&self, tx_id: u64, position: LogPosition);
}

#[derive(Debug, Clone, Copy, Default)]
struct Baseline {
    tx_id: u64,
    position: LogPosition,
}

// ---------------------------------------------------------------------------
// Transaction-count policy
// ---------------------------------------------------------------------------

/// Checkpoint once at least `every` transactions closed since the last one.
#[derive(Debug)]
pub struct TxCountThreshold {
    every: u64,
    baseline: Mutex<Baseline>,
}

impl TxCountThreshold {
    /// Policy firing after `every` closed transactions.
    #[must_use]
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            baseline: Mutex::new(Baseline::default()),
        }
    }
}

impl CheckPointThreshold for TxCountThreshold {
    fn initialize(&self, tx_id: u64, position: LogPosition) {
        *self.baseline.lock() = Baseline { tx_id, position };
    }

    fn is_needed(&self, tx_id: u64, _position: LogPosition, _trigger: &TriggerInfo) -> bool {
        let baseline = self.baseline.lock();
        tx_id.saturating_sub(baseline.tx_id) >= self.every
    }

    fn checkpoint_happened(&self, tx_id: u64, position: LogPosition) {
        *self.baseline.lock() = Baseline { tx_id, position };
    }
}

// ---------------------------------------------------------------------------
// Log-volume policy
// ---------------------------------------------------------------------------

/// Checkpoint once at least `bytes` of log accumulated since the last one.
///
/// Byte distance across segment boundaries is estimated from the segment
/// size: intermediate segments count as full.
#[derive(Debug)]
pub struct VolumeThreshold {
    bytes: u64,
    segment_size: u64,
    baseline: Mutex<Baseline>,
}

impl VolumeThreshold {
    /// Policy firing after `bytes` of appended log, with segments assumed
    /// `segment_size` bytes long.
    #[must_use]
    pub fn new(bytes: u64, segment_size: u64) -> Self {
        Self {
            bytes: bytes.max(1),
            segment_size: segment_size.max(1),
            baseline: Mutex::new(Baseline::default()),
        }
    }

    fn bytes_since(&self, baseline: LogPosition, position: LogPosition) -> u64 {
        if position <= baseline {
            return 0;
        }
        if position.log_version == baseline.log_version {
            return position.byte_offset - baseline.byte_offset;
        }
        let full_segments = position.log_version - baseline.log_version - 1;
        let baseline_tail = self.segment_size.saturating_sub(baseline.byte_offset);
        full_segments
            .saturating_mul(self.segment_size)
            .saturating_add(baseline_tail)
            .saturating_add(position.byte_offset)
    }
}

impl CheckPointThreshold for VolumeThreshold {
    fn initialize(&self, tx_id: u64, position: LogPosition) {
        *self.baseline.lock() = Baseline { tx_id, position };
    }

    fn is_needed(&self, _tx_id: u64, position: LogPosition, _trigger: &TriggerInfo) -> bool {
        let baseline = self.baseline.lock();
        self.bytes_since(baseline.position, position) >= self.bytes
    }

    fn checkpoint_happened(&self, tx_id: u64, position: LogPosition) {
        *self.baseline.lock() = Baseline { tx_id, position };
    }
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Fires when any child policy fires.
pub struct CompositeThreshold {
    children: Vec<Box<dyn CheckPointThreshold>>,
}

impl CompositeThreshold {
    /// Combine policies; `is_needed` is the OR of the children.
    #[must_use]
    pub fn new(children: Vec<Box<dyn CheckPointThreshold>>) -> Self {
        Self { children }
    }
}

impl CheckPointThreshold for CompositeThreshold {
    fn initialize(&self, tx_id: u64, position: LogPosition) {
        for child in &self.children {
            child.initialize(tx_id, position);
        }
    }

    fn is_needed(&self, tx_id: u64, position: LogPosition, trigger: &TriggerInfo) -> bool {
        self.children
            .iter()
            .any(|child| child.is_needed(tx_id, position, trigger))
    }

    fn checkpoint_happened(&self, tx_id: u64, position: LogPosition) {
        for child in &self.children {
            child.checkpoint_happened(tx_id, position);
        }
    }
}

/// The stock policy: count OR volume, with the default criteria.
#[must_use]
pub fn default_threshold() -> CompositeThreshold {
    CompositeThreshold::new(vec![
        Box::new(TxCountThreshold::new(DEFAULT_TX_COUNT)),
        Box::new(VolumeThreshold::new(DEFAULT_VOLUME_BYTES, DEFAULT_SEGMENT_SIZE)),
    ])
}

// ===========================================================================
// Tests
// ===========================================================================
