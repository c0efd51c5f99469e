//! Shared plain value types for the FerroGraph storage engine.
//!
//! Everything in this crate is a small `Copy` value object: created on read,
//! compared, logged, discarded. The interesting contracts are the ordering
//! laws — [`TransactionId`] orders by its id alone, [`LogPosition`] orders
//! lexicographically by `(log_version, byte_offset)`.

use std::cmp::Ordering;
use std::fmt;

// ---------------------------------------------------------------------------
// TransactionId
// ---------------------------------------------------------------------------

/// Identity of one committed transaction.
///
/// `id` is strictly monotonic across the life of a database. The remaining
/// fields are payload carried alongside the identity (integrity checksum,
/// commit wall-clock time, cluster consensus index); they never participate
/// in ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TransactionId {
    /// Monotonic commit sequence number.
    pub id: u64,
    /// Integrity checksum of the commit entry.
    pub checksum: u64,
    /// Commit wall-clock timestamp, milliseconds since the epoch.
    pub commit_timestamp: i64,
    /// Index assigned by cluster consensus, or a negative sentinel when the
    /// database runs standalone.
    pub consensus_index: i64,
}

impl TransactionId {
    /// The base token present in an empty transaction log, before any
    /// commit. Real commits are assigned strictly larger ids, so this also
    /// anchors [`LatestCheckpointInfo::UNKNOWN`].
    pub const BASE: Self = Self::new(1, 0, 0, -1);

    /// Create a transaction id from its raw parts.
    #[must_use]
    pub const fn new(id: u64, checksum: u64, commit_timestamp: i64, consensus_index: i64) -> Self {
        Self {
            id,
            checksum,
            commit_timestamp,
            consensus_index,
        }
    }
}

// Ordering is by `id` alone: checksum, timestamp and consensus index are
// derived payload of the same commit, never tie-breakers.
impl PartialOrd for TransactionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TransactionId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "transaction {} (checksum {:#x}, committed at {}, consensus index {})",
            self.id, self.checksum, self.commit_timestamp, self.consensus_index
        )
    }
}

// ---------------------------------------------------------------------------
// LogPosition
// ---------------------------------------------------------------------------

/// A byte position in the append-only transaction log.
///
/// Total-ordered lexicographically: first by `log_version` (the log segment
/// file), then by `byte_offset` within the segment. The derived `Ord` gives
/// exactly that because of field order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct LogPosition {
    /// Log segment version.
    pub log_version: u64,
    /// Byte offset within the segment.
    pub byte_offset: u64,
}

impl LogPosition {
    /// Start of the very first log segment.
    pub const START: Self = Self::new(0, 0);

    /// Create a position from a segment version and a byte offset.
    #[must_use]
    pub const fn new(log_version: u64, byte_offset: u64) -> Self {
        Self {
            log_version,
            byte_offset,
        }
    }
}

impl fmt::Display for LogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.log_version, self.byte_offset)
    }
}

// ---------------------------------------------------------------------------
// KernelVersion
// ---------------------------------------------------------------------------

/// Storage engine format tag.
///
/// Travels in every checkpoint record so that recovery can detect version
/// drift between the engine that wrote the record and the engine replaying
/// it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[repr(transparent)]
pub struct KernelVersion(u8);

impl KernelVersion {
    /// Oldest format this engine can still read.
    pub const EARLIEST: Self = Self(1);

    /// Format written by the current engine.
    pub const LATEST: Self = Self(5);

    /// Create a version tag from its raw value.
    #[must_use]
    pub const fn new(tag: u8) -> Self {
        Self(tag)
    }

    /// Raw format tag.
    #[must_use]
    pub const fn tag(self) -> u8 {
        self.0
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// LatestCheckpointInfo
// ---------------------------------------------------------------------------

/// Snapshot describing the most recent successful checkpoint.
///
/// Written only at the very end of a successful checkpoint, read freely by
/// other subsystems. [`LatestCheckpointInfo::UNKNOWN`] is the value before
/// the first checkpoint of a database's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LatestCheckpointInfo {
    /// Highest transaction covered by the checkpoint: every mutation with a
    /// commit id at or below this one has been flushed to the page store.
    pub committed_tx: TransactionId,
    /// Engine format tag recorded in the checkpoint entry.
    pub kernel_version: KernelVersion,
}

impl LatestCheckpointInfo {
    /// Sentinel used before the first successful checkpoint: the base token
    /// of an empty log, which no real checkpoint ever covers.
    pub const UNKNOWN: Self = Self::new(TransactionId::BASE, KernelVersion::LATEST);

    /// Pair a checkpointed transaction with the engine format that wrote it.
    #[must_use]
    pub const fn new(committed_tx: TransactionId, kernel_version: KernelVersion) -> Self {
        Self {
            committed_tx,
            kernel_version,
        }
    }

    /// Whether this is the pre-first-checkpoint sentinel.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        self.committed_tx.id == TransactionId::BASE.id
    }
}

// ---------------------------------------------------------------------------
// ClosedTransactionSnapshot
// ---------------------------------------------------------------------------

/// One lock-free read of the transaction-id store: the last closed
/// transaction and the log position its commit entry ends at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedTransactionSnapshot {
    /// Last transaction whose commit entry is fully in the log.
    pub transaction: TransactionId,
    /// Log position just past that commit entry.
    pub log_position: LogPosition,
}

impl ClosedTransactionSnapshot {
    /// Pair a closed transaction with its log position.
    #[must_use]
    pub const fn new(transaction: TransactionId, log_position: LogPosition) -> Self {
        Self {
            transaction,
            log_position,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn transaction_id_orders_by_id_alone() {
        let older = TransactionId::new(10, 0xAAAA, 1000, 5);
        let newer = TransactionId::new(11, 0x0001, 500, 2);
        assert!(older < newer);

        let twin = TransactionId::new(10, 0xBBBB, 2000, 9);
        assert_eq!(older.cmp(&twin), Ordering::Equal);
        assert_ne!(older, twin);
    }

    #[test]
    fn log_position_lexicographic_order() {
        let a = LogPosition::new(3, 9999);
        let b = LogPosition::new(4, 0);
        assert!(a < b);
        assert!(LogPosition::new(4, 1) > b);
        assert_eq!(LogPosition::START, LogPosition::new(0, 0));
    }

    #[test]
    fn unknown_checkpoint_info_sentinel() {
        assert!(LatestCheckpointInfo::UNKNOWN.is_unknown());
        assert_eq!(
            LatestCheckpointInfo::UNKNOWN.committed_tx,
            TransactionId::BASE
        );
        let real = LatestCheckpointInfo::new(
            TransactionId::new(42, 0, 0, -1),
            KernelVersion::LATEST,
        );
        assert!(!real.is_unknown());
    }

    #[test]
    fn kernel_version_display() {
        assert_eq!(KernelVersion::LATEST.to_string(), "V5");
        assert_eq!(KernelVersion::new(3).to_string(), "V3");
        assert!(KernelVersion::EARLIEST < KernelVersion::LATEST);
    }

    #[test]
    fn log_position_display() {
        assert_eq!(LogPosition::new(7, 1024).to_string(), "7/1024");
    }

    // ── ordering laws ──

    proptest! {
        #[test]
        fn prop_log_position_order_matches_tuple_order(
            v1 in any::<u64>(), o1 in any::<u64>(),
            v2 in any::<u64>(), o2 in any::<u64>(),
        ) {
            let a = LogPosition::new(v1, o1);
            let b = LogPosition::new(v2, o2);
            prop_assert_eq!(a.cmp(&b), (v1, o1).cmp(&(v2, o2)));
        }

        #[test]
        fn prop_transaction_id_order_ignores_payload(
            id1 in any::<u64>(), id2 in any::<u64>(),
            checksum in any::<u64>(),
            timestamp in any::<i64>(),
            consensus in any::<i64>(),
        ) {
            let a = TransactionId::new(id1, checksum, timestamp, consensus);
            let b = TransactionId::new(id2, 0, 0, -1);
            prop_assert_eq!(a.cmp(&b), id1.cmp(&id2));
        }
    }
}
