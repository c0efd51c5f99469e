//! Reason carriers for checkpoint requests.
//!
//! The coordinator treats a trigger opaquely; its only job is producing the
//! human-readable prefix of the start/completion log lines.

use fgraph_types::LatestCheckpointInfo;

/// Why a checkpoint was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerInfo {
    /// Background scheduler decided the threshold may have been crossed.
    Scheduled,
    /// An operator asked for a checkpoint explicitly.
    ForcedByOperator,
    /// The database is shutting down.
    Shutdown,
    /// A backup is about to start and wants a consistent base.
    BackupBegin,
    /// Recovery finished replaying the log and seals its work.
    RecoveryComplete,
}

impl TriggerInfo {
    /// Short name used in log lines.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduler",
            Self::ForcedByOperator => "forced by operator",
            Self::Shutdown => "database shutdown",
            Self::BackupBegin => "backup begin",
            Self::RecoveryComplete => "recovery complete",
        }
    }

    /// Human log prefix describing this trigger against the checkpoint it
    /// produced (or the last known one, for warnings).
    #[must_use]
    pub fn describe(self, latest: LatestCheckpointInfo) -> String {
        if latest.is_unknown() {
            format!("Checkpoint triggered by \"{}\" @ txId: unknown", self.name())
        } else {
            format!(
                "Checkpoint triggered by \"{}\" @ txId: {}",
                self.name(),
                latest.committed_tx.id
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use fgraph_types::{KernelVersion, TransactionId};

    use super::*;

    #[test]
    fn describe_known_checkpoint() {
        let info = LatestCheckpointInfo::new(
            TransactionId::new(42, 0, 0, -1),
            KernelVersion::LATEST,
        );
        assert_eq!(
            TriggerInfo::Scheduled.describe(info),
            "Checkpoint triggered by \"scheduler\" @ txId: 42"
        );
    }

    #[test]
    fn describe_unknown_checkpoint() {
        assert_eq!(
            TriggerInfo::ForcedByOperator.describe(LatestCheckpointInfo::UNKNOWN),
            "Checkpoint triggered by \"forced by operator\" @ txId: unknown"
        );
    }

    #[test]
    fn trigger_names() {
        assert_eq!(TriggerInfo::Shutdown.name(), "database shutdown");
        assert_eq!(TriggerInfo::BackupBegin.name(), "backup begin");
        assert_eq!(TriggerInfo::RecoveryComplete.name(), "recovery complete");
    }
}
