//! Crash recovery and poison-pill quarantine
//!
//! Runs at the start of every pipeline pass, before the batch is (re)moved to
//! `PROCESSING`:
//!
//! 1. rows left `CLAIMED` by a worker that died are reset to `PENDING`, their
//!    worker cleared and their retry count incremented
//! 2. `PENDING` rows whose retry count reached the budget are moved to
//!    `FAILED_PERMANENT` and never dispatched again
//!
//! Both steps are bulk conditional updates scoped to one batch, so running
//! recovery twice changes nothing the second time.

use tracing::warn;

use super::{Journal, SharedStore};
use crate::types::{EngineError, RowResult};

/// Counts of what a recovery pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Stuck claims reset to `PENDING`
    pub reset: u64,
    /// Rows moved to `FAILED_PERMANENT`
    pub quarantined: u64,
}

/// Resets stuck claims and quarantines poisoned rows
#[derive(Debug, Clone)]
pub struct RecoveryManager {
    store: SharedStore,
    journal: Journal,
    max_retry: u32,
}

impl RecoveryManager {
    pub fn new(store: SharedStore, journal: Journal, max_retry: u32) -> Self {
        Self {
            store,
            journal,
            max_retry,
        }
    }

    /// Recover the rows of one batch
    ///
    /// Quarantined rows also get a `FAILED` result so their reason is
    /// visible to reporting; writing it is best-effort since the finalizer
    /// counts `FAILED_PERMANENT` rows without a result as failures anyway.
    ///
    /// # Errors
    ///
    /// Store failures of the two bulk updates are propagated and abort the
    /// batch for this tick.
    pub async fn recover(&self, batch_id: &str) -> Result<RecoveryReport, EngineError> {
        let reset = self.store.release_stuck_claims(batch_id).await?;
        if reset > 0 {
            self.journal
                .warn(batch_id, format!("Recovery: {} row(s) reset", reset))
                .await;
        }

        let quarantined = self
            .store
            .quarantine_exhausted(batch_id, self.max_retry)
            .await?;
        if !quarantined.is_empty() {
            self.journal
                .error(
                    batch_id,
                    format!(
                        "Poison pill: {} row(s) exceeded retry limit",
                        quarantined.len()
                    ),
                )
                .await;
        }

        for row in &quarantined {
            let result = RowResult::failed(
                batch_id,
                row.line_number,
                format!("Retry limit exceeded after {} attempts", row.retry_count),
            );
            if let Err(e) = self.store.insert_result_if_absent(result).await {
                warn!(
                    batch_id,
                    line = row.line_number,
                    error = %e,
                    "Failed to record result for quarantined row"
                );
            }
        }

        Ok(RecoveryReport {
            reset,
            quarantined: quarantined.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::InMemoryStore;
    use crate::types::{FieldMap, LogLevel, Row, RowOutcome, RowStatus};
    use std::sync::Arc;

    fn setup(rows: &[(u32, RowStatus, u32)]) -> (Arc<InMemoryStore>, RecoveryManager) {
        let store = Arc::new(InMemoryStore::new());
        for (line, status, retries) in rows {
            let mut row = Row::pending(format!("r{}", line), "b1", *line, FieldMap::new());
            row.processing_status = *status;
            row.retry_count = *retries;
            if *status == RowStatus::Claimed {
                row.worker_id = Some("dead-worker".to_string());
            }
            store.insert_row(row);
        }
        let manager = RecoveryManager::new(
            Arc::clone(&store) as SharedStore,
            Journal::new(Arc::clone(&store) as SharedStore),
            3,
        );
        (store, manager)
    }

    #[tokio::test]
    async fn test_stuck_claim_is_reset_and_logged() {
        let (store, manager) = setup(&[(1, RowStatus::Claimed, 0), (2, RowStatus::Completed, 0)]);

        let report = manager.recover("b1").await.unwrap();

        assert_eq!(report, RecoveryReport { reset: 1, quarantined: 0 });
        let row = store.row("r1").unwrap();
        assert_eq!(row.processing_status, RowStatus::Pending);
        assert_eq!(row.retry_count, 1);
        assert!(row.worker_id.is_none());

        let logs = store.log_entries();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, LogLevel::Warn);
        assert_eq!(logs[0].message, "Recovery: 1 row(s) reset");
    }

    #[tokio::test]
    async fn test_third_recovery_quarantines_row() {
        let (store, manager) = setup(&[(1, RowStatus::Claimed, 2)]);

        let report = manager.recover("b1").await.unwrap();

        assert_eq!(report, RecoveryReport { reset: 1, quarantined: 1 });
        assert_eq!(
            store.row("r1").unwrap().processing_status,
            RowStatus::FailedPermanent
        );
        let result = store.results_for_batch("b1").pop().unwrap();
        assert_eq!(result.outcome, RowOutcome::Failed);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Retry limit exceeded after 3 attempts")
        );
        assert!(store
            .log_entries()
            .iter()
            .any(|e| e.level == LogLevel::Error
                && e.message == "Poison pill: 1 row(s) exceeded retry limit"));
    }

    #[tokio::test]
    async fn test_recovery_is_idempotent() {
        let (store, manager) = setup(&[(1, RowStatus::Claimed, 0), (2, RowStatus::Pending, 5)]);

        manager.recover("b1").await.unwrap();
        let second = manager.recover("b1").await.unwrap();

        assert_eq!(second, RecoveryReport::default());
        assert_eq!(store.row("r1").unwrap().retry_count, 1);
        assert_eq!(store.results_for_batch("b1").len(), 1);
    }
}
