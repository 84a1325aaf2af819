//! Batch finalization
//!
//! Counts are recomputed from persisted row and result state on every call,
//! never carried in memory, so any process instance can finalize a batch
//! after a crash. The terminal transition only applies while the batch is
//! still `PROCESSING`; racing finalizers apply it exactly once.

use super::{Journal, SharedStore};
use crate::types::{BatchStatus, EngineError, RowOutcome, RowStatus, Statistics};

/// Result of a finalize attempt
#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    /// Rows are still `PENDING` or `CLAIMED`; the batch stays `PROCESSING`
    InFlight { remaining: u64 },
    /// This call moved the batch to its terminal status
    Finalized(Statistics),
    /// The batch was no longer `PROCESSING`; nothing changed
    Unchanged,
}

/// Aggregates row outcomes and closes out batches
#[derive(Debug, Clone)]
pub struct Finalizer {
    store: SharedStore,
    journal: Journal,
}

impl Finalizer {
    pub fn new(store: SharedStore, journal: Journal) -> Self {
        Self { store, journal }
    }

    /// Compute the statistics of a batch from persisted state
    ///
    /// `FAILED_PERMANENT` rows without a result count as failures.
    pub async fn compute_statistics(&self, batch_id: &str) -> Result<Statistics, EngineError> {
        let total = self.store.count_rows(batch_id, None).await?;
        let success = self
            .store
            .count_results(batch_id, RowOutcome::Success)
            .await?;
        let failed = self
            .store
            .count_results(batch_id, RowOutcome::Failed)
            .await?;
        let quarantined_without_result = self
            .store
            .count_rows_without_result(batch_id, RowStatus::FailedPermanent)
            .await?;

        Ok(Statistics::derive(
            batch_id,
            total,
            success,
            failed + quarantined_without_result,
        ))
    }

    /// Finalize a batch if every row reached a terminal state
    ///
    /// # Returns
    ///
    /// * `InFlight` - rows remain; nothing written
    /// * `Finalized` - status transitioned, statistics saved, summary logged
    /// * `Unchanged` - another finalize already closed the batch
    pub async fn finalize(&self, batch_id: &str) -> Result<FinalizeOutcome, EngineError> {
        let remaining = self
            .store
            .count_rows(batch_id, Some(&RowStatus::IN_FLIGHT))
            .await?;
        if remaining > 0 {
            self.journal
                .info(
                    batch_id,
                    format!("{} row(s) still in flight, batch left PROCESSING", remaining),
                )
                .await;
            return Ok(FinalizeOutcome::InFlight { remaining });
        }

        let stats = self.compute_statistics(batch_id).await?;
        let matched = self
            .store
            .transition_batch(batch_id, &[BatchStatus::Processing], stats.batch_status)
            .await?;
        if matched == 0 {
            return Ok(FinalizeOutcome::Unchanged);
        }

        self.store.save_statistics(stats.clone()).await?;
        self.journal
            .info(
                batch_id,
                format!(
                    "Status={} | Success={} | Fail={}",
                    stats.batch_status, stats.success_count, stats.failure_count
                ),
            )
            .await;

        Ok(FinalizeOutcome::Finalized(stats))
    }
}
