//! Document store traits
//!
//! The engine is written against these traits rather than a concrete
//! database. Every correctness-relevant mutation is a single conditional
//! write: the store filters on the expected current state and applies the
//! change atomically, returning how many documents matched. Callers decide
//! whether they "won" from that count; nothing is read, modified in memory
//! and written back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use crate::types::{
    Application, Batch, BatchStatus, EngineError, FeatureFlag, LogEntry, Row, RowOutcome,
    RowResult, RowStatus, Statistics, UserProfile,
};

/// Batch documents
#[async_trait]
pub trait BatchRepository: Send + Sync {
    /// Batches of an application in `VALIDATED` or `PROCESSING`
    async fn find_eligible_batches(&self, application_id: &str)
        -> Result<Vec<Batch>, EngineError>;

    /// Look up one batch
    async fn get_batch(&self, batch_id: &str) -> Result<Option<Batch>, EngineError>;

    /// Set the batch status to `next` only if its current status is one of `expected`
    ///
    /// Returns the number of batches matched (0 or 1).
    async fn transition_batch(
        &self,
        batch_id: &str,
        expected: &[BatchStatus],
        next: BatchStatus,
    ) -> Result<u64, EngineError>;
}

/// Row documents
#[async_trait]
pub trait RowRepository: Send + Sync {
    /// All rows of a batch ordered by line number
    async fn rows_for_batch(&self, batch_id: &str) -> Result<Vec<Row>, EngineError>;

    /// Flip a row from `PENDING` to `CLAIMED`, recording the worker
    ///
    /// Matches on row id AND status `PENDING`. Returns 1 when the caller won
    /// the claim, 0 when the row was not pending.
    async fn claim_row(&self, row_id: &str, worker_id: &str) -> Result<u64, EngineError>;

    /// Move a row claimed by `worker_id` to a terminal status
    ///
    /// Matches on row id, status `CLAIMED` and the claiming worker.
    async fn settle_row(
        &self,
        row_id: &str,
        worker_id: &str,
        next: RowStatus,
    ) -> Result<u64, EngineError>;

    /// Reset every `CLAIMED` row of a batch to `PENDING`, clear its worker and
    /// increment its retry count. Returns the number of rows reset.
    async fn release_stuck_claims(&self, batch_id: &str) -> Result<u64, EngineError>;

    /// Move every `PENDING` row of a batch whose retry count reached
    /// `max_retry` to `FAILED_PERMANENT`. Returns the quarantined rows.
    async fn quarantine_exhausted(
        &self,
        batch_id: &str,
        max_retry: u32,
    ) -> Result<Vec<Row>, EngineError>;

    /// Count rows of a batch, optionally restricted to some statuses
    async fn count_rows(
        &self,
        batch_id: &str,
        statuses: Option<&[RowStatus]>,
    ) -> Result<u64, EngineError>;

    /// Count rows in `status` that have no persisted result
    async fn count_rows_without_result(
        &self,
        batch_id: &str,
        status: RowStatus,
    ) -> Result<u64, EngineError>;
}

/// Row results and batch statistics
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Persist a result unless one already exists for `(batch_id, line_number)`
    ///
    /// Returns `true` when this call inserted the result.
    async fn insert_result_if_absent(&self, result: RowResult) -> Result<bool, EngineError>;

    async fn get_result(
        &self,
        batch_id: &str,
        line_number: u32,
    ) -> Result<Option<RowResult>, EngineError>;

    async fn count_results(&self, batch_id: &str, outcome: RowOutcome)
        -> Result<u64, EngineError>;

    /// Insert or replace the statistics of a batch
    async fn save_statistics(&self, stats: Statistics) -> Result<(), EngineError>;

    async fn get_statistics(&self, batch_id: &str) -> Result<Option<Statistics>, EngineError>;
}

/// Append-only processing log
#[async_trait]
pub trait ProcessingLog: Send + Sync {
    async fn append_log(&self, entry: LogEntry) -> Result<(), EngineError>;

    /// Delete entries older than `cutoff`. Returns the number removed.
    async fn purge_logs_before(&self, cutoff: DateTime<Utc>) -> Result<u64, EngineError>;
}

/// Read-only administrative reference data
#[async_trait]
pub trait ReferenceData: Send + Sync {
    async fn find_application(&self, name: &str) -> Result<Option<Application>, EngineError>;

    async fn feature_flag(&self, config_key: &str) -> Result<Option<FeatureFlag>, EngineError>;

    async fn find_user(&self, username: &str) -> Result<Option<UserProfile>, EngineError>;

    /// Company (tenant) id registered for a country code
    async fn company_for_country(&self, code: &str) -> Result<Option<String>, EngineError>;
}

/// Everything the engine needs from its document store
pub trait DocumentStore:
    BatchRepository + RowRepository + ResultRepository + ProcessingLog + ReferenceData + Debug
{
}

impl<T> DocumentStore for T where
    T: BatchRepository + RowRepository + ResultRepository + ProcessingLog + ReferenceData + Debug
{
}
