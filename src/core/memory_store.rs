//! Thread-safe in-memory document store
//!
//! This module provides `InMemoryStore`, a `DocumentStore` backed by
//! `DashMap` collections. It backs the binary (seeded from a JSON document)
//! and the test suites.
//!
//! # Atomicity
//!
//! Every conditional write holds the DashMap shard lock of the document it
//! inspects for the whole check-and-set, so two concurrent claims on the same
//! row serialize and exactly one observes `PENDING`. Bulk updates walk the
//! collection with `iter_mut`, locking one shard at a time; each row is still
//! updated atomically, which is all the recovery pass relies on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Mutex;

use super::traits::{BatchRepository, ProcessingLog, ReferenceData, ResultRepository, RowRepository};
use crate::types::{
    Application, Batch, BatchId, BatchStatus, Country, EngineError, FeatureFlag, LogEntry, Row,
    RowId, RowOutcome, RowResult, RowStatus, Statistics, UserProfile,
};

/// In-memory document store
///
/// Collections are keyed the way a document database would index them:
/// rows by id, results by the unique `(batch_id, line_number)` pair,
/// reference data by its natural key.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    batches: DashMap<BatchId, Batch>,
    rows: DashMap<RowId, Row>,
    results: DashMap<(BatchId, u32), RowResult>,
    statistics: DashMap<BatchId, Statistics>,
    logs: Mutex<Vec<LogEntry>>,
    applications: DashMap<String, Application>,
    feature_flags: DashMap<String, FeatureFlag>,
    users: DashMap<String, UserProfile>,
    countries: DashMap<String, Country>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_batch(&self, batch: Batch) {
        self.batches.insert(batch.id.clone(), batch);
    }

    pub fn insert_row(&self, row: Row) {
        self.rows.insert(row.id.clone(), row);
    }

    pub fn insert_application(&self, application: Application) {
        self.applications.insert(application.name.clone(), application);
    }

    pub fn set_feature_flag(&self, config_key: &str, enabled: bool) {
        self.feature_flags.insert(
            config_key.to_string(),
            FeatureFlag {
                config_key: config_key.to_string(),
                enabled,
                last_updated: Some(Utc::now()),
            },
        );
    }

    pub fn insert_user(&self, user: UserProfile) {
        self.users.insert(user.username.clone(), user);
    }

    pub fn insert_country(&self, country: Country) {
        self.countries.insert(country.code.clone(), country);
    }

    /// Snapshot of one row
    pub fn row(&self, row_id: &str) -> Option<Row> {
        self.rows.get(row_id).map(|row| row.value().clone())
    }

    /// Snapshot of every batch, ordered by id
    pub fn all_batches(&self) -> Vec<Batch> {
        let mut batches: Vec<Batch> = self.batches.iter().map(|b| b.value().clone()).collect();
        batches.sort_by(|a, b| a.id.cmp(&b.id));
        batches
    }

    /// Snapshot of the results of a batch, ordered by line number
    pub fn results_for_batch(&self, batch_id: &str) -> Vec<RowResult> {
        let mut results: Vec<RowResult> = self
            .results
            .iter()
            .filter(|entry| entry.key().0 == batch_id)
            .map(|entry| entry.value().clone())
            .collect();
        results.sort_by_key(|result| result.line_number);
        results
    }

    /// Snapshot of the persisted log
    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.logs
            .lock()
            .map(|logs| logs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BatchRepository for InMemoryStore {
    async fn find_eligible_batches(
        &self,
        application_id: &str,
    ) -> Result<Vec<Batch>, EngineError> {
        let mut batches: Vec<Batch> = self
            .batches
            .iter()
            .filter(|b| {
                b.application_id == application_id && BatchStatus::ELIGIBLE.contains(&b.status)
            })
            .map(|b| b.value().clone())
            .collect();
        batches.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id)));
        Ok(batches)
    }

    async fn get_batch(&self, batch_id: &str) -> Result<Option<Batch>, EngineError> {
        Ok(self.batches.get(batch_id).map(|b| b.value().clone()))
    }

    async fn transition_batch(
        &self,
        batch_id: &str,
        expected: &[BatchStatus],
        next: BatchStatus,
    ) -> Result<u64, EngineError> {
        match self.batches.get_mut(batch_id) {
            Some(mut batch) if expected.contains(&batch.status) => {
                batch.status = next;
                batch.processing_at = Some(Utc::now());
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[async_trait]
impl RowRepository for InMemoryStore {
    async fn rows_for_batch(&self, batch_id: &str) -> Result<Vec<Row>, EngineError> {
        let mut rows: Vec<Row> = self
            .rows
            .iter()
            .filter(|row| row.batch_id == batch_id)
            .map(|row| row.value().clone())
            .collect();
        rows.sort_by_key(|row| row.line_number);
        Ok(rows)
    }

    async fn claim_row(&self, row_id: &str, worker_id: &str) -> Result<u64, EngineError> {
        match self.rows.get_mut(row_id) {
            Some(mut row) if row.processing_status == RowStatus::Pending => {
                row.processing_status = RowStatus::Claimed;
                row.worker_id = Some(worker_id.to_string());
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn settle_row(
        &self,
        row_id: &str,
        worker_id: &str,
        next: RowStatus,
    ) -> Result<u64, EngineError> {
        match self.rows.get_mut(row_id) {
            Some(mut row)
                if row.processing_status == RowStatus::Claimed
                    && row.worker_id.as_deref() == Some(worker_id) =>
            {
                row.processing_status = next;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn release_stuck_claims(&self, batch_id: &str) -> Result<u64, EngineError> {
        let mut reset = 0;
        for mut row in self.rows.iter_mut() {
            if row.batch_id == batch_id && row.processing_status == RowStatus::Claimed {
                row.processing_status = RowStatus::Pending;
                row.worker_id = None;
                row.retry_count += 1;
                reset += 1;
            }
        }
        Ok(reset)
    }

    async fn quarantine_exhausted(
        &self,
        batch_id: &str,
        max_retry: u32,
    ) -> Result<Vec<Row>, EngineError> {
        let mut quarantined = Vec::new();
        for mut row in self.rows.iter_mut() {
            if row.batch_id == batch_id
                && row.processing_status == RowStatus::Pending
                && row.retry_count >= max_retry
            {
                row.processing_status = RowStatus::FailedPermanent;
                quarantined.push(row.value().clone());
            }
        }
        quarantined.sort_by_key(|row| row.line_number);
        Ok(quarantined)
    }

    async fn count_rows(
        &self,
        batch_id: &str,
        statuses: Option<&[RowStatus]>,
    ) -> Result<u64, EngineError> {
        let count = self
            .rows
            .iter()
            .filter(|row| row.batch_id == batch_id)
            .filter(|row| statuses.map_or(true, |s| s.contains(&row.processing_status)))
            .count();
        Ok(count as u64)
    }

    async fn count_rows_without_result(
        &self,
        batch_id: &str,
        status: RowStatus,
    ) -> Result<u64, EngineError> {
        let lines: Vec<u32> = self
            .rows
            .iter()
            .filter(|row| row.batch_id == batch_id && row.processing_status == status)
            .map(|row| row.line_number)
            .collect();
        let count = lines
            .into_iter()
            .filter(|line| !self.results.contains_key(&(batch_id.to_string(), *line)))
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl ResultRepository for InMemoryStore {
    async fn insert_result_if_absent(&self, result: RowResult) -> Result<bool, EngineError> {
        let key = (result.batch_id.clone(), result.line_number);
        let mut inserted = false;
        self.results.entry(key).or_insert_with(|| {
            inserted = true;
            result
        });
        Ok(inserted)
    }

    async fn get_result(
        &self,
        batch_id: &str,
        line_number: u32,
    ) -> Result<Option<RowResult>, EngineError> {
        Ok(self
            .results
            .get(&(batch_id.to_string(), line_number))
            .map(|r| r.value().clone()))
    }

    async fn count_results(
        &self,
        batch_id: &str,
        outcome: RowOutcome,
    ) -> Result<u64, EngineError> {
        let count = self
            .results
            .iter()
            .filter(|entry| entry.key().0 == batch_id && entry.outcome == outcome)
            .count();
        Ok(count as u64)
    }

    async fn save_statistics(&self, stats: Statistics) -> Result<(), EngineError> {
        self.statistics.insert(stats.batch_id.clone(), stats);
        Ok(())
    }

    async fn get_statistics(&self, batch_id: &str) -> Result<Option<Statistics>, EngineError> {
        Ok(self.statistics.get(batch_id).map(|s| s.value().clone()))
    }
}

#[async_trait]
impl ProcessingLog for InMemoryStore {
    async fn append_log(&self, entry: LogEntry) -> Result<(), EngineError> {
        let mut logs = self
            .logs
            .lock()
            .map_err(|_| EngineError::store("append_log", "log collection poisoned"))?;
        logs.push(entry);
        Ok(())
    }

    async fn purge_logs_before(&self, cutoff: DateTime<Utc>) -> Result<u64, EngineError> {
        let mut logs = self
            .logs
            .lock()
            .map_err(|_| EngineError::store("purge_logs_before", "log collection poisoned"))?;
        let before = logs.len();
        logs.retain(|entry| entry.timestamp >= cutoff);
        Ok((before - logs.len()) as u64)
    }
}

#[async_trait]
impl ReferenceData for InMemoryStore {
    async fn find_application(&self, name: &str) -> Result<Option<Application>, EngineError> {
        Ok(self.applications.get(name).map(|a| a.value().clone()))
    }

    async fn feature_flag(&self, config_key: &str) -> Result<Option<FeatureFlag>, EngineError> {
        Ok(self.feature_flags.get(config_key).map(|f| f.value().clone()))
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserProfile>, EngineError> {
        Ok(self.users.get(username).map(|u| u.value().clone()))
    }

    async fn company_for_country(&self, code: &str) -> Result<Option<String>, EngineError> {
        if !Country::is_valid_code(code) {
            return Ok(None);
        }
        Ok(self.countries.get(code).map(|c| c.company_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldMap;
    use std::sync::Arc;

    fn store_with_rows(batch_id: &str, count: u32) -> InMemoryStore {
        let store = InMemoryStore::new();
        store.insert_batch(Batch::validated(batch_id, "app-ft", "alice", "bob"));
        for line in 1..=count {
            store.insert_row(Row::pending(
                format!("{}-r{}", batch_id, line),
                batch_id,
                line,
                FieldMap::new(),
            ));
        }
        store
    }

    #[tokio::test]
    async fn test_claim_pending_row_succeeds_once() {
        let store = store_with_rows("b1", 1);

        assert_eq!(store.claim_row("b1-r1", "w1").await.unwrap(), 1);
        assert_eq!(store.claim_row("b1-r1", "w2").await.unwrap(), 0);

        let row = store.row("b1-r1").unwrap();
        assert_eq!(row.processing_status, RowStatus::Claimed);
        assert_eq!(row.worker_id.as_deref(), Some("w1"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_have_single_winner() {
        let store = Arc::new(store_with_rows("b1", 1));

        let mut handles = Vec::new();
        for worker in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.claim_row("b1-r1", &format!("w{}", worker)).await.unwrap()
            }));
        }

        let mut wins = 0;
        for handle in handles {
            wins += handle.await.unwrap();
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn test_claim_missing_row_matches_nothing() {
        let store = InMemoryStore::new();
        assert_eq!(store.claim_row("nope", "w1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_settle_requires_claiming_worker() {
        let store = store_with_rows("b1", 1);
        store.claim_row("b1-r1", "w1").await.unwrap();

        assert_eq!(
            store.settle_row("b1-r1", "w2", RowStatus::Completed).await.unwrap(),
            0
        );
        assert_eq!(
            store.settle_row("b1-r1", "w1", RowStatus::Completed).await.unwrap(),
            1
        );
        // Already settled: guarded update matches nothing
        assert_eq!(
            store.settle_row("b1-r1", "w1", RowStatus::Failed).await.unwrap(),
            0
        );
        assert_eq!(
            store.row("b1-r1").unwrap().processing_status,
            RowStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_release_stuck_claims_resets_and_counts_retry() {
        let store = store_with_rows("b1", 3);
        store.claim_row("b1-r1", "dead").await.unwrap();
        store.claim_row("b1-r3", "dead").await.unwrap();

        assert_eq!(store.release_stuck_claims("b1").await.unwrap(), 2);

        let row = store.row("b1-r1").unwrap();
        assert_eq!(row.processing_status, RowStatus::Pending);
        assert_eq!(row.worker_id, None);
        assert_eq!(row.retry_count, 1);
        assert_eq!(store.row("b1-r2").unwrap().retry_count, 0);

        // Idempotent: nothing left to reset
        assert_eq!(store.release_stuck_claims("b1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_quarantine_only_exhausted_pending_rows() {
        let store = store_with_rows("b1", 2);
        let mut exhausted = store.row("b1-r1").unwrap();
        exhausted.retry_count = 3;
        store.insert_row(exhausted);

        let quarantined = store.quarantine_exhausted("b1", 3).await.unwrap();
        assert_eq!(quarantined.len(), 1);
        assert_eq!(quarantined[0].line_number, 1);
        assert_eq!(
            store.row("b1-r1").unwrap().processing_status,
            RowStatus::FailedPermanent
        );
        assert_eq!(
            store.row("b1-r2").unwrap().processing_status,
            RowStatus::Pending
        );
        assert!(store.quarantine_exhausted("b1", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_result_is_write_once() {
        let store = InMemoryStore::new();

        let first = RowResult::success("b1", 4, "FT001".to_string());
        let second = RowResult::failed("b1", 4, "boom".to_string());

        assert!(store.insert_result_if_absent(first.clone()).await.unwrap());
        assert!(!store.insert_result_if_absent(second).await.unwrap());
        assert_eq!(store.get_result("b1", 4).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_transition_batch_is_guarded() {
        let store = store_with_rows("b1", 0);

        let matched = store
            .transition_batch("b1", &[BatchStatus::Processing], BatchStatus::Processed)
            .await
            .unwrap();
        assert_eq!(matched, 0);

        let matched = store
            .transition_batch("b1", &BatchStatus::ELIGIBLE, BatchStatus::Processing)
            .await
            .unwrap();
        assert_eq!(matched, 1);
        let batch = store.get_batch("b1").await.unwrap().unwrap();
        assert_eq!(batch.status, BatchStatus::Processing);
        assert!(batch.processing_at.is_some());
    }

    #[tokio::test]
    async fn test_eligible_batches_filter_application_and_status() {
        let store = InMemoryStore::new();
        store.insert_batch(Batch::validated("b1", "app-ft", "u", "v"));
        store.insert_batch(Batch::validated("b2", "app-rev", "u", "v"));
        let mut done = Batch::validated("b3", "app-ft", "u", "v");
        done.status = BatchStatus::Processed;
        store.insert_batch(done);
        let mut resumed = Batch::validated("b4", "app-ft", "u", "v");
        resumed.status = BatchStatus::Processing;
        store.insert_batch(resumed);

        let ids: Vec<String> = store
            .find_eligible_batches("app-ft")
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"b1".to_string()));
        assert!(ids.contains(&"b4".to_string()));
    }

    #[tokio::test]
    async fn test_purge_logs_before_cutoff() {
        let store = InMemoryStore::new();
        let mut old = LogEntry::new(Some("b1"), crate::types::LogLevel::Info, "old");
        old.timestamp = Utc::now() - chrono::Duration::hours(48);
        store.append_log(old).await.unwrap();
        store
            .append_log(LogEntry::new(None, crate::types::LogLevel::Info, "fresh"))
            .await
            .unwrap();

        let removed = store
            .purge_logs_before(Utc::now() - chrono::Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.log_entries().len(), 1);
    }

    #[tokio::test]
    async fn test_company_lookup_rejects_malformed_codes() {
        let store = InMemoryStore::new();
        store.insert_country(Country {
            code: "SN".to_string(),
            company_id: "SN0010001".to_string(),
        });

        assert_eq!(
            store.company_for_country("SN").await.unwrap().as_deref(),
            Some("SN0010001")
        );
        assert_eq!(store.company_for_country("sn").await.unwrap(), None);
    }
}
