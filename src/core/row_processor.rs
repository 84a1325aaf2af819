//! Processing of one row
//!
//! ```text
//! claim ──(lost)──► skip, no side effects
//!   │
//!   ▼
//! prepare call ─► audit payload ─► gateway ─► classify      (panic boundary)
//!   │
//!   ▼
//! insert result if absent ─► settle CLAIMED -> COMPLETED | FAILED
//! ```
//!
//! Everything between the claim and the result is run under
//! `catch_unwind`: a row unit never fails past its boundary, whatever the
//! feature or the gateway does. A store failure while persisting leaves the
//! row `CLAIMED`; the next tick's recovery pass puts it back in play.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::{Journal, RowClaimer, SharedStore};
use crate::feature::ProcessingFeature;
use crate::gateway::{classify, Classification, TransactionGateway};
use crate::types::{Row, RowOutcome, RowStatus};

/// What a row unit did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowDisposition {
    /// The claim was lost; nothing was done
    Skipped,
    /// Result persisted and row settled
    Settled(Classification),
    /// Classified, but the result or the settle could not be written
    Unsettled(Classification),
    /// The claim itself failed on the store
    ClaimFailed,
}

/// Drives claimed rows of one batch through the gateway
#[derive(Debug, Clone)]
pub struct RowProcessor {
    store: SharedStore,
    gateway: Arc<dyn TransactionGateway>,
    feature: Arc<dyn ProcessingFeature>,
    claimer: RowClaimer,
    journal: Journal,
    company_id: String,
}

impl RowProcessor {
    pub fn new(
        store: SharedStore,
        gateway: Arc<dyn TransactionGateway>,
        feature: Arc<dyn ProcessingFeature>,
        claimer: RowClaimer,
        company_id: impl Into<String>,
    ) -> Self {
        Self {
            journal: Journal::new(Arc::clone(&store)),
            store,
            gateway,
            feature,
            claimer,
            company_id: company_id.into(),
        }
    }

    /// Process one row end to end
    ///
    /// Never fails: every outcome is reported through the returned
    /// [`RowDisposition`] and the persisted result/log state.
    pub async fn process(&self, row: Row) -> RowDisposition {
        match self.claimer.claim(&row.id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(
                    batch_id = %row.batch_id,
                    line = row.line_number,
                    "Row not pending, skipping"
                );
                return RowDisposition::Skipped;
            }
            Err(e) => {
                error!(
                    batch_id = %row.batch_id,
                    line = row.line_number,
                    error = %e,
                    "Failed to claim row"
                );
                return RowDisposition::ClaimFailed;
            }
        }

        let (classification, payload) =
            match AssertUnwindSafe(self.execute(&row)).catch_unwind().await {
                Ok(done) => done,
                Err(panic) => (self.crashed(&row, panic.as_ref(), None), None),
            };

        self.persist(&row, classification, payload.as_deref()).await
    }

    /// Prepare, audit and send the call; returns the classification and the
    /// serialized payload when a call was prepared
    async fn execute(&self, row: &Row) -> (Classification, Option<String>) {
        let call = match self.feature.prepare(row) {
            Ok(call) => call,
            Err(reason) => return (Classification::Failure { reason }, None),
        };

        let payload = call.audit_payload();
        self.journal
            .info(
                &row.batch_id,
                format!(
                    "Row {}: Starting processing. Payload: {}",
                    row.line_number, payload
                ),
            )
            .await;
        debug!(
            batch_id = %row.batch_id,
            line = row.line_number,
            feature = %self.feature.kind(),
            payload = %payload,
            "Calling gateway"
        );

        let sent = AssertUnwindSafe(call.execute(self.gateway.as_ref(), &self.company_id))
            .catch_unwind()
            .await;
        let classification = match sent {
            Ok(outcome) => classify(&outcome),
            Err(panic) => self.crashed(row, panic.as_ref(), Some(&payload)),
        };

        if let Classification::Failure { reason } = &classification {
            warn!(
                batch_id = %row.batch_id,
                line = row.line_number,
                payload = %payload,
                reason = %reason,
                "Row failed"
            );
        }
        (classification, Some(payload))
    }

    /// Failure for a unit that panicked, traced with the row context
    fn crashed(
        &self,
        row: &Row,
        panic: &(dyn Any + Send),
        payload: Option<&str>,
    ) -> Classification {
        let reason = format!("Unexpected error processing row: {}", panic_message(panic));
        let payload = match payload {
            Some(payload) => payload.to_string(),
            None => serde_json::to_string(&row.data).unwrap_or_default(),
        };
        error!(
            batch_id = %row.batch_id,
            line = row.line_number,
            worker_id = self.claimer.worker_id(),
            payload = %payload,
            "{}",
            reason
        );
        Classification::Failure { reason }
    }

    async fn persist(
        &self,
        row: &Row,
        classification: Classification,
        payload: Option<&str>,
    ) -> RowDisposition {
        let result = classification.to_row_result(&row.batch_id, row.line_number);
        let status = match self.store.insert_result_if_absent(result).await {
            Ok(true) => classification.row_status(),
            Ok(false) => {
                debug!(
                    batch_id = %row.batch_id,
                    line = row.line_number,
                    "Result already recorded, keeping the first"
                );
                self.recorded_status(row)
                    .await
                    .unwrap_or_else(|| classification.row_status())
            }
            Err(e) => {
                error!(
                    batch_id = %row.batch_id,
                    line = row.line_number,
                    error = %e,
                    "Failed to persist row result, leaving row claimed for recovery"
                );
                return RowDisposition::Unsettled(classification);
            }
        };

        match self.claimer.settle(&row.id, status).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    batch_id = %row.batch_id,
                    line = row.line_number,
                    "Row no longer claimed by this worker, status left unchanged"
                );
                return RowDisposition::Unsettled(classification);
            }
            Err(e) => {
                error!(
                    batch_id = %row.batch_id,
                    line = row.line_number,
                    error = %e,
                    "Failed to settle row"
                );
                return RowDisposition::Unsettled(classification);
            }
        }

        match &classification {
            Classification::Duplicate { reference, reason } => {
                self.journal
                    .info(
                        &row.batch_id,
                        format!(
                            "Row {} already processed by gateway ({}): {}",
                            row.line_number, reference, reason
                        ),
                    )
                    .await
            }
            Classification::Failure { reason } => {
                self.journal
                    .warn(
                        &row.batch_id,
                        format!(
                            "Row {} failed: {} | Sent Payload: {}",
                            row.line_number,
                            reason,
                            payload.unwrap_or("N/A")
                        ),
                    )
                    .await
            }
            Classification::Success { .. } => {}
        }

        RowDisposition::Settled(classification)
    }

    /// Status matching the result already persisted for the row
    async fn recorded_status(&self, row: &Row) -> Option<RowStatus> {
        match self.store.get_result(&row.batch_id, row.line_number).await {
            Ok(Some(result)) => Some(match result.outcome {
                RowOutcome::Success => RowStatus::Completed,
                RowOutcome::Failed => RowStatus::Failed,
            }),
            Ok(None) => None,
            Err(e) => {
                warn!(
                    batch_id = %row.batch_id,
                    line = row.line_number,
                    error = %e,
                    "Failed to read recorded result"
                );
                None
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::ResultRepository;
    use crate::core::InMemoryStore;
    use crate::feature::{create_feature, FeatureKind};
    use crate::gateway::{GatewayError, GatewayResponse, TransactionRequest};
    use crate::types::{FieldMap, LogLevel};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Gateway answering every call with the same canned outcome
    #[derive(Debug)]
    struct CannedGateway {
        outcome: Result<GatewayResponse, GatewayError>,
        calls: Mutex<Vec<(String, String)>>,
        panics: bool,
    }

    impl CannedGateway {
        fn new(outcome: Result<GatewayResponse, GatewayError>) -> Self {
            Self {
                outcome,
                calls: Mutex::new(Vec::new()),
                panics: false,
            }
        }
    }

    #[async_trait]
    impl TransactionGateway for CannedGateway {
        async fn submit_transaction(
            &self,
            _request: &TransactionRequest,
            correlation_id: &str,
            company_id: &str,
        ) -> Result<GatewayResponse, GatewayError> {
            if self.panics {
                panic!("gateway client exploded");
            }
            self.calls
                .lock()
                .unwrap()
                .push((correlation_id.to_string(), company_id.to_string()));
            self.outcome.clone()
        }

        async fn reverse_transaction(
            &self,
            reference: &str,
            company_id: &str,
        ) -> Result<GatewayResponse, GatewayError> {
            self.calls
                .lock()
                .unwrap()
                .push((reference.to_string(), company_id.to_string()));
            self.outcome.clone()
        }
    }

    fn setup(
        kind: FeatureKind,
        gateway: CannedGateway,
        data: FieldMap,
    ) -> (Arc<InMemoryStore>, Arc<CannedGateway>, RowProcessor, Row) {
        let store = Arc::new(InMemoryStore::new());
        let row = Row::pending("r4", "b1", 4, data);
        store.insert_row(row.clone());
        let gateway = Arc::new(gateway);
        let processor = RowProcessor::new(
            Arc::clone(&store) as SharedStore,
            Arc::clone(&gateway) as Arc<dyn TransactionGateway>,
            create_feature(kind),
            RowClaimer::new(Arc::clone(&store) as SharedStore, "w1"),
            "SN0010001",
        );
        (store, gateway, processor, row)
    }

    #[tokio::test]
    async fn test_success_completes_row_with_reference() {
        let gateway = CannedGateway::new(Ok(GatewayResponse::new(
            201,
            r#"{"header":{"id":"FT001","status":"success"}}"#,
        )));
        let (store, gateway, processor, row) = setup(FeatureKind::FundsTransfer, gateway, FieldMap::new());

        let disposition = processor.process(row).await;

        assert!(matches!(disposition, RowDisposition::Settled(Classification::Success { .. })));
        assert_eq!(store.row("r4").unwrap().processing_status, RowStatus::Completed);
        let result = store.results_for_batch("b1").pop().unwrap();
        assert_eq!(result.outcome, RowOutcome::Success);
        assert_eq!(result.external_reference.as_deref(), Some("FT001"));
        assert_eq!(
            gateway.calls.lock().unwrap().as_slice(),
            &[("b1-4".to_string(), "SN0010001".to_string())]
        );
    }

    #[tokio::test]
    async fn test_lost_claim_has_no_side_effects() {
        let gateway = CannedGateway::new(Ok(GatewayResponse::new(200, "{}")));
        let (store, gateway, processor, row) = setup(FeatureKind::FundsTransfer, gateway, FieldMap::new());
        RowClaimer::new(Arc::clone(&store) as SharedStore, "other").claim("r4").await.unwrap();

        assert_eq!(processor.process(row).await, RowDisposition::Skipped);
        assert!(gateway.calls.lock().unwrap().is_empty());
        assert!(store.results_for_batch("b1").is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_fails_row() {
        let gateway = CannedGateway::new(Err(GatewayError::transport("connection refused")));
        let (store, _gateway, processor, row) = setup(FeatureKind::FundsTransfer, gateway, FieldMap::new());

        processor.process(row).await;

        assert_eq!(store.row("r4").unwrap().processing_status, RowStatus::Failed);
        let result = store.results_for_batch("b1").pop().unwrap();
        assert_eq!(
            result.error_message.as_deref(),
            Some("No response received from gateway: connection refused")
        );
    }

    #[tokio::test]
    async fn test_rejected_row_logs_sent_payload() {
        let gateway = CannedGateway::new(Ok(GatewayResponse::new(
            400,
            r#"{"error":{"type":"BUSINESS","errorDetails":[{"message":"Account closed"}]}}"#,
        )));
        let data = FieldMap::from([("DEBIT.ACCT.NO".to_string(), json!("100200"))]);
        let (store, _gateway, processor, row) = setup(FeatureKind::FundsTransfer, gateway, data);

        processor.process(row).await;

        let messages: Vec<String> = store.log_entries().into_iter().map(|e| e.message).collect();
        assert_eq!(
            messages,
            vec![
                r#"Row 4: Starting processing. Payload: {"body":{"debitAcctNo":"100200"}}"#
                    .to_string(),
                r#"Row 4 failed: Account closed | Sent Payload: {"body":{"debitAcctNo":"100200"}}"#
                    .to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_gateway_panic_is_contained() {
        let mut gateway = CannedGateway::new(Ok(GatewayResponse::new(200, "{}")));
        gateway.panics = true;
        let (store, _gateway, processor, row) = setup(FeatureKind::FundsTransfer, gateway, FieldMap::new());

        let disposition = processor.process(row).await;

        assert!(matches!(disposition, RowDisposition::Settled(Classification::Failure { .. })));
        assert_eq!(store.row("r4").unwrap().processing_status, RowStatus::Failed);
        let message = store.results_for_batch("b1").pop().unwrap().error_message.unwrap();
        assert!(message.contains("gateway client exploded"));
        assert!(store.log_entries().iter().any(|e| e.level == LogLevel::Warn
            && e.message.starts_with("Row 4 failed: Unexpected error processing row")
            && e.message.ends_with(r#"| Sent Payload: {"body":{}}"#)));
    }

    #[tokio::test]
    async fn test_reversal_without_reference_skips_gateway() {
        let gateway = CannedGateway::new(Ok(GatewayResponse::new(200, "{}")));
        let (store, gateway, processor, row) =
            setup(FeatureKind::FundsTransferReversal, gateway, FieldMap::new());

        processor.process(row).await;

        assert!(gateway.calls.lock().unwrap().is_empty());
        let result = store.results_for_batch("b1").pop().unwrap();
        assert_eq!(result.error_message.as_deref(), Some("Missing or empty T24.REFERENCE"));
        assert_eq!(
            store.log_entries().pop().unwrap().message,
            "Row 4 failed: Missing or empty T24.REFERENCE | Sent Payload: N/A"
        );
    }

    #[tokio::test]
    async fn test_reversal_duplicate_counts_as_success() {
        let gateway = CannedGateway::new(Ok(GatewayResponse::new(
            400,
            r#"{"error":{"errorDetails":[{"message":"Transaction already reversed"}]}}"#,
        )));
        let mut data = FieldMap::new();
        data.insert("T24.REFERENCE".to_string(), json!("FT777"));
        let (store, gateway, processor, row) = setup(FeatureKind::FundsTransferReversal, gateway, data);

        processor.process(row).await;

        assert_eq!(
            gateway.calls.lock().unwrap().as_slice(),
            &[("FT777".to_string(), "SN0010001".to_string())]
        );
        assert_eq!(store.row("r4").unwrap().processing_status, RowStatus::Completed);
        let result = store.results_for_batch("b1").pop().unwrap();
        assert_eq!(result.outcome, RowOutcome::Success);
        assert_eq!(result.external_reference.as_deref(), Some("EXISTING"));
    }

    #[tokio::test]
    async fn test_existing_result_is_kept_on_reentry() {
        let gateway = CannedGateway::new(Err(GatewayError::transport("timeout")));
        let (store, _gateway, processor, row) = setup(FeatureKind::FundsTransfer, gateway, FieldMap::new());
        let earlier = crate::types::RowResult::success("b1", 4, "FT-EARLIER".to_string());
        store.insert_result_if_absent(earlier.clone()).await.unwrap();

        processor.process(row).await;

        assert_eq!(store.results_for_batch("b1"), vec![earlier]);
        assert_eq!(store.row("r4").unwrap().processing_status, RowStatus::Completed);
    }
}
