//! Batch pipeline
//!
//! One pass over one batch:
//!
//! 1. resolve the tenant (company) from the validating user's profile
//! 2. recover stuck claims and quarantine poisoned rows
//! 3. move the batch to `PROCESSING` if it is still `VALIDATED`/`PROCESSING`
//! 4. load its rows and dispatch the pending ones, bounded by the dispatcher
//! 5. wait for every unit (barrier)
//! 6. finalize
//!
//! Re-running the pipeline on a finished batch does no work: the guarded
//! transition matches nothing and the pass is abandoned.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    DispatchReport, Dispatcher, FinalizeOutcome, Finalizer, Journal, RecoveryManager,
    RecoveryReport, RowClaimer, RowProcessor, SharedStore,
};
use crate::config::EngineConfig;
use crate::feature::ProcessingFeature;
use crate::gateway::TransactionGateway;
use crate::types::{Batch, BatchStatus, Country, EngineError, RowStatus};

/// What one pipeline pass did
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// The batch was no longer eligible; another worker moved it on
    Abandoned,
    /// Rows were dispatched and finalization attempted
    Processed {
        recovery: RecoveryReport,
        dispatch: DispatchReport,
        finalize: FinalizeOutcome,
    },
}

/// Runs batches of one processing feature
#[derive(Debug, Clone)]
pub struct BatchPipeline {
    store: SharedStore,
    gateway: Arc<dyn TransactionGateway>,
    feature: Arc<dyn ProcessingFeature>,
    config: EngineConfig,
    journal: Journal,
    cancel: CancellationToken,
}

impl BatchPipeline {
    pub fn new(
        store: SharedStore,
        gateway: Arc<dyn TransactionGateway>,
        feature: Arc<dyn ProcessingFeature>,
        config: EngineConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            journal: Journal::new(Arc::clone(&store)),
            store,
            gateway,
            feature,
            config,
            cancel,
        }
    }

    /// Run one pass over a batch
    ///
    /// # Errors
    ///
    /// * `ContextUnresolved` - the tenant cannot be resolved; nothing changed
    /// * `Store` - a store operation outside the row units failed
    pub async fn run(&self, batch: &Batch) -> Result<PipelineOutcome, EngineError> {
        let company_id = self.resolve_tenant(batch).await?;

        let recovery = RecoveryManager::new(
            Arc::clone(&self.store),
            self.journal.clone(),
            self.config.max_retry,
        )
        .recover(&batch.id)
        .await?;

        let matched = self
            .store
            .transition_batch(&batch.id, &BatchStatus::ELIGIBLE, BatchStatus::Processing)
            .await?;
        if matched == 0 {
            debug!(batch_id = %batch.id, "Batch no longer eligible, abandoning");
            return Ok(PipelineOutcome::Abandoned);
        }

        let rows: Vec<_> = self
            .store
            .rows_for_batch(&batch.id)
            .await?
            .into_iter()
            .filter(|row| row.processing_status == RowStatus::Pending)
            .collect();

        let worker_id = Uuid::new_v4().to_string();
        info!(
            batch_id = %batch.id,
            feature = %self.feature.kind(),
            worker_id = %worker_id,
            company_id = %company_id,
            rows = rows.len(),
            "Processing batch"
        );

        let processor = Arc::new(RowProcessor::new(
            Arc::clone(&self.store),
            Arc::clone(&self.gateway),
            Arc::clone(&self.feature),
            RowClaimer::new(Arc::clone(&self.store), worker_id),
            company_id,
        ));
        let dispatch = Dispatcher::new(self.config.max_concurrent_rows)
            .dispatch(rows, &self.cancel, |row| {
                let processor = Arc::clone(&processor);
                async move {
                    processor.process(row).await;
                }
            })
            .await;

        let finalize = Finalizer::new(Arc::clone(&self.store), self.journal.clone())
            .finalize(&batch.id)
            .await?;

        Ok(PipelineOutcome::Processed {
            recovery,
            dispatch,
            finalize,
        })
    }

    /// Company id the batch's rows are posted under
    ///
    /// validating user -> user's country code -> country's company id
    pub async fn resolve_tenant(&self, batch: &Batch) -> Result<String, EngineError> {
        let user = self
            .store
            .find_user(&batch.validated_by)
            .await?
            .ok_or_else(|| {
                EngineError::context_unresolved(
                    &batch.id,
                    format!("user {} not found", batch.validated_by),
                )
            })?;

        let country_code = user
            .country_code
            .filter(|code| Country::is_valid_code(code))
            .ok_or_else(|| {
                EngineError::context_unresolved(
                    &batch.id,
                    format!("user {} has no valid country code", user.username),
                )
            })?;

        self.store
            .company_for_country(&country_code)
            .await?
            .ok_or_else(|| {
                EngineError::context_unresolved(
                    &batch.id,
                    format!("no company registered for country {}", country_code),
                )
            })
    }
}
