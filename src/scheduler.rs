//! Scheduler trigger
//!
//! One scheduler per processing feature. Each tick:
//!
//! 1. is skipped entirely if the previous tick of this scheduler still runs
//! 2. checks that the feature's application config exists and that no
//!    administrator disabled it
//! 3. selects every `VALIDATED`/`PROCESSING` batch of the application and runs
//!    them one after another; a failing batch is logged and does not affect
//!    the others
//! 4. purges persisted log entries older than the retention window

use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::core::{BatchPipeline, Journal, PipelineOutcome, SharedStore};
use crate::feature::{create_feature, FeatureKind, ProcessingFeature};
use crate::gateway::TransactionGateway;
use crate::types::{Application, EngineError, LogLevel};

/// Lower bound of the trigger period
const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Summary of one tick that ran
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Eligible batches selected
    pub selected: usize,
    /// Batches whose pipeline pass returned normally
    pub processed: usize,
    /// Batches abandoned because another worker advanced them
    pub abandoned: usize,
    /// Batches whose pass failed and were left for the next tick
    pub failed: usize,
    /// Log entries removed by retention
    pub purged_logs: u64,
}

/// Outcome of one trigger
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The previous tick was still running
    Skipped,
    /// Preconditions not met (config missing or feature disabled)
    Inactive { reason: String },
    /// Batches were selected and run
    Ran(TickReport),
}

/// Clears the running flag when a tick ends, including by panic
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodic, non-overlapping trigger of one feature's batch pipeline
#[derive(Debug)]
pub struct FeatureScheduler {
    feature: Arc<dyn ProcessingFeature>,
    store: SharedStore,
    pipeline: BatchPipeline,
    journal: Journal,
    config: EngineConfig,
    running: AtomicBool,
}

impl FeatureScheduler {
    pub fn new(
        kind: FeatureKind,
        store: SharedStore,
        gateway: Arc<dyn TransactionGateway>,
        config: EngineConfig,
        cancel: CancellationToken,
    ) -> Self {
        let feature = create_feature(kind);
        let pipeline = BatchPipeline::new(
            Arc::clone(&store),
            gateway,
            Arc::clone(&feature),
            config.clone(),
            cancel,
        );
        Self {
            feature,
            journal: Journal::new(Arc::clone(&store)),
            store,
            pipeline,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> FeatureKind {
        self.feature.kind()
    }

    /// Run one trigger
    pub async fn tick(&self) -> TickOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(feature = %self.kind(), "Previous tick still running, skipping");
            return TickOutcome::Skipped;
        }
        let _guard = RunningGuard(&self.running);

        let outcome = match self.active_application().await {
            Ok(application) => TickOutcome::Ran(self.run_batches(&application).await),
            Err(e) => {
                let level = match e {
                    EngineError::FeatureDisabled { .. } => LogLevel::Warn,
                    _ => LogLevel::Error,
                };
                self.journal
                    .record(None, level, format!("[{}] {}", self.kind(), e))
                    .await;
                TickOutcome::Inactive {
                    reason: e.to_string(),
                }
            }
        };

        let purged = self.purge_expired_logs().await;
        match outcome {
            TickOutcome::Ran(mut report) => {
                report.purged_logs = purged;
                TickOutcome::Ran(report)
            }
            other => other,
        }
    }

    /// Tick every `config.interval` until cancelled
    ///
    /// A tick that overruns the interval makes the missed ticks collapse
    /// into one instead of firing back to back.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.interval.max(MIN_INTERVAL));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            feature = %self.kind(),
            interval_secs = self.config.interval.as_secs(),
            "Scheduler started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        info!(feature = %self.kind(), "Scheduler stopped");
    }

    async fn active_application(&self) -> Result<Application, EngineError> {
        let key = self.kind().key();
        let application = self
            .store
            .find_application(key)
            .await?
            .ok_or_else(|| EngineError::application_missing(key))?;

        // No flag document means nobody disabled the feature
        match self.store.feature_flag(key).await? {
            Some(flag) if !flag.enabled => Err(EngineError::feature_disabled(key)),
            _ => Ok(application),
        }
    }

    async fn run_batches(&self, application: &Application) -> TickReport {
        let mut report = TickReport::default();

        let batches = match self.store.find_eligible_batches(&application.id).await {
            Ok(batches) => batches,
            Err(e) => {
                error!(feature = %self.kind(), error = %e, "Failed to select eligible batches");
                return report;
            }
        };
        report.selected = batches.len();

        for batch in &batches {
            let pass = AssertUnwindSafe(self.pipeline.run(batch)).catch_unwind().await;
            let failure = match pass {
                Ok(Ok(PipelineOutcome::Abandoned)) => {
                    report.abandoned += 1;
                    None
                }
                Ok(Ok(PipelineOutcome::Processed { .. })) => {
                    report.processed += 1;
                    None
                }
                Ok(Err(e)) => Some(e.to_string()),
                Err(_) => Some("pipeline panicked".to_string()),
            };

            if let Some(reason) = failure {
                report.failed += 1;
                self.journal
                    .error(&batch.id, format!("CRITICAL_BATCH_FAILURE: {}", reason))
                    .await;
            }
        }

        report
    }

    async fn purge_expired_logs(&self) -> u64 {
        let retention = match chrono::Duration::from_std(self.config.log_retention) {
            Ok(retention) => retention,
            Err(e) => {
                warn!(error = %e, "Log retention out of range, skipping purge");
                return 0;
            }
        };

        match self.store.purge_logs_before(Utc::now() - retention).await {
            Ok(purged) => {
                if purged > 0 {
                    debug!(purged, "Purged expired log entries");
                }
                purged
            }
            Err(e) => {
                warn!(error = %e, "Failed to purge expired log entries");
                0
            }
        }
    }
}
