//! Batch statistics report
//!
//! One CSV line per batch: `batch_id,status,total,success,failure`. The status
//! is the batch's current lifecycle status; counts are recomputed from
//! persisted state so batches still in flight report live progress.

use serde::Serialize;
use std::io::Write;
use std::sync::Arc;

use crate::core::{Finalizer, Journal, SharedStore};
use crate::types::{Batch, BatchStatus, EngineError};

/// One line of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub batch_id: String,
    pub status: BatchStatus,
    pub total: u64,
    pub success: u64,
    pub failure: u64,
}

/// Build the report rows for the given batches
pub async fn collect_report(
    store: &SharedStore,
    batches: &[Batch],
) -> Result<Vec<ReportRow>, EngineError> {
    let finalizer = Finalizer::new(Arc::clone(store), Journal::new(Arc::clone(store)));
    let mut rows = Vec::with_capacity(batches.len());
    for batch in batches {
        let stats = finalizer.compute_statistics(&batch.id).await?;
        rows.push(ReportRow {
            batch_id: batch.id.clone(),
            status: batch.status,
            total: stats.total_records,
            success: stats.success_count,
            failure: stats.failure_count,
        });
    }
    Ok(rows)
}

/// Write report rows as CSV, sorted by batch id for deterministic output
pub fn write_report_csv(rows: &[ReportRow], output: &mut dyn Write) -> Result<(), EngineError> {
    let mut writer = csv::Writer::from_writer(output);

    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| a.batch_id.cmp(&b.batch_id));

    for row in &sorted {
        writer.serialize(row)?;
    }
    if sorted.is_empty() {
        writer.write_record(["batch_id", "status", "total", "success", "failure"])?;
    }

    writer.flush()?;
    Ok(())
}
