//! Row-related types
//!
//! A row is one transaction record within a batch and the unit of claiming,
//! dispatch and result tracking. Each row ends with exactly one `RowResult`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::batch::BatchId;

/// Row identifier
pub type RowId = String;

/// Identity of the worker (one per pipeline run) that claimed a row
pub type WorkerId = String;

/// Field name to value map, already type-validated upstream
pub type FieldMap = BTreeMap<String, serde_json::Value>;

/// Processing state of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowStatus {
    /// Waiting to be claimed
    Pending,
    /// Exclusively owned by one worker
    Claimed,
    /// Posted (or reconciled as a duplicate)
    Completed,
    /// Rejected or errored; terminal, never requeued
    Failed,
    /// Retry budget exhausted while pending; quarantined
    FailedPermanent,
}

impl RowStatus {
    /// Rows in these states still need work before the batch can finalize
    pub const IN_FLIGHT: [RowStatus; 2] = [RowStatus::Pending, RowStatus::Claimed];

    pub fn as_str(self) -> &'static str {
        match self {
            RowStatus::Pending => "PENDING",
            RowStatus::Claimed => "CLAIMED",
            RowStatus::Completed => "COMPLETED",
            RowStatus::Failed => "FAILED",
            RowStatus::FailedPermanent => "FAILED_PERMANENT",
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: RowId,

    pub batch_id: BatchId,

    /// 1-based line number, unique within the batch
    pub line_number: u32,

    /// Validated field values keyed by schema field name
    #[serde(default)]
    pub data: FieldMap,

    #[serde(default = "default_row_status")]
    pub processing_status: RowStatus,

    /// Worker holding the claim, cleared when the claim is released
    #[serde(default)]
    pub worker_id: Option<WorkerId>,

    /// Number of times a stuck claim on this row was recovered
    #[serde(default)]
    pub retry_count: u32,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_row_status() -> RowStatus {
    RowStatus::Pending
}

impl Row {
    /// Create a pending row
    pub fn pending(
        id: impl Into<RowId>,
        batch_id: impl Into<BatchId>,
        line_number: u32,
        data: FieldMap,
    ) -> Self {
        Row {
            id: id.into(),
            batch_id: batch_id.into(),
            line_number,
            data,
            processing_status: RowStatus::Pending,
            worker_id: None,
            retry_count: 0,
            created_at: Utc::now(),
        }
    }
}

/// Persisted outcome of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowOutcome {
    Success,
    Failed,
}

impl RowOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RowOutcome::Success => "SUCCESS",
            RowOutcome::Failed => "FAILED",
        }
    }
}

/// Terminal, write-once result of a row
///
/// At most one result exists per `(batch_id, line_number)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowResult {
    pub batch_id: BatchId,
    pub line_number: u32,
    pub outcome: RowOutcome,

    /// Gateway reference of the posted (or already existing) transaction
    pub external_reference: Option<String>,

    pub error_message: Option<String>,
}

impl RowResult {
    pub fn success(batch_id: impl Into<BatchId>, line_number: u32, reference: String) -> Self {
        RowResult {
            batch_id: batch_id.into(),
            line_number,
            outcome: RowOutcome::Success,
            external_reference: Some(reference),
            error_message: None,
        }
    }

    pub fn failed(batch_id: impl Into<BatchId>, line_number: u32, message: String) -> Self {
        RowResult {
            batch_id: batch_id.into(),
            line_number,
            outcome: RowOutcome::Failed,
            external_reference: None,
            error_message: Some(message),
        }
    }
}
