//! Batch-related types
//!
//! A batch is one uploaded file whose rows await (or undergo) transfer
//! processing. Batches are created in `VALIDATED` by the ingestion path and are
//! only ever moved forward by the engine's guarded status transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Batch identifier
pub type BatchId = String;

/// Lifecycle states of a batch
///
/// Only `Validated` and `Processing` are eligible for processing. The three
/// `Processed*` states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    /// File received, not yet validated (owned by ingestion)
    Uploaded,
    /// Upload could not be parsed (owned by ingestion)
    UploadedFailed,
    /// Rows passed schema validation and wait for processing
    Validated,
    /// Validation rejected the file (owned by ingestion)
    ValidatedFailed,
    /// The engine is driving the rows through the gateway
    Processing,
    /// Every row succeeded
    Processed,
    /// Some rows succeeded, some failed
    ProcessedWithError,
    /// No row succeeded
    ProcessedFailed,
}

impl BatchStatus {
    /// States the scheduler selects and the pipeline may move to `Processing`
    pub const ELIGIBLE: [BatchStatus; 2] = [BatchStatus::Validated, BatchStatus::Processing];

    /// Wire/storage name of the status
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Uploaded => "UPLOADED",
            BatchStatus::UploadedFailed => "UPLOADED_FAILED",
            BatchStatus::Validated => "VALIDATED",
            BatchStatus::ValidatedFailed => "VALIDATED_FAILED",
            BatchStatus::Processing => "PROCESSING",
            BatchStatus::Processed => "PROCESSED",
            BatchStatus::ProcessedWithError => "PROCESSED_WITH_ERROR",
            BatchStatus::ProcessedFailed => "PROCESSED_FAILED",
        }
    }

    /// Derive the terminal status from success/failure counts
    ///
    /// - 0 failures and at least one success => `Processed`
    /// - at least one success and one failure => `ProcessedWithError`
    /// - no success => `ProcessedFailed`
    pub fn from_counts(success: u64, failure: u64) -> Self {
        match (success, failure) {
            (s, 0) if s > 0 => BatchStatus::Processed,
            (s, _) if s > 0 => BatchStatus::ProcessedWithError,
            _ => BatchStatus::ProcessedFailed,
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batch document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: BatchId,

    /// Application (processing feature) the batch was uploaded for
    pub application_id: String,

    pub status: BatchStatus,

    pub uploaded_by: String,

    /// User whose profile determines the tenant the rows are posted under
    pub validated_by: String,

    #[serde(default = "Utc::now")]
    pub uploaded_at: DateTime<Utc>,

    /// Last time the engine changed the status
    #[serde(default)]
    pub processing_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub original_filename: Option<String>,
}

impl Batch {
    /// Create a freshly validated batch
    pub fn validated(
        id: impl Into<BatchId>,
        application_id: impl Into<String>,
        uploaded_by: impl Into<String>,
        validated_by: impl Into<String>,
    ) -> Self {
        Batch {
            id: id.into(),
            application_id: application_id.into(),
            status: BatchStatus::Validated,
            uploaded_by: uploaded_by.into(),
            validated_by: validated_by.into(),
            uploaded_at: Utc::now(),
            processing_at: None,
            original_filename: None,
        }
    }
}
