//! Batch statistics and persisted processing log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::batch::{BatchId, BatchStatus};

/// Aggregated counts for one batch
///
/// Always recomputed from persisted row and result state, never maintained
/// incrementally, so any process can finalize a batch after a crash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub batch_id: BatchId,
    pub total_records: u64,
    pub success_count: u64,
    pub failure_count: u64,

    /// Status derived from the counts (terminal once the batch is finalized)
    pub batch_status: BatchStatus,

    pub last_updated_at: DateTime<Utc>,
}

impl Statistics {
    /// Build statistics whose status is derived from the counts
    pub fn derive(batch_id: impl Into<BatchId>, total: u64, success: u64, failure: u64) -> Self {
        Statistics {
            batch_id: batch_id.into(),
            total_records: total,
            success_count: success,
            failure_count: failure,
            batch_status: BatchStatus::from_counts(success, failure),
            last_updated_at: Utc::now(),
        }
    }
}

/// Severity of a persisted log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Append-only processing log record, subject to time-bounded retention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// `None` for global (non-batch) events
    pub batch_id: Option<BatchId>,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(batch_id: Option<&str>, level: LogLevel, message: impl Into<String>) -> Self {
        LogEntry {
            batch_id: batch_id.map(str::to_string),
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
