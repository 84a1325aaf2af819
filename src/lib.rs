//! Batch Transfer Engine Library
//! # Overview
//!
//! This library drives validated batches of financial transactions through an
//! external ledger gateway, one row at a time, with bounded per-batch
//! parallelism and crash-safe row claiming.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core documents (Batch, Row, RowResult, Statistics, etc.)
//! - [`cli`] - CLI arguments parsing
//! - [`config`] - Engine tunables with validated defaults
//! - [`core`] - Business logic components:
//!   - [`core::claimer`] - Atomic row claim and settle
//!   - [`core::recovery`] - Stuck-claim reset and poison-pill quarantine
//!   - [`core::dispatcher`] - Bounded fan-out with a join barrier
//!   - [`core::row_processor`] - One row from claim to persisted result
//!   - [`core::finalizer`] - Statistics and terminal batch status
//!   - [`core::pipeline`] - Per-batch orchestration
//! - [`feature`] - Funds transfer and reversal features
//! - [`gateway`] - Gateway client and response classification
//! - [`scheduler`] - Periodic non-overlapping trigger per feature
//! - [`io`] - Seed loading and the statistics report
//!
//! # Batch Lifecycle
//!
//! - **VALIDATED**: Eligible; rows are all `PENDING`
//! - **PROCESSING**: A worker took the batch; rows are being claimed and sent
//! - **PROCESSED**: Every row ended in success (or duplicate)
//! - **PROCESSED_WITH_ERROR**: Mixed outcome
//! - **PROCESSED_FAILED**: No row succeeded
//!
//! # Row States
//!
//! Each row moves `PENDING -> CLAIMED -> COMPLETED | FAILED`. A claim left
//! behind by a crashed worker is reset to `PENDING` at the start of the next
//! pass; a row reset too many times is quarantined as `FAILED_PERMANENT`.

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod feature;
pub mod gateway;
pub mod io;
pub mod logging;
pub mod scheduler;
pub mod types;

pub use config::EngineConfig;
pub use core::{BatchPipeline, DocumentStore, InMemoryStore, SharedStore};
pub use feature::{create_feature, FeatureKind, ProcessingFeature};
pub use gateway::{classify, Classification, HttpGateway, TransactionGateway};
pub use io::{collect_report, write_report_csv};
pub use scheduler::{FeatureScheduler, TickOutcome, TickReport};
pub use types::{
    Batch, BatchStatus, EngineError, Row, RowOutcome, RowResult, RowStatus, Statistics,
};
