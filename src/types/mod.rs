//! Types module
//!
//! Contains the documents the processing engine reads and mutates.
//! This module organizes types into logical submodules:
//! - `batch`: Batch documents and their lifecycle states
//! - `row`: Row documents, claim states and per-row results
//! - `statistics`: Aggregated batch statistics and persisted log entries
//! - `reference`: Read-only administrative reference data
//! - `error`: Error types for the engine

pub mod batch;
pub mod error;
pub mod reference;
pub mod row;
pub mod statistics;

pub use batch::{Batch, BatchId, BatchStatus};
pub use error::EngineError;
pub use reference::{Application, Country, FeatureFlag, UserProfile};
pub use row::{FieldMap, Row, RowId, RowOutcome, RowResult, RowStatus, WorkerId};
pub use statistics::{LogEntry, LogLevel, Statistics};
