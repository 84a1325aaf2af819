//! Core batch processing engine
//!
//! This module contains the batch/row processing components:
//! - `traits` - Document store abstractions (conditional updates and counts)
//! - `memory_store` - `DashMap`-backed document store
//! - `journal` - tracing + persisted processing log
//! - `claimer` - Atomic row claim and settle
//! - `recovery` - Stuck-claim reset and poison-pill quarantine
//! - `dispatcher` - Semaphore-bounded fan-out with a join barrier
//! - `row_processor` - Claim, call, classify and persist one row
//! - `finalizer` - Statistics and terminal batch status
//! - `pipeline` - Per-batch orchestration

pub mod claimer;
pub mod dispatcher;
pub mod finalizer;
pub mod journal;
pub mod memory_store;
pub mod pipeline;
pub mod recovery;
pub mod row_processor;
pub mod traits;

use std::sync::Arc;

pub use claimer::RowClaimer;
pub use dispatcher::{DispatchReport, Dispatcher};
pub use finalizer::{FinalizeOutcome, Finalizer};
pub use journal::Journal;
pub use memory_store::InMemoryStore;
pub use pipeline::{BatchPipeline, PipelineOutcome};
pub use recovery::{RecoveryManager, RecoveryReport};
pub use row_processor::{RowDisposition, RowProcessor};
pub use traits::DocumentStore;

/// Document store shared by every engine component
pub type SharedStore = Arc<dyn DocumentStore>;
