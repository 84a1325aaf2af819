//! Row claiming
//!
//! A claim is the only mutual-exclusion mechanism of the engine: one
//! conditional write flipping a row from `PENDING` to `CLAIMED` under a
//! worker id. Whoever the store reports as having matched the row owns it
//! until it is settled (or released by recovery).

use super::SharedStore;
use crate::types::{EngineError, RowStatus, WorkerId};

/// Claims and settles rows on behalf of one worker
#[derive(Debug, Clone)]
pub struct RowClaimer {
    store: SharedStore,
    worker_id: WorkerId,
}

impl RowClaimer {
    pub fn new(store: SharedStore, worker_id: impl Into<WorkerId>) -> Self {
        Self {
            store,
            worker_id: worker_id.into(),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Try to claim a row
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - this worker now owns the row
    /// * `Ok(false)` - the row was not `PENDING` (claimed elsewhere or done)
    pub async fn claim(&self, row_id: &str) -> Result<bool, EngineError> {
        let matched = self.store.claim_row(row_id, &self.worker_id).await?;
        Ok(matched == 1)
    }

    /// Move a row this worker claimed to its terminal status
    ///
    /// Returns `false` when the row is no longer claimed by this worker
    /// (recovery released it in the meantime).
    pub async fn settle(&self, row_id: &str, status: RowStatus) -> Result<bool, EngineError> {
        let matched = self
            .store
            .settle_row(row_id, &self.worker_id, status)
            .await?;
        Ok(matched == 1)
    }
}
