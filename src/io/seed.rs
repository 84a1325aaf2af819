//! Seed documents
//!
//! The binary has no database of its own: it starts from a JSON document
//! holding the reference data, the batches and their validated rows, as the
//! ingestion and administration collaborators would have stored them.
//!
//! ```json
//! {
//!   "applications": [{"id": "app-ft", "name": "FUNDS_TRANSFER"}],
//!   "featureFlags": [{"configKey": "FUNDS_TRANSFER", "enabled": true}],
//!   "countries":    [{"code": "SN", "companyId": "SN0010001"}],
//!   "users":        [{"username": "bob", "countryCode": "SN"}],
//!   "batches":      [{"id": "b1", "applicationId": "app-ft", "status": "VALIDATED",
//!                     "uploadedBy": "alice", "validatedBy": "bob"}],
//!   "rows":         [{"id": "r1", "batchId": "b1", "lineNumber": 1,
//!                     "data": {"DEBIT.ACCT.NO": "100200"}}]
//! }
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::core::InMemoryStore;
use crate::types::{Application, Batch, Country, EngineError, FeatureFlag, Row, UserProfile};

/// Everything needed to populate a store
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedDocument {
    pub applications: Vec<Application>,
    pub feature_flags: Vec<FeatureFlag>,
    pub countries: Vec<Country>,
    pub users: Vec<UserProfile>,
    pub batches: Vec<Batch>,
    pub rows: Vec<Row>,
}

impl SeedDocument {
    /// Parse a seed document from JSON text
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Move the documents into a fresh in-memory store
    pub fn into_store(self) -> InMemoryStore {
        let store = InMemoryStore::new();
        for application in self.applications {
            store.insert_application(application);
        }
        for flag in self.feature_flags {
            store.set_feature_flag(&flag.config_key, flag.enabled);
        }
        for country in self.countries {
            store.insert_country(country);
        }
        for user in self.users {
            store.insert_user(user);
        }
        for batch in self.batches {
            store.insert_batch(batch);
        }
        for row in self.rows {
            store.insert_row(row);
        }
        store
    }
}

/// Read and parse a seed file
///
/// # Errors
///
/// * `IoError` - the file cannot be read
/// * `ParseError` - the file is not a valid seed document
pub async fn load_seed(path: &Path) -> Result<SeedDocument, EngineError> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| EngineError::IoError {
        message: format!("{}: {}", path.display(), e),
    })?;
    SeedDocument::from_json(&text)
}
