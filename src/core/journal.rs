//! Processing journal
//!
//! Every event the engine reports is emitted as a `tracing` event and
//! persisted as a [`LogEntry`] for the reporting side. A failure to persist
//! an entry is itself only traced: logging never aborts processing.

use tracing::{debug, error, info, warn};

use super::SharedStore;
use crate::types::{LogEntry, LogLevel};

/// Writes processing events to tracing and to the store's processing log
#[derive(Debug, Clone)]
pub struct Journal {
    store: SharedStore,
}

impl Journal {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Emit and persist one event
    ///
    /// # Arguments
    ///
    /// * `batch_id` - Batch the event belongs to, `None` for global events
    /// * `level` - Severity of both the tracing event and the log entry
    /// * `message` - Human-readable message
    pub async fn record(&self, batch_id: Option<&str>, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Debug => debug!(batch_id, "{}", message),
            LogLevel::Info => info!(batch_id, "{}", message),
            LogLevel::Warn => warn!(batch_id, "{}", message),
            LogLevel::Error => error!(batch_id, "{}", message),
        }

        if let Err(e) = self
            .store
            .append_log(LogEntry::new(batch_id, level, message))
            .await
        {
            warn!(batch_id, error = %e, "Failed to persist log entry");
        }
    }

    pub async fn info(&self, batch_id: &str, message: impl Into<String>) {
        self.record(Some(batch_id), LogLevel::Info, message).await
    }

    pub async fn warn(&self, batch_id: &str, message: impl Into<String>) {
        self.record(Some(batch_id), LogLevel::Warn, message).await
    }

    pub async fn error(&self, batch_id: &str, message: impl Into<String>) {
        self.record(Some(batch_id), LogLevel::Error, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::InMemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_record_persists_entry() {
        let store = Arc::new(InMemoryStore::new());
        let journal = Journal::new(Arc::clone(&store) as SharedStore);

        journal.warn("b1", "Recovery: 2 row(s) reset").await;
        journal.record(None, LogLevel::Info, "global").await;

        let entries = store.log_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].batch_id.as_deref(), Some("b1"));
        assert_eq!(entries[0].level, LogLevel::Warn);
        assert_eq!(entries[0].message, "Recovery: 2 row(s) reset");
        assert!(entries[1].batch_id.is_none());
    }
}
