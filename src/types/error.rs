//! Error types for the batch transfer engine
//!
//! This module defines the errors that can surface from store access, batch
//! context resolution, configuration and the binary's I/O.
//!
//! # Error Categories
//!
//! - **Store Errors**: the document store rejected or failed an operation
//! - **Batch Errors**: a batch cannot be processed this tick (no tenant)
//! - **Feature Errors**: the feature's application config is missing or it is disabled
//! - **I/O Errors**: seed loading and report writing in the binary
//!
//! Row-level problems never appear here: the row processor turns every row
//! error into a persisted FAILED result.

use thiserror::Error;

/// Main error type for the engine
///
/// Each variant carries enough context to be logged without the caller
/// adding anything.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The document store failed an operation
    ///
    /// Aborts the current batch; the batch is retried on the next tick.
    #[error("Store error during {operation}: {message}")]
    Store {
        /// Store operation that failed
        operation: String,
        /// Description of the failure
        message: String,
    },

    /// The tenant (company) a batch posts under could not be resolved
    ///
    /// The batch is left untouched and retried on the next tick.
    #[error("Tenant context unresolved for batch {batch_id}: {reason}")]
    ContextUnresolved {
        /// Affected batch
        batch_id: String,
        /// Which lookup failed
        reason: String,
    },

    /// The application configuration for a feature does not exist
    #[error("Application config missing for {feature}")]
    ApplicationMissing {
        /// Feature key
        feature: String,
    },

    /// An administrator disabled the feature
    #[error("{feature} processing disabled by administrator")]
    FeatureDisabled {
        /// Feature key
        feature: String,
    },

    /// A configuration value is unusable
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// Configuration field
        field: String,
        /// Why it was rejected
        message: String,
    },

    /// I/O error while reading seeds or writing reports
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// Seed document could not be parsed
    #[error("Seed parse error: {message}")]
    ParseError {
        /// Parser message
        message: String,
    },
}

// Conversion from io::Error to EngineError
impl From<std::io::Error> for EngineError {
    fn from(error: std::io::Error) -> Self {
        EngineError::IoError {
            message: error.to_string(),
        }
    }
}

// Conversion from serde_json::Error to EngineError
impl From<serde_json::Error> for EngineError {
    fn from(error: serde_json::Error) -> Self {
        EngineError::ParseError {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to EngineError
impl From<csv::Error> for EngineError {
    fn from(error: csv::Error) -> Self {
        EngineError::IoError {
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl EngineError {
    /// Create a Store error
    pub fn store(operation: &str, message: impl Into<String>) -> Self {
        EngineError::Store {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Create a ContextUnresolved error
    pub fn context_unresolved(batch_id: &str, reason: impl Into<String>) -> Self {
        EngineError::ContextUnresolved {
            batch_id: batch_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an ApplicationMissing error
    pub fn application_missing(feature: &str) -> Self {
        EngineError::ApplicationMissing {
            feature: feature.to_string(),
        }
    }

    /// Create a FeatureDisabled error
    pub fn feature_disabled(feature: &str) -> Self {
        EngineError::FeatureDisabled {
            feature: feature.to_string(),
        }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(field: &str, message: impl Into<String>) -> Self {
        EngineError::InvalidConfig {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
