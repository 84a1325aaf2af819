//! Processing features
//!
//! A processing feature decides how a row becomes a gateway call. Both
//! features share the whole engine (scheduler, claiming, dispatch,
//! classification, finalization) and are selected at runtime through
//! [`create_feature`].
//!
//! ```text
//! FeatureKind::FundsTransfer          -> FundsTransferFeature  -> submit transaction
//! FeatureKind::FundsTransferReversal  -> ReversalFeature       -> reverse by reference
//! ```

use clap::ValueEnum;
use serde_json::json;
use std::fmt;
use std::sync::Arc;

use crate::gateway::{GatewayError, GatewayResponse, TransactionGateway, TransactionRequest};
use crate::types::Row;

pub mod reversal;
pub mod transfer;

pub use reversal::{ReversalFeature, REVERSAL_REFERENCE_FIELD};
pub use transfer::FundsTransferFeature;

/// Available processing features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum FeatureKind {
    FundsTransfer,
    FundsTransferReversal,
}

impl FeatureKind {
    /// Every feature, in scheduling order
    pub const ALL: [FeatureKind; 2] = [FeatureKind::FundsTransfer, FeatureKind::FundsTransferReversal];

    /// Application name and enable-flag key of the feature
    pub fn key(self) -> &'static str {
        match self {
            FeatureKind::FundsTransfer => "FUNDS_TRANSFER",
            FeatureKind::FundsTransferReversal => "FUNDS_TRANSFER_REVERSAL",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A gateway call prepared from one row
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    /// Post a new transaction
    Submit {
        request: TransactionRequest,
        correlation_id: String,
    },
    /// Reverse a previously posted transaction
    Reverse { reference: String },
}

impl GatewayCall {
    /// Serialized form of the call for audit logging
    ///
    /// Serialization failure yields a placeholder instead of an error.
    pub fn audit_payload(&self) -> String {
        match self {
            GatewayCall::Submit { request, .. } => serde_json::to_string(request)
                .unwrap_or_else(|e| format!("<unserializable request: {}>", e)),
            GatewayCall::Reverse { reference } => json!({ "reverse": reference }).to_string(),
        }
    }

    /// Perform the call under the given tenant
    pub async fn execute(
        &self,
        gateway: &dyn TransactionGateway,
        company_id: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        match self {
            GatewayCall::Submit {
                request,
                correlation_id,
            } => {
                gateway
                    .submit_transaction(request, correlation_id, company_id)
                    .await
            }
            GatewayCall::Reverse { reference } => {
                gateway.reverse_transaction(reference, company_id).await
            }
        }
    }
}

/// Processing feature trait
///
/// Implementations turn a claimed row into a [`GatewayCall`]. They are pure:
/// no I/O happens while preparing a call.
pub trait ProcessingFeature: Send + Sync + fmt::Debug {
    /// Which feature this is
    fn kind(&self) -> FeatureKind;

    /// Prepare the gateway call for a row
    ///
    /// # Returns
    ///
    /// * `Ok(GatewayCall)` - the call to perform
    /// * `Err(String)` - the row cannot be processed; the message becomes the
    ///   row's failure reason and no gateway call is made
    fn prepare(&self, row: &Row) -> Result<GatewayCall, String>;
}

/// Correlation id sent with a row's gateway call: `"{batch_id}-{line_number}"`
pub fn correlation_id(row: &Row) -> String {
    format!("{}-{}", row.batch_id, row.line_number)
}

/// Create the processing feature for a kind
///
/// # Arguments
///
/// * `kind` - Which feature to instantiate
///
/// # Returns
///
/// A shared trait object implementing [`ProcessingFeature`]
pub fn create_feature(kind: FeatureKind) -> Arc<dyn ProcessingFeature> {
    match kind {
        FeatureKind::FundsTransfer => Arc::new(FundsTransferFeature),
        FeatureKind::FundsTransferReversal => Arc::new(ReversalFeature),
    }
}
