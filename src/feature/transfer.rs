//! Funds transfer feature: every row is submitted as a new transaction

use super::{correlation_id, FeatureKind, GatewayCall, ProcessingFeature};
use crate::gateway::TransactionRequest;
use crate::types::Row;

/// Maps the row's field map through the request table and submits it
#[derive(Debug, Clone, Copy, Default)]
pub struct FundsTransferFeature;

impl ProcessingFeature for FundsTransferFeature {
    fn kind(&self) -> FeatureKind {
        FeatureKind::FundsTransfer
    }

    fn prepare(&self, row: &Row) -> Result<GatewayCall, String> {
        Ok(GatewayCall::Submit {
            request: TransactionRequest::from_fields(&row.data),
            correlation_id: correlation_id(row),
        })
    }
}
