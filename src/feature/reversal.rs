//! Reversal feature: every row names a posted transaction to reverse

use super::{FeatureKind, GatewayCall, ProcessingFeature};
use crate::gateway::request::field_text;
use crate::types::Row;

/// Row field holding the gateway reference of the transaction to reverse
pub const REVERSAL_REFERENCE_FIELD: &str = "T24.REFERENCE";

/// Reverses the transaction named by [`REVERSAL_REFERENCE_FIELD`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ReversalFeature;

impl ProcessingFeature for ReversalFeature {
    fn kind(&self) -> FeatureKind {
        FeatureKind::FundsTransferReversal
    }

    fn prepare(&self, row: &Row) -> Result<GatewayCall, String> {
        let reference = row
            .data
            .get(REVERSAL_REFERENCE_FIELD)
            .and_then(field_text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| format!("Missing or empty {}", REVERSAL_REFERENCE_FIELD))?;

        Ok(GatewayCall::Reverse { reference })
    }
}
