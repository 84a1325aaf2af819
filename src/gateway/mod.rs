//! Downstream ledger gateway
//!
//! The gateway is consumed, not owned: the engine submits transactions (or
//! reversals) and reads back an envelope. Everything about the envelope the
//! engine relies on lives in [`envelope`] and [`classifier`]; the rest is
//! opaque.
//!
//! # Components
//!
//! - `request` - Fixed field table mapping a row to the submit request
//! - `envelope` - Response envelope shape
//! - `classifier` - Envelope/transport outcome to Success, Duplicate or Failure
//! - `http` - `reqwest` implementation of [`TransactionGateway`]

pub mod classifier;
pub mod envelope;
pub mod http;
pub mod request;

pub use classifier::{classify, Classification};
pub use envelope::ProcessingEnvelope;
pub use http::{HttpGateway, HttpGatewayConfig};
pub use request::TransactionRequest;

use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

/// Raw gateway answer: status code and body text
///
/// Error statuses are responses too; only the absence of any response is a
/// [`GatewayError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: Option<String>,
}

impl GatewayResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        GatewayResponse {
            status,
            body: Some(body.into()),
        }
    }

    pub fn empty(status: u16) -> Self {
        GatewayResponse { status, body: None }
    }
}

/// Failures where no gateway response is available
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Connection refused, timeout, TLS failure, etc.
    #[error("{message}")]
    Transport { message: String },

    /// The HTTP client could not be built
    #[error("Gateway client configuration error: {message}")]
    Client { message: String },
}

impl GatewayError {
    pub fn transport(message: impl Into<String>) -> Self {
        GatewayError::Transport {
            message: message.into(),
        }
    }
}

/// Synchronous request/response calls to the external ledger
#[async_trait]
pub trait TransactionGateway: Send + Sync + Debug {
    /// Submit a transaction, tagged with a correlation id and the tenant
    async fn submit_transaction(
        &self,
        request: &TransactionRequest,
        correlation_id: &str,
        company_id: &str,
    ) -> Result<GatewayResponse, GatewayError>;

    /// Reverse a previously posted transaction by its external reference
    async fn reverse_transaction(
        &self,
        reference: &str,
        company_id: &str,
    ) -> Result<GatewayResponse, GatewayError>;
}
