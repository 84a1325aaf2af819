//! HTTP implementation of the transaction gateway
//!
//! ```text
//! POST   {base}/process               JSON request, headers uniqueIdentifier + companyId
//! DELETE {base}/reverse/{reference}   header companyId
//! ```
//!
//! Error statuses are returned as [`GatewayResponse`]s so the classifier can
//! read the business error from the body. Only failures without any response
//! (connect, timeout, body read) become [`GatewayError::Transport`].

use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use super::{GatewayError, GatewayResponse, TransactionGateway, TransactionRequest};

/// Header carrying the per-row correlation id
pub const CORRELATION_HEADER: &str = "uniqueIdentifier";

/// Header carrying the tenant (company) id
pub const COMPANY_HEADER: &str = "companyId";

/// Connection settings for [`HttpGateway`]
#[derive(Clone)]
pub struct HttpGatewayConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Client timeout bounding every call
    pub timeout: Duration,
}

impl fmt::Debug for HttpGatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpGatewayConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// `reqwest`-backed gateway client
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl HttpGateway {
    /// Build a client for the given configuration
    ///
    /// # Errors
    ///
    /// `GatewayError::Client` if the base URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| GatewayError::Client {
            message: format!("invalid base URL '{}': {}", config.base_url, e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Client {
                message: format!("base URL '{}' cannot carry a path", config.base_url),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            username: config.username,
            password: config.password,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(username) => builder.basic_auth(username, self.password.as_ref()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<GatewayResponse, GatewayError> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| GatewayError::transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::transport(format!("failed to read body: {}", e)))?;

        debug!(status, body_len = body.len(), "Gateway responded");

        Ok(GatewayResponse {
            status,
            body: (!body.is_empty()).then_some(body),
        })
    }
}

#[async_trait]
impl TransactionGateway for HttpGateway {
    async fn submit_transaction(
        &self,
        request: &TransactionRequest,
        correlation_id: &str,
        company_id: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        let builder = self
            .client
            .post(self.endpoint(&["process"]))
            .header(CORRELATION_HEADER, correlation_id)
            .header(COMPANY_HEADER, company_id)
            .json(request);
        self.send(builder).await
    }

    async fn reverse_transaction(
        &self,
        reference: &str,
        company_id: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        let builder = self
            .client
            .delete(self.endpoint(&["reverse", reference]))
            .header(COMPANY_HEADER, company_id);
        self.send(builder).await
    }
}
