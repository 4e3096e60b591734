//! Payment gateway client used by settlement to move funds.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway accepted the request but declined the transfer.
    #[error("transfer rejected: {0}")]
    Rejected(String),
    /// The gateway could not be reached or answered outside its contract.
    #[error("payment gateway unavailable: {0}")]
    Transport(String),
}

/// A transfer to execute against the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct TransferRequest {
    pub destination_account: String,
    pub amount_cents: i64,
    pub currency: String,
    /// Correlates the transfer with the captured payment.
    pub source_reference: Option<String>,
    pub description: String,
}

/// Executes fund transfers. Settlement only needs this one operation, so the
/// trait stays minimal and test doubles stay trivial.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Execute a transfer, returning the gateway's transfer id.
    async fn transfer(&self, request: &TransferRequest) -> Result<String, GatewayError>;
}

/// HTTP client for the payment gateway's transfer endpoint.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpPaymentGateway {
    pub fn new(base_url: &str, api_key: Option<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[derive(Deserialize)]
struct TransferResponse {
    transfer_id: String,
}

#[derive(Deserialize)]
struct GatewayErrorBody {
    #[serde(default)]
    message: String,
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn transfer(&self, request: &TransferRequest) -> Result<String, GatewayError> {
        let url = format!("{}/v1/transfers", self.base_url);
        debug!(
            destination = %request.destination_account,
            amount_cents = request.amount_cents,
            "Submitting transfer"
        );

        let mut builder = self.client.post(&url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: TransferResponse = response
                .json()
                .await
                .map_err(|e| GatewayError::Transport(e.to_string()))?;
            return Ok(body.transfer_id);
        }

        let message = response
            .json::<GatewayErrorBody>()
            .await
            .map(|b| b.message)
            .unwrap_or_default();
        if status.is_client_error() {
            Err(GatewayError::Rejected(format!("{}: {}", status, message)))
        } else {
            Err(GatewayError::Transport(format!("{}: {}", status, message)))
        }
    }
}
