//! Typed routing failures and the fallback classifier.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    /// Quota exhausted or credentials rejected (HTTP 401/403/429).
    #[error("provider quota or credentials rejected (status {status})")]
    QuotaExceeded { status: u16 },

    /// The provider did not answer within the request timeout.
    #[error("provider request timed out")]
    Timeout,

    /// The provider rejected the request shape (other 4xx). Not retried
    /// against a fallback: the next provider would reject it the same way.
    #[error("provider rejected request: {0}")]
    BadRequest(String),

    /// Provider-side failure (5xx, transport, undecodable body).
    #[error("provider upstream failure: {0}")]
    Upstream(String),

    /// The provider answered but returned no usable route geometry.
    #[error("provider returned no route geometry")]
    NoGeometry,

    #[error("no routing providers configured")]
    NoProviders,

    #[error("unknown routing provider '{0}'")]
    UnknownProvider(String),
}

impl RoutingError {
    /// Whether the next provider in the chain should be attempted.
    /// A timed-out provider is treated identically to a quota failure.
    pub fn is_retryable_with_fallback(&self) -> bool {
        matches!(
            self,
            RoutingError::QuotaExceeded { .. } | RoutingError::Timeout
        )
    }

    /// Map a transport-level reqwest failure.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RoutingError::Timeout
        } else {
            RoutingError::Upstream(err.to_string())
        }
    }

    /// Map a non-success HTTP status plus response body.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 | 429 => RoutingError::QuotaExceeded { status },
            400..=499 => RoutingError::BadRequest(body),
            _ => RoutingError::Upstream(format!("status {status}: {body}")),
        }
    }
}
