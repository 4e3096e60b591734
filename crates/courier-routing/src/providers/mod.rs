//! HTTP-backed provider implementations.

pub mod ors;
pub mod osrm;
pub mod valhalla;

use reqwest::Client;
use std::time::Duration;

/// Build a reqwest client with the bounded per-request timeout every
/// provider call must carry.
pub(crate) fn http_client(timeout: Duration) -> Result<Client, crate::RoutingError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| crate::RoutingError::Upstream(format!("failed to build client: {err}")))
}
