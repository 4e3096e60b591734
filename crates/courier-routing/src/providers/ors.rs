//! OpenRouteService client — the full-featured, quota-limited primary.

use crate::error::RoutingError;
use crate::provider::{Profile, RouteProvider, RouteRequest, RouteResult};
use async_trait::async_trait;
use courier_core::geo::decode_polyline;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub struct OrsProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct OrsResponse {
    routes: Vec<OrsRoute>,
}

#[derive(Debug, Deserialize)]
struct OrsRoute {
    summary: OrsSummary,
    /// Encoded polyline at 1e5 precision.
    geometry: String,
}

#[derive(Debug, Deserialize)]
struct OrsSummary {
    distance: f64,
    duration: f64,
}

impl OrsProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RoutingError> {
        Ok(Self {
            client: super::http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn profile_segment(profile: Profile) -> &'static str {
        match profile {
            Profile::Driving => "driving-car",
            Profile::Cycling => "cycling-regular",
            Profile::Walking => "foot-walking",
        }
    }
}

#[async_trait]
impl RouteProvider for OrsProvider {
    fn name(&self) -> &str {
        "openrouteservice"
    }

    async fn compute_route(&self, request: &RouteRequest) -> Result<RouteResult, RoutingError> {
        let url = format!(
            "{}/v2/directions/{}",
            self.base_url,
            Self::profile_segment(request.profile)
        );
        // ORS expects lng-first coordinate pairs.
        let coordinates: Vec<[f64; 2]> = request
            .coordinates
            .iter()
            .map(|p| [p.lng, p.lat])
            .collect();

        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.api_key)
            .json(&serde_json::json!({ "coordinates": coordinates }))
            .send()
            .await
            .map_err(RoutingError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RoutingError::from_status(status.as_u16(), body));
        }

        let parsed: OrsResponse = response
            .json()
            .await
            .map_err(|err| RoutingError::Upstream(format!("undecodable ORS body: {err}")))?;
        let route = parsed.routes.into_iter().next().ok_or(RoutingError::NoGeometry)?;

        let geometry = decode_polyline(&route.geometry)
            .map_err(|err| RoutingError::Upstream(format!("bad ORS polyline: {err}")))?;
        if geometry.is_empty() {
            return Err(RoutingError::NoGeometry);
        }

        Ok(RouteResult {
            provider: self.name().to_string(),
            distance_meters: route.summary.distance,
            duration_seconds: route.summary.duration,
            geometry,
        })
    }
}
