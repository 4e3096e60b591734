//! Valhalla client — second best-effort fallback.
//!
//! Valhalla encodes leg shapes as polylines at 1e6 precision and reports
//! summary length in kilometers; both are normalized here.

use crate::error::RoutingError;
use crate::provider::{Profile, RouteProvider, RouteRequest, RouteResult};
use async_trait::async_trait;
use courier_core::geo::{decode_polyline_with_precision, GeoPoint};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub struct ValhallaProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ValhallaResponse {
    trip: ValhallaTrip,
}

#[derive(Debug, Deserialize)]
struct ValhallaTrip {
    summary: ValhallaSummary,
    #[serde(default)]
    legs: Vec<ValhallaLeg>,
}

#[derive(Debug, Deserialize)]
struct ValhallaSummary {
    /// Kilometers.
    length: f64,
    /// Seconds.
    time: f64,
}

#[derive(Debug, Deserialize)]
struct ValhallaLeg {
    shape: String,
}

impl ValhallaProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RoutingError> {
        Ok(Self {
            client: super::http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn costing(profile: Profile) -> &'static str {
        match profile {
            Profile::Driving => "auto",
            Profile::Cycling => "bicycle",
            Profile::Walking => "pedestrian",
        }
    }
}

#[async_trait]
impl RouteProvider for ValhallaProvider {
    fn name(&self) -> &str {
        "valhalla"
    }

    async fn compute_route(&self, request: &RouteRequest) -> Result<RouteResult, RoutingError> {
        let locations: Vec<serde_json::Value> = request
            .coordinates
            .iter()
            .map(|p| serde_json::json!({ "lat": p.lat, "lon": p.lng }))
            .collect();

        let response = self
            .client
            .post(format!("{}/route", self.base_url))
            .json(&serde_json::json!({
                "locations": locations,
                "costing": Self::costing(request.profile),
            }))
            .send()
            .await
            .map_err(RoutingError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RoutingError::from_status(status.as_u16(), body));
        }

        let parsed: ValhallaResponse = response
            .json()
            .await
            .map_err(|err| RoutingError::Upstream(format!("undecodable Valhalla body: {err}")))?;

        let mut geometry: Vec<GeoPoint> = Vec::new();
        for leg in &parsed.trip.legs {
            let points = decode_polyline_with_precision(&leg.shape, 1e6)
                .map_err(|err| RoutingError::Upstream(format!("bad Valhalla shape: {err}")))?;
            geometry.extend(points);
        }
        if geometry.is_empty() {
            return Err(RoutingError::NoGeometry);
        }

        Ok(RouteResult {
            provider: self.name().to_string(),
            distance_meters: parsed.trip.summary.length * 1000.0,
            duration_seconds: parsed.trip.summary.time,
            geometry,
        })
    }
}
