//! OSRM client — first best-effort fallback.
//!
//! OSRM returns GeoJSON geometry with coordinates in lng/lat order; the axis
//! swap to [lat, lng] happens here on ingest.

use crate::error::RoutingError;
use crate::provider::{Profile, RouteProvider, RouteRequest, RouteResult};
use async_trait::async_trait;
use courier_core::geo::GeoPoint;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub struct OsrmProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// GeoJSON LineString coordinates, lng-first.
    coordinates: Vec<[f64; 2]>,
}

impl OsrmProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RoutingError> {
        Ok(Self {
            client: super::http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn profile_segment(profile: Profile) -> &'static str {
        match profile {
            Profile::Driving => "driving",
            Profile::Cycling => "cycling",
            Profile::Walking => "walking",
        }
    }
}

#[async_trait]
impl RouteProvider for OsrmProvider {
    fn name(&self) -> &str {
        "osrm"
    }

    async fn compute_route(&self, request: &RouteRequest) -> Result<RouteResult, RoutingError> {
        let coord_segment = request
            .coordinates
            .iter()
            .map(|p| format!("{},{}", p.lng, p.lat))
            .collect::<Vec<_>>()
            .join(";");
        let url = format!(
            "{}/route/v1/{}/{}?overview=full&geometries=geojson",
            self.base_url,
            Self::profile_segment(request.profile),
            coord_segment
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(RoutingError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RoutingError::from_status(status.as_u16(), body));
        }

        let parsed: OsrmResponse = response
            .json()
            .await
            .map_err(|err| RoutingError::Upstream(format!("undecodable OSRM body: {err}")))?;
        if parsed.code != "Ok" {
            return Err(RoutingError::BadRequest(format!(
                "OSRM returned code {}",
                parsed.code
            )));
        }
        let route = parsed.routes.into_iter().next().ok_or(RoutingError::NoGeometry)?;

        let geometry: Vec<GeoPoint> = route
            .geometry
            .coordinates
            .into_iter()
            .map(|[lng, lat]| GeoPoint::new(lat, lng))
            .collect();
        if geometry.is_empty() {
            return Err(RoutingError::NoGeometry);
        }

        Ok(RouteResult {
            provider: self.name().to_string(),
            distance_meters: route.distance,
            duration_seconds: route.duration,
            geometry,
        })
    }
}
