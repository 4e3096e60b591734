//! The route-provider capability interface and its wire-neutral types.

use crate::error::RoutingError;
use async_trait::async_trait;
use courier_core::geo::GeoPoint;
use serde::{Deserialize, Serialize};

/// Travel profile, translated by each provider into its native vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    #[default]
    Driving,
    Cycling,
    Walking,
}

/// An ordered multi-stop routing request. Stateless, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub coordinates: Vec<GeoPoint>,
    #[serde(default)]
    pub profile: Profile,
}

impl RouteRequest {
    pub fn new(coordinates: Vec<GeoPoint>, profile: Profile) -> Self {
        Self {
            coordinates,
            profile,
        }
    }

    pub fn validate(&self) -> Result<(), RoutingError> {
        if self.coordinates.len() < 2 {
            return Err(RoutingError::BadRequest(
                "at least two coordinates are required".to_string(),
            ));
        }
        if let Some(bad) = self.coordinates.iter().find(|p| !p.is_valid()) {
            return Err(RoutingError::BadRequest(format!(
                "coordinate out of range: ({}, {})",
                bad.lat, bad.lng
            )));
        }
        Ok(())
    }
}

/// Common result shape every provider translates its native response into.
/// Geometry is always [lat, lng] order regardless of the provider's wire
/// format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResult {
    pub provider: String,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub geometry: Vec<GeoPoint>,
}

/// One routing backend. Implementations own translating their native route
/// representation (encoded polyline, or GeoJSON lng/lat pairs) into
/// [`RouteResult`].
#[async_trait]
pub trait RouteProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn compute_route(&self, request: &RouteRequest) -> Result<RouteResult, RoutingError>;
}
