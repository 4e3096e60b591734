//! Route computation endpoint backed by the provider chain.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{bad_request, ApiError};
use crate::state::AppState;
use courier_core::geo::GeoPoint;
use courier_routing::{Profile, RouteRequest, RoutingError};

#[derive(Debug, Deserialize)]
pub(crate) struct ComputeRouteRequest {
    coordinates: Vec<GeoPoint>,
    #[serde(default)]
    profile: Profile,
    /// Pin a specific provider; disables fallback.
    #[serde(default)]
    provider: Option<String>,
}

pub async fn compute_route(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ComputeRouteRequest>,
) -> Result<Json<Value>, ApiError> {
    let request = RouteRequest::new(body.coordinates, body.profile);
    let result = state
        .routes()
        .compute(&request, body.provider.as_deref())
        .await
        .map_err(|err| match err {
            RoutingError::BadRequest(_) | RoutingError::UnknownProvider(_) => {
                bad_request(err.to_string())
            }
            _ => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": err.to_string() })),
            ),
        })?;

    Ok(Json(json!({
        "provider": result.provider,
        "distance_meters": result.distance_meters,
        "duration_seconds": result.duration_seconds,
        "geometry": result.geometry,
    })))
}
