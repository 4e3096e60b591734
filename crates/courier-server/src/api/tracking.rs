//! Live tracking session endpoints.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{bad_request, internal_error, not_found, ApiError};
use crate::persistence::deliveries;
use crate::state::AppState;
use crate::tracking::TrackingError;
use courier_core::geo::GeoPoint;

const TOKEN_HEADER: &str = "x-tracking-token";

fn session_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| bad_request("missing X-Tracking-Token header"))
}

pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<String>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    // Sessions only make sense for deliveries we know about.
    deliveries::load_delivery(state.db().pool(), &delivery_id)
        .await
        .map_err(|e| internal_error(e.to_string()))?
        .ok_or_else(|| not_found(format!("delivery not found: {delivery_id}")))?;

    let session = state
        .tracking()
        .start(&delivery_id)
        .map_err(|_| bad_request("delivery is already being tracked"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "delivery_id": session.delivery_id,
            "token": session.token,
            "started_at": session.started_at,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocationPush {
    lat: f64,
    lng: f64,
}

pub async fn push_location(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<LocationPush>,
) -> Result<Json<Value>, ApiError> {
    let token = session_token(&headers)?;
    let position = GeoPoint::new(body.lat, body.lng);
    if !position.is_valid() {
        return Err(bad_request("coordinates out of range"));
    }

    let session = state
        .tracking()
        .update(&delivery_id, token, position)
        .map_err(tracking_error)?;

    Ok(Json(json!({
        "delivery_id": session.delivery_id,
        "last_position": session.last_position,
        "updated_at": session.updated_at,
    })))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let session = state
        .tracking()
        .get(&delivery_id)
        .ok_or_else(|| not_found(format!("no active session for {delivery_id}")))?;
    Ok(Json(json!({
        "delivery_id": session.delivery_id,
        "last_position": session.last_position,
        "started_at": session.started_at,
        "updated_at": session.updated_at,
    })))
}

pub async fn stop_session(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = session_token(&headers)?;
    state
        .tracking()
        .stop(&delivery_id, token)
        .map_err(tracking_error)?;
    Ok(StatusCode::NO_CONTENT)
}

fn tracking_error(err: TrackingError) -> ApiError {
    match err {
        TrackingError::SessionNotFound => not_found("no active session"),
        TrackingError::BadToken => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "invalid session token" })),
        ),
        TrackingError::SessionExists => bad_request("delivery is already being tracked"),
    }
}
