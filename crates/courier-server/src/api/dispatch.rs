//! Assignment endpoint.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{bad_request, internal_error, not_found, ApiError};
use crate::dispatch::{self, AssignmentOutcome, DispatchError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub(crate) struct AssignRequest {
    delivery_id: String,
}

pub async fn assign_delivery(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AssignRequest>,
) -> Result<Json<Value>, ApiError> {
    let outcome = dispatch::assign_delivery(state.db(), state.config(), &body.delivery_id)
        .await
        .map_err(|err| match err {
            DispatchError::DeliveryNotFound(_) => not_found(err.to_string()),
            DispatchError::AlreadyAssigned(_) | DispatchError::MissingPickup(_) => {
                bad_request(err.to_string())
            }
            DispatchError::ClaimConflict(_) | DispatchError::Storage(_) => {
                internal_error(err.to_string())
            }
        })?;

    match outcome {
        AssignmentOutcome::Assigned {
            driver_id,
            score,
            distance_km,
        } => Ok(Json(json!({
            "delivery_id": body.delivery_id,
            "assigned": true,
            "driver_id": driver_id,
            "score": score,
            "distance_km": distance_km,
        }))),
        AssignmentOutcome::NoDriversAvailable => Ok(Json(json!({
            "delivery_id": body.delivery_id,
            "assigned": false,
            "driver_id": Value::Null,
            "reason": "no_drivers_available",
        }))),
    }
}
