//! Settlement endpoint.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{internal_error, not_found, ApiError};
use crate::settlement::{self, SettlementError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub(crate) struct SettleRequest {
    order_id: String,
    #[serde(default)]
    payment_reference: Option<String>,
}

pub async fn distribute_order(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SettleRequest>,
) -> Result<Json<Value>, ApiError> {
    let summary = settlement::distribute(
        state.db(),
        state.config(),
        state.gateway(),
        &body.order_id,
        body.payment_reference.as_deref(),
    )
    .await
    .map_err(|err| match err {
        SettlementError::OrderNotFound(_) => not_found(err.to_string()),
        SettlementError::Storage(_) => internal_error(err.to_string()),
    })?;

    let transfers = if summary.already_distributed {
        0
    } else {
        summary.legs.len()
    };
    let mut response = json!({
        "success": true,
        "order_id": summary.order_id,
        "already_distributed": summary.already_distributed,
        "transfers": transfers,
        "platform_retained_cents": summary.platform_retained_cents,
        "details": summary.legs,
    });
    if summary.already_distributed {
        response["message"] = Value::String("already distributed".to_string());
    }

    Ok(Json(response))
}
