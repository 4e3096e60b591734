//! API routes for the courier server.

pub mod batches;
pub mod dispatch;
pub mod fleet;
mod routes;
pub mod routing;
pub mod settlement;
pub mod tracking;

use axum::{http::StatusCode, Json};
use serde_json::json;

pub fn routes() -> axum::Router<std::sync::Arc<crate::state::AppState>> {
    routes::create_router()
}

pub(crate) type ApiError = (StatusCode, Json<serde_json::Value>);

pub(crate) fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message.into() })))
}

pub(crate) fn not_found(message: impl Into<String>) -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message.into() })))
}

pub(crate) fn internal_error(message: impl Into<String>) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message.into() })),
    )
}

#[cfg(test)]
mod tests;
