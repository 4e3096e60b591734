//! REST route table.

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::api::{batches, dispatch, fleet, routing, settlement, tracking};
use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        // Fleet and order intake
        .route("/v1/chefs", post(fleet::register_chef))
        .route("/v1/drivers", post(fleet::register_driver))
        .route("/v1/drivers", get(fleet::list_drivers))
        .route("/v1/drivers/:driver_id/location", post(fleet::update_driver_location))
        .route("/v1/orders", post(fleet::create_order))
        .route("/v1/deliveries", get(fleet::list_deliveries))
        .route("/v1/deliveries/:delivery_id", get(fleet::get_delivery))
        .route("/v1/deliveries/:delivery_id/status", post(fleet::update_delivery_status))
        // Dispatch
        .route("/v1/deliveries/assign", post(dispatch::assign_delivery))
        // Routing
        .route("/v1/routes", post(routing::compute_route))
        // Settlement
        .route("/v1/settlements", post(settlement::distribute_order))
        // Batch planning
        .route("/v1/batches/plan", post(batches::plan_batches))
        // Live tracking sessions
        .route("/v1/tracking/:delivery_id/start", post(tracking::start_session))
        .route("/v1/tracking/:delivery_id/location", post(tracking::push_location))
        .route("/v1/tracking/:delivery_id", get(tracking::get_session))
        .route("/v1/tracking/:delivery_id", delete(tracking::stop_session))
}
