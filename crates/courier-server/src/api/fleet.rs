//! Fleet and order intake endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{bad_request, internal_error, not_found, ApiError};
use crate::persistence::{chefs, deliveries, drivers, orders};
use crate::state::AppState;
use courier_core::geo::GeoPoint;
use courier_core::models::{Chef, Delivery, DeliveryStatus, Driver, Order};

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterChefRequest {
    chef_id: Option<String>,
    name: String,
    lat: f64,
    lng: f64,
    #[serde(default)]
    payout_account_id: Option<String>,
}

pub async fn register_chef(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterChefRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let pickup = GeoPoint::new(body.lat, body.lng);
    if !pickup.is_valid() {
        return Err(bad_request("pickup coordinates out of range"));
    }

    let chef = Chef {
        chef_id: body.chef_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: body.name,
        pickup,
        payout_account_id: body.payout_account_id,
    };
    chefs::upsert_chef(state.db().pool(), &chef)
        .await
        .map_err(|e| internal_error(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(json!({ "chef_id": chef.chef_id }))))
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterDriverRequest {
    driver_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lng: Option<f64>,
    #[serde(default = "default_true")]
    available: bool,
    #[serde(default)]
    payout_account_id: Option<String>,
}

fn default_true() -> bool {
    true
}

pub async fn register_driver(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterDriverRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let location = match (body.lat, body.lng) {
        (Some(lat), Some(lng)) => {
            let point = GeoPoint::new(lat, lng);
            if !point.is_valid() {
                return Err(bad_request("driver coordinates out of range"));
            }
            Some(point)
        }
        (None, None) => None,
        _ => return Err(bad_request("lat and lng must be provided together")),
    };

    let driver = Driver {
        driver_id: body.driver_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: body.name,
        location,
        available: body.available,
        payout_account_id: body.payout_account_id,
        last_update: Utc::now(),
    };
    drivers::upsert_driver(state.db().pool(), &driver)
        .await
        .map_err(|e| internal_error(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "driver_id": driver.driver_id })),
    ))
}

pub async fn list_drivers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let all = drivers::load_all_drivers(state.db().pool())
        .await
        .map_err(|e| internal_error(e.to_string()))?;
    Ok(Json(json!({ "drivers": all })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocationUpdateRequest {
    lat: f64,
    lng: f64,
    #[serde(default)]
    available: Option<bool>,
}

pub async fn update_driver_location(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
    Json(body): Json<LocationUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let location = GeoPoint::new(body.lat, body.lng);
    if !location.is_valid() {
        return Err(bad_request("coordinates out of range"));
    }

    let updated = drivers::update_location(state.db().pool(), &driver_id, location, body.available)
        .await
        .map_err(|e| internal_error(e.to_string()))?;
    if !updated {
        return Err(not_found(format!("driver not found: {driver_id}")));
    }

    Ok(Json(json!({ "driver_id": driver_id, "updated": true })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateOrderRequest {
    order_id: Option<String>,
    chef_id: String,
    subtotal_cents: i64,
    delivery_fee_cents: i64,
    service_fee_cents: i64,
    #[serde(default)]
    payment_intent_id: Option<String>,
    #[serde(default)]
    dropoff_lat: Option<f64>,
    #[serde(default)]
    dropoff_lng: Option<f64>,
}

/// Create an order and its delivery in one step. The delivery's pickup comes
/// from the chef's registered location.
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if body.subtotal_cents < 0 || body.delivery_fee_cents < 0 || body.service_fee_cents < 0 {
        return Err(bad_request("money fields must be non-negative"));
    }

    let chef = chefs::load_chef(state.db().pool(), &body.chef_id)
        .await
        .map_err(|e| internal_error(e.to_string()))?
        .ok_or_else(|| bad_request(format!("unknown chef: {}", body.chef_id)))?;

    let dropoff = match (body.dropoff_lat, body.dropoff_lng) {
        (Some(lat), Some(lng)) => {
            let point = GeoPoint::new(lat, lng);
            if !point.is_valid() {
                return Err(bad_request("dropoff coordinates out of range"));
            }
            Some(point)
        }
        (None, None) => None,
        _ => return Err(bad_request("dropoff_lat and dropoff_lng must be provided together")),
    };

    let now = Utc::now();
    let order = Order {
        order_id: body.order_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        chef_id: chef.chef_id.clone(),
        subtotal_cents: body.subtotal_cents,
        delivery_fee_cents: body.delivery_fee_cents,
        service_fee_cents: body.service_fee_cents,
        total_cents: body.subtotal_cents + body.delivery_fee_cents + body.service_fee_cents,
        payment_intent_id: body.payment_intent_id,
        dropoff,
        batch_id: None,
        created_at: now,
    };
    orders::insert_order(state.db().pool(), &order)
        .await
        .map_err(|e| internal_error(e.to_string()))?;

    let delivery = Delivery {
        delivery_id: Uuid::new_v4().to_string(),
        order_id: order.order_id.clone(),
        driver_id: None,
        status: DeliveryStatus::Pending,
        pickup: Some(chef.pickup),
        dropoff,
        created_at: now,
        updated_at: now,
    };
    deliveries::insert_delivery(state.db().pool(), &delivery)
        .await
        .map_err(|e| internal_error(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "order_id": order.order_id,
            "delivery_id": delivery.delivery_id,
            "total_cents": order.total_cents,
        })),
    ))
}

pub async fn list_deliveries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let all = deliveries::load_all_deliveries(state.db().pool())
        .await
        .map_err(|e| internal_error(e.to_string()))?;
    Ok(Json(json!({ "deliveries": all })))
}

pub async fn get_delivery(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let delivery = deliveries::load_delivery(state.db().pool(), &delivery_id)
        .await
        .map_err(|e| internal_error(e.to_string()))?
        .ok_or_else(|| not_found(format!("delivery not found: {delivery_id}")))?;
    Ok(Json(json!({ "delivery": delivery })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusUpdateRequest {
    status: String,
}

pub async fn update_delivery_status(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<String>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let status = DeliveryStatus::parse(&body.status)
        .ok_or_else(|| bad_request(format!("unknown status: {}", body.status)))?;

    let current = deliveries::load_delivery(state.db().pool(), &delivery_id)
        .await
        .map_err(|e| internal_error(e.to_string()))?
        .ok_or_else(|| not_found(format!("delivery not found: {delivery_id}")))?;
    if current.status.is_terminal() {
        return Err(bad_request(format!(
            "delivery is {} and accepts no further updates",
            current.status.as_str()
        )));
    }

    deliveries::update_status(state.db().pool(), &delivery_id, status)
        .await
        .map_err(|e| internal_error(e.to_string()))?;

    // A finished delivery frees its driver.
    if status.is_terminal() {
        if let Some(driver_id) = &current.driver_id {
            drivers::set_availability(state.db().pool(), driver_id, true)
                .await
                .map_err(|e| internal_error(e.to_string()))?;
        }
    }

    Ok(Json(json!({
        "delivery_id": delivery_id,
        "status": status.as_str(),
    })))
}
