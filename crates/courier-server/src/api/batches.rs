//! Batch planning endpoint.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::api::{internal_error, ApiError};
use crate::persistence::{chefs, orders};
use crate::state::AppState;
use courier_core::batch::{plan_batches as plan, BatchOrder};
use courier_core::geo::GeoPoint;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PlanRequest {
    /// When true the plans are only computed, and no order is marked batched.
    #[serde(default)]
    dry_run: bool,
}

/// Plan batches over all pending unbatched orders. Orders whose chef is
/// unknown are left in the pool for a later run.
pub async fn plan_batches(
    State(state): State<Arc<AppState>>,
    body: Option<Json<PlanRequest>>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body.unwrap_or_default();
    let pending = orders::load_unbatched(state.db().pool())
        .await
        .map_err(|e| internal_error(e.to_string()))?;

    let mut pickups: HashMap<String, GeoPoint> = HashMap::new();
    let mut pool = Vec::with_capacity(pending.len());
    for order in pending {
        let Some(dropoff) = order.dropoff else { continue };
        let pickup = match pickups.get(&order.chef_id) {
            Some(point) => *point,
            None => {
                let Some(chef) = chefs::load_chef(state.db().pool(), &order.chef_id)
                    .await
                    .map_err(|e| internal_error(e.to_string()))?
                else {
                    warn!(order_id = %order.order_id, chef_id = %order.chef_id, "Skipping order with unknown chef");
                    continue;
                };
                pickups.insert(order.chef_id.clone(), chef.pickup);
                chef.pickup
            }
        };
        pool.push(BatchOrder {
            order_id: order.order_id,
            chef_id: order.chef_id,
            pickup,
            dropoff,
            total_cents: order.total_cents,
        });
    }

    let plans = plan(pool, &state.config().batch_config());

    let mut batches = Vec::with_capacity(plans.len());
    for plan in plans {
        let batch_id = Uuid::new_v4().to_string();
        if !request.dry_run {
            orders::mark_batched(state.db().pool(), &plan.order_ids(), &batch_id)
                .await
                .map_err(|e| internal_error(e.to_string()))?;
        }
        batches.push(json!({
            "batch_id": batch_id,
            "chef_id": plan.chef_id,
            "pickup": plan.pickup,
            "stops": plan.stops,
            "total_distance_km": plan.total_distance_km,
            "estimated_minutes": plan.estimated_minutes,
            "economics": plan.economics,
        }));
    }

    Ok(Json(json!({
        "dry_run": request.dry_run,
        "batches": batches,
    })))
}
