use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use async_trait::async_trait;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

use crate::payments::{GatewayError, PaymentGateway, TransferRequest};
use crate::persistence::{self, deliveries};
use crate::state::AppState;
use crate::{api, config::Config};
use courier_core::geo::GeoPoint;
use courier_core::models::{Delivery, DeliveryStatus};
use courier_routing::{ProviderChain, RouteProvider, RouteRequest, RouteResult, RoutingError};

struct FakeGateway {
    calls: AtomicUsize,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn transfer(&self, _request: &TransferRequest) -> Result<String, GatewayError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("tr_{}", n))
    }
}

struct StubProvider {
    name: &'static str,
    outcome: fn() -> Result<RouteResult, RoutingError>,
}

#[async_trait]
impl RouteProvider for StubProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn compute_route(&self, _req: &RouteRequest) -> Result<RouteResult, RoutingError> {
        (self.outcome)()
    }
}

async fn setup_app_with_chain(chain: ProviderChain) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::from_env();
    config.database_path = std::env::temp_dir()
        .join(format!("courier-test-{}.db", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .to_string();
    config.atomic_claims = true;
    config.chef_service_fee_pct = 60;
    config.platform_account_id = None;

    let db = persistence::init_database(&config.database_path, config.database_max_connections)
        .await
        .expect("init db");
    let gateway = Arc::new(FakeGateway {
        calls: AtomicUsize::new(0),
    });
    let state = Arc::new(AppState::with_parts(db, config, chain, gateway));

    let app = api::routes().with_state(state.clone());
    (app, state)
}

async fn setup_app() -> (axum::Router, Arc<AppState>) {
    setup_app_with_chain(ProviderChain::new(Vec::new())).await
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse json")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn register_chef(app: &axum::Router, chef_id: &str, payout: Option<&str>) {
    let res = app
        .clone()
        .oneshot(post_json(
            "/v1/chefs",
            json!({
                "chef_id": chef_id,
                "name": "Test Chef",
                "lat": 37.7749,
                "lng": -122.4194,
                "payout_account_id": payout,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}

async fn register_driver(app: &axum::Router, driver_id: &str, lat: f64, lng: f64) {
    let res = app
        .clone()
        .oneshot(post_json(
            "/v1/drivers",
            json!({
                "driver_id": driver_id,
                "name": "Test Driver",
                "lat": lat,
                "lng": lng,
                "payout_account_id": "acct_driver",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}

/// Create an order (and its delivery) for the given chef; returns
/// (order_id, delivery_id).
async fn create_order(app: &axum::Router, chef_id: &str) -> (String, String) {
    let res = app
        .clone()
        .oneshot(post_json(
            "/v1/orders",
            json!({
                "chef_id": chef_id,
                "subtotal_cents": 2000,
                "delivery_fee_cents": 500,
                "service_fee_cents": 500,
                "payment_intent_id": "pi_test",
                "dropoff_lat": 37.7840,
                "dropoff_lng": -122.4100,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = read_json(res).await;
    assert_eq!(body["total_cents"], 3000);
    (
        body["order_id"].as_str().unwrap().to_string(),
        body["delivery_id"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn order_for_unknown_chef_is_rejected() {
    let (app, _state) = setup_app().await;

    let res = app
        .oneshot(post_json(
            "/v1/orders",
            json!({
                "chef_id": "ghost",
                "subtotal_cents": 1000,
                "delivery_fee_cents": 300,
                "service_fee_cents": 200,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn assign_unknown_delivery_is_not_found() {
    let (app, _state) = setup_app().await;

    let res = app
        .oneshot(post_json("/v1/deliveries/assign", json!({ "delivery_id": "nope" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assign_delivery_without_pickup_is_rejected_before_search() {
    let (app, state) = setup_app().await;

    // Insert a bare delivery with no pickup point; even with a driver right
    // there, the precondition must fire first.
    register_driver(&app, "drv-1", 37.7749, -122.4194).await;
    let delivery = Delivery {
        delivery_id: "del-nopickup".to_string(),
        order_id: "ord-x".to_string(),
        driver_id: None,
        status: DeliveryStatus::Pending,
        pickup: None,
        dropoff: Some(GeoPoint::new(37.78, -122.41)),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    deliveries::insert_delivery(state.db().pool(), &delivery)
        .await
        .unwrap();

    let res = app
        .oneshot(post_json(
            "/v1/deliveries/assign",
            json!({ "delivery_id": "del-nopickup" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn assign_with_no_drivers_is_a_clean_miss() {
    let (app, _state) = setup_app().await;
    register_chef(&app, "chef-1", None).await;
    let (_order_id, delivery_id) = create_order(&app, "chef-1").await;

    let res = app
        .oneshot(post_json(
            "/v1/deliveries/assign",
            json!({ "delivery_id": delivery_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["assigned"], false);
    assert!(body["driver_id"].is_null());
    assert_eq!(body["reason"], "no_drivers_available");
}

#[tokio::test]
async fn assign_picks_a_driver_and_refuses_a_second_assignment() {
    let (app, _state) = setup_app().await;
    register_chef(&app, "chef-1", None).await;
    register_driver(&app, "drv-1", 37.7760, -122.4180).await;
    let (_order_id, delivery_id) = create_order(&app, "chef-1").await;

    let res = app
        .clone()
        .oneshot(post_json(
            "/v1/deliveries/assign",
            json!({ "delivery_id": delivery_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["assigned"], true);
    assert_eq!(body["driver_id"], "drv-1");
    assert!(body["distance_km"].as_f64().unwrap() < 1.0);

    let res = app
        .oneshot(post_json(
            "/v1/deliveries/assign",
            json!({ "delivery_id": delivery_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn concurrent_assignment_has_exactly_one_winner() {
    let (app, _state) = setup_app().await;
    register_chef(&app, "chef-1", None).await;
    register_driver(&app, "drv-1", 37.7760, -122.4180).await;
    let (_order_id, delivery_id) = create_order(&app, "chef-1").await;

    let request = json!({ "delivery_id": delivery_id });
    let (first, second) = tokio::join!(
        app.clone().oneshot(post_json("/v1/deliveries/assign", request.clone())),
        app.clone().oneshot(post_json("/v1/deliveries/assign", request)),
    );

    let mut winners = 0;
    for res in [first.unwrap(), second.unwrap()] {
        match res.status() {
            StatusCode::OK => {
                let body = read_json(res).await;
                if body["assigned"] == true {
                    winners += 1;
                }
            }
            // The loser surfaces the delivery as already assigned.
            StatusCode::BAD_REQUEST => {}
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn completed_delivery_frees_the_driver() {
    let (app, _state) = setup_app().await;
    register_chef(&app, "chef-1", None).await;
    register_driver(&app, "drv-1", 37.7760, -122.4180).await;
    let (_order_id, delivery_id) = create_order(&app, "chef-1").await;

    let res = app
        .clone()
        .oneshot(post_json(
            "/v1/deliveries/assign",
            json!({ "delivery_id": delivery_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(post_json(
            &format!("/v1/deliveries/{delivery_id}/status"),
            json!({ "status": "delivered" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // The driver is available again for the next delivery.
    let (_order2, delivery2) = create_order(&app, "chef-1").await;
    let res = app
        .oneshot(post_json(
            "/v1/deliveries/assign",
            json!({ "delivery_id": delivery2 }),
        ))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["assigned"], true);
}

#[tokio::test]
async fn terminal_delivery_rejects_further_status_updates() {
    let (app, _state) = setup_app().await;
    register_chef(&app, "chef-1", None).await;
    let (_order_id, delivery_id) = create_order(&app, "chef-1").await;

    let res = app
        .clone()
        .oneshot(post_json(
            &format!("/v1/deliveries/{delivery_id}/status"),
            json!({ "status": "cancelled" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(post_json(
            &format!("/v1/deliveries/{delivery_id}/status"),
            json!({ "status": "picked_up" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn settlement_splits_exact_cents_and_is_idempotent() {
    let (app, _state) = setup_app().await;
    register_chef(&app, "chef-1", Some("acct_chef")).await;
    register_driver(&app, "drv-1", 37.7760, -122.4180).await;
    let (order_id, delivery_id) = create_order(&app, "chef-1").await;

    let res = app
        .clone()
        .oneshot(post_json(
            "/v1/deliveries/assign",
            json!({ "delivery_id": delivery_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(post_json("/v1/settlements", json!({ "order_id": order_id })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["already_distributed"], false);
    assert_eq!(body["transfers"], 3);
    assert_eq!(body["platform_retained_cents"], 200);

    let legs = body["details"].as_array().unwrap();
    assert_eq!(legs.len(), 3);
    // 2000 subtotal + 60% of the 500 service fee.
    assert_eq!(legs[0]["recipient_type"], "chef");
    assert_eq!(legs[0]["amount_cents"], 2300);
    assert_eq!(legs[0]["status"], "succeeded");
    assert_eq!(legs[1]["recipient_type"], "platform");
    assert_eq!(legs[1]["amount_cents"], 200);
    assert_eq!(legs[2]["recipient_type"], "driver");
    assert_eq!(legs[2]["amount_cents"], 500);
    assert_eq!(legs[2]["status"], "succeeded");

    // Replay: same legs, nothing re-attempted.
    let res = app
        .oneshot(post_json("/v1/settlements", json!({ "order_id": order_id })))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["already_distributed"], true);
    assert_eq!(body["transfers"], 0);
    assert_eq!(body["details"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn settlement_of_unknown_order_is_not_found() {
    let (app, _state) = setup_app().await;
    let res = app
        .oneshot(post_json("/v1/settlements", json!({ "order_id": "ghost" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn route_endpoint_uses_the_provider_chain() {
    let chain = ProviderChain::new(vec![Box::new(StubProvider {
        name: "stub",
        outcome: || {
            Ok(RouteResult {
                provider: "stub".to_string(),
                distance_meters: 2500.0,
                duration_seconds: 420.0,
                geometry: vec![GeoPoint::new(37.77, -122.42), GeoPoint::new(37.78, -122.41)],
            })
        },
    })]);
    let (app, _state) = setup_app_with_chain(chain).await;

    let res = app
        .oneshot(post_json(
            "/v1/routes",
            json!({
                "coordinates": [
                    { "lat": 37.77, "lng": -122.42 },
                    { "lat": 37.78, "lng": -122.41 }
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["provider"], "stub");
    assert_eq!(body["distance_meters"], 2500.0);
    assert_eq!(body["geometry"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn route_with_one_coordinate_is_rejected() {
    let (app, _state) = setup_app().await;
    let res = app
        .oneshot(post_json(
            "/v1/routes",
            json!({ "coordinates": [{ "lat": 37.77, "lng": -122.42 }] }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn route_failure_across_the_chain_is_a_bad_gateway() {
    let chain = ProviderChain::new(vec![Box::new(StubProvider {
        name: "stub",
        outcome: || Err(RoutingError::Timeout),
    })]);
    let (app, _state) = setup_app_with_chain(chain).await;

    let res = app
        .oneshot(post_json(
            "/v1/routes",
            json!({
                "coordinates": [
                    { "lat": 37.77, "lng": -122.42 },
                    { "lat": 37.78, "lng": -122.41 }
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn batch_planning_groups_and_consumes_orders() {
    let (app, _state) = setup_app().await;
    register_chef(&app, "chef-1", None).await;
    create_order(&app, "chef-1").await;
    create_order(&app, "chef-1").await;

    let res = app
        .clone()
        .oneshot(post_json("/v1/batches/plan", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    let batches = body["batches"].as_array().unwrap();
    // Identical drop-offs from one chef collapse into a single batch.
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0]["stops"].as_array().unwrap().len(), 2);
    let econ = &batches[0]["economics"];
    assert_eq!(
        econ["chef_share_cents"].as_i64().unwrap()
            + econ["platform_share_cents"].as_i64().unwrap()
            + econ["delivery_pool_cents"].as_i64().unwrap(),
        econ["batch_value_cents"].as_i64().unwrap()
    );

    // The orders are now batched; a second run finds nothing.
    let res = app
        .oneshot(post_json("/v1/batches/plan", json!({})))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["batches"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn batch_dry_run_leaves_orders_in_the_pool() {
    let (app, _state) = setup_app().await;
    register_chef(&app, "chef-1", None).await;
    create_order(&app, "chef-1").await;

    let res = app
        .clone()
        .oneshot(post_json("/v1/batches/plan", json!({ "dry_run": true })))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["batches"].as_array().unwrap().len(), 1);

    let res = app
        .oneshot(post_json("/v1/batches/plan", json!({})))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["batches"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn tracking_session_lifecycle_over_http() {
    let (app, _state) = setup_app().await;
    register_chef(&app, "chef-1", None).await;
    let (_order_id, delivery_id) = create_order(&app, "chef-1").await;

    let res = app
        .clone()
        .oneshot(post_json(&format!("/v1/tracking/{delivery_id}/start"), json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = read_json(res).await;
    let token = body["token"].as_str().unwrap().to_string();

    let push = Request::builder()
        .method("POST")
        .uri(format!("/v1/tracking/{delivery_id}/location"))
        .header("content-type", "application/json")
        .header("X-Tracking-Token", &token)
        .body(Body::from(json!({ "lat": 37.78, "lng": -122.41 }).to_string()))
        .unwrap();
    let res = app.clone().oneshot(push).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // A watcher sees the position but never the token.
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/v1/tracking/{delivery_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["last_position"]["lat"], 37.78);
    assert!(body.get("token").is_none());

    // Wrong token cannot stop the session.
    let bad_stop = Request::builder()
        .method("DELETE")
        .uri(format!("/v1/tracking/{delivery_id}"))
        .header("X-Tracking-Token", "bogus")
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(bad_stop).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let stop = Request::builder()
        .method("DELETE")
        .uri(format!("/v1/tracking/{delivery_id}"))
        .header("X-Tracking-Token", &token)
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(stop).await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn tracking_requires_a_known_delivery() {
    let (app, _state) = setup_app().await;
    let res = app
        .oneshot(post_json("/v1/tracking/ghost/start", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
