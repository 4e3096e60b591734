//! Dispatch API integration tests against a live server.
//!
//! Run with: cargo test --test dispatch_live_test -- --ignored
//!
//! Note: Requires a running courier server at http://localhost:3000
//! or set COURIER_TEST_URL environment variable.

use reqwest::Client;
use serde_json::json;

fn base_url() -> String {
    std::env::var("COURIER_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

#[tokio::test]
#[ignore] // Run only when server is running
async fn register_fleet_and_assign() {
    let client = Client::new();
    let base = base_url();

    let resp = client
        .post(format!("{}/v1/chefs", base))
        .json(&json!({
            "chef_id": "LIVE-CHEF-001",
            "name": "Live Test Kitchen",
            "lat": 37.7749,
            "lng": -122.4194,
        }))
        .send()
        .await
        .expect("Failed to register chef");
    assert!(resp.status().is_success());

    client
        .post(format!("{}/v1/drivers", base))
        .json(&json!({
            "driver_id": "LIVE-DRV-001",
            "name": "Live Test Driver",
            "lat": 37.7760,
            "lng": -122.4180,
            "available": true,
        }))
        .send()
        .await
        .expect("Failed to register driver");

    let resp = client
        .post(format!("{}/v1/orders", base))
        .json(&json!({
            "chef_id": "LIVE-CHEF-001",
            "subtotal_cents": 2000,
            "delivery_fee_cents": 500,
            "service_fee_cents": 500,
            "dropoff_lat": 37.7840,
            "dropoff_lng": -122.4100,
        }))
        .send()
        .await
        .expect("Failed to create order");
    let order: serde_json::Value = resp.json().await.unwrap();
    let delivery_id = order["delivery_id"].as_str().unwrap();

    let resp = client
        .post(format!("{}/v1/deliveries/assign", base))
        .json(&json!({ "delivery_id": delivery_id }))
        .send()
        .await
        .expect("Failed to assign");
    assert!(resp.status().is_success());
    let assignment: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(assignment["assigned"], true);
    assert!(assignment["driver_id"].is_string());
}

#[tokio::test]
#[ignore]
async fn delivery_status_progression() {
    let client = Client::new();
    let base = base_url();

    client
        .post(format!("{}/v1/chefs", base))
        .json(&json!({
            "chef_id": "LIVE-CHEF-002",
            "name": "Live Test Kitchen 2",
            "lat": 37.7749,
            "lng": -122.4194,
        }))
        .send()
        .await
        .expect("Failed to register chef");

    let resp = client
        .post(format!("{}/v1/orders", base))
        .json(&json!({
            "chef_id": "LIVE-CHEF-002",
            "subtotal_cents": 1500,
            "delivery_fee_cents": 400,
            "service_fee_cents": 300,
        }))
        .send()
        .await
        .expect("Failed to create order");
    let order: serde_json::Value = resp.json().await.unwrap();
    let delivery_id = order["delivery_id"].as_str().unwrap();

    for status in ["picked_up", "on_route", "delivered"] {
        let resp = client
            .post(format!("{}/v1/deliveries/{}/status", base, delivery_id))
            .json(&json!({ "status": status }))
            .send()
            .await
            .expect("Failed to update status");
        assert!(resp.status().is_success(), "status {} rejected", status);
    }

    // Terminal state: a further update must be rejected.
    let resp = client
        .post(format!("{}/v1/deliveries/{}/status", base, delivery_id))
        .json(&json!({ "status": "picked_up" }))
        .send()
        .await
        .expect("Failed to send update");
    assert_eq!(resp.status().as_u16(), 400);
}
