//! CLI tool to seed a running courier server with demo data.
//!
//! Registers one chef, a handful of drivers scattered around the chef, and a
//! few orders ready for assignment and batching.

use clap::Parser;
use serde_json::json;

/// Seed the courier server with demo chefs, drivers, and orders
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Courier server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Center latitude for the demo fleet (default: San Francisco)
    #[arg(long, default_value_t = 37.7749)]
    lat: f64,

    /// Center longitude for the demo fleet
    #[arg(long, default_value_t = -122.4194)]
    lng: f64,

    /// Number of drivers to register
    #[arg(long, default_value_t = 4)]
    drivers: u32,

    /// Number of orders to create
    #[arg(long, default_value_t = 3)]
    orders: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let client = reqwest::Client::new();

    println!("Seeding courier server at {}...", args.url);

    let res = client
        .post(format!("{}/v1/chefs", args.url))
        .json(&json!({
            "chef_id": "demo-chef",
            "name": "Demo Kitchen",
            "lat": args.lat,
            "lng": args.lng,
            "payout_account_id": "acct_demo_chef",
        }))
        .send()
        .await?
        .error_for_status()?;
    println!("Registered chef: {}", res.json::<serde_json::Value>().await?["chef_id"]);

    for i in 0..args.drivers {
        // Spread drivers on a rough ring ~1 km out.
        let angle = f64::from(i) / f64::from(args.drivers) * std::f64::consts::TAU;
        let lat = args.lat + 0.009 * angle.cos();
        let lng = args.lng + 0.009 * angle.sin();
        client
            .post(format!("{}/v1/drivers", args.url))
            .json(&json!({
                "driver_id": format!("demo-driver-{}", i + 1),
                "name": format!("Demo Driver {}", i + 1),
                "lat": lat,
                "lng": lng,
                "available": true,
                "payout_account_id": format!("acct_demo_driver_{}", i + 1),
            }))
            .send()
            .await?
            .error_for_status()?;
        println!("Registered driver demo-driver-{}", i + 1);
    }

    for i in 0..args.orders {
        let res = client
            .post(format!("{}/v1/orders", args.url))
            .json(&json!({
                "chef_id": "demo-chef",
                "subtotal_cents": 1800 + i64::from(i) * 250,
                "delivery_fee_cents": 500,
                "service_fee_cents": 400,
                "payment_intent_id": format!("pi_demo_{}", i + 1),
                "dropoff_lat": args.lat + 0.004 + 0.002 * f64::from(i),
                "dropoff_lng": args.lng - 0.006,
            }))
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = res.json().await?;
        println!(
            "Created order {} (delivery {})",
            body["order_id"], body["delivery_id"]
        );
    }

    println!("Done.");
    Ok(())
}
