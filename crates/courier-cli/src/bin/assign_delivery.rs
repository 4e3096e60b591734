//! CLI tool to assign a delivery against a running courier server, and
//! optionally settle its order afterwards.

use clap::Parser;
use serde_json::json;

/// Assign a delivery to the best available driver
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Courier server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Delivery to assign
    #[arg(long)]
    delivery_id: String,

    /// Settle this order after a successful assignment
    #[arg(long)]
    settle_order: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/v1/deliveries/assign", args.url))
        .json(&json!({ "delivery_id": args.delivery_id }))
        .send()
        .await?;
    let status = res.status();
    let body: serde_json::Value = res.json().await?;
    if !status.is_success() {
        anyhow::bail!("assignment failed ({}): {}", status, body["error"]);
    }

    if body["assigned"] == true {
        println!(
            "Assigned {} to driver {} (score {:.1}, {:.2} km away)",
            args.delivery_id,
            body["driver_id"].as_str().unwrap_or("?"),
            body["score"].as_f64().unwrap_or(0.0),
            body["distance_km"].as_f64().unwrap_or(0.0),
        );
    } else {
        println!("No drivers available for {}", args.delivery_id);
        return Ok(());
    }

    if let Some(order_id) = args.settle_order {
        let res = client
            .post(format!("{}/v1/settlements", args.url))
            .json(&json!({ "order_id": order_id }))
            .send()
            .await?;
        let status = res.status();
        let body: serde_json::Value = res.json().await?;
        if !status.is_success() {
            anyhow::bail!("settlement failed ({}): {}", status, body["error"]);
        }
        println!("Settled order {}:", order_id);
        for leg in body["details"].as_array().into_iter().flatten() {
            println!(
                "  {} -> {} cents [{}]",
                leg["recipient_type"].as_str().unwrap_or("?"),
                leg["amount_cents"],
                leg["status"].as_str().unwrap_or("?"),
            );
        }
    }

    Ok(())
}
