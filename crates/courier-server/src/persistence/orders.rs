//! Order persistence operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use courier_core::geo::GeoPoint;
use courier_core::models::Order;
use sqlx::SqlitePool;

pub async fn insert_order(pool: &SqlitePool, order: &Order) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            order_id, chef_id, subtotal_cents, delivery_fee_cents, service_fee_cents,
            total_cents, payment_intent_id, dropoff_lat, dropoff_lng, batch_id, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&order.order_id)
    .bind(&order.chef_id)
    .bind(order.subtotal_cents)
    .bind(order.delivery_fee_cents)
    .bind(order.service_fee_cents)
    .bind(order.total_cents)
    .bind(&order.payment_intent_id)
    .bind(order.dropoff.map(|p| p.lat))
    .bind(order.dropoff.map(|p| p.lng))
    .bind(&order.batch_id)
    .bind(order.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_order(pool: &SqlitePool, order_id: &str) -> Result<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "{SELECT_COLUMNS} FROM orders WHERE order_id = ?1"
    ))
    .bind(order_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Order::from))
}

/// Orders with a drop-off point that have not been placed into a batch yet.
pub async fn load_unbatched(pool: &SqlitePool) -> Result<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "{SELECT_COLUMNS} FROM orders
         WHERE batch_id IS NULL AND dropoff_lat IS NOT NULL AND dropoff_lng IS NOT NULL
         ORDER BY created_at"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Order::from).collect())
}

pub async fn mark_batched(pool: &SqlitePool, order_ids: &[String], batch_id: &str) -> Result<()> {
    let mut tx = pool.begin().await?;
    for order_id in order_ids {
        sqlx::query("UPDATE orders SET batch_id = ?2 WHERE order_id = ?1")
            .bind(order_id)
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

const SELECT_COLUMNS: &str = "SELECT order_id, chef_id, subtotal_cents, delivery_fee_cents, \
     service_fee_cents, total_cents, payment_intent_id, dropoff_lat, dropoff_lng, batch_id, \
     created_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    order_id: String,
    chef_id: String,
    subtotal_cents: i64,
    delivery_fee_cents: i64,
    service_fee_cents: i64,
    total_cents: i64,
    payment_intent_id: Option<String>,
    dropoff_lat: Option<f64>,
    dropoff_lng: Option<f64>,
    batch_id: Option<String>,
    created_at: String,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        let dropoff = match (row.dropoff_lat, row.dropoff_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        };
        Order {
            order_id: row.order_id,
            chef_id: row.chef_id,
            subtotal_cents: row.subtotal_cents,
            delivery_fee_cents: row.delivery_fee_cents,
            service_fee_cents: row.service_fee_cents,
            total_cents: row.total_cents,
            payment_intent_id: row.payment_intent_id,
            dropoff,
            batch_id: row.batch_id,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }
    }
}
