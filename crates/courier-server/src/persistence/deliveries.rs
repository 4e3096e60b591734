//! Delivery persistence, including the driver claim paths.

use anyhow::Result;
use chrono::{DateTime, Utc};
use courier_core::geo::GeoPoint;
use courier_core::models::{Delivery, DeliveryStatus};
use sqlx::SqlitePool;
use tracing::warn;

pub async fn insert_delivery(pool: &SqlitePool, delivery: &Delivery) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO deliveries (
            delivery_id, order_id, driver_id, status,
            pickup_lat, pickup_lng, dropoff_lat, dropoff_lng,
            created_at, updated_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&delivery.delivery_id)
    .bind(&delivery.order_id)
    .bind(&delivery.driver_id)
    .bind(delivery.status.as_str())
    .bind(delivery.pickup.map(|p| p.lat))
    .bind(delivery.pickup.map(|p| p.lng))
    .bind(delivery.dropoff.map(|p| p.lat))
    .bind(delivery.dropoff.map(|p| p.lng))
    .bind(delivery.created_at.to_rfc3339())
    .bind(delivery.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_delivery(pool: &SqlitePool, delivery_id: &str) -> Result<Option<Delivery>> {
    let row = sqlx::query_as::<_, DeliveryRow>(&format!(
        "{SELECT_COLUMNS} FROM deliveries WHERE delivery_id = ?1"
    ))
    .bind(delivery_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Delivery::from))
}

pub async fn load_delivery_for_order(
    pool: &SqlitePool,
    order_id: &str,
) -> Result<Option<Delivery>> {
    let row = sqlx::query_as::<_, DeliveryRow>(&format!(
        "{SELECT_COLUMNS} FROM deliveries WHERE order_id = ?1 ORDER BY created_at LIMIT 1"
    ))
    .bind(order_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Delivery::from))
}

pub async fn load_all_deliveries(pool: &SqlitePool) -> Result<Vec<Delivery>> {
    let rows = sqlx::query_as::<_, DeliveryRow>(&format!(
        "{SELECT_COLUMNS} FROM deliveries ORDER BY created_at"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Delivery::from).collect())
}

/// Set a delivery's status. Returns false when the delivery is unknown.
pub async fn update_status(
    pool: &SqlitePool,
    delivery_id: &str,
    status: DeliveryStatus,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE deliveries SET status = ?2, updated_at = ?3 WHERE delivery_id = ?1",
    )
    .bind(delivery_id)
    .bind(status.as_str())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Claim `driver_id` for `delivery_id` in a single transaction.
///
/// Two conditional updates run inside one transaction: the driver flips
/// available -> busy only if still available, and the delivery takes the
/// driver only if still unassigned. If either guard misses, the whole
/// transaction rolls back and the claim reports failure. Concurrent
/// assigners racing for the same driver or delivery therefore produce
/// exactly one winner.
pub async fn claim_driver_atomic(
    pool: &SqlitePool,
    delivery_id: &str,
    driver_id: &str,
) -> Result<bool> {
    let mut tx = pool.begin().await?;
    let now = Utc::now().to_rfc3339();

    let driver_claimed = sqlx::query(
        "UPDATE drivers SET available = 0, last_update = ?2
         WHERE driver_id = ?1 AND available = 1",
    )
    .bind(driver_id)
    .bind(&now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if driver_claimed == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    let delivery_claimed = sqlx::query(
        "UPDATE deliveries SET driver_id = ?2, status = 'assigned', updated_at = ?3
         WHERE delivery_id = ?1 AND driver_id IS NULL",
    )
    .bind(delivery_id)
    .bind(driver_id)
    .bind(&now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if delivery_claimed == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    tx.commit().await?;
    Ok(true)
}

/// Degraded claim path: two independent statements with a compensating
/// availability revert when the delivery guard misses. A crash between the
/// two statements can leave the driver marked busy.
pub async fn claim_driver_sequential(
    pool: &SqlitePool,
    delivery_id: &str,
    driver_id: &str,
) -> Result<bool> {
    let now = Utc::now().to_rfc3339();

    let driver_claimed = sqlx::query(
        "UPDATE drivers SET available = 0, last_update = ?2
         WHERE driver_id = ?1 AND available = 1",
    )
    .bind(driver_id)
    .bind(&now)
    .execute(pool)
    .await?
    .rows_affected();

    if driver_claimed == 0 {
        return Ok(false);
    }

    // The driver is already flipped busy at this point, so both a missed
    // guard and an outright error on the delivery update must free them
    // again before returning.
    let delivery_claimed = match sqlx::query(
        "UPDATE deliveries SET driver_id = ?2, status = 'assigned', updated_at = ?3
         WHERE delivery_id = ?1 AND driver_id IS NULL",
    )
    .bind(delivery_id)
    .bind(driver_id)
    .bind(&now)
    .execute(pool)
    .await
    {
        Ok(result) => result.rows_affected(),
        Err(err) => {
            if let Err(revert) = super::drivers::set_availability(pool, driver_id, true).await {
                warn!(driver_id, error = %revert, "Failed to revert driver availability");
            }
            return Err(err.into());
        }
    };

    if delivery_claimed == 0 {
        super::drivers::set_availability(pool, driver_id, true).await?;
        return Ok(false);
    }

    Ok(true)
}

const SELECT_COLUMNS: &str = "SELECT delivery_id, order_id, driver_id, status, \
     pickup_lat, pickup_lng, dropoff_lat, dropoff_lng, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct DeliveryRow {
    delivery_id: String,
    order_id: String,
    driver_id: Option<String>,
    status: String,
    pickup_lat: Option<f64>,
    pickup_lng: Option<f64>,
    dropoff_lat: Option<f64>,
    dropoff_lng: Option<f64>,
    created_at: String,
    updated_at: String,
}

impl From<DeliveryRow> for Delivery {
    fn from(row: DeliveryRow) -> Self {
        let pickup = match (row.pickup_lat, row.pickup_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        };
        let dropoff = match (row.dropoff_lat, row.dropoff_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        };
        Delivery {
            delivery_id: row.delivery_id,
            order_id: row.order_id,
            driver_id: row.driver_id,
            status: DeliveryStatus::parse(&row.status).unwrap_or(DeliveryStatus::Pending),
            pickup,
            dropoff,
            created_at: parse_time(&row.created_at),
            updated_at: parse_time(&row.updated_at),
        }
    }
}

fn parse_time(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
