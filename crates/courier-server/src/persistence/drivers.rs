//! Driver persistence: registration, location, availability, reliability.

use anyhow::Result;
use chrono::{DateTime, Utc};
use courier_core::geo::{bounding_box, haversine_distance_km, GeoPoint};
use courier_core::models::Driver;
use sqlx::SqlitePool;

pub async fn upsert_driver(pool: &SqlitePool, driver: &Driver) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO drivers (driver_id, name, lat, lng, available, payout_account_id, last_update)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(driver_id) DO UPDATE SET
            name = ?2, lat = ?3, lng = ?4, available = ?5,
            payout_account_id = ?6, last_update = ?7
        "#,
    )
    .bind(&driver.driver_id)
    .bind(&driver.name)
    .bind(driver.location.map(|p| p.lat))
    .bind(driver.location.map(|p| p.lng))
    .bind(driver.available)
    .bind(&driver.payout_account_id)
    .bind(driver.last_update.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_driver(pool: &SqlitePool, driver_id: &str) -> Result<Option<Driver>> {
    let row = sqlx::query_as::<_, DriverRow>(
        "SELECT driver_id, name, lat, lng, available, payout_account_id, last_update
         FROM drivers WHERE driver_id = ?1",
    )
    .bind(driver_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Driver::from))
}

pub async fn load_all_drivers(pool: &SqlitePool) -> Result<Vec<Driver>> {
    let rows = sqlx::query_as::<_, DriverRow>(
        "SELECT driver_id, name, lat, lng, available, payout_account_id, last_update FROM drivers",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Driver::from).collect())
}

/// Update a driver's position (and optionally availability). Returns false
/// when the driver is unknown.
pub async fn update_location(
    pool: &SqlitePool,
    driver_id: &str,
    location: GeoPoint,
    available: Option<bool>,
) -> Result<bool> {
    let result = match available {
        Some(available) => {
            sqlx::query(
                "UPDATE drivers SET lat = ?2, lng = ?3, available = ?4, last_update = ?5
                 WHERE driver_id = ?1",
            )
            .bind(driver_id)
            .bind(location.lat)
            .bind(location.lng)
            .bind(available)
            .bind(Utc::now().to_rfc3339())
            .execute(pool)
            .await?
        }
        None => {
            sqlx::query(
                "UPDATE drivers SET lat = ?2, lng = ?3, last_update = ?4 WHERE driver_id = ?1",
            )
            .bind(driver_id)
            .bind(location.lat)
            .bind(location.lng)
            .bind(Utc::now().to_rfc3339())
            .execute(pool)
            .await?
        }
    };

    Ok(result.rows_affected() > 0)
}

/// Flip availability unconditionally; used by the compensating revert in the
/// sequential claim path.
pub async fn set_availability(pool: &SqlitePool, driver_id: &str, available: bool) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE drivers SET available = ?2, last_update = ?3 WHERE driver_id = ?1",
    )
    .bind(driver_id)
    .bind(available)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// An available driver near a pickup point, with its exact distance.
#[derive(Debug, Clone)]
pub struct NearbyDriver {
    pub driver_id: String,
    pub distance_km: f64,
}

/// Available drivers within `radius_km` of `center`, nearest first, capped
/// at `limit`. A bounding box narrows the SQL scan; exact distances are
/// recomputed with haversine before ordering, so the box over-coverage never
/// leaks into results.
pub async fn find_available_near(
    pool: &SqlitePool,
    center: GeoPoint,
    radius_km: f64,
    limit: usize,
) -> Result<Vec<NearbyDriver>> {
    let bbox = bounding_box(center, radius_km);
    let rows = sqlx::query_as::<_, CandidateRow>(
        "SELECT driver_id, lat, lng FROM drivers
         WHERE available = 1
           AND lat IS NOT NULL AND lng IS NOT NULL
           AND lat BETWEEN ?1 AND ?2
           AND lng BETWEEN ?3 AND ?4",
    )
    .bind(bbox.min_lat)
    .bind(bbox.max_lat)
    .bind(bbox.min_lng)
    .bind(bbox.max_lng)
    .fetch_all(pool)
    .await?;

    let mut nearby: Vec<NearbyDriver> = rows
        .into_iter()
        .filter_map(|row| {
            let location = GeoPoint::new(row.lat?, row.lng?);
            let distance_km = haversine_distance_km(center, location);
            (distance_km <= radius_km).then_some(NearbyDriver {
                driver_id: row.driver_id,
                distance_km,
            })
        })
        .collect();

    nearby.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    nearby.truncate(limit);
    Ok(nearby)
}

pub async fn load_reliability(pool: &SqlitePool, driver_id: &str) -> Result<Option<f64>> {
    let row: Option<(f64,)> =
        sqlx::query_as("SELECT reliability FROM driver_scores WHERE driver_id = ?1")
            .bind(driver_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.map(|r| r.0))
}

pub async fn set_reliability(pool: &SqlitePool, driver_id: &str, reliability: f64) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO driver_scores (driver_id, reliability) VALUES (?1, ?2)
        ON CONFLICT(driver_id) DO UPDATE SET reliability = ?2
        "#,
    )
    .bind(driver_id)
    .bind(reliability)
    .execute(pool)
    .await?;

    Ok(())
}

#[derive(sqlx::FromRow)]
struct DriverRow {
    driver_id: String,
    name: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    available: bool,
    payout_account_id: Option<String>,
    last_update: String,
}

#[derive(sqlx::FromRow)]
struct CandidateRow {
    driver_id: String,
    lat: Option<f64>,
    lng: Option<f64>,
}

impl From<DriverRow> for Driver {
    fn from(row: DriverRow) -> Self {
        let location = match (row.lat, row.lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        };
        Driver {
            driver_id: row.driver_id,
            name: row.name,
            location,
            available: row.available,
            payout_account_id: row.payout_account_id,
            last_update: DateTime::parse_from_rfc3339(&row.last_update)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }
    }
}
