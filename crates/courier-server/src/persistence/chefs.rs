//! Chef persistence operations.

use anyhow::Result;
use courier_core::geo::GeoPoint;
use courier_core::models::Chef;
use sqlx::SqlitePool;

pub async fn upsert_chef(pool: &SqlitePool, chef: &Chef) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO chefs (chef_id, name, lat, lng, payout_account_id)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(chef_id) DO UPDATE SET
            name = ?2, lat = ?3, lng = ?4, payout_account_id = ?5
        "#,
    )
    .bind(&chef.chef_id)
    .bind(&chef.name)
    .bind(chef.pickup.lat)
    .bind(chef.pickup.lng)
    .bind(&chef.payout_account_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_chef(pool: &SqlitePool, chef_id: &str) -> Result<Option<Chef>> {
    let row = sqlx::query_as::<_, ChefRow>(
        "SELECT chef_id, name, lat, lng, payout_account_id FROM chefs WHERE chef_id = ?1",
    )
    .bind(chef_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Chef::from))
}

#[derive(sqlx::FromRow)]
struct ChefRow {
    chef_id: String,
    name: String,
    lat: f64,
    lng: f64,
    payout_account_id: Option<String>,
}

impl From<ChefRow> for Chef {
    fn from(row: ChefRow) -> Self {
        Chef {
            chef_id: row.chef_id,
            name: row.name,
            pickup: GeoPoint::new(row.lat, row.lng),
            payout_account_id: row.payout_account_id,
        }
    }
}
