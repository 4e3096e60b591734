//! Payment transfer ledger. Rows are append-only: settlement outcomes are
//! recorded once per (order, recipient) and never updated.

use anyhow::Result;
use chrono::{DateTime, Utc};
use courier_core::models::{PaymentTransfer, RecipientType, TransferStatus};
use sqlx::SqlitePool;

/// Record a transfer outcome. Returns false when a row for the same
/// (order, recipient type) already exists; the UNIQUE constraint makes the
/// insert a no-op so concurrent settlers cannot double-record a leg.
pub async fn insert_transfer(pool: &SqlitePool, transfer: &PaymentTransfer) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO payment_transfers (
            order_id, recipient_type, recipient_id, amount_cents,
            transfer_id, status, failure_reason, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&transfer.order_id)
    .bind(transfer.recipient_type.as_str())
    .bind(&transfer.recipient_id)
    .bind(transfer.amount_cents)
    .bind(&transfer.transfer_id)
    .bind(transfer.status.as_str())
    .bind(&transfer.failure_reason)
    .bind(transfer.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Whether any settlement legs have been recorded for this order.
pub async fn has_transfers(pool: &SqlitePool, order_id: &str) -> Result<bool> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM payment_transfers WHERE order_id = ?1")
            .bind(order_id)
            .fetch_one(pool)
            .await?;

    Ok(row.0 > 0)
}

pub async fn transfers_for_order(
    pool: &SqlitePool,
    order_id: &str,
) -> Result<Vec<PaymentTransfer>> {
    let rows = sqlx::query_as::<_, TransferRow>(
        "SELECT order_id, recipient_type, recipient_id, amount_cents,
                transfer_id, status, failure_reason, created_at
         FROM payment_transfers WHERE order_id = ?1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PaymentTransfer::from).collect())
}

#[derive(sqlx::FromRow)]
struct TransferRow {
    order_id: String,
    recipient_type: String,
    recipient_id: Option<String>,
    amount_cents: i64,
    transfer_id: Option<String>,
    status: String,
    failure_reason: Option<String>,
    created_at: String,
}

impl From<TransferRow> for PaymentTransfer {
    fn from(row: TransferRow) -> Self {
        PaymentTransfer {
            order_id: row.order_id,
            recipient_type: RecipientType::parse(&row.recipient_type)
                .unwrap_or(RecipientType::Platform),
            recipient_id: row.recipient_id,
            amount_cents: row.amount_cents,
            transfer_id: row.transfer_id,
            status: TransferStatus::parse(&row.status).unwrap_or(TransferStatus::Failed),
            failure_reason: row.failure_reason,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }
    }
}
