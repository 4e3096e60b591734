//! Settlement: split a captured order's funds and record each leg.

use chrono::Utc;
use courier_core::models::{Order, PaymentTransfer, RecipientType, TransferStatus};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::payments::{GatewayError, PaymentGateway, TransferRequest};
use crate::persistence::{chefs, deliveries, drivers, transfers, Database};

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("order not found: {0}")]
    OrderNotFound(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Outcome of one settlement leg, as recorded in the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementLeg {
    pub recipient_type: RecipientType,
    pub amount_cents: i64,
    pub status: TransferStatus,
    pub transfer_id: Option<String>,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SettlementSummary {
    pub order_id: String,
    /// True when the order had ledger rows before this call; the existing
    /// rows are returned and nothing new is attempted.
    pub already_distributed: bool,
    pub legs: Vec<SettlementLeg>,
    pub platform_retained_cents: i64,
}

/// How an order's captured total splits across recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementSplit {
    pub chef_cents: i64,
    pub platform_cents: i64,
    pub driver_cents: i64,
}

/// Exact-cents split: the chef gets the subtotal plus their percentage of
/// the service fee, the platform keeps the service-fee remainder, and the
/// driver gets the delivery fee. The three parts always sum to the total.
pub fn split_order(order: &Order, chef_service_fee_pct: i64) -> SettlementSplit {
    let chef_fee_share = order.service_fee_cents * chef_service_fee_pct / 100;
    SettlementSplit {
        chef_cents: order.subtotal_cents + chef_fee_share,
        platform_cents: order.service_fee_cents - chef_fee_share,
        driver_cents: order.delivery_fee_cents,
    }
}

/// Distribute an order's funds to chef, platform, and driver.
///
/// Legs are independent: a failed or skipped leg never blocks the others,
/// and every attempt lands in the append-only ledger. Re-running for an
/// already-settled order returns the recorded legs without touching the
/// gateway.
pub async fn distribute(
    db: &Database,
    config: &Config,
    gateway: &dyn PaymentGateway,
    order_id: &str,
    payment_reference: Option<&str>,
) -> Result<SettlementSummary, SettlementError> {
    let order = crate::persistence::orders::load_order(db.pool(), order_id)
        .await?
        .ok_or_else(|| SettlementError::OrderNotFound(order_id.to_string()))?;

    if transfers::has_transfers(db.pool(), order_id).await? {
        info!(order_id, "Order already settled, returning recorded legs");
        let recorded = transfers::transfers_for_order(db.pool(), order_id).await?;
        let platform_retained_cents = recorded
            .iter()
            .filter(|t| t.recipient_type == RecipientType::Platform)
            .map(|t| t.amount_cents)
            .sum();
        return Ok(SettlementSummary {
            order_id: order_id.to_string(),
            already_distributed: true,
            legs: recorded.into_iter().map(leg_from_row).collect(),
            platform_retained_cents,
        });
    }

    let split = split_order(&order, config.chef_service_fee_pct);
    let reference = payment_reference
        .map(str::to_string)
        .or_else(|| order.payment_intent_id.clone());

    let chef_account = chefs::load_chef(db.pool(), &order.chef_id)
        .await?
        .and_then(|c| c.payout_account_id);
    let driver_account = driver_payout_account(db, order_id).await?;

    let mut legs = Vec::with_capacity(3);
    legs.push(
        settle_leg(
            db,
            gateway,
            order_id,
            RecipientType::Chef,
            split.chef_cents,
            chef_account,
            reference.as_deref(),
        )
        .await?,
    );
    legs.push(
        settle_platform_leg(db, gateway, config, order_id, split.platform_cents, reference.as_deref())
            .await?,
    );
    legs.push(
        settle_leg(
            db,
            gateway,
            order_id,
            RecipientType::Driver,
            split.driver_cents,
            driver_account,
            reference.as_deref(),
        )
        .await?,
    );

    Ok(SettlementSummary {
        order_id: order_id.to_string(),
        already_distributed: false,
        legs,
        platform_retained_cents: split.platform_cents,
    })
}

/// Payout account of the driver who carried this order's delivery, if any.
async fn driver_payout_account(db: &Database, order_id: &str) -> Result<Option<String>, anyhow::Error> {
    let Some(delivery) = deliveries::load_delivery_for_order(db.pool(), order_id).await? else {
        return Ok(None);
    };
    let Some(driver_id) = delivery.driver_id else {
        return Ok(None);
    };
    Ok(drivers::load_driver(db.pool(), &driver_id)
        .await?
        .and_then(|d| d.payout_account_id))
}

/// Execute one external-recipient leg and record its outcome.
async fn settle_leg(
    db: &Database,
    gateway: &dyn PaymentGateway,
    order_id: &str,
    recipient_type: RecipientType,
    amount_cents: i64,
    destination: Option<String>,
    reference: Option<&str>,
) -> Result<SettlementLeg, SettlementError> {
    let outcome = match &destination {
        None => LegOutcome::Skipped("no payout account on file".to_string()),
        Some(_) if amount_cents == 0 => LegOutcome::Skipped("zero amount".to_string()),
        Some(account) => {
            let request = TransferRequest {
                destination_account: account.clone(),
                amount_cents,
                currency: "usd".to_string(),
                source_reference: reference.map(str::to_string),
                description: format!("{} settlement for order {}", recipient_type.as_str(), order_id),
            };
            match gateway.transfer(&request).await {
                Ok(transfer_id) => LegOutcome::Succeeded(transfer_id),
                Err(err) => {
                    warn!(
                        order_id,
                        recipient = recipient_type.as_str(),
                        error = %err,
                        "Transfer leg failed"
                    );
                    LegOutcome::Failed(err)
                }
            }
        }
    };

    record_leg(db, order_id, recipient_type, amount_cents, destination, outcome).await
}

/// The platform leg: funds stay on the platform account unless an external
/// platform account is configured, so no gateway call happens by default.
/// A retained leg records as succeeded with a null `recipient_id` and a
/// null external `transfer_id`; reconciliation reads a succeeded platform
/// row without a transfer id as funds that never left the platform.
async fn settle_platform_leg(
    db: &Database,
    gateway: &dyn PaymentGateway,
    config: &Config,
    order_id: &str,
    amount_cents: i64,
    reference: Option<&str>,
) -> Result<SettlementLeg, SettlementError> {
    match &config.platform_account_id {
        Some(account) => {
            settle_leg(
                db,
                gateway,
                order_id,
                RecipientType::Platform,
                amount_cents,
                Some(account.clone()),
                reference,
            )
            .await
        }
        None => {
            record_leg(
                db,
                order_id,
                RecipientType::Platform,
                amount_cents,
                None,
                LegOutcome::Succeeded(String::new()),
            )
            .await
        }
    }
}

enum LegOutcome {
    Succeeded(String),
    Failed(GatewayError),
    Skipped(String),
}

async fn record_leg(
    db: &Database,
    order_id: &str,
    recipient_type: RecipientType,
    amount_cents: i64,
    destination: Option<String>,
    outcome: LegOutcome,
) -> Result<SettlementLeg, SettlementError> {
    let (status, transfer_id, failure_reason) = match outcome {
        LegOutcome::Succeeded(id) => {
            let id = (!id.is_empty()).then_some(id);
            (TransferStatus::Succeeded, id, None)
        }
        LegOutcome::Failed(err) => (TransferStatus::Failed, None, Some(err.to_string())),
        LegOutcome::Skipped(reason) => (TransferStatus::Skipped, None, Some(reason)),
    };

    let row = PaymentTransfer {
        order_id: order_id.to_string(),
        recipient_type,
        recipient_id: destination,
        amount_cents,
        transfer_id,
        status,
        failure_reason,
        created_at: Utc::now(),
    };

    let inserted = transfers::insert_transfer(db.pool(), &row).await?;
    if inserted {
        return Ok(leg_from_row(row));
    }

    // A concurrent settler recorded this leg first; surface their row.
    warn!(order_id, recipient = recipient_type.as_str(), "Leg already recorded, keeping first writer");
    let recorded = transfers::transfers_for_order(db.pool(), order_id)
        .await?
        .into_iter()
        .find(|t| t.recipient_type == recipient_type);
    match recorded {
        Some(existing) => Ok(leg_from_row(existing)),
        None => Ok(leg_from_row(row)),
    }
}

fn leg_from_row(row: PaymentTransfer) -> SettlementLeg {
    SettlementLeg {
        recipient_type: row.recipient_type,
        amount_cents: row.amount_cents,
        status: row.status,
        transfer_id: row.transfer_id,
        failure_reason: row.failure_reason,
    }
}
