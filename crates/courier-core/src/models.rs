//! Core data models for the dispatch and settlement system.

use crate::geo::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chef (pickup origin) participating in the marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chef {
    pub chef_id: String,
    pub name: String,
    pub pickup: GeoPoint,
    /// Payout destination; missing means settlement skips the chef leg.
    pub payout_account_id: Option<String>,
}

/// Current state of a registered driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub driver_id: String,
    pub name: Option<String>,
    pub location: Option<GeoPoint>,
    pub available: bool,
    pub payout_account_id: Option<String>,
    pub last_update: DateTime<Utc>,
}

/// A captured order. Money fields are integer minor-currency units and
/// immutable once captured; only batching/status fields change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub chef_id: String,
    pub subtotal_cents: i64,
    pub delivery_fee_cents: i64,
    /// The platform's base (service) fee component of the captured total.
    pub service_fee_cents: i64,
    pub total_cents: i64,
    pub payment_intent_id: Option<String>,
    pub dropoff: Option<GeoPoint>,
    pub batch_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One driver-executed pickup-and-dropoff unit of work tied to one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub delivery_id: String,
    pub order_id: String,
    pub driver_id: Option<String>,
    pub status: DeliveryStatus,
    pub pickup: Option<GeoPoint>,
    pub dropoff: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Assigned,
    PickedUp,
    OnRoute,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Assigned => "assigned",
            DeliveryStatus::PickedUp => "picked_up",
            DeliveryStatus::OnRoute => "on_route",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(DeliveryStatus::Pending),
            "assigned" => Some(DeliveryStatus::Assigned),
            "picked_up" => Some(DeliveryStatus::PickedUp),
            "on_route" => Some(DeliveryStatus::OnRoute),
            "delivered" => Some(DeliveryStatus::Delivered),
            "cancelled" => Some(DeliveryStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal states accept no further progression.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientType {
    Chef,
    Platform,
    Driver,
}

impl RecipientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientType::Chef => "chef",
            RecipientType::Platform => "platform",
            RecipientType::Driver => "driver",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "chef" => Some(RecipientType::Chef),
            "platform" => Some(RecipientType::Platform),
            "driver" => Some(RecipientType::Driver),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Succeeded => "succeeded",
            TransferStatus::Failed => "failed",
            TransferStatus::Skipped => "skipped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "succeeded" => Some(TransferStatus::Succeeded),
            "failed" => Some(TransferStatus::Failed),
            "skipped" => Some(TransferStatus::Skipped),
            _ => None,
        }
    }
}

/// One recorded movement of funds to one recipient for one order.
/// Write-once per (order, recipient); rows are never updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransfer {
    pub order_id: String,
    pub recipient_type: RecipientType,
    pub recipient_id: Option<String>,
    pub amount_cents: i64,
    /// External transfer id; null when the leg failed or was skipped.
    pub transfer_id: Option<String>,
    pub status: TransferStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
