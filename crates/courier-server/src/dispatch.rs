//! Delivery assignment: candidate search, scoring, and the driver claim.

use courier_core::scoring::{rank_candidates, Candidate, DEFAULT_RELIABILITY};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::persistence::{deliveries, drivers, Database};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("delivery not found: {0}")]
    DeliveryNotFound(String),
    #[error("delivery already assigned: {0}")]
    AlreadyAssigned(String),
    #[error("delivery has no pickup location: {0}")]
    MissingPickup(String),
    #[error("could not claim any candidate driver for {0}")]
    ClaimConflict(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Result of an assignment attempt that passed all preconditions.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentOutcome {
    Assigned {
        driver_id: String,
        score: f64,
        distance_km: f64,
    },
    /// No available driver inside the search radius. Not an error; the
    /// caller retries later or widens the radius.
    NoDriversAvailable,
}

/// Assign the best available driver to a pending delivery.
///
/// Preconditions are checked in a fixed order before any geographic work:
/// the delivery must exist, must be unassigned, and must carry a pickup
/// point. Candidates within the search radius are scored on reliability
/// minus a distance penalty, and the winner is claimed. When a claim races
/// with another assigner the loser falls through to the next candidate.
pub async fn assign_delivery(
    db: &Database,
    config: &Config,
    delivery_id: &str,
) -> Result<AssignmentOutcome, DispatchError> {
    let delivery = deliveries::load_delivery(db.pool(), delivery_id)
        .await?
        .ok_or_else(|| DispatchError::DeliveryNotFound(delivery_id.to_string()))?;

    if delivery.driver_id.is_some() {
        return Err(DispatchError::AlreadyAssigned(delivery_id.to_string()));
    }

    let pickup = delivery
        .pickup
        .ok_or_else(|| DispatchError::MissingPickup(delivery_id.to_string()))?;

    let nearby = drivers::find_available_near(
        db.pool(),
        pickup,
        config.search_radius_km,
        config.max_candidates as usize,
    )
    .await?;

    if nearby.is_empty() {
        info!(delivery_id, "No available drivers in range");
        return Ok(AssignmentOutcome::NoDriversAvailable);
    }

    let mut candidates = Vec::with_capacity(nearby.len());
    for driver in &nearby {
        let reliability = drivers::load_reliability(db.pool(), &driver.driver_id)
            .await?
            .unwrap_or(DEFAULT_RELIABILITY);
        candidates.push(Candidate {
            driver_id: driver.driver_id.clone(),
            distance_km: driver.distance_km,
            reliability,
        });
    }

    // Claim the best candidate; on a lost race, drop it and re-rank the rest.
    while let Some(best) = rank_candidates(&candidates) {
        let claimed = if config.atomic_claims {
            deliveries::claim_driver_atomic(db.pool(), delivery_id, &best.driver_id).await?
        } else {
            deliveries::claim_driver_sequential(db.pool(), delivery_id, &best.driver_id).await?
        };

        if claimed {
            info!(
                delivery_id,
                driver_id = %best.driver_id,
                score = best.score,
                distance_km = best.distance_km,
                "Delivery assigned"
            );
            return Ok(AssignmentOutcome::Assigned {
                driver_id: best.driver_id,
                score: best.score,
                distance_km: best.distance_km,
            });
        }

        // The delivery itself may have been taken by a concurrent assigner.
        let current = deliveries::load_delivery(db.pool(), delivery_id)
            .await?
            .ok_or_else(|| DispatchError::DeliveryNotFound(delivery_id.to_string()))?;
        if current.driver_id.is_some() {
            return Err(DispatchError::AlreadyAssigned(delivery_id.to_string()));
        }

        warn!(
            delivery_id,
            driver_id = %best.driver_id,
            "Candidate no longer available, trying next"
        );
        candidates.retain(|c| c.driver_id != best.driver_id);
    }

    Err(DispatchError::ClaimConflict(delivery_id.to_string()))
}
