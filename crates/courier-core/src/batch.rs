//! Batch planning: cluster nearby same-chef orders and sequence one driver
//! trip over them.
//!
//! Clustering is greedy and order-dependent, and the stop sequence uses a
//! nearest-neighbor heuristic. Neither is globally optimal; the published
//! formulas are the contract, and callers must treat the output as an
//! estimate rather than a shortest-route guarantee.

use crate::geo::{haversine_distance_km, GeoPoint};
use serde::{Deserialize, Serialize};

/// An order eligible for batching. `pickup` is the chef's pickup point and is
/// identical for every order of one chef.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOrder {
    pub order_id: String,
    pub chef_id: String,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub total_cents: i64,
}

/// Tunables for clustering, trip simulation, and batch economics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub cluster_radius_km: f64,
    pub average_speed_kmh: f64,
    pub pickup_service_min: f64,
    pub dropoff_service_min: f64,
    /// Percentage splits of the batch value; chef + platform are taken
    /// directly, the delivery pool receives the remainder.
    pub chef_share_pct: i64,
    pub platform_share_pct: i64,
    pub driver_base_per_stop_cents: i64,
    pub driver_per_km_cents: i64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            cluster_radius_km: 2.0,
            average_speed_kmh: 30.0,
            pickup_service_min: 5.0,
            dropoff_service_min: 3.0,
            chef_share_pct: 70,
            platform_share_pct: 10,
            driver_base_per_stop_cents: 200,
            driver_per_km_cents: 60,
        }
    }
}

/// One drop-off in the planned sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStop {
    pub order_id: String,
    pub point: GeoPoint,
    /// Distance of the leg arriving at this stop, km.
    pub leg_km: f64,
}

/// Money outcome of a batch. `pool_margin_cents` is signed: a loss-making
/// batch is representable, never clamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEconomics {
    pub batch_value_cents: i64,
    pub chef_share_cents: i64,
    pub platform_share_cents: i64,
    pub delivery_pool_cents: i64,
    pub driver_pay_cents: i64,
    pub pool_margin_cents: i64,
}

/// A planned driver trip over one cluster of same-chef orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPlan {
    pub chef_id: String,
    pub pickup: GeoPoint,
    pub stops: Vec<BatchStop>,
    pub total_distance_km: f64,
    pub estimated_minutes: f64,
    pub economics: BatchEconomics,
}

impl BatchPlan {
    pub fn order_ids(&self) -> Vec<String> {
        self.stops.iter().map(|s| s.order_id.clone()).collect()
    }
}

/// Cluster a pool of unbatched orders and plan a trip for each cluster.
///
/// Clustering: the first remaining order seeds a batch; every remaining
/// same-chef order whose drop-off lies within `cluster_radius_km` of the
/// seed's drop-off is absorbed; repeat until the pool is empty. Each order
/// lands in exactly one batch and every batch is chef-homogeneous.
pub fn plan_batches(pool: Vec<BatchOrder>, config: &BatchConfig) -> Vec<BatchPlan> {
    cluster_orders(pool, config.cluster_radius_km)
        .into_iter()
        .map(|members| plan_trip(members, config))
        .collect()
}

fn cluster_orders(mut pool: Vec<BatchOrder>, radius_km: f64) -> Vec<Vec<BatchOrder>> {
    let mut clusters = Vec::new();
    while !pool.is_empty() {
        let seed = pool.remove(0);
        let mut members = vec![seed];
        let seed_chef = members[0].chef_id.clone();
        let seed_dropoff = members[0].dropoff;
        let mut remaining = Vec::with_capacity(pool.len());
        for order in pool {
            if order.chef_id == seed_chef
                && haversine_distance_km(order.dropoff, seed_dropoff) <= radius_km
            {
                members.push(order);
            } else {
                remaining.push(order);
            }
        }
        pool = remaining;
        clusters.push(members);
    }
    clusters
}

/// Sequence stops nearest-neighbor from the pickup point and price the trip.
fn plan_trip(members: Vec<BatchOrder>, config: &BatchConfig) -> BatchPlan {
    let chef_id = members[0].chef_id.clone();
    let pickup = members[0].pickup;
    let batch_value_cents: i64 = members.iter().map(|o| o.total_cents).sum();

    let mut unvisited = members;
    let mut stops = Vec::with_capacity(unvisited.len());
    let mut cursor = pickup;
    let mut total_distance_km = 0.0;

    while !unvisited.is_empty() {
        let mut nearest = 0;
        let mut nearest_km = haversine_distance_km(cursor, unvisited[0].dropoff);
        for (idx, order) in unvisited.iter().enumerate().skip(1) {
            let km = haversine_distance_km(cursor, order.dropoff);
            if km < nearest_km {
                nearest = idx;
                nearest_km = km;
            }
        }
        let order = unvisited.remove(nearest);
        cursor = order.dropoff;
        total_distance_km += nearest_km;
        stops.push(BatchStop {
            order_id: order.order_id,
            point: order.dropoff,
            leg_km: nearest_km,
        });
    }

    let travel_min = if config.average_speed_kmh > 0.0 {
        total_distance_km / config.average_speed_kmh * 60.0
    } else {
        0.0
    };
    let estimated_minutes =
        config.pickup_service_min + config.dropoff_service_min * stops.len() as f64 + travel_min;

    let economics = price_batch(batch_value_cents, total_distance_km, stops.len(), config);

    BatchPlan {
        chef_id,
        pickup,
        stops,
        total_distance_km,
        estimated_minutes,
        economics,
    }
}

fn price_batch(
    batch_value_cents: i64,
    total_distance_km: f64,
    stop_count: usize,
    config: &BatchConfig,
) -> BatchEconomics {
    let chef_share_cents = batch_value_cents * config.chef_share_pct / 100;
    let platform_share_cents = batch_value_cents * config.platform_share_pct / 100;
    // Remainder arithmetic: the three shares always sum to the batch value.
    let delivery_pool_cents = batch_value_cents - chef_share_cents - platform_share_cents;
    let driver_pay_cents = config.driver_base_per_stop_cents * stop_count as i64
        + (config.driver_per_km_cents as f64 * total_distance_km).round() as i64;
    BatchEconomics {
        batch_value_cents,
        chef_share_cents,
        platform_share_cents,
        delivery_pool_cents,
        driver_pay_cents,
        pool_margin_cents: delivery_pool_cents - driver_pay_cents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, chef: &str, dropoff: GeoPoint, total: i64) -> BatchOrder {
        BatchOrder {
            order_id: id.to_string(),
            chef_id: chef.to_string(),
            pickup: GeoPoint::new(37.7749, -122.4194),
            dropoff,
            total_cents: total,
        }
    }

    #[test]
    fn batches_are_chef_homogeneous_and_partition_the_pool() {
        let pool = vec![
            order("o1", "chef-a", GeoPoint::new(37.78, -122.41), 1500),
            order("o2", "chef-b", GeoPoint::new(37.78, -122.41), 1200),
            order("o3", "chef-a", GeoPoint::new(37.781, -122.411), 1800),
            order("o4", "chef-a", GeoPoint::new(37.90, -122.41), 900),
        ];
        let plans = plan_batches(pool, &BatchConfig::default());

        let mut seen = std::collections::HashSet::new();
        for plan in &plans {
            for stop in &plan.stops {
                assert!(seen.insert(stop.order_id.clone()), "order in two batches");
            }
        }
        assert_eq!(seen.len(), 4);

        // o1 and o3 share a chef and are ~100m apart; o4 is the same chef but
        // far outside the radius; o2 is a different chef at the same spot.
        let first = plans
            .iter()
            .find(|p| p.stops.iter().any(|s| s.order_id == "o1"))
            .unwrap();
        assert_eq!(first.chef_id, "chef-a");
        let ids = first.order_ids();
        assert!(ids.contains(&"o3".to_string()));
        assert!(!ids.contains(&"o2".to_string()));
        assert!(!ids.contains(&"o4".to_string()));
    }

    #[test]
    fn stops_follow_nearest_neighbor_order() {
        let pickup = GeoPoint::new(0.0, 0.0);
        let mut pool = vec![
            order("far", "chef-a", GeoPoint::new(0.03, 0.0), 1000),
            order("near", "chef-a", GeoPoint::new(0.01, 0.0), 1000),
            order("mid", "chef-a", GeoPoint::new(0.02, 0.0), 1000),
        ];
        for o in &mut pool {
            o.pickup = pickup;
        }
        let config = BatchConfig {
            cluster_radius_km: 10.0,
            ..BatchConfig::default()
        };
        let plans = plan_batches(pool, &config);
        assert_eq!(plans.len(), 1);
        let ids: Vec<_> = plans[0].stops.iter().map(|s| s.order_id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
    }

    #[test]
    fn trip_time_includes_service_and_travel() {
        let pool = vec![order("o1", "chef-a", GeoPoint::new(37.79, -122.4194), 1000)];
        let config = BatchConfig::default();
        let plans = plan_batches(pool, &config);
        let plan = &plans[0];
        let travel_min = plan.total_distance_km / config.average_speed_kmh * 60.0;
        let expected = config.pickup_service_min + config.dropoff_service_min + travel_min;
        assert!((plan.estimated_minutes - expected).abs() < 1e-9);
    }

    #[test]
    fn shares_sum_to_batch_value_and_margin_can_go_negative() {
        let pool = vec![
            order("o1", "chef-a", GeoPoint::new(37.78, -122.41), 333),
            order("o2", "chef-a", GeoPoint::new(37.781, -122.411), 334),
        ];
        let plans = plan_batches(pool, &BatchConfig::default());
        let econ = &plans[0].economics;
        assert_eq!(
            econ.chef_share_cents + econ.platform_share_cents + econ.delivery_pool_cents,
            econ.batch_value_cents
        );
        // Two stops at 200 cents base each outweigh the delivery share of a
        // 667-cent batch; the margin must stay negative, not clamp at zero.
        assert!(econ.pool_margin_cents < 0);
        assert_eq!(
            econ.pool_margin_cents,
            econ.delivery_pool_cents - econ.driver_pay_cents
        );
    }
}
