//! Server configuration from environment.

use courier_core::batch::BatchConfig;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_path: String,
    pub database_max_connections: u32,

    // Dispatch
    pub search_radius_km: f64,
    pub max_candidates: u32,
    /// Preferred claim path. When false the sequential two-update fallback
    /// with compensating revert is used instead of one transaction.
    pub atomic_claims: bool,

    // Batching
    pub cluster_radius_km: f64,
    pub average_speed_kmh: f64,
    pub pickup_service_min: f64,
    pub dropoff_service_min: f64,
    pub chef_share_pct: i64,
    pub platform_share_pct: i64,
    pub driver_base_per_stop_cents: i64,
    pub driver_per_km_cents: i64,

    // Settlement
    /// Chef's percentage of the service-fee component; the platform keeps
    /// the remainder.
    pub chef_service_fee_pct: i64,
    pub platform_account_id: Option<String>,
    pub payment_api_url: String,
    pub payment_api_key: Option<String>,

    // Routing providers
    pub ors_base_url: String,
    pub ors_api_key: Option<String>,
    pub osrm_base_url: Option<String>,
    pub valhalla_base_url: Option<String>,
    pub provider_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env_parse("COURIER_PORT", 3000),
            database_path: env::var("COURIER_DB_PATH")
                .unwrap_or_else(|_| "data/courier.db".to_string()),
            database_max_connections: env_parse("COURIER_DB_MAX_CONNECTIONS", 5),

            search_radius_km: env_parse("COURIER_SEARCH_RADIUS_KM", 10.0),
            max_candidates: env_parse("COURIER_MAX_CANDIDATES", 10),
            atomic_claims: env_flag("COURIER_ATOMIC_CLAIMS", true),

            cluster_radius_km: env_parse("COURIER_CLUSTER_RADIUS_KM", 2.0),
            average_speed_kmh: env_parse("COURIER_AVG_SPEED_KMH", 30.0),
            pickup_service_min: env_parse("COURIER_PICKUP_SERVICE_MIN", 5.0),
            dropoff_service_min: env_parse("COURIER_DROPOFF_SERVICE_MIN", 3.0),
            chef_share_pct: env_parse("COURIER_CHEF_SHARE_PCT", 70),
            platform_share_pct: env_parse("COURIER_PLATFORM_SHARE_PCT", 10),
            driver_base_per_stop_cents: env_parse("COURIER_DRIVER_BASE_PER_STOP_CENTS", 200),
            driver_per_km_cents: env_parse("COURIER_DRIVER_PER_KM_CENTS", 60),

            chef_service_fee_pct: env_parse("COURIER_CHEF_SERVICE_FEE_PCT", 60),
            platform_account_id: env_opt("COURIER_PLATFORM_ACCOUNT_ID"),
            payment_api_url: env::var("COURIER_PAYMENT_API_URL")
                .unwrap_or_else(|_| "https://api.payments.local".to_string()),
            payment_api_key: env_opt("COURIER_PAYMENT_API_KEY"),

            ors_base_url: env::var("COURIER_ORS_URL")
                .unwrap_or_else(|_| "https://api.openrouteservice.org".to_string()),
            ors_api_key: env_opt("COURIER_ORS_API_KEY"),
            osrm_base_url: env_opt("COURIER_OSRM_URL"),
            valhalla_base_url: env_opt("COURIER_VALHALLA_URL"),
            provider_timeout_secs: env_parse("COURIER_PROVIDER_TIMEOUT_SECS", 10),
        }
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            cluster_radius_km: self.cluster_radius_km,
            average_speed_kmh: self.average_speed_kmh,
            pickup_service_min: self.pickup_service_min,
            dropoff_service_min: self.dropoff_service_min,
            chef_share_pct: self.chef_share_pct,
            platform_share_pct: self.platform_share_pct,
            driver_base_per_stop_cents: self.driver_base_per_stop_cents,
            driver_per_km_cents: self.driver_per_km_cents,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}
