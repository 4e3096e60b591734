//! Shared application state for the server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use courier_routing::{
    OrsProvider, OsrmProvider, ProviderChain, RouteProvider, ValhallaProvider,
};

use crate::config::Config;
use crate::payments::{HttpPaymentGateway, PaymentGateway};
use crate::persistence::Database;
use crate::tracking::TrackingRegistry;

pub struct AppState {
    db: Database,
    config: Config,
    routes: ProviderChain,
    gateway: Arc<dyn PaymentGateway>,
    tracking: TrackingRegistry,
}

impl AppState {
    /// Build state with the real routing chain and HTTP payment gateway.
    pub fn new(db: Database, config: Config) -> Result<Self> {
        let gateway = Arc::new(HttpPaymentGateway::new(
            &config.payment_api_url,
            config.payment_api_key.clone(),
            config.provider_timeout_secs,
        ));
        let routes = build_provider_chain(&config)?;
        Ok(Self::with_parts(db, config, routes, gateway))
    }

    /// Build state with injected routing and payment backends. Tests use
    /// this to swap in doubles.
    pub fn with_parts(
        db: Database,
        config: Config,
        routes: ProviderChain,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            db,
            config,
            routes,
            gateway,
            tracking: TrackingRegistry::new(),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn routes(&self) -> &ProviderChain {
        &self.routes
    }

    pub fn gateway(&self) -> &dyn PaymentGateway {
        self.gateway.as_ref()
    }

    pub fn tracking(&self) -> &TrackingRegistry {
        &self.tracking
    }
}

/// Assemble the routing fallback chain from config. Order matters: the
/// primary provider is tried first, and optional providers join only when
/// their base URL is configured.
fn build_provider_chain(config: &Config) -> Result<ProviderChain> {
    let timeout = Duration::from_secs(config.provider_timeout_secs);
    let mut providers: Vec<Box<dyn RouteProvider>> = vec![Box::new(OrsProvider::new(
        &config.ors_base_url,
        config.ors_api_key.clone().unwrap_or_default(),
        timeout,
    )?)];

    if let Some(base_url) = &config.osrm_base_url {
        providers.push(Box::new(OsrmProvider::new(base_url, timeout)?));
    }
    if let Some(base_url) = &config.valhalla_base_url {
        providers.push(Box::new(ValhallaProvider::new(base_url, timeout)?));
    }

    Ok(ProviderChain::new(providers))
}
