//! Ordered provider chain with fallback on transient failures.

use crate::error::RoutingError;
use crate::provider::{RouteProvider, RouteRequest, RouteResult};
use tracing::{debug, warn};

/// Providers in priority order: the full-featured quota-limited primary
/// first, then best-effort fallbacks.
pub struct ProviderChain {
    providers: Vec<Box<dyn RouteProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Box<dyn RouteProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Compute a route, falling back through the chain on quota/timeout
    /// failures. With an explicit `preferred` provider no fallback is used;
    /// that provider's failure is returned directly. If every attempted
    /// provider fails, the last error is returned.
    pub async fn compute(
        &self,
        request: &RouteRequest,
        preferred: Option<&str>,
    ) -> Result<RouteResult, RoutingError> {
        request.validate()?;

        if let Some(name) = preferred {
            let provider = self
                .providers
                .iter()
                .find(|p| p.name().eq_ignore_ascii_case(name))
                .ok_or_else(|| RoutingError::UnknownProvider(name.to_string()))?;
            return provider.compute_route(request).await;
        }

        if self.providers.is_empty() {
            return Err(RoutingError::NoProviders);
        }

        let mut last_error = None;
        for provider in &self.providers {
            match provider.compute_route(request).await {
                Ok(result) => {
                    debug!(provider = provider.name(), "route computed");
                    return Ok(result);
                }
                Err(err) => {
                    let retryable = err.is_retryable_with_fallback();
                    warn!(
                        provider = provider.name(),
                        retryable, "route provider failed: {err}"
                    );
                    last_error = Some(err);
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(RoutingError::NoProviders))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Profile;
    use async_trait::async_trait;
    use courier_core::geo::GeoPoint;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubProvider {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        outcome: fn() -> Result<RouteResult, RoutingError>,
    }

    #[async_trait]
    impl RouteProvider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn compute_route(&self, _req: &RouteRequest) -> Result<RouteResult, RoutingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn ok_result() -> Result<RouteResult, RoutingError> {
        Ok(RouteResult {
            provider: "stub".to_string(),
            distance_meters: 1200.0,
            duration_seconds: 180.0,
            geometry: vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.01, 0.0)],
        })
    }

    fn request() -> RouteRequest {
        RouteRequest::new(
            vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.01, 0.0)],
            Profile::Driving,
        )
    }

    fn stub(
        name: &'static str,
        outcome: fn() -> Result<RouteResult, RoutingError>,
    ) -> (Box<dyn RouteProvider>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(StubProvider {
                name,
                calls: calls.clone(),
                outcome,
            }),
            calls,
        )
    }

    #[tokio::test]
    async fn quota_failure_falls_through_to_next_provider() {
        let (primary, primary_calls) = stub("ors", || {
            Err(RoutingError::QuotaExceeded { status: 429 })
        });
        let (fallback, fallback_calls) = stub("osrm", ok_result);
        let chain = ProviderChain::new(vec![primary, fallback]);

        let result = chain.compute(&request(), None).await.unwrap();
        assert_eq!(result.distance_meters, 1200.0);
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bad_request_does_not_fall_through() {
        let (primary, _) = stub("ors", || Err(RoutingError::BadRequest("shape".into())));
        let (fallback, fallback_calls) = stub("osrm", ok_result);
        let chain = ProviderChain::new(vec![primary, fallback]);

        let err = chain.compute(&request(), None).await.unwrap_err();
        assert!(matches!(err, RoutingError::BadRequest(_)));
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn all_failing_returns_last_error() {
        let (primary, _) = stub("ors", || {
            Err(RoutingError::QuotaExceeded { status: 429 })
        });
        let (fallback, _) = stub("osrm", || Err(RoutingError::Timeout));
        let chain = ProviderChain::new(vec![primary, fallback]);

        let err = chain.compute(&request(), None).await.unwrap_err();
        assert!(matches!(err, RoutingError::Timeout));
    }

    #[tokio::test]
    async fn explicit_provider_skips_fallback() {
        let (primary, primary_calls) = stub("ors", ok_result);
        let (fallback, fallback_calls) = stub("osrm", || {
            Err(RoutingError::QuotaExceeded { status: 429 })
        });
        let chain = ProviderChain::new(vec![primary, fallback]);

        let err = chain.compute(&request(), Some("osrm")).await.unwrap_err();
        assert!(matches!(err, RoutingError::QuotaExceeded { status: 429 }));
        assert_eq!(primary_calls.load(Ordering::SeqCst), 0);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);

        let err = chain.compute(&request(), Some("nope")).await.unwrap_err();
        assert!(matches!(err, RoutingError::UnknownProvider(_)));
    }

    #[tokio::test]
    async fn too_few_coordinates_fails_validation_before_any_provider() {
        let (primary, primary_calls) = stub("ors", ok_result);
        let chain = ProviderChain::new(vec![primary]);
        let short = RouteRequest::new(vec![GeoPoint::new(0.0, 0.0)], Profile::Driving);

        let err = chain.compute(&short, None).await.unwrap_err();
        assert!(matches!(err, RoutingError::BadRequest(_)));
        assert_eq!(primary_calls.load(Ordering::SeqCst), 0);
    }
}
