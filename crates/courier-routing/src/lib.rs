//! Route computation against external routing services.
//!
//! One capability interface ([`RouteProvider`]) with three HTTP-backed
//! implementations, tried in priority order by [`ProviderChain`]. A
//! classifier on [`RoutingError`] decides "retry with the next provider"
//! (quota, auth, timeout) vs "surface immediately" (request-shape problems).

pub mod chain;
pub mod error;
pub mod provider;
pub mod providers;

pub use chain::ProviderChain;
pub use error::RoutingError;
pub use provider::{Profile, RouteProvider, RouteRequest, RouteResult};
pub use providers::{ors::OrsProvider, osrm::OsrmProvider, valhalla::ValhallaProvider};
