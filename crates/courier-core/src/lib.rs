pub mod batch;
pub mod error;
pub mod geo;
pub mod models;
pub mod scoring;

pub use batch::{plan_batches, BatchConfig, BatchEconomics, BatchOrder, BatchPlan, BatchStop};
pub use error::CoreError;
pub use geo::{
    bounding_box, decode_polyline, encode_polyline, haversine_distance_km, within_radius_km,
    BoundingBox, GeoPoint,
};
pub use models::{
    Chef, Delivery, DeliveryStatus, Driver, Order, PaymentTransfer, RecipientType, TransferStatus,
};
pub use scoring::{rank_candidates, score, Candidate, RankedCandidate};
