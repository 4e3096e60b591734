//! Geospatial math for dispatch radius queries and route geometry.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Approximate km per degree of latitude, used only for bounding-box
/// prefilters. Exact distances always go through the haversine formula.
const KM_PER_DEG_LAT: f64 = 111.32;

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Great-circle distance between two points in kilometers.
///
/// Symmetric, zero for identical points, monotonic in angular separation.
pub fn haversine_distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lng - a.lng).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

pub fn within_radius_km(a: GeoPoint, b: GeoPoint, radius_km: f64) -> bool {
    haversine_distance_km(a, b) <= radius_km
}

/// Lat/lng rectangle enclosing a radius around a center point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lng >= self.min_lng
            && point.lng <= self.max_lng
    }
}

/// Bounding box for a radius query around `center`. The box over-covers near
/// the poles; callers must re-check candidates with [`haversine_distance_km`].
pub fn bounding_box(center: GeoPoint, radius_km: f64) -> BoundingBox {
    let lat_delta = radius_km / KM_PER_DEG_LAT;
    let lat_cos = center.lat.to_radians().cos().abs().max(1e-6);
    let lng_delta = radius_km / (KM_PER_DEG_LAT * lat_cos);
    BoundingBox {
        min_lat: (center.lat - lat_delta).max(-90.0),
        max_lat: (center.lat + lat_delta).min(90.0),
        min_lng: (center.lng - lng_delta).max(-180.0),
        max_lng: (center.lng + lng_delta).min(180.0),
    }
}

/// Decode a Google-encoded polyline (precision 1e5) into ordered points.
///
/// Empty input yields an empty vec. Truncated or out-of-alphabet input is a
/// validation error, never a panic.
pub fn decode_polyline(encoded: &str) -> Result<Vec<GeoPoint>, CoreError> {
    decode_polyline_with_precision(encoded, 1e5)
}

/// Decode with an explicit precision factor (1e6 for Valhalla shapes).
pub fn decode_polyline_with_precision(
    encoded: &str,
    precision: f64,
) -> Result<Vec<GeoPoint>, CoreError> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut index = 0usize;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while index < bytes.len() {
        let (dlat, next) = decode_signed_value(bytes, index)?;
        let (dlng, next) = decode_signed_value(bytes, next)?;
        lat += dlat;
        lng += dlng;
        index = next;
        points.push(GeoPoint {
            lat: lat as f64 / precision,
            lng: lng as f64 / precision,
        });
    }

    Ok(points)
}

/// Decode one zig-zag varint: 5-bit groups chained by the 0x20 continuation
/// bit, then odd values negated-and-halved, even values halved.
fn decode_signed_value(bytes: &[u8], mut index: usize) -> Result<(i64, usize), CoreError> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;

    loop {
        let byte = *bytes
            .get(index)
            .ok_or_else(|| CoreError::validation("truncated polyline"))?;
        if byte < 63 {
            return Err(CoreError::validation(format!(
                "polyline byte {byte} outside encoding alphabet"
            )));
        }
        let value = (byte - 63) as i64;
        index += 1;
        result |= (value & 0x1f) << shift;
        shift += 5;
        if value & 0x20 == 0 {
            break;
        }
        if shift > 60 {
            return Err(CoreError::validation("polyline value overflow"));
        }
    }

    let delta = if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    };
    Ok((delta, index))
}

/// Encode points to a Google polyline (precision 1e5). Inverse of
/// [`decode_polyline`]; used by provider stubs and tests.
pub fn encode_polyline(points: &[GeoPoint]) -> String {
    let mut encoded = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for point in points {
        let lat = (point.lat * 1e5).round() as i64;
        let lng = (point.lng * 1e5).round() as i64;
        encode_signed_value(lat - prev_lat, &mut encoded);
        encode_signed_value(lng - prev_lng, &mut encoded);
        prev_lat = lat;
        prev_lng = lng;
    }

    encoded
}

fn encode_signed_value(value: i64, out: &mut String) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 } as u64;
    while v >= 0x20 {
        out.push(((0x20 | (v & 0x1f)) as u8 + 63) as char);
        v >>= 5;
    }
    out.push((v as u8 + 63) as char);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_is_symmetric_and_zero_on_identity() {
        let a = GeoPoint::new(40.7128, -74.0060);
        let b = GeoPoint::new(40.7484, -73.9857);
        assert_eq!(haversine_distance_km(a, b), haversine_distance_km(b, a));
        assert!(haversine_distance_km(a, a) < 1e-9);
    }

    #[test]
    fn haversine_one_degree_latitude() {
        // ~111.19 km per degree of latitude at the equator
        let d = haversine_distance_km(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((d - 111.19).abs() < 0.1, "got {d}");
    }

    #[test]
    fn decode_empty_polyline() {
        assert!(decode_polyline("").unwrap().is_empty());
    }

    #[test]
    fn decode_reference_polyline() {
        // Reference vector from the Google polyline algorithm description.
        let points = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        let expected = [(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)];
        assert_eq!(points.len(), expected.len());
        for (point, (lat, lng)) in points.iter().zip(expected) {
            assert!((point.lat - lat).abs() < 1e-5);
            assert!((point.lng - lng).abs() < 1e-5);
        }
    }

    #[test]
    fn decode_rejects_truncated_input() {
        // Continuation bit set on the final group
        let err = decode_polyline("_p~iF~ps|U_").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn encode_then_decode_preserves_points() {
        let points = vec![
            GeoPoint::new(38.5, -120.2),
            GeoPoint::new(40.7, -120.95),
            GeoPoint::new(43.252, -126.453),
        ];
        let decoded = decode_polyline(&encode_polyline(&points)).unwrap();
        for (a, b) in points.iter().zip(&decoded) {
            assert!((a.lat - b.lat).abs() < 1e-5);
            assert!((a.lng - b.lng).abs() < 1e-5);
        }
    }

    #[test]
    fn bounding_box_contains_points_within_radius() {
        let center = GeoPoint::new(37.7749, -122.4194);
        let bbox = bounding_box(center, 5.0);
        let near = GeoPoint::new(37.79, -122.41);
        assert!(bbox.contains(near));
        assert!(within_radius_km(center, near, 5.0));
        let far = GeoPoint::new(38.5, -122.41);
        assert!(!bbox.contains(far));
    }
}
