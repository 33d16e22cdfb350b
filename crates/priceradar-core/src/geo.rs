use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Axis-aligned latitude/longitude box enclosing a search circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Great-circle distance in kilometers between two points, via the
/// haversine formula.
///
/// Symmetric in its arguments and zero for identical points.
#[must_use]
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// True when the point lies within `radius_km` of the center, boundary
/// included. A negative radius is treated as zero.
#[must_use]
pub fn is_within_radius(
    center_lat: f64,
    center_lon: f64,
    point_lat: f64,
    point_lon: f64,
    radius_km: f64,
) -> bool {
    let radius_km = radius_km.max(0.0);
    distance_km(center_lat, center_lon, point_lat, point_lon) <= radius_km
}

/// True when both coordinates are finite and within Earth ranges:
/// latitude in [-90, 90], longitude in [-180, 180].
#[must_use]
pub fn validate_coordinates(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

/// Bounding box enclosing the circle of `radius_km` around a point.
///
/// The longitude span widens with latitude; where the circle reaches past a
/// pole the box degenerates to the full longitude range. Bounds are clamped
/// to Earth ranges.
#[must_use]
pub fn bounding_box(latitude: f64, longitude: f64, radius_km: f64) -> BoundingBox {
    let angular = radius_km.max(0.0) / EARTH_RADIUS_KM;

    let lat_delta = angular.to_degrees();
    let min_lat = (latitude - lat_delta).max(-90.0);
    let max_lat = (latitude + lat_delta).min(90.0);

    let cos_lat = latitude.to_radians().cos();
    let ratio = if cos_lat > 0.0 {
        angular.sin() / cos_lat
    } else {
        1.0
    };

    let (min_lon, max_lon) = if ratio >= 1.0 {
        (-180.0, 180.0)
    } else {
        let lon_delta = ratio.asin().to_degrees();
        (
            (longitude - lon_delta).max(-180.0),
            (longitude + lon_delta).min(180.0),
        )
    };

    BoundingBox {
        min_lat,
        max_lat,
        min_lon,
        max_lon,
    }
}
