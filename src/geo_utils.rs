//! # Geographic Utilities
//!
//! Geographic primitives used by the composite distance and the centroid builder.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance_km`] | Great-circle distance between two GPS points |
//! | [`compute_center`] | Arithmetic mean of a set of start points |
//!
//! ## Example
//!
//! ```rust
//! use event_matcher::{GpsPoint, geo_utils};
//!
//! let bondi = GpsPoint::new(-33.8915, 151.2767);
//! let manly = GpsPoint::new(-33.7969, 151.2840);
//!
//! let km = geo_utils::haversine_distance_km(&bondi, &manly);
//! assert!(km > 10.0 && km < 11.0);
//! ```
//!
//! ## Algorithm Notes
//!
//! The haversine formula gives the great-circle distance on a sphere. The
//! radius is fixed at 6,371 km. Inputs are WGS84 degrees; NaN inputs propagate
//! to a NaN result, so callers check for missing coordinates first.

use crate::GpsPoint;

/// Earth radius used by [`haversine_distance_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two GPS points in kilometers.
///
/// # Example
///
/// ```rust
/// use event_matcher::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance_km(&london, &paris);
/// assert!((distance - 343.5).abs() < 1.0);
/// ```
#[inline]
pub fn haversine_distance_km(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlng = (p2.longitude - p1.longitude).to_radians();

    // Rounding can push `a` just past 1.0 for antipodal points
    let a = ((dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2)).clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

// =============================================================================
// Center/Centroid Functions
// =============================================================================

/// Compute the arithmetic mean of a set of GPS points.
///
/// Returns `None` for empty input rather than a fabricated (0, 0).
///
/// # Notes
///
/// Plain averaging is fine for the start points of a single event, which sit
/// within a few kilometers of each other. It is not a spherical centroid and
/// breaks down across the antimeridian.
///
/// # Example
///
/// ```rust
/// use event_matcher::{GpsPoint, geo_utils};
///
/// let starts = vec![
///     GpsPoint::new(-33.88, 151.20),
///     GpsPoint::new(-33.90, 151.22),
/// ];
///
/// let center = geo_utils::compute_center(&starts).unwrap();
/// assert!((center.latitude - (-33.89)).abs() < 1e-9);
/// assert!((center.longitude - 151.21).abs() < 1e-9);
/// ```
pub fn compute_center(points: &[GpsPoint]) -> Option<GpsPoint> {
    if points.is_empty() {
        return None;
    }

    let sum_lat: f64 = points.iter().map(|p| p.latitude).sum();
    let sum_lng: f64 = points.iter().map(|p| p.longitude).sum();
    let n = points.len() as f64;

    Some(GpsPoint::new(sum_lat / n, sum_lng / n))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_same_point() {
        let p = GpsPoint::new(-33.89, 151.27);
        assert_eq!(haversine_distance_km(&p, &p), 0.0);
    }

    #[test]
    fn test_haversine_known_value() {
        // London to Paris is approximately 344 km
        let london = GpsPoint::new(51.5074, -0.1278);
        let paris = GpsPoint::new(48.8566, 2.3522);
        assert!(approx_eq(haversine_distance_km(&london, &paris), 343.5, 1.0));
    }

    #[test]
    fn test_haversine_symmetric() {
        let a = GpsPoint::new(-33.89, 151.27);
        let b = GpsPoint::new(-33.85, 151.21);
        assert!(approx_eq(
            haversine_distance_km(&a, &b),
            haversine_distance_km(&b, &a),
            1e-12
        ));
    }

    #[test]
    fn test_haversine_matches_geo_crate() {
        use geo::{Distance, Haversine, Point};

        let a = GpsPoint::new(-33.89, 151.27);
        let b = GpsPoint::new(-33.85, 151.21);
        let ours = haversine_distance_km(&a, &b);
        let theirs = Haversine::distance(
            Point::new(a.longitude, a.latitude),
            Point::new(b.longitude, b.latitude),
        ) / 1000.0;

        // geo uses the mean radius 6371.0088 km
        assert!(approx_eq(ours, theirs, 1e-3));
    }

    #[test]
    fn test_haversine_nan_propagates() {
        let a = GpsPoint::new(f64::NAN, 151.27);
        let b = GpsPoint::new(-33.85, 151.21);
        assert!(haversine_distance_km(&a, &b).is_nan());
    }

    #[test]
    fn test_haversine_antipodal_is_half_circumference() {
        let p = GpsPoint::new(-68.01722417252863, -168.8381863169374);
        let antipode = GpsPoint::new(-p.latitude, p.longitude + 180.0);
        let d = haversine_distance_km(&p, &antipode);
        assert!(d.is_finite());
        assert!(approx_eq(d, std::f64::consts::PI * EARTH_RADIUS_KM, 1e-3));
    }

    #[test]
    fn test_compute_center() {
        let points = vec![GpsPoint::new(51.50, -0.10), GpsPoint::new(51.52, -0.12)];
        let center = compute_center(&points).unwrap();
        assert!(approx_eq(center.latitude, 51.51, 0.001));
        assert!(approx_eq(center.longitude, -0.11, 0.001));
    }

    #[test]
    fn test_compute_center_empty() {
        assert!(compute_center(&[]).is_none());
    }
}
