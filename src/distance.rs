//! Composite temporal + spatial distance between an activity and a centroid.
//!
//! The temporal part is the Euclidean distance between the standardized
//! `(day_of_year, distance_km, start_hour)` triples. When both sides have a
//! start point, the great-circle distance between them (in units of
//! [`SPATIAL_SCALE_KM`]) is blended in with equal weight. When either side
//! lacks a start point, the score is the temporal distance alone.
//!
//! The result is a ranking score, not a metric.

use crate::geo_utils::haversine_distance_km;
use crate::{FeatureNormalizer, FeatureVector};

/// Start-point drift expected between editions of the same event.
pub const SPATIAL_SCALE_KM: f64 = 10.0;

/// Weight of the temporal term when both start points are known.
pub const TEMPORAL_WEIGHT: f64 = 0.5;

/// Weight of the spatial term when both start points are known.
pub const SPATIAL_WEIGHT: f64 = 0.5;

/// Euclidean distance between the standardized temporal dimensions.
#[inline]
pub fn temporal_distance(a: &FeatureVector, b: &FeatureVector, normalizer: &FeatureNormalizer) -> f64 {
    let na = normalizer.transform(a);
    let nb = normalizer.transform(b);
    na.iter()
        .zip(nb.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Start-point distance in units of [`SPATIAL_SCALE_KM`], if both sides have one.
#[inline]
pub fn spatial_distance(a: &FeatureVector, b: &FeatureVector) -> Option<f64> {
    match (a.start, b.start) {
        (Some(pa), Some(pb)) => Some(haversine_distance_km(&pa, &pb) / SPATIAL_SCALE_KM),
        _ => None,
    }
}

/// Composite distance between a query and a centroid (lower = closer).
///
/// # Example
/// ```
/// use event_matcher::{composite_distance, FeatureNormalizer, FeatureVector, GpsPoint};
///
/// let population = vec![
///     FeatureVector::new(220.0, 14.0, 7.0),
///     FeatureVector::new(60.0, 42.0, 6.5),
/// ];
/// let normalizer = FeatureNormalizer::fit(&population).unwrap();
///
/// let start = GpsPoint::new(-33.89, 151.27);
/// let a = population[0].with_start(start);
/// assert_eq!(composite_distance(&a, &a, &normalizer), 0.0);
/// ```
pub fn composite_distance(query: &FeatureVector, centroid: &FeatureVector, normalizer: &FeatureNormalizer) -> f64 {
    let temporal = temporal_distance(query, centroid, normalizer);
    match spatial_distance(query, centroid) {
        Some(spatial) => TEMPORAL_WEIGHT * temporal + SPATIAL_WEIGHT * spatial,
        None => temporal,
    }
}
