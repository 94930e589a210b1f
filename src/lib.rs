//! # Event Matcher
//!
//! Nearest-centroid matching of GPS-tracked race activities to known recurring events.
//!
//! This library provides:
//! - Feature extraction from activity records (day of year, distance, start time, start point)
//! - A composite temporal + spatial distance for comparing activities to event centroids
//! - An open-world predictor that answers "which recurring event is this?" or "unknown"
//! - Offline threshold calibration against held-out labelled activities
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel batch prediction with rayon
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use event_matcher::{EventSimilarityPredictor, FeatureVector, GpsPoint, LabeledFeatures, PredictorConfig};
//!
//! let start = GpsPoint::new(-33.89, 151.27);
//! let training: Vec<LabeledFeatures> = (0..5)
//!     .map(|i| LabeledFeatures::new(
//!         format!("a-{i}"),
//!         Some("City2Surf".to_string()),
//!         FeatureVector::new(219.0 + i as f64, 14.0, 7.0 + i as f64 * 0.1).with_start(start),
//!     ))
//!     .chain((0..5).map(|i| LabeledFeatures::new(
//!         format!("b-{i}"),
//!         Some("Sydney Marathon".to_string()),
//!         FeatureVector::new(58.0 + i as f64, 42.2, 6.5).with_start(GpsPoint::new(-33.85, 151.21)),
//!     )))
//!     .collect();
//!
//! let mut predictor = EventSimilarityPredictor::new(PredictorConfig::default());
//! predictor.fit(&training).unwrap();
//!
//! let query = FeatureVector::new(221.0, 14.1, 7.1).with_start(GpsPoint::new(-33.891, 151.271));
//! let prediction = predictor.predict(&query).unwrap();
//! assert_eq!(prediction.event_name.as_deref(), Some("City2Surf"));
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{EventMatchError, Result};

pub mod geo_utils;

// Feature extraction from raw activity records
pub mod features;
pub use features::{
    extract_features, exclude_catch_all, ActivityRecord, DistanceSource, FeatureTable,
    LabeledFeatures, TimeSource,
};

pub mod normalizer;
pub use normalizer::FeatureNormalizer;

pub mod centroids;
pub use centroids::{build_centroids, EventCentroid};

pub mod distance;
pub use distance::composite_distance;

pub mod predictor;
pub use predictor::EventSimilarityPredictor;

// Offline threshold tuning and evaluation
pub mod calibration;
pub use calibration::{
    distance_profile, evaluate, sweep_thresholds, CalibrationConfig, EvaluationReport,
    ThresholdReport,
};

pub mod split;
pub use split::{stratified_split, SplitConfig};

pub mod model;
pub use model::ModelMetadata;

// ============================================================================
// Core Types
// ============================================================================

/// Feature names in the fixed order used by [`FeatureVector`] and model metadata.
pub const FEATURE_NAMES: [&str; 5] = [
    "day_of_year",
    "distance_km",
    "start_hour",
    "start_lat",
    "start_lng",
];

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use event_matcher::GpsPoint;
/// let point = GpsPoint::new(-33.8915, 151.2767); // Bondi
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// The similarity feature vector of one activity (or of an event centroid).
///
/// The three temporal dimensions are always present. The start point is
/// either fully present or absent; a missing start point is never zero-filled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Day of year, 1-366 for extracted activities (fractional for centroids)
    pub day_of_year: f64,
    /// Activity distance in kilometers
    pub distance_km: f64,
    /// Start time as fractional hour of day, in [0, 24)
    pub start_hour: f64,
    /// Start coordinates, if the activity has GPS data
    pub start: Option<GpsPoint>,
}

impl FeatureVector {
    /// Create a feature vector without a start point.
    pub fn new(day_of_year: f64, distance_km: f64, start_hour: f64) -> Self {
        Self {
            day_of_year,
            distance_km,
            start_hour,
            start: None,
        }
    }

    /// Attach a start point.
    pub fn with_start(mut self, start: GpsPoint) -> Self {
        self.start = Some(start);
        self
    }

    /// Drop the start point, leaving only the temporal dimensions.
    pub fn without_start(mut self) -> Self {
        self.start = None;
        self
    }

    /// The three non-spatial dimensions, in [`FEATURE_NAMES`] order.
    #[inline]
    pub fn temporal(&self) -> [f64; 3] {
        [self.day_of_year, self.distance_km, self.start_hour]
    }
}

/// Result of matching one activity against the known event centroids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Matched event, or `None` when the nearest centroid is beyond the threshold
    pub event_name: Option<String>,
    /// Composite distance to the nearest centroid (lower = closer)
    pub distance: f64,
    /// `1 - distance / threshold` for a match, `0.0` for unknown
    pub confidence: f64,
}

impl Prediction {
    /// Whether the activity was admitted as a known event.
    pub fn is_match(&self) -> bool {
        self.event_name.is_some()
    }
}

/// Configuration for the event similarity predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Maximum composite distance for a nearest-centroid match to be accepted.
    /// Default: 0.40 (chosen by threshold calibration)
    pub distance_threshold: f64,

    /// Minimum number of labelled samples before an event gets a centroid.
    /// Events below this are always predicted as unknown. Default: 3
    pub min_samples_per_event: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 0.40,
            min_samples_per_event: 3,
        }
    }
}

impl PredictorConfig {
    /// Same defaults with a different admission threshold.
    pub fn with_threshold(distance_threshold: f64) -> Self {
        Self {
            distance_threshold,
            ..Self::default()
        }
    }

    /// Reject thresholds that cannot gate a match and a zero minimum support.
    pub fn validate(&self) -> Result<()> {
        if !self.distance_threshold.is_finite() || self.distance_threshold <= 0.0 {
            return Err(EventMatchError::InvalidThreshold(self.distance_threshold));
        }
        if self.min_samples_per_event == 0 {
            return Err(EventMatchError::InvalidMinSamples);
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(-33.89, 151.27).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_feature_vector_start_is_joint() {
        let fv = FeatureVector::new(220.0, 14.0, 7.0);
        assert!(fv.start.is_none());

        let fv = fv.with_start(GpsPoint::new(-33.89, 151.27));
        assert_eq!(fv.start, Some(GpsPoint::new(-33.89, 151.27)));
        assert_eq!(fv.temporal(), [220.0, 14.0, 7.0]);
        assert!(fv.without_start().start.is_none());
    }

    #[test]
    fn test_default_config() {
        let config = PredictorConfig::default();
        assert_eq!(config.distance_threshold, 0.40);
        assert_eq!(config.min_samples_per_event, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(matches!(
            PredictorConfig::with_threshold(0.0).validate(),
            Err(EventMatchError::InvalidThreshold(_))
        ));
        assert!(matches!(
            PredictorConfig::with_threshold(f64::NAN).validate(),
            Err(EventMatchError::InvalidThreshold(_))
        ));

        let config = PredictorConfig {
            min_samples_per_event: 0,
            ..PredictorConfig::default()
        };
        assert!(matches!(config.validate(), Err(EventMatchError::InvalidMinSamples)));
    }

    #[test]
    fn test_feature_names_order() {
        assert_eq!(FEATURE_NAMES[0], "day_of_year");
        assert_eq!(FEATURE_NAMES[4], "start_lng");
    }
}
