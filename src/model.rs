//! Persisted description of a fitted predictor.
//!
//! The metadata is plain JSON: feature names, threshold, minimum support, the
//! centroid table, and the normalizer parameters. It is enough to inspect a
//! model by eye and to rebuild an identical predictor without re-training.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    EventCentroid, EventMatchError, EventSimilarityPredictor, FeatureNormalizer, FeatureVector, GpsPoint,
    PredictorConfig, Result, FEATURE_NAMES,
};

pub const MODEL_TYPE: &str = "event_similarity_predictor";
pub const MODEL_VERSION: &str = "1.0.0";

/// One row of the centroid table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidMetadata {
    pub day_of_year: f64,
    pub distance_km: f64,
    pub start_hour: f64,
    pub start_lat: Option<f64>,
    pub start_lng: Option<f64>,
    pub sample_count: usize,
    pub std_distance: Option<f64>,
}

/// Fitted normalizer parameters, per temporal feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerMetadata {
    pub mean: [f64; 3],
    pub scale: [f64; 3],
}

/// Serializable description of a fitted [`EventSimilarityPredictor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_type: String,
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub features: Vec<String>,
    pub num_known_events: usize,
    pub known_events: Vec<String>,
    pub distance_threshold: f64,
    pub min_samples_per_event: usize,
    pub centroids: BTreeMap<String, CentroidMetadata>,
    pub scaler: ScalerMetadata,
}

impl From<&EventCentroid> for CentroidMetadata {
    fn from(c: &EventCentroid) -> Self {
        Self {
            day_of_year: c.mean.day_of_year,
            distance_km: c.mean.distance_km,
            start_hour: c.mean.start_hour,
            start_lat: c.mean.start.map(|p| p.latitude),
            start_lng: c.mean.start.map(|p| p.longitude),
            sample_count: c.sample_count,
            std_distance: c.std_distance_km,
        }
    }
}

impl CentroidMetadata {
    fn to_centroid(&self, event_name: &str) -> Result<EventCentroid> {
        let start = match (self.start_lat, self.start_lng) {
            (Some(lat), Some(lng)) => Some(GpsPoint::new(lat, lng)),
            (None, None) => None,
            _ => {
                return Err(EventMatchError::InvalidMetadata(format!(
                    "centroid {event_name:?} has only one of start_lat/start_lng"
                )))
            }
        };

        Ok(EventCentroid {
            event_name: event_name.to_string(),
            mean: FeatureVector {
                day_of_year: self.day_of_year,
                distance_km: self.distance_km,
                start_hour: self.start_hour,
                start,
            },
            sample_count: self.sample_count,
            std_distance_km: self.std_distance,
        })
    }
}

impl ModelMetadata {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl EventSimilarityPredictor {
    /// Describe this fitted predictor for export.
    pub fn to_metadata(&self) -> Result<ModelMetadata> {
        let centroids = self.centroids()?;
        let normalizer = self.normalizer()?;

        Ok(ModelMetadata {
            model_type: MODEL_TYPE.to_string(),
            version: MODEL_VERSION.to_string(),
            trained_at: Utc::now(),
            features: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            num_known_events: centroids.len(),
            known_events: centroids.keys().cloned().collect(),
            distance_threshold: self.config().distance_threshold,
            min_samples_per_event: self.config().min_samples_per_event,
            centroids: centroids
                .iter()
                .map(|(name, c)| (name.clone(), CentroidMetadata::from(c)))
                .collect(),
            scaler: ScalerMetadata {
                mean: normalizer.mean,
                scale: normalizer.scale,
            },
        })
    }

    /// Rebuild a fitted predictor from exported metadata.
    ///
    /// # Example
    /// ```
    /// use event_matcher::{EventSimilarityPredictor, FeatureVector, LabeledFeatures, ModelMetadata, PredictorConfig};
    ///
    /// let rows: Vec<LabeledFeatures> = (0..3)
    ///     .map(|i| LabeledFeatures::new(i.to_string(), Some("Sydney 10".into()), FeatureVector::new(135.0 + i as f64, 10.0, 7.0)))
    ///     .collect();
    /// let mut predictor = EventSimilarityPredictor::new(PredictorConfig::default());
    /// predictor.fit(&rows).unwrap();
    ///
    /// let json = predictor.to_metadata().unwrap().to_json().unwrap();
    /// let reloaded = EventSimilarityPredictor::from_metadata(&ModelMetadata::from_json(&json).unwrap()).unwrap();
    ///
    /// let query = FeatureVector::new(136.0, 10.0, 7.0);
    /// assert_eq!(reloaded.predict(&query).unwrap(), predictor.predict(&query).unwrap());
    /// ```
    pub fn from_metadata(metadata: &ModelMetadata) -> Result<Self> {
        if metadata.model_type != MODEL_TYPE {
            return Err(EventMatchError::InvalidMetadata(format!(
                "expected model type {MODEL_TYPE:?}, got {:?}",
                metadata.model_type
            )));
        }
        if metadata.features != FEATURE_NAMES {
            return Err(EventMatchError::InvalidMetadata(format!(
                "unexpected feature list {:?}",
                metadata.features
            )));
        }
        if metadata.scaler.scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(EventMatchError::InvalidMetadata(
                "scaler scale must be finite and positive".to_string(),
            ));
        }

        if !metadata.known_events.iter().eq(metadata.centroids.keys()) {
            return Err(EventMatchError::InvalidMetadata(format!(
                "known_events {:?} do not match the centroid table",
                metadata.known_events
            )));
        }
        if metadata.num_known_events != metadata.centroids.len() {
            return Err(EventMatchError::InvalidMetadata(format!(
                "num_known_events is {} but {} centroids are present",
                metadata.num_known_events,
                metadata.centroids.len()
            )));
        }

        let centroids = metadata
            .centroids
            .iter()
            .map(|(name, c)| Ok((name.clone(), c.to_centroid(name)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        let config = PredictorConfig {
            distance_threshold: metadata.distance_threshold,
            min_samples_per_event: metadata.min_samples_per_event,
        };
        let normalizer = FeatureNormalizer {
            mean: metadata.scaler.mean,
            scale: metadata.scaler.scale,
        };

        EventSimilarityPredictor::from_parts(config, normalizer, centroids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LabeledFeatures;

    fn fitted() -> EventSimilarityPredictor {
        let mut rows = Vec::new();
        for i in 0..4 {
            let j = i as f64;
            rows.push(LabeledFeatures::new(
                format!("c{i}"),
                Some("City2Surf".to_string()),
                FeatureVector::new(223.0 + j, 14.0 + j * 0.1, 7.2).with_start(GpsPoint::new(-33.87, 151.21)),
            ));
            rows.push(LabeledFeatures::new(
                format!("s{i}"),
                Some("Sydney 10".to_string()),
                FeatureVector::new(136.0 + j, 10.0, 7.0),
            ));
        }
        rows.push(LabeledFeatures::new(
            "x",
            Some("Once Off".to_string()),
            FeatureVector::new(300.0, 21.1, 6.0),
        ));

        let mut predictor = EventSimilarityPredictor::new(PredictorConfig::default());
        predictor.fit(&rows).unwrap();
        predictor
    }

    #[test]
    fn test_metadata_contents() {
        let metadata = fitted().to_metadata().unwrap();
        assert_eq!(metadata.model_type, "event_similarity_predictor");
        assert_eq!(
            metadata.features,
            vec!["day_of_year", "distance_km", "start_hour", "start_lat", "start_lng"]
        );
        assert_eq!(metadata.known_events, vec!["City2Surf", "Sydney 10"]);
        assert_eq!(metadata.num_known_events, 2);
        assert_eq!(metadata.distance_threshold, 0.40);
        assert_eq!(metadata.min_samples_per_event, 3);
        assert_eq!(metadata.centroids["City2Surf"].sample_count, 4);
    }

    #[test]
    fn test_missing_coordinates_serialize_as_null() {
        let json = fitted().to_metadata().unwrap().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["centroids"]["Sydney 10"]["start_lat"].is_null());
        assert!(value["centroids"]["City2Surf"]["start_lat"].is_f64());
    }

    #[test]
    fn test_reload_predicts_identically() {
        let predictor = fitted();
        let json = predictor.to_metadata().unwrap().to_json().unwrap();
        let reloaded = EventSimilarityPredictor::from_metadata(&ModelMetadata::from_json(&json).unwrap()).unwrap();

        let queries = vec![
            FeatureVector::new(224.0, 14.1, 7.2).with_start(GpsPoint::new(-33.871, 151.211)),
            FeatureVector::new(137.0, 10.0, 7.0),
            FeatureVector::new(10.0, 3.0, 18.0),
        ];
        assert_eq!(
            reloaded.predict_batch(&queries).unwrap(),
            predictor.predict_batch(&queries).unwrap()
        );
    }

    #[test]
    fn test_export_requires_fit() {
        let predictor = EventSimilarityPredictor::new(PredictorConfig::default());
        assert!(matches!(predictor.to_metadata(), Err(EventMatchError::NotFitted)));
    }

    #[test]
    fn test_reject_half_coordinates() {
        let mut metadata = fitted().to_metadata().unwrap();
        if let Some(c) = metadata.centroids.get_mut("City2Surf") {
            c.start_lng = None;
        }
        assert!(matches!(
            EventSimilarityPredictor::from_metadata(&metadata),
            Err(EventMatchError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_reject_inconsistent_event_list() {
        let mut metadata = fitted().to_metadata().unwrap();
        metadata.known_events.push("Once Off".to_string());
        assert!(matches!(
            EventSimilarityPredictor::from_metadata(&metadata),
            Err(EventMatchError::InvalidMetadata(_))
        ));

        let mut metadata = fitted().to_metadata().unwrap();
        metadata.known_events.reverse();
        assert!(EventSimilarityPredictor::from_metadata(&metadata).is_err());

        let mut metadata = fitted().to_metadata().unwrap();
        metadata.num_known_events = 3;
        assert!(matches!(
            EventSimilarityPredictor::from_metadata(&metadata),
            Err(EventMatchError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_reject_wrong_model_type() {
        let mut metadata = fitted().to_metadata().unwrap();
        metadata.model_type = "parkrun_classifier".to_string();
        assert!(EventSimilarityPredictor::from_metadata(&metadata).is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            ModelMetadata::from_json("{\"model_type\": 3}"),
            Err(EventMatchError::Serialization(_))
        ));
    }
}
