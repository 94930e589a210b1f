//! Nearest-centroid event predictor with an open-world "unknown" outcome.
//!
//! A predictor is constructed with a [`PredictorConfig`], fitted once on a
//! labelled training population, and is read-only afterwards. Share a fitted
//! predictor between threads behind an `Arc`; re-fitting needs `&mut self`.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::distance::composite_distance;
use crate::{
    build_centroids, EventCentroid, EventMatchError, FeatureNormalizer, FeatureVector, LabeledFeatures,
    Prediction, PredictorConfig, Result,
};

/// Normalizer and centroids produced together by one `fit`.
#[derive(Debug, Clone, PartialEq)]
struct FittedState {
    normalizer: FeatureNormalizer,
    centroids: BTreeMap<String, EventCentroid>,
}

/// Matches activities to the nearest known event centroid, or to nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSimilarityPredictor {
    config: PredictorConfig,
    fitted: Option<FittedState>,
}

impl EventSimilarityPredictor {
    /// Create an unfitted predictor.
    pub fn new(config: PredictorConfig) -> Self {
        Self { config, fitted: None }
    }

    /// Rebuild a fitted predictor from previously computed parameters.
    pub(crate) fn from_parts(
        config: PredictorConfig,
        normalizer: FeatureNormalizer,
        centroids: BTreeMap<String, EventCentroid>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fitted: Some(FittedState { normalizer, centroids }),
        })
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn distance_threshold(&self) -> f64 {
        self.config.distance_threshold
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Fit centroids and the normalizer on a training population.
    ///
    /// Centroids come from labelled rows only; the normalizer sees every row.
    /// Any previous fit is replaced. Both parts are computed before either is
    /// stored, so a failed fit leaves the previous state untouched.
    pub fn fit(&mut self, rows: &[LabeledFeatures]) -> Result<()> {
        self.config.validate()?;
        if rows.is_empty() {
            return Err(EventMatchError::EmptyPopulation);
        }

        let centroids = build_centroids(rows, self.config.min_samples_per_event);
        let features: Vec<FeatureVector> = rows.iter().map(|r| r.features).collect();
        let normalizer = FeatureNormalizer::fit(&features)?;

        if centroids.is_empty() {
            warn!(
                "[EventMatcher] No event has {}+ samples; every prediction will fail until re-fit",
                self.config.min_samples_per_event
            );
        }
        info!(
            "[EventMatcher] Fitted scaler on {} activities, learned {} event centroids",
            rows.len(),
            centroids.len()
        );

        self.fitted = Some(FittedState { normalizer, centroids });
        Ok(())
    }

    fn state(&self) -> Result<&FittedState> {
        self.fitted.as_ref().ok_or(EventMatchError::NotFitted)
    }

    /// Centroids in event name order.
    pub fn centroids(&self) -> Result<&BTreeMap<String, EventCentroid>> {
        Ok(&self.state()?.centroids)
    }

    pub fn normalizer(&self) -> Result<&FeatureNormalizer> {
        Ok(&self.state()?.normalizer)
    }

    /// Whether `event_name` has a centroid. False before `fit`.
    pub fn is_known(&self, event_name: &str) -> bool {
        self.fitted
            .as_ref()
            .is_some_and(|s| s.centroids.contains_key(event_name))
    }

    /// The nearest centroid and its distance, ignoring the threshold.
    ///
    /// Ties go to the centroid with the lexicographically smallest event name.
    pub fn nearest(&self, query: &FeatureVector) -> Result<(&EventCentroid, f64)> {
        let state = self.state()?;

        let mut best: Option<(&EventCentroid, f64)> = None;
        for centroid in state.centroids.values() {
            let d = composite_distance(query, &centroid.mean, &state.normalizer);
            if best.map_or(true, |(_, best_d)| d < best_d || best_d.is_nan()) {
                best = Some((centroid, d));
            }
        }

        best.ok_or(EventMatchError::NoCentroids {
            min_samples: self.config.min_samples_per_event,
        })
    }

    /// Predict the event of one activity.
    ///
    /// Returns the nearest event with `confidence = 1 - distance / threshold`
    /// when the distance is within the threshold, otherwise `None` with
    /// confidence 0.
    pub fn predict(&self, query: &FeatureVector) -> Result<Prediction> {
        let (centroid, distance) = self.nearest(query)?;
        let threshold = self.config.distance_threshold;

        let prediction = if distance <= threshold {
            Prediction {
                event_name: Some(centroid.event_name.clone()),
                distance,
                confidence: 1.0 - distance / threshold,
            }
        } else {
            Prediction {
                event_name: None,
                distance,
                confidence: 0.0,
            }
        };

        debug!(
            "[EventMatcher] Nearest {} at {:.3} -> {:?}",
            centroid.event_name, distance, prediction.event_name
        );
        Ok(prediction)
    }

    /// Predict each activity independently; output order matches input order.
    pub fn predict_batch(&self, queries: &[FeatureVector]) -> Result<Vec<Prediction>> {
        self.state()?;
        queries.iter().map(|q| self.predict(q)).collect()
    }

    /// Same as [`predict_batch`](Self::predict_batch) but spread over rayon's
    /// thread pool. Recommended for large batches.
    #[cfg(feature = "parallel")]
    pub fn predict_batch_parallel(&self, queries: &[FeatureVector]) -> Result<Vec<Prediction>> {
        use rayon::prelude::*;

        self.state()?;
        queries.par_iter().map(|q| self.predict(q)).collect()
    }
}
