//! Offline threshold calibration and evaluation.
//!
//! The admission threshold trades recognition of known events against
//! rejection of activities from events the model has never seen. These tools
//! measure that trade-off on held-out labelled data; picking the operating
//! point from the reports is left to a person.
//!
//! A test row counts as "known" when its label has a centroid in the fitted
//! predictor, and as "unknown" otherwise (including unlabelled rows).

use log::info;
use serde::{Deserialize, Serialize};

use crate::{EventSimilarityPredictor, LabeledFeatures, Prediction, PredictorConfig, Result};

/// Candidate thresholds swept by default.
pub const DEFAULT_THRESHOLDS: [f64; 7] = [0.10, 0.15, 0.20, 0.25, 0.30, 0.40, 0.50];

/// Configuration for a threshold sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Thresholds to evaluate, reported in this order
    pub thresholds: Vec<f64>,
    /// Minimum support used when fitting each candidate predictor. Default: 3
    pub min_samples_per_event: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
            min_samples_per_event: PredictorConfig::default().min_samples_per_event,
        }
    }
}

/// Metrics for one candidate threshold.
///
/// Rates are `None` when their denominator is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdReport {
    pub threshold: f64,
    pub known_correct: usize,
    pub known_total: usize,
    /// Fraction of known-event rows matched to their own event
    pub known_accuracy: Option<f64>,
    pub unknown_rejected: usize,
    pub unknown_total: usize,
    /// Fraction of unknown-event rows returned as unknown
    pub rejection_rate: Option<f64>,
    /// (correct matches + correct rejections) / all rows
    pub overall_accuracy: Option<f64>,
}

/// Accuracy for a single known event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBreakdown {
    pub event_name: String,
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
}

/// Full evaluation of a fitted predictor on a labelled test set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub metrics: ThresholdReport,
    pub mean_distance: Option<f64>,
    pub median_distance: Option<f64>,
    pub mean_confidence: Option<f64>,
    /// Known events present in the test set, in event name order
    pub per_event: Vec<EventBreakdown>,
}

/// Nearest-centroid distances observed for one known event's test rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceProfile {
    pub event_name: String,
    pub samples: usize,
    pub min_distance: f64,
    pub mean_distance: f64,
    pub max_distance: f64,
    pub correct: usize,
    /// Distances of the rows predicted correctly
    pub correct_distances: Vec<f64>,
    /// `(predicted event, distance)` of the rows predicted wrongly
    pub incorrect: Vec<(Option<String>, f64)>,
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

fn score(predictor: &EventSimilarityPredictor, test: &[LabeledFeatures], predictions: &[Prediction]) -> ThresholdReport {
    let mut known_correct = 0;
    let mut known_total = 0;
    let mut unknown_rejected = 0;
    let mut unknown_total = 0;

    for (row, prediction) in test.iter().zip(predictions) {
        match row.event_name.as_deref() {
            Some(actual) if predictor.is_known(actual) => {
                known_total += 1;
                if prediction.event_name.as_deref() == Some(actual) {
                    known_correct += 1;
                }
            }
            _ => {
                unknown_total += 1;
                if !prediction.is_match() {
                    unknown_rejected += 1;
                }
            }
        }
    }

    ThresholdReport {
        threshold: predictor.distance_threshold(),
        known_correct,
        known_total,
        known_accuracy: ratio(known_correct, known_total),
        unknown_rejected,
        unknown_total,
        rejection_rate: ratio(unknown_rejected, unknown_total),
        overall_accuracy: ratio(known_correct + unknown_rejected, test.len()),
    }
}

/// Fit a predictor per candidate threshold on `train` and score it on `test`.
///
/// # Example
/// ```
/// use event_matcher::{sweep_thresholds, CalibrationConfig, FeatureVector, LabeledFeatures};
///
/// let row = |id: usize, event: &str, day: f64| {
///     LabeledFeatures::new(id.to_string(), Some(event.to_string()), FeatureVector::new(day, 10.0, 7.0))
/// };
/// let train: Vec<_> = (0..4).map(|i| row(i, "Sydney 10", 135.0 + i as f64))
///     .chain((4..8).map(|i| row(i, "Cooks River", 166.0 + i as f64)))
///     .collect();
/// let test = vec![row(10, "Sydney 10", 136.0), row(11, "Never Seen", 300.0)];
///
/// let reports = sweep_thresholds(&train, &test, &CalibrationConfig::default()).unwrap();
/// assert_eq!(reports.len(), 7);
/// assert_eq!(reports[0].known_total, 1);
/// assert_eq!(reports[0].unknown_total, 1);
/// ```
pub fn sweep_thresholds(
    train: &[LabeledFeatures],
    test: &[LabeledFeatures],
    config: &CalibrationConfig,
) -> Result<Vec<ThresholdReport>> {
    let features: Vec<_> = test.iter().map(|r| r.features).collect();

    config
        .thresholds
        .iter()
        .map(|&threshold| {
            let mut predictor = EventSimilarityPredictor::new(PredictorConfig {
                distance_threshold: threshold,
                min_samples_per_event: config.min_samples_per_event,
            });
            predictor.fit(train)?;
            let predictions = predictor.predict_batch(&features)?;
            let report = score(&predictor, test, &predictions);

            info!(
                "[EventMatcher] Threshold {:.2}: known {}/{}, rejected {}/{}, overall {:.2}%",
                threshold,
                report.known_correct,
                report.known_total,
                report.unknown_rejected,
                report.unknown_total,
                report.overall_accuracy.unwrap_or(0.0) * 100.0
            );
            Ok(report)
        })
        .collect()
}

/// Evaluate a fitted predictor on a labelled test set.
pub fn evaluate(predictor: &EventSimilarityPredictor, test: &[LabeledFeatures]) -> Result<EvaluationReport> {
    let features: Vec<_> = test.iter().map(|r| r.features).collect();
    let predictions = predictor.predict_batch(&features)?;
    let metrics = score(predictor, test, &predictions);

    let distances: Vec<f64> = predictions.iter().map(|p| p.distance).collect();
    let confidences: Vec<f64> = predictions.iter().map(|p| p.confidence).collect();

    let per_event = predictor
        .centroids()?
        .keys()
        .filter_map(|event| {
            let (correct, total) = test
                .iter()
                .zip(&predictions)
                .filter(|(row, _)| row.event_name.as_deref() == Some(event.as_str()))
                .fold((0, 0), |(correct, total), (_, p)| {
                    let hit = p.event_name.as_deref() == Some(event.as_str());
                    (correct + usize::from(hit), total + 1)
                });
            (total > 0).then(|| EventBreakdown {
                event_name: event.clone(),
                correct,
                total,
                accuracy: correct as f64 / total as f64,
            })
        })
        .collect();

    Ok(EvaluationReport {
        metrics,
        mean_distance: mean(&distances),
        median_distance: median(&distances),
        mean_confidence: mean(&confidences),
        per_event,
    })
}

/// Per known event, how far its test rows landed from their nearest centroid.
pub fn distance_profile(predictor: &EventSimilarityPredictor, test: &[LabeledFeatures]) -> Result<Vec<DistanceProfile>> {
    let features: Vec<_> = test.iter().map(|r| r.features).collect();
    let predictions = predictor.predict_batch(&features)?;

    let profiles = predictor
        .centroids()?
        .keys()
        .filter_map(|event| {
            let rows: Vec<&Prediction> = test
                .iter()
                .zip(&predictions)
                .filter(|(row, _)| row.event_name.as_deref() == Some(event.as_str()))
                .map(|(_, p)| p)
                .collect();
            if rows.is_empty() {
                return None;
            }

            let distances: Vec<f64> = rows.iter().map(|p| p.distance).collect();
            let (hits, misses): (Vec<&Prediction>, Vec<&Prediction>) = rows
                .iter()
                .copied()
                .partition(|p| p.event_name.as_deref() == Some(event.as_str()));

            Some(DistanceProfile {
                event_name: event.clone(),
                samples: rows.len(),
                min_distance: distances.iter().copied().fold(f64::INFINITY, f64::min),
                mean_distance: mean(&distances).unwrap_or(0.0),
                max_distance: distances.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                correct: hits.len(),
                correct_distances: hits.iter().map(|p| p.distance).collect(),
                incorrect: misses.iter().map(|p| (p.event_name.clone(), p.distance)).collect(),
            })
        })
        .collect();

    Ok(profiles)
}
