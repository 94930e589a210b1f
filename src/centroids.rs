//! Per-event centroids for recurring events.
//!
//! Labelled feature vectors are grouped by event; events with at least the
//! minimum support get a centroid (the per-dimension mean). Events below the
//! minimum are left out entirely and remain unknown to the model.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::geo_utils::compute_center;
use crate::{FeatureVector, GpsPoint, LabeledFeatures};

/// The typical occurrence of one recurring event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCentroid {
    pub event_name: String,
    /// Mean of each feature dimension. The start point is the mean over the
    /// samples that have coordinates, or `None` if none do.
    pub mean: FeatureVector,
    /// Number of training samples behind this centroid
    pub sample_count: usize,
    /// Sample standard deviation of distance in km (diagnostic only)
    pub std_distance_km: Option<f64>,
}

/// Build centroids for every event with at least `min_samples` labelled rows.
///
/// Unlabelled rows are ignored. The result is keyed and iterated in event
/// name order, which also fixes the nearest-centroid tie-break.
///
/// # Example
/// ```
/// use event_matcher::{build_centroids, FeatureVector, LabeledFeatures};
///
/// let row = |id: &str, event: &str| {
///     LabeledFeatures::new(id, Some(event.to_string()), FeatureVector::new(135.0, 10.0, 7.0))
/// };
/// let rows = vec![row("1", "Sydney 10"), row("2", "Sydney 10"), row("3", "Sydney 10"), row("4", "Once Off")];
///
/// let centroids = build_centroids(&rows, 3);
/// assert!(centroids.contains_key("Sydney 10"));
/// assert!(!centroids.contains_key("Once Off"));
/// ```
pub fn build_centroids(rows: &[LabeledFeatures], min_samples: usize) -> BTreeMap<String, EventCentroid> {
    let mut groups: BTreeMap<&str, Vec<&FeatureVector>> = BTreeMap::new();
    for row in rows {
        if let Some(event) = row.event_name.as_deref() {
            groups.entry(event).or_default().push(&row.features);
        }
    }

    groups
        .into_iter()
        .filter(|(_, samples)| samples.len() >= min_samples)
        .map(|(event, samples)| {
            let centroid = compute_centroid(event, &samples);
            debug!(
                "[EventMatcher] Centroid {:30} (n={:2}): day={:.0}, dist={:.1}km, hour={:.1}",
                event,
                centroid.sample_count,
                centroid.mean.day_of_year,
                centroid.mean.distance_km,
                centroid.mean.start_hour
            );
            (event.to_string(), centroid)
        })
        .collect()
}

fn compute_centroid(event: &str, samples: &[&FeatureVector]) -> EventCentroid {
    let n = samples.len() as f64;
    let mean_of = |f: fn(&FeatureVector) -> f64| samples.iter().map(|s| f(s)).sum::<f64>() / n;

    let distance_km = mean_of(|s| s.distance_km);
    let starts: Vec<GpsPoint> = samples.iter().filter_map(|s| s.start).collect();

    let std_distance_km = if samples.len() > 1 {
        let ss: f64 = samples.iter().map(|s| (s.distance_km - distance_km).powi(2)).sum();
        Some((ss / (n - 1.0)).sqrt())
    } else {
        None
    };

    EventCentroid {
        event_name: event.to_string(),
        mean: FeatureVector {
            day_of_year: mean_of(|s| s.day_of_year),
            distance_km,
            start_hour: mean_of(|s| s.start_hour),
            start: compute_center(&starts),
        },
        sample_count: samples.len(),
        std_distance_km,
    }
}
