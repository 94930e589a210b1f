//! Seeded, stratified train/test split for calibration and evaluation.
//!
//! Every event with at least two samples is its own stratum, so it shows up
//! on both sides of the split. Singleton events and unlabelled rows share one
//! stratum. The shuffle is driven by a seeded RNG, so a given seed always
//! yields the same split.

use std::collections::BTreeMap;

use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::{EventMatchError, LabeledFeatures, Result};

/// Configuration for [`stratified_split`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of each stratum held out for testing. Default: 0.2
    pub test_fraction: f64,
    /// Seed for the shuffle. Default: 42
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Split rows into `(train, test)`, each in input order.
///
/// # Example
/// ```
/// use event_matcher::{stratified_split, FeatureVector, LabeledFeatures, SplitConfig};
///
/// let rows: Vec<LabeledFeatures> = (0..10)
///     .map(|i| LabeledFeatures::new(i.to_string(), Some("City2Surf".into()), FeatureVector::new(220.0, 14.0, 7.0)))
///     .collect();
///
/// let (train, test) = stratified_split(&rows, &SplitConfig::default()).unwrap();
/// assert_eq!(train.len(), 8);
/// assert_eq!(test.len(), 2);
/// ```
pub fn stratified_split(
    rows: &[LabeledFeatures],
    config: &SplitConfig,
) -> Result<(Vec<LabeledFeatures>, Vec<LabeledFeatures>)> {
    if !(config.test_fraction > 0.0 && config.test_fraction < 1.0) {
        return Err(EventMatchError::InvalidSplit(config.test_fraction));
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows {
        if let Some(event) = row.event_name.as_deref() {
            *counts.entry(event).or_default() += 1;
        }
    }

    // `None` is the shared singleton stratum
    let mut strata: BTreeMap<Option<&str>, Vec<usize>> = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        let key = row
            .event_name
            .as_deref()
            .filter(|event| counts.get(event).copied().unwrap_or(0) >= 2);
        strata.entry(key).or_default().push(i);
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut is_test = vec![false; rows.len()];

    for indices in strata.values_mut() {
        indices.shuffle(&mut rng);
        let n = indices.len();
        let mut n_test = (n as f64 * config.test_fraction).round() as usize;
        if n >= 2 {
            n_test = n_test.clamp(1, n - 1);
        }
        for &i in indices.iter().take(n_test) {
            is_test[i] = true;
        }
    }

    let (test, train): (Vec<_>, Vec<_>) = rows
        .iter()
        .zip(&is_test)
        .partition(|(_, held_out)| **held_out);
    let train: Vec<LabeledFeatures> = train.into_iter().map(|(r, _)| r.clone()).collect();
    let test: Vec<LabeledFeatures> = test.into_iter().map(|(r, _)| r.clone()).collect();

    info!(
        "[EventMatcher] Split {} rows into {} train / {} test across {} strata",
        rows.len(),
        train.len(),
        test.len(),
        strata.len()
    );

    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeatureVector;

    fn population() -> Vec<LabeledFeatures> {
        let mut rows = Vec::new();
        let mut push = |event: Option<&str>, count: usize| {
            for i in 0..count {
                let id = format!("{}-{i}", event.unwrap_or("none"));
                rows.push(LabeledFeatures::new(id, event.map(str::to_string), FeatureVector::new(i as f64 + 1.0, 10.0, 7.0)));
            }
        };
        push(Some("City2Surf"), 30);
        push(Some("Sydney Marathon"), 12);
        push(Some("Cooks River"), 3);
        push(Some("Pair"), 2);
        push(Some("Solo A"), 1);
        push(Some("Solo B"), 1);
        push(None, 3);
        rows
    }

    fn ids(rows: &[LabeledFeatures]) -> Vec<String> {
        rows.iter().map(|r| r.activity_id.clone()).collect()
    }

    #[test]
    fn test_partition_is_complete() {
        let rows = population();
        let (train, test) = stratified_split(&rows, &SplitConfig::default()).unwrap();
        assert_eq!(train.len() + test.len(), rows.len());

        let mut all = ids(&train);
        all.extend(ids(&test));
        all.sort();
        let mut expected = ids(&rows);
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_multi_sample_events_on_both_sides() {
        let rows = population();
        let (train, test) = stratified_split(&rows, &SplitConfig::default()).unwrap();

        for event in ["City2Surf", "Sydney Marathon", "Cooks River", "Pair"] {
            let in_train = train.iter().filter(|r| r.event_name.as_deref() == Some(event)).count();
            let in_test = test.iter().filter(|r| r.event_name.as_deref() == Some(event)).count();
            assert!(in_train >= 1, "{event} missing from train");
            assert!(in_test >= 1, "{event} missing from test");
        }

        let c2s_test = test.iter().filter(|r| r.event_name.as_deref() == Some("City2Surf")).count();
        assert_eq!(c2s_test, 6);
    }

    #[test]
    fn test_same_seed_same_split() {
        let rows = population();
        let config = SplitConfig { test_fraction: 0.3, seed: 7 };
        let (train_a, test_a) = stratified_split(&rows, &config).unwrap();
        let (train_b, test_b) = stratified_split(&rows, &config).unwrap();
        assert_eq!(ids(&train_a), ids(&train_b));
        assert_eq!(ids(&test_a), ids(&test_b));
    }

    #[test]
    fn test_preserves_input_order() {
        let rows = population();
        let (train, _) = stratified_split(&rows, &SplitConfig::default()).unwrap();
        let positions: Vec<usize> = train
            .iter()
            .map(|r| rows.iter().position(|x| x.activity_id == r.activity_id).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_invalid_fraction() {
        let rows = population();
        for fraction in [0.0, 1.0, -0.1, f64::NAN] {
            let config = SplitConfig { test_fraction: fraction, seed: 42 };
            assert!(matches!(
                stratified_split(&rows, &config),
                Err(EventMatchError::InvalidSplit(_))
            ));
        }
    }
}
