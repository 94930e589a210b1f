//! Standard scaling of the temporal feature dimensions.
//!
//! Day of year, distance and start hour live on very different scales (hundreds
//! of days, tens of kilometers, a few hours). The normalizer maps each to zero
//! mean and unit variance over the whole training population so that a
//! Euclidean distance between them is meaningful.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{EventMatchError, FeatureVector, Result, FEATURE_NAMES};

/// Fitted per-dimension mean and scale for `(day_of_year, distance_km, start_hour)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureNormalizer {
    pub mean: [f64; 3],
    /// Population standard deviation, or 1.0 for a zero-variance column
    pub scale: [f64; 3],
}

impl FeatureNormalizer {
    /// Fit over a population of feature vectors.
    ///
    /// Uses the population standard deviation. A column with no variance gets
    /// scale 1.0, so it contributes its raw offset from the mean instead of
    /// dividing by zero.
    ///
    /// # Example
    /// ```
    /// use event_matcher::{FeatureNormalizer, FeatureVector};
    ///
    /// let rows = vec![
    ///     FeatureVector::new(100.0, 10.0, 6.0),
    ///     FeatureVector::new(200.0, 20.0, 8.0),
    /// ];
    /// let normalizer = FeatureNormalizer::fit(&rows).unwrap();
    /// assert_eq!(normalizer.transform(&rows[0]), [-1.0, -1.0, -1.0]);
    /// ```
    pub fn fit(features: &[FeatureVector]) -> Result<Self> {
        if features.is_empty() {
            return Err(EventMatchError::EmptyPopulation);
        }
        let n = features.len() as f64;

        let mut mean = [0.0; 3];
        for fv in features {
            for (m, v) in mean.iter_mut().zip(fv.temporal()) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut variance = [0.0; 3];
        for fv in features {
            for (i, v) in fv.temporal().iter().enumerate() {
                variance[i] += (v - mean[i]).powi(2);
            }
        }

        let mut scale = [1.0; 3];
        for i in 0..3 {
            let std = (variance[i] / n).sqrt();
            if is_constant(std, mean[i], n) {
                warn!(
                    "[EventMatcher] Feature '{}' has zero variance over {} rows, using scale 1.0",
                    FEATURE_NAMES[i],
                    features.len()
                );
            } else {
                scale[i] = std;
            }
        }

        Ok(Self { mean, scale })
    }

    /// Standardize the temporal dimensions of one feature vector.
    #[inline]
    pub fn transform(&self, features: &FeatureVector) -> [f64; 3] {
        let raw = features.temporal();
        [
            (raw[0] - self.mean[0]) / self.scale[0],
            (raw[1] - self.mean[1]) / self.scale[1],
            (raw[2] - self.mean[2]) / self.scale[2],
        ]
    }
}

/// Whether a column's std is indistinguishable from rounding noise.
///
/// Summing `n` copies of a value that is not exactly representable leaves an
/// error of up to `n` ulps of the mean, so the tolerance scales with both.
fn is_constant(std: f64, mean: f64, n: f64) -> bool {
    std <= f64::EPSILON * mean.abs().max(1.0) * n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_fit_population_std() {
        let rows = vec![
            FeatureVector::new(1.0, 2.0, 3.0),
            FeatureVector::new(3.0, 4.0, 5.0),
            FeatureVector::new(5.0, 6.0, 7.0),
        ];
        let normalizer = FeatureNormalizer::fit(&rows).unwrap();
        assert_eq!(normalizer.mean, [3.0, 4.0, 5.0]);
        // Population std of {-2, 0, 2} is sqrt(8/3)
        let expected = (8.0f64 / 3.0).sqrt();
        for s in normalizer.scale {
            assert!(approx_eq(s, expected, 1e-12));
        }
    }

    #[test]
    fn test_transformed_population_is_standardized() {
        let rows: Vec<FeatureVector> = (0..20)
            .map(|i| FeatureVector::new(50.0 + i as f64 * 7.0, 5.0 + (i % 4) as f64 * 3.0, 6.0 + (i % 3) as f64))
            .collect();
        let normalizer = FeatureNormalizer::fit(&rows).unwrap();

        for dim in 0..3 {
            let values: Vec<f64> = rows.iter().map(|r| normalizer.transform(r)[dim]).collect();
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
            assert!(approx_eq(mean, 0.0, 1e-9));
            assert!(approx_eq(var, 1.0, 1e-9));
        }
    }

    #[test]
    fn test_zero_variance_column_uses_unit_scale() {
        let rows = vec![
            FeatureVector::new(100.0, 5.0, 8.0),
            FeatureVector::new(200.0, 5.0, 8.0),
        ];
        let normalizer = FeatureNormalizer::fit(&rows).unwrap();
        assert_eq!(normalizer.scale[1], 1.0);
        assert_eq!(normalizer.scale[2], 1.0);

        let out = normalizer.transform(&FeatureVector::new(150.0, 7.0, 8.0));
        assert!(out.iter().all(|v| v.is_finite()));
        assert_eq!(out[1], 2.0);
        assert_eq!(out[2], 0.0);
    }

    #[test]
    fn test_unrepresentable_constant_uses_unit_scale() {
        let rows: Vec<FeatureVector> = (0..11)
            .map(|i| FeatureVector::new(200.0 + i as f64, 14.1, 7.0 + (i % 3) as f64 * 0.5))
            .collect();
        let normalizer = FeatureNormalizer::fit(&rows).unwrap();
        assert_eq!(normalizer.scale[1], 1.0);
        assert!(normalizer.scale[0] > 1.0);

        let out = normalizer.transform(&FeatureVector::new(205.0, 14.2, 7.5));
        assert!(approx_eq(out[1], 0.1, 1e-9));
    }

    #[test]
    fn test_small_real_variance_is_kept() {
        let rows = vec![
            FeatureVector::new(100.0, 10.0, 7.0),
            FeatureVector::new(200.0, 10.001, 7.0),
        ];
        let normalizer = FeatureNormalizer::fit(&rows).unwrap();
        assert!(approx_eq(normalizer.scale[1], 0.0005, 1e-9));
    }

    #[test]
    fn test_fit_empty_rejected() {
        assert!(matches!(
            FeatureNormalizer::fit(&[]),
            Err(EventMatchError::EmptyPopulation)
        ));
    }

    #[test]
    fn test_transform_ignores_coordinates() {
        let rows = vec![
            FeatureVector::new(100.0, 10.0, 6.0),
            FeatureVector::new(200.0, 20.0, 8.0),
        ];
        let normalizer = FeatureNormalizer::fit(&rows).unwrap();
        let plain = FeatureVector::new(150.0, 15.0, 7.0);
        let located = plain.with_start(crate::GpsPoint::new(-33.9, 151.2));
        assert_eq!(normalizer.transform(&plain), normalizer.transform(&located));
    }
}
