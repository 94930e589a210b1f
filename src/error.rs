//! Error types for event matching.

use thiserror::Error;

/// Errors surfaced by feature extraction, fitting, and prediction.
///
/// Missing coordinates and under-supported events are not errors; they are
/// handled by the temporal-only distance path and by exclusion at fit time.
#[derive(Debug, Error)]
pub enum EventMatchError {
    /// A prediction or export was requested before `fit`.
    #[error("predictor has not been fitted")]
    NotFitted,

    /// The predictor was fitted but no event reached minimum support.
    #[error("no event centroids available (no event has at least {min_samples} samples)")]
    NoCentroids { min_samples: usize },

    /// Fitting was attempted on zero rows.
    #[error("cannot fit on an empty population")]
    EmptyPopulation,

    #[error("month must be in 1..=12, got {0}")]
    InvalidMonth(u32),

    #[error("hour must be in 0..=23, got {0}")]
    InvalidHour(u32),

    #[error("unrecognised timestamp {0:?}")]
    InvalidTimestamp(String),

    #[error("distance must be finite and positive, got {0}")]
    InvalidDistance(f64),

    #[error("invalid coordinates: lat={latitude}, lng={longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("distance threshold must be finite and positive, got {0}")]
    InvalidThreshold(f64),

    #[error("minimum samples per event must be at least 1")]
    InvalidMinSamples,

    #[error("test fraction must be in (0, 1), got {0}")]
    InvalidSplit(f64),

    #[error("model metadata is inconsistent: {0}")]
    InvalidMetadata(String),

    #[error("model metadata serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Crate result alias.
pub type Result<T> = std::result::Result<T, EventMatchError>;
