//! Feature extraction for event similarity matching.
//!
//! Turns raw activity records into the five-dimensional [`FeatureVector`]:
//! day of year, distance in km, fractional start hour, and the optional start
//! point. Records carry either a full timestamp or month/hour parts, and a
//! distance in either kilometers or meters; both are explicit enum variants
//! resolved per record.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{EventMatchError, FeatureVector, GpsPoint, Result};

/// Representative (mid-month) day of year for each month, used when only the
/// month of an activity is known.
pub const MID_MONTH_DAY_OF_YEAR: [u32; 12] = [15, 45, 74, 105, 135, 166, 196, 227, 258, 288, 319, 349];

/// Catch-all label for activities that are not a recurring event.
pub const CATCH_ALL_EVENT: &str = "Other";

const NAIVE_TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// When an activity started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TimeSource {
    /// Full local start timestamp
    Timestamp(NaiveDateTime),
    /// Only the calendar month (1-12) and hour of day (0-23) are known
    Parts { month: u32, hour: u32 },
}

impl TimeSource {
    /// Parse a local start timestamp.
    ///
    /// Accepts RFC 3339 (the wall-clock time at the given offset is kept) and
    /// naive `YYYY-MM-DDTHH:MM:SS` / `YYYY-MM-DD HH:MM:SS` forms.
    ///
    /// ```
    /// use event_matcher::TimeSource;
    ///
    /// let t = TimeSource::parse("2024-08-11T07:30:00+10:00").unwrap();
    /// assert_eq!(t.day_of_year().unwrap(), 224);
    /// assert_eq!(t.start_hour().unwrap(), 7.5);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(TimeSource::Timestamp(dt.naive_local()));
        }
        NAIVE_TIMESTAMP_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(TimeSource::Timestamp)
            .ok_or_else(|| EventMatchError::InvalidTimestamp(s.to_string()))
    }

    /// Day of year (1-366). Month-only sources map to the mid-month day.
    pub fn day_of_year(&self) -> Result<u32> {
        match *self {
            TimeSource::Timestamp(ts) => Ok(ts.ordinal()),
            TimeSource::Parts { month, .. } => {
                if !(1..=12).contains(&month) {
                    return Err(EventMatchError::InvalidMonth(month));
                }
                Ok(MID_MONTH_DAY_OF_YEAR[month as usize - 1])
            }
        }
    }

    /// Start hour with minutes as a fraction. Hour-only sources have no fraction.
    pub fn start_hour(&self) -> Result<f64> {
        match *self {
            TimeSource::Timestamp(ts) => Ok(ts.hour() as f64 + ts.minute() as f64 / 60.0),
            TimeSource::Parts { hour, .. } => {
                if hour > 23 {
                    return Err(EventMatchError::InvalidHour(hour));
                }
                Ok(hour as f64)
            }
        }
    }
}

/// How far an activity went.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DistanceSource {
    Kilometers(f64),
    Meters(f64),
}

impl DistanceSource {
    /// Distance in kilometers; must be finite and positive.
    pub fn kilometers(&self) -> Result<f64> {
        let km = match *self {
            DistanceSource::Kilometers(km) => km,
            DistanceSource::Meters(m) => m / 1000.0,
        };
        if !km.is_finite() || km <= 0.0 {
            return Err(EventMatchError::InvalidDistance(km));
        }
        Ok(km)
    }
}

/// A raw activity record as supplied by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Unique identifier for the activity
    pub id: String,
    /// Ground-truth event label, if known
    pub event_name: Option<String>,
    pub time: TimeSource,
    pub distance: DistanceSource,
    /// Elevation gain in meters (carried through, not used for matching)
    pub elevation_gain: Option<f64>,
    /// Start coordinates, if the activity has GPS data
    pub start: Option<GpsPoint>,
    /// Activity title as entered by the athlete
    pub name: Option<String>,
}

impl ActivityRecord {
    /// Create a record with no label, elevation, start point, or name.
    pub fn new(id: impl Into<String>, time: TimeSource, distance: DistanceSource) -> Self {
        Self {
            id: id.into(),
            event_name: None,
            time,
            distance,
            elevation_gain: None,
            start: None,
            name: None,
        }
    }

    pub fn with_event(mut self, event_name: impl Into<String>) -> Self {
        self.event_name = Some(event_name.into());
        self
    }

    pub fn with_start(mut self, start: GpsPoint) -> Self {
        self.start = Some(start);
        self
    }

    /// Extract the similarity features of this record.
    pub fn extract(&self) -> Result<LabeledFeatures> {
        if let Some(start) = self.start {
            if !start.is_valid() {
                return Err(EventMatchError::InvalidCoordinates {
                    latitude: start.latitude,
                    longitude: start.longitude,
                });
            }
        }

        let features = FeatureVector {
            day_of_year: self.time.day_of_year()? as f64,
            distance_km: self.distance.kilometers()?,
            start_hour: self.time.start_hour()?,
            start: self.start,
        };

        Ok(LabeledFeatures {
            activity_id: self.id.clone(),
            event_name: self.event_name.clone(),
            features,
        })
    }
}

/// A feature vector together with the activity it came from and its label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledFeatures {
    pub activity_id: String,
    /// Ground-truth event label; `None` for unlabeled activities
    pub event_name: Option<String>,
    pub features: FeatureVector,
}

impl LabeledFeatures {
    pub fn new(activity_id: impl Into<String>, event_name: Option<String>, features: FeatureVector) -> Self {
        Self {
            activity_id: activity_id.into(),
            event_name,
            features,
        }
    }
}

/// How many rows of a table have start coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinateCoverage {
    pub with_coordinates: usize,
    pub total: usize,
}

impl CoordinateCoverage {
    /// Fraction of rows with coordinates; 0 for an empty table.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.with_coordinates as f64 / self.total as f64
        }
    }
}

/// Extracted features for a population of activities, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub rows: Vec<LabeledFeatures>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn coordinate_coverage(&self) -> CoordinateCoverage {
        CoordinateCoverage {
            with_coordinates: self.rows.iter().filter(|r| r.features.start.is_some()).count(),
            total: self.rows.len(),
        }
    }

    pub fn into_rows(self) -> Vec<LabeledFeatures> {
        self.rows
    }
}

/// Extract features for every record, failing on the first malformed one.
///
/// Low coordinate coverage is reported, never rejected.
///
/// # Example
/// ```
/// use event_matcher::{extract_features, ActivityRecord, DistanceSource, GpsPoint, TimeSource};
///
/// let records = vec![
///     ActivityRecord::new("1", TimeSource::parse("2024-08-11 07:05:00").unwrap(), DistanceSource::Meters(14_050.0))
///         .with_event("City2Surf")
///         .with_start(GpsPoint::new(-33.87, 151.21)),
///     ActivityRecord::new("2", TimeSource::Parts { month: 8, hour: 7 }, DistanceSource::Kilometers(14.1)),
/// ];
///
/// let table = extract_features(&records).unwrap();
/// assert_eq!(table.rows[1].features.day_of_year, 227.0);
/// assert_eq!(table.coordinate_coverage().with_coordinates, 1);
/// ```
pub fn extract_features(records: &[ActivityRecord]) -> Result<FeatureTable> {
    let rows = records
        .iter()
        .map(|record| {
            record.extract().map_err(|e| {
                debug!("[EventMatcher] Feature extraction failed for {}: {}", record.id, e);
                e
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let table = FeatureTable { rows };
    let coverage = table.coordinate_coverage();
    info!(
        "[EventMatcher] Extracted features for {} activities, coordinates available: {}/{} ({:.1}%)",
        table.len(),
        coverage.with_coordinates,
        coverage.total,
        coverage.ratio() * 100.0
    );

    Ok(table)
}

/// Keep only labelled rows whose label is not the catch-all category.
pub fn exclude_catch_all(rows: Vec<LabeledFeatures>, catch_all: &str) -> Vec<LabeledFeatures> {
    rows.into_iter()
        .filter(|r| matches!(r.event_name.as_deref(), Some(name) if name != catch_all))
        .collect()
}
