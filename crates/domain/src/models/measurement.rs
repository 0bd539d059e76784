//! Measurement domain model.
//!
//! A measurement row doubles as a survey point: the sequencer inserts
//! placeholders carrying only `area_id`/`point_id`, and completion or skip
//! fills them in place.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Value written to every metric of a skipped point.
pub const SKIP_SENTINEL: f64 = -1.0;

/// The six soil metrics tracked per reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Temperature,
    Moisture,
    Ph,
    Nitrogen,
    Phosphorus,
    Potassium,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Temperature,
        Metric::Moisture,
        Metric::Ph,
        Metric::Nitrogen,
        Metric::Phosphorus,
        Metric::Potassium,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Moisture => "moisture",
            Metric::Ph => "ph",
            Metric::Nitrogen => "nitrogen",
            Metric::Phosphorus => "phosphorus",
            Metric::Potassium => "potassium",
        }
    }
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounds a coordinate to eight decimal places.
pub fn round_coordinate(value: f64) -> f64 {
    (value * 1e8).round() / 1e8
}

/// Metric values of one reading. Missing metrics are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricValues {
    pub temperature: Option<f64>,
    pub moisture: Option<f64>,
    pub ph: Option<f64>,
    pub nitrogen: Option<f64>,
    pub phosphorus: Option<f64>,
    pub potassium: Option<f64>,
}

impl MetricValues {
    /// The all-sentinel marker stored on skipped points.
    pub fn skipped() -> Self {
        Self {
            temperature: Some(SKIP_SENTINEL),
            moisture: Some(SKIP_SENTINEL),
            ph: Some(SKIP_SENTINEL),
            nitrogen: Some(SKIP_SENTINEL),
            phosphorus: Some(SKIP_SENTINEL),
            potassium: Some(SKIP_SENTINEL),
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Moisture => self.moisture,
            Metric::Ph => self.ph,
            Metric::Nitrogen => self.nitrogen,
            Metric::Phosphorus => self.phosphorus,
            Metric::Potassium => self.potassium,
        }
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        let slot = match metric {
            Metric::Temperature => &mut self.temperature,
            Metric::Moisture => &mut self.moisture,
            Metric::Ph => &mut self.ph,
            Metric::Nitrogen => &mut self.nitrogen,
            Metric::Phosphorus => &mut self.phosphorus,
            Metric::Potassium => &mut self.potassium,
        };
        *slot = value;
    }

    /// True when every metric holds the skip sentinel.
    pub fn is_skip_marker(&self) -> bool {
        Metric::ALL
            .iter()
            .all(|m| self.get(*m) == Some(SKIP_SENTINEL))
    }

    /// True when all six metrics are present.
    pub fn is_complete(&self) -> bool {
        Metric::ALL.iter().all(|m| self.get(*m).is_some())
    }

    pub fn is_empty(&self) -> bool {
        Metric::ALL.iter().all(|m| self.get(*m).is_none())
    }

    /// Coalesce merge: values present in `self` win, gaps are filled from `base`.
    pub fn or(self, base: &MetricValues) -> MetricValues {
        let mut merged = self;
        for metric in Metric::ALL {
            if merged.get(metric).is_none() {
                merged.set(metric, base.get(metric));
            }
        }
        merged
    }

    /// Returns a copy with every present value rounded to two decimals.
    pub fn rounded(self) -> MetricValues {
        let mut out = self;
        for metric in Metric::ALL {
            out.set(metric, self.get(metric).map(round2));
        }
        out
    }
}

/// Lifecycle state of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointStatus {
    Unmeasured,
    Measured,
    Skipped,
}

/// Represents a stored measurement (or point placeholder).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub measurement_id: i64,
    pub area_id: Option<Uuid>,
    pub device_id: Option<String>,
    pub point_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(flatten)]
    pub values: MetricValues,
    pub measurement_date: Option<NaiveDate>,
    pub measurement_time: Option<NaiveTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Measurement {
    /// A row is visited once its date is set; the sentinel marker tells skips apart.
    pub fn status(&self) -> PointStatus {
        if self.measurement_date.is_none() {
            PointStatus::Unmeasured
        } else if self.values.is_skip_marker() {
            PointStatus::Skipped
        } else {
            PointStatus::Measured
        }
    }

    pub fn is_point(&self) -> bool {
        self.point_id.is_some()
    }
}

/// Data for inserting a measurement row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewMeasurement {
    pub area_id: Option<Uuid>,
    pub device_id: Option<String>,
    pub point_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub values: MetricValues,
    pub measurement_date: Option<NaiveDate>,
    pub measurement_time: Option<NaiveTime>,
}

impl NewMeasurement {
    /// An unmeasured point placeholder.
    pub fn placeholder(area_id: Uuid, point_id: impl Into<String>) -> Self {
        Self {
            area_id: Some(area_id),
            point_id: Some(point_id.into()),
            ..Default::default()
        }
    }
}

/// Values written onto an unmeasured point by completion or skip.
///
/// Metric fields are coalesced over whatever the placeholder already holds.
#[derive(Debug, Clone, PartialEq)]
pub struct PointReading {
    pub device_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub values: MetricValues,
    pub measurement_date: NaiveDate,
    pub measurement_time: NaiveTime,
}

/// Partial update of a measurement. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementPatch {
    pub area_id: Option<Uuid>,
    pub device_id: Option<String>,
    pub point_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub values: MetricValues,
    pub measurement_date: Option<NaiveDate>,
    pub measurement_time: Option<NaiveTime>,
}

/// Filter for listing free measurements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurementFilter {
    pub area_id: Option<Uuid>,
    pub device_id: Option<String>,
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Request payload for completing a point.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteMeasurementRequest {
    #[validate(custom(function = "shared::validation::validate_temperature"))]
    pub temperature: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_moisture"))]
    pub moisture: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_ph"))]
    pub ph: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_nutrient"))]
    pub nitrogen: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_nutrient"))]
    pub phosphorus: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_nutrient"))]
    pub potassium: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: Option<f64>,

    #[validate(length(min = 1, max = 64, message = "Device ID must be 1-64 characters"))]
    pub device_id: Option<String>,

    pub measurement_date: Option<NaiveDate>,

    pub measurement_time: Option<NaiveTime>,

    /// Return the next unmeasured point along with the result.
    #[serde(default)]
    pub auto_advance: bool,
}

impl CompleteMeasurementRequest {
    pub fn values(&self) -> MetricValues {
        MetricValues {
            temperature: self.temperature,
            moisture: self.moisture,
            ph: self.ph,
            nitrogen: self.nitrogen,
            phosphorus: self.phosphorus,
            potassium: self.potassium,
        }
    }
}

/// Request payload for skipping a point.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SkipPointRequest {
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,

    #[validate(length(min = 1, max = 64, message = "Device ID must be 1-64 characters"))]
    pub device_id: Option<String>,
}

/// Request payload for recording a free measurement.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeasurementRequest {
    pub area_id: Option<Uuid>,

    #[validate(length(min = 1, max = 32, message = "Point ID must be 1-32 characters"))]
    #[validate(regex(path = *shared::validation::POINT_ID_REGEX, message = "Invalid point ID"))]
    pub point_id: Option<String>,

    #[validate(length(min = 1, max = 64, message = "Device ID must be 1-64 characters"))]
    pub device_id: Option<String>,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_temperature"))]
    pub temperature: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_moisture"))]
    pub moisture: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_ph"))]
    pub ph: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_nutrient"))]
    pub nitrogen: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_nutrient"))]
    pub phosphorus: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_nutrient"))]
    pub potassium: Option<f64>,

    pub measurement_date: Option<NaiveDate>,

    pub measurement_time: Option<NaiveTime>,
}

impl CreateMeasurementRequest {
    pub fn values(&self) -> MetricValues {
        MetricValues {
            temperature: self.temperature,
            moisture: self.moisture,
            ph: self.ph,
            nitrogen: self.nitrogen,
            phosphorus: self.phosphorus,
            potassium: self.potassium,
        }
    }
}

/// Request payload for updating a measurement (partial update).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeasurementRequest {
    pub area_id: Option<Uuid>,

    #[validate(length(min = 1, max = 32, message = "Point ID must be 1-32 characters"))]
    #[validate(regex(path = *shared::validation::POINT_ID_REGEX, message = "Invalid point ID"))]
    pub point_id: Option<String>,

    #[validate(length(min = 1, max = 64, message = "Device ID must be 1-64 characters"))]
    pub device_id: Option<String>,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_temperature"))]
    pub temperature: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_moisture"))]
    pub moisture: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_ph"))]
    pub ph: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_nutrient"))]
    pub nitrogen: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_nutrient"))]
    pub phosphorus: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_nutrient"))]
    pub potassium: Option<f64>,

    pub measurement_date: Option<NaiveDate>,

    pub measurement_time: Option<NaiveTime>,
}

impl UpdateMeasurementRequest {
    pub fn into_patch(self) -> MeasurementPatch {
        MeasurementPatch {
            area_id: self.area_id,
            device_id: self.device_id,
            point_id: self.point_id,
            latitude: self.latitude,
            longitude: self.longitude,
            values: MetricValues {
                temperature: self.temperature,
                moisture: self.moisture,
                ph: self.ph,
                nitrogen: self.nitrogen,
                phosphorus: self.phosphorus,
                potassium: self.potassium,
            },
            measurement_date: self.measurement_date,
            measurement_time: self.measurement_time,
        }
    }
}

/// Query parameters for listing measurements.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeasurementsQuery {
    pub area_id: Option<Uuid>,
    pub device_id: Option<String>,
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Point view returned by sequencing endpoints.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PointResponse {
    pub measurement_id: i64,
    pub point_id: String,
    pub status: PointStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(flatten)]
    pub values: MetricValues,
    pub measurement_date: Option<NaiveDate>,
    pub measurement_time: Option<NaiveTime>,
}

impl From<Measurement> for PointResponse {
    fn from(m: Measurement) -> Self {
        let status = m.status();
        Self {
            measurement_id: m.measurement_id,
            point_id: m.point_id.unwrap_or_default(),
            status,
            device_id: m.device_id,
            latitude: m.latitude,
            longitude: m.longitude,
            values: m.values,
            measurement_date: m.measurement_date,
            measurement_time: m.measurement_time,
        }
    }
}

/// Response for listing measurements.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeasurementsResponse {
    pub measurements: Vec<Measurement>,
    pub total: usize,
}
