//! GPS coordinate models for survey points.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::measurement::{round_coordinate, Measurement, PointStatus};

/// Default spacing between estimated grid positions, in degrees.
pub const DEFAULT_GRID_SPACING: f64 = 0.0001;

fn default_spacing() -> f64 {
    DEFAULT_GRID_SPACING
}

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Builds a pair rounded to the stored coordinate precision.
    pub fn rounded(lat: f64, lng: f64) -> Self {
        Self {
            lat: round_coordinate(lat),
            lng: round_coordinate(lng),
        }
    }

    /// Coordinates of a row, present only when both halves are set.
    pub fn of(m: &Measurement) -> Option<Self> {
        match (m.latitude, m.longitude) {
            (Some(lat), Some(lng)) => Some(Self { lat, lng }),
            _ => None,
        }
    }
}

/// One coordinate write against a point of an area.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateUpdate {
    pub point_id: String,
    pub position: LatLng,
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Where a coordinate came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSource {
    Gps,
    #[default]
    Manual,
    Estimated,
}

/// Request payload for setting one point's coordinates.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCoordinatesRequest {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub lat: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub lng: f64,

    #[serde(default)]
    pub source: CoordinateSource,
}

/// One entry of a bulk coordinate update.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PointCoordinatesInput {
    #[validate(length(min = 1, max = 32, message = "Point ID must be 1-32 characters"))]
    pub point_id: String,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub lat: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub lng: f64,
}

/// Request payload for updating many points at once. Applied all or nothing.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateCoordinatesRequest {
    #[validate(length(min = 1, message = "Coordinates array is required"))]
    #[validate(nested)]
    pub coordinates: Vec<PointCoordinatesInput>,
}

/// Query parameters for listing coordinates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCoordinatesQuery {
    /// Also return points that have no coordinates yet.
    #[serde(default)]
    pub include_nulls: bool,
}

/// Grid description used to estimate missing coordinates.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EstimateCoordinatesRequest {
    #[validate(range(min = 1, message = "Grid rows must be at least 1"))]
    pub grid_rows: u32,

    #[validate(range(min = 1, message = "Grid columns must be at least 1"))]
    pub grid_cols: u32,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub start_lat: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub start_lng: f64,

    #[serde(default = "default_spacing")]
    pub lat_spacing: f64,

    #[serde(default = "default_spacing")]
    pub lng_spacing: f64,

    /// Persist the estimates instead of only returning them.
    #[serde(default)]
    pub apply: bool,
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Metric summary carried next to a point's coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateMeasurementSummary {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub temperature: Option<f64>,
    pub moisture: Option<f64>,
    pub ph: Option<f64>,
}

/// A point with its coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointCoordinates {
    pub measurement_id: i64,
    pub point_id: String,
    pub status: PointStatus,
    pub coordinates: Option<LatLng>,
    pub has_coordinates: bool,
    pub measurement: CoordinateMeasurementSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Measurement> for PointCoordinates {
    fn from(m: Measurement) -> Self {
        let coordinates = LatLng::of(&m);
        Self {
            measurement_id: m.measurement_id,
            status: m.status(),
            point_id: m.point_id.unwrap_or_default(),
            has_coordinates: coordinates.is_some(),
            coordinates,
            measurement: CoordinateMeasurementSummary {
                date: m.measurement_date,
                time: m.measurement_time,
                temperature: m.values.temperature,
                moisture: m.values.moisture,
                ph: m.values.ph,
            },
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Response for a single coordinate update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCoordinatesResponse {
    pub area_id: Uuid,
    pub source: CoordinateSource,
    pub point: PointCoordinates,
}

/// Response for a bulk coordinate update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateCoordinatesResponse {
    pub area_id: Uuid,
    pub updated_points: Vec<PointCoordinates>,
    pub count: usize,
}

/// Counts over a coordinate listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateCounts {
    pub total_points: usize,
    pub points_with_coordinates: usize,
    pub points_without_coordinates: usize,
}

/// Response for listing coordinates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCoordinatesResponse {
    pub area_id: Uuid,
    pub coordinates: Vec<PointCoordinates>,
    pub statistics: CoordinateCounts,
}

/// Bounding box of the located points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

/// Coordinate coverage of an area's points.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsStatistics {
    #[serde(flatten)]
    pub counts: CoordinateCounts,
    /// Share of points with coordinates, rounded to a whole percent.
    pub coverage_percentage: u32,
    pub bounds: Option<CoordinateBounds>,
    pub center: Option<LatLng>,
}

/// Response for the GPS statistics endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsStatisticsResponse {
    pub area_id: Uuid,
    pub gps_statistics: GpsStatistics,
}

/// Zero-based grid cell a point id maps to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GridPosition {
    pub row: u32,
    pub col: u32,
}

/// Estimated coordinates for a point lacking them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatedPoint {
    pub point_id: String,
    pub measurement_id: i64,
    pub estimated_coordinates: LatLng,
    pub grid_position: GridPosition,
}

/// Grid parameters echoed back with an estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfiguration {
    pub rows: u32,
    pub cols: u32,
    pub start_lat: f64,
    pub start_lng: f64,
    pub lat_spacing: f64,
    pub lng_spacing: f64,
}

impl From<&EstimateCoordinatesRequest> for GridConfiguration {
    fn from(r: &EstimateCoordinatesRequest) -> Self {
        Self {
            rows: r.grid_rows,
            cols: r.grid_cols,
            start_lat: r.start_lat,
            start_lng: r.start_lng,
            lat_spacing: r.lat_spacing,
            lng_spacing: r.lng_spacing,
        }
    }
}

/// Response for the estimate endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateCoordinatesResponse {
    pub area_id: Uuid,
    pub estimated_points: Vec<EstimatedPoint>,
    pub grid_configuration: GridConfiguration,
    pub count: usize,
    /// Whether the estimates were written to the points.
    pub applied: bool,
}
