//! Area domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::actor::Actor;
use super::measurement::{CreateMeasurementRequest, MetricValues, NewMeasurement};

/// A surveyed area with the derived soil statistics of its measurements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub area_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub temperature_avg: Option<f64>,
    pub moisture_avg: Option<f64>,
    pub ph_avg: Option<f64>,
    pub nitrogen_avg: Option<f64>,
    pub phosphorus_avg: Option<f64>,
    pub potassium_avg: Option<f64>,
    pub total_measurements: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Area {
    pub fn averages(&self) -> MetricValues {
        MetricValues {
            temperature: self.temperature_avg,
            moisture: self.moisture_avg,
            ph: self.ph_avg,
            nitrogen: self.nitrogen_avg,
            phosphorus: self.phosphorus_avg,
            potassium: self.potassium_avg,
        }
    }

    /// Owners and admins may read and modify an area.
    pub fn is_accessible_by(&self, actor: &Actor) -> bool {
        actor.is_admin() || self.owner_id == actor.user_id
    }
}

/// Output of the aggregate engine, written onto the area row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaAggregate {
    pub averages: MetricValues,
    pub total_measurements: i32,
}

/// Data for creating an area, optionally with an initial batch of readings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewArea {
    pub owner_id: Uuid,
    pub name: String,
    pub measurements: Vec<NewMeasurement>,
}

/// Request payload for creating an area.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAreaRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Initial readings stored with the area; averages are computed immediately.
    #[serde(default)]
    #[validate(nested)]
    pub measurements: Vec<CreateMeasurementRequest>,
}

/// Response payload for area operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaResponse {
    pub area_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub temperature_avg: Option<f64>,
    pub moisture_avg: Option<f64>,
    pub ph_avg: Option<f64>,
    pub nitrogen_avg: Option<f64>,
    pub phosphorus_avg: Option<f64>,
    pub potassium_avg: Option<f64>,
    pub total_measurements: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Area> for AreaResponse {
    fn from(a: Area) -> Self {
        Self {
            area_id: a.area_id,
            owner_id: a.owner_id,
            name: a.name,
            temperature_avg: a.temperature_avg,
            moisture_avg: a.moisture_avg,
            ph_avg: a.ph_avg,
            nitrogen_avg: a.nitrogen_avg,
            phosphorus_avg: a.phosphorus_avg,
            potassium_avg: a.potassium_avg,
            total_measurements: a.total_measurements,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

/// Response for listing areas.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAreasResponse {
    pub areas: Vec<AreaResponse>,
    pub total: usize,
}
