//! Measurement entity (database row mapping).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{Measurement, MetricValues};

/// Database row mapping for the measurements table.
#[derive(Debug, Clone, FromRow)]
pub struct MeasurementEntity {
    pub measurement_id: i64,
    pub device_id: Option<String>,
    pub area_id: Option<Uuid>,
    pub point_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub temperature: Option<f64>,
    pub moisture: Option<f64>,
    pub ph: Option<f64>,
    pub nitrogen: Option<f64>,
    pub phosphorus: Option<f64>,
    pub potassium: Option<f64>,
    pub measurement_date: Option<NaiveDate>,
    pub measurement_time: Option<NaiveTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MeasurementEntity> for Measurement {
    fn from(entity: MeasurementEntity) -> Self {
        Self {
            measurement_id: entity.measurement_id,
            area_id: entity.area_id,
            device_id: entity.device_id,
            point_id: entity.point_id,
            latitude: entity.latitude,
            longitude: entity.longitude,
            values: MetricValues {
                temperature: entity.temperature,
                moisture: entity.moisture,
                ph: entity.ph,
                nitrogen: entity.nitrogen,
                phosphorus: entity.phosphorus,
                potassium: entity.potassium,
            },
            measurement_date: entity.measurement_date,
            measurement_time: entity.measurement_time,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
