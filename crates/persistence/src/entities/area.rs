//! Area entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::Area;

/// Database row mapping for the areas table.
#[derive(Debug, Clone, FromRow)]
pub struct AreaEntity {
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

impl From<AreaEntity> for Area {
    fn from(entity: AreaEntity) -> Self {
        Self {
            area_id: entity.area_id,
            owner_id: entity.owner_id,
            name: entity.name,
            temperature_avg: entity.temperature_avg,
            moisture_avg: entity.moisture_avg,
            ph_avg: entity.ph_avg,
            nitrogen_avg: entity.nitrogen_avg,
            phosphorus_avg: entity.phosphorus_avg,
            potassium_avg: entity.potassium_avg,
            total_measurements: entity.total_measurements,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_entity_to_domain() {
        let entity = AreaEntity {
            area_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "North paddock".to_string(),
            temperature_avg: Some(24.5),
            moisture_avg: None,
            ph_avg: Some(6.8),
            nitrogen_avg: None,
            phosphorus_avg: None,
            potassium_avg: None,
            total_measurements: 7,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let area: Area = entity.clone().into();

        assert_eq!(area.area_id, entity.area_id);
        assert_eq!(area.owner_id, entity.owner_id);
        assert_eq!(area.name, "North paddock");
        assert_eq!(area.temperature_avg, Some(24.5));
        assert_eq!(area.ph_avg, Some(6.8));
        assert_eq!(area.total_measurements, 7);
    }
}
