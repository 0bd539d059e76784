//! Postgres implementation of the domain `AreaStore`.

use sqlx::PgPool;
use uuid::Uuid;

use domain::models::{
    Area, CoordinateUpdate, Measurement, MeasurementFilter, MeasurementPatch, NewArea,
    NewMeasurement, PointReading, PointStatus,
};
use domain::services::{AreaStore, TotalCountPolicy};
use domain::{DomainError, DomainResult};

use crate::error::map_db_error;
use crate::repositories::{AreaRepository, MeasurementRepository};

/// `AreaStore` backed by the `areas` and `measurements` tables.
#[derive(Clone)]
pub struct PgAreaStore {
    areas: AreaRepository,
    measurements: MeasurementRepository,
}

impl PgAreaStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            areas: AreaRepository::new(pool.clone()),
            measurements: MeasurementRepository::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl AreaStore for PgAreaStore {
    async fn create_area(&self, new_area: NewArea) -> DomainResult<Area> {
        self.areas
            .create(new_area.owner_id, &new_area.name, &new_area.measurements)
            .await
            .map(Area::from)
            .map_err(map_db_error)
    }

    async fn find_area(&self, area_id: Uuid) -> DomainResult<Option<Area>> {
        self.areas
            .find_by_id(area_id)
            .await
            .map(|a| a.map(Area::from))
            .map_err(map_db_error)
    }

    async fn list_areas(&self, owner_id: Option<Uuid>) -> DomainResult<Vec<Area>> {
        let rows = self.areas.list(owner_id).await.map_err(map_db_error)?;
        Ok(rows.into_iter().map(Area::from).collect())
    }

    async fn insert_points(
        &self,
        area_id: Uuid,
        point_ids: &[String],
    ) -> DomainResult<Vec<Measurement>> {
        let rows = self
            .measurements
            .insert_points(area_id, point_ids)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| DomainError::area_not_found(area_id))?;
        Ok(rows.into_iter().map(Measurement::from).collect())
    }

    async fn points_for_area(&self, area_id: Uuid) -> DomainResult<Vec<Measurement>> {
        let rows = self
            .measurements
            .find_points(area_id)
            .await
            .map_err(map_db_error)?;
        Ok(rows.into_iter().map(Measurement::from).collect())
    }

    async fn measurements_for_area(&self, area_id: Uuid) -> DomainResult<Vec<Measurement>> {
        let rows = self
            .measurements
            .find_by_area(area_id)
            .await
            .map_err(map_db_error)?;
        Ok(rows.into_iter().map(Measurement::from).collect())
    }

    async fn record_point(
        &self,
        area_id: Uuid,
        point_id: &str,
        reading: PointReading,
    ) -> DomainResult<Measurement> {
        if let Some(row) = self
            .measurements
            .record_point(area_id, point_id, &reading)
            .await
            .map_err(map_db_error)?
        {
            return Ok(row.into());
        }

        // The conditional update matched nothing: find out why.
        let existing = self
            .measurements
            .find_point(area_id, point_id)
            .await
            .map_err(map_db_error)?
            .map(Measurement::from)
            .ok_or_else(|| DomainError::point_not_found(point_id))?;

        Err(match existing.status() {
            PointStatus::Skipped => {
                DomainError::Conflict(format!("Point '{}' was already skipped", point_id))
            }
            _ => DomainError::Conflict(format!("Point '{}' is already measured", point_id)),
        })
    }

    async fn update_point_coordinates(
        &self,
        area_id: Uuid,
        updates: &[CoordinateUpdate],
    ) -> DomainResult<Vec<Measurement>> {
        let Some(rows) = self
            .measurements
            .update_coordinates(area_id, updates)
            .await
            .map_err(map_db_error)?
        else {
            // Rolled back: report the first point the area lacks.
            let existing = self.points_for_area(area_id).await?;
            let missing = updates
                .iter()
                .map(|u| u.point_id.as_str())
                .find(|id| !existing.iter().any(|m| m.point_id.as_deref() == Some(*id)))
                .unwrap_or_default();
            return Err(DomainError::point_not_found(missing));
        };

        let mut rows: Vec<Measurement> = rows.into_iter().map(Measurement::from).collect();
        rows.sort_by_key(|m| {
            updates
                .iter()
                .position(|u| m.point_id.as_deref() == Some(u.point_id.as_str()))
        });
        Ok(rows)
    }

    async fn reset_points(&self, area_id: Uuid) -> DomainResult<u64> {
        if self.find_area(area_id).await?.is_none() {
            return Err(DomainError::area_not_found(area_id));
        }
        self.measurements
            .reset_points(area_id)
            .await
            .map_err(map_db_error)
    }

    async fn recompute_area(&self, area_id: Uuid, policy: TotalCountPolicy) -> DomainResult<Area> {
        self.areas
            .recompute(area_id, policy)
            .await
            .map_err(map_db_error)?
            .map(Area::from)
            .ok_or_else(|| DomainError::area_not_found(area_id))
    }

    async fn insert_measurement(&self, measurement: NewMeasurement) -> DomainResult<Measurement> {
        self.measurements
            .insert(&measurement)
            .await
            .map(Measurement::from)
            .map_err(map_db_error)
    }

    async fn find_measurement(&self, measurement_id: i64) -> DomainResult<Option<Measurement>> {
        self.measurements
            .find_by_id(measurement_id)
            .await
            .map(|m| m.map(Measurement::from))
            .map_err(map_db_error)
    }

    async fn list_measurements(&self, filter: MeasurementFilter) -> DomainResult<Vec<Measurement>> {
        let rows = self
            .measurements
            .list(filter.area_id, filter.device_id.as_deref())
            .await
            .map_err(map_db_error)?;
        Ok(rows.into_iter().map(Measurement::from).collect())
    }

    async fn update_measurement(
        &self,
        measurement_id: i64,
        patch: MeasurementPatch,
    ) -> DomainResult<Measurement> {
        self.measurements
            .update(measurement_id, &patch)
            .await
            .map_err(map_db_error)?
            .map(Measurement::from)
            .ok_or_else(|| DomainError::measurement_not_found(measurement_id))
    }

    async fn delete_measurement(&self, measurement_id: i64) -> DomainResult<Measurement> {
        self.measurements
            .delete(measurement_id)
            .await
            .map_err(map_db_error)?
            .map(Measurement::from)
            .ok_or_else(|| DomainError::measurement_not_found(measurement_id))
    }
}

#[cfg(test)]
mod tests {
    //! Integration tests against a real database.
    //! Run with `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.

    use super::*;
    use crate::db::{create_pool, run_migrations, DatabaseConfig};
    use chrono::{NaiveDate, NaiveTime};
    use domain::models::MetricValues;
    use fake::faker::company::en::CompanyName;
    use fake::Fake;

    async fn test_store() -> PgAreaStore {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        let pool = create_pool(&DatabaseConfig {
            url,
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 60,
        })
        .await
        .unwrap();
        run_migrations(&pool).await.unwrap();
        PgAreaStore::new(pool)
    }

    async fn new_area(store: &PgAreaStore) -> Area {
        store
            .create_area(NewArea {
                owner_id: Uuid::new_v4(),
                name: CompanyName().fake(),
                measurements: vec![],
            })
            .await
            .unwrap()
    }

    fn reading(values: MetricValues) -> PointReading {
        PointReading {
            device_id: Some("sensor-7".into()),
            latitude: None,
            longitude: None,
            values,
            measurement_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            measurement_time: NaiveTime::from_hms_opt(6, 45, 0).unwrap(),
        }
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_points_are_unique_per_area() {
        let store = test_store().await;
        let area = new_area(&store).await;

        let rows = store
            .insert_points(area.area_id, &["A1".into(), "A2".into()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let dup = store
            .insert_points(area.area_id, &["A3".into(), "A1".into()])
            .await;
        assert!(matches!(dup, Err(DomainError::Conflict(_))));
        assert_eq!(store.points_for_area(area.area_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_insert_points_unknown_area() {
        let store = test_store().await;
        let result = store.insert_points(Uuid::new_v4(), &["A1".into()]).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_record_point_is_conditional() {
        let store = test_store().await;
        let area = new_area(&store).await;
        store
            .insert_points(area.area_id, &["A1".into(), "A2".into()])
            .await
            .unwrap();

        let values = MetricValues {
            temperature: Some(25.0),
            moisture: Some(30.0),
            ..Default::default()
        };
        let first = store
            .record_point(area.area_id, "A1", reading(values))
            .await
            .unwrap();
        assert_eq!(first.status(), PointStatus::Measured);

        let second = store
            .record_point(area.area_id, "A1", reading(MetricValues::default()))
            .await;
        assert!(matches!(second, Err(DomainError::Conflict(_))));

        store
            .record_point(area.area_id, "A2", reading(MetricValues::skipped()))
            .await
            .unwrap();

        let area = store
            .recompute_area(area.area_id, TotalCountPolicy::RecordedRows)
            .await
            .unwrap();
        assert_eq!(area.temperature_avg, Some(25.0));
        assert_eq!(area.total_measurements, 2);

        let reset = store.reset_points(area.area_id).await.unwrap();
        assert_eq!(reset, 2);

        let area = store
            .recompute_area(area.area_id, TotalCountPolicy::AllRows)
            .await
            .unwrap();
        assert_eq!(area.temperature_avg, None);
        assert_eq!(area.total_measurements, 2);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_coordinate_batch_rolls_back_on_missing_point() {
        let store = test_store().await;
        let area = new_area(&store).await;
        store
            .insert_points(area.area_id, &["A1".into(), "A2".into()])
            .await
            .unwrap();

        let update = |id: &str, lat: f64| CoordinateUpdate {
            point_id: id.into(),
            position: domain::models::LatLng { lat, lng: 100.5 },
        };

        let missing = store
            .update_point_coordinates(area.area_id, &[update("A1", 13.7), update("B9", 13.8)])
            .await;
        assert!(matches!(missing, Err(DomainError::NotFound(msg)) if msg.contains("B9")));
        let points = store.points_for_area(area.area_id).await.unwrap();
        assert!(points.iter().all(|p| p.latitude.is_none()));

        let rows = store
            .update_point_coordinates(area.area_id, &[update("A2", 13.8), update("A1", 13.7)])
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].point_id.as_deref(), Some("A2"));
        assert_eq!(rows[0].latitude, Some(13.8));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_concurrent_record_point_has_one_winner() {
        let store = test_store().await;
        let area = new_area(&store).await;
        store.insert_points(area.area_id, &["A1".into()]).await.unwrap();

        let warm = MetricValues {
            temperature: Some(31.0),
            ..Default::default()
        };
        let cold = MetricValues {
            temperature: Some(12.0),
            ..Default::default()
        };
        let (first, second) = tokio::join!(
            store.record_point(area.area_id, "A1", reading(warm)),
            store.record_point(area.area_id, "A1", reading(cold)),
        );

        let winner = match (&first, &second) {
            (Ok(row), Err(DomainError::Conflict(_))) | (Err(DomainError::Conflict(_)), Ok(row)) => {
                row.clone()
            }
            other => panic!("expected one winner and one conflict, got {:?}", other),
        };

        let points = store.points_for_area(area.area_id).await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].values.temperature, winner.values.temperature);

        let area = store
            .recompute_area(area.area_id, TotalCountPolicy::AllRows)
            .await
            .unwrap();
        assert_eq!(area.temperature_avg, winner.values.temperature);
    }
}
