//! Area repository for database operations.

use sqlx::PgPool;
use uuid::Uuid;

use domain::models::{Measurement, NewMeasurement};
use domain::services::aggregate::{compute_area_aggregate, TotalCountPolicy};

use crate::entities::{AreaEntity, MeasurementEntity};
use crate::metrics::QueryTimer;
use crate::repositories::measurement::insert_with;

/// Repository for area-related database operations.
#[derive(Clone)]
pub struct AreaRepository {
    pool: PgPool,
}

impl AreaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an area together with its initial measurements in one transaction.
    pub async fn create(
        &self,
        owner_id: Uuid,
        name: &str,
        measurements: &[NewMeasurement],
    ) -> Result<AreaEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_area");
        let mut tx = self.pool.begin().await?;

        let area = sqlx::query_as::<_, AreaEntity>(
            r#"
            INSERT INTO areas (owner_id, name)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

        for m in measurements {
            let row = NewMeasurement {
                area_id: Some(area.area_id),
                ..m.clone()
            };
            insert_with(&mut *tx, &row).await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(area)
    }

    /// Find area by UUID.
    pub async fn find_by_id(&self, area_id: Uuid) -> Result<Option<AreaEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_area_by_id");
        let result = sqlx::query_as::<_, AreaEntity>(
            r#"
            SELECT * FROM areas WHERE area_id = $1
            "#,
        )
        .bind(area_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List areas, newest first, optionally for one owner.
    pub async fn list(&self, owner_id: Option<Uuid>) -> Result<Vec<AreaEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_areas");
        let result = sqlx::query_as::<_, AreaEntity>(
            r#"
            SELECT * FROM areas
            WHERE ($1::uuid IS NULL OR owner_id = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Recompute the derived statistics of an area from its measurements.
    ///
    /// The area row is locked for the duration so concurrent recomputations
    /// serialize and each one reads a complete measurement set. Returns
    /// `None` if the area does not exist.
    pub async fn recompute(
        &self,
        area_id: Uuid,
        policy: TotalCountPolicy,
    ) -> Result<Option<AreaEntity>, sqlx::Error> {
        let timer = QueryTimer::new("recompute_area");
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_as::<_, AreaEntity>(
            r#"
            SELECT * FROM areas WHERE area_id = $1 FOR UPDATE
            "#,
        )
        .bind(area_id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        }

        let rows: Vec<Measurement> = sqlx::query_as::<_, MeasurementEntity>(
            r#"
            SELECT * FROM measurements WHERE area_id = $1
            "#,
        )
        .bind(area_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(Measurement::from)
        .collect();

        let aggregate = compute_area_aggregate(&rows, policy);
        let averages = aggregate.averages;
        let updated = sqlx::query_as::<_, AreaEntity>(
            r#"
            UPDATE areas SET
                temperature_avg = $2,
                moisture_avg = $3,
                ph_avg = $4,
                nitrogen_avg = $5,
                phosphorus_avg = $6,
                potassium_avg = $7,
                total_measurements = $8,
                updated_at = NOW()
            WHERE area_id = $1
            RETURNING *
            "#,
        )
        .bind(area_id)
        .bind(averages.temperature)
        .bind(averages.moisture)
        .bind(averages.ph)
        .bind(averages.nitrogen)
        .bind(averages.phosphorus)
        .bind(averages.potassium)
        .bind(aggregate.total_measurements)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(Some(updated))
    }
}
