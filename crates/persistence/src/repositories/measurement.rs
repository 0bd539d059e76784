//! Measurement repository. Also owns the point placeholder rows.

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use domain::models::{CoordinateUpdate, MeasurementPatch, NewMeasurement, PointReading};

use crate::entities::MeasurementEntity;
use crate::metrics::QueryTimer;

/// Inserts one measurement row using any executor (pool or open transaction).
pub(crate) async fn insert_with<'e, E>(
    executor: E,
    m: &NewMeasurement,
) -> Result<MeasurementEntity, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, MeasurementEntity>(
        r#"
        INSERT INTO measurements (device_id, area_id, point_id, latitude, longitude,
                                  temperature, moisture, ph, nitrogen, phosphorus, potassium,
                                  measurement_date, measurement_time)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        "#,
    )
    .bind(m.device_id.as_deref())
    .bind(m.area_id)
    .bind(m.point_id.as_deref())
    .bind(m.latitude)
    .bind(m.longitude)
    .bind(m.values.temperature)
    .bind(m.values.moisture)
    .bind(m.values.ph)
    .bind(m.values.nitrogen)
    .bind(m.values.phosphorus)
    .bind(m.values.potassium)
    .bind(m.measurement_date)
    .bind(m.measurement_time)
    .fetch_one(executor)
    .await
}

/// Repository for measurement and point database operations.
#[derive(Clone)]
pub struct MeasurementRepository {
    pool: PgPool,
}

impl MeasurementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a single measurement.
    pub async fn insert(&self, m: &NewMeasurement) -> Result<MeasurementEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_measurement");
        let result = insert_with(&self.pool, m).await;
        timer.record();
        result
    }

    /// Insert unmeasured placeholders for a batch of point ids.
    ///
    /// Returns `Ok(None)` when the area does not exist. Nothing is written
    /// unless every id is inserted.
    pub async fn insert_points(
        &self,
        area_id: Uuid,
        point_ids: &[String],
    ) -> Result<Option<Vec<MeasurementEntity>>, sqlx::Error> {
        let timer = QueryTimer::new("insert_points");
        let mut tx = self.pool.begin().await?;

        let area: Option<(Uuid,)> =
            sqlx::query_as("SELECT area_id FROM areas WHERE area_id = $1 FOR SHARE")
                .bind(area_id)
                .fetch_optional(&mut *tx)
                .await?;
        if area.is_none() {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        }

        let mut rows = sqlx::query_as::<_, MeasurementEntity>(
            r#"
            INSERT INTO measurements (area_id, point_id)
            SELECT $1, t.point_id
            FROM UNNEST($2::text[]) WITH ORDINALITY AS t(point_id, ord)
            ORDER BY t.ord
            RETURNING *
            "#,
        )
        .bind(area_id)
        .bind(point_ids)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();

        rows.sort_by_key(|r| r.measurement_id);
        Ok(Some(rows))
    }

    /// All point rows of an area ordered by point id (byte order).
    pub async fn find_points(&self, area_id: Uuid) -> Result<Vec<MeasurementEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_points_by_area");
        let result = sqlx::query_as::<_, MeasurementEntity>(
            r#"
            SELECT * FROM measurements
            WHERE area_id = $1 AND point_id IS NOT NULL
            ORDER BY point_id COLLATE "C"
            "#,
        )
        .bind(area_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Every row associated with an area.
    pub async fn find_by_area(&self, area_id: Uuid) -> Result<Vec<MeasurementEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_measurements_by_area");
        let result = sqlx::query_as::<_, MeasurementEntity>(
            r#"
            SELECT * FROM measurements WHERE area_id = $1 ORDER BY measurement_id
            "#,
        )
        .bind(area_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_point(
        &self,
        area_id: Uuid,
        point_id: &str,
    ) -> Result<Option<MeasurementEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_point");
        let result = sqlx::query_as::<_, MeasurementEntity>(
            r#"
            SELECT * FROM measurements WHERE area_id = $1 AND point_id = $2
            "#,
        )
        .bind(area_id)
        .bind(point_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Writes a reading onto a point only if it is still unmeasured.
    ///
    /// Returns `None` when no unmeasured row matched; the caller decides
    /// between "missing" and "already visited".
    pub async fn record_point(
        &self,
        area_id: Uuid,
        point_id: &str,
        reading: &PointReading,
    ) -> Result<Option<MeasurementEntity>, sqlx::Error> {
        let timer = QueryTimer::new("record_point");
        let result = sqlx::query_as::<_, MeasurementEntity>(
            r#"
            UPDATE measurements SET
                device_id = COALESCE($3, device_id),
                latitude = COALESCE($4, latitude),
                longitude = COALESCE($5, longitude),
                temperature = COALESCE($6, temperature),
                moisture = COALESCE($7, moisture),
                ph = COALESCE($8, ph),
                nitrogen = COALESCE($9, nitrogen),
                phosphorus = COALESCE($10, phosphorus),
                potassium = COALESCE($11, potassium),
                measurement_date = $12,
                measurement_time = $13,
                updated_at = NOW()
            WHERE area_id = $1 AND point_id = $2 AND measurement_date IS NULL
            RETURNING *
            "#,
        )
        .bind(area_id)
        .bind(point_id)
        .bind(reading.device_id.as_deref())
        .bind(reading.latitude)
        .bind(reading.longitude)
        .bind(reading.values.temperature)
        .bind(reading.values.moisture)
        .bind(reading.values.ph)
        .bind(reading.values.nitrogen)
        .bind(reading.values.phosphorus)
        .bind(reading.values.potassium)
        .bind(reading.measurement_date)
        .bind(reading.measurement_time)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Sets coordinates on a batch of points in one transaction.
    ///
    /// Returns `Ok(None)` and writes nothing unless every listed point exists
    /// in the area. Point ids must be distinct.
    pub async fn update_coordinates(
        &self,
        area_id: Uuid,
        updates: &[CoordinateUpdate],
    ) -> Result<Option<Vec<MeasurementEntity>>, sqlx::Error> {
        let timer = QueryTimer::new("update_point_coordinates");
        let point_ids: Vec<&str> = updates.iter().map(|u| u.point_id.as_str()).collect();
        let lats: Vec<f64> = updates.iter().map(|u| u.position.lat).collect();
        let lngs: Vec<f64> = updates.iter().map(|u| u.position.lng).collect();

        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query_as::<_, MeasurementEntity>(
            r#"
            UPDATE measurements AS m SET
                latitude = t.lat,
                longitude = t.lng,
                updated_at = NOW()
            FROM UNNEST($2::text[], $3::float8[], $4::float8[]) AS t(point_id, lat, lng)
            WHERE m.area_id = $1 AND m.point_id = t.point_id
            RETURNING m.*
            "#,
        )
        .bind(area_id)
        .bind(&point_ids)
        .bind(&lats)
        .bind(&lngs)
        .fetch_all(&mut *tx)
        .await?;

        if rows.len() != updates.len() {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        }

        tx.commit().await?;
        timer.record();
        Ok(Some(rows))
    }

    /// Clears date, time and metrics on every point of an area.
    pub async fn reset_points(&self, area_id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("reset_points");
        let result = sqlx::query(
            r#"
            UPDATE measurements SET
                temperature = NULL,
                moisture = NULL,
                ph = NULL,
                nitrogen = NULL,
                phosphorus = NULL,
                potassium = NULL,
                measurement_date = NULL,
                measurement_time = NULL,
                updated_at = NOW()
            WHERE area_id = $1 AND point_id IS NOT NULL
            "#,
        )
        .bind(area_id)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    pub async fn find_by_id(
        &self,
        measurement_id: i64,
    ) -> Result<Option<MeasurementEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_measurement_by_id");
        let result = sqlx::query_as::<_, MeasurementEntity>(
            r#"
            SELECT * FROM measurements WHERE measurement_id = $1
            "#,
        )
        .bind(measurement_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List measurements, optionally filtered by area and/or device, newest first.
    pub async fn list(
        &self,
        area_id: Option<Uuid>,
        device_id: Option<&str>,
    ) -> Result<Vec<MeasurementEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_measurements");
        let result = sqlx::query_as::<_, MeasurementEntity>(
            r#"
            SELECT * FROM measurements
            WHERE ($1::uuid IS NULL OR area_id = $1)
              AND ($2::text IS NULL OR device_id = $2)
            ORDER BY measurement_id DESC
            "#,
        )
        .bind(area_id)
        .bind(device_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Update a measurement (partial update).
    /// Only provided fields are updated; None values are preserved.
    pub async fn update(
        &self,
        measurement_id: i64,
        patch: &MeasurementPatch,
    ) -> Result<Option<MeasurementEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_measurement");
        let result = sqlx::query_as::<_, MeasurementEntity>(
            r#"
            UPDATE measurements SET
                area_id = COALESCE($2, area_id),
                device_id = COALESCE($3, device_id),
                point_id = COALESCE($4, point_id),
                latitude = COALESCE($5, latitude),
                longitude = COALESCE($6, longitude),
                temperature = COALESCE($7, temperature),
                moisture = COALESCE($8, moisture),
                ph = COALESCE($9, ph),
                nitrogen = COALESCE($10, nitrogen),
                phosphorus = COALESCE($11, phosphorus),
                potassium = COALESCE($12, potassium),
                measurement_date = COALESCE($13, measurement_date),
                measurement_time = COALESCE($14, measurement_time),
                updated_at = NOW()
            WHERE measurement_id = $1
            RETURNING *
            "#,
        )
        .bind(measurement_id)
        .bind(patch.area_id)
        .bind(patch.device_id.as_deref())
        .bind(patch.point_id.as_deref())
        .bind(patch.latitude)
        .bind(patch.longitude)
        .bind(patch.values.temperature)
        .bind(patch.values.moisture)
        .bind(patch.values.ph)
        .bind(patch.values.nitrogen)
        .bind(patch.values.phosphorus)
        .bind(patch.values.potassium)
        .bind(patch.measurement_date)
        .bind(patch.measurement_time)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Delete a measurement, returning the removed row.
    pub async fn delete(&self, measurement_id: i64) -> Result<Option<MeasurementEntity>, sqlx::Error> {
        let timer = QueryTimer::new("delete_measurement");
        let result = sqlx::query_as::<_, MeasurementEntity>(
            r#"
            DELETE FROM measurements WHERE measurement_id = $1 RETURNING *
            "#,
        )
        .bind(measurement_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}
