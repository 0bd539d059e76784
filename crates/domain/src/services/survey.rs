//! Survey workflow service.
//!
//! Orchestrates the point sequencer, the aggregate engine and the progress
//! tracker over an [`AreaStore`], enforcing area ownership and publishing
//! live events after each successful mutation.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{DomainError, DomainResult};
use crate::models::area::{AreaResponse, CreateAreaRequest};
use crate::models::coordinates::{
    BulkUpdateCoordinatesRequest, BulkUpdateCoordinatesResponse, EstimateCoordinatesRequest,
    EstimateCoordinatesResponse, GpsStatisticsResponse, GridConfiguration, ListCoordinatesResponse,
    PointCoordinates, UpdateCoordinatesRequest, UpdateCoordinatesResponse,
};
use crate::models::measurement::{
    round_coordinate, CompleteMeasurementRequest, CreateMeasurementRequest, PointResponse,
    SkipPointRequest, UpdateMeasurementRequest,
};
use crate::models::point::{
    CompleteMeasurementResponse, CreatePointsRequest, CreatePointsResponse, ResetPointsResponse,
    SkipPointResponse,
};
use crate::models::progress::{
    AreaStatisticsResponse, SessionStatusResponse, StartSessionRequest, StartSessionResponse,
};
use crate::models::{
    Actor, Area, CoordinateUpdate, LatLng, Measurement, MeasurementFilter, Metric, MetricValues,
    NewArea, NewMeasurement, NextPoint, NextPointStrategy, PointReading, PointStatusFilter,
    ProgressSnapshot,
};
use crate::services::aggregate::{compute_metric_statistics, TotalCountPolicy};
use crate::services::coordinates::{compute_gps_statistics, count_coordinates, estimate_missing};
use crate::services::progress::{compute_progress, measurement_date_range};
use crate::services::relay::{LiveEvent, LiveRelay, RelayResult};
use crate::services::sequencer::{filter_points, generate_point_ids, layout_size, select_next};
use crate::services::store::AreaStore;

/// Tunables for the survey workflow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurveySettings {
    pub total_count_policy: TotalCountPolicy,
    /// Upper bound on points generated by one request.
    pub max_points_per_request: u32,
    /// Upper bound for nitrogen, phosphorus and potassium readings.
    pub max_nutrient_value: f64,
}

impl Default for SurveySettings {
    fn default() -> Self {
        Self {
            total_count_policy: TotalCountPolicy::AllRows,
            max_points_per_request: 1000,
            max_nutrient_value: 9999.0,
        }
    }
}

/// Entry point for every area, point and measurement operation.
pub struct SurveyService {
    store: Arc<dyn AreaStore>,
    relay: Arc<dyn LiveRelay>,
    settings: SurveySettings,
}

impl SurveyService {
    pub fn new(store: Arc<dyn AreaStore>, relay: Arc<dyn LiveRelay>, settings: SurveySettings) -> Self {
        Self {
            store,
            relay,
            settings,
        }
    }

    pub fn settings(&self) -> &SurveySettings {
        &self.settings
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn authorized_area(&self, actor: &Actor, area_id: Uuid) -> DomainResult<Area> {
        let area = self
            .store
            .find_area(area_id)
            .await?
            .ok_or_else(|| DomainError::area_not_found(area_id))?;

        if !area.is_accessible_by(actor) {
            tracing::warn!(
                area_id = %area_id,
                user_id = %actor.user_id,
                "Area access denied"
            );
            return Err(DomainError::Forbidden(
                "Area belongs to another user".into(),
            ));
        }
        Ok(area)
    }

    /// Enforces the configured nutrient cap and rounds to two decimals.
    fn normalize_values(&self, values: MetricValues) -> DomainResult<MetricValues> {
        for metric in [Metric::Nitrogen, Metric::Phosphorus, Metric::Potassium] {
            if let Some(v) = values.get(metric) {
                if v > self.settings.max_nutrient_value {
                    return Err(DomainError::InvalidArgument(format!(
                        "{} must be at most {}",
                        metric.as_str(),
                        self.settings.max_nutrient_value
                    )));
                }
            }
        }
        Ok(values.rounded())
    }

    fn publish(&self, event: LiveEvent) {
        let area_id = event.area_id();
        let kind = event.kind();
        match self.relay.publish(event) {
            RelayResult::Queued => {
                tracing::debug!(area_id = %area_id, event = kind, "Live event queued");
            }
            RelayResult::Disabled => {}
            RelayResult::Dropped(reason) => {
                tracing::warn!(
                    area_id = %area_id,
                    event = kind,
                    reason = %reason,
                    "Live event dropped"
                );
            }
        }
    }

    async fn recompute(&self, area_id: Uuid) -> DomainResult<Area> {
        let area = self
            .store
            .recompute_area(area_id, self.settings.total_count_policy)
            .await?;
        self.publish(LiveEvent::AreaUpdated {
            area: AreaResponse::from(area.clone()),
        });
        Ok(area)
    }

    fn new_measurement(&self, request: &CreateMeasurementRequest) -> DomainResult<NewMeasurement> {
        let now = Utc::now();
        Ok(NewMeasurement {
            area_id: request.area_id,
            device_id: request.device_id.clone(),
            point_id: request.point_id.clone(),
            latitude: request.latitude.map(round_coordinate),
            longitude: request.longitude.map(round_coordinate),
            values: self.normalize_values(request.values())?,
            measurement_date: Some(request.measurement_date.unwrap_or_else(|| now.date_naive())),
            measurement_time: Some(request.measurement_time.unwrap_or_else(|| now.time())),
        })
    }

    // ------------------------------------------------------------------
    // Areas
    // ------------------------------------------------------------------

    /// Creates an area, storing any initial readings and computing averages from them.
    pub async fn create_area(&self, actor: &Actor, request: CreateAreaRequest) -> DomainResult<Area> {
        request.validate()?;

        let measurements = request
            .measurements
            .iter()
            .map(|m| self.new_measurement(m))
            .collect::<DomainResult<Vec<_>>>()?;
        let has_readings = !measurements.is_empty();

        let area = self
            .store
            .create_area(NewArea {
                owner_id: actor.user_id,
                name: request.name,
                measurements,
            })
            .await?;

        tracing::info!(
            area_id = %area.area_id,
            owner_id = %area.owner_id,
            "Area created"
        );

        if has_readings {
            return self.recompute(area.area_id).await;
        }
        Ok(area)
    }

    pub async fn get_area(&self, actor: &Actor, area_id: Uuid) -> DomainResult<Area> {
        self.authorized_area(actor, area_id).await
    }

    /// Lists the caller's own areas.
    pub async fn list_areas(&self, actor: &Actor) -> DomainResult<Vec<Area>> {
        self.store.list_areas(Some(actor.user_id)).await
    }

    /// Recomputes averages and total from the current measurement set.
    pub async fn recompute_area_averages(&self, actor: &Actor, area_id: Uuid) -> DomainResult<Area> {
        self.authorized_area(actor, area_id).await?;
        self.recompute(area_id).await
    }

    /// Point counts plus per-metric average and range over measured rows.
    pub async fn area_statistics(
        &self,
        actor: &Actor,
        area_id: Uuid,
    ) -> DomainResult<AreaStatisticsResponse> {
        self.authorized_area(actor, area_id).await?;
        let rows = self.store.measurements_for_area(area_id).await?;
        Ok(AreaStatisticsResponse {
            area_id,
            progress: compute_progress(&rows),
            metrics: compute_metric_statistics(&rows),
        })
    }

    // ------------------------------------------------------------------
    // Points
    // ------------------------------------------------------------------

    pub async fn create_points(
        &self,
        actor: &Actor,
        area_id: Uuid,
        request: CreatePointsRequest,
    ) -> DomainResult<CreatePointsResponse> {
        request.validate()?;
        let layout = request.layout()?;

        let size = layout_size(&layout);
        if size > u64::from(self.settings.max_points_per_request) {
            return Err(DomainError::InvalidArgument(format!(
                "At most {} points can be created per request",
                self.settings.max_points_per_request
            )));
        }

        self.authorized_area(actor, area_id).await?;

        let point_ids = generate_point_ids(&layout);
        for id in &point_ids {
            shared::validation::validate_point_id(id).map_err(|e| {
                DomainError::InvalidArgument(format!(
                    "Generated point ID '{}' is invalid: {}",
                    id,
                    e.message.unwrap_or_default()
                ))
            })?;
        }

        let rows = self.store.insert_points(area_id, &point_ids).await?;

        tracing::info!(area_id = %area_id, count = rows.len(), "Points created");
        self.publish(LiveEvent::PointsCreated {
            area_id,
            point_ids: point_ids.clone(),
        });
        self.recompute(area_id).await?;

        Ok(CreatePointsResponse {
            area_id,
            total: rows.len(),
            measurement_ids: rows.iter().map(|r| r.measurement_id).collect(),
            point_ids,
        })
    }

    pub async fn list_points(
        &self,
        actor: &Actor,
        area_id: Uuid,
        filter: PointStatusFilter,
    ) -> DomainResult<Vec<Measurement>> {
        self.authorized_area(actor, area_id).await?;
        let points = self.store.points_for_area(area_id).await?;
        Ok(filter_points(points, filter))
    }

    pub async fn next_point(
        &self,
        actor: &Actor,
        area_id: Uuid,
        strategy: NextPointStrategy,
    ) -> DomainResult<NextPoint> {
        self.authorized_area(actor, area_id).await?;
        let points = self.store.points_for_area(area_id).await?;
        Ok(select_next(&points, strategy))
    }

    pub async fn progress(&self, actor: &Actor, area_id: Uuid) -> DomainResult<ProgressSnapshot> {
        self.authorized_area(actor, area_id).await?;
        let points = self.store.points_for_area(area_id).await?;
        Ok(compute_progress(&points))
    }

    /// Fills an unmeasured point with readings and recomputes the area.
    pub async fn complete_measurement(
        &self,
        actor: &Actor,
        area_id: Uuid,
        point_id: &str,
        request: CompleteMeasurementRequest,
    ) -> DomainResult<CompleteMeasurementResponse> {
        request.validate()?;
        self.authorized_area(actor, area_id).await?;

        let now = Utc::now();
        let reading = PointReading {
            device_id: request.device_id.clone(),
            latitude: request.latitude.map(round_coordinate),
            longitude: request.longitude.map(round_coordinate),
            values: self.normalize_values(request.values())?,
            measurement_date: request.measurement_date.unwrap_or_else(|| now.date_naive()),
            measurement_time: request.measurement_time.unwrap_or_else(|| now.time()),
        };

        let completed = self.store.record_point(area_id, point_id, reading).await?;
        tracing::info!(area_id = %area_id, point_id = %point_id, "Point measured");

        let completed = PointResponse::from(completed);
        self.publish(LiveEvent::PointCompleted {
            area_id,
            point: completed.clone(),
        });

        let area = self.recompute(area_id).await?;
        let points = self.store.points_for_area(area_id).await?;
        let next = if request.auto_advance {
            select_next(&points, NextPointStrategy::Sequential).into_point()
        } else {
            None
        };

        Ok(CompleteMeasurementResponse {
            completed,
            next,
            progress: compute_progress(&points),
            area: AreaResponse::from(area),
        })
    }

    /// Marks an unmeasured point as visited without readings.
    ///
    /// The area is recomputed so its total follows the configured policy;
    /// the sentinel never enters the averages.
    pub async fn skip_point(
        &self,
        actor: &Actor,
        area_id: Uuid,
        point_id: &str,
        request: SkipPointRequest,
    ) -> DomainResult<SkipPointResponse> {
        request.validate()?;
        self.authorized_area(actor, area_id).await?;

        let now = Utc::now();
        let reading = PointReading {
            device_id: request.device_id.clone(),
            latitude: None,
            longitude: None,
            values: MetricValues::skipped(),
            measurement_date: now.date_naive(),
            measurement_time: now.time(),
        };

        let skipped = self.store.record_point(area_id, point_id, reading).await?;
        tracing::info!(
            area_id = %area_id,
            point_id = %point_id,
            reason = request.reason.as_deref().unwrap_or(""),
            "Point skipped"
        );

        self.publish(LiveEvent::PointSkipped {
            area_id,
            point_id: point_id.to_string(),
            reason: request.reason.clone(),
        });
        self.recompute(area_id).await?;

        let points = self.store.points_for_area(area_id).await?;
        Ok(SkipPointResponse {
            skipped: PointResponse::from(skipped),
            reason: request.reason,
            next: select_next(&points, NextPointStrategy::Sequential).into_point(),
            progress: compute_progress(&points),
        })
    }

    /// Returns every point of the area to unmeasured.
    pub async fn reset_points(&self, actor: &Actor, area_id: Uuid) -> DomainResult<ResetPointsResponse> {
        self.authorized_area(actor, area_id).await?;

        let reset_count = self.store.reset_points(area_id).await?;
        tracing::info!(area_id = %area_id, reset_count, "Points reset");
        self.publish(LiveEvent::PointsReset {
            area_id,
            reset_count,
        });

        self.recompute(area_id).await?;
        let points = self.store.points_for_area(area_id).await?;
        Ok(ResetPointsResponse {
            area_id,
            reset_count,
            progress: compute_progress(&points),
        })
    }

    // ------------------------------------------------------------------
    // Coordinates
    // ------------------------------------------------------------------

    async fn write_coordinates(
        &self,
        area_id: Uuid,
        updates: Vec<CoordinateUpdate>,
    ) -> DomainResult<Vec<PointCoordinates>> {
        if updates.len() > self.settings.max_points_per_request as usize {
            return Err(DomainError::InvalidArgument(format!(
                "At most {} points can be updated per request",
                self.settings.max_points_per_request
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = updates.iter().find(|u| !seen.insert(u.point_id.as_str())) {
            return Err(DomainError::InvalidArgument(format!(
                "Point '{}' appears more than once",
                dup.point_id
            )));
        }

        let rows = self.store.update_point_coordinates(area_id, &updates).await?;
        tracing::info!(area_id = %area_id, count = rows.len(), "Point coordinates updated");
        Ok(rows.into_iter().map(PointCoordinates::from).collect())
    }

    pub async fn update_point_coordinates(
        &self,
        actor: &Actor,
        area_id: Uuid,
        point_id: &str,
        request: UpdateCoordinatesRequest,
    ) -> DomainResult<UpdateCoordinatesResponse> {
        request.validate()?;
        self.authorized_area(actor, area_id).await?;

        let update = CoordinateUpdate {
            point_id: point_id.to_string(),
            position: LatLng::rounded(request.lat, request.lng),
        };
        let point = self
            .write_coordinates(area_id, vec![update])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::point_not_found(point_id))?;

        Ok(UpdateCoordinatesResponse {
            area_id,
            source: request.source,
            point,
        })
    }

    /// Point coordinates ordered by point id. Unlocated points are left out
    /// unless `include_nulls` is set.
    pub async fn list_coordinates(
        &self,
        actor: &Actor,
        area_id: Uuid,
        include_nulls: bool,
    ) -> DomainResult<ListCoordinatesResponse> {
        self.authorized_area(actor, area_id).await?;

        let points: Vec<Measurement> = self
            .store
            .points_for_area(area_id)
            .await?
            .into_iter()
            .filter(|p| include_nulls || LatLng::of(p).is_some())
            .collect();

        Ok(ListCoordinatesResponse {
            area_id,
            statistics: count_coordinates(&points),
            coordinates: points.into_iter().map(PointCoordinates::from).collect(),
        })
    }

    /// Sets coordinates on many points. Any unknown point fails the whole batch.
    pub async fn bulk_update_coordinates(
        &self,
        actor: &Actor,
        area_id: Uuid,
        request: BulkUpdateCoordinatesRequest,
    ) -> DomainResult<BulkUpdateCoordinatesResponse> {
        request.validate()?;
        self.authorized_area(actor, area_id).await?;

        let updates = request
            .coordinates
            .into_iter()
            .map(|c| CoordinateUpdate {
                point_id: c.point_id,
                position: LatLng::rounded(c.lat, c.lng),
            })
            .collect();
        let updated_points = self.write_coordinates(area_id, updates).await?;

        Ok(BulkUpdateCoordinatesResponse {
            area_id,
            count: updated_points.len(),
            updated_points,
        })
    }

    pub async fn gps_statistics(
        &self,
        actor: &Actor,
        area_id: Uuid,
    ) -> DomainResult<GpsStatisticsResponse> {
        self.authorized_area(actor, area_id).await?;
        let points = self.store.points_for_area(area_id).await?;
        Ok(GpsStatisticsResponse {
            area_id,
            gps_statistics: compute_gps_statistics(&points),
        })
    }

    /// Estimates coordinates for unlocated points from their grid position,
    /// writing them back when `apply` is set.
    pub async fn estimate_missing_coordinates(
        &self,
        actor: &Actor,
        area_id: Uuid,
        request: EstimateCoordinatesRequest,
    ) -> DomainResult<EstimateCoordinatesResponse> {
        request.validate()?;
        if !request.lat_spacing.is_finite() || !request.lng_spacing.is_finite() {
            return Err(DomainError::InvalidArgument(
                "Grid spacing must be a finite number".into(),
            ));
        }
        self.authorized_area(actor, area_id).await?;

        let points = self.store.points_for_area(area_id).await?;
        let estimated_points = estimate_missing(&points, &request);

        let applied = request.apply && !estimated_points.is_empty();
        if applied {
            let updates = estimated_points
                .iter()
                .map(|e| CoordinateUpdate {
                    point_id: e.point_id.clone(),
                    position: e.estimated_coordinates,
                })
                .collect();
            self.write_coordinates(area_id, updates).await?;
        }

        tracing::debug!(
            area_id = %area_id,
            count = estimated_points.len(),
            applied,
            "Coordinates estimated"
        );
        Ok(EstimateCoordinatesResponse {
            area_id,
            count: estimated_points.len(),
            grid_configuration: GridConfiguration::from(&request),
            estimated_points,
            applied,
        })
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub async fn start_session(
        &self,
        actor: &Actor,
        area_id: Uuid,
        request: StartSessionRequest,
    ) -> DomainResult<StartSessionResponse> {
        request.validate()?;
        self.authorized_area(actor, area_id).await?;

        let points = self.store.points_for_area(area_id).await?;
        if points.is_empty() {
            return Err(DomainError::InvalidArgument(
                "Area has no measurement points; create points first".into(),
            ));
        }

        let progress = compute_progress(&points);
        let current_point = match select_next(&points, NextPointStrategy::Sequential) {
            NextPoint::Point(p) => p,
            NextPoint::Complete => {
                return Err(DomainError::Conflict(
                    "All points in this area are already measured".into(),
                ))
            }
        };

        let session_id = Uuid::new_v4();
        tracing::info!(
            area_id = %area_id,
            session_id = %session_id,
            first_point = %current_point.point_id,
            "Measurement session started"
        );

        Ok(StartSessionResponse {
            session_id,
            area_id,
            started_at: Utc::now(),
            current_point,
            progress,
            settings: request,
        })
    }

    pub async fn session_status(
        &self,
        actor: &Actor,
        area_id: Uuid,
    ) -> DomainResult<SessionStatusResponse> {
        self.authorized_area(actor, area_id).await?;

        let points = self.store.points_for_area(area_id).await?;
        let progress = compute_progress(&points);
        let (first_measurement_date, last_measurement_date) = measurement_date_range(&points);

        Ok(SessionStatusResponse {
            area_id,
            state: progress.session_state(),
            progress,
            first_measurement_date,
            last_measurement_date,
            next_point: select_next(&points, NextPointStrategy::Sequential).into_point(),
        })
    }

    // ------------------------------------------------------------------
    // Measurements
    // ------------------------------------------------------------------

    /// Authorizes access to a stored measurement through its area.
    ///
    /// Measurements without an area are readable by any authenticated caller.
    async fn authorized_measurement(
        &self,
        actor: &Actor,
        measurement_id: i64,
    ) -> DomainResult<Measurement> {
        let measurement = self
            .store
            .find_measurement(measurement_id)
            .await?
            .ok_or_else(|| DomainError::measurement_not_found(measurement_id))?;
        if let Some(area_id) = measurement.area_id {
            self.authorized_area(actor, area_id).await?;
        }
        Ok(measurement)
    }

    pub async fn record_measurement(
        &self,
        actor: &Actor,
        request: CreateMeasurementRequest,
    ) -> DomainResult<Measurement> {
        request.validate()?;
        if let Some(area_id) = request.area_id {
            self.authorized_area(actor, area_id).await?;
        }

        let measurement = self
            .store
            .insert_measurement(self.new_measurement(&request)?)
            .await?;
        tracing::info!(
            measurement_id = measurement.measurement_id,
            area_id = ?measurement.area_id,
            "Measurement recorded"
        );

        if let Some(area_id) = measurement.area_id {
            self.recompute(area_id).await?;
        }
        Ok(measurement)
    }

    pub async fn get_measurement(&self, actor: &Actor, measurement_id: i64) -> DomainResult<Measurement> {
        self.authorized_measurement(actor, measurement_id).await
    }

    /// Lists measurements visible to the caller, newest first.
    pub async fn list_measurements(
        &self,
        actor: &Actor,
        filter: MeasurementFilter,
    ) -> DomainResult<Vec<Measurement>> {
        if let Some(area_id) = filter.area_id {
            self.authorized_area(actor, area_id).await?;
            return self.store.list_measurements(filter).await;
        }

        let rows = self.store.list_measurements(filter).await?;
        if actor.is_admin() {
            return Ok(rows);
        }
        let owned: HashSet<Uuid> = self
            .store
            .list_areas(Some(actor.user_id))
            .await?
            .into_iter()
            .map(|a| a.area_id)
            .collect();
        Ok(rows
            .into_iter()
            .filter(|m| m.area_id.map_or(true, |a| owned.contains(&a)))
            .collect())
    }

    /// Applies a partial update and recomputes every affected area.
    pub async fn update_measurement(
        &self,
        actor: &Actor,
        measurement_id: i64,
        request: UpdateMeasurementRequest,
    ) -> DomainResult<Measurement> {
        request.validate()?;
        let existing = self.authorized_measurement(actor, measurement_id).await?;
        if let Some(new_area) = request.area_id {
            self.authorized_area(actor, new_area).await?;
        }

        let mut patch = request.into_patch();
        patch.values = self.normalize_values(patch.values)?;
        patch.latitude = patch.latitude.map(round_coordinate);
        patch.longitude = patch.longitude.map(round_coordinate);

        let updated = self.store.update_measurement(measurement_id, patch).await?;
        tracing::info!(measurement_id, "Measurement updated");

        let mut affected: Vec<Uuid> = existing.area_id.into_iter().collect();
        if let Some(area_id) = updated.area_id {
            if !affected.contains(&area_id) {
                affected.push(area_id);
            }
        }
        for area_id in affected {
            self.recompute(area_id).await?;
        }
        Ok(updated)
    }

    pub async fn delete_measurement(&self, actor: &Actor, measurement_id: i64) -> DomainResult<()> {
        self.authorized_measurement(actor, measurement_id).await?;
        let deleted = self.store.delete_measurement(measurement_id).await?;
        tracing::info!(measurement_id, "Measurement deleted");

        if let Some(area_id) = deleted.area_id {
            self.recompute(area_id).await?;
        }
        Ok(())
    }
}
