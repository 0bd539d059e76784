//! Storage seam for areas and measurements.

use uuid::Uuid;

use crate::error::DomainResult;
use crate::models::{
    Area, CoordinateUpdate, Measurement, MeasurementFilter, MeasurementPatch, NewArea,
    NewMeasurement, PointReading,
};
use crate::services::aggregate::TotalCountPolicy;

/// Persistent store behind the survey workflow.
///
/// Implementations must make `create_area`, `insert_points`,
/// `update_point_coordinates` and `recompute_area` atomic, and `record_point`
/// a single conditional write.
#[async_trait::async_trait]
pub trait AreaStore: Send + Sync {
    /// Creates an area together with its initial measurements.
    async fn create_area(&self, new_area: NewArea) -> DomainResult<Area>;

    async fn find_area(&self, area_id: Uuid) -> DomainResult<Option<Area>>;

    /// Lists areas, restricted to one owner when given, newest first.
    async fn list_areas(&self, owner_id: Option<Uuid>) -> DomainResult<Vec<Area>>;

    /// Inserts one unmeasured placeholder per id, all or nothing.
    ///
    /// Fails with `Conflict` when an id already exists in the area and
    /// `NotFound` when the area does not exist.
    async fn insert_points(&self, area_id: Uuid, point_ids: &[String])
        -> DomainResult<Vec<Measurement>>;

    /// Rows of the area carrying a `point_id`, ordered by `point_id`.
    async fn points_for_area(&self, area_id: Uuid) -> DomainResult<Vec<Measurement>>;

    /// Every row associated with the area.
    async fn measurements_for_area(&self, area_id: Uuid) -> DomainResult<Vec<Measurement>>;

    /// Writes a reading onto an unmeasured point.
    ///
    /// Fails with `Conflict` if the point was already measured or skipped,
    /// `NotFound` if the area has no such point.
    async fn record_point(
        &self,
        area_id: Uuid,
        point_id: &str,
        reading: PointReading,
    ) -> DomainResult<Measurement>;

    /// Sets coordinates on points of the area, all or nothing.
    ///
    /// Fails with `NotFound` naming the first point the area does not have;
    /// nothing is written in that case. Returns the updated rows in input order.
    async fn update_point_coordinates(
        &self,
        area_id: Uuid,
        updates: &[CoordinateUpdate],
    ) -> DomainResult<Vec<Measurement>>;

    /// Returns every point of the area to unmeasured. Yields the number of rows reset.
    async fn reset_points(&self, area_id: Uuid) -> DomainResult<u64>;

    /// Recomputes the area's averages and total from its current measurements
    /// and writes them back in one atomic step.
    async fn recompute_area(&self, area_id: Uuid, policy: TotalCountPolicy) -> DomainResult<Area>;

    async fn insert_measurement(&self, measurement: NewMeasurement) -> DomainResult<Measurement>;

    async fn find_measurement(&self, measurement_id: i64) -> DomainResult<Option<Measurement>>;

    async fn list_measurements(&self, filter: MeasurementFilter) -> DomainResult<Vec<Measurement>>;

    /// Applies a coalescing patch. Fails with `NotFound` for unknown ids.
    async fn update_measurement(
        &self,
        measurement_id: i64,
        patch: MeasurementPatch,
    ) -> DomainResult<Measurement>;

    /// Deletes and returns the measurement. Fails with `NotFound` for unknown ids.
    async fn delete_measurement(&self, measurement_id: i64) -> DomainResult<Measurement>;
}
