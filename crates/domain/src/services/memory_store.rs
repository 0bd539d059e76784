//! In-memory `AreaStore` used by tests and local development.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::{
    Area, CoordinateUpdate, Measurement, MeasurementFilter, MeasurementPatch, NewArea,
    NewMeasurement, PointReading, PointStatus,
};
use crate::services::aggregate::{compute_area_aggregate, TotalCountPolicy};
use crate::services::sequencer::sort_points;
use crate::services::store::AreaStore;

#[derive(Debug, Default)]
struct State {
    areas: HashMap<Uuid, Area>,
    measurements: BTreeMap<i64, Measurement>,
    next_measurement_id: i64,
}

impl State {
    fn point_taken(&self, area_id: Uuid, point_id: &str, except: Option<i64>) -> bool {
        self.measurements.values().any(|m| {
            Some(m.measurement_id) != except
                && m.area_id == Some(area_id)
                && m.point_id.as_deref() == Some(point_id)
        })
    }

    fn check_insert(&self, new: &NewMeasurement) -> DomainResult<()> {
        if let Some(area_id) = new.area_id {
            if !self.areas.contains_key(&area_id) {
                return Err(DomainError::area_not_found(area_id));
            }
            if let Some(point_id) = new.point_id.as_deref() {
                if self.point_taken(area_id, point_id, None) {
                    return Err(DomainError::Conflict(format!(
                        "Point '{}' already exists in area",
                        point_id
                    )));
                }
            }
        }
        Ok(())
    }

    fn insert(&mut self, new: NewMeasurement) -> Measurement {
        self.next_measurement_id += 1;
        let now = Utc::now();
        let measurement = Measurement {
            measurement_id: self.next_measurement_id,
            area_id: new.area_id,
            device_id: new.device_id,
            point_id: new.point_id,
            latitude: new.latitude,
            longitude: new.longitude,
            values: new.values,
            measurement_date: new.measurement_date,
            measurement_time: new.measurement_time,
            created_at: now,
            updated_at: now,
        };
        self.measurements
            .insert(measurement.measurement_id, measurement.clone());
        measurement
    }
}

/// Thread-safe in-memory store with the same guarantees as the Postgres store.
#[derive(Debug, Default)]
pub struct InMemoryAreaStore {
    state: Mutex<State>,
}

impl InMemoryAreaStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> DomainResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| DomainError::Internal("in-memory store lock poisoned".into()))
    }
}

#[async_trait::async_trait]
impl AreaStore for InMemoryAreaStore {
    async fn create_area(&self, new_area: NewArea) -> DomainResult<Area> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let area = Area {
            area_id: Uuid::new_v4(),
            owner_id: new_area.owner_id,
            name: new_area.name,
            temperature_avg: None,
            moisture_avg: None,
            ph_avg: None,
            nitrogen_avg: None,
            phosphorus_avg: None,
            potassium_avg: None,
            total_measurements: 0,
            created_at: now,
            updated_at: now,
        };

        // Validate the whole batch before committing anything.
        let mut staged = State {
            areas: HashMap::from([(area.area_id, area.clone())]),
            ..Default::default()
        };
        let mut rows = Vec::with_capacity(new_area.measurements.len());
        for mut m in new_area.measurements {
            m.area_id = Some(area.area_id);
            staged.check_insert(&m)?;
            staged.insert(m.clone());
            rows.push(m);
        }

        state.areas.insert(area.area_id, area.clone());
        for m in rows {
            state.insert(m);
        }
        Ok(area)
    }

    async fn find_area(&self, area_id: Uuid) -> DomainResult<Option<Area>> {
        Ok(self.lock()?.areas.get(&area_id).cloned())
    }

    async fn list_areas(&self, owner_id: Option<Uuid>) -> DomainResult<Vec<Area>> {
        let state = self.lock()?;
        let mut areas: Vec<Area> = state
            .areas
            .values()
            .filter(|a| owner_id.map_or(true, |o| a.owner_id == o))
            .cloned()
            .collect();
        areas.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(areas)
    }

    async fn insert_points(
        &self,
        area_id: Uuid,
        point_ids: &[String],
    ) -> DomainResult<Vec<Measurement>> {
        let mut state = self.lock()?;
        if !state.areas.contains_key(&area_id) {
            return Err(DomainError::area_not_found(area_id));
        }
        for (i, id) in point_ids.iter().enumerate() {
            if state.point_taken(area_id, id, None) || point_ids[..i].contains(id) {
                return Err(DomainError::Conflict(format!(
                    "Point '{}' already exists in area",
                    id
                )));
            }
        }
        Ok(point_ids
            .iter()
            .map(|id| state.insert(NewMeasurement::placeholder(area_id, id.clone())))
            .collect())
    }

    async fn points_for_area(&self, area_id: Uuid) -> DomainResult<Vec<Measurement>> {
        let state = self.lock()?;
        let mut points: Vec<Measurement> = state
            .measurements
            .values()
            .filter(|m| m.area_id == Some(area_id) && m.is_point())
            .cloned()
            .collect();
        sort_points(&mut points);
        Ok(points)
    }

    async fn measurements_for_area(&self, area_id: Uuid) -> DomainResult<Vec<Measurement>> {
        let state = self.lock()?;
        Ok(state
            .measurements
            .values()
            .filter(|m| m.area_id == Some(area_id))
            .cloned()
            .collect())
    }

    async fn record_point(
        &self,
        area_id: Uuid,
        point_id: &str,
        reading: PointReading,
    ) -> DomainResult<Measurement> {
        let mut state = self.lock()?;
        let row = state
            .measurements
            .values_mut()
            .find(|m| m.area_id == Some(area_id) && m.point_id.as_deref() == Some(point_id))
            .ok_or_else(|| DomainError::point_not_found(point_id))?;

        match row.status() {
            PointStatus::Unmeasured => {}
            PointStatus::Measured => {
                return Err(DomainError::Conflict(format!(
                    "Point '{}' is already measured",
                    point_id
                )))
            }
            PointStatus::Skipped => {
                return Err(DomainError::Conflict(format!(
                    "Point '{}' was already skipped",
                    point_id
                )))
            }
        }

        row.values = reading.values.or(&row.values);
        row.device_id = reading.device_id.or(row.device_id.take());
        row.latitude = reading.latitude.or(row.latitude);
        row.longitude = reading.longitude.or(row.longitude);
        row.measurement_date = Some(reading.measurement_date);
        row.measurement_time = Some(reading.measurement_time);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn update_point_coordinates(
        &self,
        area_id: Uuid,
        updates: &[CoordinateUpdate],
    ) -> DomainResult<Vec<Measurement>> {
        let mut state = self.lock()?;
        let mut ids = Vec::with_capacity(updates.len());
        for update in updates {
            let id = state
                .measurements
                .values()
                .find(|m| {
                    m.area_id == Some(area_id)
                        && m.point_id.as_deref() == Some(update.point_id.as_str())
                })
                .map(|m| m.measurement_id)
                .ok_or_else(|| DomainError::point_not_found(&update.point_id))?;
            ids.push(id);
        }

        let now = Utc::now();
        let mut rows = Vec::with_capacity(ids.len());
        for (id, update) in ids.into_iter().zip(updates) {
            let row = state
                .measurements
                .get_mut(&id)
                .ok_or_else(|| DomainError::point_not_found(&update.point_id))?;
            row.latitude = Some(update.position.lat);
            row.longitude = Some(update.position.lng);
            row.updated_at = now;
            rows.push(row.clone());
        }
        Ok(rows)
    }

    async fn reset_points(&self, area_id: Uuid) -> DomainResult<u64> {
        let mut state = self.lock()?;
        if !state.areas.contains_key(&area_id) {
            return Err(DomainError::area_not_found(area_id));
        }
        let now = Utc::now();
        let mut count = 0;
        for m in state
            .measurements
            .values_mut()
            .filter(|m| m.area_id == Some(area_id) && m.is_point())
        {
            m.values = Default::default();
            m.measurement_date = None;
            m.measurement_time = None;
            m.updated_at = now;
            count += 1;
        }
        Ok(count)
    }

    async fn recompute_area(&self, area_id: Uuid, policy: TotalCountPolicy) -> DomainResult<Area> {
        let mut state = self.lock()?;
        let rows: Vec<Measurement> = state
            .measurements
            .values()
            .filter(|m| m.area_id == Some(area_id))
            .cloned()
            .collect();
        let area = state
            .areas
            .get_mut(&area_id)
            .ok_or_else(|| DomainError::area_not_found(area_id))?;

        let aggregate = compute_area_aggregate(&rows, policy);
        let averages = aggregate.averages;
        area.temperature_avg = averages.temperature;
        area.moisture_avg = averages.moisture;
        area.ph_avg = averages.ph;
        area.nitrogen_avg = averages.nitrogen;
        area.phosphorus_avg = averages.phosphorus;
        area.potassium_avg = averages.potassium;
        area.total_measurements = aggregate.total_measurements;
        area.updated_at = Utc::now();
        Ok(area.clone())
    }

    async fn insert_measurement(&self, measurement: NewMeasurement) -> DomainResult<Measurement> {
        let mut state = self.lock()?;
        state.check_insert(&measurement)?;
        Ok(state.insert(measurement))
    }

    async fn find_measurement(&self, measurement_id: i64) -> DomainResult<Option<Measurement>> {
        Ok(self.lock()?.measurements.get(&measurement_id).cloned())
    }

    async fn list_measurements(&self, filter: MeasurementFilter) -> DomainResult<Vec<Measurement>> {
        let state = self.lock()?;
        let mut rows: Vec<Measurement> = state
            .measurements
            .values()
            .filter(|m| filter.area_id.map_or(true, |a| m.area_id == Some(a)))
            .filter(|m| {
                filter
                    .device_id
                    .as_deref()
                    .map_or(true, |d| m.device_id.as_deref() == Some(d))
            })
            .cloned()
            .collect();
        rows.reverse();
        Ok(rows)
    }

    async fn update_measurement(
        &self,
        measurement_id: i64,
        patch: MeasurementPatch,
    ) -> DomainResult<Measurement> {
        let mut state = self.lock()?;
        let current = state
            .measurements
            .get(&measurement_id)
            .cloned()
            .ok_or_else(|| DomainError::measurement_not_found(measurement_id))?;

        let area_id = patch.area_id.or(current.area_id);
        let point_id = patch.point_id.clone().or(current.point_id.clone());
        if let Some(area) = patch.area_id {
            if !state.areas.contains_key(&area) {
                return Err(DomainError::area_not_found(area));
            }
        }
        if let (Some(area), Some(point)) = (area_id, point_id.as_deref()) {
            if state.point_taken(area, point, Some(measurement_id)) {
                return Err(DomainError::Conflict(format!(
                    "Point '{}' already exists in area",
                    point
                )));
            }
        }

        let row = state
            .measurements
            .get_mut(&measurement_id)
            .ok_or_else(|| DomainError::measurement_not_found(measurement_id))?;
        row.area_id = area_id;
        row.point_id = point_id;
        row.device_id = patch.device_id.or(current.device_id);
        row.latitude = patch.latitude.or(current.latitude);
        row.longitude = patch.longitude.or(current.longitude);
        row.values = patch.values.or(&current.values);
        row.measurement_date = patch.measurement_date.or(current.measurement_date);
        row.measurement_time = patch.measurement_time.or(current.measurement_time);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_measurement(&self, measurement_id: i64) -> DomainResult<Measurement> {
        self.lock()?
            .measurements
            .remove(&measurement_id)
            .ok_or_else(|| DomainError::measurement_not_found(measurement_id))
    }
}
