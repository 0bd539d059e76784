//! Measurement endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AppJson, AppPath, AppQuery, AuthUser};
use crate::middleware::metrics::record_measurement_recorded;
use domain::models::measurement::{
    CreateMeasurementRequest, ListMeasurementsQuery, ListMeasurementsResponse,
    UpdateMeasurementRequest,
};
use domain::models::{Measurement, MeasurementFilter};

/// Record a measurement outside the point workflow.
///
/// POST /api/v1/measurements
pub async fn create_measurement(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(request): AppJson<CreateMeasurementRequest>,
) -> Result<(StatusCode, Json<Measurement>), ApiError> {
    request.validate()?;

    let measurement = state.survey.record_measurement(&auth.actor, request).await?;
    record_measurement_recorded();

    Ok((StatusCode::CREATED, Json(measurement)))
}

/// GET /api/v1/measurements?areaId=&deviceId=
pub async fn list_measurements(
    State(state): State<AppState>,
    auth: AuthUser,
    AppQuery(query): AppQuery<ListMeasurementsQuery>,
) -> Result<Json<ListMeasurementsResponse>, ApiError> {
    let filter = MeasurementFilter {
        area_id: query.area_id,
        device_id: query.device_id,
    };
    let measurements = state.survey.list_measurements(&auth.actor, filter).await?;

    Ok(Json(ListMeasurementsResponse {
        total: measurements.len(),
        measurements,
    }))
}

/// GET /api/v1/measurements/:measurement_id
pub async fn get_measurement(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(measurement_id): AppPath<i64>,
) -> Result<Json<Measurement>, ApiError> {
    let measurement = state
        .survey
        .get_measurement(&auth.actor, measurement_id)
        .await?;
    Ok(Json(measurement))
}

/// Partially update a measurement. Omitted fields keep their values.
///
/// PATCH /api/v1/measurements/:measurement_id
pub async fn update_measurement(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(measurement_id): AppPath<i64>,
    AppJson(request): AppJson<UpdateMeasurementRequest>,
) -> Result<Json<Measurement>, ApiError> {
    request.validate()?;

    let measurement = state
        .survey
        .update_measurement(&auth.actor, measurement_id, request)
        .await?;
    Ok(Json(measurement))
}

/// DELETE /api/v1/measurements/:measurement_id
pub async fn delete_measurement(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(measurement_id): AppPath<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .survey
        .delete_measurement(&auth.actor, measurement_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
