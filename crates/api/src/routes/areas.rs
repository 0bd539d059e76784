//! Area endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AppJson, AppPath, AuthUser};
use domain::models::area::{AreaResponse, CreateAreaRequest, ListAreasResponse};
use domain::models::progress::AreaStatisticsResponse;
use domain::models::ProgressSnapshot;

/// Create an area, optionally with an initial batch of measurements.
///
/// POST /api/v1/areas
pub async fn create_area(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(request): AppJson<CreateAreaRequest>,
) -> Result<(StatusCode, Json<AreaResponse>), ApiError> {
    request.validate()?;

    let area = state.survey.create_area(&auth.actor, request).await?;
    info!(
        area_id = %area.area_id,
        owner_id = %area.owner_id,
        total_measurements = area.total_measurements,
        "Area created via API"
    );

    Ok((StatusCode::CREATED, Json(area.into())))
}

/// List the caller's areas.
///
/// GET /api/v1/areas
pub async fn list_areas(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ListAreasResponse>, ApiError> {
    let areas: Vec<AreaResponse> = state
        .survey
        .list_areas(&auth.actor)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(ListAreasResponse {
        total: areas.len(),
        areas,
    }))
}

/// GET /api/v1/areas/:area_id
pub async fn get_area(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(area_id): AppPath<Uuid>,
) -> Result<Json<AreaResponse>, ApiError> {
    let area = state.survey.get_area(&auth.actor, area_id).await?;
    Ok(Json(area.into()))
}

/// Recompute averages and the measurement total from stored rows.
///
/// POST /api/v1/areas/:area_id/recompute
pub async fn recompute_area(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(area_id): AppPath<Uuid>,
) -> Result<Json<AreaResponse>, ApiError> {
    let area = state
        .survey
        .recompute_area_averages(&auth.actor, area_id)
        .await?;
    Ok(Json(area.into()))
}

/// GET /api/v1/areas/:area_id/stats
pub async fn area_statistics(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(area_id): AppPath<Uuid>,
) -> Result<Json<AreaStatisticsResponse>, ApiError> {
    let stats = state.survey.area_statistics(&auth.actor, area_id).await?;
    Ok(Json(stats))
}

/// GET /api/v1/areas/:area_id/progress
pub async fn progress(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(area_id): AppPath<Uuid>,
) -> Result<Json<ProgressSnapshot>, ApiError> {
    let progress = state.survey.progress(&auth.actor, area_id).await?;
    Ok(Json(progress))
}
