//! Point GPS coordinate endpoint handlers.

use axum::{extract::State, Json};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AppJson, AppPath, AppQuery, AuthUser};
use crate::middleware::metrics::record_coordinates_updated;
use domain::models::coordinates::{
    BulkUpdateCoordinatesRequest, BulkUpdateCoordinatesResponse, EstimateCoordinatesRequest,
    EstimateCoordinatesResponse, GpsStatisticsResponse, ListCoordinatesQuery,
    ListCoordinatesResponse, UpdateCoordinatesRequest, UpdateCoordinatesResponse,
};

/// PUT /api/v1/areas/:area_id/points/:point_id/coordinates
pub async fn update_point_coordinates(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath((area_id, point_id)): AppPath<(Uuid, String)>,
    AppJson(request): AppJson<UpdateCoordinatesRequest>,
) -> Result<Json<UpdateCoordinatesResponse>, ApiError> {
    request.validate()?;

    let response = state
        .survey
        .update_point_coordinates(&auth.actor, area_id, &point_id, request)
        .await?;
    record_coordinates_updated(1);

    Ok(Json(response))
}

/// List point coordinates ordered by point id.
///
/// GET /api/v1/areas/:area_id/coordinates?includeNulls=true|false
pub async fn list_coordinates(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(area_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<ListCoordinatesQuery>,
) -> Result<Json<ListCoordinatesResponse>, ApiError> {
    let response = state
        .survey
        .list_coordinates(&auth.actor, area_id, query.include_nulls)
        .await?;
    Ok(Json(response))
}

/// Set coordinates on many points. Nothing is written if any point is unknown.
///
/// PUT /api/v1/areas/:area_id/coordinates
pub async fn bulk_update_coordinates(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(area_id): AppPath<Uuid>,
    AppJson(request): AppJson<BulkUpdateCoordinatesRequest>,
) -> Result<Json<BulkUpdateCoordinatesResponse>, ApiError> {
    request.validate()?;

    let response = state
        .survey
        .bulk_update_coordinates(&auth.actor, area_id, request)
        .await?;
    record_coordinates_updated(response.count);
    info!(area_id = %area_id, count = response.count, "Coordinates bulk updated via API");

    Ok(Json(response))
}

/// GET /api/v1/areas/:area_id/coordinates/stats
pub async fn gps_statistics(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(area_id): AppPath<Uuid>,
) -> Result<Json<GpsStatisticsResponse>, ApiError> {
    let response = state.survey.gps_statistics(&auth.actor, area_id).await?;
    Ok(Json(response))
}

/// Estimate coordinates for unlocated points from a grid origin and spacing.
///
/// POST /api/v1/areas/:area_id/coordinates/estimate
pub async fn estimate_missing_coordinates(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(area_id): AppPath<Uuid>,
    AppJson(request): AppJson<EstimateCoordinatesRequest>,
) -> Result<Json<EstimateCoordinatesResponse>, ApiError> {
    request.validate()?;

    let response = state
        .survey
        .estimate_missing_coordinates(&auth.actor, area_id, request)
        .await?;
    if response.applied {
        record_coordinates_updated(response.count);
    }

    Ok(Json(response))
}
