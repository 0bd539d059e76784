//! Point sequencing endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AppJson, AppPath, AppQuery, AuthUser};
use crate::middleware::metrics::{
    record_point_completed, record_point_skipped, record_points_created,
};
use domain::models::measurement::{CompleteMeasurementRequest, PointResponse, SkipPointRequest};
use domain::models::point::{
    CompleteMeasurementResponse, CreatePointsRequest, CreatePointsResponse, ListPointsQuery,
    ListPointsResponse, NextPointQuery, NextPointResponse, ResetPointsResponse, SkipPointResponse,
};

/// Create unmeasured points from explicit ids, a grid, a prefix pattern or a count.
///
/// POST /api/v1/areas/:area_id/points
pub async fn create_points(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(area_id): AppPath<Uuid>,
    AppJson(request): AppJson<CreatePointsRequest>,
) -> Result<(StatusCode, Json<CreatePointsResponse>), ApiError> {
    request.validate()?;

    let response = state
        .survey
        .create_points(&auth.actor, area_id, request)
        .await?;
    record_points_created(response.total);

    Ok((StatusCode::CREATED, Json(response)))
}

/// List the points of an area, optionally filtered by status.
///
/// GET /api/v1/areas/:area_id/points?status=all|measured|unmeasured|skipped
pub async fn list_points(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(area_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<ListPointsQuery>,
) -> Result<Json<ListPointsResponse>, ApiError> {
    let points: Vec<PointResponse> = state
        .survey
        .list_points(&auth.actor, area_id, query.status)
        .await?
        .into_iter()
        .map(PointResponse::from)
        .collect();

    Ok(Json(ListPointsResponse {
        area_id,
        status: query.status,
        total: points.len(),
        points,
    }))
}

/// GET /api/v1/areas/:area_id/points/next?strategy=sequential|random|priority
pub async fn next_point(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(area_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<NextPointQuery>,
) -> Result<Json<NextPointResponse>, ApiError> {
    let point = state
        .survey
        .next_point(&auth.actor, area_id, query.strategy)
        .await?
        .into_point();

    Ok(Json(NextPointResponse {
        area_id,
        strategy: query.strategy,
        complete: point.is_none(),
        point,
    }))
}

/// Record readings on an unmeasured point and refresh the area averages.
///
/// POST /api/v1/areas/:area_id/points/:point_id/complete
pub async fn complete_point(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath((area_id, point_id)): AppPath<(Uuid, String)>,
    AppJson(request): AppJson<CompleteMeasurementRequest>,
) -> Result<Json<CompleteMeasurementResponse>, ApiError> {
    request.validate()?;

    let response = state
        .survey
        .complete_measurement(&auth.actor, area_id, &point_id, request)
        .await?;
    record_point_completed();

    Ok(Json(response))
}

/// Mark an unmeasured point as skipped. The body is optional.
///
/// POST /api/v1/areas/:area_id/points/:point_id/skip
pub async fn skip_point(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath((area_id, point_id)): AppPath<(Uuid, String)>,
    body: Option<AppJson<SkipPointRequest>>,
) -> Result<Json<SkipPointResponse>, ApiError> {
    let request = body.map(|AppJson(r)| r).unwrap_or_default();
    request.validate()?;

    let response = state
        .survey
        .skip_point(&auth.actor, area_id, &point_id, request)
        .await?;
    record_point_skipped();

    Ok(Json(response))
}

/// Return every point of the area to unmeasured.
///
/// POST /api/v1/areas/:area_id/points/reset
pub async fn reset_points(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(area_id): AppPath<Uuid>,
) -> Result<Json<ResetPointsResponse>, ApiError> {
    let response = state.survey.reset_points(&auth.actor, area_id).await?;
    info!(
        area_id = %area_id,
        reset_count = response.reset_count,
        "Points reset via API"
    );
    Ok(Json(response))
}
