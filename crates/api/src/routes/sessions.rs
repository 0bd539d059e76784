//! Survey session endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AppJson, AppPath, AuthUser};
use domain::models::progress::{SessionStatusResponse, StartSessionRequest, StartSessionResponse};

/// POST /api/v1/areas/:area_id/session
pub async fn start_session(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(area_id): AppPath<Uuid>,
    body: Option<AppJson<StartSessionRequest>>,
) -> Result<(StatusCode, Json<StartSessionResponse>), ApiError> {
    let request = body.map(|AppJson(r)| r).unwrap_or_default();
    request.validate()?;

    let response = state
        .survey
        .start_session(&auth.actor, area_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/areas/:area_id/session
pub async fn session_status(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(area_id): AppPath<Uuid>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    let status = state.survey.session_status(&auth.actor, area_id).await?;
    Ok(Json(status))
}
