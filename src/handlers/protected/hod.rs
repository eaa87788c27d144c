use axum::{
    extract::{Path, State},
    Json,
};

use crate::app::AppState;
use crate::database::ActivityStatus;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, CurrentIdentity};
use crate::policy::{authorize, Denial, RouteAccess};
use crate::services::{DepartmentDashboard, StatusReview, TeamDashboard};

/// GET /dashboard/hod - department activities with their current status
pub async fn home(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<ApiResponse<DepartmentDashboard>, Denial> {
    let user = authorize(state.store.as_ref(), &identity, &RouteAccess::HOD_HOME).await?;
    Ok(ApiResponse::success(state.dashboards.department(user).await))
}

/// GET /dashboard/hod/team
pub async fn team(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<ApiResponse<TeamDashboard>, Denial> {
    let user = authorize(state.store.as_ref(), &identity, &RouteAccess::HOD_DEPARTMENT).await?;
    Ok(ApiResponse::success(state.dashboards.team(user).await))
}

/// GET /dashboard/hod/activities
pub async fn activities(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<ApiResponse<DepartmentDashboard>, Denial> {
    let user = authorize(state.store.as_ref(), &identity, &RouteAccess::HOD_DEPARTMENT).await?;
    Ok(ApiResponse::success(state.dashboards.department(user).await))
}

/// GET /dashboard/hod/analytics
pub async fn analytics(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<ApiResponse<DepartmentDashboard>, Denial> {
    let user = authorize(state.store.as_ref(), &identity, &RouteAccess::HOD_DEPARTMENT).await?;
    Ok(ApiResponse::success(state.dashboards.department(user).await))
}

/// POST /dashboard/hod/activities/:id/status - append a reviewed status row
///
/// Expected Input:
/// ```json
/// { "pending_count": 1, "completed_count": 3, "status": "approved", "notes": "..." }
/// ```
///
/// `status` is optional and derived from the counts when left out.
pub async fn review(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(activity_id): Path<i64>,
    Json(request): Json<StatusReview>,
) -> Result<ApiResponse<ActivityStatus>, ApiError> {
    let user = authorize(state.store.as_ref(), &identity, &RouteAccess::HOD_DEPARTMENT).await?;
    let row = state.activities.review(&user, activity_id, request).await?;
    Ok(ApiResponse::created(row))
}
