use axum::{extract::State, Json};

use crate::app::AppState;
use crate::database::Activity;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, CurrentIdentity};
use crate::policy::{authorize, Denial, RouteAccess};
use crate::services::{OfficerDashboard, SubmitActivity};

/// GET /dashboard/officer - department services and the officer's own activities
pub async fn home(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<ApiResponse<OfficerDashboard>, Denial> {
    let user = authorize(state.store.as_ref(), &identity, &RouteAccess::OFFICER_HOME).await?;
    Ok(ApiResponse::success(state.dashboards.officer(user).await))
}

/// GET /dashboard/officer/activities - same data; a dangling department id is denied
pub async fn activities(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<ApiResponse<OfficerDashboard>, Denial> {
    let user = authorize(state.store.as_ref(), &identity, &RouteAccess::OFFICER_ACTIVITIES).await?;
    Ok(ApiResponse::success(state.dashboards.officer(user).await))
}

/// POST /dashboard/officer/activities - submit work against a department service
///
/// Expected Input:
/// ```json
/// { "service_id": 10, "description": "Audited county ledgers", "count": 4 }
/// ```
pub async fn submit(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(request): Json<SubmitActivity>,
) -> Result<ApiResponse<Activity>, ApiError> {
    let user = authorize(state.store.as_ref(), &identity, &RouteAccess::OFFICER_SUBMIT).await?;
    let activity = state.activities.submit(&user, request).await?;
    Ok(ApiResponse::created(activity))
}
