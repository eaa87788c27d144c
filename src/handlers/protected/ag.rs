use axum::extract::State;

use crate::app::AppState;
use crate::middleware::{ApiResponse, CurrentIdentity};
use crate::policy::{authorize, Denial, RouteAccess};
use crate::services::AgDashboard;

/// GET /dashboard/ag - cross-department overview
pub async fn home(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<ApiResponse<AgDashboard>, Denial> {
    let user = authorize(state.store.as_ref(), &identity, &RouteAccess::AG_HOME).await?;
    Ok(ApiResponse::success(state.dashboards.ag(user).await))
}
