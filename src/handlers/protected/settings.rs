use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::AuthError;
use crate::database::Profile;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, Credentials, CurrentIdentity, SessionState};
use crate::policy::{authorize, Denial, RouteAccess};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub new_password: String,
    pub confirm_password: String,
}

/// GET /settings - the caller's own profile
pub async fn settings(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<ApiResponse<Profile>, Denial> {
    let user = authorize(state.store.as_ref(), &identity, &RouteAccess::SETTINGS).await?;
    Ok(ApiResponse::success(user))
}

pub fn validate_new_password(request: &ChangePasswordRequest) -> Result<(), ApiError> {
    if request.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "New password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    if request.new_password != request.confirm_password {
        return Err(ApiError::bad_request("New passwords do not match"));
    }
    Ok(())
}

/// POST /settings/password - set a new password and flag the profile as changed
///
/// Expected Input:
/// ```json
/// { "new_password": "...", "confirm_password": "..." }
/// ```
pub async fn change_password(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    session: Option<Extension<SessionState>>,
    headers: HeaderMap,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<ApiResponse<Value>, ApiError> {
    let user = authorize(state.store.as_ref(), &identity, &RouteAccess::SETTINGS).await?;
    validate_new_password(&request)?;

    // A token rotated on this request supersedes the one in the cookie
    let access_token = session
        .as_ref()
        .and_then(|Extension(s)| s.renewed())
        .map(|tokens| tokens.access_token.clone())
        .or_else(|| Credentials::from_headers(&headers, state.sessions.config()).access_token)
        .ok_or_else(|| ApiError::unauthorized("Missing credentials"))?;

    match state
        .sessions
        .provider()
        .update_password(&access_token, &request.new_password)
        .await
    {
        Ok(()) => {}
        Err(AuthError::Rejected { message, .. }) => {
            tracing::info!(user_id = %user.id, error = %message, "password change rejected");
            return Err(ApiError::bad_request(message));
        }
        Err(e) => return Err(e.into()),
    }
    tracing::info!(user_id = %user.id, "password changed");

    if let Err(e) = state.store.mark_password_changed(user.id).await {
        tracing::warn!(user_id = %user.id, error = %e, "failed to flag password change");
    }

    Ok(ApiResponse::success(json!({ "password_changed": true })))
}
