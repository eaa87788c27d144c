use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::Identity;
use crate::error::ApiError;
use crate::middleware::cookies::{append_cookies, cleared_cookies, session_cookies};
use crate::middleware::{ApiResponse, Credentials, SessionState};
use crate::policy::paths;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: Identity,
    /// Where the client should go next
    pub redirect: &'static str,
}

/// GET / - send signed-in callers to the dashboard, everyone else to login
pub async fn root(session: Option<Extension<SessionState>>) -> Redirect {
    let signed_in = session
        .as_ref()
        .map(|Extension(state)| state.identity().is_some())
        .unwrap_or(false);

    if signed_in {
        Redirect::temporary(paths::DASHBOARD)
    } else {
        Redirect::temporary(paths::LOGIN)
    }
}

/// POST /auth/login - password sign-in
///
/// Expected Input:
/// ```json
/// { "email": "officer@example.go.ke", "password": "..." }
/// ```
///
/// On success both session cookies are set and the body names the
/// dashboard as the next stop.
pub async fn login(State(state): State<AppState>, Json(payload): Json<LoginRequest>) -> Result<Response, ApiError> {
    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let session = match state.sessions.provider().sign_in_with_password(email, &payload.password).await {
        Ok(session) => session,
        Err(e) => {
            tracing::info!(error = %e, "sign-in failed");
            return Err(e.into());
        }
    };
    tracing::info!(user_id = %session.identity.id, "signed in");

    let mut response = ApiResponse::success(LoginResponse {
        user: session.identity,
        redirect: paths::DASHBOARD,
    })
    .into_response();
    append_cookies(
        response.headers_mut(),
        session_cookies(&session.tokens, state.sessions.config()),
    );
    Ok(response)
}

/// POST /auth/logout - revoke at the provider (best effort) and clear cookies
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let credentials = Credentials::from_headers(&headers, state.sessions.config());

    if let Some(access) = credentials.access_token.as_deref() {
        if let Err(e) = state.sessions.provider().sign_out(access).await {
            tracing::warn!(error = %e, "provider sign-out failed; clearing cookies anyway");
        }
    }

    // 303 so the browser follows with a GET
    let mut response = Redirect::to(paths::LOGIN).into_response();
    append_cookies(response.headers_mut(), cleared_cookies(state.sessions.config()));
    response
}
