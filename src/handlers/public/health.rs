use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET /health - liveness plus a database ping
///
/// Always 200 while the process is up; the database field reports
/// `connected` or `disconnected`.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = match state.store.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unreachable");
            "disconnected"
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now(),
            "uptime_secs": state.started_at.elapsed().as_secs(),
            "environment": state.config.environment.as_str(),
            "version": env!("CARGO_PKG_VERSION"),
            "database": database,
        })),
    )
}
