use std::sync::Arc;
use std::time::Instant;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::AuthProvider;
use crate::config::AppConfig;
use crate::database::TrackerStore;
use crate::handlers::{protected, public};
use crate::middleware::{session_middleware, SessionResolver};
use crate::services::{ActivityService, DashboardService};

/// Shared per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn TrackerStore>,
    pub sessions: SessionResolver,
    pub dashboards: DashboardService,
    pub activities: ActivityService,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn TrackerStore>, auth: Arc<dyn AuthProvider>) -> Self {
        let sessions = SessionResolver::new(auth, config.session.clone());
        Self {
            config: Arc::new(config),
            dashboards: DashboardService::new(store.clone()),
            activities: ActivityService::new(store.clone()),
            store,
            sessions,
            started_at: Instant::now(),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    let router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(auth_routes())
        // Session-gated
        .merge(dashboard_routes())
        .merge(activity_routes())
        .route("/settings", get(protected::settings))
        .route("/settings/password", post(protected::settings::change_password))
        .layer(from_fn_with_state(state.sessions.clone(), session_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(public::login))
        .route("/auth/logout", post(public::logout))
}

fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(protected::landing))
        .route("/dashboard/officer", get(protected::officer::home))
        .route(
            "/dashboard/officer/activities",
            get(protected::officer::activities).post(protected::officer::submit),
        )
        .route("/dashboard/hod", get(protected::hod::home))
        .route("/dashboard/hod/team", get(protected::hod::team))
        .route("/dashboard/hod/activities", get(protected::hod::activities))
        .route("/dashboard/hod/analytics", get(protected::hod::analytics))
        .route("/dashboard/ag", get(protected::ag::home))
}

fn activity_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/hod/activities/:id/status", post(protected::hod::review))
        .route(
            "/activities/:id/comments",
            get(protected::comments::list).post(protected::comments::post),
        )
}

fn cors_layer(config: &AppConfig) -> Option<CorsLayer> {
    if !config.security.enable_cors {
        return None;
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
    )
}
