use axum::{extract::State, response::Redirect};

use crate::app::AppState;
use crate::middleware::CurrentIdentity;
use crate::policy::{landing_target, paths};

/// GET /dashboard - dispatch to the caller's dashboard family
///
/// Reads only the category. A missing profile, a failed fetch or an
/// unknown category all land on the login page.
pub async fn landing(State(state): State<AppState>, CurrentIdentity(identity): CurrentIdentity) -> Redirect {
    let category = match state.store.profile(identity.id).await {
        Ok(Some(profile)) => profile.category,
        Ok(None) => {
            tracing::info!(user_id = %identity.id, "landing: no profile row");
            return Redirect::temporary(paths::LOGIN);
        }
        Err(e) => {
            tracing::warn!(user_id = %identity.id, error = %e, "landing: profile fetch failed");
            return Redirect::temporary(paths::LOGIN);
        }
    };

    let target = landing_target(category.as_deref());
    tracing::debug!(user_id = %identity.id, category = ?category, to = target, "landing dispatch");
    Redirect::temporary(target)
}
