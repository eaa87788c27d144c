//! Role routing: the single authorization policy shared by every dashboard route.
//!
//! A route declares a [`RouteAccess`]; [`authorize`] turns a verified identity
//! into either the validated [`Profile`] or a [`Denial`] that renders as a
//! redirect to the dashboard fallback.

use axum::response::{IntoResponse, Redirect, Response};
use tracing::{info, warn};

use crate::auth::Identity;
use crate::database::{Category, Profile, TrackerStore};

/// Fixed redirect targets
pub mod paths {
    pub const LOGIN: &str = "/auth/login";
    pub const DASHBOARD: &str = "/dashboard";
    pub const OFFICER: &str = "/dashboard/officer";
    pub const HOD: &str = "/dashboard/hod";
    pub const AG: &str = "/dashboard/ag";
}

/// Which profiles a route admits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Any profile row, whatever its category
    AnyProfile,
    Categories(&'static [Category]),
}

/// Per-route authorization requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteAccess {
    pub route: &'static str,
    pub audience: Audience,
    /// Profile must carry a department/SAGA id
    pub require_department: bool,
    /// An assigned department/SAGA id must resolve to a row
    pub require_department_join: bool,
}

const OFFICER_ONLY: Audience = Audience::Categories(&[Category::Officer]);
const HOD_OR_CEO: Audience = Audience::Categories(&[Category::Hod, Category::Ceo]);
const AG_ONLY: Audience = Audience::Categories(&[Category::Ag]);

impl RouteAccess {
    pub const OFFICER_HOME: RouteAccess = RouteAccess {
        route: "/dashboard/officer",
        audience: OFFICER_ONLY,
        require_department: false,
        require_department_join: false,
    };

    pub const OFFICER_ACTIVITIES: RouteAccess = RouteAccess {
        route: "/dashboard/officer/activities",
        audience: OFFICER_ONLY,
        require_department: false,
        require_department_join: true,
    };

    pub const HOD_HOME: RouteAccess = RouteAccess {
        route: "/dashboard/hod",
        audience: HOD_OR_CEO,
        require_department: false,
        require_department_join: false,
    };

    /// Team, activities and analytics views
    pub const HOD_DEPARTMENT: RouteAccess = RouteAccess {
        route: "/dashboard/hod/*",
        audience: HOD_OR_CEO,
        require_department: true,
        require_department_join: true,
    };

    pub const AG_HOME: RouteAccess = RouteAccess {
        route: "/dashboard/ag",
        audience: AG_ONLY,
        require_department: false,
        require_department_join: false,
    };

    pub const SETTINGS: RouteAccess = RouteAccess {
        route: "/settings",
        audience: Audience::AnyProfile,
        require_department: false,
        require_department_join: false,
    };

    /// New submissions must name a service of a resolvable department
    pub const OFFICER_SUBMIT: RouteAccess = RouteAccess {
        route: "/dashboard/officer/activities",
        audience: OFFICER_ONLY,
        require_department: true,
        require_department_join: true,
    };

    /// Activity discussion; per-activity visibility is checked afterwards
    pub const ACTIVITY_COMMENTS: RouteAccess = RouteAccess {
        route: "/activities/:id/comments",
        audience: Audience::Categories(&Category::ALL),
        require_department: false,
        require_department_join: false,
    };

    pub fn permits(&self, category: Option<&str>) -> bool {
        match self.audience {
            Audience::AnyProfile => true,
            Audience::Categories(permitted) => category
                .and_then(Category::parse)
                .map(|c| permitted.contains(&c))
                .unwrap_or(false),
        }
    }
}

/// Why an authenticated caller may not render a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// Valid identity but no profile row (or the fetch failed)
    MissingProfile,
    CategoryMismatch { category: Option<String> },
    NoDepartment,
    MissingDepartmentJoin,
}

impl Denial {
    pub fn reason(&self) -> &'static str {
        match self {
            Denial::MissingProfile => "missing-profile",
            Denial::CategoryMismatch { .. } => "category-mismatch",
            Denial::NoDepartment | Denial::MissingDepartmentJoin => "incomplete-profile",
        }
    }

    /// Every denial falls back to the dashboard, never to login
    pub fn redirect_target(&self) -> &'static str {
        paths::DASHBOARD
    }
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        Redirect::temporary(self.redirect_target()).into_response()
    }
}

/// Check a verified identity against a route's requirements.
///
/// Steps run in order and the first failing one decides the denial. No state
/// is written, so repeated calls with the same inputs give the same answer.
pub async fn authorize(
    store: &dyn TrackerStore,
    identity: &Identity,
    access: &RouteAccess,
) -> Result<Profile, Denial> {
    let profile = match store.profile(identity.id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            info!(user_id = %identity.id, route = access.route, "no profile row for identity");
            return Err(Denial::MissingProfile);
        }
        Err(e) => {
            warn!(user_id = %identity.id, route = access.route, error = %e, "profile fetch failed");
            return Err(Denial::MissingProfile);
        }
    };

    if !access.permits(profile.category.as_deref()) {
        info!(
            user_id = %identity.id,
            route = access.route,
            category = profile.category.as_deref().unwrap_or("<none>"),
            "category not permitted for route"
        );
        return Err(Denial::CategoryMismatch {
            category: profile.category,
        });
    }

    if access.require_department && profile.department_saga_id.is_none() {
        info!(user_id = %identity.id, route = access.route, "profile has no department assignment");
        return Err(Denial::NoDepartment);
    }

    // Unassigned is step three's concern; here only a dangling id is denied
    if access.require_department_join && profile.department_saga_id.is_some() && profile.department.is_none() {
        warn!(
            user_id = %identity.id,
            route = access.route,
            department_saga_id = ?profile.department_saga_id,
            "department reference does not resolve"
        );
        return Err(Denial::MissingDepartmentJoin);
    }

    Ok(profile)
}

/// Landing dispatch from a profile category to its dashboard family
pub fn landing_target(category: Option<&str>) -> &'static str {
    match category.and_then(Category::parse) {
        Some(Category::Officer) => paths::OFFICER,
        Some(Category::Hod) | Some(Category::Ceo) => paths::HOD,
        Some(Category::Ag) => paths::AG,
        None => paths::LOGIN,
    }
}
