pub mod activity;
pub mod dashboard;
pub mod status;

pub use activity::{ActivityService, CommentThread, PostComment, StatusReview, SubmitActivity};
pub use dashboard::{
    AgDashboard, DashboardService, Degraded, DepartmentDashboard, OfficerDashboard, TeamDashboard,
    ROSTER_CATEGORIES,
};
pub use status::{latest_per_activity, with_latest_status, ActivityView};
