use async_trait::async_trait;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{
    Activity, ActivityStatus, Category, Comment, DepartmentSaga, Member, NewActivity, NewComment, NewStatus,
    Profile, Service,
};

/// Roster filter: members of one department (or all) within the given categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberFilter {
    pub department_saga_id: Option<i64>,
    pub categories: Vec<Category>,
}

impl MemberFilter {
    pub fn department(department_saga_id: i64, categories: &[Category]) -> Self {
        Self {
            department_saga_id: Some(department_saga_id),
            categories: categories.to_vec(),
        }
    }

    pub fn everywhere(categories: &[Category]) -> Self {
        Self {
            department_saga_id: None,
            categories: categories.to_vec(),
        }
    }
}

/// Access to the tracker tables. Dashboard reads are independent of each other;
/// writes only ever append rows or flip a profile flag.
#[async_trait]
pub trait TrackerStore: Send + Sync {
    /// One profile by identity id, with its department joined
    async fn profile(&self, id: Uuid) -> Result<Option<Profile>, DatabaseError>;

    /// All departments/SAGAs ordered by type, then name
    async fn departments(&self) -> Result<Vec<DepartmentSaga>, DatabaseError>;

    /// Services of one department ordered by name
    async fn department_services(&self, department_saga_id: i64) -> Result<Vec<Service>, DatabaseError>;

    /// Every service ordered by name
    async fn services(&self) -> Result<Vec<Service>, DatabaseError>;

    /// Activities for the given services, newest first
    async fn service_activities(&self, service_ids: &[i64]) -> Result<Vec<Activity>, DatabaseError>;

    /// Activities submitted by one officer, newest first
    async fn officer_activities(&self, user_id: Uuid) -> Result<Vec<Activity>, DatabaseError>;

    /// Every activity, newest first
    async fn activities(&self) -> Result<Vec<Activity>, DatabaseError>;

    /// Roster ordered by full name
    async fn members(&self, filter: &MemberFilter) -> Result<Vec<Member>, DatabaseError>;

    /// Current status per activity: at most one row per activity id
    async fn latest_statuses(&self, activity_ids: &[i64]) -> Result<Vec<ActivityStatus>, DatabaseError>;

    /// One service by id
    async fn service(&self, id: i64) -> Result<Option<Service>, DatabaseError>;

    /// One activity by id, with service and officer joined
    async fn activity(&self, id: i64) -> Result<Option<Activity>, DatabaseError>;

    async fn insert_activity(&self, activity: &NewActivity) -> Result<Activity, DatabaseError>;

    /// Append a status row; earlier rows are kept as history
    async fn append_status(&self, status: &NewStatus) -> Result<ActivityStatus, DatabaseError>;

    /// Every comment on an activity, oldest first
    async fn comments(&self, activity_id: i64) -> Result<Vec<Comment>, DatabaseError>;

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, DatabaseError>;

    /// Record that the user has replaced their provisioned password
    async fn mark_password_changed(&self, user_id: Uuid) -> Result<(), DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}
