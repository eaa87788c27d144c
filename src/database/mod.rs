pub mod manager;
pub mod models;
pub mod postgres;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use models::{
    Activity, ActivityStatus, Category, Comment, DepartmentSaga, Member, NewActivity, NewComment, NewStatus,
    OfficerRef, Profile, Service, ServiceRef,
};
pub use postgres::PgStore;
pub use store::{MemberFilter, TrackerStore};
