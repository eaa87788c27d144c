use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Department or SAGA (semi-autonomous government agency)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DepartmentSaga {
    pub id: i64,
    pub name: String,
    /// "Department" or "SAGA"
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
}

/// One row per identity, keyed by the auth provider's user id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: String,
    pub county: Option<String>,
    /// Raw category column; parsed by the role router
    pub category: Option<String>,
    pub department_saga_id: Option<i64>,
    /// Joined department record; `None` when unassigned or the reference dangles
    #[serde(rename = "departments_sagas")]
    pub department: Option<DepartmentSaga>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub department_saga_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Roster entry returned by officer/team queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Member {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub county: Option<String>,
    pub category: Option<String>,
    pub department_saga_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRef {
    pub id: i64,
    pub name: String,
    pub department_saga_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficerRef {
    pub id: Uuid,
    pub full_name: String,
    pub county: Option<String>,
    pub department_saga_id: Option<i64>,
}

/// One submitted unit of work, with its service and officer joined in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub user_id: Uuid,
    pub service_id: Option<i64>,
    pub description: String,
    pub count: i32,
    pub file_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub service: Option<ServiceRef>,
    pub officer: Option<OfficerRef>,
}

/// Append-only status history; the newest row per activity is the current status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ActivityStatus {
    pub id: i64,
    pub activity_id: Option<i64>,
    pub updated_by: Option<Uuid>,
    pub pending_count: Option<i32>,
    pub completed_count: Option<i32>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub reviewed: Option<bool>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Officer submission, already validated
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub user_id: Uuid,
    pub service_id: i64,
    pub description: String,
    pub count: i32,
}

/// Reviewer's status row, appended to the history
#[derive(Debug, Clone, PartialEq)]
pub struct NewStatus {
    pub activity_id: i64,
    pub updated_by: Uuid,
    pub pending_count: i32,
    pub completed_count: i32,
    pub status: String,
    pub notes: Option<String>,
}

/// Discussion entry on an activity; replies carry their parent's id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub activity_id: i64,
    pub user_id: Uuid,
    pub parent_comment_id: Option<i64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub activity_id: i64,
    pub user_id: Uuid,
    pub parent_comment_id: Option<i64>,
    pub content: String,
}

/// Profile category. Decides which dashboard family may render a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Officer,
    #[serde(rename = "HOD")]
    Hod,
    #[serde(rename = "CEO")]
    Ceo,
    #[serde(rename = "AG")]
    Ag,
}

impl Category {
    pub const ALL: [Category; 4] = [Category::Officer, Category::Hod, Category::Ceo, Category::Ag];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Officer => "Officer",
            Category::Hod => "HOD",
            Category::Ceo => "CEO",
            Category::Ag => "AG",
        }
    }

    /// Exact, case-sensitive match against the stored column value
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_is_exact() {
        assert_eq!(Category::parse("HOD"), Some(Category::Hod));
        assert_eq!(Category::parse("Officer"), Some(Category::Officer));
        assert_eq!(Category::parse("hod"), None);
        assert_eq!(Category::parse(""), None);
    }

    #[test]
    fn profile_serializes_join_under_relation_name() {
        let profile = Profile {
            id: Uuid::nil(),
            email: None,
            full_name: "Jane Wanjiru".to_string(),
            county: Some("Nakuru".to_string()),
            category: Some("HOD".to_string()),
            department_saga_id: Some(3),
            department: Some(DepartmentSaga {
                id: 3,
                name: "Treasury".to_string(),
                kind: "Department".to_string(),
            }),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&profile).expect("serialize");
        assert_eq!(value["departments_sagas"]["type"], "Department");
    }
}
