//! In-memory collaborators for tests: a `TrackerStore` over vectors and an
//! `AuthProvider` driven by fixed token tables.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::auth::{AuthError, AuthProvider, AuthSession, Identity, TokenPair};
use crate::database::{
    Activity, ActivityStatus, Category, Comment, DatabaseError, DepartmentSaga, Member, MemberFilter, NewActivity,
    NewComment, NewStatus, OfficerRef, Profile, Service, ServiceRef, TrackerStore,
};

/// Fixed clock origin so ordering in fixtures is deterministic
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
        + Duration::minutes(minutes)
}

/// Profile fixture with a fresh id
pub fn profile(category: &str, department_saga_id: Option<i64>) -> Profile {
    let id = Uuid::new_v4();
    Profile {
        id,
        email: Some(format!("{}@example.go.ke", id.simple())),
        full_name: format!("{} {}", category, &id.simple().to_string()[..6]),
        county: Some("Nairobi".to_string()),
        category: Some(category.to_string()),
        department_saga_id,
        department: None,
        created_at: at(0),
        updated_at: at(0),
    }
}

#[derive(Default)]
struct Tables {
    profiles: Vec<Profile>,
    departments: Vec<DepartmentSaga>,
    services: Vec<Service>,
    activities: Vec<Activity>,
    statuses: Vec<ActivityStatus>,
    comments: Vec<Comment>,
    password_changed: HashSet<Uuid>,
    failing: HashSet<&'static str>,
}

#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn with_department(id: i64, name: &str) -> Self {
        let store = Self::default();
        store.insert_department(id, name, "Department");
        store
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, name: &'static str) -> Result<(), DatabaseError> {
        if self.tables().failing.contains(name) {
            return Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    /// Make the named read or write fail with a pool timeout
    pub fn fail(&self, name: &'static str) {
        self.tables().failing.insert(name);
    }

    /// Full status history of one activity, oldest first
    pub fn status_history(&self, activity_id: i64) -> Vec<ActivityStatus> {
        let mut rows: Vec<ActivityStatus> = self
            .tables()
            .statuses
            .iter()
            .filter(|s| s.activity_id == Some(activity_id))
            .cloned()
            .collect();
        rows.sort_by_key(|s| (s.created_at, s.id));
        rows
    }

    pub fn password_changed(&self, user_id: Uuid) -> bool {
        self.tables().password_changed.contains(&user_id)
    }

    pub fn insert_profile(&self, profile: Profile) {
        self.tables().profiles.push(profile);
    }

    pub fn insert_department(&self, id: i64, name: &str, kind: &str) {
        self.tables().departments.push(DepartmentSaga {
            id,
            name: name.to_string(),
            kind: kind.to_string(),
        });
    }

    pub fn insert_service(&self, id: i64, name: &str, department_saga_id: Option<i64>) {
        self.tables().services.push(Service {
            id,
            name: name.to_string(),
            department_saga_id,
            created_at: at(0),
        });
    }

    pub fn insert_activity(&self, id: i64, user_id: Uuid, service_id: Option<i64>, created_at: DateTime<Utc>) {
        self.tables().activities.push(Activity {
            id,
            user_id,
            service_id,
            description: format!("activity {}", id),
            count: 1,
            file_url: None,
            created_at,
            updated_at: created_at,
            service: None,
            officer: None,
        });
    }

    pub fn insert_status(&self, id: i64, activity_id: i64, completed: i32, created_at: DateTime<Utc>) {
        self.tables().statuses.push(ActivityStatus {
            id,
            activity_id: Some(activity_id),
            updated_by: None,
            pending_count: Some(0),
            completed_count: Some(completed),
            status: Some(if completed > 0 { "approved" } else { "pending" }.to_string()),
            notes: None,
            reviewed: Some(completed > 0),
            reviewed_at: None,
            created_at,
        });
    }

    fn joined(tables: &Tables, activity: &Activity) -> Activity {
        let service = activity
            .service_id
            .and_then(|id| tables.services.iter().find(|s| s.id == id))
            .map(|s| ServiceRef {
                id: s.id,
                name: s.name.clone(),
                department_saga_id: s.department_saga_id,
            });
        let officer = tables
            .profiles
            .iter()
            .find(|p| p.id == activity.user_id)
            .map(|p| OfficerRef {
                id: p.id,
                full_name: p.full_name.clone(),
                county: p.county.clone(),
                department_saga_id: p.department_saga_id,
            });
        Activity {
            service,
            officer,
            ..activity.clone()
        }
    }

    fn select_activities(&self, keep: impl Fn(&Activity) -> bool) -> Vec<Activity> {
        let tables = self.tables();
        let mut rows: Vec<Activity> = tables
            .activities
            .iter()
            .filter(|a| keep(a))
            .map(|a| Self::joined(&tables, a))
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        rows
    }
}

#[async_trait]
impl TrackerStore for InMemoryStore {
    async fn profile(&self, id: Uuid) -> Result<Option<Profile>, DatabaseError> {
        self.check("profile")?;
        let tables = self.tables();
        Ok(tables.profiles.iter().find(|p| p.id == id).map(|p| {
            let department = p
                .department_saga_id
                .and_then(|d| tables.departments.iter().find(|row| row.id == d))
                .cloned();
            Profile {
                department,
                ..p.clone()
            }
        }))
    }

    async fn departments(&self) -> Result<Vec<DepartmentSaga>, DatabaseError> {
        self.check("departments_sagas")?;
        let mut rows = self.tables().departments.clone();
        rows.sort_by(|a, b| (&a.kind, &a.name).cmp(&(&b.kind, &b.name)));
        Ok(rows)
    }

    async fn department_services(&self, department_saga_id: i64) -> Result<Vec<Service>, DatabaseError> {
        self.check("services")?;
        let mut rows: Vec<Service> = self
            .tables()
            .services
            .iter()
            .filter(|s| s.department_saga_id == Some(department_saga_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn services(&self) -> Result<Vec<Service>, DatabaseError> {
        self.check("services")?;
        let mut rows = self.tables().services.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn service_activities(&self, service_ids: &[i64]) -> Result<Vec<Activity>, DatabaseError> {
        self.check("activities")?;
        Ok(self.select_activities(|a| a.service_id.map(|id| service_ids.contains(&id)).unwrap_or(false)))
    }

    async fn officer_activities(&self, user_id: Uuid) -> Result<Vec<Activity>, DatabaseError> {
        self.check("activities")?;
        Ok(self.select_activities(|a| a.user_id == user_id))
    }

    async fn activities(&self) -> Result<Vec<Activity>, DatabaseError> {
        self.check("activities")?;
        Ok(self.select_activities(|_| true))
    }

    async fn members(&self, filter: &MemberFilter) -> Result<Vec<Member>, DatabaseError> {
        self.check("members")?;
        let mut rows: Vec<Member> = self
            .tables()
            .profiles
            .iter()
            .filter(|p| filter.department_saga_id.is_none() || p.department_saga_id == filter.department_saga_id)
            .filter(|p| {
                p.category
                    .as_deref()
                    .and_then(Category::parse)
                    .map(|c| filter.categories.contains(&c))
                    .unwrap_or(false)
            })
            .map(|p| Member {
                id: p.id,
                full_name: p.full_name.clone(),
                email: p.email.clone(),
                county: p.county.clone(),
                category: p.category.clone(),
                department_saga_id: p.department_saga_id,
                created_at: p.created_at,
            })
            .collect();
        rows.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(rows)
    }

    /// Returns the whole history; callers reduce it to one row per activity
    async fn latest_statuses(&self, activity_ids: &[i64]) -> Result<Vec<ActivityStatus>, DatabaseError> {
        self.check("activity_status")?;
        Ok(self
            .tables()
            .statuses
            .iter()
            .filter(|s| s.activity_id.map(|id| activity_ids.contains(&id)).unwrap_or(false))
            .cloned()
            .collect())
    }

    async fn service(&self, id: i64) -> Result<Option<Service>, DatabaseError> {
        self.check("services")?;
        Ok(self.tables().services.iter().find(|s| s.id == id).cloned())
    }

    async fn activity(&self, id: i64) -> Result<Option<Activity>, DatabaseError> {
        self.check("activities")?;
        Ok(self.select_activities(|a| a.id == id).pop())
    }

    async fn insert_activity(&self, activity: &NewActivity) -> Result<Activity, DatabaseError> {
        self.check("insert_activity")?;
        let id = {
            let mut tables = self.tables();
            let id = tables.activities.iter().map(|a| a.id).max().unwrap_or(0) + 1;
            let now = Utc::now();
            tables.activities.push(Activity {
                id,
                user_id: activity.user_id,
                service_id: Some(activity.service_id),
                description: activity.description.clone(),
                count: activity.count,
                file_url: None,
                created_at: now,
                updated_at: now,
                service: None,
                officer: None,
            });
            id
        };
        self.select_activities(|a| a.id == id)
            .pop()
            .ok_or(DatabaseError::Sqlx(sqlx::Error::RowNotFound))
    }

    async fn append_status(&self, status: &NewStatus) -> Result<ActivityStatus, DatabaseError> {
        self.check("append_status")?;
        let mut tables = self.tables();
        let now = Utc::now();
        let row = ActivityStatus {
            id: tables.statuses.iter().map(|s| s.id).max().unwrap_or(0) + 1,
            activity_id: Some(status.activity_id),
            updated_by: Some(status.updated_by),
            pending_count: Some(status.pending_count),
            completed_count: Some(status.completed_count),
            status: Some(status.status.clone()),
            notes: status.notes.clone(),
            reviewed: Some(true),
            reviewed_at: Some(now),
            created_at: now,
        };
        tables.statuses.push(row.clone());
        Ok(row)
    }

    async fn comments(&self, activity_id: i64) -> Result<Vec<Comment>, DatabaseError> {
        self.check("comments")?;
        let mut rows: Vec<Comment> = self
            .tables()
            .comments
            .iter()
            .filter(|c| c.activity_id == activity_id)
            .cloned()
            .collect();
        rows.sort_by_key(|c| (c.created_at, c.id));
        Ok(rows)
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, DatabaseError> {
        self.check("insert_comment")?;
        let mut tables = self.tables();
        let author_name = tables
            .profiles
            .iter()
            .find(|p| p.id == comment.user_id)
            .map(|p| p.full_name.clone());
        let row = Comment {
            id: tables.comments.iter().map(|c| c.id).max().unwrap_or(0) + 1,
            activity_id: comment.activity_id,
            user_id: comment.user_id,
            parent_comment_id: comment.parent_comment_id,
            content: comment.content.clone(),
            created_at: Utc::now(),
            author_name,
        };
        tables.comments.push(row.clone());
        Ok(row)
    }

    async fn mark_password_changed(&self, user_id: Uuid) -> Result<(), DatabaseError> {
        self.check("mark_password_changed")?;
        self.tables().password_changed.insert(user_id);
        Ok(())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.check("ping")
    }
}

/// Auth provider answering from fixed tables of tokens and passwords
#[derive(Default, Clone)]
pub struct ScriptedAuth {
    inner: Arc<Mutex<ScriptedTables>>,
    get_user_calls: Arc<AtomicUsize>,
}

#[derive(Default)]
struct ScriptedTables {
    access: HashMap<String, Identity>,
    refresh: HashMap<String, AuthSession>,
    passwords: HashMap<(String, String), AuthSession>,
    signed_out: Vec<String>,
    password_updates: Vec<(Uuid, String)>,
    unreachable: bool,
}

impl ScriptedAuth {
    fn tables(&self) -> MutexGuard<'_, ScriptedTables> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Accept `access_token` as a live token for `identity`
    pub fn accept(&self, access_token: &str, identity: Identity) {
        self.tables().access.insert(access_token.to_string(), identity);
    }

    /// Revoke a previously accepted access token
    pub fn revoke(&self, access_token: &str) {
        self.tables().access.remove(access_token);
    }

    /// `refresh_token` rotates into `rotated`, which is then accepted
    pub fn rotate(&self, refresh_token: &str, identity: Identity, rotated: TokenPair) {
        let mut tables = self.tables();
        tables
            .access
            .insert(rotated.access_token.clone(), identity.clone());
        tables.refresh.insert(
            refresh_token.to_string(),
            AuthSession {
                identity,
                tokens: rotated,
            },
        );
    }

    pub fn password(&self, email: &str, password: &str, identity: Identity, tokens: TokenPair) {
        let mut tables = self.tables();
        tables.access.insert(tokens.access_token.clone(), identity.clone());
        tables.passwords.insert(
            (email.to_string(), password.to_string()),
            AuthSession { identity, tokens },
        );
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.tables().unreachable = unreachable;
    }

    pub fn get_user_calls(&self) -> usize {
        self.get_user_calls.load(Ordering::SeqCst)
    }

    pub fn signed_out(&self) -> Vec<String> {
        self.tables().signed_out.clone()
    }

    /// Accepted password changes as (user id, new password)
    pub fn password_updates(&self) -> Vec<(Uuid, String)> {
        self.tables().password_updates.clone()
    }

    fn reachable(&self) -> Result<(), AuthError> {
        if self.tables().unreachable {
            return Err(AuthError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

fn rejected(message: &str) -> AuthError {
    AuthError::Rejected {
        status: 401,
        message: message.to_string(),
    }
}

#[async_trait]
impl AuthProvider for ScriptedAuth {
    async fn get_user(&self, access_token: &str) -> Result<Identity, AuthError> {
        self.get_user_calls.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;
        self.tables()
            .access
            .get(access_token)
            .cloned()
            .ok_or_else(|| rejected("invalid JWT"))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        self.reachable()?;
        // Refresh tokens are single use
        self.tables()
            .refresh
            .remove(refresh_token)
            .ok_or_else(|| rejected("Invalid Refresh Token"))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.reachable()?;
        self.tables()
            .passwords
            .get(&(email.to_string(), password.to_string()))
            .cloned()
            .ok_or_else(|| AuthError::Rejected {
                status: 400,
                message: "Invalid login credentials".to_string(),
            })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.reachable()?;
        let mut tables = self.tables();
        tables.access.remove(access_token);
        tables.signed_out.push(access_token.to_string());
        Ok(())
    }

    async fn update_password(&self, access_token: &str, new_password: &str) -> Result<(), AuthError> {
        self.reachable()?;
        let mut tables = self.tables();
        let identity = tables
            .access
            .get(access_token)
            .cloned()
            .ok_or_else(|| rejected("invalid JWT"))?;
        tables.password_updates.push((identity.id, new_password.to_string()));
        Ok(())
    }

    async fn ping(&self) -> Result<(), AuthError> {
        self.reachable()
    }
}
