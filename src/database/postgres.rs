use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::manager::{DatabaseError, DatabaseManager};
use super::models::{
    Activity, ActivityStatus, Comment, DepartmentSaga, Member, NewActivity, NewComment, NewStatus, OfficerRef,
    Profile, Service, ServiceRef,
};
use super::store::{MemberFilter, TrackerStore};

const ACTIVITY_SELECT: &str = r#"
    SELECT
        a.id, a.user_id, a.service_id, a.description, a.count, a.file_url,
        a.created_at, a.updated_at,
        s.id AS service_ref_id,
        s.name AS service_name,
        s.department_saga_id AS service_department_saga_id,
        u.id AS officer_id,
        u.full_name AS officer_full_name,
        u.county AS officer_county,
        u.department_saga_id AS officer_department_saga_id
    FROM activities a
    LEFT JOIN services s ON s.id = a.service_id
    LEFT JOIN users u ON u.id = a.user_id
"#;

const ACTIVITY_ORDER: &str = "ORDER BY a.created_at DESC, a.id DESC";

const STATUS_COLUMNS: &str =
    "id, activity_id, updated_by, pending_count, completed_count, status, notes, reviewed, reviewed_at, created_at";

/// `TrackerStore` over the Postgres tables
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn activity_from_row(row: &PgRow) -> Result<Activity, sqlx::Error> {
        let service = match row.try_get::<Option<i64>, _>("service_ref_id")? {
            Some(id) => Some(ServiceRef {
                id,
                name: row.try_get("service_name")?,
                department_saga_id: row.try_get("service_department_saga_id")?,
            }),
            None => None,
        };

        let officer = match row.try_get::<Option<Uuid>, _>("officer_id")? {
            Some(id) => Some(OfficerRef {
                id,
                full_name: row.try_get("officer_full_name")?,
                county: row.try_get("officer_county")?,
                department_saga_id: row.try_get("officer_department_saga_id")?,
            }),
            None => None,
        };

        Ok(Activity {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            service_id: row.try_get("service_id")?,
            description: row.try_get("description")?,
            count: row.try_get("count")?,
            file_url: row.try_get("file_url")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            service,
            officer,
        })
    }

    fn profile_from_row(row: &PgRow) -> Result<Profile, sqlx::Error> {
        let department = match row.try_get::<Option<i64>, _>("department_id")? {
            Some(id) => Some(DepartmentSaga {
                id,
                name: row.try_get("department_name")?,
                kind: row.try_get("department_type")?,
            }),
            None => None,
        };

        Ok(Profile {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            full_name: row.try_get("full_name")?,
            county: row.try_get("county")?,
            category: row.try_get("category")?,
            department_saga_id: row.try_get("department_saga_id")?,
            department,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn fetch_activities(&self, sql: &str, bind: ActivityBind<'_>) -> Result<Vec<Activity>, DatabaseError> {
        let query = sqlx::query(sql);
        let query = match bind {
            ActivityBind::None => query,
            ActivityBind::Services(ids) => query.bind(ids),
            ActivityBind::Officer(id) => query.bind(id),
            ActivityBind::Activity(id) => query.bind(id),
        };

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter()
            .map(Self::activity_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::from)
    }
}

enum ActivityBind<'a> {
    None,
    Services(&'a [i64]),
    Officer(Uuid),
    Activity(i64),
}

#[async_trait]
impl TrackerStore for PgStore {
    async fn profile(&self, id: Uuid) -> Result<Option<Profile>, DatabaseError> {
        let query = r#"
            SELECT
                u.id, u.email, u.full_name, u.county,
                u.category::text AS category,
                u.department_saga_id, u.created_at, u.updated_at,
                d.id AS department_id,
                d.name AS department_name,
                d.type::text AS department_type
            FROM users u
            LEFT JOIN departments_sagas d ON d.id = u.department_saga_id
            WHERE u.id = $1
        "#;

        let row = sqlx::query(query).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref()
            .map(Self::profile_from_row)
            .transpose()
            .map_err(DatabaseError::from)
    }

    async fn departments(&self) -> Result<Vec<DepartmentSaga>, DatabaseError> {
        let rows = sqlx::query_as::<_, DepartmentSaga>(
            "SELECT id, name, type::text AS type FROM departments_sagas ORDER BY type ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn department_services(&self, department_saga_id: i64) -> Result<Vec<Service>, DatabaseError> {
        let rows = sqlx::query_as::<_, Service>(
            "SELECT id, name, department_saga_id, created_at FROM services WHERE department_saga_id = $1 ORDER BY name",
        )
        .bind(department_saga_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn services(&self) -> Result<Vec<Service>, DatabaseError> {
        let rows = sqlx::query_as::<_, Service>(
            "SELECT id, name, department_saga_id, created_at FROM services ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn service_activities(&self, service_ids: &[i64]) -> Result<Vec<Activity>, DatabaseError> {
        if service_ids.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!("{} WHERE a.service_id = ANY($1) {}", ACTIVITY_SELECT, ACTIVITY_ORDER);
        self.fetch_activities(&sql, ActivityBind::Services(service_ids)).await
    }

    async fn officer_activities(&self, user_id: Uuid) -> Result<Vec<Activity>, DatabaseError> {
        let sql = format!("{} WHERE a.user_id = $1 {}", ACTIVITY_SELECT, ACTIVITY_ORDER);
        self.fetch_activities(&sql, ActivityBind::Officer(user_id)).await
    }

    async fn activities(&self) -> Result<Vec<Activity>, DatabaseError> {
        let sql = format!("{} {}", ACTIVITY_SELECT, ACTIVITY_ORDER);
        self.fetch_activities(&sql, ActivityBind::None).await
    }

    async fn members(&self, filter: &MemberFilter) -> Result<Vec<Member>, DatabaseError> {
        let query = r#"
            SELECT id, full_name, email, county, category::text AS category,
                   department_saga_id, created_at
            FROM users
            WHERE ($1::bigint IS NULL OR department_saga_id = $1)
            AND category::text = ANY($2)
            ORDER BY full_name
        "#;

        let categories: Vec<String> = filter
            .categories
            .iter()
            .map(|c| c.as_str().to_string())
            .collect();

        let rows = sqlx::query_as::<_, Member>(query)
            .bind(filter.department_saga_id)
            .bind(categories)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn latest_statuses(&self, activity_ids: &[i64]) -> Result<Vec<ActivityStatus>, DatabaseError> {
        if activity_ids.is_empty() {
            return Ok(vec![]);
        }

        // Newest row per activity; equal timestamps fall back to the larger id
        let query = format!(
            r#"
            SELECT DISTINCT ON (activity_id) {}
            FROM activity_status
            WHERE activity_id = ANY($1)
            ORDER BY activity_id, created_at DESC, id DESC
            "#,
            STATUS_COLUMNS
        );

        let rows = sqlx::query_as::<_, ActivityStatus>(&query)
            .bind(activity_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn service(&self, id: i64) -> Result<Option<Service>, DatabaseError> {
        let row = sqlx::query_as::<_, Service>(
            "SELECT id, name, department_saga_id, created_at FROM services WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn activity(&self, id: i64) -> Result<Option<Activity>, DatabaseError> {
        let sql = format!("{} WHERE a.id = $1", ACTIVITY_SELECT);
        let mut rows = self.fetch_activities(&sql, ActivityBind::Activity(id)).await?;
        Ok(rows.pop())
    }

    async fn insert_activity(&self, activity: &NewActivity) -> Result<Activity, DatabaseError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO activities (user_id, service_id, description, count)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(activity.user_id)
        .bind(activity.service_id)
        .bind(&activity.description)
        .bind(activity.count)
        .fetch_one(&self.pool)
        .await?;

        // Re-read through the joined select so the caller sees service and officer
        self.activity(id)
            .await?
            .ok_or(DatabaseError::Sqlx(sqlx::Error::RowNotFound))
    }

    async fn append_status(&self, status: &NewStatus) -> Result<ActivityStatus, DatabaseError> {
        let query = format!(
            r#"
            INSERT INTO activity_status
                (activity_id, updated_by, pending_count, completed_count, status, notes, reviewed, reviewed_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, NOW())
            RETURNING {}
            "#,
            STATUS_COLUMNS
        );

        let row = sqlx::query_as::<_, ActivityStatus>(&query)
            .bind(status.activity_id)
            .bind(status.updated_by)
            .bind(status.pending_count)
            .bind(status.completed_count)
            .bind(&status.status)
            .bind(&status.notes)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn comments(&self, activity_id: i64) -> Result<Vec<Comment>, DatabaseError> {
        let query = r#"
            SELECT c.id, c.activity_id, c.user_id, c.parent_comment_id, c.content, c.created_at,
                   u.full_name AS author_name
            FROM comments c
            LEFT JOIN users u ON u.id = c.user_id
            WHERE c.activity_id = $1
            ORDER BY c.created_at ASC, c.id ASC
        "#;

        let rows = sqlx::query_as::<_, Comment>(query)
            .bind(activity_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment, DatabaseError> {
        let query = r#"
            WITH inserted AS (
                INSERT INTO comments (activity_id, user_id, parent_comment_id, content)
                VALUES ($1, $2, $3, $4)
                RETURNING id, activity_id, user_id, parent_comment_id, content, created_at
            )
            SELECT i.id, i.activity_id, i.user_id, i.parent_comment_id, i.content, i.created_at,
                   u.full_name AS author_name
            FROM inserted i
            LEFT JOIN users u ON u.id = i.user_id
        "#;

        let row = sqlx::query_as::<_, Comment>(query)
            .bind(comment.activity_id)
            .bind(comment.user_id)
            .bind(comment.parent_comment_id)
            .bind(&comment.content)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn mark_password_changed(&self, user_id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE users SET password_changed = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
