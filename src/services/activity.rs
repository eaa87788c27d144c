use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::database::{
    Activity, ActivityStatus, Category, Comment, NewActivity, NewComment, NewStatus, Profile, TrackerStore,
};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SubmitActivity {
    pub service_id: i64,
    #[serde(default)]
    pub description: Option<String>,
    pub count: i32,
}

#[derive(Debug, Deserialize)]
pub struct StatusReview {
    pub pending_count: i32,
    pub completed_count: i32,
    /// Derived from the counts when absent
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostComment {
    pub content: String,
    #[serde(default)]
    pub parent_comment_id: Option<i64>,
}

/// Top-level comment with its replies
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

/// Whether `user` may see `activity`. Officers are limited to their own
/// submissions and HOD/CEO to their department's services.
pub fn can_see(user: &Profile, activity: &Activity) -> bool {
    match user.category.as_deref().and_then(Category::parse) {
        Some(Category::Officer) => activity.user_id == user.id,
        Some(Category::Hod) | Some(Category::Ceo) => {
            user.department_saga_id.is_some() && service_department(activity) == user.department_saga_id
        }
        Some(Category::Ag) => true,
        None => false,
    }
}

fn service_department(activity: &Activity) -> Option<i64> {
    activity.service.as_ref().and_then(|s| s.department_saga_id)
}

/// Label for a review that did not name one, matching the dashboard badges
pub fn derived_status(pending_count: i32, completed_count: i32) -> &'static str {
    if completed_count > 0 {
        "completed"
    } else if pending_count > 0 {
        "in_progress"
    } else {
        "pending"
    }
}

/// Group comments into threads: newest thread first, replies oldest first.
/// Replies whose parent is not a top-level comment on the list are dropped.
pub fn thread_comments(comments: Vec<Comment>) -> Vec<CommentThread> {
    let (top, replies): (Vec<Comment>, Vec<Comment>) =
        comments.into_iter().partition(|c| c.parent_comment_id.is_none());

    let mut by_parent: HashMap<i64, Vec<Comment>> = HashMap::new();
    for reply in replies {
        if let Some(parent) = reply.parent_comment_id {
            by_parent.entry(parent).or_default().push(reply);
        }
    }

    let mut threads: Vec<CommentThread> = top
        .into_iter()
        .map(|comment| {
            let mut replies = by_parent.remove(&comment.id).unwrap_or_default();
            replies.sort_by_key(|r| (r.created_at, r.id));
            CommentThread { comment, replies }
        })
        .collect();
    threads.sort_by(|a, b| (b.comment.created_at, b.comment.id).cmp(&(a.comment.created_at, a.comment.id)));
    threads
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Writes against activities and their discussion
#[derive(Clone)]
pub struct ActivityService {
    store: Arc<dyn TrackerStore>,
}

impl ActivityService {
    pub fn new(store: Arc<dyn TrackerStore>) -> Self {
        Self { store }
    }

    /// Officer submission into one of their department's services
    pub async fn submit(&self, user: &Profile, request: SubmitActivity) -> Result<Activity, ApiError> {
        if request.count <= 0 {
            return Err(ApiError::bad_request("Count must be a positive number"));
        }

        let service = self
            .store
            .service(request.service_id)
            .await?
            .ok_or_else(|| ApiError::bad_request("Unknown service"))?;
        if service.department_saga_id.is_none() || service.department_saga_id != user.department_saga_id {
            return Err(ApiError::bad_request("Service is not offered by your department"));
        }

        let activity = self
            .store
            .insert_activity(&NewActivity {
                user_id: user.id,
                service_id: service.id,
                description: trimmed(request.description).unwrap_or_default(),
                count: request.count,
            })
            .await?;

        info!(user_id = %user.id, activity_id = activity.id, service_id = service.id, "activity submitted");
        Ok(activity)
    }

    /// Append a reviewed status row to an activity in the reviewer's department
    pub async fn review(
        &self,
        user: &Profile,
        activity_id: i64,
        request: StatusReview,
    ) -> Result<ActivityStatus, ApiError> {
        let activity = self.visible_activity(user, activity_id).await?;

        if request.pending_count < 0 || request.completed_count < 0 {
            return Err(ApiError::bad_request("Counts cannot be negative"));
        }
        if i64::from(request.pending_count) + i64::from(request.completed_count) > i64::from(activity.count) {
            return Err(ApiError::bad_request(
                "Total pending and completed count cannot exceed the original count",
            ));
        }

        let status = trimmed(request.status)
            .unwrap_or_else(|| derived_status(request.pending_count, request.completed_count).to_string());

        let row = self
            .store
            .append_status(&NewStatus {
                activity_id: activity.id,
                updated_by: user.id,
                pending_count: request.pending_count,
                completed_count: request.completed_count,
                status,
                notes: trimmed(request.notes),
            })
            .await?;

        info!(user_id = %user.id, activity_id = activity.id, status_id = row.id, "activity reviewed");
        Ok(row)
    }

    pub async fn comments(&self, user: &Profile, activity_id: i64) -> Result<Vec<CommentThread>, ApiError> {
        let activity = self.visible_activity(user, activity_id).await?;
        let comments = self.store.comments(activity.id).await?;
        Ok(thread_comments(comments))
    }

    pub async fn post_comment(
        &self,
        user: &Profile,
        activity_id: i64,
        request: PostComment,
    ) -> Result<Comment, ApiError> {
        let activity = self.visible_activity(user, activity_id).await?;
        let content = request.content.trim();
        if content.is_empty() {
            return Err(ApiError::bad_request("Comment cannot be empty"));
        }

        // Replies nest one level, under a top-level comment on the same activity
        if let Some(parent) = request.parent_comment_id {
            let existing = self.store.comments(activity.id).await?;
            let is_thread = existing
                .iter()
                .any(|c| c.id == parent && c.parent_comment_id.is_none());
            if !is_thread {
                return Err(ApiError::bad_request("Parent comment not found on this activity"));
            }
        }

        let comment = self
            .store
            .insert_comment(&NewComment {
                activity_id: activity.id,
                user_id: user.id,
                parent_comment_id: request.parent_comment_id,
                content: content.to_string(),
            })
            .await?;

        info!(user_id = %user.id, activity_id = activity.id, comment_id = comment.id, "comment posted");
        Ok(comment)
    }

    /// Activities outside the caller's view read as missing
    async fn visible_activity(&self, user: &Profile, activity_id: i64) -> Result<Activity, ApiError> {
        match self.store.activity(activity_id).await? {
            Some(activity) if can_see(user, &activity) => Ok(activity),
            _ => Err(ApiError::not_found(format!("Activity {} not found", activity_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, profile, InMemoryStore};
    use axum::http::StatusCode;
    use uuid::Uuid;

    fn comment(id: i64, parent: Option<i64>, minutes: i64) -> Comment {
        Comment {
            id,
            activity_id: 1,
            user_id: Uuid::nil(),
            parent_comment_id: parent,
            content: format!("comment {}", id),
            created_at: at(minutes),
            author_name: None,
        }
    }

    fn department_store() -> InMemoryStore {
        let store = InMemoryStore::with_department(1, "Treasury");
        store.insert_department(2, "Lands", "Department");
        store.insert_service(10, "Audit", Some(1));
        store.insert_service(20, "Surveys", Some(2));
        store
    }

    #[test]
    fn threads_are_newest_first_with_replies_in_order() {
        let threads = thread_comments(vec![
            comment(1, None, 0),
            comment(2, None, 5),
            comment(3, Some(1), 7),
            comment(4, Some(1), 6),
            comment(5, Some(99), 8),
        ]);

        let ids: Vec<i64> = threads.iter().map(|t| t.comment.id).collect();
        assert_eq!(ids, vec![2, 1]);
        let replies: Vec<i64> = threads[1].replies.iter().map(|r| r.id).collect();
        assert_eq!(replies, vec![4, 3]);
        assert!(threads[0].replies.is_empty());
    }

    #[test]
    fn status_label_follows_counts() {
        assert_eq!(derived_status(0, 2), "completed");
        assert_eq!(derived_status(3, 0), "in_progress");
        assert_eq!(derived_status(0, 0), "pending");
    }

    #[tokio::test]
    async fn submission_must_target_own_department() {
        let store = department_store();
        let service = ActivityService::new(Arc::new(store.clone()));
        let officer = profile("Officer", Some(1));

        let err = service
            .submit(
                &officer,
                SubmitActivity {
                    service_id: 20,
                    description: None,
                    count: 2,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = service
            .submit(
                &officer,
                SubmitActivity {
                    service_id: 10,
                    description: None,
                    count: 0,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Count must be a positive number");

        let activity = service
            .submit(
                &officer,
                SubmitActivity {
                    service_id: 10,
                    description: Some("  audited ledgers ".to_string()),
                    count: 4,
                },
            )
            .await
            .expect("submitted");
        assert_eq!(activity.description, "audited ledgers");
        assert_eq!(activity.user_id, officer.id);
    }

    #[tokio::test]
    async fn review_appends_history_and_caps_counts() {
        let store = department_store();
        let officer = profile("Officer", Some(1));
        store.insert_activity(7, officer.id, Some(10), at(0));
        store.insert_status(1, 7, 0, at(1));
        let service = ActivityService::new(Arc::new(store.clone()));
        let hod = profile("HOD", Some(1));

        let err = service
            .review(
                &hod,
                7,
                StatusReview {
                    pending_count: 1,
                    completed_count: 1,
                    status: None,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        // Fixture activities carry a count of one
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let row = service
            .review(
                &hod,
                7,
                StatusReview {
                    pending_count: 0,
                    completed_count: 1,
                    status: None,
                    notes: Some("verified".to_string()),
                },
            )
            .await
            .expect("reviewed");
        assert_eq!(row.status.as_deref(), Some("completed"));
        assert_eq!(row.updated_by, Some(hod.id));
        assert_eq!(store.status_history(7).len(), 2);
    }

    #[tokio::test]
    async fn other_departments_activities_read_as_missing() {
        let store = department_store();
        let outsider = profile("Officer", Some(2));
        store.insert_activity(9, outsider.id, Some(20), at(0));
        let service = ActivityService::new(Arc::new(store.clone()));

        let err = service.comments(&profile("CEO", Some(1)), 9).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = service.comments(&profile("Officer", Some(2)), 9).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        assert!(service.comments(&profile("AG", None), 9).await.is_ok());
    }

    #[tokio::test]
    async fn replies_must_hang_off_a_thread_on_the_same_activity() {
        let store = department_store();
        let officer = profile("Officer", Some(1));
        store.insert_profile(officer.clone());
        store.insert_activity(3, officer.id, Some(10), at(0));
        let service = ActivityService::new(Arc::new(store.clone()));

        let top = service
            .post_comment(
                &officer,
                3,
                PostComment {
                    content: "first".to_string(),
                    parent_comment_id: None,
                },
            )
            .await
            .expect("posted");
        assert_eq!(top.author_name.as_deref(), Some(officer.full_name.as_str()));

        let reply = service
            .post_comment(
                &officer,
                3,
                PostComment {
                    content: "reply".to_string(),
                    parent_comment_id: Some(top.id),
                },
            )
            .await
            .expect("reply");

        let err = service
            .post_comment(
                &officer,
                3,
                PostComment {
                    content: "nested".to_string(),
                    parent_comment_id: Some(reply.id),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = service
            .post_comment(
                &officer,
                3,
                PostComment {
                    content: "   ".to_string(),
                    parent_comment_id: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Comment cannot be empty");
    }
}
