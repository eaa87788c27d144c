use axum::{
    extract::{Path, State},
    Json,
};

use crate::app::AppState;
use crate::database::Comment;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, CurrentIdentity};
use crate::policy::{authorize, RouteAccess};
use crate::services::{CommentThread, PostComment};

/// GET /activities/:id/comments - threaded discussion on a visible activity
pub async fn list(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(activity_id): Path<i64>,
) -> Result<ApiResponse<Vec<CommentThread>>, ApiError> {
    let user = authorize(state.store.as_ref(), &identity, &RouteAccess::ACTIVITY_COMMENTS).await?;
    let threads = state.activities.comments(&user, activity_id).await?;
    Ok(ApiResponse::success(threads))
}

/// POST /activities/:id/comments
///
/// Expected Input:
/// ```json
/// { "content": "Please attach the receipts", "parent_comment_id": null }
/// ```
pub async fn post(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(activity_id): Path<i64>,
    Json(request): Json<PostComment>,
) -> Result<ApiResponse<Comment>, ApiError> {
    let user = authorize(state.store.as_ref(), &identity, &RouteAccess::ACTIVITY_COMMENTS).await?;
    let comment = state.activities.post_comment(&user, activity_id, request).await?;
    Ok(ApiResponse::created(comment))
}
