//! Comment handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use coursehub_common::{
    errors::{AppError, Result},
    identity::{MaybeViewer, Viewer},
};
use coursehub_forum::{CommentThread, CommentView, NewComment};

/// Request to create a comment
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,

    /// Parent comment for replies; omit for a root comment
    pub parent_id: Option<Uuid>,

    /// Display-only mention target
    pub reply_to_user_id: Option<Uuid>,
}

/// Request to report a comment
#[derive(Debug, Deserialize, Validate)]
pub struct ReportCommentRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

/// Query parameters for listing root comments
#[derive(Debug, Default, Deserialize)]
pub struct ListCommentsParams {
    #[serde(default)]
    pub page: u64,
    pub page_size: Option<u64>,
}

/// One page of comment threads
#[derive(Serialize)]
pub struct CommentListResponse {
    pub items: Vec<CommentThread>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

fn validation_error(e: validator::ValidationErrors) -> AppError {
    AppError::Validation {
        message: e.to_string(),
        field: None,
    }
}

/// Create a comment on a discussion
pub async fn create_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(discussion_id): Path<Uuid>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentView>)> {
    request.validate().map_err(validation_error)?;

    let view = state
        .comments
        .create(
            discussion_id,
            viewer.user_id,
            NewComment {
                content: request.content,
                parent_id: request.parent_id,
                reply_to_user_id: request.reply_to_user_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// List root comments of a discussion, each with its full thread
pub async fn list_comments(
    State(state): State<AppState>,
    viewer: MaybeViewer,
    Path(discussion_id): Path<Uuid>,
    Query(params): Query<ListCommentsParams>,
) -> Result<Json<CommentListResponse>> {
    let page_size = state.config.clamp_page_size(params.page_size);

    let (items, total) = state
        .comments
        .list_roots(discussion_id, params.page, page_size, viewer.user_id())
        .await?;

    Ok(Json(CommentListResponse {
        items,
        total,
        page: params.page,
        page_size,
    }))
}

/// List immediate replies to a comment
pub async fn list_replies(
    State(state): State<AppState>,
    viewer: MaybeViewer,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<Vec<CommentView>>> {
    let replies = state
        .comments
        .list_replies(comment_id, viewer.user_id())
        .await?;
    Ok(Json(replies))
}

/// Toggle the caller's like on a comment
pub async fn toggle_like(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<CommentView>> {
    let view = state.comments.toggle_like(comment_id, viewer.user_id).await?;
    Ok(Json(view))
}

/// Report a comment for moderator attention
pub async fn report_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(comment_id): Path<Uuid>,
    Json(request): Json<ReportCommentRequest>,
) -> Result<StatusCode> {
    request.validate().map_err(validation_error)?;

    state
        .comments
        .report(comment_id, viewer.user_id, request.reason)
        .await?;

    Ok(StatusCode::ACCEPTED)
}

/// Soft-delete a comment (author only)
pub async fn delete_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(comment_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.comments.delete(comment_id, viewer.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
