//! Moderation handlers
//!
//! The reviewer capability is granted upstream; these endpoints only
//! receive requests that already passed that gate. They still require
//! an authenticated identity for the moderation log.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use coursehub_common::{db::models::CommentStatus, errors::Result, identity::Viewer};
use coursehub_forum::{CommentView, DiscussionView, ReviewDecision};

/// A review decision on a discussion
#[derive(Debug, Deserialize)]
pub struct ReviewDiscussionRequest {
    /// `approved` or `rejected`
    pub decision: String,

    /// Required when rejecting
    pub reason: Option<String>,
}

/// A review outcome for a reported comment
#[derive(Debug, Deserialize)]
pub struct ReviewCommentRequest {
    /// `normal`, `reported`, `cleared`, or `removed`
    pub status: String,
}

/// Apply a review decision to a pending discussion
pub async fn review_discussion(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
    Json(request): Json<ReviewDiscussionRequest>,
) -> Result<Json<DiscussionView>> {
    let decision = ReviewDecision::parse(&request.decision, request.reason)?;

    let view = state.discussions.review(id, decision).await?;

    info!(
        discussion_id = %id,
        reviewer_id = %viewer.user_id,
        status = %view.status,
        "Discussion review recorded"
    );

    Ok(Json(view))
}

/// Record the outcome of a review pass on a comment
pub async fn review_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
    Json(request): Json<ReviewCommentRequest>,
) -> Result<Json<CommentView>> {
    let status: CommentStatus = request.status.parse()?;

    let view = state.comments.review(id, status).await?;

    info!(
        comment_id = %id,
        reviewer_id = %viewer.user_id,
        status = %status,
        "Comment review recorded"
    );

    Ok(Json(view))
}
