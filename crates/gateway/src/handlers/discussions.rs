//! Discussion handlers

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
    db::{DiscussionQuery, SortField, SortOrder},
    errors::{AppError, Result},
    identity::{MaybeViewer, Viewer},
};
use coursehub_forum::{DiscussionEdits, DiscussionView, NewDiscussion};

/// Request to create a new discussion
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDiscussionRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,

    #[validate(length(min = 1, max = 50000))]
    pub content: String,

    #[serde(default)]
    pub tags: Vec<String>,

    pub experiment_id: Option<Uuid>,
}

/// Request to edit a discussion; omitted fields are left untouched
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDiscussionRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 50000))]
    pub content: Option<String>,

    pub tags: Option<Vec<String>>,

    pub experiment_id: Option<Uuid>,
}

/// Query parameters for listing discussions
#[derive(Debug, Default, Deserialize)]
pub struct ListDiscussionsParams {
    /// Explicit status filter; callers are entitled upstream
    pub status: Option<String>,
    pub tag: Option<String>,
    pub author_id: Option<Uuid>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    #[serde(default)]
    pub page: u64,
    pub page_size: Option<u64>,
}

/// One page of discussions
#[derive(Serialize)]
pub struct DiscussionListResponse {
    pub items: Vec<DiscussionView>,
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

/// Create a new discussion (enters the review queue)
pub async fn create_discussion(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(request): Json<CreateDiscussionRequest>,
) -> Result<(StatusCode, Json<DiscussionView>)> {
    request.validate().map_err(validation_error)?;

    let view = state
        .discussions
        .create(
            viewer.user_id,
            NewDiscussion {
                title: request.title,
                content: request.content,
                tags: request.tags,
                experiment_id: request.experiment_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// Get a discussion by ID, as visible to the caller
pub async fn get_discussion(
    State(state): State<AppState>,
    viewer: MaybeViewer,
    Path(id): Path<Uuid>,
) -> Result<Json<DiscussionView>> {
    let view = state.discussions.get(id, viewer.user_id()).await?;
    Ok(Json(view))
}

/// List discussions with filtering, sorting, and pagination
pub async fn list_discussions(
    State(state): State<AppState>,
    viewer: MaybeViewer,
    Query(params): Query<ListDiscussionsParams>,
) -> Result<Json<DiscussionListResponse>> {
    let page_size = state.config.clamp_page_size(params.page_size);

    let query = DiscussionQuery {
        status: params.status.as_deref().map(str::parse).transpose()?,
        tag: params.tag,
        author_id: params.author_id,
        search: params.search,
        sort: params
            .sort
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or(SortField::CreatedAt),
        order: params
            .order
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or(SortOrder::Desc),
        page: params.page,
        page_size,
    };

    let (items, total) = state.discussions.list(&query, viewer.user_id()).await?;

    Ok(Json(DiscussionListResponse {
        items,
        total,
        page: params.page,
        page_size,
    }))
}

/// Edit a discussion; any content change sends it back to review
pub async fn update_discussion(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDiscussionRequest>,
) -> Result<Json<DiscussionView>> {
    request.validate().map_err(validation_error)?;

    let view = state
        .discussions
        .edit(
            id,
            viewer.user_id,
            DiscussionEdits {
                title: request.title,
                content: request.content,
                tags: request.tags,
                experiment_id: request.experiment_id,
            },
        )
        .await?;

    Ok(Json(view))
}

/// Soft-delete a discussion (author only)
pub async fn delete_discussion(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.discussions.delete(id, viewer.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Toggle the caller's like on a discussion
pub async fn toggle_like(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
) -> Result<Json<DiscussionView>> {
    let view = state.discussions.toggle_like(id, viewer.user_id).await?;
    Ok(Json(view))
}
