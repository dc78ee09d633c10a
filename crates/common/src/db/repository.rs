//! Repository pattern for database operations
//!
//! The content-store boundary of the system: CRUD and filtered list
//! queries over discussions and comments. Read-modify-write helpers
//! take a pure transition closure and run it under a row-level lock so
//! that per-record invariants (like-set/like-count, moderation status)
//! survive concurrent writers.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbBackend, EntityTrait,
    IntoActiveModel, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Statement,
    TransactionTrait,
};
use std::str::FromStr;
use uuid::Uuid;

/// Sortable fields for discussion list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    LastActivity,
    Likes,
    Views,
    Comments,
}

impl FromStr for SortField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "created_at" => Ok(SortField::CreatedAt),
            "last_activity" => Ok(SortField::LastActivity),
            "likes" => Ok(SortField::Likes),
            "views" => Ok(SortField::Views),
            "comments" => Ok(SortField::Comments),
            other => Err(AppError::Validation {
                message: format!("Unknown sort field: {}", other),
                field: Some("sort".into()),
            }),
        }
    }
}

impl SortField {
    fn column(self) -> DiscussionColumn {
        match self {
            SortField::CreatedAt => DiscussionColumn::CreatedAt,
            SortField::LastActivity => DiscussionColumn::LastActivityAt,
            SortField::Likes => DiscussionColumn::LikeCount,
            SortField::Views => DiscussionColumn::ViewCount,
            SortField::Comments => DiscussionColumn::CommentCount,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(AppError::Validation {
                message: format!("Unknown sort order: {}", other),
                field: Some("order".into()),
            }),
        }
    }
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// Filtered list query over discussions
///
/// When `status` is set the caller is entitled to see that status
/// directly (e.g. a moderator dashboard) and the visibility existence
/// filter is bypassed; otherwise only records that are approved, have a
/// historical snapshot, or belong to the viewer are enumerated.
#[derive(Debug, Clone, Default)]
pub struct DiscussionQuery {
    pub status: Option<DiscussionStatus>,
    pub tag: Option<String>,
    pub author_id: Option<Uuid>,
    pub search: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
    pub page: u64,
    pub page_size: u64,
}

/// One page of discussions plus the total match count
#[derive(Debug, Clone)]
pub struct DiscussionPage {
    pub items: Vec<Discussion>,
    pub total: u64,
}

/// One page of comments plus the total match count
#[derive(Debug, Clone)]
pub struct CommentPage {
    pub items: Vec<Comment>,
    pub total: u64,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Discussion Operations
    // ========================================================================

    /// Persist a fully built discussion record
    pub async fn create_discussion(&self, discussion: Discussion) -> Result<Discussion> {
        discussion
            .into_active_model()
            .reset_all()
            .insert(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a non-deleted discussion by ID
    pub async fn find_discussion(&self, id: Uuid) -> Result<Option<Discussion>> {
        DiscussionEntity::find_by_id(id)
            .filter(DiscussionColumn::Deleted.eq(false))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Apply a transition to a discussion under a row-level lock
    ///
    /// Reads the row with `SELECT ... FOR UPDATE` inside a transaction,
    /// runs the pure transition, and writes the whole row back. The
    /// transition either fully applies or the transaction rolls back.
    pub async fn update_discussion<F>(&self, id: Uuid, apply: F) -> Result<Discussion>
    where
        F: FnOnce(Discussion) -> Result<Discussion>,
    {
        let txn = self.write_conn().begin().await?;

        let current = DiscussionEntity::find_by_id(id)
            .filter(DiscussionColumn::Deleted.eq(false))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::DiscussionNotFound { id: id.to_string() })?;

        let next = apply(current)?;

        let updated = next
            .into_active_model()
            .reset_all()
            .update(&txn)
            .await?;

        txn.commit().await?;

        Ok(updated)
    }

    /// List discussions with filtering, sorting, and pagination
    pub async fn list_discussions(
        &self,
        query: &DiscussionQuery,
        viewer: Option<Uuid>,
    ) -> Result<DiscussionPage> {
        let mut cond = Condition::all().add(DiscussionColumn::Deleted.eq(false));

        if let Some(status) = query.status {
            // Explicit status filter for entitled callers
            cond = cond.add(DiscussionColumn::Status.eq(status));
        } else {
            // Existence filter: approved, or has a snapshot, or is the
            // viewer's own record regardless of status
            let mut visible = Condition::any()
                .add(DiscussionColumn::Status.eq(DiscussionStatus::Approved))
                .add(DiscussionColumn::LastApprovedAt.is_not_null());
            if let Some(viewer_id) = viewer {
                visible = visible.add(DiscussionColumn::AuthorId.eq(viewer_id));
            }
            cond = cond.add(visible);
        }

        if let Some(ref tag) = query.tag {
            cond = cond.add(Expr::cust_with_values(
                "tags @> ?::jsonb",
                [serde_json::json!([tag])],
            ));
        }

        if let Some(author_id) = query.author_id {
            cond = cond.add(DiscussionColumn::AuthorId.eq(author_id));
        }

        if let Some(ref search) = query.search {
            cond = cond.add(
                Condition::any()
                    .add(DiscussionColumn::Title.contains(search))
                    .add(DiscussionColumn::Content.contains(search)),
            );
        }

        let paginator = DiscussionEntity::find()
            .filter(cond)
            .order_by(query.sort.column(), query.order.into())
            .paginate(self.read_conn(), query.page_size.max(1));

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(query.page).await?;

        Ok(DiscussionPage { items, total })
    }

    /// Bump the view counter without touching the rest of the row
    pub async fn increment_view_count(&self, id: Uuid) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE discussions SET view_count = view_count + 1 WHERE id = $1 AND deleted = FALSE",
            vec![id.into()],
        );

        use sea_orm::ConnectionTrait;
        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    // ========================================================================
    // Comment Operations
    // ========================================================================

    /// Persist a fully built comment record
    pub async fn create_comment(&self, comment: Comment) -> Result<Comment> {
        comment
            .into_active_model()
            .reset_all()
            .insert(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a non-deleted comment by ID
    pub async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        CommentEntity::find_by_id(id)
            .filter(CommentColumn::Deleted.eq(false))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Apply a transition to a comment under a row-level lock
    pub async fn update_comment<F>(&self, id: Uuid, apply: F) -> Result<Comment>
    where
        F: FnOnce(Comment) -> Result<Comment>,
    {
        let txn = self.write_conn().begin().await?;

        let current = CommentEntity::find_by_id(id)
            .filter(CommentColumn::Deleted.eq(false))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::CommentNotFound { id: id.to_string() })?;

        let next = apply(current)?;

        let updated = next
            .into_active_model()
            .reset_all()
            .update(&txn)
            .await?;

        txn.commit().await?;

        Ok(updated)
    }

    /// List root comments (depth 0) of a discussion, oldest first
    pub async fn list_root_comments(
        &self,
        discussion_id: Uuid,
        page: u64,
        page_size: u64,
    ) -> Result<CommentPage> {
        let paginator = CommentEntity::find()
            .filter(CommentColumn::DiscussionId.eq(discussion_id))
            .filter(CommentColumn::Deleted.eq(false))
            .filter(CommentColumn::Depth.eq(0))
            .order_by_asc(CommentColumn::CreatedAt)
            .paginate(self.read_conn(), page_size.max(1));

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page).await?;

        Ok(CommentPage { items, total })
    }

    /// All descendants of a root comment, oldest first
    ///
    /// The root itself carries a null `root_id`, so it is naturally
    /// excluded from its own thread.
    pub async fn list_thread(&self, root_id: Uuid) -> Result<Vec<Comment>> {
        CommentEntity::find()
            .filter(CommentColumn::RootId.eq(root_id))
            .filter(CommentColumn::Deleted.eq(false))
            .order_by_asc(CommentColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Immediate children of a comment, oldest first
    pub async fn list_children(&self, parent_id: Uuid) -> Result<Vec<Comment>> {
        CommentEntity::find()
            .filter(CommentColumn::ParentId.eq(parent_id))
            .filter(CommentColumn::Deleted.eq(false))
            .order_by_asc(CommentColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Count non-deleted comments on a discussion
    pub async fn count_comments(&self, discussion_id: Uuid) -> Result<u64> {
        CommentEntity::find()
            .filter(CommentColumn::DiscussionId.eq(discussion_id))
            .filter(CommentColumn::Deleted.eq(false))
            .count(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Recompute a discussion's denormalized comment counters
    ///
    /// Cross-record and eventually consistent: callers treat a failure
    /// here as loggable, not fatal to the triggering comment write.
    pub async fn refresh_discussion_counters(&self, discussion_id: Uuid) -> Result<()> {
        let count = self.count_comments(discussion_id).await?;

        let latest = CommentEntity::find()
            .filter(CommentColumn::DiscussionId.eq(discussion_id))
            .filter(CommentColumn::Deleted.eq(false))
            .order_by_desc(CommentColumn::CreatedAt)
            .one(self.write_conn())
            .await?;

        self.update_discussion(discussion_id, move |mut d| {
            d.comment_count = count as i64;
            d.last_comment_at = latest.as_ref().map(|c| c.created_at);
            if let Some(ref c) = latest {
                if c.created_at > d.last_activity_at {
                    d.last_activity_at = c.created_at;
                }
            }
            Ok(d)
        })
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_field_parsing() {
        assert_eq!(SortField::from_str("likes").unwrap(), SortField::Likes);
        assert_eq!(
            SortField::from_str("last_activity").unwrap(),
            SortField::LastActivity
        );
        assert!(SortField::from_str("karma").is_err());
    }

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!(SortOrder::from_str("asc").unwrap(), SortOrder::Asc);
        assert_eq!(SortOrder::from_str("desc").unwrap(), SortOrder::Desc);
        assert!(SortOrder::from_str("up").is_err());
    }

    #[test]
    fn test_query_defaults() {
        let q = DiscussionQuery::default();
        assert_eq!(q.sort, SortField::CreatedAt);
        assert_eq!(q.order, SortOrder::Desc);
        assert!(q.status.is_none());
    }
}
