//! Comment service
//!
//! Creation with tree placement, thread/reply listing, likes, reports,
//! review, and soft deletion. Counter updates on the parent discussion
//! are reconciled after the fact and never fail the comment write that
//! triggered them.

use crate::{engagement, tree, visibility};
use chrono::{DateTime, FixedOffset, Utc};
use coursehub_common::db::models::{Comment, CommentStatus, Discussion};
use coursehub_common::db::Repository;
use coursehub_common::directory::UserDirectory;
use coursehub_common::errors::{AppError, Result};
use coursehub_common::metrics;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

fn now() -> DateTime<FixedOffset> {
    Utc::now().into()
}

/// Comments inherit their discussion's visibility: a record the
/// resolver hides from this viewer reads as not found, so comment
/// endpoints never confirm the existence of unreviewed content.
fn ensure_discussion_readable(d: &Discussion, viewer: Option<Uuid>) -> Result<()> {
    if visibility::resolve(d, viewer).is_none() {
        return Err(AppError::DiscussionNotFound {
            id: d.id.to_string(),
        });
    }
    Ok(())
}

/// Input for creating a comment
#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub reply_to_user_id: Option<Uuid>,
}

/// A single comment as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub discussion_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub root_id: Option<Uuid>,
    pub depth: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_username: Option<String>,
    pub status: CommentStatus,
    pub like_count: i64,
    pub liked_by_viewer: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl CommentView {
    fn project(c: &Comment, viewer: Option<Uuid>) -> Self {
        Self {
            id: c.id,
            discussion_id: c.discussion_id,
            author_id: c.author_id,
            author_name: c.author_name.clone(),
            author_avatar: c.author_avatar.clone(),
            content: c.content.clone(),
            parent_id: c.parent_id,
            root_id: c.root_id,
            depth: c.depth,
            reply_to_user_id: c.reply_to_user_id,
            reply_to_username: c.reply_to_username.clone(),
            status: c.status,
            like_count: c.like_count,
            liked_by_viewer: viewer.map(|v| c.is_liked_by(v)).unwrap_or(false),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// A root comment together with every descendant in its thread
#[derive(Debug, Clone, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: CommentView,
    pub replies: Vec<CommentView>,
}

/// Service for comment operations
#[derive(Clone)]
pub struct CommentService {
    repo: Repository,
    directory: Arc<dyn UserDirectory>,
}

impl CommentService {
    pub fn new(repo: Repository, directory: Arc<dyn UserDirectory>) -> Self {
        Self { repo, directory }
    }

    /// Create a comment on a discussion
    ///
    /// The author lookup is required; the reply-to display name lookup
    /// is best-effort and a directory hiccup there leaves the name
    /// empty rather than failing the write.
    pub async fn create(
        &self,
        discussion_id: Uuid,
        author_id: Uuid,
        input: NewComment,
    ) -> Result<CommentView> {
        self.repo
            .find_discussion(discussion_id)
            .await?
            .ok_or_else(|| AppError::DiscussionNotFound {
                id: discussion_id.to_string(),
            })?;

        let author = self
            .directory
            .get_user(author_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound {
                id: author_id.to_string(),
            })?;

        let placement = match input.parent_id {
            None => tree::root(),
            Some(parent_id) => {
                let parent = self.repo.find_comment(parent_id).await?.ok_or_else(|| {
                    AppError::ParentCommentNotFound {
                        id: parent_id.to_string(),
                    }
                })?;

                if parent.discussion_id != discussion_id {
                    return Err(AppError::Validation {
                        message: "Parent comment belongs to a different discussion".into(),
                        field: Some("parent_id".into()),
                    });
                }

                tree::reply_to(&parent)
            }
        };

        let reply_to_username = match input.reply_to_user_id {
            None => None,
            Some(user_id) => match self.directory.get_user(user_id).await {
                Ok(Some(profile)) => Some(profile.display_name),
                Ok(None) => {
                    warn!(user_id = %user_id, "Reply-to user not found in directory");
                    None
                }
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Reply-to lookup failed");
                    None
                }
            },
        };

        let ts = now();
        let comment = Comment {
            id: Uuid::new_v4(),
            discussion_id,
            author_id,
            author_name: author.display_name,
            author_avatar: author.avatar,
            content: input.content,
            parent_id: placement.parent_id,
            root_id: placement.root_id,
            path: placement.path,
            depth: placement.depth,
            reply_to_user_id: input.reply_to_user_id,
            reply_to_username,
            status: CommentStatus::Normal,
            liked_by: serde_json::json!([]),
            like_count: 0,
            deleted: false,
            deleted_at: None,
            created_at: ts,
            updated_at: ts,
        };

        let created = self.repo.create_comment(comment).await?;
        metrics::record_comment_created(created.is_root());

        info!(
            comment_id = %created.id,
            discussion_id = %discussion_id,
            depth = created.depth,
            "Comment created"
        );

        self.reconcile_counters(discussion_id).await;

        Ok(CommentView::project(&created, Some(author_id)))
    }

    /// List root comments of a discussion, each with its full thread
    ///
    /// The discussion must exist, be non-deleted, and be visible to the
    /// caller.
    pub async fn list_roots(
        &self,
        discussion_id: Uuid,
        page: u64,
        page_size: u64,
        viewer: Option<Uuid>,
    ) -> Result<(Vec<CommentThread>, u64)> {
        let discussion = self
            .repo
            .find_discussion(discussion_id)
            .await?
            .ok_or_else(|| AppError::DiscussionNotFound {
                id: discussion_id.to_string(),
            })?;
        ensure_discussion_readable(&discussion, viewer)?;

        let roots = self
            .repo
            .list_root_comments(discussion_id, page, page_size)
            .await?;

        let mut threads = Vec::with_capacity(roots.items.len());
        for root in &roots.items {
            let replies = self.repo.list_thread(root.id).await?;
            threads.push(CommentThread {
                comment: CommentView::project(root, viewer),
                replies: replies
                    .iter()
                    .map(|c| CommentView::project(c, viewer))
                    .collect(),
            });
        }

        Ok((threads, roots.total))
    }

    /// Immediate replies to a comment
    ///
    /// Gated on the parent discussion the same way as `list_roots`.
    pub async fn list_replies(
        &self,
        comment_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Vec<CommentView>> {
        let comment = self
            .repo
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::CommentNotFound {
                id: comment_id.to_string(),
            })?;

        let discussion = self
            .repo
            .find_discussion(comment.discussion_id)
            .await?
            .ok_or_else(|| AppError::DiscussionNotFound {
                id: comment.discussion_id.to_string(),
            })?;
        ensure_discussion_readable(&discussion, viewer)?;

        let children = self.repo.list_children(comment_id).await?;
        Ok(children
            .iter()
            .map(|c| CommentView::project(c, viewer))
            .collect())
    }

    /// Flip the viewer's like on a comment
    pub async fn toggle_like(&self, comment_id: Uuid, user_id: Uuid) -> Result<CommentView> {
        let ts = now();
        let updated = self
            .repo
            .update_comment(comment_id, move |mut c| {
                let mut liked_by = c.liked_by_set();
                engagement::toggle(&mut liked_by, user_id);
                c.set_liked_by(&liked_by);
                c.updated_at = ts;
                Ok(c)
            })
            .await?;

        metrics::record_like("comment", updated.is_liked_by(user_id));

        Ok(CommentView::project(&updated, Some(user_id)))
    }

    /// Flag a comment for the moderation queue
    ///
    /// The reason travels to the moderation log, not the record; the
    /// flag itself is a single status bit.
    pub async fn report(&self, comment_id: Uuid, reporter_id: Uuid, reason: String) -> Result<()> {
        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(AppError::MissingField {
                field: "reason".into(),
            });
        }

        let ts = now();
        self.repo
            .update_comment(comment_id, move |c| Ok(engagement::report(c, ts)))
            .await?;

        metrics::record_report();
        info!(
            comment_id = %comment_id,
            reporter_id = %reporter_id,
            reason = %reason,
            "Comment reported"
        );

        Ok(())
    }

    /// Record the outcome of a review pass on a comment
    ///
    /// The reviewer capability is checked by the caller.
    pub async fn review(&self, comment_id: Uuid, status: CommentStatus) -> Result<CommentView> {
        let ts = now();
        let updated = self
            .repo
            .update_comment(comment_id, move |c| Ok(engagement::review(c, status, ts)))
            .await?;

        metrics::record_review("comment", status.as_str());
        info!(comment_id = %comment_id, status = %status, "Comment reviewed");

        Ok(CommentView::project(&updated, None))
    }

    /// Soft-delete a comment; author-only
    pub async fn delete(&self, comment_id: Uuid, author_id: Uuid) -> Result<()> {
        let ts = now();
        let deleted = self
            .repo
            .update_comment(comment_id, move |mut c| {
                if c.author_id != author_id {
                    return Err(AppError::Forbidden {
                        message: "Only the author may delete a comment".into(),
                    });
                }
                c.deleted = true;
                c.deleted_at = Some(ts);
                c.updated_at = ts;
                Ok(c)
            })
            .await?;

        info!(comment_id = %comment_id, author_id = %author_id, "Comment deleted");

        self.reconcile_counters(deleted.discussion_id).await;

        Ok(())
    }

    /// Recompute the parent discussion's comment counters, logging but
    /// never propagating failure
    async fn reconcile_counters(&self, discussion_id: Uuid) {
        if let Err(e) = self.repo.refresh_discussion_counters(discussion_id).await {
            warn!(
                discussion_id = %discussion_id,
                error = %e,
                "Comment counter refresh failed"
            );
            metrics::record_counter_refresh_failure("comment_count");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::moderation::{self, ReviewDecision};

    #[test]
    fn test_comment_reads_gated_on_hidden_discussion() {
        let author = Uuid::new_v4();
        let d = fixtures::discussion(author);

        // Pending with no snapshot: hidden from everyone but the author
        let err = ensure_discussion_readable(&d, None).unwrap_err();
        assert!(matches!(err, AppError::DiscussionNotFound { .. }));

        let err = ensure_discussion_readable(&d, Some(Uuid::new_v4())).unwrap_err();
        assert!(matches!(err, AppError::DiscussionNotFound { .. }));

        assert!(ensure_discussion_readable(&d, Some(author)).is_ok());
    }

    #[test]
    fn test_comment_reads_open_once_discussion_surfaced() {
        let author = Uuid::new_v4();
        let now = fixtures::now();

        let d = moderation::review(fixtures::discussion(author), ReviewDecision::Approve, now)
            .unwrap();
        assert!(ensure_discussion_readable(&d, None).is_ok());

        // Back to pending after an edit, but the snapshot keeps it readable
        let d = moderation::submit_for_review(d, Default::default(), author, now).unwrap();
        assert!(ensure_discussion_readable(&d, Some(Uuid::new_v4())).is_ok());
    }

    #[test]
    fn test_projection_reports_viewer_like() {
        let fan = Uuid::new_v4();
        let mut c = fixtures::root_comment(Uuid::new_v4(), Uuid::new_v4());

        let mut liked_by = c.liked_by_set();
        engagement::toggle(&mut liked_by, fan);
        c.set_liked_by(&liked_by);

        let fan_view = CommentView::project(&c, Some(fan));
        assert_eq!(fan_view.like_count, 1);
        assert!(fan_view.liked_by_viewer);

        let anon_view = CommentView::project(&c, None);
        assert!(!anon_view.liked_by_viewer);
    }

    #[test]
    fn test_projection_carries_threading_fields() {
        let discussion_id = Uuid::new_v4();
        let parent = fixtures::root_comment(discussion_id, Uuid::new_v4());

        let mut reply = fixtures::root_comment(discussion_id, Uuid::new_v4());
        let placement = tree::reply_to(&parent);
        reply.parent_id = placement.parent_id;
        reply.root_id = placement.root_id;
        reply.path = placement.path;
        reply.depth = placement.depth;

        let view = CommentView::project(&reply, None);
        assert_eq!(view.parent_id, Some(parent.id));
        assert_eq!(view.root_id, Some(parent.id));
        assert_eq!(view.depth, 1);
    }
}
