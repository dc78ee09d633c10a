//! Discussion service
//!
//! Orchestrates the moderation state machine, visibility resolver, and
//! engagement tracker over the repository. Every operation receives the
//! acting viewer's identity explicitly; nothing here reads ambient
//! security state.

use crate::engagement;
use crate::moderation::{self, DiscussionEdits, ReviewDecision};
use crate::visibility;
use chrono::{DateTime, FixedOffset, Utc};
use coursehub_common::db::models::{Discussion, DiscussionStatus};
use coursehub_common::db::{DiscussionQuery, Repository};
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

/// Input for creating a discussion
#[derive(Debug, Clone)]
pub struct NewDiscussion {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub experiment_id: Option<Uuid>,
}

/// The projection of a discussion a particular viewer may see
#[derive(Debug, Clone, Serialize)]
pub struct DiscussionView {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub experiment_id: Option<Uuid>,
    pub status: DiscussionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub like_count: i64,
    pub liked_by_viewer: bool,
    pub view_count: i64,
    pub comment_count: i64,
    pub last_comment_at: Option<DateTime<FixedOffset>>,
    pub last_activity_at: DateTime<FixedOffset>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl DiscussionView {
    /// Build the viewer-specific projection, or nothing if the record
    /// is hidden from this viewer
    fn project(d: &Discussion, viewer: Option<Uuid>) -> Option<Self> {
        let content = visibility::resolve(d, viewer)?;
        let is_author = viewer == Some(d.author_id);

        Some(Self {
            id: d.id,
            author_id: d.author_id,
            author_name: d.author_name.clone(),
            author_avatar: d.author_avatar.clone(),
            title: content.title,
            content: content.content,
            tags: content.tags,
            experiment_id: d.experiment_id,
            status: d.status,
            // Review feedback is for the author's eyes only
            rejection_reason: if is_author {
                d.rejection_reason.clone()
            } else {
                None
            },
            like_count: d.like_count,
            liked_by_viewer: viewer.map(|v| d.is_liked_by(v)).unwrap_or(false),
            view_count: d.view_count,
            comment_count: d.comment_count,
            last_comment_at: d.last_comment_at,
            last_activity_at: d.last_activity_at,
            created_at: d.created_at,
            updated_at: d.updated_at,
        })
    }
}

/// Service for discussion lifecycle operations
#[derive(Clone)]
pub struct DiscussionService {
    repo: Repository,
    directory: Arc<dyn UserDirectory>,
}

impl DiscussionService {
    pub fn new(repo: Repository, directory: Arc<dyn UserDirectory>) -> Self {
        Self { repo, directory }
    }

    /// Create a new discussion in pending state
    ///
    /// The author's display fields are denormalized from the user
    /// directory; that lookup is required, so a directory failure
    /// aborts creation.
    pub async fn create(&self, author_id: Uuid, input: NewDiscussion) -> Result<DiscussionView> {
        let author = self
            .directory
            .get_user(author_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound {
                id: author_id.to_string(),
            })?;

        let ts = now();
        let discussion = Discussion {
            id: Uuid::new_v4(),
            author_id,
            author_name: author.display_name,
            author_avatar: author.avatar,
            title: input.title,
            content: input.content,
            tags: serde_json::json!(input.tags),
            experiment_id: input.experiment_id,
            status: DiscussionStatus::Pending,
            rejection_reason: None,
            approved_at: None,
            last_approved_title: None,
            last_approved_content: None,
            last_approved_tags: None,
            last_approved_at: None,
            liked_by: serde_json::json!([]),
            like_count: 0,
            view_count: 0,
            comment_count: 0,
            last_comment_at: None,
            last_activity_at: ts,
            deleted: false,
            deleted_at: None,
            created_at: ts,
            updated_at: ts,
        };

        let created = self.repo.create_discussion(discussion).await?;
        metrics::record_discussion_created();

        info!(
            discussion_id = %created.id,
            author_id = %author_id,
            "Discussion created, awaiting review"
        );

        // The author always sees their own record
        DiscussionView::project(&created, Some(author_id)).ok_or_else(|| AppError::Internal {
            message: "Author projection missing for freshly created discussion".into(),
        })
    }

    /// Fetch a single discussion as seen by `viewer`
    ///
    /// A record the resolver hides is reported as not found so the API
    /// does not confirm the existence of unreviewed content.
    pub async fn get(&self, id: Uuid, viewer: Option<Uuid>) -> Result<DiscussionView> {
        let discussion = self
            .repo
            .find_discussion(id)
            .await?
            .ok_or_else(|| AppError::DiscussionNotFound { id: id.to_string() })?;

        let view = DiscussionView::project(&discussion, viewer)
            .ok_or_else(|| AppError::DiscussionNotFound { id: id.to_string() })?;

        // Best-effort counter; failure never fails the read
        if let Err(e) = self.repo.increment_view_count(id).await {
            warn!(discussion_id = %id, error = %e, "View count bump failed");
            metrics::record_counter_refresh_failure("view_count");
        }

        Ok(view)
    }

    /// List discussions visible to `viewer`
    ///
    /// When `query.status` is set, the caller has already been checked
    /// for the reviewer capability by the boundary.
    pub async fn list(
        &self,
        query: &DiscussionQuery,
        viewer: Option<Uuid>,
    ) -> Result<(Vec<DiscussionView>, u64)> {
        let page = self.repo.list_discussions(query, viewer).await?;

        let views = page
            .items
            .iter()
            .filter_map(|d| DiscussionView::project(d, viewer))
            .collect();

        Ok((views, page.total))
    }

    /// Apply an author edit, sending the record back to review
    pub async fn edit(
        &self,
        id: Uuid,
        author_id: Uuid,
        edits: DiscussionEdits,
    ) -> Result<DiscussionView> {
        let ts = now();
        let updated = self
            .repo
            .update_discussion(id, move |d| {
                moderation::submit_for_review(d, edits, author_id, ts)
            })
            .await?;

        info!(discussion_id = %id, author_id = %author_id, "Discussion edited, back to pending");

        DiscussionView::project(&updated, Some(author_id)).ok_or_else(|| AppError::Internal {
            message: "Author projection missing after edit".into(),
        })
    }

    /// Apply a review decision
    ///
    /// The reviewer capability is checked by the caller; this only
    /// enforces transition legality.
    pub async fn review(&self, id: Uuid, decision: ReviewDecision) -> Result<DiscussionView> {
        let label = decision.as_str();
        let ts = now();

        let updated = self
            .repo
            .update_discussion(id, move |d| moderation::review(d, decision, ts))
            .await?;

        metrics::record_review("discussion", label);
        info!(discussion_id = %id, decision = label, "Discussion reviewed");

        // Project as the author, who sees every outcome
        DiscussionView::project(&updated, Some(updated.author_id)).ok_or_else(|| {
            AppError::Internal {
                message: "Author projection missing after review".into(),
            }
        })
    }

    /// Soft-delete a discussion; author-only
    pub async fn delete(&self, id: Uuid, author_id: Uuid) -> Result<()> {
        let ts = now();
        self.repo
            .update_discussion(id, move |d| moderation::soft_delete(d, author_id, ts))
            .await?;

        info!(discussion_id = %id, author_id = %author_id, "Discussion deleted");
        Ok(())
    }

    /// Flip the viewer's like on a discussion
    ///
    /// Runs entirely inside the row lock; a record the resolver hides
    /// from this viewer rolls back untouched.
    pub async fn toggle_like(&self, id: Uuid, user_id: Uuid) -> Result<DiscussionView> {
        let ts = now();
        let updated = self
            .repo
            .update_discussion(id, move |d| toggle_like_transition(d, user_id, ts))
            .await?;

        metrics::record_like("discussion", updated.is_liked_by(user_id));

        DiscussionView::project(&updated, Some(user_id)).ok_or_else(|| AppError::Internal {
            message: "Viewer projection missing after like toggle".into(),
        })
    }
}

/// Toggle transition applied under the repository's row lock
///
/// Rejects the toggle before mutating anything when the viewer cannot
/// see the record, so no state change ever pairs with a failed call.
fn toggle_like_transition(
    mut d: Discussion,
    user_id: Uuid,
    now: DateTime<FixedOffset>,
) -> Result<Discussion> {
    if visibility::resolve(&d, Some(user_id)).is_none() {
        return Err(AppError::DiscussionNotFound {
            id: d.id.to_string(),
        });
    }

    let mut liked_by = d.liked_by_set();
    engagement::toggle(&mut liked_by, user_id);
    d.set_liked_by(&liked_by);
    d.updated_at = now;
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::moderation::{self, ReviewDecision};

    #[test]
    fn test_projection_hides_pending_from_others() {
        let author = Uuid::new_v4();
        let d = fixtures::discussion(author);

        assert!(DiscussionView::project(&d, None).is_none());
        assert!(DiscussionView::project(&d, Some(Uuid::new_v4())).is_none());
        assert!(DiscussionView::project(&d, Some(author)).is_some());
    }

    #[test]
    fn test_rejection_reason_is_author_only() {
        let author = Uuid::new_v4();
        let now = fixtures::now();

        // Approve first so other viewers get the snapshot view
        let d = moderation::review(fixtures::discussion(author), ReviewDecision::Approve, now)
            .unwrap();
        let d = moderation::submit_for_review(d, Default::default(), author, now).unwrap();
        let d = moderation::review(
            d,
            ReviewDecision::Reject {
                reason: "needs work".into(),
            },
            now,
        )
        .unwrap();

        let author_view = DiscussionView::project(&d, Some(author)).unwrap();
        assert_eq!(author_view.rejection_reason.as_deref(), Some("needs work"));

        let other_view = DiscussionView::project(&d, Some(Uuid::new_v4())).unwrap();
        assert!(other_view.rejection_reason.is_none());
    }

    #[test]
    fn test_like_toggle_rejected_on_hidden_record() {
        let author = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let now = fixtures::now();
        let d = fixtures::discussion(author);
        let before = d.clone();

        // Hidden pending record: the transition fails without mutating
        let err = toggle_like_transition(d, stranger, now).unwrap_err();
        assert!(matches!(err, AppError::DiscussionNotFound { .. }));
        assert_eq!(before.like_count, 0);
        assert!(before.liked_by_set().is_empty());
    }

    #[test]
    fn test_like_toggle_applies_for_entitled_viewers() {
        let author = Uuid::new_v4();
        let fan = Uuid::new_v4();
        let now = fixtures::now();

        // The author may like their own pending draft
        let d = toggle_like_transition(fixtures::discussion(author), author, now).unwrap();
        assert_eq!(d.like_count, 1);
        assert!(d.is_liked_by(author));

        // Anyone may like an approved record, and a second toggle undoes it
        let d = moderation::review(d, ReviewDecision::Approve, now).unwrap();
        let d = toggle_like_transition(d, fan, now).unwrap();
        assert_eq!(d.like_count, 2);
        let d = toggle_like_transition(d, fan, now).unwrap();
        assert_eq!(d.like_count, 1);
        assert!(!d.is_liked_by(fan));
    }

    #[test]
    fn test_projection_reports_viewer_like() {
        let author = Uuid::new_v4();
        let fan = Uuid::new_v4();
        let now = fixtures::now();

        let mut d = moderation::review(fixtures::discussion(author), ReviewDecision::Approve, now)
            .unwrap();
        let mut liked_by = d.liked_by_set();
        engagement::toggle(&mut liked_by, fan);
        d.set_liked_by(&liked_by);

        let fan_view = DiscussionView::project(&d, Some(fan)).unwrap();
        assert_eq!(fan_view.like_count, 1);
        assert!(fan_view.liked_by_viewer);

        let other_view = DiscussionView::project(&d, Some(Uuid::new_v4())).unwrap();
        assert!(!other_view.liked_by_viewer);

        let anon_view = DiscussionView::project(&d, None).unwrap();
        assert!(!anon_view.liked_by_viewer);
    }
}
