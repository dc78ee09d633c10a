//! Moderation state machine for discussions
//!
//! Governs the publication lifecycle: records are created pending,
//! reviewers approve or reject them, and any author edit sends the
//! record back to pending. The snapshot fields exist so that while an
//! already-published discussion is being re-reviewed, ordinary viewers
//! keep seeing the last good version instead of an unreviewed draft.
//!
//! Transitions:
//!
//! ```text
//! pending  --approve-->  approved
//! pending  --reject--->  rejected
//! approved --edit----->  pending   (snapshot captured first)
//! rejected --edit----->  pending
//! ```
//!
//! Every function here is pure: it consumes the current record value
//! and returns the next one, leaving persistence to the caller.

use chrono::{DateTime, FixedOffset};
use coursehub_common::db::models::{Discussion, DiscussionStatus};
use coursehub_common::errors::{AppError, Result};
use uuid::Uuid;

/// Author-submitted content changes; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct DiscussionEdits {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub experiment_id: Option<Uuid>,
}

/// Outcome of a review pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject { reason: String },
}

impl ReviewDecision {
    /// Parse a decision from its wire form
    ///
    /// Only `approved` and `rejected` are review decisions; anything
    /// else (including `pending`) is rejected at this boundary. A
    /// rejection requires a non-empty reason.
    pub fn parse(decision: &str, reason: Option<String>) -> Result<Self> {
        match decision.parse::<DiscussionStatus>()? {
            DiscussionStatus::Approved => Ok(ReviewDecision::Approve),
            DiscussionStatus::Rejected => {
                let reason = reason
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .ok_or_else(|| AppError::MissingField {
                        field: "reason".into(),
                    })?;
                Ok(ReviewDecision::Reject { reason })
            }
            DiscussionStatus::Pending => Err(AppError::InvalidStatus {
                value: decision.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::Approve => "approved",
            ReviewDecision::Reject { .. } => "rejected",
        }
    }
}

/// Copy the current content into the snapshot fields
fn capture_snapshot(d: &mut Discussion, now: DateTime<FixedOffset>) {
    d.last_approved_title = Some(d.title.clone());
    d.last_approved_content = Some(d.content.clone());
    d.last_approved_tags = Some(d.tags.clone());
    d.last_approved_at = Some(now);
}

/// Apply an author edit and send the record back to review
///
/// If the record is currently approved, the pre-edit content is
/// captured into the snapshot fields first, so a rejected or in-review
/// edit never erases the last publicly visible version.
pub fn submit_for_review(
    mut d: Discussion,
    edits: DiscussionEdits,
    author_id: Uuid,
    now: DateTime<FixedOffset>,
) -> Result<Discussion> {
    if d.author_id != author_id {
        return Err(AppError::Forbidden {
            message: "Only the author may edit a discussion".into(),
        });
    }

    if d.status == DiscussionStatus::Approved {
        capture_snapshot(&mut d, now);
    }

    if let Some(title) = edits.title {
        d.title = title;
    }
    if let Some(content) = edits.content {
        d.content = content;
    }
    if let Some(tags) = edits.tags {
        d.set_tags(&tags);
    }
    if let Some(experiment_id) = edits.experiment_id {
        d.experiment_id = Some(experiment_id);
    }

    d.status = DiscussionStatus::Pending;
    d.rejection_reason = None;
    d.updated_at = now;
    d.last_activity_at = now;

    Ok(d)
}

/// Apply a review decision to a pending record
///
/// Approval refreshes the snapshot from the now-approved content;
/// rejection stores the reason and leaves any snapshot untouched.
pub fn review(
    mut d: Discussion,
    decision: ReviewDecision,
    now: DateTime<FixedOffset>,
) -> Result<Discussion> {
    if d.status != DiscussionStatus::Pending {
        return Err(AppError::Validation {
            message: format!("Cannot review a discussion in status '{}'", d.status),
            field: Some("status".into()),
        });
    }

    match decision {
        ReviewDecision::Approve => {
            d.status = DiscussionStatus::Approved;
            d.approved_at = Some(now);
            d.rejection_reason = None;
            capture_snapshot(&mut d, now);
        }
        ReviewDecision::Reject { reason } => {
            d.status = DiscussionStatus::Rejected;
            d.rejection_reason = Some(reason);
        }
    }

    d.updated_at = now;
    Ok(d)
}

/// Soft-delete a discussion; author-only
pub fn soft_delete(
    mut d: Discussion,
    author_id: Uuid,
    now: DateTime<FixedOffset>,
) -> Result<Discussion> {
    if d.author_id != author_id {
        return Err(AppError::Forbidden {
            message: "Only the author may delete a discussion".into(),
        });
    }

    d.deleted = true;
    d.deleted_at = Some(now);
    d.updated_at = now;
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_approve_sets_snapshot_and_timestamps() {
        let author = Uuid::new_v4();
        let d = fixtures::discussion(author);
        let now = fixtures::now();

        let d = review(d, ReviewDecision::Approve, now).unwrap();

        assert_eq!(d.status, DiscussionStatus::Approved);
        assert_eq!(d.approved_at, Some(now));
        assert_eq!(d.last_approved_title.as_deref(), Some("Initial title"));
        assert_eq!(d.last_approved_content.as_deref(), Some("Initial content"));
        assert_eq!(d.last_approved_at, Some(now));
        assert!(d.rejection_reason.is_none());
    }

    #[test]
    fn test_reject_keeps_snapshot_untouched() {
        let author = Uuid::new_v4();
        let d = fixtures::discussion(author);
        let now = fixtures::now();

        let d = review(
            d,
            ReviewDecision::Reject {
                reason: "off topic".into(),
            },
            now,
        )
        .unwrap();

        assert_eq!(d.status, DiscussionStatus::Rejected);
        assert_eq!(d.rejection_reason.as_deref(), Some("off topic"));
        assert!(d.last_approved_title.is_none());
        assert!(d.last_approved_at.is_none());
    }

    #[test]
    fn test_review_requires_pending() {
        let author = Uuid::new_v4();
        let now = fixtures::now();
        let d = review(fixtures::discussion(author), ReviewDecision::Approve, now).unwrap();

        let err = review(d, ReviewDecision::Approve, now).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_edit_of_approved_captures_pre_edit_snapshot() {
        let author = Uuid::new_v4();
        let now = fixtures::now();
        let d = review(fixtures::discussion(author), ReviewDecision::Approve, now).unwrap();

        let edits = DiscussionEdits {
            title: Some("Edited title".into()),
            ..Default::default()
        };
        let d = submit_for_review(d, edits, author, now).unwrap();

        assert_eq!(d.status, DiscussionStatus::Pending);
        assert_eq!(d.title, "Edited title");
        // The last publicly visible version survives the edit
        assert_eq!(d.last_approved_title.as_deref(), Some("Initial title"));
    }

    #[test]
    fn test_edit_of_pending_leaves_no_snapshot() {
        let author = Uuid::new_v4();
        let now = fixtures::now();

        let edits = DiscussionEdits {
            content: Some("Second draft".into()),
            ..Default::default()
        };
        let d = submit_for_review(fixtures::discussion(author), edits, author, now).unwrap();

        assert_eq!(d.status, DiscussionStatus::Pending);
        assert_eq!(d.content, "Second draft");
        assert!(d.last_approved_at.is_none());
    }

    #[test]
    fn test_edit_clears_stale_rejection_reason() {
        let author = Uuid::new_v4();
        let now = fixtures::now();
        let d = review(
            fixtures::discussion(author),
            ReviewDecision::Reject {
                reason: "needs sources".into(),
            },
            now,
        )
        .unwrap();

        let d = submit_for_review(d, DiscussionEdits::default(), author, now).unwrap();

        assert_eq!(d.status, DiscussionStatus::Pending);
        assert!(d.rejection_reason.is_none());
    }

    #[test]
    fn test_edit_by_non_author_forbidden() {
        let author = Uuid::new_v4();
        let now = fixtures::now();
        let d = fixtures::discussion(author);

        let err = submit_for_review(d, DiscussionEdits::default(), Uuid::new_v4(), now).unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
    }

    #[test]
    fn test_delete_by_non_author_forbidden() {
        let author = Uuid::new_v4();
        let now = fixtures::now();
        let d = fixtures::discussion(author);

        let err = soft_delete(d, Uuid::new_v4(), now).unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
    }

    #[test]
    fn test_decision_parsing() {
        assert_eq!(
            ReviewDecision::parse("approved", None).unwrap(),
            ReviewDecision::Approve
        );
        assert_eq!(
            ReviewDecision::parse("rejected", Some("spam".into())).unwrap(),
            ReviewDecision::Reject {
                reason: "spam".into()
            }
        );
    }

    #[test]
    fn test_rejection_requires_reason() {
        let err = ReviewDecision::parse("rejected", None).unwrap_err();
        assert!(matches!(err, AppError::MissingField { .. }));

        let err = ReviewDecision::parse("rejected", Some("   ".into())).unwrap_err();
        assert!(matches!(err, AppError::MissingField { .. }));
    }

    #[test]
    fn test_unknown_decision_rejected() {
        assert!(matches!(
            ReviewDecision::parse("archived", None).unwrap_err(),
            AppError::InvalidStatus { .. }
        ));
        assert!(matches!(
            ReviewDecision::parse("pending", None).unwrap_err(),
            AppError::InvalidStatus { .. }
        ));
    }
}
