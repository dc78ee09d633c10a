//! Visibility resolution
//!
//! Maps a stored discussion and a viewer identity to the content that
//! viewer may see. Runs on every single-item and list read; list
//! queries additionally push an existence filter into SQL (see
//! `Repository::list_discussions`) so unreviewed records are never
//! enumerated for other viewers in the first place.

use coursehub_common::db::models::{Discussion, DiscussionStatus};
use uuid::Uuid;

/// The content projection a viewer is allowed to see
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentView {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

/// Resolve what `viewer` may see of `d`
///
/// Priority order, first match wins:
/// 1. The author always sees the live draft.
/// 2. An approved record shows its current content.
/// 3. A record with a historical snapshot shows the snapshot.
/// 4. Otherwise nothing is surfaced.
pub fn resolve(d: &Discussion, viewer: Option<Uuid>) -> Option<ContentView> {
    if viewer == Some(d.author_id) {
        return Some(current(d));
    }

    if d.status == DiscussionStatus::Approved {
        return Some(current(d));
    }

    if d.has_snapshot() {
        return Some(ContentView {
            title: d.last_approved_title.clone().unwrap_or_default(),
            content: d.last_approved_content.clone().unwrap_or_default(),
            tags: d.last_approved_tag_list(),
        });
    }

    None
}

fn current(d: &Discussion) -> ContentView {
    ContentView {
        title: d.title.clone(),
        content: d.content.clone(),
        tags: d.tag_list(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::moderation::{self, DiscussionEdits, ReviewDecision};

    #[test]
    fn test_pending_without_snapshot_hidden_from_others() {
        let author = Uuid::new_v4();
        let d = fixtures::discussion(author);

        assert!(resolve(&d, None).is_none());
        assert!(resolve(&d, Some(Uuid::new_v4())).is_none());
    }

    #[test]
    fn test_author_always_sees_live_draft() {
        let author = Uuid::new_v4();
        let d = fixtures::discussion(author);

        let view = resolve(&d, Some(author)).unwrap();
        assert_eq!(view.title, "Initial title");
    }

    #[test]
    fn test_approved_visible_to_everyone() {
        let author = Uuid::new_v4();
        let now = fixtures::now();
        let d = moderation::review(fixtures::discussion(author), ReviewDecision::Approve, now)
            .unwrap();

        let view = resolve(&d, None).unwrap();
        assert_eq!(view.title, "Initial title");
        assert_eq!(view.tags, vec!["lab-1".to_string()]);
    }

    // The full lifecycle: approve "T1", edit to "T2", and check that
    // other viewers keep seeing the approved version while the author
    // sees the new draft.
    #[test]
    fn test_snapshot_preserved_across_edit() {
        let author = Uuid::new_v4();
        let now = fixtures::now();

        let mut d = fixtures::discussion(author);
        d.title = "T1".into();

        let d = moderation::review(d, ReviewDecision::Approve, now).unwrap();
        assert_eq!(resolve(&d, None).unwrap().title, "T1");

        let edits = DiscussionEdits {
            title: Some("T2".into()),
            ..Default::default()
        };
        let d = moderation::submit_for_review(d, edits, author, now).unwrap();

        assert_eq!(d.last_approved_title.as_deref(), Some("T1"));
        assert_eq!(resolve(&d, None).unwrap().title, "T1");
        assert_eq!(resolve(&d, Some(Uuid::new_v4())).unwrap().title, "T1");
        assert_eq!(resolve(&d, Some(author)).unwrap().title, "T2");
    }

    #[test]
    fn test_rejected_edit_still_shows_last_approved() {
        let author = Uuid::new_v4();
        let now = fixtures::now();

        let d = moderation::review(fixtures::discussion(author), ReviewDecision::Approve, now)
            .unwrap();
        let edits = DiscussionEdits {
            content: Some("hot take".into()),
            ..Default::default()
        };
        let d = moderation::submit_for_review(d, edits, author, now).unwrap();
        let d = moderation::review(
            d,
            ReviewDecision::Reject {
                reason: "tone".into(),
            },
            now,
        )
        .unwrap();

        let view = resolve(&d, None).unwrap();
        assert_eq!(view.content, "Initial content");
    }
}
