//! Engagement tracking
//!
//! Like toggling for discussions and comments, plus the report/review
//! flags on comments. Unlike the discussion machine in
//! [`crate::moderation`], comment status transitions are deliberately
//! unrestricted: comments carry no snapshot or hide semantics, so a
//! review pass may move them between any two statuses.

use chrono::{DateTime, FixedOffset};
use coursehub_common::db::models::{Comment, CommentStatus};
use std::collections::HashSet;
use uuid::Uuid;

/// Flip a user's membership in a like set
///
/// Returns whether the user likes the record afterwards. Two identical
/// calls are a net no-op; this is a toggle, not "mark liked".
pub fn toggle(liked_by: &mut HashSet<Uuid>, user_id: Uuid) -> bool {
    if liked_by.remove(&user_id) {
        false
    } else {
        liked_by.insert(user_id);
        true
    }
}

/// Flag a comment for the moderation queue
///
/// Repeated reports do not stack; the flag does not alter visibility.
pub fn report(mut c: Comment, now: DateTime<FixedOffset>) -> Comment {
    c.status = CommentStatus::Reported;
    c.updated_at = now;
    c
}

/// Record the outcome of a manual review pass on a comment
pub fn review(mut c: Comment, status: CommentStatus, now: DateTime<FixedOffset>) -> Comment {
    c.status = status;
    c.updated_at = now;
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_toggle_adds_then_removes() {
        let user = Uuid::new_v4();
        let mut set = HashSet::new();

        assert!(toggle(&mut set, user));
        assert!(set.contains(&user));

        assert!(!toggle(&mut set, user));
        assert!(set.is_empty());
    }

    #[test]
    fn test_double_toggle_is_net_noop() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut set = HashSet::from([other]);
        let before = set.clone();

        toggle(&mut set, user);
        toggle(&mut set, user);

        assert_eq!(set, before);
    }

    #[test]
    fn test_like_count_tracks_set_size() {
        let discussion_id = Uuid::new_v4();
        let mut c = fixtures::root_comment(discussion_id, Uuid::new_v4());

        let mut set = c.liked_by_set();
        for _ in 0..3 {
            toggle(&mut set, Uuid::new_v4());
        }
        c.set_liked_by(&set);

        assert_eq!(c.like_count, 3);
        assert_eq!(c.liked_by_set().len() as i64, c.like_count);
    }

    #[test]
    fn test_repeated_reports_do_not_stack() {
        let now = fixtures::now();
        let c = fixtures::root_comment(Uuid::new_v4(), Uuid::new_v4());

        let c = report(c, now);
        assert_eq!(c.status, CommentStatus::Reported);

        let c = report(c, now);
        assert_eq!(c.status, CommentStatus::Reported);
    }

    // reported -> normal is legal; the comment machine has no guards.
    #[test]
    fn test_review_transitions_unrestricted() {
        let now = fixtures::now();
        let c = fixtures::root_comment(Uuid::new_v4(), Uuid::new_v4());

        let c = report(c, now);
        let c = review(c, CommentStatus::Normal, now);
        assert_eq!(c.status, CommentStatus::Normal);

        let c = review(c, CommentStatus::Removed, now);
        let c = review(c, CommentStatus::Cleared, now);
        assert_eq!(c.status, CommentStatus::Cleared);
    }
}
