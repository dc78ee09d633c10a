//! Test fixtures for building record values in memory

use chrono::{DateTime, FixedOffset, Utc};
use coursehub_common::db::models::{Comment, CommentStatus, Discussion, DiscussionStatus};
use uuid::Uuid;

pub fn now() -> DateTime<FixedOffset> {
    Utc::now().into()
}

pub fn discussion(author_id: Uuid) -> Discussion {
    let ts = now();
    Discussion {
        id: Uuid::new_v4(),
        author_id,
        author_name: "Test Author".into(),
        author_avatar: None,
        title: "Initial title".into(),
        content: "Initial content".into(),
        tags: serde_json::json!(["lab-1"]),
        experiment_id: None,
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
    }
}

pub fn root_comment(discussion_id: Uuid, author_id: Uuid) -> Comment {
    let ts = now();
    Comment {
        id: Uuid::new_v4(),
        discussion_id,
        author_id,
        author_name: "Test Commenter".into(),
        author_avatar: None,
        content: "A root comment".into(),
        parent_id: None,
        root_id: None,
        path: String::new(),
        depth: 0,
        reply_to_user_id: None,
        reply_to_username: None,
        status: CommentStatus::Normal,
        liked_by: serde_json::json!([]),
        like_count: 0,
        deleted: false,
        deleted_at: None,
        created_at: ts,
        updated_at: ts,
    }
}
