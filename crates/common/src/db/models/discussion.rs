//! Discussion entity
//!
//! A long-form thread posted by a course member. Carries the moderation
//! status, the last-approved snapshot fields, and denormalized engagement
//! counters. The snapshot fields hold the last publicly visible version
//! of the content and are only rewritten on approval or on an edit of an
//! approved record.

use crate::errors::AppError;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Publication lifecycle status of a discussion
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum DiscussionStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl DiscussionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscussionStatus::Pending => "pending",
            DiscussionStatus::Approved => "approved",
            DiscussionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for DiscussionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscussionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DiscussionStatus::Pending),
            "approved" => Ok(DiscussionStatus::Approved),
            "rejected" => Ok(DiscussionStatus::Rejected),
            other => Err(AppError::InvalidStatus {
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discussions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub author_id: Uuid,

    /// Author display name, denormalized at creation time
    #[sea_orm(column_type = "Text")]
    pub author_name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub author_avatar: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Tag set as a JSONB array of strings
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Json,

    /// Associated course experiment, if any
    pub experiment_id: Option<Uuid>,

    pub status: DiscussionStatus,

    /// Set only while status is rejected
    #[sea_orm(column_type = "Text", nullable)]
    pub rejection_reason: Option<String>,

    pub approved_at: Option<DateTimeWithTimeZone>,

    // Snapshot of the last approved version. Rewritten only on a
    // transition into approved, or on an edit submitted while approved.
    #[sea_orm(column_type = "Text", nullable)]
    pub last_approved_title: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub last_approved_content: Option<String>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub last_approved_tags: Option<Json>,

    pub last_approved_at: Option<DateTimeWithTimeZone>,

    /// User ids that currently like this discussion (JSONB array)
    #[sea_orm(column_type = "JsonBinary")]
    pub liked_by: Json,

    /// Always equals the size of `liked_by`
    pub like_count: i64,

    pub view_count: i64,

    /// Count of non-deleted comments, refreshed after comment writes
    pub comment_count: i64,

    pub last_comment_at: Option<DateTimeWithTimeZone>,

    pub last_activity_at: DateTimeWithTimeZone,

    pub deleted: bool,

    pub deleted_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Current tag set as plain strings
    pub fn tag_list(&self) -> Vec<String> {
        serde_json::from_value(self.tags.clone()).unwrap_or_default()
    }

    pub fn set_tags(&mut self, tags: &[String]) {
        self.tags = serde_json::json!(tags);
    }

    /// Snapshot tag set, if a snapshot exists
    pub fn last_approved_tag_list(&self) -> Vec<String> {
        self.last_approved_tags
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// The set of user ids that like this discussion
    pub fn liked_by_set(&self) -> HashSet<Uuid> {
        serde_json::from_value(self.liked_by.clone()).unwrap_or_default()
    }

    /// Replace the like set, keeping `like_count` equal to its size
    pub fn set_liked_by(&mut self, liked_by: &HashSet<Uuid>) {
        self.like_count = liked_by.len() as i64;
        self.liked_by = serde_json::json!(liked_by);
    }

    pub fn is_liked_by(&self, user_id: Uuid) -> bool {
        self.liked_by_set().contains(&user_id)
    }

    /// Whether a historical approved snapshot exists
    pub fn has_snapshot(&self) -> bool {
        self.last_approved_at.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in ["pending", "approved", "rejected"] {
            assert_eq!(DiscussionStatus::from_str(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn test_status_rejects_unknown() {
        let err = DiscussionStatus::from_str("archived").unwrap_err();
        assert!(matches!(err, AppError::InvalidStatus { .. }));
    }
}
