//! Comment entity
//!
//! Nested reply under a discussion. The threading fields (`parent_id`,
//! `root_id`, `path`, `depth`) are computed once at creation and never
//! mutated afterwards.

use crate::errors::AppError;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Moderation flag on a comment
///
/// Unlike `DiscussionStatus` this is not a guarded state machine: any
/// status may be set from any other. Comments carry no snapshot or
/// hide semantics, so reporting only queues them for a manual review
/// pass and reviewing records its outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum CommentStatus {
    #[sea_orm(string_value = "normal")]
    Normal,
    #[sea_orm(string_value = "reported")]
    Reported,
    #[sea_orm(string_value = "cleared")]
    Cleared,
    #[sea_orm(string_value = "removed")]
    Removed,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Normal => "normal",
            CommentStatus::Reported => "reported",
            CommentStatus::Cleared => "cleared",
            CommentStatus::Removed => "removed",
        }
    }
}

impl fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(CommentStatus::Normal),
            "reported" => Ok(CommentStatus::Reported),
            "cleared" => Ok(CommentStatus::Cleared),
            "removed" => Ok(CommentStatus::Removed),
            other => Err(AppError::InvalidStatus {
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub discussion_id: Uuid,

    pub author_id: Uuid,

    /// Author display name, denormalized at creation time
    #[sea_orm(column_type = "Text")]
    pub author_name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub author_avatar: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Direct parent; null for root comments
    pub parent_id: Option<Uuid>,

    /// Topmost ancestor; null for root comments
    pub root_id: Option<Uuid>,

    /// Dot-delimited ancestor-id chain; empty for root comments
    #[sea_orm(column_type = "Text")]
    pub path: String,

    /// 0 for roots, parent depth + 1 otherwise
    pub depth: i32,

    /// Display-only mention target, independent of tree placement
    pub reply_to_user_id: Option<Uuid>,

    #[sea_orm(column_type = "Text", nullable)]
    pub reply_to_username: Option<String>,

    pub status: CommentStatus,

    /// User ids that currently like this comment (JSONB array)
    #[sea_orm(column_type = "JsonBinary")]
    pub liked_by: Json,

    /// Always equals the size of `liked_by`
    pub like_count: i64,

    pub deleted: bool,

    pub deleted_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// The set of user ids that like this comment
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
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::discussion::Entity",
        from = "Column::DiscussionId",
        to = "super::discussion::Column::Id"
    )]
    Discussion,
}

impl Related<super::discussion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Discussion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in ["normal", "reported", "cleared", "removed"] {
            assert_eq!(CommentStatus::from_str(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn test_status_rejects_unknown() {
        let err = CommentStatus::from_str("hidden").unwrap_err();
        assert!(matches!(err, AppError::InvalidStatus { .. }));
    }
}
