//! SeaORM entity models
//!
//! Database entities for the CourseHub discussion service

mod comment;
mod discussion;

pub use discussion::{
    ActiveModel as DiscussionActiveModel,
    Column as DiscussionColumn,
    DiscussionStatus,
    Entity as DiscussionEntity,
    Model as Discussion,
};

pub use comment::{
    ActiveModel as CommentActiveModel,
    Column as CommentColumn,
    CommentStatus,
    Entity as CommentEntity,
    Model as Comment,
};
