//! CourseHub discussion core
//!
//! The domain logic of the discussion service, split into pure modules
//! and the two services that orchestrate them over the repository:
//!
//! - [`moderation`] — the discussion publication state machine with
//!   content snapshotting
//! - [`visibility`] — resolves what a given viewer may see of a record
//! - [`tree`] — comment path/depth/root placement math
//! - [`engagement`] — like toggling and report/review flags
//! - [`discussions`] / [`comments`] — the orchestrating services
//!
//! The pure modules never touch the database; every transition takes
//! the current record value and returns the next one, so the services
//! can run them under the repository's row-level locks.

pub mod comments;
pub mod discussions;
pub mod engagement;
pub mod moderation;
pub mod tree;
pub mod visibility;

#[cfg(test)]
pub(crate) mod fixtures;

pub use comments::{CommentService, CommentThread, CommentView, NewComment};
pub use discussions::{DiscussionService, DiscussionView, NewDiscussion};
pub use moderation::{DiscussionEdits, ReviewDecision};
