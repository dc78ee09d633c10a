//! Comment tree placement
//!
//! Computes the threading fields for a new comment: `path` is the
//! dot-delimited chain of ancestor ids, `depth` counts edges from the
//! root, and `root_id` names the topmost ancestor. All three are fixed
//! at creation time.

use coursehub_common::db::models::Comment;
use uuid::Uuid;

/// Threading fields for a comment about to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub parent_id: Option<Uuid>,
    pub root_id: Option<Uuid>,
    pub path: String,
    pub depth: i32,
}

/// Placement for a root comment
pub fn root() -> Placement {
    Placement {
        parent_id: None,
        root_id: None,
        path: String::new(),
        depth: 0,
    }
}

/// Placement for a reply under `parent`
///
/// The caller has already validated that the parent exists, is not
/// deleted, and belongs to the same discussion.
pub fn reply_to(parent: &Comment) -> Placement {
    let path = if parent.path.is_empty() {
        parent.id.to_string()
    } else {
        format!("{}.{}", parent.path, parent.id)
    };

    Placement {
        parent_id: Some(parent.id),
        root_id: parent.root_id.or(Some(parent.id)),
        path,
        depth: parent.depth + 1,
    }
}

/// Ancestor ids recorded in a path, outermost first
pub fn ancestors(path: &str) -> Vec<Uuid> {
    path.split('.')
        .filter_map(|part| Uuid::parse_str(part).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn apply(comment: &mut Comment, placement: Placement) {
        comment.parent_id = placement.parent_id;
        comment.root_id = placement.root_id;
        comment.path = placement.path;
        comment.depth = placement.depth;
    }

    #[test]
    fn test_root_placement() {
        let p = root();
        assert_eq!(p.depth, 0);
        assert!(p.path.is_empty());
        assert!(p.root_id.is_none());
        assert!(p.parent_id.is_none());
    }

    // c1 (root) <- c2 <- c3: depth and path grow along the chain and
    // root_id stays pinned to c1.
    #[test]
    fn test_nested_chain() {
        let discussion_id = Uuid::new_v4();
        let author = Uuid::new_v4();

        let c1 = fixtures::root_comment(discussion_id, author);

        let mut c2 = fixtures::root_comment(discussion_id, author);
        apply(&mut c2, reply_to(&c1));
        assert_eq!(c2.depth, 1);
        assert_eq!(c2.path, c1.id.to_string());
        assert_eq!(c2.root_id, Some(c1.id));

        let mut c3 = fixtures::root_comment(discussion_id, author);
        apply(&mut c3, reply_to(&c2));
        assert_eq!(c3.depth, 2);
        assert_eq!(c3.path, format!("{}.{}", c1.id, c2.id));
        assert_eq!(c3.root_id, Some(c1.id));

        // depth(child) == depth(parent) + 1 holds along the chain
        assert_eq!(c2.depth, c1.depth + 1);
        assert_eq!(c3.depth, c2.depth + 1);
    }

    #[test]
    fn test_ancestors_from_path() {
        let discussion_id = Uuid::new_v4();
        let author = Uuid::new_v4();

        let c1 = fixtures::root_comment(discussion_id, author);
        let mut c2 = fixtures::root_comment(discussion_id, author);
        apply(&mut c2, reply_to(&c1));
        let mut c3 = fixtures::root_comment(discussion_id, author);
        apply(&mut c3, reply_to(&c2));

        assert_eq!(ancestors(&c3.path), vec![c1.id, c2.id]);
        assert!(ancestors(&c1.path).is_empty());
    }
}
