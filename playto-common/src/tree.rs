//! The comment tree of a single post, independent of any rendering.

use crate::model::{
    Id,
    comment::{Comment, CommentMarker},
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Error)]
#[error("Comment {id} has depth {depth} but its parent has depth {parent_depth}")]
pub struct DepthViolation {
    pub id: Id<CommentMarker>,
    pub depth: u32,
    pub parent_depth: u32,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CommentTree {
    roots: Vec<Comment>,
}

impl CommentTree {
    #[must_use]
    pub fn new(roots: Vec<Comment>) -> Self {
        Self { roots }
    }

    /// Assembles a tree from a flat list such as `GET /comments/?post=`.
    ///
    /// Siblings keep the order of the input. Any `replies` already present in
    /// the input are discarded and rebuilt from the parent references.
    /// Comments whose parent is not part of the list are dropped.
    #[must_use]
    pub fn from_flat(comments: Vec<Comment>) -> Self {
        let mut children: HashMap<Option<Id<CommentMarker>>, Vec<Comment>> = HashMap::new();
        for mut comment in comments {
            comment.replies.clear();
            children.entry(comment.parent).or_default().push(comment);
        }

        let mut roots = children.remove(&None).unwrap_or_default();
        for root in &mut roots {
            attach_replies(root, &mut children);
        }

        let orphaned: usize = children.values().map(Vec::len).sum();
        if orphaned > 0 {
            warn!(orphaned, "Dropping comments whose parent is missing");
        }

        Self { roots }
    }

    #[must_use]
    pub fn roots(&self) -> &[Comment] {
        &self.roots
    }

    #[must_use]
    pub fn into_roots(self) -> Vec<Comment> {
        self.roots
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of comments at every level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Depth-first, pre-order walk: every comment is followed by its replies.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: vec![self.roots.iter()],
        }
    }

    #[must_use]
    pub fn find(&self, id: Id<CommentMarker>) -> Option<&Comment> {
        self.iter().find(|comment| comment.id == id)
    }

    /// First match in depth-first order.
    pub fn find_mut(&mut self, id: Id<CommentMarker>) -> Option<&mut Comment> {
        find_in(&mut self.roots, id)
    }

    /// Replaces the like count of `id`. Returns whether the comment was found.
    pub fn patch_like_count(&mut self, id: Id<CommentMarker>, like_count: u32) -> bool {
        match self.find_mut(id) {
            Some(comment) => {
                comment.like_count = like_count;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn max_depth(&self) -> Option<u32> {
        self.iter().map(|comment| comment.depth).max()
    }

    /// Checks that depth strictly increases from every comment to its replies.
    pub fn validate_depths(&self) -> Result<(), DepthViolation> {
        self.iter().try_for_each(|parent| {
            parent.replies.iter().try_for_each(|reply| {
                if reply.depth > parent.depth {
                    Ok(())
                } else {
                    Err(DepthViolation {
                        id: reply.id,
                        depth: reply.depth,
                        parent_depth: parent.depth,
                    })
                }
            })
        })
    }
}

impl From<Vec<Comment>> for CommentTree {
    fn from(roots: Vec<Comment>) -> Self {
        Self::new(roots)
    }
}

impl<'a> IntoIterator for &'a CommentTree {
    type Item = &'a Comment;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a> {
    stack: Vec<std::slice::Iter<'a, Comment>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Comment;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let level = self.stack.last_mut()?;
            if let Some(comment) = level.next() {
                self.stack.push(comment.replies.iter());
                return Some(comment);
            }
            self.stack.pop();
        }
    }
}

fn attach_replies(
    comment: &mut Comment,
    children: &mut HashMap<Option<Id<CommentMarker>>, Vec<Comment>>,
) {
    if let Some(mut replies) = children.remove(&Some(comment.id)) {
        for reply in &mut replies {
            attach_replies(reply, children);
        }
        comment.replies = replies;
    }
}

fn find_in(comments: &mut [Comment], id: Id<CommentMarker>) -> Option<&mut Comment> {
    for comment in comments {
        if comment.id == id {
            return Some(comment);
        }
        if let Some(found) = find_in(&mut comment.replies, id) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use crate::{
        model::{Id, comment::Comment, content::Content, user::UserName},
        tree::{CommentTree, DepthViolation},
    };
    use time::macros::datetime;

    fn comment(id: u64, parent: Option<u64>, depth: u32, replies: Vec<Comment>) -> Comment {
        Comment {
            id: Id::new(id),
            post: Id::new(1),
            parent: parent.map(Id::new),
            author: UserName::new(format!("user{id}")).unwrap(),
            content: Content::new(format!("comment {id}")).unwrap(),
            like_count: 0,
            created_at: datetime!(2025-06-01 12:00 UTC),
            depth,
            replies,
        }
    }

    // 1
    // ├── 2
    // │   └── 3
    // └── 4
    // 5
    fn sample() -> CommentTree {
        CommentTree::new(vec![
            comment(
                1,
                None,
                0,
                vec![
                    comment(2, Some(1), 1, vec![comment(3, Some(2), 2, vec![])]),
                    comment(4, Some(1), 1, vec![]),
                ],
            ),
            comment(5, None, 0, vec![]),
        ])
    }

    #[test]
    fn iterates_depth_first() {
        let tree = sample();
        let order: Vec<u64> = tree.iter().map(|c| c.id.get()).collect();

        assert_eq!(order, [1, 2, 3, 4, 5]);
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.max_depth(), Some(2));
        assert!(CommentTree::default().max_depth().is_none());
    }

    #[test]
    fn patches_only_the_matching_comment() {
        let mut tree = sample();

        assert!(tree.patch_like_count(Id::new(3), 7));
        assert!(!tree.patch_like_count(Id::new(99), 7));

        for comment in &tree {
            let expected = if comment.id.get() == 3 { 7 } else { 0 };
            assert_eq!(comment.like_count, expected, "comment {}", comment.id);
        }
    }

    #[test]
    fn detects_non_increasing_depth() {
        assert_eq!(sample().validate_depths(), Ok(()));

        let broken = CommentTree::new(vec![comment(
            1,
            None,
            1,
            vec![comment(2, Some(1), 1, vec![])],
        )]);
        assert_eq!(
            broken.validate_depths(),
            Err(DepthViolation {
                id: Id::new(2),
                depth: 1,
                parent_depth: 1,
            })
        );
    }

    #[test]
    fn assembles_flat_list_like_nested_one() {
        let flat = vec![
            comment(1, None, 0, vec![]),
            comment(2, Some(1), 1, vec![]),
            comment(3, Some(2), 2, vec![]),
            comment(4, Some(1), 1, vec![]),
            comment(5, None, 0, vec![]),
            comment(6, Some(404), 1, vec![]),
        ];

        assert_eq!(CommentTree::from_flat(flat), sample());
    }
}
