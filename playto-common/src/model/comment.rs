use crate::model::{Id, content::Content, post::PostMarker, user::UserName};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post: Id<PostMarker>,
    #[serde(default)]
    pub parent: Option<Id<CommentMarker>>,
    pub author: UserName,
    pub content: Content,
    pub like_count: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Nesting level, zero for comments directly on the post.
    pub depth: u32,
    #[serde(default)]
    pub replies: Vec<Comment>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct CreateComment {
    pub post: Id<PostMarker>,
    pub author: UserName,
    pub content: Content,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Id<CommentMarker>>,
}
