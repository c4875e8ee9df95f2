use playto_common::model::{post::Post, user::UserName};
use serde::{Deserialize, Serialize};

/// `GET /posts/` answers either with a bare list or with a paginated envelope.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub(crate) enum PostListRecord {
    Paginated { results: Vec<Post> },
    Plain(Vec<Post>),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub(crate) struct LikeRecord {
    pub user: UserName,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub(crate) struct LikeCountRecord {
    #[serde(default)]
    pub like_count: Option<u32>,
}

/// Body of a request the backend refused for domain reasons.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub(crate) struct ErrorRecord {
    pub error: String,
}

impl From<PostListRecord> for Vec<Post> {
    fn from(value: PostListRecord) -> Self {
        match value {
            PostListRecord::Paginated { results } => results,
            PostListRecord::Plain(posts) => posts,
        }
    }
}
