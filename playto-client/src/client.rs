use crate::record::{ErrorRecord, LikeCountRecord, LikeRecord, PostListRecord};
use playto_common::model::{
    Id,
    comment::{Comment, CommentMarker, CreateComment},
    leaderboard::LeaderboardEntry,
    post::{CreatePost, Post, PostDetail, PostMarker},
    user::UserName,
};
use reqwest::{
    Client, RequestBuilder, Response, StatusCode, Url,
    header::{self, HeaderMap, HeaderValue},
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API base URL: {0:?}")]
    InvalidBaseUrl(String),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("Request was rejected ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
    #[error("Request failed with status {0}")]
    Status(StatusCode),
    #[error("The backend did not report a like count")]
    MissingLikeCount,
}

impl ApiError {
    /// The backend's own explanation, if it sent one.
    #[must_use]
    pub fn rejection(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Thin wrapper over the community REST API. Knows URLs and payload shapes,
/// nothing else.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Self::with_http_client(builder.build()?, base_url)
    }

    pub fn with_http_client(http: Client, base_url: &str) -> Result<Self> {
        let url =
            Url::parse(base_url).map_err(|_| ApiError::InvalidBaseUrl(base_url.to_owned()))?;
        if url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_owned()));
        }

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let record: PostListRecord = send(self.http.get(self.url("/posts/"))).await?;
        Ok(record.into())
    }

    pub async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        send(self.http.post(self.url("/posts/")).json(post)).await
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<PostDetail> {
        send(self.http.get(self.url(&format!("/posts/{post_id}/")))).await
    }

    /// Returns the like count after the like.
    pub async fn like_post(&self, post_id: Id<PostMarker>, user: &UserName) -> Result<u32> {
        let path = format!("/posts/{post_id}/like/");
        self.like(&path, user).await
    }

    /// Returns the like count after the unlike, when the backend reports it.
    pub async fn unlike_post(
        &self,
        post_id: Id<PostMarker>,
        user: &UserName,
    ) -> Result<Option<u32>> {
        let path = format!("/posts/{post_id}/unlike/");
        self.unlike(&path, user).await
    }

    /// Flat list of every comment on a post, replies included.
    pub async fn list_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let request = self
            .http
            .get(self.url("/comments/"))
            .query(&[("post", post_id.get())]);
        send(request).await
    }

    pub async fn create_comment(&self, comment: &CreateComment) -> Result<Comment> {
        send(self.http.post(self.url("/comments/")).json(comment)).await
    }

    pub async fn like_comment(
        &self,
        comment_id: Id<CommentMarker>,
        user: &UserName,
    ) -> Result<u32> {
        let path = format!("/comments/{comment_id}/like/");
        self.like(&path, user).await
    }

    pub async fn unlike_comment(
        &self,
        comment_id: Id<CommentMarker>,
        user: &UserName,
    ) -> Result<Option<u32>> {
        let path = format!("/comments/{comment_id}/unlike/");
        self.unlike(&path, user).await
    }

    pub async fn fetch_leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        send(self.http.get(self.url("/leaderboard/"))).await
    }

    async fn like(&self, path: &str, user: &UserName) -> Result<u32> {
        let body = LikeRecord { user: user.clone() };
        let record: LikeCountRecord = send(self.http.post(self.url(path)).json(&body)).await?;
        record.like_count.ok_or(ApiError::MissingLikeCount)
    }

    async fn unlike(&self, path: &str, user: &UserName) -> Result<Option<u32>> {
        let body = LikeRecord { user: user.clone() };
        let response = checked(self.http.post(self.url(path)).json(&body)).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }

        match serde_json::from_slice::<LikeCountRecord>(&bytes) {
            Ok(record) => Ok(record.like_count),
            Err(err) => {
                debug!(%err, path, "Unlike response carried no like count");
                Ok(None)
            }
        }
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    Ok(checked(request).await?.json().await?)
}

async fn checked(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await?;
    let status = response.status();
    debug!(url = %response.url(), %status, "API response");

    if status.is_success() {
        return Ok(response);
    }

    let bytes = response.bytes().await.unwrap_or_default();
    match serde_json::from_slice::<ErrorRecord>(&bytes) {
        Ok(ErrorRecord { error }) => Err(ApiError::Rejected {
            status,
            message: error,
        }),
        Err(_) => Err(ApiError::Status(status)),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        client::{ApiClient, ApiError},
        fake::FakeApi,
    };
    use playto_common::model::{
        Id, comment::CreateComment, content::Content, post::CreatePost, user::UserName,
    };
    use reqwest::StatusCode;
    use serde_json::json;

    fn user(name: &str) -> UserName {
        UserName::new(name.to_owned()).unwrap()
    }

    async fn setup() -> (FakeApi, ApiClient) {
        let fake = FakeApi::start().await.unwrap();
        let client = ApiClient::new(fake.base_url(), None).unwrap();
        (fake, client)
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            ApiClient::new("not a url", None),
            Err(ApiError::InvalidBaseUrl(_))
        ));
        assert_eq!(
            ApiClient::new("http://localhost:8000/api/", None)
                .unwrap()
                .base_url(),
            "http://localhost:8000/api"
        );
    }

    #[tokio::test]
    async fn creates_and_lists_posts() {
        let (fake, client) = setup().await;

        let created = client
            .create_post(&CreatePost {
                author: user("alice"),
                content: Content::new("hello").unwrap(),
            })
            .await
            .unwrap();
        let posts = client.fetch_posts().await.unwrap();

        assert_eq!(posts, [created.clone()]);
        assert_eq!(
            fake.requests().await[0].body,
            Some(json!({"author": "alice", "content": "hello"}))
        );

        fake.set_paginated(true).await;
        assert_eq!(client.fetch_posts().await.unwrap(), [created]);
    }

    #[tokio::test]
    async fn duplicate_like_is_a_rejection() {
        let (fake, client) = setup().await;
        let post = fake.seed_post("alice", "hello").await;

        assert_eq!(client.like_post(post.id, &user("bob")).await.unwrap(), 1);

        let err = client.like_post(post.id, &user("bob")).await.unwrap_err();
        assert_eq!(err.rejection(), Some("You have already liked this post"));
        assert!(matches!(
            err,
            ApiError::Rejected {
                status: StatusCode::BAD_REQUEST,
                ..
            }
        ));

        assert_eq!(
            client.unlike_post(post.id, &user("bob")).await.unwrap(),
            Some(0)
        );
    }

    #[tokio::test]
    async fn unknown_post_is_a_plain_status_error() {
        let (_fake, client) = setup().await;

        let err = client.fetch_post(Id::new(404)).await.unwrap_err();

        assert!(matches!(err, ApiError::Status(StatusCode::NOT_FOUND)));
        assert_eq!(err.rejection(), None);
    }

    #[tokio::test]
    async fn comments_come_back_nested_and_flat() {
        let (fake, client) = setup().await;
        let post = fake.seed_post("alice", "hello").await;

        let root = client
            .create_comment(&CreateComment {
                post: post.id,
                author: user("bob"),
                content: Content::new("first").unwrap(),
                parent: None,
            })
            .await
            .unwrap();
        let reply = client
            .create_comment(&CreateComment {
                post: post.id,
                author: user("carol"),
                content: Content::new("second").unwrap(),
                parent: Some(root.id),
            })
            .await
            .unwrap();

        assert_eq!(root.depth, 0);
        assert_eq!(reply.depth, 1);

        let detail = client.fetch_post(post.id).await.unwrap();
        assert_eq!(detail.post.comment_count, 2);
        assert_eq!(detail.comments.len(), 1);
        assert_eq!(detail.comments[0].replies[0].id, reply.id);

        let flat = client.list_comments(post.id).await.unwrap();
        assert_eq!(flat.len(), 2);
        assert!(
            fake.requests()
                .await
                .iter()
                .any(|request| request.path == format!("/api/comments/?post={}", post.id))
        );
    }

    #[tokio::test]
    async fn leaderboard_reflects_karma() {
        let (fake, client) = setup().await;
        let post = fake.seed_post("alice", "hello").await;
        let comment = fake.seed_comment(post.id, None, "bob", "nice").await;

        client.like_post(post.id, &user("carol")).await.unwrap();
        client.like_comment(comment.id, &user("carol")).await.unwrap();

        let leaderboard = client.fetch_leaderboard().await.unwrap();
        let summary: Vec<_> = leaderboard
            .iter()
            .map(|entry| (entry.rank.get(), entry.user.get(), entry.karma))
            .collect();

        assert_eq!(summary, [(1, "alice", 5), (2, "bob", 1)]);
    }
}
