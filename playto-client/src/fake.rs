//! In-memory stand-in for the community API, served over real HTTP on a local
//! port. Enforces one like per user and object, awards karma to authors and
//! records every request it sees.

use crate::record::{ErrorRecord, LikeCountRecord, LikeRecord, PostListRecord};
use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use playto_common::{
    model::{
        Id,
        comment::{Comment, CommentMarker, CreateComment},
        content::Content,
        leaderboard::{COMMENT_LIKE_KARMA, LeaderboardEntry, POST_LIKE_KARMA, Rank},
        post::{CreatePost, Post, PostDetail, PostMarker},
        user::UserName,
    },
    tree::CommentTree,
};
use serde::Deserialize;
use serde_json::Value;
use std::{collections::BTreeSet, net::SocketAddr, sync::Arc};
use time::OffsetDateTime;
use tokio::{net::TcpListener, sync::Mutex};
use tokio_util::sync::CancellationToken;

const LEADERBOARD_SIZE: usize = 5;

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RecordedRequest {
    pub method: Method,
    /// Path and query as sent, including the `/api` prefix.
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug)]
struct Liked<T> {
    item: T,
    likers: BTreeSet<UserName>,
}

#[derive(Debug, Default)]
struct Store {
    next_post_id: u64,
    next_comment_id: u64,
    posts: Vec<Liked<Post>>,
    comments: Vec<Liked<Comment>>,
    karma: Vec<(UserName, i64)>,
    requests: Vec<RecordedRequest>,
    paginated: bool,
    unavailable: bool,
}

type SharedStore = Arc<Mutex<Store>>;

enum FakeError {
    Rejected(&'static str),
    NotFound,
    Unavailable,
}

impl IntoResponse for FakeError {
    fn into_response(self) -> Response {
        match self {
            FakeError::Rejected(error) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorRecord {
                    error: error.to_owned(),
                }),
            )
                .into_response(),
            FakeError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"detail": "Not found."})),
            )
                .into_response(),
            FakeError::Unavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        }
    }
}

type FakeResult<T> = Result<T, FakeError>;

/// Handle to a running fake. The server stops when the handle is dropped.
pub struct FakeApi {
    store: SharedStore,
    base_url: String,
    shutdown: CancellationToken,
}

impl FakeApi {
    pub async fn start() -> std::io::Result<Self> {
        let store = SharedStore::default();
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let address = listener.local_addr()?;
        let shutdown = CancellationToken::new();

        let app = Router::new().nest("/api", routes()).with_state(Arc::clone(&store));
        let signal = shutdown.clone().cancelled_owned();
        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(signal)
                .await
            {
                tracing::error!(%err, "Fake API stopped");
            }
        });

        Ok(Self {
            store,
            base_url: format!("http://{address}/api"),
            shutdown,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn seed_post(&self, author: &str, content: &str) -> Post {
        let mut store = self.store.lock().await;
        store.insert_post(CreatePost {
            author: seed_name(author),
            content: seed_content(content),
        })
    }

    pub async fn seed_comment(
        &self,
        post: Id<PostMarker>,
        parent: Option<Id<CommentMarker>>,
        author: &str,
        content: &str,
    ) -> Comment {
        let mut store = self.store.lock().await;
        store
            .insert_comment(CreateComment {
                post,
                author: seed_name(author),
                content: seed_content(content),
                parent,
            })
            .unwrap_or_else(|_| panic!("Cannot seed comment on unknown post {post}"))
    }

    /// Overwrites a post's like count without touching likers or karma.
    pub async fn set_post_like_count(&self, post: Id<PostMarker>, like_count: u32) {
        let mut store = self.store.lock().await;
        if let Some(liked) = store.post_mut(post) {
            liked.item.like_count = like_count;
        }
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.store.lock().await.requests.clone()
    }

    pub async fn clear_requests(&self) {
        self.store.lock().await.requests.clear();
    }

    /// Serve `GET /posts/` wrapped in a `{results}` envelope.
    pub async fn set_paginated(&self, paginated: bool) {
        self.store.lock().await.paginated = paginated;
    }

    /// Answer every request with 503 while set.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.store.lock().await.unavailable = unavailable;
    }
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn seed_name(name: &str) -> UserName {
    UserName::new(name.to_owned()).unwrap_or_else(|err| panic!("{err}"))
}

fn seed_content(content: &str) -> Content {
    Content::new(content).unwrap_or_else(|err| panic!("{err}"))
}

impl Store {
    fn record(
        &mut self,
        method: Method,
        uri: &OriginalUri,
        body: Option<Value>,
    ) -> FakeResult<()> {
        let path = uri
            .path_and_query()
            .map_or_else(|| uri.path().to_owned(), ToString::to_string);
        self.requests.push(RecordedRequest { method, path, body });

        if self.unavailable {
            Err(FakeError::Unavailable)
        } else {
            Ok(())
        }
    }

    fn post_mut(&mut self, id: Id<PostMarker>) -> Option<&mut Liked<Post>> {
        self.posts.iter_mut().find(|liked| liked.item.id == id)
    }

    fn comment_mut(&mut self, id: Id<CommentMarker>) -> Option<&mut Liked<Comment>> {
        self.comments.iter_mut().find(|liked| liked.item.id == id)
    }

    fn insert_post(&mut self, create: CreatePost) -> Post {
        self.next_post_id += 1;
        let post = Post {
            id: self.next_post_id.into(),
            author: create.author,
            content: create.content,
            like_count: 0,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
            comment_count: 0,
        };
        self.posts.push(Liked {
            item: post.clone(),
            likers: BTreeSet::new(),
        });
        post
    }

    fn insert_comment(&mut self, create: CreateComment) -> FakeResult<Comment> {
        if !self.posts.iter().any(|liked| liked.item.id == create.post) {
            return Err(FakeError::Rejected("Invalid post"));
        }
        let depth = match create.parent {
            Some(parent) => {
                let parent = self
                    .comment_mut(parent)
                    .filter(|liked| liked.item.post == create.post)
                    .ok_or(FakeError::Rejected("Invalid parent"))?;
                parent.item.depth + 1
            }
            None => 0,
        };

        self.next_comment_id += 1;
        let comment = Comment {
            id: self.next_comment_id.into(),
            post: create.post,
            parent: create.parent,
            author: create.author,
            content: create.content,
            like_count: 0,
            created_at: OffsetDateTime::now_utc(),
            depth,
            replies: Vec::new(),
        };
        self.comments.push(Liked {
            item: comment.clone(),
            likers: BTreeSet::new(),
        });
        if let Some(post) = self.post_mut(create.post) {
            post.item.comment_count += 1;
        }
        Ok(comment)
    }

    fn award(&mut self, user: &UserName, points: i64) {
        match self.karma.iter_mut().find(|(name, _)| name == user) {
            Some((_, karma)) => *karma += points,
            None => self.karma.push((user.clone(), points)),
        }
    }

    fn comments_of(&self, post: Id<PostMarker>) -> Vec<Comment> {
        self.comments
            .iter()
            .filter(|liked| liked.item.post == post)
            .map(|liked| liked.item.clone())
            .collect()
    }
}

fn routes() -> Router<SharedStore> {
    Router::new()
        .route("/posts/", get(list_posts).post(create_post))
        .route("/posts/{id}/", get(get_post))
        .route("/posts/{id}/like/", post(like_post))
        .route("/posts/{id}/unlike/", post(unlike_post))
        .route("/comments/", get(list_comments).post(create_comment))
        .route("/comments/{id}/like/", post(like_comment))
        .route("/comments/{id}/unlike/", post(unlike_comment))
        .route("/leaderboard/", get(leaderboard))
}

async fn list_posts(
    State(store): State<SharedStore>,
    uri: OriginalUri,
) -> FakeResult<Json<PostListRecord>> {
    let mut store = store.lock().await;
    store.record(Method::GET, &uri, None)?;

    let mut posts: Vec<Post> = store.posts.iter().map(|liked| liked.item.clone()).collect();
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    Ok(Json(if store.paginated {
        PostListRecord::Paginated { results: posts }
    } else {
        PostListRecord::Plain(posts)
    }))
}

async fn create_post(
    State(store): State<SharedStore>,
    uri: OriginalUri,
    Json(create): Json<CreatePost>,
) -> FakeResult<(StatusCode, Json<Post>)> {
    let mut store = store.lock().await;
    store.record(Method::POST, &uri, serde_json::to_value(&create).ok())?;

    Ok((StatusCode::CREATED, Json(store.insert_post(create))))
}

async fn get_post(
    State(store): State<SharedStore>,
    uri: OriginalUri,
    Path(id): Path<Id<PostMarker>>,
) -> FakeResult<Json<PostDetail>> {
    let mut store = store.lock().await;
    store.record(Method::GET, &uri, None)?;

    let post = store.post_mut(id).ok_or(FakeError::NotFound)?.item.clone();
    let comments = CommentTree::from_flat(store.comments_of(id)).into_roots();
    Ok(Json(PostDetail { post, comments }))
}

async fn like_post(
    State(store): State<SharedStore>,
    uri: OriginalUri,
    Path(id): Path<Id<PostMarker>>,
    Json(like): Json<LikeRecord>,
) -> FakeResult<(StatusCode, Json<LikeCountRecord>)> {
    let mut store = store.lock().await;
    store.record(Method::POST, &uri, serde_json::to_value(&like).ok())?;

    let post = store.post_mut(id).ok_or(FakeError::NotFound)?;
    if !post.likers.insert(like.user) {
        return Err(FakeError::Rejected("You have already liked this post"));
    }
    post.item.like_count += 1;
    let (author, like_count) = (post.item.author.clone(), post.item.like_count);
    store.award(&author, POST_LIKE_KARMA);

    Ok((
        StatusCode::CREATED,
        Json(LikeCountRecord {
            like_count: Some(like_count),
        }),
    ))
}

async fn unlike_post(
    State(store): State<SharedStore>,
    uri: OriginalUri,
    Path(id): Path<Id<PostMarker>>,
    Json(like): Json<LikeRecord>,
) -> FakeResult<Json<LikeCountRecord>> {
    let mut store = store.lock().await;
    store.record(Method::POST, &uri, serde_json::to_value(&like).ok())?;

    let post = store.post_mut(id).ok_or(FakeError::NotFound)?;
    if !post.likers.remove(&like.user) {
        return Err(FakeError::Rejected("You have not liked this post"));
    }
    post.item.like_count = post.item.like_count.saturating_sub(1);
    let (author, like_count) = (post.item.author.clone(), post.item.like_count);
    store.award(&author, -POST_LIKE_KARMA);

    Ok(Json(LikeCountRecord {
        like_count: Some(like_count),
    }))
}

#[derive(Deserialize)]
struct CommentQuery {
    post: Option<Id<PostMarker>>,
}

async fn list_comments(
    State(store): State<SharedStore>,
    uri: OriginalUri,
    Query(query): Query<CommentQuery>,
) -> FakeResult<Json<Vec<Comment>>> {
    let mut store = store.lock().await;
    store.record(Method::GET, &uri, None)?;

    let comments = match query.post {
        Some(post) => store.comments_of(post),
        None => store.comments.iter().map(|liked| liked.item.clone()).collect(),
    };
    Ok(Json(comments))
}

async fn create_comment(
    State(store): State<SharedStore>,
    uri: OriginalUri,
    Json(create): Json<CreateComment>,
) -> FakeResult<(StatusCode, Json<Comment>)> {
    let mut store = store.lock().await;
    store.record(Method::POST, &uri, serde_json::to_value(&create).ok())?;

    Ok((StatusCode::CREATED, Json(store.insert_comment(create)?)))
}

async fn like_comment(
    State(store): State<SharedStore>,
    uri: OriginalUri,
    Path(id): Path<Id<CommentMarker>>,
    Json(like): Json<LikeRecord>,
) -> FakeResult<(StatusCode, Json<LikeCountRecord>)> {
    let mut store = store.lock().await;
    store.record(Method::POST, &uri, serde_json::to_value(&like).ok())?;

    let comment = store.comment_mut(id).ok_or(FakeError::NotFound)?;
    if !comment.likers.insert(like.user) {
        return Err(FakeError::Rejected("You have already liked this comment"));
    }
    comment.item.like_count += 1;
    let (author, like_count) = (comment.item.author.clone(), comment.item.like_count);
    store.award(&author, COMMENT_LIKE_KARMA);

    Ok((
        StatusCode::CREATED,
        Json(LikeCountRecord {
            like_count: Some(like_count),
        }),
    ))
}

async fn unlike_comment(
    State(store): State<SharedStore>,
    uri: OriginalUri,
    Path(id): Path<Id<CommentMarker>>,
    Json(like): Json<LikeRecord>,
) -> FakeResult<Json<LikeCountRecord>> {
    let mut store = store.lock().await;
    store.record(Method::POST, &uri, serde_json::to_value(&like).ok())?;

    let comment = store.comment_mut(id).ok_or(FakeError::NotFound)?;
    if !comment.likers.remove(&like.user) {
        return Err(FakeError::Rejected("You have not liked this comment"));
    }
    comment.item.like_count = comment.item.like_count.saturating_sub(1);
    let (author, like_count) = (comment.item.author.clone(), comment.item.like_count);
    store.award(&author, -COMMENT_LIKE_KARMA);

    Ok(Json(LikeCountRecord {
        like_count: Some(like_count),
    }))
}

async fn leaderboard(
    State(store): State<SharedStore>,
    uri: OriginalUri,
) -> FakeResult<Json<Vec<LeaderboardEntry>>> {
    let mut store = store.lock().await;
    store.record(Method::GET, &uri, None)?;

    let mut totals = store.karma.clone();
    totals.sort_by(|(_, a), (_, b)| b.cmp(a));

    let entries = (1..)
        .filter_map(Rank::new)
        .zip(totals.into_iter().take(LEADERBOARD_SIZE))
        .map(|(rank, (user, karma))| LeaderboardEntry { rank, user, karma })
        .collect();
    Ok(Json(entries))
}
