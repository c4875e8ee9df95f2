//! Client-side state of the community feed and the handlers that mutate it.
//!
//! Every handler talks to the API through [`ApiClient`] and then reconciles
//! local state. Likes and unlikes are patched in place from the count the
//! backend reports. Adding a comment or reply rebuilds the affected comment
//! tree and the post list from the server.
//!
//! Responses are applied in the order they resolve. Two overlapping likes on
//! the same post leave whichever count arrived last, which may be the older
//! one.

pub mod comment_view;
pub mod leaderboard;
pub mod post_view;

use crate::{
    feed::post_view::PostView,
    session::{Session, SessionStore},
};
use playto_client::{ApiClient, ApiError};
use playto_common::model::{
    Id,
    comment::CommentMarker,
    content::Content,
    post::{CreatePost, Post, PostMarker},
};
use std::collections::BTreeMap;
use tracing::{debug, error, info};

pub const CREATE_POST_FAILED: &str = "Failed to create post. Please try again.";

/// What a handler did, from the user's point of view.
#[must_use]
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Outcome {
    /// The request went through and local state has been reconciled.
    Applied,
    /// Rejected locally, nothing was sent.
    Ignored,
    /// The request failed. The failure was logged and is not shown.
    Failed,
    /// The request failed and the user must be told.
    Alert(String),
}

impl Outcome {
    /// Alerts for backend rejections that carry a message, logged-only
    /// failures for everything else.
    fn from_rejection(err: &ApiError) -> Self {
        err.rejection()
            .map_or(Outcome::Failed, |message| Outcome::Alert(message.to_owned()))
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum LoadState {
    Loading,
    Ready,
}

/// A text form that can be opened, typed into and submitted.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct Draft {
    open: bool,
    text: String,
}

impl Draft {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Closes the form and throws the text away.
    pub fn cancel(&mut self) {
        self.open = false;
        self.text.clear();
    }

    /// The text as content, if it is not blank. The draft is left untouched.
    #[must_use]
    pub fn content(&self) -> Option<Content> {
        Content::new(self.text.as_str()).ok()
    }
}

/// Root of the feed: the post list, the session and the per-post views.
#[derive(Debug)]
pub struct Feed {
    client: ApiClient,
    store: SessionStore,
    session: Option<Session>,
    load_state: LoadState,
    posts: Vec<Post>,
    compose: Draft,
    views: BTreeMap<Id<PostMarker>, PostView>,
}

impl Feed {
    #[must_use]
    pub fn new(client: ApiClient, store: SessionStore, session: Option<Session>) -> Self {
        Self {
            client,
            store,
            session,
            load_state: LoadState::Loading,
            posts: Vec::new(),
            compose: Draft::default(),
            views: BTreeMap::new(),
        }
    }

    /// Restores the stored session, if any. The posts are still loading
    /// afterwards, see [`Feed::apply_posts`].
    pub async fn restore(client: ApiClient, store: SessionStore) -> Self {
        let session = store.load().await.unwrap_or_else(|err| {
            error!(%err, "Error reading stored session");
            None
        });
        if session.is_none() {
            info!("No user chosen yet");
        }

        Self::new(client, store, session)
    }

    /// While no user is chosen, every mutation is ignored.
    #[must_use]
    pub fn needs_user(&self) -> bool {
        self.session.is_none()
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    #[must_use]
    pub fn post(&self, post_id: Id<PostMarker>) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == post_id)
    }

    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    #[must_use]
    pub fn compose(&self) -> &Draft {
        &self.compose
    }

    pub fn compose_mut(&mut self) -> &mut Draft {
        &mut self.compose
    }

    #[must_use]
    pub fn view(&self, post_id: Id<PostMarker>) -> Option<&PostView> {
        self.views.get(&post_id)
    }

    pub fn view_mut(&mut self, post_id: Id<PostMarker>) -> &mut PostView {
        self.views.entry(post_id).or_default()
    }

    /// Replaces the whole post list. Failures are logged and leave the
    /// previous list in place.
    pub async fn fetch_posts(&mut self) {
        self.load_state = LoadState::Loading;
        let result = self.client.fetch_posts().await;
        self.apply_posts(result);
    }

    /// Takes in the result of a post list request made elsewhere, e.g. while
    /// the user prompt is shown.
    pub fn apply_posts(&mut self, result: playto_client::Result<Vec<Post>>) {
        match result {
            Ok(posts) => {
                debug!(count = posts.len(), "Fetched posts");
                self.posts = posts;
            }
            Err(err) => error!(%err, "Error fetching posts"),
        }
        self.load_state = LoadState::Ready;
    }

    pub async fn set_user(&mut self, name: &str) -> Outcome {
        let session = match Session::parse(name) {
            Ok(session) => session,
            Err(err) => {
                debug!(%err, "Rejected user name");
                return Outcome::Ignored;
            }
        };

        if let Err(err) = self.store.save(&session).await {
            error!(%err, "Error storing session");
        }
        info!(user = %session.user(), "User chosen");
        self.session = Some(session);
        Outcome::Applied
    }

    /// Publishes the compose draft.
    pub async fn submit_post(&mut self) -> Outcome {
        let Some(session) = self.session.as_ref() else {
            return gated("create post");
        };
        let Some(content) = self.compose.content() else {
            return Outcome::Ignored;
        };

        let create = CreatePost {
            author: session.user().clone(),
            content,
        };
        match self.client.create_post(&create).await {
            Ok(post) => {
                debug!(post_id = %post.id, "Created post");
                self.compose.cancel();
                self.fetch_posts().await;
                Outcome::Applied
            }
            Err(err) => {
                error!(%err, "Error creating post");
                Outcome::Alert(CREATE_POST_FAILED.to_owned())
            }
        }
    }

    pub async fn like_post(&mut self, post_id: Id<PostMarker>) -> Outcome {
        let Some(session) = self.session.as_ref() else {
            return gated("like post");
        };

        match self.client.like_post(post_id, session.user()).await {
            Ok(like_count) => {
                self.patch_like_count(post_id, like_count);
                Outcome::Applied
            }
            Err(err) => {
                error!(%err, %post_id, "Error liking post");
                Outcome::from_rejection(&err)
            }
        }
    }

    pub async fn unlike_post(&mut self, post_id: Id<PostMarker>) -> Outcome {
        let Some(session) = self.session.as_ref() else {
            return gated("unlike post");
        };

        match self.client.unlike_post(post_id, session.user()).await {
            Ok(Some(like_count)) => {
                self.patch_like_count(post_id, like_count);
                Outcome::Applied
            }
            Ok(None) => {
                self.fetch_posts().await;
                Outcome::Applied
            }
            Err(err) => {
                error!(%err, %post_id, "Error unliking post");
                Outcome::Failed
            }
        }
    }

    pub async fn toggle_comments(&mut self, post_id: Id<PostMarker>) -> Outcome {
        let view = self.views.entry(post_id).or_default();
        view.toggle_comments(&self.client, post_id).await
    }

    /// Publishes the post view's comment draft, then refreshes the post list
    /// so comment counts follow.
    pub async fn submit_comment(&mut self, post_id: Id<PostMarker>) -> Outcome {
        let Some(session) = self.session.as_ref() else {
            return gated("add comment");
        };

        let view = self.views.entry(post_id).or_default();
        let outcome = view.add_comment(&self.client, post_id, session).await;
        if outcome == Outcome::Applied {
            self.fetch_posts().await;
        }
        outcome
    }

    /// Publishes the reply draft of `parent_id`, then refreshes the post list.
    pub async fn submit_reply(
        &mut self,
        post_id: Id<PostMarker>,
        parent_id: Id<CommentMarker>,
    ) -> Outcome {
        let Some(session) = self.session.as_ref() else {
            return gated("reply");
        };

        let view = self.views.entry(post_id).or_default();
        let outcome = view
            .submit_reply(&self.client, post_id, session, parent_id)
            .await;
        if outcome == Outcome::Applied {
            self.fetch_posts().await;
        }
        outcome
    }

    pub async fn like_comment(
        &mut self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
    ) -> Outcome {
        let Some(session) = self.session.as_ref() else {
            return gated("like comment");
        };

        let view = self.views.entry(post_id).or_default();
        view.like_comment(&self.client, session, comment_id).await
    }

    pub async fn unlike_comment(
        &mut self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
    ) -> Outcome {
        let Some(session) = self.session.as_ref() else {
            return gated("unlike comment");
        };

        let view = self.views.entry(post_id).or_default();
        view.unlike_comment(&self.client, post_id, session, comment_id)
            .await
    }

    fn patch_like_count(&mut self, post_id: Id<PostMarker>, like_count: u32) {
        if let Some(post) = self.posts.iter_mut().find(|post| post.id == post_id) {
            post.like_count = like_count;
        }
    }
}

fn gated(action: &str) -> Outcome {
    debug!(action, "Ignoring action until a user is chosen");
    Outcome::Ignored
}

#[cfg(test)]
mod tests {
    use crate::{
        feed::{CREATE_POST_FAILED, Draft, Feed, LoadState, Outcome},
        session::{Session, SessionStore},
    };
    use playto_client::{ApiClient, fake::FakeApi};
    use playto_common::model::user::UserName;
    use tempfile::TempDir;

    struct Harness {
        fake: FakeApi,
        feed: Feed,
        _dir: TempDir,
    }

    async fn harness(user: Option<&str>) -> Harness {
        let fake = FakeApi::start().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        if let Some(user) = user {
            let session = Session::new(UserName::new(user.to_owned()).unwrap());
            store.save(&session).await.unwrap();
        }
        let client = ApiClient::new(fake.base_url(), None).unwrap();
        let feed = Feed::new(client, store, None);

        Harness {
            fake,
            feed,
            _dir: dir,
        }
    }

    async fn started(user: Option<&str>) -> Harness {
        let Harness { fake, feed, _dir } = harness(user).await;
        let (client, store) = (feed.client, feed.store);
        let mut feed = Feed::restore(client, store).await;
        feed.fetch_posts().await;
        Harness { fake, feed, _dir }
    }

    #[test]
    fn draft_content_must_not_be_blank() {
        let mut draft = Draft::default();
        draft.open();
        draft.set_text("   ");
        assert!(draft.content().is_none());

        draft.set_text("hello");
        assert_eq!(draft.content().unwrap().get(), "hello");

        draft.cancel();
        assert!(!draft.is_open());
        assert_eq!(draft.text(), "");
    }

    #[tokio::test]
    async fn first_load_without_user_still_fetches_posts() {
        let h = harness(None).await;
        h.fake.seed_post("alice", "hello").await;
        let Harness { fake, feed, _dir } = h;
        let mut feed = Feed::restore(feed.client, feed.store).await;
        assert!(feed.needs_user());
        assert_eq!(feed.load_state(), LoadState::Loading);

        feed.fetch_posts().await;
        assert!(feed.needs_user());
        assert_eq!(feed.load_state(), LoadState::Ready);
        assert_eq!(feed.posts().len(), 1);
        assert_eq!(fake.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn stored_user_is_restored() {
        let h = started(Some("alice")).await;

        assert!(!h.feed.needs_user());
        assert_eq!(h.feed.session().unwrap().user().get(), "alice");
    }

    #[tokio::test]
    async fn blank_user_name_keeps_prompt_open() {
        let mut h = started(None).await;

        assert_eq!(h.feed.set_user("   ").await, Outcome::Ignored);
        assert!(h.feed.needs_user());

        assert_eq!(h.feed.set_user("bob").await, Outcome::Applied);
        assert!(!h.feed.needs_user());

        let restored = Feed::restore(h.feed.client.clone(), h.feed.store.clone()).await;
        assert_eq!(restored.session().unwrap().user().get(), "bob");
    }

    #[tokio::test]
    async fn mutations_wait_for_a_user() {
        let mut h = started(None).await;
        let post = h.fake.seed_post("alice", "hello").await;
        h.fake.clear_requests().await;

        assert_eq!(h.feed.like_post(post.id).await, Outcome::Ignored);
        h.feed.compose_mut().set_text("hi");
        assert_eq!(h.feed.submit_post().await, Outcome::Ignored);
        assert!(h.fake.requests().await.is_empty());
    }

    #[tokio::test]
    async fn blank_post_sends_nothing_and_keeps_form_open() {
        let mut h = started(Some("alice")).await;
        h.fake.clear_requests().await;

        h.feed.compose_mut().open();
        h.feed.compose_mut().set_text(" \n ");

        assert_eq!(h.feed.submit_post().await, Outcome::Ignored);
        assert!(h.feed.compose().is_open());
        assert_eq!(h.feed.compose().text(), " \n ");
        assert!(h.fake.requests().await.is_empty());
    }

    #[tokio::test]
    async fn created_post_clears_form_and_refetches() {
        let mut h = started(Some("alice")).await;
        h.fake.clear_requests().await;

        h.feed.compose_mut().open();
        h.feed.compose_mut().set_text("hello world");

        assert_eq!(h.feed.submit_post().await, Outcome::Applied);
        assert!(!h.feed.compose().is_open());
        assert_eq!(h.feed.compose().text(), "");
        assert_eq!(h.feed.posts().len(), 1);
        assert_eq!(h.feed.posts()[0].content.get(), "hello world");

        let calls: Vec<_> = h
            .fake
            .requests()
            .await
            .into_iter()
            .map(|request| (request.method.to_string(), request.path))
            .collect();
        assert_eq!(
            calls,
            [
                ("POST".to_owned(), "/api/posts/".to_owned()),
                ("GET".to_owned(), "/api/posts/".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn failed_post_creation_alerts() {
        let mut h = started(Some("alice")).await;
        h.fake.set_unavailable(true).await;

        h.feed.compose_mut().open();
        h.feed.compose_mut().set_text("hello");

        assert_eq!(
            h.feed.submit_post().await,
            Outcome::Alert(CREATE_POST_FAILED.to_owned())
        );
        assert!(h.feed.compose().is_open());
        assert_eq!(h.feed.compose().text(), "hello");
    }

    #[tokio::test]
    async fn like_patches_only_the_liked_post() {
        let mut h = started(Some("bob")).await;
        let other = h.fake.seed_post("carol", "other").await;
        let liked = h.fake.seed_post("alice", "liked").await;
        h.fake.set_post_like_count(other.id, 3).await;
        h.fake.set_post_like_count(liked.id, 6).await;
        h.feed.fetch_posts().await;
        h.fake.clear_requests().await;

        assert_eq!(h.feed.like_post(liked.id).await, Outcome::Applied);

        assert_eq!(h.feed.post(liked.id).unwrap().like_count, 7);
        assert_eq!(h.feed.post(other.id).unwrap().like_count, 3);
        assert_eq!(h.fake.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_like_alerts_with_backend_message() {
        let mut h = started(Some("bob")).await;
        let post = h.fake.seed_post("alice", "hello").await;
        h.feed.fetch_posts().await;

        assert_eq!(h.feed.like_post(post.id).await, Outcome::Applied);
        assert_eq!(
            h.feed.like_post(post.id).await,
            Outcome::Alert("You have already liked this post".to_owned())
        );
        assert_eq!(h.feed.post(post.id).unwrap().like_count, 1);
    }

    #[tokio::test]
    async fn transport_failure_on_like_is_only_logged() {
        let mut h = started(Some("bob")).await;
        let post = h.fake.seed_post("alice", "hello").await;
        h.fake.set_unavailable(true).await;

        assert_eq!(h.feed.like_post(post.id).await, Outcome::Failed);
        assert_eq!(h.feed.unlike_post(post.id).await, Outcome::Failed);
    }

    #[tokio::test]
    async fn unlike_patches_from_reported_count() {
        let mut h = started(Some("bob")).await;
        let post = h.fake.seed_post("alice", "hello").await;
        h.feed.fetch_posts().await;
        assert_eq!(h.feed.like_post(post.id).await, Outcome::Applied);
        h.fake.clear_requests().await;

        assert_eq!(h.feed.unlike_post(post.id).await, Outcome::Applied);

        assert_eq!(h.feed.post(post.id).unwrap().like_count, 0);
        assert_eq!(h.fake.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn failed_refetch_keeps_stale_posts() {
        let mut h = started(Some("bob")).await;
        h.fake.seed_post("alice", "hello").await;
        h.feed.fetch_posts().await;
        h.fake.set_unavailable(true).await;

        h.feed.fetch_posts().await;

        assert_eq!(h.feed.load_state(), LoadState::Ready);
        assert_eq!(h.feed.posts().len(), 1);
    }

    #[tokio::test]
    async fn comment_refreshes_post_counts() {
        let mut h = started(Some("bob")).await;
        let post = h.fake.seed_post("alice", "hello").await;
        h.feed.fetch_posts().await;

        h.feed.view_mut(post.id).composer_mut().set_text("nice");
        assert_eq!(h.feed.submit_comment(post.id).await, Outcome::Applied);

        assert_eq!(h.feed.post(post.id).unwrap().comment_count, 1);
        assert_eq!(h.feed.view(post.id).unwrap().comments().len(), 1);
    }
}
