use crate::{
    feed::{Draft, Outcome, comment_view::CommentView},
    session::Session,
};
use playto_client::ApiClient;
use playto_common::{
    model::{
        Id,
        comment::{CommentMarker, CreateComment},
        content::Content,
        post::PostMarker,
    },
    tree::CommentTree,
};
use std::collections::HashMap;
use tracing::{debug, error, warn};

/// Comment section of a single post.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct PostView {
    expanded: bool,
    fetched: bool,
    comments: CommentTree,
    composer: Draft,
    comment_views: HashMap<Id<CommentMarker>, CommentView>,
}

impl PostView {
    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    #[must_use]
    pub fn comments(&self) -> &CommentTree {
        &self.comments
    }

    #[must_use]
    pub fn composer(&self) -> &Draft {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Draft {
        &mut self.composer
    }

    #[must_use]
    pub fn comment_view(&self, comment_id: Id<CommentMarker>) -> Option<&CommentView> {
        self.comment_views.get(&comment_id)
    }

    #[must_use]
    pub fn comment_views(&self) -> &HashMap<Id<CommentMarker>, CommentView> {
        &self.comment_views
    }

    pub fn comment_view_mut(&mut self, comment_id: Id<CommentMarker>) -> &mut CommentView {
        self.comment_views.entry(comment_id).or_default()
    }

    /// Expands or collapses the comments. Only the first expansion loads them.
    pub async fn toggle_comments(
        &mut self,
        client: &ApiClient,
        post_id: Id<PostMarker>,
    ) -> Outcome {
        self.expanded = !self.expanded;
        if !self.expanded || self.fetched {
            return Outcome::Applied;
        }

        if self.refresh(client, post_id).await {
            Outcome::Applied
        } else {
            self.expanded = false;
            Outcome::Failed
        }
    }

    /// Publishes the top-level comment draft.
    pub async fn add_comment(
        &mut self,
        client: &ApiClient,
        post_id: Id<PostMarker>,
        session: &Session,
    ) -> Outcome {
        let Some(content) = self.composer.content() else {
            return Outcome::Ignored;
        };

        let outcome = self.create(client, post_id, session, None, content).await;
        if outcome == Outcome::Applied {
            self.composer.cancel();
        }
        outcome
    }

    /// Creates a reply below `parent_id` and reloads the tree.
    pub async fn reply(
        &mut self,
        client: &ApiClient,
        post_id: Id<PostMarker>,
        session: &Session,
        parent_id: Id<CommentMarker>,
        content: Content,
    ) -> Outcome {
        self.create(client, post_id, session, Some(parent_id), content)
            .await
    }

    /// Sends the reply draft of `parent_id`. The draft is cleared and closed
    /// once the request completes, whether it succeeded or not.
    pub async fn submit_reply(
        &mut self,
        client: &ApiClient,
        post_id: Id<PostMarker>,
        session: &Session,
        parent_id: Id<CommentMarker>,
    ) -> Outcome {
        let Some(content) = self
            .comment_views
            .get(&parent_id)
            .and_then(CommentView::reply_content)
        else {
            return Outcome::Ignored;
        };

        let outcome = self
            .reply(client, post_id, session, parent_id, content)
            .await;
        self.comment_view_mut(parent_id).reply_mut().cancel();
        outcome
    }

    pub async fn like_comment(
        &mut self,
        client: &ApiClient,
        session: &Session,
        comment_id: Id<CommentMarker>,
    ) -> Outcome {
        match client.like_comment(comment_id, session.user()).await {
            Ok(like_count) => {
                self.patch_like_count(comment_id, like_count);
                Outcome::Applied
            }
            Err(err) => {
                error!(%err, %comment_id, "Error liking comment");
                Outcome::from_rejection(&err)
            }
        }
    }

    pub async fn unlike_comment(
        &mut self,
        client: &ApiClient,
        post_id: Id<PostMarker>,
        session: &Session,
        comment_id: Id<CommentMarker>,
    ) -> Outcome {
        match client.unlike_comment(comment_id, session.user()).await {
            Ok(Some(like_count)) => {
                self.patch_like_count(comment_id, like_count);
                Outcome::Applied
            }
            Ok(None) => {
                self.refresh(client, post_id).await;
                Outcome::Applied
            }
            Err(err) => {
                error!(%err, %comment_id, "Error unliking comment");
                Outcome::Failed
            }
        }
    }

    async fn create(
        &mut self,
        client: &ApiClient,
        post_id: Id<PostMarker>,
        session: &Session,
        parent: Option<Id<CommentMarker>>,
        content: Content,
    ) -> Outcome {
        let create = CreateComment {
            post: post_id,
            author: session.user().clone(),
            content,
            parent,
        };

        match client.create_comment(&create).await {
            Ok(comment) => {
                debug!(comment_id = %comment.id, %post_id, "Created comment");
                self.refresh(client, post_id).await;
                Outcome::Applied
            }
            Err(err) => {
                error!(%err, %post_id, "Error creating comment");
                Outcome::Failed
            }
        }
    }

    /// Replaces the tree with the one from the post detail. Returns whether the
    /// fetch succeeded.
    async fn refresh(&mut self, client: &ApiClient, post_id: Id<PostMarker>) -> bool {
        match client.fetch_post(post_id).await {
            Ok(detail) => {
                let comments = CommentTree::new(detail.comments);
                if let Err(err) = comments.validate_depths() {
                    warn!(%err, %post_id, "Comment tree has inconsistent depths");
                }
                self.comments = comments;
                self.fetched = true;
                true
            }
            Err(err) => {
                error!(%err, %post_id, "Error fetching comments");
                false
            }
        }
    }

    fn patch_like_count(&mut self, comment_id: Id<CommentMarker>, like_count: u32) {
        if !self.comments.patch_like_count(comment_id, like_count) {
            debug!(%comment_id, "Liked comment is not loaded");
        }
    }
}
