//! Plain-text rendering of the feed and the leaderboard.

use crate::feed::{
    Feed, LoadState, comment_view::write_thread, leaderboard::Snapshot, post_view::PostView,
};
use playto_common::model::{
    leaderboard::{COMMENT_LIKE_KARMA, POST_LIKE_KARMA},
    post::Post,
};
use std::fmt::{self, Display, Formatter};

pub const WELCOME: &str = "Welcome to Playto! Enter your username to get started:";

/// The post list, with the compose form and every expanded comment section.
pub struct FeedDisplay<'a>(pub &'a Feed);

impl Display for FeedDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let feed = self.0;

        write!(f, "== Playto Community ==")?;
        match feed.session() {
            Some(session) => writeln!(
                f,
                " ({}) {}",
                session.user().initial(),
                session.user()
            )?,
            None => writeln!(f)?,
        }

        let compose = feed.compose();
        if compose.is_open() {
            writeln!(f, "new post> {}", compose.text())?;
        }

        if feed.load_state() == LoadState::Loading {
            return writeln!(f, "Loading posts...");
        }
        if feed.posts().is_empty() {
            return writeln!(
                f,
                "No posts yet. Be the first to share something with the community!"
            );
        }

        for post in feed.posts() {
            writeln!(f)?;
            write_post(f, post, feed.view(post.id))?;
        }
        Ok(())
    }
}

fn write_post(f: &mut Formatter<'_>, post: &Post, view: Option<&PostView>) -> fmt::Result {
    writeln!(
        f,
        "#{} ({}) {} on {}",
        post.id,
        post.author.initial(),
        post.author,
        post.created_at.date(),
    )?;
    for line in post.content.get().lines() {
        writeln!(f, "  {line}")?;
    }
    writeln!(
        f,
        "  {} likes | {} comments",
        post.like_count, post.comment_count
    )?;

    let Some(view) = view else {
        return Ok(());
    };
    if view.composer().is_open() {
        writeln!(f, "  comment> {}", view.composer().text())?;
    }
    if !view.is_expanded() {
        return Ok(());
    }

    writeln!(f, "  --")?;
    if view.comments().is_empty() {
        return writeln!(f, "  No comments yet.");
    }
    view.comments()
        .roots()
        .iter()
        .try_for_each(|comment| write_thread(f, comment, view.comment_views()))
}

/// The ranked list, a medal per rank, and how karma is earned.
pub struct LeaderboardDisplay<'a>(pub &'a Snapshot);

impl Display for LeaderboardDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let snapshot = self.0;

        writeln!(f, "== Top Users (last 24 hours) ==")?;
        if snapshot.loading {
            writeln!(f, "Loading...")?;
        } else if snapshot.entries.is_empty() {
            writeln!(f, "No activity in the last 24 hours")?;
        }

        for entry in &snapshot.entries {
            writeln!(
                f,
                "{} #{} {} {} karma points",
                entry.rank.medal().emoji(),
                entry.rank,
                entry.user,
                entry.karma,
            )?;
        }

        writeln!(
            f,
            "Post like: +{POST_LIKE_KARMA} karma | Comment like: +{COMMENT_LIKE_KARMA} karma"
        )
    }
}
