//! The interactive loop: reads commands line by line and prints the feed.

use crate::{
    command::{Command, HELP},
    feed::{Feed, LoadState, Outcome, comment_view::write_thread, leaderboard::Leaderboard},
    render::{FeedDisplay, LeaderboardDisplay, WELCOME},
};
use playto_common::{
    model::{Id, post::PostMarker},
    tree::CommentTree,
};
use std::{collections::HashMap, fmt::Display, io};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
enum Flow {
    Continue,
    Quit,
}

/// Runs until `quit`, end of input or cancellation of `token`.
pub async fn run<R, W>(
    feed: &mut Feed,
    leaderboard: &Leaderboard,
    input: R,
    output: &mut W,
    token: CancellationToken,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    write(output, FeedDisplay(feed)).await?;
    if feed.needs_user() {
        write(output, format!("{WELCOME}\n")).await?;
    }

    // The first post list loads while the prompt is up. Commands wait for it.
    let client = feed.client().clone();
    let initial = async move { client.fetch_posts().await };
    tokio::pin!(initial);
    let mut loading = feed.load_state() == LoadState::Loading;

    loop {
        let line = tokio::select! {
            () = token.cancelled() => break,
            result = &mut initial, if loading => {
                loading = false;
                feed.apply_posts(result);
                write(output, FeedDisplay(feed)).await?;
                if feed.needs_user() {
                    write(output, format!("{WELCOME}\n")).await?;
                }
                continue;
            }
            line = lines.next_line(), if !loading || feed.needs_user() => line?,
        };
        let Some(line) = line else {
            debug!("Input closed");
            break;
        };

        if feed.needs_user() {
            choose_user(feed, output, &line).await?;
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                write(output, format!("{err}\n")).await?;
                continue;
            }
        };
        if execute(feed, leaderboard, output, command).await? == Flow::Quit {
            break;
        }
    }

    Ok(())
}

async fn choose_user<W>(feed: &mut Feed, output: &mut W, line: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match feed.set_user(line).await {
        Outcome::Applied => write(output, FeedDisplay(feed)).await,
        _ => write(output, format!("{WELCOME}\n")).await,
    }
}

async fn execute<W>(
    feed: &mut Feed,
    leaderboard: &Leaderboard,
    output: &mut W,
    command: Command,
) -> io::Result<Flow>
where
    W: AsyncWrite + Unpin,
{
    let outcome = match command {
        Command::Help => {
            write(output, format!("{HELP}\n")).await?;
            return Ok(Flow::Continue);
        }
        Command::Quit => return Ok(Flow::Quit),
        Command::Leaderboard => {
            write(output, LeaderboardDisplay(&leaderboard.snapshot())).await?;
            return Ok(Flow::Continue);
        }
        Command::Thread(post_id) => {
            write_flat_thread(feed, output, post_id).await?;
            return Ok(Flow::Continue);
        }
        Command::Posts => Outcome::Applied,
        Command::Refresh => {
            feed.fetch_posts().await;
            Outcome::Applied
        }
        Command::Post(text) => {
            let compose = feed.compose_mut();
            compose.open();
            compose.set_text(text);
            feed.submit_post().await
        }
        Command::Cancel => {
            feed.compose_mut().cancel();
            Outcome::Applied
        }
        Command::Like(post_id) => feed.like_post(post_id).await,
        Command::Unlike(post_id) => feed.unlike_post(post_id).await,
        Command::Comments(post_id) => feed.toggle_comments(post_id).await,
        Command::Comment(post_id, text) => {
            let composer = feed.view_mut(post_id).composer_mut();
            composer.open();
            composer.set_text(text);
            feed.submit_comment(post_id).await
        }
        Command::Reply(post_id, parent_id, text) => {
            let draft = feed
                .view_mut(post_id)
                .comment_view_mut(parent_id)
                .reply_mut();
            draft.open();
            draft.set_text(text);
            feed.submit_reply(post_id, parent_id).await
        }
        Command::LikeComment(post_id, comment_id) => feed.like_comment(post_id, comment_id).await,
        Command::UnlikeComment(post_id, comment_id) => {
            feed.unlike_comment(post_id, comment_id).await
        }
        Command::User(name) => feed.set_user(&name).await,
    };

    if let Outcome::Alert(message) = &outcome {
        write(output, format!("! {message}\n")).await?;
    }
    write(output, FeedDisplay(feed)).await?;
    Ok(Flow::Continue)
}

/// Shows the comments of a post as assembled from the flat comment list.
async fn write_flat_thread<W>(
    feed: &Feed,
    output: &mut W,
    post_id: Id<PostMarker>,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let comments = match feed.client().list_comments(post_id).await {
        Ok(comments) => CommentTree::from_flat(comments),
        Err(err) => {
            error!(%err, %post_id, "Error listing comments");
            return Ok(());
        }
    };
    if comments.is_empty() {
        return write(output, "No comments yet.\n").await;
    }

    let no_views = HashMap::new();
    let views = feed
        .view(post_id)
        .map_or(&no_views, |view| view.comment_views());
    let mut text = String::new();
    for comment in comments.roots() {
        if let Err(err) = write_thread(&mut text, comment, views) {
            error!(%err, "Error rendering comments");
        }
    }
    write(output, text).await
}

async fn write<W>(output: &mut W, text: impl Display) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(text.to_string().as_bytes()).await?;
    output.flush().await
}

#[cfg(test)]
mod tests {
    use crate::{
        app::run,
        feed::{Feed, LoadState, leaderboard::Leaderboard},
        render::WELCOME,
        session::SessionStore,
    };
    use playto_client::{ApiClient, fake::FakeApi};
    use playto_common::util::PositiveDuration;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    async fn run_script(fake: &FakeApi, dir: &TempDir, input: &str) -> (Feed, String) {
        let client = ApiClient::new(fake.base_url(), None).unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let mut feed = Feed::restore(client.clone(), store).await;
        let interval = PositiveDuration::from_secs(3600).unwrap();
        let mut leaderboard = Leaderboard::spawn(client, interval);

        let mut output = Vec::new();
        run(
            &mut feed,
            &leaderboard,
            input.as_bytes(),
            &mut output,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(leaderboard.stop().await);

        (feed, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn prompts_for_user_then_runs_commands() {
        let fake = FakeApi::start().await.unwrap();
        let dir = tempfile::tempdir().unwrap();

        let (feed, output) =
            run_script(&fake, &dir, "  \nbob\npost hello there\nlike 1\nquit\n").await;

        assert!(output.matches(WELCOME).count() >= 2);
        assert!(output.contains("== Playto Community == (B) bob"));
        assert!(output.contains("  hello there\n"));
        assert!(output.contains("  1 likes | 0 comments\n"));
        assert_eq!(feed.posts()[0].like_count, 1);

        let (_, output) = run_script(&fake, &dir, "like 1\n").await;
        assert!(!output.contains(WELCOME));
        assert!(output.contains("! You have already liked this post\n"));
    }

    #[tokio::test]
    async fn replies_and_flat_threads() {
        let fake = FakeApi::start().await.unwrap();
        let post = fake.seed_post("alice", "hello").await;
        let root = fake.seed_comment(post.id, None, "bob", "first").await;
        let dir = tempfile::tempdir().unwrap();

        let input = format!(
            "carol\ncomments {post}\nreply {post} {root} me too\nthread {post}\nnope\n",
            post = post.id,
            root = root.id,
        );
        let (feed, output) = run_script(&fake, &dir, &input).await;

        let tree = feed.view(post.id).unwrap().comments();
        assert_eq!(tree.roots()[0].replies[0].content.get(), "me too");
        assert_eq!(feed.posts()[0].comment_count, 2);
        assert!(output.contains("      me too\n"));
        assert!(output.contains("Unknown command \"nope\""));
    }

    #[tokio::test]
    async fn prompt_shows_while_posts_load() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let stalled = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let dir = tempfile::tempdir().unwrap();
        let client = ApiClient::new(&base_url, None).unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let mut feed = Feed::restore(client.clone(), store).await;
        let interval = PositiveDuration::from_secs(3600).unwrap();
        let mut leaderboard = Leaderboard::spawn(client, interval);

        let mut output = Vec::new();
        tokio::time::timeout(
            Duration::from_secs(2),
            run(
                &mut feed,
                &leaderboard,
                &b""[..],
                &mut output,
                CancellationToken::new(),
            ),
        )
        .await
        .unwrap()
        .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Loading posts..."));
        assert!(output.contains(WELCOME));
        assert_eq!(feed.load_state(), LoadState::Loading);

        assert!(leaderboard.stop().await);
        stalled.abort();
    }

    #[tokio::test]
    async fn cancellation_ends_the_loop() {
        let fake = FakeApi::start().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let client = ApiClient::new(fake.base_url(), None).unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let mut feed = Feed::restore(client.clone(), store).await;
        let interval = PositiveDuration::from_secs(3600).unwrap();
        let leaderboard = Leaderboard::spawn(client, interval);

        let token = CancellationToken::new();
        token.cancel();
        let (reader, _writer) = tokio::io::duplex(64);
        let mut output = Vec::new();

        run(
            &mut feed,
            &leaderboard,
            tokio::io::BufReader::new(reader),
            &mut output,
            token,
        )
        .await
        .unwrap();

        assert!(String::from_utf8(output).unwrap().contains(WELCOME));
    }
}
