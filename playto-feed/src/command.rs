use playto_common::model::{Id, comment::CommentMarker, post::PostMarker};
use std::{num::ParseIntError, str::FromStr};
use thiserror::Error;

pub const HELP: &str = "\
commands:
  posts                          show the feed
  refresh                        reload the feed
  post <text>                    publish a post
  cancel                         close the new post form
  like <post> | unlike <post>    like or unlike a post
  comments <post>                show or hide the comments of a post
  comment <post> <text>          comment on a post
  reply <post> <comment> <text>  reply to a comment
  clike <post> <comment>         like a comment
  cunlike <post> <comment>       unlike a comment
  thread <post>                  list a post's comments from the flat endpoint
  leaderboard                    show the top users
  user <name>                    switch user
  help                           show this help
  quit                           leave";

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Command {
    Help,
    Posts,
    Refresh,
    Post(String),
    Cancel,
    Like(Id<PostMarker>),
    Unlike(Id<PostMarker>),
    Comments(Id<PostMarker>),
    Comment(Id<PostMarker>, String),
    Reply(Id<PostMarker>, Id<CommentMarker>, String),
    LikeComment(Id<PostMarker>, Id<CommentMarker>),
    UnlikeComment(Id<PostMarker>, Id<CommentMarker>),
    Thread(Id<PostMarker>),
    Leaderboard,
    User(String),
    Quit,
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum CommandParseError {
    #[error("Nothing to do")]
    Empty,
    #[error("Unknown command {0:?}, try `help`")]
    Unknown(String),
    #[error("Missing {0}")]
    MissingArgument(&'static str),
    #[error("Invalid id: {0}")]
    InvalidId(#[from] ParseIntError),
}

/// Splits off the next whitespace-separated word.
fn next_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    input
        .split_once(char::is_whitespace)
        .unwrap_or((input, ""))
}

fn id<'a, Marker>(
    input: &'a str,
    name: &'static str,
) -> Result<(Id<Marker>, &'a str), CommandParseError> {
    let (word, rest) = next_word(input);
    if word.is_empty() {
        return Err(CommandParseError::MissingArgument(name));
    }
    Ok((word.parse()?, rest))
}

/// Free text is passed on as typed. Blank text is left for the handlers to
/// ignore.
fn text(input: &str) -> String {
    input.trim().to_owned()
}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (name, rest) = next_word(line);

        let command = match name {
            "" => return Err(CommandParseError::Empty),
            "help" | "?" => Command::Help,
            "posts" | "ls" => Command::Posts,
            "refresh" => Command::Refresh,
            "post" => Command::Post(text(rest)),
            "cancel" => Command::Cancel,
            "like" => Command::Like(id(rest, "post id")?.0),
            "unlike" => Command::Unlike(id(rest, "post id")?.0),
            "comments" => Command::Comments(id(rest, "post id")?.0),
            "comment" => {
                let (post, rest) = id(rest, "post id")?;
                Command::Comment(post, text(rest))
            }
            "reply" => {
                let (post, rest) = id(rest, "post id")?;
                let (parent, rest) = id(rest, "comment id")?;
                Command::Reply(post, parent, text(rest))
            }
            "clike" => {
                let (post, rest) = id(rest, "post id")?;
                Command::LikeComment(post, id(rest, "comment id")?.0)
            }
            "cunlike" => {
                let (post, rest) = id(rest, "post id")?;
                Command::UnlikeComment(post, id(rest, "comment id")?.0)
            }
            "thread" => Command::Thread(id(rest, "post id")?.0),
            "leaderboard" | "top" => Command::Leaderboard,
            "user" => Command::User(text(rest)),
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandParseError::Unknown(other.to_owned())),
        };
        Ok(command)
    }
}
