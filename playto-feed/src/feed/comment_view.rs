use crate::feed::Draft;
use playto_common::model::{
    Id,
    comment::{Comment, CommentMarker},
    content::Content,
};
use std::{
    collections::HashMap,
    fmt::{self, Write},
};

const INDENT: &str = "    ";

/// Local state of one comment: its reply form.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CommentView {
    reply: Draft,
}

impl CommentView {
    #[must_use]
    pub fn reply(&self) -> &Draft {
        &self.reply
    }

    pub fn reply_mut(&mut self) -> &mut Draft {
        &mut self.reply
    }

    /// The pending reply, unless it is blank.
    #[must_use]
    pub fn reply_content(&self) -> Option<Content> {
        self.reply.content()
    }
}

/// Writes `comment` and all of its replies. Indentation follows the nesting,
/// which matches `depth` in well-formed trees, not the reported `depth`.
pub fn write_thread(
    out: &mut impl Write,
    comment: &Comment,
    views: &HashMap<Id<CommentMarker>, CommentView>,
) -> fmt::Result {
    write_node(out, comment, views, 0)
}

fn write_node(
    out: &mut impl Write,
    comment: &Comment,
    views: &HashMap<Id<CommentMarker>, CommentView>,
    level: usize,
) -> fmt::Result {
    let indent = INDENT.repeat(level);
    writeln!(
        out,
        "{indent}[{}] ({}) {} on {} | {} likes",
        comment.id,
        comment.author.initial(),
        comment.author,
        comment.created_at.date(),
        comment.like_count,
    )?;
    for line in comment.content.get().lines() {
        writeln!(out, "{indent}  {line}")?;
    }

    if let Some(draft) = views.get(&comment.id).map(CommentView::reply)
        && draft.is_open()
    {
        writeln!(out, "{indent}  reply> {}", draft.text())?;
    }

    comment
        .replies
        .iter()
        .try_for_each(|reply| write_node(out, reply, views, level + 1))
}
