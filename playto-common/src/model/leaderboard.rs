use crate::model::user::UserName;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    num::NonZeroU32,
};

/// Karma the author of a post earns per like. Computed by the backend.
pub const POST_LIKE_KARMA: i64 = 5;
/// Karma the author of a comment earns per like. Computed by the backend.
pub const COMMENT_LIKE_KARMA: i64 = 1;

/// One-based position on the leaderboard.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Rank(NonZeroU32);

impl Rank {
    #[must_use]
    pub fn new(rank: u32) -> Option<Self> {
        NonZeroU32::new(rank).map(Self)
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }

    #[must_use]
    pub fn medal(self) -> Medal {
        Medal::from(self)
    }
}

impl Display for Rank {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct LeaderboardEntry {
    pub rank: Rank,
    pub user: UserName,
    pub karma: i64,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Medal {
    Gold,
    Silver,
    Bronze,
    Standard,
}

impl Medal {
    #[must_use]
    pub fn emoji(self) -> &'static str {
        match self {
            Medal::Gold => "🏆",
            Medal::Silver => "🥈",
            Medal::Bronze => "🥉",
            Medal::Standard => "⭐",
        }
    }
}

impl From<Rank> for Medal {
    fn from(rank: Rank) -> Self {
        match rank.get() {
            1 => Medal::Gold,
            2 => Medal::Silver,
            3 => Medal::Bronze,
            _ => Medal::Standard,
        }
    }
}
