use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Text of a post or comment, as typed by the user.
///
/// Only construction through [`Content::new`] is validated. Content coming
/// back from the server is taken as is.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Content(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Content must not be blank")]
pub struct BlankContentError;

impl Content {
    pub fn new(text: impl Into<String>) -> Result<Self, BlankContentError> {
        let text = text.into();
        if text.trim().is_empty() {
            Err(BlankContentError)
        } else {
            Ok(Self(text))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Display for Content {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
