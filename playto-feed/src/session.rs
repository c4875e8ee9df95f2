use playto_common::model::{ModelValidationError, user::UserName};
use serde::{Deserialize, Serialize};
use std::{io::ErrorKind, path::PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Error accessing session file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session file is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Who the client acts as. Passed explicitly to every mutating request.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Session {
    user: UserName,
}

impl Session {
    #[must_use]
    pub fn new(user: UserName) -> Self {
        Self { user }
    }

    /// A session for a display name as typed by the user.
    pub fn parse(name: &str) -> Result<Self, ModelValidationError> {
        Ok(Self::new(UserName::new(name.to_owned())?))
    }

    #[must_use]
    pub fn user(&self) -> &UserName {
        &self.user
    }
}

/// Keeps the chosen display name between runs.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn load(&self) -> Result<Option<Session>, SessionError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored session");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn save(&self, session: &Session) -> Result<(), SessionError> {
        let json = serde_json::to_vec_pretty(session)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
