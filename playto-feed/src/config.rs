use playto_client::client::DEFAULT_BASE_URL;
use playto_common::{model::ModelValidationError, util::PositiveDuration};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

pub const ENV_PREFIX: &str = "PLAYTO_";

/// Settings read from `PLAYTO_*` environment variables.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct Env {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
    #[serde(default = "default_leaderboard_interval_secs")]
    pub leaderboard_interval_secs: u64,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_api_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn default_session_file() -> PathBuf {
    PathBuf::from(".playto-session.json")
}

fn default_leaderboard_interval_secs() -> u64 {
    30
}

impl Env {
    pub fn leaderboard_interval(&self) -> Result<PositiveDuration, ModelValidationError> {
        let seconds = i64::try_from(self.leaderboard_interval_secs).unwrap_or(i64::MAX);
        Ok(time::Duration::seconds(seconds).try_into()?)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for Env {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            session_file: default_session_file(),
            leaderboard_interval_secs: default_leaderboard_interval_secs(),
            request_timeout_secs: None,
        }
    }
}
