use playto_client::{ApiClient, ApiError};
use playto_common::model::ModelValidationError;
use playto_feed::{
    app,
    config::{ENV_PREFIX, Env},
    feed::{Feed, leaderboard::Leaderboard},
    session::SessionStore,
};
use thiserror::Error;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error setting up API client: {0}")]
    Client(#[from] ApiError),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ModelValidationError),
    #[error("Error talking to the terminal: {0}")]
    Terminal(#[from] std::io::Error),
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "playto_feed=debug,\
                playto_client=debug,\
                playto_common=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::prefixed(ENV_PREFIX).from_env().map_err(InitError::from)
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;
    let interval = env.leaderboard_interval()?;

    let client = ApiClient::new(&env.api_url, env.request_timeout())?;
    info!(api_url = client.base_url(), "Starting");

    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => debug!("Interrupted"),
                Err(err) => error!(%err, "Error listening for ctrl-c"),
            }
            token.cancel();
        }
    });

    let mut leaderboard = Leaderboard::spawn(client.clone(), interval);
    let mut feed = Feed::restore(client, SessionStore::new(env.session_file)).await;

    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    let result = app::run(&mut feed, &leaderboard, input, &mut output, token).await;

    leaderboard.stop().await;
    result.map_err(InitError::from)
}
