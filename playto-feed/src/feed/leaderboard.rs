//! Background poller for the karma leaderboard.

use playto_client::ApiClient;
use playto_common::{model::leaderboard::LeaderboardEntry, util::PositiveDuration};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// The latest ranking, replaced wholesale on every successful poll.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Snapshot {
    pub entries: Vec<LeaderboardEntry>,
    /// Set until the first poll has finished, successful or not.
    pub loading: bool,
    /// Poll attempts so far.
    pub polls: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            loading: true,
            polls: 0,
        }
    }
}

#[derive(Debug)]
pub struct Leaderboard {
    snapshot: watch::Receiver<Snapshot>,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Leaderboard {
    /// Starts polling right away and then once every `interval`.
    #[must_use]
    pub fn spawn(client: ApiClient, interval: PositiveDuration) -> Self {
        let (sender, snapshot) = watch::channel(Snapshot::default());
        let token = CancellationToken::new();
        let task = tokio::spawn(poll(client, interval, sender, token.clone()));

        Self {
            snapshot,
            token,
            task: Some(task),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// A receiver that is notified on every poll.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.clone()
    }

    /// Cancels the poller and waits for it to finish. Returns `false` if it
    /// had already been stopped.
    pub async fn stop(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };

        self.token.cancel();
        if let Err(err) = task.await {
            error!(%err, "Leaderboard poller did not shut down cleanly");
        }
        debug!("Leaderboard poller stopped");
        true
    }
}

impl Drop for Leaderboard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn poll(
    client: ApiClient,
    interval: PositiveDuration,
    sender: watch::Sender<Snapshot>,
    token: CancellationToken,
) {
    let mut ticks = time::interval(interval.to_std());
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = token.cancelled() => break,
            _ = ticks.tick() => {}
        }

        let result = tokio::select! {
            () = token.cancelled() => break,
            result = client.fetch_leaderboard() => result,
        };

        sender.send_modify(|snapshot| {
            match result {
                Ok(entries) => {
                    debug!(count = entries.len(), "Fetched leaderboard");
                    snapshot.entries = entries;
                }
                Err(err) => error!(%err, "Error fetching leaderboard"),
            }
            snapshot.loading = false;
            snapshot.polls += 1;
        });
    }
}
