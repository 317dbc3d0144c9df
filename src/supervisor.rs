//! # Supervisor
//! Restart policy around a [`PollLoop`]: when a cycle fails the loop is
//! restarted after an exponential backoff. What survives a restart is an
//! explicit choice (`HistoryOnRestart`); by default the history is dropped,
//! so a post seen before the outage may be relayed once more afterwards.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::config::{AccountConfig, RelayConfig};
use crate::error::{RelayError, Result};
use crate::novelty::NoveltyFilter;
use crate::notify::NotificationSink;
use crate::poll::PollLoop;
use crate::source::PostSource;

/// What happens to the remembered posts when the loop restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOnRestart {
    #[default]
    Reset,
    Retain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` restarts forever.
    pub max_restarts: Option<u32>,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub history_on_restart: HistoryOnRestart,
    /// Post a short notice to the channel after each restart.
    pub restart_notice: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_restarts: None,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            history_on_restart: HistoryOnRestart::Reset,
            restart_notice: true,
        }
    }
}

impl RetryPolicy {
    /// Backoff before restart number `attempt` (1-based): base · 2^(attempt-1), capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }
}

/// Run `poll_loop` under `policy` until restarts are exhausted.
///
/// Only returns on give-up, carrying the error that ended the last run.
pub async fn supervise(mut poll_loop: PollLoop, policy: &RetryPolicy) -> RelayError {
    let mut restarts: u32 = 0;
    let mut attempt: u32 = 0;
    let mut clean_cycles = poll_loop.cycles_completed();

    loop {
        let err = match poll_loop.run().await {
            Ok(never) => match never {},
            Err(e) => e,
        };
        let account = poll_loop.account().name.clone();

        if let RelayError::EmptyStore = err {
            tracing::error!(account = %account, "history invariant broken; not restarting");
            return err;
        }

        // A clean cycle since the last failure resets the backoff.
        if poll_loop.cycles_completed() > clean_cycles {
            attempt = 0;
        }
        clean_cycles = poll_loop.cycles_completed();

        if policy.max_restarts.is_some_and(|max| restarts >= max) {
            tracing::error!(account = %account, restarts, error = %err, "giving up on poll loop");
            return err;
        }

        restarts += 1;
        attempt += 1;
        let delay = policy.delay_for(attempt);
        counter!("relay_restarts_total").increment(1);
        tracing::warn!(
            account = %account,
            error = %err,
            kind = err.kind(),
            delay_ms = delay.as_millis() as u64,
            "poll loop failed, restarting"
        );
        tokio::time::sleep(delay).await;

        if policy.history_on_restart == HistoryOnRestart::Reset {
            poll_loop.reset_history();
        }

        if policy.restart_notice {
            let notice = format!("Bot restarted: {err}");
            let chat_id = poll_loop.account().chat_id.clone();
            if let Err(e) = poll_loop.sink().deliver(&chat_id, &notice).await {
                tracing::warn!(account = %account, error = %e, "restart notice not delivered");
            }
        }
    }
}

/// Spawn one supervised poll loop per configured account.
///
/// Every account gets its own `HistoryStore`. Resolves once all loops have
/// given up; the first give-up error is returned.
pub async fn run_accounts<FS, FN>(
    config: &RelayConfig,
    mut make_source: FS,
    mut make_sink: FN,
) -> Result<()>
where
    FS: FnMut(&AccountConfig) -> Arc<dyn PostSource>,
    FN: FnMut(&AccountConfig) -> Arc<dyn NotificationSink>,
{
    if config.accounts.is_empty() {
        return Err(RelayError::Config("no accounts configured".into()));
    }

    let normalizer = config.normalizer();
    let filter = NoveltyFilter::new(config.policy, normalizer);
    let mut set = JoinSet::new();

    for account in &config.accounts {
        let poll_loop = PollLoop::new(
            account.clone(),
            make_source(account),
            make_sink(account),
            filter,
            normalizer,
            config.history_capacity,
        )
        .with_interval(config.poll_interval);
        let policy = config.retry.clone();
        let name = account.name.clone();

        tracing::info!(account = %name, timeline = %account.timeline, "starting poll loop");
        set.spawn(async move { (name, supervise(poll_loop, &policy).await) });
    }

    let mut first_err = None;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((name, err)) => {
                tracing::error!(account = %name, error = %err, "account stopped");
                first_err.get_or_insert(err);
            }
            Err(e) => tracing::error!(error = %e, "poll task panicked"),
        }
    }
    first_err.map_or(Ok(()), Err)
}
