//! # Poll Loop
//! Drives one account: wait, fetch the latest post, run the novelty filter,
//! and relay accepted posts. Exactly one cycle is in flight at a time, so the
//! loop owns its `HistoryStore` outright.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};

use crate::config::AccountConfig;
use crate::error::Result;
use crate::history::{Entry, HistoryStore};
use crate::novelty::{NoveltyFilter, Verdict};
use crate::notify::{render_message, NotificationSink};
use crate::source::PostSource;
use crate::time_norm::TimeNormalizer;

/// Default wait between cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
}

pub struct PollLoop {
    account: AccountConfig,
    source: Arc<dyn PostSource>,
    sink: Arc<dyn NotificationSink>,
    filter: NoveltyFilter,
    normalizer: TimeNormalizer,
    history: HistoryStore,
    interval: Duration,
    state: PollState,
    cycles_completed: u64,
}

impl PollLoop {
    pub fn new(
        account: AccountConfig,
        source: Arc<dyn PostSource>,
        sink: Arc<dyn NotificationSink>,
        filter: NoveltyFilter,
        normalizer: TimeNormalizer,
        history_capacity: usize,
    ) -> Self {
        Self {
            account,
            source,
            sink,
            filter,
            normalizer,
            history: HistoryStore::with_capacity(history_capacity),
            interval: DEFAULT_POLL_INTERVAL,
            state: PollState::Idle,
            cycles_completed: 0,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn account(&self) -> &AccountConfig {
        &self.account
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn reset_history(&mut self) {
        self.history.clear();
        self.publish_history_len();
    }

    /// Cycles that ran to completion without an error.
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    pub fn sink(&self) -> &Arc<dyn NotificationSink> {
        &self.sink
    }

    /// Sleep for the poll interval, then poll; forever, until a cycle fails.
    pub async fn run(&mut self) -> Result<Infallible> {
        loop {
            tokio::time::sleep(self.interval).await;
            self.poll_once().await?;
        }
    }

    /// One fetch → evaluate → maybe-deliver cycle.
    ///
    /// Always ends back in `Idle`. A failed delivery is reported after the
    /// entry has been recorded; the history is not rolled back.
    pub async fn poll_once(&mut self) -> Result<Option<Entry>> {
        self.state = PollState::Polling;
        let outcome = self.cycle().await;
        self.state = PollState::Idle;
        if outcome.is_ok() {
            self.cycles_completed += 1;
        }
        outcome
    }

    async fn cycle(&mut self) -> Result<Option<Entry>> {
        counter!("relay_polls_total").increment(1);
        let account = self.account.name.as_str();

        let candidate = match self.source.fetch_latest(&self.account.timeline).await {
            Ok(Some(c)) => c,
            Ok(None) => {
                tracing::trace!(account, "source returned nothing");
                return Ok(None);
            }
            Err(e) => {
                counter!("relay_source_errors_total").increment(1);
                return Err(e);
            }
        };

        let (_, now) = self.normalizer.normalize(candidate.created_at);
        let entry = match self.filter.classify(&candidate, now, &mut self.history) {
            Verdict::Accepted(entry) => entry,
            Verdict::Rejected(reason) => {
                tracing::debug!(account, reason = reason.as_str(), "candidate rejected");
                counter!("relay_rejected_total", "reason" => reason.as_str()).increment(1);
                return Ok(None);
            }
        };
        counter!("relay_accepted_total").increment(1);
        self.publish_history_len();

        let message = render_message(&entry, &self.normalizer);
        if let Err(e) = self.sink.deliver(&self.account.chat_id, &message).await {
            counter!("relay_delivery_errors_total").increment(1);
            return Err(e);
        }

        tracing::info!(
            account,
            processed = %self.normalizer.format_local(&entry.processed_at),
            created = %self.normalizer.format_local(&entry.created_at),
            "record sent:\n{message}"
        );
        Ok(Some(entry))
    }

    fn publish_history_len(&self) {
        gauge!("relay_history_len", "account" => self.account.name.clone())
            .set(self.history.len() as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;
    use crate::notify::RecordingNotifier;
    use crate::source::{PostCandidate, ScriptedSource};
    use chrono::Utc;

    fn account() -> AccountConfig {
        AccountConfig {
            name: "main".into(),
            timeline: "acme".into(),
            bearer_token: "t".into(),
            bot_token: "b".into(),
            chat_id: "-100".into(),
        }
    }

    #[tokio::test]
    async fn failed_delivery_still_records_entry_and_returns_to_idle() {
        let src = Arc::new(ScriptedSource::with_posts([PostCandidate::new(
            "Tip-off soon",
            Utc::now(),
        )]));
        let sink = Arc::new(RecordingNotifier::new());
        sink.fail_next(1);
        let mut pl = PollLoop::new(
            account(),
            src,
            sink.clone(),
            NoveltyFilter::default(),
            TimeNormalizer::default(),
            5,
        );

        let err = pl.poll_once().await.unwrap_err();
        assert!(matches!(err, RelayError::SinkUnavailable { .. }));
        assert_eq!(pl.state(), PollState::Idle);
        assert_eq!(pl.history().len(), 1);
        assert_eq!(pl.cycles_completed(), 0);
        assert!(sink.sent().is_empty());
    }
}
