// src/notify/mod.rs
pub mod telegram;

use std::sync::Mutex;

use crate::decorate::add_emoticons;
use crate::error::{RelayError, Result};
use crate::history::Entry;
use crate::time_norm::TimeNormalizer;

pub use telegram::TelegramNotifier;

/// Delivers a text message to a destination channel.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, channel: &str, text: &str) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Message body for an accepted entry: post text plus local creation time.
pub fn format_post(entry: &Entry, normalizer: &TimeNormalizer) -> String {
    format!(
        "{}\nCreated at: {}",
        entry.text,
        normalizer.format_local(&entry.created_at)
    )
}

/// Formatted and keyword-decorated message, ready for delivery.
pub fn render_message(entry: &Entry, normalizer: &TimeNormalizer) -> String {
    add_emoticons(&format_post(entry, normalizer))
}

/// Dry-run sink: logs what would have been sent.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl NotificationSink for LogNotifier {
    async fn deliver(&self, channel: &str, text: &str) -> Result<()> {
        tracing::info!(channel, "dry-run delivery:\n{text}");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Keeps every delivered `(channel, text)` in memory; can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail_next: Mutex<usize>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` deliveries fail with `SinkUnavailable`.
    pub fn fail_next(&self, n: usize) {
        *self.fail_next.lock().unwrap_or_else(|p| p.into_inner()) = n;
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait::async_trait]
impl NotificationSink for RecordingNotifier {
    async fn deliver(&self, channel: &str, text: &str) -> Result<()> {
        {
            let mut failing = self.fail_next.lock().unwrap_or_else(|p| p.into_inner());
            if *failing > 0 {
                *failing -= 1;
                return Err(RelayError::sink_unavailable("recording", "injected failure"));
            }
        }
        self.sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
