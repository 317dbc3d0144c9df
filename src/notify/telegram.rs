use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::NotificationSink;
use crate::error::{RelayError, Result};

const DEFAULT_API_URL: &str = "https://api.telegram.org";
const NAME: &str = "telegram";
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

/// Pause after failed attempt `attempt` (1-based): doubles from 500ms, capped at 30s.
fn retry_delay(attempt: u8) -> Duration {
    let shift = u32::from(attempt.saturating_sub(1)).min(16);
    RETRY_BASE_DELAY
        .saturating_mul(1u32 << shift)
        .min(RETRY_MAX_DELAY)
}

/// Telegram Bot API `sendMessage` client.
#[derive(Clone)]
pub struct TelegramNotifier {
    api_url: String,
    bot_token: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            bot_token: bot_token.into(),
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Total attempts per delivery; 0 is treated as 1.
    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn deliver(&self, channel: &str, text: &str) -> Result<()> {
        let payload = SendMessage {
            chat_id: channel,
            text,
        };

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(self.endpoint())
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            // The URL carries the bot token, so errors are reported without it.
            let err = match res {
                Ok(rsp) => match rsp.error_for_status_ref() {
                    Ok(_) => return Ok(()),
                    Err(e) => format!("HTTP {}", e.status().map(|s| s.as_u16()).unwrap_or(0)),
                },
                Err(e) if e.is_timeout() => "request timed out".to_string(),
                Err(_) => "request failed".to_string(),
            };

            if attempt < self.max_retries {
                tracing::debug!(attempt, error = %err, "telegram delivery failed, retrying");
                tokio::time::sleep(retry_delay(attempt)).await;
                continue;
            }
            return Err(RelayError::sink_unavailable(NAME, err));
        }
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
