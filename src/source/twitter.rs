use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{PostCandidate, PostSource};
use crate::error::{RelayError, Result};
use crate::time_norm::parse_source_timestamp;

const DEFAULT_BASE_URL: &str = "https://api.twitter.com";
const NAME: &str = "twitter";

#[derive(Debug, Deserialize)]
struct TimelinePost {
    #[serde(default)]
    full_text: Option<String>,
    #[serde(default)]
    text: Option<String>,
    created_at: String,
}

/// User-timeline reader using app-only bearer authentication.
#[derive(Clone)]
pub struct TwitterSource {
    base_url: String,
    bearer_token: String,
    client: Client,
    timeout: Duration,
}

impl TwitterSource {
    pub fn new(bearer_token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            bearer_token: bearer_token.into(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Point at another API host (tests, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    fn timeline_url(&self) -> String {
        format!("{}/1.1/statuses/user_timeline.json", self.base_url)
    }
}

#[async_trait]
impl PostSource for TwitterSource {
    async fn fetch_latest(&self, timeline: &str) -> Result<Option<PostCandidate>> {
        let resp = self
            .client
            .get(self.timeline_url())
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("screen_name", timeline),
                ("count", "1"),
                ("tweet_mode", "extended"),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RelayError::source_unavailable(NAME, format!("request failed: {e}")))?;

        let resp = resp
            .error_for_status()
            .map_err(|e| RelayError::source_unavailable(NAME, format!("HTTP error: {e}")))?;

        let posts: Vec<TimelinePost> = resp
            .json()
            .await
            .map_err(|e| RelayError::source_unavailable(NAME, format!("decode body: {e}")))?;

        let Some(post) = posts.into_iter().next() else {
            tracing::debug!(timeline, "timeline returned no posts");
            return Ok(None);
        };

        let created_at = parse_source_timestamp(&post.created_at)?;
        let text = post.full_text.or(post.text).unwrap_or_default();
        Ok(Some(PostCandidate { text, created_at }))
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
