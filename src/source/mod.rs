// src/source/mod.rs
pub mod twitter;

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::{RelayError, Result};

/// A post fetched in the current poll cycle, not yet evaluated.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PostCandidate {
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl PostCandidate {
    pub fn new(text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            created_at,
        }
    }
}

/// Fetches the single most recent post of a timeline.
#[async_trait::async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch_latest(&self, timeline: &str) -> Result<Option<PostCandidate>>;
    fn name(&self) -> &'static str;
}

/// Replays canned fetch results in order; `None` once exhausted.
///
/// Used by the demo binary and tests in place of a live timeline.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Option<PostCandidate>>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts<I: IntoIterator<Item = PostCandidate>>(posts: I) -> Self {
        let s = Self::new();
        for p in posts {
            s.push_post(p);
        }
        s
    }

    pub fn push_post(&self, post: PostCandidate) {
        self.lock().push_back(Ok(Some(post)));
    }

    pub fn push_empty(&self) {
        self.lock().push_back(Ok(None));
    }

    pub fn push_failure(&self, reason: &str) {
        self.lock()
            .push_back(Err(RelayError::source_unavailable("scripted", reason)));
    }

    pub fn remaining(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<Option<PostCandidate>>>> {
        // A poisoned script only means a test panicked mid-push; keep replaying.
        self.script.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait::async_trait]
impl PostSource for ScriptedSource {
    async fn fetch_latest(&self, _timeline: &str) -> Result<Option<PostCandidate>> {
        self.lock().pop_front().unwrap_or(Ok(None))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
