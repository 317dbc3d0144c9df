//! history.rs — bounded in-memory record of posts already relayed.
//!
//! Memory-only and owned by a single poll loop; a restart starts empty.

use std::collections::VecDeque;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::error::{RelayError, Result};

/// Default number of remembered entries.
pub const DEFAULT_CAPACITY: usize = 20;

/// A post that passed novelty evaluation and was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub text: String,
    /// Local creation time, whole seconds. This is the dedup key.
    pub created_at: DateTime<Tz>,
    /// Local time at which the relay accepted the post.
    pub processed_at: DateTime<Tz>,
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    entries: VecDeque<Entry>,
    cap: usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl HistoryStore {
    /// `cap` of 0 is treated as 1.
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            entries: VecDeque::with_capacity(cap + 1),
            cap,
        }
    }

    pub fn contains(&self, created_at: &DateTime<Tz>) -> bool {
        self.entries.iter().any(|e| &e.created_at == created_at)
    }

    pub fn contains_text(&self, text: &str) -> bool {
        self.entries.iter().any(|e| e.text == text)
    }

    /// Append at the tail, evicting the oldest entry once over capacity.
    pub fn push(&mut self, entry: Entry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
    }

    pub fn latest(&self) -> Result<&Entry> {
        self.entries.back().ok_or(RelayError::EmptyStore)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
