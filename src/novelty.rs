//! # Novelty Filter
//! Decides whether the latest fetched post is worth relaying.
//!
//! A candidate is novel when it is not a reply, not already in the history,
//! and not stale. Checks run in that order and stop at the first failure;
//! the history is only touched on acceptance.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::history::{Entry, HistoryStore};
use crate::source::PostCandidate;
use crate::time_norm::TimeNormalizer;

pub const DEFAULT_REPLY_MARKER: char = '@';
pub const DEFAULT_FRESHNESS_SECS: u64 = 500;

/// Where the reply marker has to appear for a post to count as a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMatch {
    /// Text starts with the marker.
    Prefix,
    /// Marker appears anywhere in the text.
    #[default]
    Anywhere,
}

/// Which field identifies an already relayed post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupKey {
    #[default]
    CreatedAt,
    Text,
}

/// How old a post may be and still be relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Sliding window: `created_at > now - horizon`.
    Horizon(Duration),
    /// Posted on the same local calendar day as `now`.
    SameDay,
}

impl Default for Freshness {
    fn default() -> Self {
        Freshness::Horizon(Duration::seconds(DEFAULT_FRESHNESS_SECS as i64))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoveltyPolicy {
    pub reply_marker: char,
    pub reply_match: ReplyMatch,
    pub dedup: DedupKey,
    pub freshness: Freshness,
}

impl Default for NoveltyPolicy {
    fn default() -> Self {
        Self {
            reply_marker: DEFAULT_REPLY_MARKER,
            reply_match: ReplyMatch::default(),
            dedup: DedupKey::default(),
            freshness: Freshness::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Reply,
    Duplicate,
    Stale,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::Reply => "reply",
            Rejection::Duplicate => "duplicate",
            Rejection::Stale => "stale",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(Entry),
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoveltyFilter {
    policy: NoveltyPolicy,
    normalizer: TimeNormalizer,
}

impl NoveltyFilter {
    pub fn new(policy: NoveltyPolicy, normalizer: TimeNormalizer) -> Self {
        Self { policy, normalizer }
    }

    pub fn policy(&self) -> &NoveltyPolicy {
        &self.policy
    }

    /// Accept-or-nothing view of [`classify`](Self::classify).
    pub fn evaluate(
        &self,
        candidate: &PostCandidate,
        now: DateTime<Tz>,
        history: &mut HistoryStore,
    ) -> Option<Entry> {
        match self.classify(candidate, now, history) {
            Verdict::Accepted(entry) => Some(entry),
            Verdict::Rejected(_) => None,
        }
    }

    /// Run the novelty checks; on acceptance the entry is pushed to `history`.
    pub fn classify(
        &self,
        candidate: &PostCandidate,
        now: DateTime<Tz>,
        history: &mut HistoryStore,
    ) -> Verdict {
        let created_at = self.normalizer.localize(candidate.created_at);
        let now = self.normalizer.localize(now);

        if self.is_reply(&candidate.text) {
            return Verdict::Rejected(Rejection::Reply);
        }

        let seen = match self.policy.dedup {
            DedupKey::CreatedAt => history.contains(&created_at),
            DedupKey::Text => history.contains_text(&candidate.text),
        };
        if seen {
            return Verdict::Rejected(Rejection::Duplicate);
        }

        if !self.is_fresh(&created_at, &now) {
            return Verdict::Rejected(Rejection::Stale);
        }

        let entry = Entry {
            text: candidate.text.clone(),
            created_at,
            processed_at: now,
        };
        history.push(entry.clone());
        Verdict::Accepted(entry)
    }

    fn is_reply(&self, text: &str) -> bool {
        let marker = self.policy.reply_marker;
        match self.policy.reply_match {
            ReplyMatch::Prefix => text.trim_start().starts_with(marker),
            ReplyMatch::Anywhere => text.contains(marker),
        }
    }

    fn is_fresh(&self, created_at: &DateTime<Tz>, now: &DateTime<Tz>) -> bool {
        match self.policy.freshness {
            // A horizon reaching past chrono's earliest date has no lower bound.
            Freshness::Horizon(horizon) => now
                .checked_sub_signed(horizon)
                .map_or(true, |cutoff| *created_at > cutoff),
            Freshness::SameDay => created_at.date_naive() == now.date_naive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const T0: i64 = 1_750_000_000;

    fn at(secs: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(T0 + secs, 0).unwrap()
    }

    fn now(secs: i64) -> DateTime<Tz> {
        at(secs).with_timezone(&chrono_tz::Europe::Paris)
    }

    fn filter(policy: NoveltyPolicy) -> NoveltyFilter {
        NoveltyFilter::new(policy, TimeNormalizer::default())
    }

    #[test]
    fn fresh_original_post_is_accepted_and_recorded() {
        let f = filter(NoveltyPolicy::default());
        let mut h = HistoryStore::with_capacity(5);
        let c = PostCandidate::new("Lineup confirmed", at(0));
        let got = f.evaluate(&c, now(30), &mut h).expect("accepted");
        assert_eq!(got.text, "Lineup confirmed");
        assert_eq!(got.processed_at, now(30));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn second_identical_candidate_is_a_duplicate() {
        let f = filter(NoveltyPolicy::default());
        let mut h = HistoryStore::with_capacity(5);
        let c = PostCandidate::new("Injury update", at(0));
        assert!(matches!(f.classify(&c, now(1), &mut h), Verdict::Accepted(_)));
        assert_eq!(
            f.classify(&c, now(2), &mut h),
            Verdict::Rejected(Rejection::Duplicate)
        );
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn sub_second_difference_counts_as_the_same_post() {
        let f = filter(NoveltyPolicy::default());
        let mut h = HistoryStore::with_capacity(5);
        let a = PostCandidate::new("one", at(0));
        let b = PostCandidate::new("two", at(0) + Duration::milliseconds(400));
        assert!(f.evaluate(&a, now(1), &mut h).is_some());
        assert!(f.evaluate(&b, now(1), &mut h).is_none());
    }

    #[test]
    fn reply_is_rejected_before_anything_else() {
        let f = filter(NoveltyPolicy::default());
        let mut h = HistoryStore::with_capacity(5);
        let c = PostCandidate::new("@fan thanks!", at(0));
        assert_eq!(
            f.classify(&c, now(1), &mut h),
            Verdict::Rejected(Rejection::Reply)
        );
        assert!(h.is_empty());
    }

    #[test]
    fn prefix_mode_lets_mentions_through() {
        let f = filter(NoveltyPolicy {
            reply_match: ReplyMatch::Prefix,
            ..NoveltyPolicy::default()
        });
        let mut h = HistoryStore::with_capacity(5);
        let mention = PostCandidate::new("Great game by @someone", at(0));
        assert!(f.evaluate(&mention, now(1), &mut h).is_some());
        let reply = PostCandidate::new("  @someone agreed", at(5));
        assert!(f.evaluate(&reply, now(6), &mut h).is_none());
    }

    #[test]
    fn horizon_boundary_is_exclusive() {
        let f = filter(NoveltyPolicy::default());
        let mut h = HistoryStore::with_capacity(5);
        let edge = PostCandidate::new("edge", at(0));
        assert_eq!(
            f.classify(&edge, now(500), &mut h),
            Verdict::Rejected(Rejection::Stale)
        );
        let inside = PostCandidate::new("inside", at(1));
        assert!(matches!(
            f.classify(&inside, now(500), &mut h),
            Verdict::Accepted(_)
        ));
    }

    #[test]
    fn horizon_older_than_the_calendar_accepts_everything() {
        let f = filter(NoveltyPolicy {
            freshness: Freshness::Horizon(Duration::seconds(100_000_000_000_000)),
            ..NoveltyPolicy::default()
        });
        let mut h = HistoryStore::with_capacity(5);
        let c = PostCandidate::new("ancient news", at(-1_000_000_000));
        assert!(matches!(f.classify(&c, now(0), &mut h), Verdict::Accepted(_)));
    }

    #[test]
    fn text_dedup_ignores_timestamps() {
        let f = filter(NoveltyPolicy {
            dedup: DedupKey::Text,
            ..NoveltyPolicy::default()
        });
        let mut h = HistoryStore::with_capacity(5);
        assert!(f
            .evaluate(&PostCandidate::new("same words", at(0)), now(1), &mut h)
            .is_some());
        assert!(f
            .evaluate(&PostCandidate::new("same words", at(60)), now(61), &mut h)
            .is_none());
    }

    #[test]
    fn same_day_freshness_uses_local_calendar() {
        let f = filter(NoveltyPolicy {
            freshness: Freshness::SameDay,
            ..NoveltyPolicy::default()
        });
        let paris = chrono_tz::Europe::Paris;
        let mut h = HistoryStore::with_capacity(5);
        // 23:30 local on the 1st vs 00:10 local on the 2nd.
        let late = paris.with_ymd_and_hms(2025, 3, 1, 23, 30, 0).unwrap();
        let early = paris.with_ymd_and_hms(2025, 3, 2, 0, 10, 0).unwrap();
        let c = PostCandidate::new("yesterday", late.with_timezone(&Utc));
        assert_eq!(
            f.classify(&c, early, &mut h),
            Verdict::Rejected(Rejection::Stale)
        );
        let morning = paris.with_ymd_and_hms(2025, 3, 2, 0, 5, 0).unwrap();
        let c2 = PostCandidate::new("today", morning.with_timezone(&Utc));
        assert!(f.evaluate(&c2, early, &mut h).is_some());
    }
}
