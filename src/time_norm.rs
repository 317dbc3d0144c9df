//! # Time Normalizer
//! The timeline API reports creation times in UTC; the channel audience reads
//! local time. Everything the relay compares or displays goes through here so
//! both sides of a comparison live in the same zone at one-second resolution.

use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{RelayError, Result};

/// Zone used when nothing is configured.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Paris;

/// Display format for local timestamps in delivered messages.
pub const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Classic timeline format, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
const TIMELINE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeNormalizer {
    tz: Tz,
}

impl Default for TimeNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}

impl TimeNormalizer {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Returns `(created_local, now_local)`, both truncated to whole seconds.
    pub fn normalize(&self, created_utc: DateTime<Utc>) -> (DateTime<Tz>, DateTime<Tz>) {
        self.normalize_at(created_utc, Utc::now())
    }

    /// Same as [`normalize`](Self::normalize) with an injected wall clock.
    pub fn normalize_at(
        &self,
        created_utc: DateTime<Utc>,
        now_utc: DateTime<Utc>,
    ) -> (DateTime<Tz>, DateTime<Tz>) {
        (self.localize(created_utc), self.localize(now_utc))
    }

    /// Reinterpret a UTC instant in the configured zone, dropping sub-seconds.
    pub fn localize<Z: TimeZone>(&self, instant: DateTime<Z>) -> DateTime<Tz> {
        instant.with_timezone(&self.tz).trunc_subsecs(0)
    }

    pub fn now(&self) -> DateTime<Tz> {
        self.localize(Utc::now())
    }

    pub fn format_local(&self, dt: &DateTime<Tz>) -> String {
        dt.with_timezone(&self.tz).format(LOCAL_FORMAT).to_string()
    }
}

/// Parse a creation timestamp as the source reports it.
///
/// Accepts the classic timeline format and RFC 3339; anything else is a
/// contract violation by the source.
pub fn parse_source_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    DateTime::parse_from_str(trimmed, TIMELINE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| RelayError::MalformedTimestamp {
            raw: raw.to_string(),
        })
}
