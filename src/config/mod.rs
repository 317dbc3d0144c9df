// src/config/mod.rs
//! Relay configuration: one file (TOML or JSON) or plain environment variables.
//!
//! Lookup order for [`RelayConfig::load_default`]:
//! 1) `$RELAY_CONFIG_PATH`
//! 2) `config/relay.toml`
//! 3) `config/relay.json`
//! 4) environment variables (single account)

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono_tz::Tz;
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};
use crate::history::DEFAULT_CAPACITY;
use crate::novelty::{
    DedupKey, Freshness, NoveltyPolicy, ReplyMatch, DEFAULT_FRESHNESS_SECS, DEFAULT_REPLY_MARKER,
};
use crate::supervisor::{HistoryOnRestart, RetryPolicy};
use crate::time_norm::{TimeNormalizer, DEFAULT_TIMEZONE};

pub const ENV_CONFIG_PATH: &str = "RELAY_CONFIG_PATH";

/// One timeline relayed into one chat. All fields are required.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub name: String,
    pub timeline: String,
    pub bearer_token: String,
    pub bot_token: String,
    pub chat_id: String,
}

// Credentials stay out of logs.
impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountConfig")
            .field("name", &self.name)
            .field("timeline", &self.timeline)
            .field("bearer_token", &"<redacted>")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessMode {
    #[default]
    Horizon,
    SameDay,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub poll_interval: Duration,
    pub history_capacity: usize,
    pub timezone: Tz,
    pub policy: NoveltyPolicy,
    pub retry: RetryPolicy,
    /// Log messages instead of sending them.
    pub dry_run: bool,
    pub metrics_addr: Option<SocketAddr>,
    pub accounts: Vec<AccountConfig>,
}

impl RelayConfig {
    pub fn normalizer(&self) -> TimeNormalizer {
        TimeNormalizer::new(self.timezone)
    }

    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading relay config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let raw: RawConfig = match ext.as_str() {
            "json" => serde_json::from_str(&content).context("parsing relay config JSON")?,
            _ => toml::from_str(&content).context("parsing relay config TOML")?,
        };
        Ok(raw.validate(&env_lookup)?)
    }

    pub fn load_default() -> anyhow::Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        for candidate in ["config/relay.toml", "config/relay.json"] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        Ok(Self::from_env()?)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&env_lookup)
    }

    /// Single-account configuration from `lookup` (normally the process env).
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut raw = RawConfig::default();

        if let Some(v) = lookup("WAIT_PERIOD") {
            raw.poll_interval_secs = parse_num("WAIT_PERIOD", &v)?;
        }
        if let Some(v) = lookup("NOT_OLDER_THAN_SEC") {
            raw.freshness_horizon_secs = parse_num("NOT_OLDER_THAN_SEC", &v)?;
        }
        if let Some(v) = lookup("HISTORY_CAPACITY") {
            raw.history_capacity = parse_num("HISTORY_CAPACITY", &v)?;
        }
        if let Some(v) = lookup("LOCAL_TIMEZONE") {
            raw.local_timezone = v;
        }
        if let Some(v) = lookup("DEDUP_KEY") {
            raw.dedup_key = parse_choice("DEDUP_KEY", &v)?;
        }
        if let Some(v) = lookup("FRESHNESS") {
            raw.freshness = parse_choice("FRESHNESS", &v)?;
        }
        if let Some(v) = lookup("REPLY_MATCH") {
            raw.reply_match = parse_choice("REPLY_MATCH", &v)?;
        }
        if let Some(v) = lookup("MAX_RESTARTS") {
            raw.retry.max_restarts = Some(parse_num("MAX_RESTARTS", &v)?);
        }
        if let Some(v) = lookup("DRY_RUN") {
            raw.dry_run = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        raw.metrics_addr = lookup("METRICS_ADDR");

        raw.accounts.push(RawAccount {
            name: None,
            timeline: lookup("TIMELINE"),
            bearer_token: lookup("TWITTER_BEARER_TOKEN"),
            bot_token: lookup("BOT_TOKEN"),
            chat_id: lookup("CHAT_ID"),
        });

        raw.validate(lookup)
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parse_num<T: std::str::FromStr>(key: &str, v: &str) -> Result<T> {
    v.trim()
        .parse()
        .map_err(|_| RelayError::Config(format!("{key}: not a number: {v:?}")))
}

fn parse_choice<T: DeserializeOwned>(key: &str, v: &str) -> Result<T> {
    let lowered = v.trim().to_ascii_lowercase();
    T::deserialize(lowered.as_str().into_deserializer())
        .map_err(|e: serde::de::value::Error| RelayError::Config(format!("{key}: {e}")))
}

fn default_poll_interval_secs() -> f64 {
    1.2
}
fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}
fn default_horizon_secs() -> u64 {
    DEFAULT_FRESHNESS_SECS
}
fn default_timezone() -> String {
    DEFAULT_TIMEZONE.name().to_string()
}
fn default_reply_marker() -> char {
    DEFAULT_REPLY_MARKER
}

/// On-disk shape, before validation.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
    #[serde(default = "default_poll_interval_secs")]
    poll_interval_secs: f64,
    #[serde(default = "default_capacity")]
    history_capacity: usize,
    #[serde(default = "default_horizon_secs")]
    freshness_horizon_secs: u64,
    freshness: FreshnessMode,
    #[serde(default = "default_timezone")]
    local_timezone: String,
    dedup_key: DedupKey,
    #[serde(default = "default_reply_marker")]
    reply_marker: char,
    reply_match: ReplyMatch,
    dry_run: bool,
    metrics_addr: Option<String>,
    retry: RawRetry,
    accounts: Vec<RawAccount>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            history_capacity: default_capacity(),
            freshness_horizon_secs: default_horizon_secs(),
            freshness: FreshnessMode::default(),
            local_timezone: default_timezone(),
            dedup_key: DedupKey::default(),
            reply_marker: default_reply_marker(),
            reply_match: ReplyMatch::default(),
            dry_run: false,
            metrics_addr: None,
            retry: RawRetry::default(),
            accounts: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawRetry {
    max_restarts: Option<u32>,
    base_delay_ms: u64,
    max_delay_ms: u64,
    history_on_restart: HistoryOnRestart,
    restart_notice: bool,
}

impl Default for RawRetry {
    fn default() -> Self {
        let p = RetryPolicy::default();
        Self {
            max_restarts: p.max_restarts,
            base_delay_ms: p.base_delay.as_millis() as u64,
            max_delay_ms: p.max_delay.as_millis() as u64,
            history_on_restart: p.history_on_restart,
            restart_notice: p.restart_notice,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawAccount {
    name: Option<String>,
    timeline: Option<String>,
    bearer_token: Option<String>,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

impl RawConfig {
    fn validate<F>(self, lookup: &F) -> Result<RelayConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let poll_interval = Duration::try_from_secs_f64(self.poll_interval_secs)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| {
                RelayError::Config(format!(
                    "poll interval must be positive, got {}",
                    self.poll_interval_secs
                ))
            })?;
        if self.history_capacity == 0 {
            return Err(RelayError::Config("history capacity must be at least 1".into()));
        }
        if self.freshness == FreshnessMode::Horizon && self.freshness_horizon_secs == 0 {
            return Err(RelayError::Config("freshness horizon must be positive".into()));
        }
        let timezone: Tz = self.local_timezone.trim().parse().map_err(|e| {
            RelayError::Config(format!("unknown timezone {:?}: {e}", self.local_timezone))
        })?;
        let metrics_addr = self
            .metrics_addr
            .as_deref()
            .map(|a| {
                a.trim()
                    .parse::<SocketAddr>()
                    .map_err(|e| RelayError::Config(format!("metrics_addr {a:?}: {e}")))
            })
            .transpose()?;
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(RelayError::Config(
                "retry base_delay_ms exceeds max_delay_ms".into(),
            ));
        }
        if self.accounts.is_empty() {
            return Err(RelayError::Config("no accounts configured".into()));
        }

        let mut accounts = Vec::with_capacity(self.accounts.len());
        for (idx, raw) in self.accounts.into_iter().enumerate() {
            let account = raw.validate(idx, lookup)?;
            if accounts.iter().any(|a: &AccountConfig| a.name == account.name) {
                return Err(RelayError::Config(format!(
                    "duplicate account name {:?}",
                    account.name
                )));
            }
            accounts.push(account);
        }

        let freshness = match self.freshness {
            FreshnessMode::Horizon => Freshness::Horizon(chrono::Duration::seconds(
                i64::try_from(self.freshness_horizon_secs)
                    .unwrap_or(i64::MAX)
                    .min(i64::MAX / 1000),
            )),
            FreshnessMode::SameDay => Freshness::SameDay,
        };

        Ok(RelayConfig {
            poll_interval,
            history_capacity: self.history_capacity,
            timezone,
            policy: NoveltyPolicy {
                reply_marker: self.reply_marker,
                reply_match: self.reply_match,
                dedup: self.dedup_key,
                freshness,
            },
            retry: RetryPolicy {
                max_restarts: self.retry.max_restarts,
                base_delay: Duration::from_millis(self.retry.base_delay_ms),
                max_delay: Duration::from_millis(self.retry.max_delay_ms),
                history_on_restart: self.retry.history_on_restart,
                restart_notice: self.retry.restart_notice,
            },
            dry_run: self.dry_run,
            metrics_addr,
            accounts,
        })
    }
}

impl RawAccount {
    fn validate<F>(self, idx: usize, lookup: &F) -> Result<AccountConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let label = self
            .name
            .clone()
            .or_else(|| self.timeline.clone())
            .unwrap_or_else(|| format!("#{idx}"));
        let field = |value: Option<String>, key: &str, env_default: &str| -> Result<String> {
            let v = value.unwrap_or_default();
            let v = resolve_secret(v.trim(), env_default, lookup)
                .map_err(|e| RelayError::Config(format!("account {label}: {key}: {e}")))?;
            if v.is_empty() {
                return Err(RelayError::Config(format!(
                    "account {label}: missing {key}"
                )));
            }
            Ok(v)
        };

        let timeline = field(self.timeline, "timeline", "TIMELINE")?;
        let bearer_token = field(self.bearer_token, "bearer_token", "TWITTER_BEARER_TOKEN")?;
        let bot_token = field(self.bot_token, "bot_token", "BOT_TOKEN")?;
        let chat_id = field(self.chat_id, "chat_id", "CHAT_ID")?;
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| timeline.clone());

        Ok(AccountConfig {
            name,
            timeline,
            bearer_token,
            bot_token,
            chat_id,
        })
    }
}

/// `"ENV"` reads `env_default`; `"env:NAME"` reads `NAME`; anything else is literal.
fn resolve_secret<F>(
    value: &str,
    env_default: &str,
    lookup: &F,
) -> std::result::Result<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    let var = if value.eq_ignore_ascii_case("env") {
        Some(env_default)
    } else if let Some(name) = value
        .strip_prefix("env:")
        .or_else(|| value.strip_prefix("ENV:"))
    {
        Some(name.trim())
    } else {
        None
    };
    match var {
        Some(var) => lookup(var)
            .map(|v| v.trim().to_string())
            .ok_or_else(|| format!("missing {var} env var")),
        None => Ok(value.to_string()),
    }
}
