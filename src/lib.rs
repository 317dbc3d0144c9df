// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod decorate;
pub mod error;
pub mod history;
pub mod metrics;
pub mod notify;
pub mod novelty;
pub mod poll;
pub mod source;
pub mod supervisor;
pub mod time_norm;

// ---- Re-exports for stable public API ----
pub use crate::config::{AccountConfig, RelayConfig};
pub use crate::error::RelayError;
pub use crate::history::{Entry, HistoryStore};
pub use crate::notify::{NotificationSink, TelegramNotifier};
pub use crate::novelty::{NoveltyFilter, NoveltyPolicy, Rejection, Verdict};
pub use crate::poll::{PollLoop, PollState};
pub use crate::source::{PostCandidate, PostSource};
pub use crate::supervisor::{run_accounts, supervise, HistoryOnRestart, RetryPolicy};
pub use crate::time_norm::TimeNormalizer;
