//! error.rs — failure taxonomy shared by the relay core and its collaborators.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Fetching the latest post failed (network, auth, non-2xx).
    #[error("post source `{provider}` unavailable: {reason}")]
    SourceUnavailable {
        provider: &'static str,
        reason: String,
    },

    /// Delivering a message to the notification channel failed.
    #[error("notification sink `{sink}` unavailable: {reason}")]
    SinkUnavailable { sink: &'static str, reason: String },

    /// `latest()` on an empty history. Unreachable in a correct relay.
    #[error("history store is empty")]
    EmptyStore,

    /// The source handed us a creation time we cannot read.
    #[error("malformed source timestamp: {raw:?}")]
    MalformedTimestamp { raw: String },

    /// Startup validation of the relay configuration failed.
    #[error("invalid relay config: {0}")]
    Config(String),
}

impl RelayError {
    pub fn source_unavailable(provider: &'static str, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            provider,
            reason: reason.to_string(),
        }
    }

    pub fn sink_unavailable(sink: &'static str, reason: impl ToString) -> Self {
        Self::SinkUnavailable {
            sink,
            reason: reason.to_string(),
        }
    }

    /// Short label used as a metrics/log dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::SinkUnavailable { .. } => "sink_unavailable",
            Self::EmptyStore => "empty_store",
            Self::MalformedTimestamp { .. } => "malformed_timestamp",
            Self::Config(_) => "config",
        }
    }
}

pub type Result<T, E = RelayError> = std::result::Result<T, E>;
