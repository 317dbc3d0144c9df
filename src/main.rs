//! Timeline relay — binary entrypoint.
//! Loads configuration, initializes tracing and metrics, then supervises one
//! poll loop per configured account until every loop gives up.

use std::sync::Arc;

use anyhow::Context;
use timeline_relay::notify::{LogNotifier, NotificationSink, TelegramNotifier};
use timeline_relay::source::{twitter::TwitterSource, PostSource};
use timeline_relay::{metrics, run_accounts, RelayConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact text logs by default; JSON lines with RELAY_LOG_JSON=1.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("timeline_relay=info,warn"));

    let json = std::env::var("RELAY_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = RelayConfig::load_default().context("loading relay config")?;
    tracing::info!(
        accounts = config.accounts.len(),
        timezone = %config.timezone,
        capacity = config.history_capacity,
        dry_run = config.dry_run,
        "relay config loaded"
    );

    if let Some(addr) = config.metrics_addr {
        metrics::install_exporter(addr)?;
        tracing::info!(%addr, "prometheus exporter listening");
    } else {
        metrics::ensure_metrics_described();
    }

    let dry_run = config.dry_run;
    run_accounts(
        &config,
        |account| {
            Arc::new(TwitterSource::new(account.bearer_token.clone())) as Arc<dyn PostSource>
        },
        |account| {
            if dry_run {
                Arc::new(LogNotifier) as Arc<dyn NotificationSink>
            } else {
                let notifier = TelegramNotifier::new(account.bot_token.clone());
                Arc::new(notifier) as Arc<dyn NotificationSink>
            }
        },
    )
    .await
    .context("relay stopped")?;

    Ok(())
}
