use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("relay_polls_total", "Poll cycles started.");
        describe_counter!("relay_accepted_total", "Posts accepted as new.");
        describe_counter!(
            "relay_rejected_total",
            "Posts rejected by the novelty filter, by reason."
        );
        describe_counter!("relay_source_errors_total", "Timeline fetch failures.");
        describe_counter!(
            "relay_delivery_errors_total",
            "Notification deliveries that failed."
        );
        describe_counter!("relay_restarts_total", "Poll loop restarts after an error.");
        describe_gauge!("relay_history_len", "Entries currently remembered, per account.");
    });
}

/// Install the Prometheus recorder with its own scrape listener on `addr`.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("prometheus: install exporter on {addr}"))?;
    ensure_metrics_described();
    Ok(())
}
